// Client-side engine for an encrypted direct-message thread view.
pub mod api;     // Backend collaborator boundary
pub mod crypto;  // Cipher collaborator boundary + shared-secret implementation
pub mod models;  // Message, ContactThread, Window, Section
pub mod thread;  // Windowing, grouping, decryption and optimistic sending

// Re-export main types for convenience
pub use api::{ErrorReporter, LogReporter, MessageApi, MessageFetchOptions, UnsignedTransaction};
pub use crypto::{MessageCipher, SharedSecretCipher};
pub use models::{ContactThread, Message, Section, Window, DEFAULT_BATCH_SIZE};
pub use thread::{LivenessToken, ThreadView};
