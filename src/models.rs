use serde::{Deserialize, Serialize};

/// Number of messages materialized per pagination step.
pub const DEFAULT_BATCH_SIZE: usize = 15;

/// One directed message inside a contact thread.
///
/// The encrypted payload is the opaque transport form; `decrypted_text`
/// stays `None` until the decryption pipeline (or the optimistic send path,
/// which already knows the plaintext) fills it in. A failed decryption also
/// leaves it `None`, which is distinct from a message whose plaintext is
/// known to be empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub sender_id: String,
    pub recipient_id: String,
    /// Timestamp in nanoseconds. Non-decreasing in server storage order,
    /// but locally injected messages are not guaranteed strictly greater.
    pub timestamp_nanos: u64,
    pub encrypted_text: String,
    pub decrypted_text: Option<String>,
    /// Fixed at creation, never recomputed.
    pub is_outgoing: bool,
    /// Derived on every section rebuild; meaningless outside the rebuild
    /// that produced it.
    #[serde(default)]
    pub last_of_run: bool,
}

impl Message {
    /// Composite list-rendering key. No single field is guaranteed unique
    /// on its own, so the triple is used instead.
    pub fn list_key(&self, index: usize) -> String {
        format!("{}_{}_{}", self.sender_id, self.timestamp_nanos, index)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.sender_id == other.sender_id
            && self.recipient_id == other.recipient_id
            && self.timestamp_nanos == other.timestamp_nanos
            && self.encrypted_text == other.encrypted_text
            && self.decrypted_text == other.decrypted_text
            && self.is_outgoing == other.is_outgoing
            && self.last_of_run == other.last_of_run
    }
}

/// The full message history with one counterparty, sorted by timestamp
/// (oldest first in storage order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactThread {
    pub contact_id: String,
    pub messages: Vec<Message>,
}

impl ContactThread {
    pub fn new(contact_id: &str) -> Self {
        ContactThread {
            contact_id: contact_id.to_string(),
            messages: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// The contiguous slice of a thread currently materialized for display.
///
/// The window holds independent message values: mutating it (decryption
/// results, run flags) never perturbs the source thread. Messages are kept
/// in chronological order; presentation reversal happens in the grouper.
#[derive(Debug, Clone, Default)]
pub struct Window {
    pub messages: Vec<Message>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// One calendar day's worth of messages within the window.
///
/// Messages run newest-first, matching the inverted list presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub label: String,
    pub messages: Vec<Message>,
}
