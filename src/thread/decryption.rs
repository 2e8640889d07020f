use std::sync::Arc;

use futures_util::future;
use log::{debug, trace};

use crate::crypto::MessageCipher;
use crate::models::Message;

/// Decrypt every message in a window, concurrently.
///
/// One decrypt future per message, all pending at once, collected only when
/// every one of them has finished. The output is index-for-index the input:
/// `join_all` preserves ordering regardless of completion order, which the
/// downstream grouper depends on.
///
/// A failed decryption leaves that message's plaintext absent and never
/// fails the batch. Messages that already carry plaintext (optimistic sends,
/// previously decrypted window entries) are passed through untouched.
pub async fn decrypt_all(cipher: &Arc<dyn MessageCipher>, messages: Vec<Message>) -> Vec<Message> {
    let total = messages.len();
    let tasks = messages.into_iter().map(|mut message| {
        let cipher = Arc::clone(cipher);
        async move {
            if message.decrypted_text.is_some() {
                trace!("Skipping decryption for message already carrying plaintext");
                return message;
            }
            match cipher.decrypt(&message).await {
                Ok(plaintext) => message.decrypted_text = Some(plaintext),
                Err(e) => {
                    // Isolated per message; the rest of the window proceeds.
                    debug!(
                        "Failed to decrypt message from {} at {}: {:#}",
                        message.sender_id, message.timestamp_nanos, e
                    );
                }
            }
            message
        }
    });

    let decrypted = future::join_all(tasks).await;
    debug!(
        "Decryption pass finished: {}/{} messages have plaintext",
        decrypted.iter().filter(|m| m.decrypted_text.is_some()).count(),
        total
    );
    decrypted
}
