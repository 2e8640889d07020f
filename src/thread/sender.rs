use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use log::{debug, info};
use uuid::Uuid;

use crate::api::MessageApi;
use crate::crypto::MessageCipher;
use crate::models::{ContactThread, Message, Section, Window};
use crate::thread::grouping::TODAY_LABEL;

/// Lifecycle of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Composing,
    Injected,
    Encrypting,
    Submitting,
    Confirmed,
    Failed,
}

/// One outgoing send: the locally synthesized message plus where the
/// attempt currently stands.
///
/// Injection is synchronous and immediately observable; the network round
/// trip (encrypt, hand off, sign, submit) happens afterwards. A failed round
/// trip is reported by the caller but never retracts the injected message.
#[derive(Debug)]
pub struct OutgoingSend {
    pub id: Uuid,
    pub phase: SendPhase,
    pub message: Message,
}

/// Current wall-clock time in nanoseconds. A clock before the epoch
/// collapses to 0 rather than panicking.
pub fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

impl OutgoingSend {
    /// Synthesize the outgoing message from the typed text. The plaintext is
    /// already known, so the decryption pipeline never touches it.
    pub fn compose(owner_id: &str, contact_id: &str, text: &str) -> Self {
        OutgoingSend {
            id: Uuid::new_v4(),
            phase: SendPhase::Composing,
            message: Message {
                sender_id: owner_id.to_string(),
                recipient_id: contact_id.to_string(),
                timestamp_nanos: now_nanos(),
                encrypted_text: String::new(),
                decrypted_text: Some(text.to_string()),
                is_outgoing: true,
                last_of_run: true,
            },
        }
    }

    /// Insert the message ahead of network confirmation.
    ///
    /// The message lands at the head of the "Today" section (created at the
    /// front if absent). The previous head loses its run flag only if it was
    /// also outgoing, since the new message extends that run. The underlying
    /// thread sequence and the window both receive the message at their
    /// chronological end.
    pub fn inject_into(
        &mut self,
        sections: &mut Vec<Section>,
        window: &mut Window,
        thread: &mut ContactThread,
    ) {
        debug!("Injecting optimistic message {} into {}", self.id, thread.contact_id);

        if sections.first().map(|s| s.label.as_str()) != Some(TODAY_LABEL) {
            sections.insert(
                0,
                Section {
                    label: TODAY_LABEL.to_string(),
                    messages: Vec::new(),
                },
            );
        }
        let today = &mut sections[0];
        if let Some(head) = today.messages.first_mut() {
            if head.is_outgoing {
                head.last_of_run = false;
            }
        }
        today.messages.insert(0, self.message.clone());

        window.messages.push(self.message.clone());
        thread.messages.push(self.message.clone());
        self.phase = SendPhase::Injected;
    }

    /// Drive the network round trip: encrypt for the counterparty, hand the
    /// payload to the backend, sign the resulting transaction, submit it.
    ///
    /// On error the phase moves to `Failed` and the error is returned for
    /// reporting; local state is deliberately left alone.
    pub async fn transmit(
        &mut self,
        api: &Arc<dyn MessageApi>,
        cipher: &Arc<dyn MessageCipher>,
    ) -> Result<()> {
        let result = self.transmit_inner(api, cipher).await;
        match &result {
            Ok(()) => {
                self.phase = SendPhase::Confirmed;
                info!("Send {} confirmed", self.id);
            }
            Err(e) => {
                self.phase = SendPhase::Failed;
                debug!("Send {} failed: {:#}", self.id, e);
            }
        }
        result
    }

    async fn transmit_inner(
        &mut self,
        api: &Arc<dyn MessageApi>,
        cipher: &Arc<dyn MessageCipher>,
    ) -> Result<()> {
        let plaintext = self.message.decrypted_text.clone().unwrap_or_default();

        self.phase = SendPhase::Encrypting;
        let encrypted = cipher.encrypt(&self.message.recipient_id, &plaintext).await?;

        self.phase = SendPhase::Submitting;
        let unsigned = api
            .send_message(&self.message.sender_id, &self.message.recipient_id, &encrypted)
            .await?;
        let signed = cipher.sign(&unsigned.transaction_hex).await?;
        api.submit_transaction(&signed).await?;
        Ok(())
    }
}
