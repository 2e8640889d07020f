// Collaborator boundary for the message backend.
//
// The engine never talks HTTP itself; it consumes this trait and leaves the
// transport, retry and timeout policy to the implementation.

use anyhow::Result;
use async_trait::async_trait;
use log::error;
use serde::{Deserialize, Serialize};

use crate::models::ContactThread;

/// Sort algorithms the backend accepts for message history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortAlgorithm {
    Time,
    Holders,
    Clout,
    Followers,
}

/// Options for a message history fetch.
#[derive(Debug, Clone, Serialize)]
pub struct MessageFetchOptions {
    pub followers_only: bool,
    pub following_only: bool,
    pub holders_only: bool,
    pub holdings_only: bool,
    pub num_to_fetch: usize,
    pub sort_algorithm: SortAlgorithm,
    /// Pagination key: fetch threads after this contact public key.
    pub fetch_after_public_key: Option<String>,
}

impl MessageFetchOptions {
    pub fn new() -> Self {
        MessageFetchOptions {
            followers_only: false,
            following_only: false,
            holders_only: false,
            holdings_only: false,
            num_to_fetch: 25, // Default count
            sort_algorithm: SortAlgorithm::Time,
            fetch_after_public_key: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.num_to_fetch = count;
        self
    }

    pub fn with_sort(mut self, sort: SortAlgorithm) -> Self {
        self.sort_algorithm = sort;
        self
    }

    pub fn with_fetch_after(mut self, public_key: &str) -> Self {
        self.fetch_after_public_key = Some(public_key.to_string());
        self
    }
}

impl Default for MessageFetchOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// An unsigned transaction returned by the backend for an outgoing message.
/// It must be signed locally and submitted back before the send is final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub transaction_hex: String,
}

/// Message backend operations the engine depends on.
///
/// Failures surface as generic errors; the engine reports them once and does
/// not retry.
#[async_trait]
pub trait MessageApi: Send + Sync {
    /// Fetch full per-contact message histories for `owner_id`. The caller
    /// locates its counterparty's entry by identifier and ignores the rest.
    async fn get_messages(
        &self,
        owner_id: &str,
        options: MessageFetchOptions,
    ) -> Result<Vec<ContactThread>>;

    /// Hand the encrypted payload to the backend. Returns the unsigned
    /// transaction that still needs a local signature.
    async fn send_message(
        &self,
        sender_id: &str,
        recipient_id: &str,
        encrypted_text: &str,
    ) -> Result<UnsignedTransaction>;

    /// Submit a signed transaction for confirmation.
    async fn submit_transaction(&self, signed_transaction_hex: &str) -> Result<()>;

    /// Persist the read-position marker for a contact. Invoked by the
    /// surrounding screens, not by the thread view itself.
    async fn mark_messages_read(&self, owner_id: &str, contact_id: &str) -> Result<()>;
}

/// Sink for errors the engine cannot act on locally (fetch failures, send
/// failures). One report per failure; the view state is left as it was.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &str, error: &anyhow::Error);
}

/// Default reporter: forward to the log.
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, context: &str, error: &anyhow::Error) {
        error!("{}: {:#}", context, error);
    }
}
