// Common test utilities for integration tests
// This module contains shared code for all integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveTime, TimeZone};
use log::LevelFilter;

use cipherbox::api::{ErrorReporter, MessageApi, MessageFetchOptions, UnsignedTransaction};
use cipherbox::crypto::MessageCipher;
use cipherbox::models::{ContactThread, Message};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

/// Backend stub: serves canned threads and records the send/submit traffic.
pub struct MockApi {
    pub threads: Mutex<Vec<ContactThread>>,
    pub fail_fetch: AtomicBool,
    pub fail_submit: AtomicBool,
    pub fetches: AtomicUsize,
    /// (sender, recipient, encrypted payload) per send_message call
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub submitted: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new(threads: Vec<ContactThread>) -> Self {
        MockApi {
            threads: Mutex::new(threads),
            fail_fetch: AtomicBool::new(false),
            fail_submit: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MessageApi for MockApi {
    async fn get_messages(
        &self,
        _owner_id: &str,
        _options: MessageFetchOptions,
    ) -> Result<Vec<ContactThread>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(anyhow!("Backend unavailable"));
        }
        Ok(self.threads.lock().unwrap().clone())
    }

    async fn send_message(
        &self,
        sender_id: &str,
        recipient_id: &str,
        encrypted_text: &str,
    ) -> Result<UnsignedTransaction> {
        self.sent.lock().unwrap().push((
            sender_id.to_string(),
            recipient_id.to_string(),
            encrypted_text.to_string(),
        ));
        Ok(UnsignedTransaction {
            transaction_hex: "deadbeef".to_string(),
        })
    }

    async fn submit_transaction(&self, signed_transaction_hex: &str) -> Result<()> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(anyhow!("Node rejected the transaction"));
        }
        self.submitted
            .lock()
            .unwrap()
            .push(signed_transaction_hex.to_string());
        Ok(())
    }

    async fn mark_messages_read(&self, _owner_id: &str, _contact_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Cipher stub: "encryption" is a reversible prefix, so tests can assert on
/// plaintext without key setup. Payloads without the prefix fail to decrypt.
pub struct PrefixCipher;

#[async_trait]
impl MessageCipher for PrefixCipher {
    async fn decrypt(&self, message: &Message) -> Result<String> {
        message
            .encrypted_text
            .strip_prefix("enc:")
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Unknown payload format"))
    }

    async fn encrypt(&self, _recipient_id: &str, plaintext: &str) -> Result<String> {
        Ok(format!("enc:{}", plaintext))
    }

    async fn sign(&self, transaction_hex: &str) -> Result<String> {
        Ok(format!("{}:signed", transaction_hex))
    }
}

/// Error reporter that counts reports and remembers their contexts.
pub struct CountingReporter {
    pub reports: Mutex<Vec<String>>,
}

impl CountingReporter {
    pub fn new() -> Self {
        CountingReporter {
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

impl ErrorReporter for CountingReporter {
    fn report(&self, context: &str, _error: &anyhow::Error) {
        self.reports.lock().unwrap().push(context.to_string());
    }
}

/// Nanosecond timestamp for a local date and time of day.
pub fn nanos_on(date: NaiveDate, hour: u32, minute: u32) -> u64 {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();
    let local = Local
        .from_local_datetime(&date.and_time(time))
        .single()
        .expect("unambiguous local time");
    local.timestamp() as u64 * 1_000_000_000
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// An incoming message from `contact`, encrypted in PrefixCipher form.
pub fn incoming(contact: &str, plaintext: &str, timestamp_nanos: u64) -> Message {
    Message {
        sender_id: contact.to_string(),
        recipient_id: "me".to_string(),
        timestamp_nanos,
        encrypted_text: format!("enc:{}", plaintext),
        decrypted_text: None,
        is_outgoing: false,
        last_of_run: false,
    }
}

/// An outgoing message to `contact`, encrypted in PrefixCipher form.
pub fn outgoing(contact: &str, plaintext: &str, timestamp_nanos: u64) -> Message {
    Message {
        sender_id: "me".to_string(),
        recipient_id: contact.to_string(),
        timestamp_nanos,
        encrypted_text: format!("enc:{}", plaintext),
        decrypted_text: None,
        is_outgoing: true,
        last_of_run: false,
    }
}

/// A thread of `count` alternating messages, all timestamped today, one
/// minute apart starting at 08:00 local time.
pub fn alternating_thread(contact: &str, count: usize) -> ContactThread {
    let mut thread = ContactThread::new(contact);
    for i in 0..count {
        let ts = nanos_on(today(), 8, 0) + i as u64 * 60_000_000_000;
        let message = if i % 2 == 0 {
            incoming(contact, &format!("msg-{}", i), ts)
        } else {
            outgoing(contact, &format!("msg-{}", i), ts)
        };
        thread.messages.push(message);
    }
    thread
}

/// Flatten sections back to chronological order (oldest first).
pub fn flatten_chronological(sections: &[cipherbox::models::Section]) -> Vec<Message> {
    sections
        .iter()
        .rev()
        .flat_map(|s| s.messages.iter().rev().cloned())
        .collect()
}
