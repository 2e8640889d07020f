//! The message thread view engine.
//!
//! One [`ThreadView`] per open conversation owns the thread history, the
//! materialized window, the paginator and the day sections as a single unit;
//! every state transition goes through its methods so pagination and
//! optimistic sends can never interleave on partial state.

pub mod decryption;
pub mod grouping;
pub mod paginator;
pub mod sender;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use log::{debug, info};

use crate::api::{ErrorReporter, MessageApi, MessageFetchOptions};
use crate::crypto::MessageCipher;
use crate::models::{ContactThread, Section, Window, DEFAULT_BATCH_SIZE};
use decryption::decrypt_all;
use grouping::group_into_sections;
use paginator::Paginator;
use sender::OutgoingSend;

/// Number of contact threads requested on a history refresh.
const HISTORY_FETCH_COUNT: usize = 25;

/// Cancellation token for one open thread view.
///
/// Every asynchronous completion checks the token before applying results;
/// a completion arriving after teardown is discarded without effect. There
/// is no cancellation of the in-flight request itself, only a best-effort
/// discard on resumption.
#[derive(Debug, Clone)]
pub struct LivenessToken(Arc<AtomicBool>);

impl LivenessToken {
    pub fn new() -> Self {
        LivenessToken(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for LivenessToken {
    fn default() -> Self {
        LivenessToken::new()
    }
}

/// Screen-level controller for one encrypted direct-message thread.
pub struct ThreadView {
    api: Arc<dyn MessageApi>,
    cipher: Arc<dyn MessageCipher>,
    reporter: Arc<dyn ErrorReporter>,
    owner_id: String,
    thread: ContactThread,
    window: Window,
    paginator: Paginator,
    sections: Vec<Section>,
    liveness: LivenessToken,
    loading: bool,
}

impl ThreadView {
    /// Build a view over a thread that the conversation list already holds.
    /// Nothing is materialized until [`open`](Self::open) runs.
    pub fn new(
        api: Arc<dyn MessageApi>,
        cipher: Arc<dyn MessageCipher>,
        reporter: Arc<dyn ErrorReporter>,
        owner_id: &str,
        thread: ContactThread,
        batch_size: usize,
    ) -> Self {
        ThreadView {
            api,
            cipher,
            reporter,
            owner_id: owner_id.to_string(),
            thread,
            window: Window::default(),
            paginator: Paginator::new(batch_size),
            sections: Vec::new(),
            liveness: LivenessToken::new(),
            loading: true,
        }
    }

    /// Convenience constructor with the default batch size and log-backed
    /// error reporting.
    pub fn open_default(
        api: Arc<dyn MessageApi>,
        cipher: Arc<dyn MessageCipher>,
        owner_id: &str,
        thread: ContactThread,
    ) -> Self {
        ThreadView::new(
            api,
            cipher,
            Arc::new(crate::api::LogReporter),
            owner_id,
            thread,
            DEFAULT_BATCH_SIZE,
        )
    }

    /// Materialize the initial window.
    ///
    /// With `refresh` the full per-contact histories are re-fetched and the
    /// counterparty's entry replaces the thread we were handed; other
    /// entries in the response are ignored. A fetch failure is reported once
    /// and leaves the view in its prior loading state — degraded, not
    /// crashed.
    pub async fn open(&mut self, refresh: bool) {
        if refresh {
            let options = MessageFetchOptions::new().with_count(HISTORY_FETCH_COUNT);
            match self.api.get_messages(&self.owner_id, options).await {
                Ok(threads) => {
                    if !self.liveness.is_live() {
                        debug!("Discarding history fetch after teardown");
                        return;
                    }
                    if let Some(fresh) = threads
                        .into_iter()
                        .find(|t| t.contact_id == self.thread.contact_id)
                    {
                        debug!(
                            "Refreshed thread with {}: {} messages",
                            fresh.contact_id,
                            fresh.len()
                        );
                        self.thread = fresh;
                    }
                }
                Err(e) => {
                    self.reporter.report("Failed to fetch message history", &e);
                    return;
                }
            }
        }

        let window = self.paginator.initialize(&self.thread);
        if self.apply_window(window).await {
            self.loading = false;
            info!(
                "Opened thread with {}: {} sections over {} messages",
                self.thread.contact_id,
                self.sections.len(),
                self.window.len()
            );
        }
    }

    /// Extend the window backward by one batch ("load more").
    ///
    /// Silent no-op when history is exhausted or another load is in flight.
    /// The extended window is re-grouped and re-decrypted as a whole;
    /// already-decrypted messages pass through the pipeline untouched.
    pub async fn load_more(&mut self) {
        let window = match self.paginator.begin_load_more(&self.thread, &self.window) {
            Some(window) => window,
            None => return,
        };

        self.apply_window(window).await;
        self.paginator.finish_load();
    }

    /// Send a message: optimistic injection first, network round trip after.
    ///
    /// The injected message is visible in the "Today" section before any
    /// asynchronous step runs. A failure anywhere in encrypt/send/sign/
    /// submit is reported once; the optimistic message stays in place with
    /// no failure marker.
    pub async fn send_message(&mut self, text: &str) {
        let mut send = OutgoingSend::compose(&self.owner_id, &self.thread.contact_id, text);
        send.inject_into(&mut self.sections, &mut self.window, &mut self.thread);

        if let Err(e) = send.transmit(&self.api, &self.cipher).await {
            self.reporter.report("Failed to send message", &e);
        }
    }

    /// Tear the view down. Late async completions will be discarded.
    pub fn close(&self) {
        self.liveness.cancel();
    }

    /// Clone of the view's cancellation token, for the surrounding screen.
    pub fn liveness(&self) -> LivenessToken {
        self.liveness.clone()
    }

    /// The renderable day sections, newest-day-first.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn thread(&self) -> &ContactThread {
        &self.thread
    }

    pub fn contact_id(&self) -> &str {
        &self.thread.contact_id
    }

    /// True until the initial window has been materialized.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_loading_more(&self) -> bool {
        self.paginator.is_loading()
    }

    pub fn is_exhausted(&self) -> bool {
        self.paginator.is_exhausted()
    }

    /// Decrypt the window and rebuild the sections from scratch, as one
    /// atomic update. Returns false when the result was discarded because
    /// the view was torn down mid-flight.
    async fn apply_window(&mut self, window: Window) -> bool {
        let decrypted = decrypt_all(&self.cipher, window.messages).await;

        if !self.liveness.is_live() {
            debug!("Discarding window rebuild after teardown");
            return false;
        }

        self.window = Window { messages: decrypted };
        self.sections = group_into_sections(&self.window.messages, Local::now().date_naive());
        true
    }
}
