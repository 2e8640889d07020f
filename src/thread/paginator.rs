use log::{debug, trace};

use crate::models::{ContactThread, Window, DEFAULT_BATCH_SIZE};

/// Owner of the window cursor.
///
/// The cursor is the index of the oldest materialized message in the source
/// thread; it only ever moves backward (toward 0). The paginator also holds
/// the one mutual-exclusion latch in the engine: at most one load may be in
/// flight at a time, so rapid scroll events cannot double-extend the window.
#[derive(Debug)]
pub struct Paginator {
    cursor: usize,
    batch_size: usize,
    exhausted: bool,
    loading: bool,
}

impl Paginator {
    pub fn new(batch_size: usize) -> Self {
        Paginator {
            cursor: 0,
            batch_size,
            exhausted: false,
            loading: false,
        }
    }

    /// Materialize the initial window: the trailing `batch_size` messages,
    /// or the whole thread (already exhausted) when it is shorter than one
    /// batch.
    pub fn initialize(&mut self, thread: &ContactThread) -> Window {
        let total = thread.messages.len();
        self.cursor = total.saturating_sub(self.batch_size);
        self.exhausted = total <= self.batch_size;
        self.loading = false;
        debug!(
            "Initialized window for {}: {} of {} messages, cursor {}, exhausted {}",
            thread.contact_id,
            total - self.cursor,
            total,
            self.cursor,
            self.exhausted
        );

        Window {
            messages: thread.messages[self.cursor..].to_vec(),
        }
    }

    /// Extend the window backward by one batch.
    ///
    /// Returns `None` without touching any state when history is exhausted
    /// or another load is still in flight; both conditions are silent
    /// no-ops. On success the in-flight latch is set and must be released
    /// with [`finish_load`](Self::finish_load) once the caller has applied
    /// (or discarded) the result.
    pub fn begin_load_more(&mut self, thread: &ContactThread, window: &Window) -> Option<Window> {
        if self.exhausted || self.loading {
            trace!(
                "Ignoring load_more (exhausted={}, loading={})",
                self.exhausted,
                self.loading
            );
            return None;
        }
        self.loading = true;

        let start = self.cursor.saturating_sub(self.batch_size);
        let mut messages = thread.messages[start..self.cursor].to_vec();
        messages.extend_from_slice(&window.messages);
        self.exhausted = start == 0;
        debug!(
            "Extending window: [{}, {}) prepended, cursor {} -> {}, exhausted {}",
            start, self.cursor, self.cursor, start, self.exhausted
        );
        self.cursor = start;

        Some(Window { messages })
    }

    /// Release the in-flight latch after a load completed or was discarded.
    pub fn finish_load(&mut self) {
        self.loading = false;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Paginator::new(DEFAULT_BATCH_SIZE)
    }
}
