//! Debounced address-bar writes.
//!
//! Every filter change asks for the URL to be updated, but typing in the
//! search box would otherwise push one history entry per keystroke. Writes
//! are scheduled on a delay; scheduling again replaces the pending write, so
//! only the state left after a quiet period reaches the history.

use crate::filter::FilterState;
use crate::query::{merge_into_query, same_query};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default quiet period before a filter change is written to the URL.
pub const DEFAULT_URL_DEBOUNCE: Duration = Duration::from_millis(1000);

/// The browser history / address bar as seen by the page.
pub trait HistorySink: Send + Sync + 'static {
    /// Query string of the current location, without the leading `?`.
    fn current_query(&self) -> String;

    /// Push a new history entry with the given query.
    fn push_state(&self, query: String);
}

/// In-process history: the current query plus every pushed entry.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    current: Mutex<String>,
    entries: Mutex<Vec<String>>,
}

impl MemoryHistory {
    pub fn new(initial_query: impl Into<String>) -> Self {
        Self {
            current: Mutex::new(initial_query.into().trim_start_matches('?').to_string()),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Entries pushed so far, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl HistorySink for MemoryHistory {
    fn current_query(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push_state(&self, query: String) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = query.clone();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query);
    }
}

/// Merge `state` into the sink's current query and push it when it changed.
/// Returns whether an entry was pushed.
pub fn write_state<S: HistorySink + ?Sized>(sink: &S, state: &FilterState) -> bool {
    let current = sink.current_query();
    let query = merge_into_query(&current, state);
    if same_query(&query, &current) {
        return false;
    }
    debug!(%query, "pushing filter state to history");
    sink.push_state(query);
    true
}

struct PendingWrite {
    state: FilterState,
    handle: JoinHandle<()>,
}

/// Schedules URL writes, keeping at most one pending.
pub struct DebouncedUrlWriter<S: HistorySink> {
    sink: Arc<S>,
    delay: Duration,
    pending: Option<PendingWrite>,
}

impl<S: HistorySink> DebouncedUrlWriter<S> {
    pub fn new(sink: Arc<S>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            pending: None,
        }
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a write of `state`, replacing any pending one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, state: FilterState) {
        self.cancel();

        let sink = Arc::clone(&self.sink);
        let delay = self.delay;
        let pending_state = state.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            write_state(&*sink, &pending_state);
        });

        self.pending = Some(PendingWrite { state, handle });
    }

    /// Drop the pending write, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }

    /// Write the pending state now instead of after the delay.
    pub fn flush(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                write_state(&*self.sink, &pending.state)
            }
            None => false,
        }
    }

    /// Whether a write is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.handle.is_finished())
    }
}

impl<S: HistorySink> Drop for DebouncedUrlWriter<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}
