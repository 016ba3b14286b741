//! Scoped write-context tokens.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Open-token bookkeeping shared by a context and its write contexts.
#[derive(Debug, Default)]
pub(crate) struct WriteTracker {
    state: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    next_token: u64,
    open: BTreeSet<u64>,
}

impl WriteTracker {
    pub(crate) fn open(self: &Arc<Self>) -> WriteContext {
        let mut state = self.state.lock();
        state.next_token += 1;
        let token = state.next_token;
        state.open.insert(token);
        WriteContext {
            tracker: Arc::clone(self),
            token,
        }
    }

    /// Releases `token`; returns `None` when it was not open.
    pub(crate) fn release(&self, token: u64) -> Option<usize> {
        let mut state = self.state.lock();
        if state.open.remove(&token) {
            Some(state.open.len())
        } else {
            None
        }
    }

    pub(crate) fn release_all(&self) {
        self.state.lock().open.clear();
    }

    #[cfg(test)]
    pub(crate) fn open_count(&self) -> usize {
        self.state.lock().open.len()
    }
}

/// Scoped batch of pending writes.
///
/// Commit it through the context (or repository) that opened it. Dropping an
/// uncommitted write context releases it without flushing.
#[derive(Debug)]
pub struct WriteContext {
    tracker: Arc<WriteTracker>,
    token: u64,
}

impl WriteContext {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub(crate) fn belongs_to(&self, tracker: &Arc<WriteTracker>) -> bool {
        Arc::ptr_eq(&self.tracker, tracker)
    }
}

impl Drop for WriteContext {
    fn drop(&mut self) {
        self.tracker.release(self.token);
    }
}
