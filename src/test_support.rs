//! Shared test support utilities
//!
//! Provides `RecordingSink`, an `EntrySink` that keeps every entry in memory
//! for use in unit and integration tests.

use crate::client::ClientError;
use crate::domain::Entry;
use crate::sink::EntrySink;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock sink that captures logged entries. Clones share the captured state.
#[derive(Clone, Default)]
pub struct RecordingSink {
    entries: Arc<Mutex<Vec<Entry>>>,
    flush_error: Arc<Mutex<Option<ClientError>>>,
    flushes: Arc<AtomicUsize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().clone()
    }

    /// Makes the next flush return `error`.
    pub fn fail_next_flush(&self, error: ClientError) {
        *self.flush_error.lock() = Some(error);
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl EntrySink for RecordingSink {
    fn log(&self, entry: Entry) {
        self.entries.lock().push(entry);
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        Box::pin(async move {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            match self.flush_error.lock().take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        })
    }
}
