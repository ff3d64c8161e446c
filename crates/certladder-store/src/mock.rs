//! Mock results store for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use certladder_core::model::AttemptRecord;
use certladder_core::traits::ResultsStore;

use crate::error::StoreError;

/// A results store that records calls instead of persisting anything.
///
/// Used to check that an attempt is forwarded at most once, and to drive
/// the coordinator's failure path.
pub struct MockResultsStore {
    /// Rejection message returned on every call, if set.
    failure: Mutex<Option<String>>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last record received.
    last_record: Mutex<Option<AttemptRecord>>,
}

impl MockResultsStore {
    /// Create a mock that accepts every record.
    pub fn new() -> Self {
        Self {
            failure: Mutex::new(None),
            call_count: AtomicU32::new(0),
            last_record: Mutex::new(None),
        }
    }

    /// Create a mock that rejects every record with `message`.
    pub fn failing(message: &str) -> Self {
        let store = Self::new();
        store.set_failure(Some(message));
        store
    }

    /// Start or stop rejecting records.
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock().unwrap() = message.map(str::to_string);
    }

    /// Get the number of calls made to this store.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get the last record passed to this store, accepted or not.
    pub fn last_record(&self) -> Option<AttemptRecord> {
        self.last_record.lock().unwrap().clone()
    }
}

impl Default for MockResultsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultsStore for MockResultsStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn record(&self, record: &AttemptRecord) -> anyhow::Result<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_record.lock().unwrap() = Some(record.clone());

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(StoreError::Rejected(message).into());
        }
        Ok(())
    }
}
