//! Store error types.

use thiserror::Error;

/// Errors that can occur when persisting attempt records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be opened or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refused the record.
    #[error("record rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Whether resubmitting the same record cannot succeed.
    ///
    /// I/O failures may be transient (a full disk, a locked file); the
    /// other variants will fail the same way again.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, StoreError::Io(_))
    }
}
