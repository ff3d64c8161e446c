//! Assessment engine error types.
//!
//! `Configuration` and `Index` are contract violations: they indicate a
//! broken threshold table or a caller bug and are never swallowed.
//! `Submission` is surfaced for user-visible retry and never reverts the
//! attempt's local state.

use thiserror::Error;

use crate::model::AttemptStatus;

/// Errors raised by the assessment engine.
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// The threshold table is incomplete or inconsistent.
    #[error("threshold configuration error: {0}")]
    Configuration(String),

    /// An answer was selected for a question outside the attempt.
    #[error("question index {index} out of range for attempt with {len} questions")]
    Index { index: usize, len: usize },

    /// The results store failed to accept a finalized outcome.
    #[error("results store rejected submission: {0}")]
    Submission(String),

    /// An operation was invoked in a state that does not permit it.
    #[error("cannot {operation} while attempt is {status}")]
    InvalidState {
        operation: &'static str,
        status: AttemptStatus,
    },
}

impl AssessmentError {
    /// Returns `true` for errors that indicate a programming or configuration
    /// bug rather than a runtime failure of an external collaborator.
    pub fn is_contract_violation(&self) -> bool {
        !matches!(self, AssessmentError::Submission(_))
    }
}

pub type Result<T> = std::result::Result<T, AssessmentError>;
