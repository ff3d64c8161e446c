//! Trait seams for the collaborators the engine does not implement.
//!
//! The results store, question source and identity provider live outside
//! the core. The store crate and the CLI supply implementations.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::level::{AssessmentStep, CompetencyLevel};
use crate::model::{AttemptOutcome, AttemptRecord, AttemptStatus, Question, QuestionBank};

// ---------------------------------------------------------------------------
// Results store
// ---------------------------------------------------------------------------

/// Persists finalized attempt records. Implementations must not retry.
#[async_trait]
pub trait ResultsStore: Send + Sync {
    /// Human-readable backend name (e.g. "memory").
    fn name(&self) -> &str;

    /// Persist one finalized record.
    async fn record(&self, record: &AttemptRecord) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Question source
// ---------------------------------------------------------------------------

/// Supplies the ordered question list for a step.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn questions_for(&self, step: AssessmentStep) -> anyhow::Result<Vec<Question>>;
}

/// A question source over banks already loaded in memory.
#[derive(Debug, Clone, Default)]
pub struct BankQuestionSource {
    banks: HashMap<AssessmentStep, QuestionBank>,
}

impl BankQuestionSource {
    /// Build from banks; a later bank for the same step replaces an earlier one.
    pub fn new(banks: impl IntoIterator<Item = QuestionBank>) -> Self {
        Self {
            banks: banks.into_iter().map(|b| (b.step, b)).collect(),
        }
    }

    pub fn bank(&self, step: AssessmentStep) -> Option<&QuestionBank> {
        self.banks.get(&step)
    }
}

#[async_trait]
impl QuestionSource for BankQuestionSource {
    async fn questions_for(&self, step: AssessmentStep) -> anyhow::Result<Vec<Question>> {
        self.banks
            .get(&step)
            .map(|b| b.questions.clone())
            .with_context(|| format!("no question bank loaded for {step}"))
    }
}

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

/// Supplies a learner's stored level at attempt start.
///
/// The engine never writes to it; it only returns recommendations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_level(&self, learner_id: &str) -> anyhow::Result<CompetencyLevel>;
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Receives attempt lifecycle notifications.
///
/// Callbacks run after the coordinator releases its state lock, so an
/// observer may read the attempt back (`status()`, `answers()`) directly.
pub trait AttemptObserver: Send + Sync {
    fn on_status_change(&self, attempt_id: Uuid, from: AttemptStatus, to: AttemptStatus);
    fn on_submitted(&self, attempt_id: Uuid, outcome: &AttemptOutcome);
}

/// Observer that ignores every notification.
pub struct NoopObserver;

impl AttemptObserver for NoopObserver {
    fn on_status_change(&self, _: Uuid, _: AttemptStatus, _: AttemptStatus) {}
    fn on_submitted(&self, _: Uuid, _: &AttemptOutcome) {}
}
