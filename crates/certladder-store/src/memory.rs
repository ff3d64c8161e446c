//! In-memory results store and identity provider.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use certladder_core::level::CompetencyLevel;
use certladder_core::model::{AttemptOutcome, AttemptRecord};
use certladder_core::progression::{apply_level_policy, LevelPolicy};
use certladder_core::traits::{IdentityProvider, ResultsStore};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps every recorded attempt in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryResultsStore {
    records: Mutex<Vec<AttemptRecord>>,
}

impl MemoryResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records.
    pub fn records(&self) -> Vec<AttemptRecord> {
        guard(&self.records).clone()
    }

    /// Records belonging to one learner.
    pub fn records_for(&self, learner_id: &str) -> Vec<AttemptRecord> {
        guard(&self.records)
            .iter()
            .filter(|r| r.learner_id == learner_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        guard(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultsStore for MemoryResultsStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record(&self, record: &AttemptRecord) -> anyhow::Result<()> {
        tracing::debug!(attempt_id = %record.attempt_id, learner = %record.learner_id, "storing record in memory");
        guard(&self.records).push(record.clone());
        Ok(())
    }
}

/// In-memory learner level store.
///
/// Learners never seen before are reported as [`CompetencyLevel::Unrated`].
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    levels: Mutex<HashMap<String, CompetencyLevel>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a learner's stored level.
    pub fn with_level(self, learner_id: impl Into<String>, level: CompetencyLevel) -> Self {
        guard(&self.levels).insert(learner_id.into(), level);
        self
    }

    /// The stored level, without going through the async trait.
    pub fn level_of(&self, learner_id: &str) -> CompetencyLevel {
        guard(&self.levels)
            .get(learner_id)
            .copied()
            .unwrap_or_default()
    }

    /// Overwrite a learner's stored level.
    pub fn set_level(&self, learner_id: &str, level: CompetencyLevel) {
        guard(&self.levels).insert(learner_id.to_string(), level);
    }

    /// Apply an attempt's recommended level under `policy` and return the
    /// level now stored for the learner.
    pub fn apply_outcome(
        &self,
        learner_id: &str,
        outcome: &AttemptOutcome,
        policy: LevelPolicy,
    ) -> CompetencyLevel {
        let mut levels = guard(&self.levels);
        let prior = levels.get(learner_id).copied().unwrap_or_default();
        let updated = apply_level_policy(prior, outcome.level, policy);
        levels.insert(learner_id.to_string(), updated);

        if updated != prior {
            tracing::info!(learner = learner_id, %prior, %updated, ?policy, "learner level updated");
        } else {
            tracing::debug!(learner = learner_id, level = %prior, ?policy, "learner level unchanged");
        }
        updated
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_level(&self, learner_id: &str) -> anyhow::Result<CompetencyLevel> {
        Ok(self.level_of(learner_id))
    }
}
