//! Progression gate and level application policy.

use serde::{Deserialize, Serialize};

use crate::level::{AssessmentStep, CompetencyLevel};

/// The next step a learner at `current` may take, or `None` at the ceiling.
pub fn next_eligible_step(current: CompetencyLevel) -> Option<AssessmentStep> {
    match current {
        CompetencyLevel::Unrated => Some(AssessmentStep::One),
        CompetencyLevel::A1 | CompetencyLevel::A2 => Some(AssessmentStep::Two),
        CompetencyLevel::B1 | CompetencyLevel::B2 => Some(AssessmentStep::Three),
        CompetencyLevel::C1 | CompetencyLevel::C2 => None,
    }
}

/// Gate applied to an untrusted stored level string.
///
/// Unrecognised values fall back to Step 1.
pub fn next_eligible_step_raw(raw: &str) -> Option<AssessmentStep> {
    match raw.parse::<CompetencyLevel>() {
        Ok(level) => next_eligible_step(level),
        Err(e) => {
            tracing::warn!("{e}; defaulting to {}", AssessmentStep::One);
            Some(AssessmentStep::One)
        }
    }
}

/// How a recommended level is applied to a learner's stored level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelPolicy {
    /// Never lower an already certified level.
    #[default]
    KeepHighest,
    /// Apply the recommendation as-is, allowing regression.
    Unconditional,
}

/// The level a learner should hold after an attempt.
///
/// A recommendation of `None` leaves `prior` untouched under every policy.
pub fn apply_level_policy(
    prior: CompetencyLevel,
    recommended: Option<CompetencyLevel>,
    policy: LevelPolicy,
) -> CompetencyLevel {
    match (recommended, policy) {
        (None, _) => prior,
        (Some(level), LevelPolicy::Unconditional) => level,
        (Some(level), LevelPolicy::KeepHighest) => level.max(prior),
    }
}
