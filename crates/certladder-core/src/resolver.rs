//! Level resolution: `(step, score)` → resulting level and advancement.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::level::{AssessmentStep, CompetencyLevel};
use crate::scoring::Percentage;
use crate::thresholds::{BandKind, ThresholdTable};

/// Outcome of resolving a score against the threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The band the score fell into.
    pub band: BandKind,
    /// Recommended level; `None` means the pre-assessment level stands.
    pub level: Option<CompetencyLevel>,
    pub can_advance: bool,
    /// Always `None` on the final step.
    pub next_step: Option<AssessmentStep>,
}

impl Resolution {
    /// The recommended level, treating "no level" as unrated.
    pub fn level_or_unrated(&self) -> CompetencyLevel {
        self.level.unwrap_or_default()
    }
}

/// Look up the band for `score` on `step` and return its outcome.
///
/// Fails with [`AssessmentError::Configuration`](crate::error::AssessmentError)
/// only if the table has no matching band.
pub fn resolve(table: &ThresholdTable, step: AssessmentStep, score: Percentage) -> Result<Resolution> {
    let band = table.band_for(step, score)?;
    let can_advance = band.can_advance && !step.is_final();
    let next_step = if can_advance {
        band.next_step.or(step.next())
    } else {
        None
    };

    tracing::debug!(%step, score, band = %band.kind, level = ?band.level, can_advance, "resolved score");

    Ok(Resolution {
        band: band.kind,
        level: band.level,
        can_advance,
        next_step,
    })
}
