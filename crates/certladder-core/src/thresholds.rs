//! Threshold table: per-step levels, question quotas and score bands.
//!
//! The table is pure data. Custom tables can be loaded from TOML but are
//! always validated for band completeness before they are handed out, so
//! every score in `[0, 100]` matches exactly one band.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{AssessmentError, Result};
use crate::level::{AssessmentStep, CompetencyLevel};
use crate::scoring::Percentage;

/// Score below which an attempt fails.
pub const FAIL_THRESHOLD: f64 = 25.0;
/// Lower bound of the band awarding a step's upper level.
pub const INTERMEDIATE_THRESHOLD: f64 = 50.0;
/// Lower bound of the band allowing the learner to advance.
pub const ADVANCE_THRESHOLD: f64 = 75.0;
/// Questions drawn for each of a step's two levels.
pub const QUESTIONS_PER_LEVEL: u32 = 22;

/// The four band kinds, in ascending score order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandKind {
    Fail,
    Low,
    High,
    Advance,
}

impl std::fmt::Display for BandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandKind::Fail => write!(f, "fail"),
            BandKind::Low => write!(f, "low"),
            BandKind::High => write!(f, "high"),
            BandKind::Advance => write!(f, "advance"),
        }
    }
}

/// A score range `[min, max)` and the outcome it maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub kind: BandKind,
    /// Inclusive lower bound.
    pub min: Percentage,
    /// Exclusive upper bound; `None` for the unbounded top band.
    #[serde(default)]
    pub max: Option<Percentage>,
    /// Resulting level; `None` keeps the learner's pre-assessment level.
    #[serde(default)]
    pub level: Option<CompetencyLevel>,
    #[serde(default)]
    pub can_advance: bool,
    #[serde(default)]
    pub next_step: Option<AssessmentStep>,
}

impl ScoreBand {
    /// Whether `score` falls inside this band. NaN matches nothing.
    pub fn contains(&self, score: Percentage) -> bool {
        score >= self.min && self.max.map_or(true, |max| score < max)
    }

    fn describe_range(&self) -> String {
        match self.max {
            Some(max) => format!("[{}, {})", self.min, max),
            None => format!("[{}, ∞)", self.min),
        }
    }
}

/// Configuration for one assessment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub step: AssessmentStep,
    /// The two consecutive levels this step probes, lower first.
    pub levels: [CompetencyLevel; 2],
    pub questions_per_level: u32,
    pub total_questions: u32,
    /// Bands in ascending score order.
    pub bands: Vec<ScoreBand>,
}

impl StepConfig {
    pub fn lower_level(&self) -> CompetencyLevel {
        self.levels[0]
    }

    pub fn upper_level(&self) -> CompetencyLevel {
        self.levels[1]
    }

    fn validate(&self) -> Result<()> {
        let step = self.step;
        let bad = |msg: String| Err(AssessmentError::Configuration(format!("{step}: {msg}")));

        let [low, high] = self.levels;
        if high.rank() != low.rank() + 1 || low == CompetencyLevel::Unrated {
            return bad(format!("levels {low} and {high} are not adjacent certified levels"));
        }
        if self.total_questions != self.questions_per_level * 2 {
            return bad(format!(
                "total_questions {} is not twice questions_per_level {}",
                self.total_questions, self.questions_per_level
            ));
        }

        let Some(first) = self.bands.first() else {
            return bad("no score bands".into());
        };
        if first.min != 0.0 {
            return bad(format!("first band starts at {} instead of 0", first.min));
        }

        for pair in self.bands.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.kind >= b.kind {
                return bad(format!("band {} listed before {}", a.kind, b.kind));
            }
            match a.max {
                None => return bad(format!("band {} is unbounded but not last", a.kind)),
                Some(max) if max != b.min => {
                    return bad(format!(
                        "bands {} {} and {} {} are not contiguous",
                        a.kind,
                        a.describe_range(),
                        b.kind,
                        b.describe_range()
                    ));
                }
                Some(_) => {}
            }
        }

        for band in &self.bands {
            if let Some(max) = band.max {
                if max <= band.min {
                    return bad(format!("band {} has empty range", band.kind));
                }
            }
            if band.can_advance {
                if step.is_final() {
                    return bad("final step cannot have an advancing band".into());
                }
                if band.next_step != step.next() {
                    return bad(format!("band {} must advance to {:?}", band.kind, step.next()));
                }
            } else if band.next_step.is_some() {
                return bad(format!("band {} names a next step but cannot advance", band.kind));
            }
        }

        if self.bands.last().is_some_and(|b| b.max.is_some()) {
            return bad("top band must be unbounded".into());
        }

        Ok(())
    }
}

/// The full threshold table, one entry per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    steps: Vec<StepConfig>,
}

impl ThresholdTable {
    /// The built-in table: bands at 25/50/75, 22 questions per level.
    pub fn standard() -> Self {
        use AssessmentStep::*;
        use CompetencyLevel::*;

        let band = |kind, min, max, level| ScoreBand {
            kind,
            min,
            max,
            level,
            can_advance: false,
            next_step: None,
        };

        let step = |step: AssessmentStep, levels: [CompetencyLevel; 2], fail_level| {
            let [low, high] = levels;
            let mut bands = vec![
                band(BandKind::Fail, 0.0, Some(FAIL_THRESHOLD), fail_level),
                band(BandKind::Low, FAIL_THRESHOLD, Some(INTERMEDIATE_THRESHOLD), Some(low)),
            ];
            match step.next() {
                Some(next) => {
                    bands.push(band(
                        BandKind::High,
                        INTERMEDIATE_THRESHOLD,
                        Some(ADVANCE_THRESHOLD),
                        Some(high),
                    ));
                    bands.push(ScoreBand {
                        can_advance: true,
                        next_step: Some(next),
                        ..band(BandKind::Advance, ADVANCE_THRESHOLD, None, Some(high))
                    });
                }
                None => bands.push(band(BandKind::High, INTERMEDIATE_THRESHOLD, None, Some(high))),
            }
            StepConfig {
                step,
                levels,
                questions_per_level: QUESTIONS_PER_LEVEL,
                total_questions: QUESTIONS_PER_LEVEL * 2,
                bands,
            }
        };

        Self {
            steps: vec![
                step(One, [A1, A2], None),
                step(Two, [B1, B2], Some(A2)),
                step(Three, [C1, C2], Some(B2)),
            ],
        }
    }

    /// Build a table from step configs, validating it.
    pub fn new(steps: Vec<StepConfig>) -> Result<Self> {
        let table = Self { steps };
        table.validate()?;
        Ok(table)
    }

    /// Parse and validate a table from TOML.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let table: ThresholdTable =
            toml::from_str(content).context("failed to parse threshold table TOML")?;
        table.validate()?;
        Ok(table)
    }

    /// Load and validate a table from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read threshold table: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid threshold table: {}", path.display()))
    }

    /// Check that every step is configured exactly once and that each step's
    /// bands cover `[0, ∞)` contiguously without overlap.
    pub fn validate(&self) -> Result<()> {
        for step in AssessmentStep::ALL {
            let count = self.steps.iter().filter(|s| s.step == step).count();
            if count != 1 {
                return Err(AssessmentError::Configuration(format!(
                    "{step} configured {count} times"
                )));
            }
        }
        self.steps.iter().try_for_each(StepConfig::validate)
    }

    pub fn steps(&self) -> &[StepConfig] {
        &self.steps
    }

    /// Configuration for `step`.
    pub fn step(&self, step: AssessmentStep) -> Result<&StepConfig> {
        self.steps
            .iter()
            .find(|s| s.step == step)
            .ok_or_else(|| AssessmentError::Configuration(format!("{step} is not configured")))
    }

    /// The band matching `score` for `step`.
    pub fn band_for(&self, step: AssessmentStep, score: Percentage) -> Result<&ScoreBand> {
        self.step(step)?
            .bands
            .iter()
            .find(|b| b.contains(score))
            .ok_or_else(|| {
                AssessmentError::Configuration(format!("no band matches score {score} for {step}"))
            })
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::standard()
    }
}
