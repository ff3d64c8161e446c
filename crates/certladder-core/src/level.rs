//! Competency levels and assessment steps.
//!
//! Levels form a total order `none < A1 < A2 < B1 < B2 < C1 < C2`. Steps are
//! the three sequential stages of the certification ladder, each probing two
//! adjacent levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A learner's certified competency tier.
///
/// `Unrated` is the pre-assessment state and serializes as `"none"`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CompetencyLevel {
    #[default]
    #[serde(rename = "none")]
    Unrated,
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CompetencyLevel {
    /// Every level in ascending order.
    pub const ALL: [CompetencyLevel; 7] = [
        CompetencyLevel::Unrated,
        CompetencyLevel::A1,
        CompetencyLevel::A2,
        CompetencyLevel::B1,
        CompetencyLevel::B2,
        CompetencyLevel::C1,
        CompetencyLevel::C2,
    ];

    /// Position in the total order, `Unrated` being 0.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Human-readable tier description.
    pub fn description(self) -> &'static str {
        match self {
            CompetencyLevel::Unrated => "Not yet assessed",
            CompetencyLevel::A1 => "Foundation - Basic digital skills",
            CompetencyLevel::A2 => "Foundation - Confident use of simple digital tools",
            CompetencyLevel::B1 => "Intermediate - Independent use of digital tools",
            CompetencyLevel::B2 => "Intermediate - Advanced use with problem-solving",
            CompetencyLevel::C1 => "Advanced - Expert level with teaching ability",
            CompetencyLevel::C2 => "Advanced - Innovation and leadership in digital skills",
        }
    }
}

impl fmt::Display for CompetencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompetencyLevel::Unrated => "none",
            CompetencyLevel::A1 => "A1",
            CompetencyLevel::A2 => "A2",
            CompetencyLevel::B1 => "B1",
            CompetencyLevel::B2 => "B2",
            CompetencyLevel::C1 => "C1",
            CompetencyLevel::C2 => "C2",
        };
        f.write_str(s)
    }
}

impl FromStr for CompetencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(CompetencyLevel::Unrated),
            "a1" => Ok(CompetencyLevel::A1),
            "a2" => Ok(CompetencyLevel::A2),
            "b1" => Ok(CompetencyLevel::B1),
            "b2" => Ok(CompetencyLevel::B2),
            "c1" => Ok(CompetencyLevel::C1),
            "c2" => Ok(CompetencyLevel::C2),
            other => Err(format!("unknown competency level: {other}")),
        }
    }
}

/// One of the three assessment stages. Serializes as the integers 1..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AssessmentStep {
    One = 1,
    Two = 2,
    Three = 3,
}

impl AssessmentStep {
    /// Every step in order.
    pub const ALL: [AssessmentStep; 3] = [
        AssessmentStep::One,
        AssessmentStep::Two,
        AssessmentStep::Three,
    ];

    /// The step number, 1-based.
    pub fn number(self) -> u8 {
        self as u8
    }

    /// The step that follows this one, if any.
    pub fn next(self) -> Option<AssessmentStep> {
        match self {
            AssessmentStep::One => Some(AssessmentStep::Two),
            AssessmentStep::Two => Some(AssessmentStep::Three),
            AssessmentStep::Three => None,
        }
    }

    /// Whether this is the last step of the ladder.
    pub fn is_final(self) -> bool {
        self.next().is_none()
    }
}

impl From<AssessmentStep> for u8 {
    fn from(step: AssessmentStep) -> u8 {
        step.number()
    }
}

impl TryFrom<u8> for AssessmentStep {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AssessmentStep::One),
            2 => Ok(AssessmentStep::Two),
            3 => Ok(AssessmentStep::Three),
            other => Err(format!("assessment step must be 1, 2 or 3, got {other}")),
        }
    }
}

impl fmt::Display for AssessmentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {}", self.number())
    }
}

impl FromStr for AssessmentStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .to_lowercase()
            .trim_start_matches("step")
            .trim_start_matches(['_', '-', ' '])
            .to_string();
        let n: u8 = digits
            .parse()
            .map_err(|_| format!("unknown assessment step: {s}"))?;
        AssessmentStep::try_from(n)
    }
}
