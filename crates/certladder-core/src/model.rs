//! Core data model: questions, banks, attempt status and outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::level::{AssessmentStep, CompetencyLevel};
use crate::scoring::{AnswerIndex, Percentage, Selection};
use crate::thresholds::BandKind;

/// Fewest options a question may offer.
pub const MIN_OPTIONS: usize = 2;
/// Most options a question may offer.
pub const MAX_OPTIONS: usize = 6;

/// A multiple-choice question supplied by the question source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    /// The level this question probes.
    pub level: CompetencyLevel,
    /// Competency area code (e.g. "INF", "SAF").
    #[serde(default)]
    pub competency: Option<String>,
    pub prompt: String,
    pub options: Vec<String>,
    /// Ground truth for scoring; never re-derived.
    pub correct_answer: AnswerIndex,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    pub fn is_correct(&self, selection: Selection) -> bool {
        selection == Some(self.correct_answer)
    }
}

/// The question set for one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub step: AssessmentStep,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionBank {
    /// Correct answer indices in question order.
    pub fn answer_key(&self) -> Vec<AnswerIndex> {
        answer_key(&self.questions)
    }
}

/// Correct answer indices for `questions`, in order.
pub fn answer_key(questions: &[Question]) -> Vec<AnswerIndex> {
    questions.iter().map(|q| q.correct_answer).collect()
}

/// Lifecycle of an attempt: `pending → in_progress → submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Pending,
    InProgress,
    Submitted,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::Pending => write!(f, "pending"),
            AttemptStatus::InProgress => write!(f, "in_progress"),
            AttemptStatus::Submitted => write!(f, "submitted"),
        }
    }
}

/// What caused an attempt to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    Manual,
    TimerExpiry,
}

impl fmt::Display for SubmitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitTrigger::Manual => write!(f, "manual"),
            SubmitTrigger::TimerExpiry => write!(f, "timer_expiry"),
        }
    }
}

impl FromStr for SubmitTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(SubmitTrigger::Manual),
            "timer" | "timer_expiry" | "timer-expiry" => Ok(SubmitTrigger::TimerExpiry),
            other => Err(format!("unknown submit trigger: {other}")),
        }
    }
}

/// Derived result of a submitted attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub score: Percentage,
    pub correct: usize,
    pub total: usize,
    pub band: BandKind,
    /// Recommended level; `None` keeps the pre-assessment level.
    pub level: Option<CompetencyLevel>,
    pub can_advance: bool,
    pub next_step: Option<AssessmentStep>,
    pub trigger: SubmitTrigger,
}

/// The payload forwarded to the results store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_id: Uuid,
    pub learner_id: String,
    pub step: AssessmentStep,
    pub answers: Vec<Selection>,
    pub score: Percentage,
    pub resulting_level: Option<CompetencyLevel>,
    pub can_advance: bool,
    pub submitted_at: DateTime<Utc>,
}
