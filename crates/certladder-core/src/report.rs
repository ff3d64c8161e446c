//! Learner-facing attempt report with JSON persistence.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::level::{AssessmentStep, CompetencyLevel};
use crate::model::{AttemptOutcome, AttemptRecord, Question, SubmitTrigger};
use crate::scoring::{AnswerIndex, Percentage, Selection};
use crate::thresholds::BandKind;
use crate::timer::format_clock;

/// Summary of a submitted attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    pub attempt_id: Uuid,
    pub learner_id: String,
    pub step: AssessmentStep,
    pub submitted_at: DateTime<Utc>,
    pub trigger: SubmitTrigger,
    pub score: Percentage,
    pub correct: usize,
    pub total: usize,
    pub band: BandKind,
    pub level: Option<CompetencyLevel>,
    pub can_advance: bool,
    pub next_step: Option<AssessmentStep>,
    /// Correct answers per probed level.
    pub per_level: BTreeMap<CompetencyLevel, LevelTally>,
    /// Per-question review, in attempt order.
    pub review: Vec<QuestionReview>,
}

/// Correct-answer count for one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTally {
    pub correct: usize,
    pub total: usize,
}

/// One question as the learner answered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: String,
    pub level: CompetencyLevel,
    pub selected: Selection,
    pub correct_answer: AnswerIndex,
    pub is_correct: bool,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl AttemptReport {
    pub fn new(questions: &[Question], record: &AttemptRecord, outcome: &AttemptOutcome) -> Self {
        let review: Vec<QuestionReview> = questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let selected = record.answers.get(i).copied().flatten();
                QuestionReview {
                    question_id: q.id.clone(),
                    level: q.level,
                    selected,
                    correct_answer: q.correct_answer,
                    is_correct: q.is_correct(selected),
                    explanation: q.explanation.clone(),
                }
            })
            .collect();

        let mut per_level: BTreeMap<CompetencyLevel, LevelTally> = BTreeMap::new();
        for r in &review {
            let tally = per_level.entry(r.level).or_default();
            tally.total += 1;
            if r.is_correct {
                tally.correct += 1;
            }
        }

        Self {
            attempt_id: record.attempt_id,
            learner_id: record.learner_id.clone(),
            step: record.step,
            submitted_at: record.submitted_at,
            trigger: outcome.trigger,
            score: outcome.score,
            correct: outcome.correct,
            total: outcome.total,
            band: outcome.band,
            level: outcome.level,
            can_advance: outcome.can_advance,
            next_step: outcome.next_step,
            per_level,
            review,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AttemptReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## {} result\n\n", self.step));
        md.push_str(&format!(
            "**Score:** {:.1}% ({}/{} correct, {} band)\n\n",
            self.score, self.correct, self.total, self.band
        ));
        let level = self
            .level
            .map_or_else(|| "unchanged".to_string(), |l| l.to_string());
        md.push_str(&format!("**Resulting level:** {level}\n\n"));
        match self.next_step {
            Some(next) => md.push_str(&format!("**Next:** eligible for {next}\n\n")),
            None => md.push_str("**Next:** no further step unlocked\n\n"),
        }

        if !self.per_level.is_empty() {
            md.push_str("| Level | Correct | Total |\n");
            md.push_str("|-------|---------|-------|\n");
            for (level, tally) in &self.per_level {
                md.push_str(&format!("| {level} | {} | {} |\n", tally.correct, tally.total));
            }
            md.push('\n');
        }

        let missed: Vec<&QuestionReview> = self.review.iter().filter(|r| !r.is_correct).collect();
        if !missed.is_empty() {
            md.push_str("### Missed questions\n\n");
            for r in missed {
                let selected = r
                    .selected
                    .map_or_else(|| "no answer".to_string(), |s| format!("option {s}"));
                md.push_str(&format!(
                    "- `{}`: {selected}, expected option {}",
                    r.question_id, r.correct_answer
                ));
                if let Some(explanation) = &r.explanation {
                    md.push_str(&format!(" ({explanation})"));
                }
                md.push('\n');
            }
        }

        md
    }
}

/// Elapsed time between two instants as `MM:SS`.
pub fn format_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format_clock((end - start).num_seconds())
}
