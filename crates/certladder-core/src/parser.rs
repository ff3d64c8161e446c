//! TOML question-bank parser.
//!
//! Loads question banks from TOML files and directories, and validates them
//! against the threshold table.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::level::{AssessmentStep, CompetencyLevel};
use crate::model::{Question, QuestionBank, MAX_OPTIONS, MIN_OPTIONS};
use crate::thresholds::ThresholdTable;

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    step: u8,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    level: String,
    #[serde(default)]
    competency: Option<String>,
    prompt: String,
    options: Vec<String>,
    correct_answer: usize,
    #[serde(default)]
    explanation: Option<String>,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_question_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank file: {}", path.display()))?;

    parse_question_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank`.
pub fn parse_question_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let step = AssessmentStep::try_from(parsed.bank.step).map_err(|e| anyhow::anyhow!(e))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let level: CompetencyLevel = q
                .level
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;
            Ok(Question {
                id: q.id,
                level,
                competency: q.competency,
                prompt: q.prompt,
                options: q.options,
                correct_answer: q.correct_answer,
                explanation: q.explanation,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        step,
        questions,
    })
}

/// Recursively load all `.toml` bank files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_question_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {e:#}", path.display());
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank file, or every bank under a directory.
pub fn load_banks(path: &Path) -> Result<Vec<QuestionBank>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_question_bank(path)?])
    }
}

/// A warning from question-bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn bank(message: String) -> Self {
        Self {
            question_id: None,
            message,
        }
    }

    fn question(id: &str, message: String) -> Self {
        Self {
            question_id: Some(id.to_string()),
            message,
        }
    }
}

/// Validate a bank for common issues.
pub fn validate_question_bank(bank: &QuestionBank, table: &ThresholdTable) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for q in &bank.questions {
        if !seen_ids.insert(&q.id) {
            warnings.push(ValidationWarning::question(
                &q.id,
                format!("duplicate question ID: {}", q.id),
            ));
        }
    }

    for q in &bank.questions {
        if q.prompt.trim().is_empty() {
            warnings.push(ValidationWarning::question(&q.id, "prompt is empty".into()));
        }
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&q.options.len()) {
            warnings.push(ValidationWarning::question(
                &q.id,
                format!(
                    "has {} options, expected {MIN_OPTIONS} to {MAX_OPTIONS}",
                    q.options.len()
                ),
            ));
        }
        if q.correct_answer >= q.options.len() {
            warnings.push(ValidationWarning::question(
                &q.id,
                format!(
                    "correct_answer {} is out of range for {} options",
                    q.correct_answer,
                    q.options.len()
                ),
            ));
        }
    }

    let config = match table.step(bank.step) {
        Ok(config) => config,
        Err(e) => {
            warnings.push(ValidationWarning::bank(e.to_string()));
            return warnings;
        }
    };

    let mut per_level: HashMap<CompetencyLevel, u32> = HashMap::new();
    for q in &bank.questions {
        if config.levels.contains(&q.level) {
            *per_level.entry(q.level).or_default() += 1;
        } else {
            warnings.push(ValidationWarning::question(
                &q.id,
                format!(
                    "level {} is not probed by {} ({} / {})",
                    q.level,
                    bank.step,
                    config.lower_level(),
                    config.upper_level()
                ),
            ));
        }
    }

    for level in config.levels {
        let count = per_level.get(&level).copied().unwrap_or(0);
        if count != config.questions_per_level {
            warnings.push(ValidationWarning::bank(format!(
                "{count} questions at level {level}, expected {}",
                config.questions_per_level
            )));
        }
    }

    warnings
}
