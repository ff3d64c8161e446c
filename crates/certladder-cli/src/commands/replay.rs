//! The `certladder replay` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use certladder_core::attempt::AttemptCoordinator;
use certladder_core::certificate::Certificate;
use certladder_core::level::CompetencyLevel;
use certladder_core::model::SubmitTrigger;
use certladder_core::parser::load_banks;
use certladder_core::progression::LevelPolicy;
use certladder_core::report::AttemptReport;
use certladder_core::scoring::Selection;
use certladder_core::timer::{format_clock, Countdown};
use certladder_core::traits::BankQuestionSource;
use certladder_store::{create_store, load_config_from, MemoryIdentityProvider};

pub struct ReplayArgs {
    pub bank: Option<PathBuf>,
    pub answers: String,
    pub learner: String,
    pub prior_level: String,
    pub trigger: String,
    pub format: String,
    pub certificate: bool,
    pub output: Option<PathBuf>,
    pub thresholds: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Serialize)]
struct ReplaySummary<'a> {
    report: &'a AttemptReport,
    stored_level: CompetencyLevel,
    level_policy: LevelPolicy,
    results_store: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate: Option<Certificate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    store_error: Option<String>,
}

pub async fn execute(args: ReplayArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;
    let table = Arc::new(super::load_table(args.thresholds)?);

    let bank_path = args
        .bank
        .or_else(|| config.question_bank.clone())
        .context("no question bank given; pass --bank or set question_bank in certladder.toml")?;
    let banks = load_banks(&bank_path)?;
    if banks.is_empty() {
        anyhow::bail!("no question banks found in {}", bank_path.display());
    }

    let prior: CompetencyLevel = args
        .prior_level
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let trigger: SubmitTrigger = args.trigger.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let answers = parse_answers(&args.answers)?;

    let identity = MemoryIdentityProvider::new().with_level(&args.learner, prior);
    let source = BankQuestionSource::new(banks);
    let store = create_store(&config.results)?;
    let store_name = store.name().to_string();

    let Some(attempt) =
        AttemptCoordinator::begin(&args.learner, &identity, &source, table, store).await?
    else {
        println!("Learner {} at {prior} has no further step to attempt.", args.learner);
        return Ok(());
    };

    if answers.len() > attempt.len() {
        anyhow::bail!(
            "{} answers given but {} has only {} questions",
            answers.len(),
            attempt.step(),
            attempt.len()
        );
    }

    // Reported only; replays are never ticked, `--trigger` just labels the submit.
    let countdown = Countdown::from_minutes(config.time_limit_minutes(attempt.step()));
    tracing::debug!(
        step = %attempt.step(),
        time_limit = %format_clock(countdown.time_left() as i64),
        "replaying attempt"
    );

    attempt.start()?;
    for (index, selection) in answers.iter().enumerate() {
        if let Some(answer) = selection {
            attempt.select_answer(index, *answer)?;
        }
    }

    // A store failure leaves the attempt submitted; report it after printing.
    let store_error = match attempt.submit(trigger).await {
        Ok(_) => None,
        Err(e) if !e.is_contract_violation() => Some(e),
        Err(e) => return Err(e.into()),
    };

    let report = attempt.report().context("attempt was not submitted")?;
    let outcome = attempt.outcome().context("attempt has no outcome")?;
    let stored_level = identity.apply_outcome(&args.learner, &outcome, config.level_policy);
    let certificate = if args.certificate {
        Certificate::issue(&args.learner, &outcome)
    } else {
        None
    };

    if let Some(path) = &args.output {
        report.save_json(path)?;
        tracing::info!("report saved to {}", path.display());
    }

    match args.format.as_str() {
        "json" => {
            let summary = ReplaySummary {
                report: &report,
                stored_level,
                level_policy: config.level_policy,
                results_store: &store_name,
                certificate,
                store_error: store_error.as_ref().map(ToString::to_string),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "markdown" | "md" => {
            print!("{}", report.to_markdown());
            println!("**Stored level:** {stored_level}");
            if let Some(cert) = &certificate {
                println!("\n**Certificate:** `{}` ({})", cert.certificate_id, cert.level);
            }
        }
        _ => {
            println!(
                "{} attempt {} for {} ({} questions, time limit {})",
                report.step,
                report.attempt_id,
                report.learner_id,
                attempt.len(),
                format_clock(countdown.time_left() as i64)
            );
            println!(
                "Score: {:.2}% ({}/{} correct, {} answered)",
                report.score,
                report.correct,
                report.total,
                attempt.answered_count()
            );
            println!("Band: {} (submitted by {})", report.band, report.trigger);
            match report.level {
                Some(level) => println!("Resulting level: {level} ({})", level.description()),
                None => println!("Resulting level: unchanged ({prior})"),
            }
            match (report.can_advance, report.next_step) {
                (true, Some(next)) => println!("Can advance: yes, next {next}"),
                _ => println!("Can advance: no"),
            }
            println!("Stored level: {stored_level} ({:?})", config.level_policy);
            if let Some(cert) = &certificate {
                println!("Certificate: {} ({})", cert.certificate_id, cert.level);
            }
        }
    }

    match store_error {
        Some(e) => Err(e).with_context(|| format!("{store_name} results store failed")),
        None => Ok(()),
    }
}

/// Parse `0,2,-1,,1` into selections; `-1` and empty entries are unanswered.
fn parse_answers(raw: &str) -> Result<Vec<Selection>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .enumerate()
        .map(|(i, entry)| {
            let entry = entry.trim();
            if entry.is_empty() || entry == "-1" {
                return Ok(None);
            }
            entry
                .parse::<usize>()
                .map(Some)
                .with_context(|| format!("answer {} is not an option index: {entry:?}", i + 1))
        })
        .collect()
}
