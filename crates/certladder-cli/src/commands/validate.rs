//! The `certladder validate` command.

use std::path::PathBuf;

use anyhow::Result;

use certladder_core::parser::{load_banks, validate_question_bank};

pub fn execute(bank_path: PathBuf, thresholds: Option<PathBuf>) -> Result<()> {
    let table = super::load_table(thresholds)?;
    let banks = load_banks(&bank_path)?;

    let mut total_warnings = 0;

    for bank in &banks {
        println!(
            "Bank: {} ({}, {} questions)",
            bank.name,
            bank.step,
            bank.questions.len()
        );

        let warnings = validate_question_bank(bank, &table);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if banks.is_empty() {
        println!("No question banks found.");
    } else if total_warnings == 0 {
        println!("All question banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
