//! The `certladder table` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use certladder_core::thresholds::ThresholdTable;

pub fn execute(format: String, thresholds: Option<PathBuf>) -> Result<()> {
    let table = super::load_table(thresholds)?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&table)?),
        _ => print_text(&table),
    }

    Ok(())
}

fn print_text(thresholds: &ThresholdTable) {
    let mut table = Table::new();
    table.set_header(vec![
        "Step", "Levels", "Questions", "Band", "Score", "Level", "Advance",
    ]);

    for config in thresholds.steps() {
        for (i, band) in config.bands.iter().enumerate() {
            let (step, levels, questions) = if i == 0 {
                (
                    config.step.to_string(),
                    format!("{} / {}", config.lower_level(), config.upper_level()),
                    format!("{} ({} per level)", config.total_questions, config.questions_per_level),
                )
            } else {
                Default::default()
            };
            let range = match band.max {
                Some(max) => format!("{:.0}% to <{:.0}%", band.min, max),
                None => format!(">= {:.0}%", band.min),
            };
            let level = band
                .level
                .map_or_else(|| "unchanged".to_string(), |l| l.to_string());
            let advance = match (band.can_advance, band.next_step) {
                (true, Some(next)) => format!("yes, {next}"),
                _ => "no".to_string(),
            };
            table.add_row(vec![
                Cell::new(step),
                Cell::new(levels),
                Cell::new(questions),
                Cell::new(band.kind),
                Cell::new(range),
                Cell::new(level),
                Cell::new(advance),
            ]);
        }
    }

    println!("{table}");
}
