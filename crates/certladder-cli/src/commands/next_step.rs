//! The `certladder next-step` command.

use anyhow::Result;

use certladder_core::progression::next_eligible_step_raw;

pub fn execute(level: String) -> Result<()> {
    match next_eligible_step_raw(&level) {
        Some(step) => println!("{step}"),
        None => println!("complete: no further step"),
    }
    Ok(())
}
