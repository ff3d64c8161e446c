pub mod init;
pub mod next_step;
pub mod replay;
pub mod table;
pub mod validate;

use std::path::PathBuf;

use anyhow::Result;

use certladder_core::thresholds::ThresholdTable;

/// The custom table at `path`, or the built-in one.
pub fn load_table(path: Option<PathBuf>) -> Result<ThresholdTable> {
    match path {
        Some(path) => ThresholdTable::load(&path),
        None => Ok(ThresholdTable::standard()),
    }
}
