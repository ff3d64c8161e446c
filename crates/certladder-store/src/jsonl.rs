//! Append-only JSON-lines results store.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use certladder_core::model::AttemptRecord;
use certladder_core::traits::ResultsStore;

use crate::error::StoreError;

/// Writes one JSON object per line to a file.
///
/// Appends are serialized through an async mutex so concurrent attempts
/// never interleave partial lines.
#[derive(Debug)]
pub struct JsonlResultsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlResultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: &AttemptRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read every record in the file. A missing file yields no records.
    pub async fn load_all(&self) -> anyhow::Result<Vec<AttemptRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("invalid record on line {} of {}", i + 1, self.path.display())
                })
            })
            .collect()
    }
}

#[async_trait]
impl ResultsStore for JsonlResultsStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn record(&self, record: &AttemptRecord) -> anyhow::Result<()> {
        if let Err(e) = self.append(record).await {
            tracing::warn!(
                attempt_id = %record.attempt_id,
                path = %self.path.display(),
                permanent = e.is_permanent(),
                "append failed: {e}"
            );
            return Err(e).with_context(|| format!("failed to append record to {}", self.path.display()));
        }
        tracing::debug!(attempt_id = %record.attempt_id, path = %self.path.display(), "record appended");
        Ok(())
    }
}
