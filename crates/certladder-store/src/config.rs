//! `certladder.toml` configuration and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use certladder_core::level::AssessmentStep;
use certladder_core::progression::LevelPolicy;
use certladder_core::traits::ResultsStore;

use crate::jsonl::JsonlResultsStore;
use crate::memory::MemoryResultsStore;

/// Environment variable that overrides the results store path.
pub const RESULTS_PATH_ENV: &str = "CERTLADDER_RESULTS_PATH";

/// Which backend receives finalized attempt records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    Jsonl { path: PathBuf },
}

/// Per-step time limits, in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLimits {
    #[serde(default = "default_minutes")]
    pub step_1: u32,
    #[serde(default = "default_minutes")]
    pub step_2: u32,
    #[serde(default = "default_minutes")]
    pub step_3: u32,
}

// One minute per question.
fn default_minutes() -> u32 {
    44
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            step_1: default_minutes(),
            step_2: default_minutes(),
            step_3: default_minutes(),
        }
    }
}

/// Top-level certladder configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertladderConfig {
    /// How recommended levels are applied to stored levels.
    #[serde(default)]
    pub level_policy: LevelPolicy,
    /// Default question bank file or directory.
    #[serde(default)]
    pub question_bank: Option<PathBuf>,
    #[serde(default)]
    pub time_limits: TimeLimits,
    #[serde(default)]
    pub results: StoreConfig,
}

impl CertladderConfig {
    /// The configured time limit for `step`, in minutes.
    pub fn time_limit_minutes(&self, step: AssessmentStep) -> u32 {
        match step {
            AssessmentStep::One => self.time_limits.step_1,
            AssessmentStep::Two => self.time_limits.step_2,
            AssessmentStep::Three => self.time_limits.step_3,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `certladder.toml` in the current directory
/// 2. `~/.config/certladder/config.toml`
///
/// `CERTLADDER_RESULTS_PATH` switches the results store to a JSON-lines
/// file at that path.
pub fn load_config() -> Result<CertladderConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<CertladderConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("certladder.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<CertladderConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => CertladderConfig::default(),
    };

    // Apply env var overrides
    if let Ok(results_path) = std::env::var(RESULTS_PATH_ENV) {
        if !results_path.is_empty() {
            config.results = StoreConfig::Jsonl {
                path: PathBuf::from(results_path),
            };
        }
    }

    // Resolve env vars in path values
    if let StoreConfig::Jsonl { path } = &mut config.results {
        *path = resolve_path(path);
    }
    config.question_bank = config.question_bank.as_deref().map(resolve_path);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("certladder"))
}

/// Create a results store from its configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn ResultsStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryResultsStore::new())),
        StoreConfig::Jsonl { path } => {
            if path.as_os_str().is_empty() {
                anyhow::bail!("jsonl results store needs a non-empty path");
            }
            Ok(Arc::new(JsonlResultsStore::new(path.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_CERTLADDER_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_CERTLADDER_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_CERTLADDER_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_CERTLADDER_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = CertladderConfig::default();
        assert_eq!(config.level_policy, LevelPolicy::KeepHighest);
        assert_eq!(config.results, StoreConfig::Memory);
        assert!(config.question_bank.is_none());
        for step in AssessmentStep::ALL {
            assert_eq!(config.time_limit_minutes(step), 44);
        }
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
level_policy = "unconditional"
question_bank = "banks"

[time_limits]
step_1 = 30
step_3 = 60

[results]
type = "jsonl"
path = "results/attempts.jsonl"
"#;
        let config: CertladderConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.level_policy, LevelPolicy::Unconditional);
        assert_eq!(config.question_bank, Some(PathBuf::from("banks")));
        assert_eq!(config.time_limit_minutes(AssessmentStep::One), 30);
        assert_eq!(config.time_limit_minutes(AssessmentStep::Two), 44);
        assert_eq!(config.time_limit_minutes(AssessmentStep::Three), 60);
        assert_eq!(
            config.results,
            StoreConfig::Jsonl {
                path: PathBuf::from("results/attempts.jsonl")
            }
        );
    }

    #[test]
    fn unknown_store_type_is_rejected() {
        let err = toml::from_str::<CertladderConfig>("[results]\ntype = \"postgres\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn explicit_missing_path_errors() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_expands_env_vars() {
        std::env::set_var("_CERTLADDER_RESULTS_DIR", "/tmp/certladder-test");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("certladder.toml");
        std::fs::write(
            &path,
            "[results]\ntype = \"jsonl\"\npath = \"${_CERTLADDER_RESULTS_DIR}/out.jsonl\"\n",
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        if std::env::var(RESULTS_PATH_ENV).is_err() {
            assert_eq!(
                config.results,
                StoreConfig::Jsonl {
                    path: PathBuf::from("/tmp/certladder-test/out.jsonl")
                }
            );
        }
        std::env::remove_var("_CERTLADDER_RESULTS_DIR");
    }

    #[test]
    fn create_store_by_type() {
        assert_eq!(create_store(&StoreConfig::Memory).unwrap().name(), "memory");

        let dir = tempfile::tempdir().unwrap();
        let store = create_store(&StoreConfig::Jsonl {
            path: dir.path().join("r.jsonl"),
        })
        .unwrap();
        assert_eq!(store.name(), "jsonl");

        assert!(create_store(&StoreConfig::Jsonl {
            path: PathBuf::new()
        })
        .is_err());
    }
}
