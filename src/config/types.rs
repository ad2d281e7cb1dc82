//! Configuration types.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default port for the console API.
pub const DEFAULT_API_PORT: u16 = 31995;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub guard: GuardConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load a single configuration file (no tier merging).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }
}

/// Where documents and engine side files live.
///
/// Every path other than `docs_root` is resolved relative to `docs_root`
/// unless it is absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the markdown documents.
    #[serde(default = "default_docs_root")]
    pub docs_root: PathBuf,

    /// The shared plan document.
    #[serde(default = "default_plan_file")]
    pub plan_file: PathBuf,

    /// Directory of per-loop documents (`<loop-id>.md`).
    #[serde(default = "default_loops_dir")]
    pub loops_dir: PathBuf,

    /// Directory of chat thread documents (`<thread-id>.md`).
    #[serde(default = "default_threads_dir")]
    pub threads_dir: PathBuf,

    /// Backups taken before whole-document rewrites.
    #[serde(default = "default_backups_dir")]
    pub backups_dir: PathBuf,

    /// Write-ahead intents for multi-document promotions.
    #[serde(default = "default_intents_dir")]
    pub intents_dir: PathBuf,

    /// Append-only audit trail of mutation outcomes. Empty disables it.
    #[serde(default = "default_interaction_log")]
    pub interaction_log: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            docs_root: default_docs_root(),
            plan_file: default_plan_file(),
            loops_dir: default_loops_dir(),
            threads_dir: default_threads_dir(),
            backups_dir: default_backups_dir(),
            intents_dir: default_intents_dir(),
            interaction_log: default_interaction_log(),
        }
    }
}

impl StorageConfig {
    /// Resolve `path` against `docs_root`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.docs_root.join(path)
        }
    }

    /// A storage layout rooted at `docs_root` with default relative paths.
    pub fn rooted_at(docs_root: impl Into<PathBuf>) -> Self {
        Self {
            docs_root: docs_root.into(),
            ..Self::default()
        }
    }
}

fn default_docs_root() -> PathBuf {
    PathBuf::from("docs")
}

fn default_plan_file() -> PathBuf {
    PathBuf::from("plan.md")
}

fn default_loops_dir() -> PathBuf {
    PathBuf::from("loops")
}

fn default_threads_dir() -> PathBuf {
    PathBuf::from("threads")
}

fn default_backups_dir() -> PathBuf {
    PathBuf::from(".backups")
}

fn default_intents_dir() -> PathBuf {
    PathBuf::from(".intents")
}

fn default_interaction_log() -> PathBuf {
    PathBuf::from("interactions.jsonl")
}

/// Thresholds for the whole-document rewrite data-loss guard.
///
/// A rewrite is refused when the document holds more than
/// `min_existing_records` records and the new count is strictly below
/// `existing * max_drop_ratio`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "default_min_existing_records")]
    pub min_existing_records: usize,

    #[serde(default = "default_max_drop_ratio")]
    pub max_drop_ratio: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_existing_records: default_min_existing_records(),
            max_drop_ratio: default_max_drop_ratio(),
        }
    }
}

fn default_min_existing_records() -> usize {
    5
}

fn default_max_drop_ratio() -> f64 {
    0.5
}

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port for the console API (default: 31995).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Recover incomplete promotions before serving.
    #[serde(default = "default_recover_on_start")]
    pub recover_on_start: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            recover_on_start: default_recover_on_start(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_recover_on_start() -> bool {
    true
}
