//! Configuration loader with tier-based merging.
//!
//! Tiers, lowest priority first: embedded defaults, project
//! (`$CWD/plandoc/config.yaml`), user (`~/.plandoc/config.yaml`), environment.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    Defaults = 0,
    Project = 1,
    User = 2,
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration directories from the environment and defaults.
    pub fn discover() -> Self {
        let user_dir = std::env::var("PLANDOC_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".plandoc")));

        let project_dir = std::env::var("PLANDOC_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("plandoc")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Read one tier's `config.yaml` as a JSON value, if present and valid.
fn read_tier(dir: Option<&Path>, tier: ConfigTier) -> Option<(Value, PathBuf)> {
    let file = dir?.join("config.yaml");
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(&file) {
        Ok(content) => content,
        Err(e) => {
            warn!(tier = %tier, path = %file.display(), error = %e, "Failed to read config tier");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => {
            debug!(tier = %tier, path = %file.display(), "Loaded config tier");
            Some((value, file))
        }
        Err(e) => {
            warn!(tier = %tier, path = %file.display(), error = %e, "Ignoring invalid config tier");
            None
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority config file that contributed (if any).
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit tier directories.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        // An explicit config file replaces the file tiers entirely
        if let Ok(explicit) = std::env::var("PLANDOC_CONFIG_PATH") {
            let path = PathBuf::from(explicit);
            let mut config = Config::load(&path)?;
            Self::apply_env_overrides(&mut config);
            return Ok(Self {
                paths,
                config,
                config_path: Some(path),
            });
        }

        let mut tiers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut config_path = None;

        for (dir, tier) in [
            (paths.project_dir.as_deref(), ConfigTier::Project),
            (paths.user_dir.as_deref(), ConfigTier::User),
        ] {
            if let Some((value, file)) = read_tier(dir, tier) {
                tiers.push(value);
                config_path = Some(file);
            }
        }

        let mut config: Config = serde_json::from_value(deep_merge_all(tiers))?;
        Self::apply_env_overrides(&mut config);

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Apply `PLANDOC_*` environment variable overrides.
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(root) = std::env::var("PLANDOC_DOCS_ROOT") {
            config.storage.docs_root = PathBuf::from(root);
        }

        if let Ok(dir) = std::env::var("PLANDOC_BACKUPS_DIR") {
            config.storage.backups_dir = PathBuf::from(dir);
        }

        if let Ok(port) = std::env::var("PLANDOC_PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid PLANDOC_PORT"),
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
