//! Engine configuration.
//!
//! Values come from defaults, a TOML file, or `GAUNTLET_*` environment
//! variables. Environment variables override the file when both are used
//! through [`EngineConfig::load`].
//!
//! ```toml
//! batch_size = 50
//! batch_cooldown_ms = 1000
//! top_n_per_category = 5
//! insert_chunk_size = 500
//! progress_retention_secs = 3600
//! repo_check_timeout_secs = 10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::BatchConfig;
use crate::domain::{GauntletError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Projects evaluated concurrently per batch
    pub batch_size: usize,
    /// Pause between batches
    pub batch_cooldown_ms: u64,
    /// Winners kept per category
    pub top_n_per_category: usize,
    /// Rows per bulk insert inside a layer commit
    pub insert_chunk_size: usize,
    /// How long finished sessions stay in the progress tracker
    pub progress_retention_secs: u64,
    pub repo_check_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_cooldown_ms: 1000,
            top_n_per_category: 5,
            insert_chunk_size: 500,
            progress_retention_secs: 3600,
            repo_check_timeout_secs: 10,
        }
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| GauntletError::Config(format!("{key} must be a non-negative integer, got {raw:?}"))),
        Err(_) => Ok(None),
    }
}

impl EngineConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| GauntletError::Config(e.to_string()))
    }

    /// Defaults overridden by any `GAUNTLET_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Read `path` (if given) and apply environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        base.with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_number("GAUNTLET_BATCH_SIZE")? {
            self.batch_size = v;
        }
        if let Some(v) = env_number("GAUNTLET_BATCH_COOLDOWN_MS")? {
            self.batch_cooldown_ms = v;
        }
        if let Some(v) = env_number("GAUNTLET_TOP_N")? {
            self.top_n_per_category = v;
        }
        if let Some(v) = env_number("GAUNTLET_INSERT_CHUNK_SIZE")? {
            self.insert_chunk_size = v;
        }
        if let Some(v) = env_number("GAUNTLET_PROGRESS_RETENTION_SECS")? {
            self.progress_retention_secs = v;
        }
        if let Some(v) = env_number("GAUNTLET_REPO_CHECK_TIMEOUT_SECS")? {
            self.repo_check_timeout_secs = v;
        }
        Ok(self)
    }

    pub fn batch(&self) -> BatchConfig {
        BatchConfig::new(self.batch_size, Duration::from_millis(self.batch_cooldown_ms))
    }

    pub fn progress_retention(&self) -> Duration {
        Duration::from_secs(self.progress_retention_secs)
    }

    pub fn repo_check_timeout(&self) -> Duration {
        Duration::from_secs(self.repo_check_timeout_secs)
    }
}
