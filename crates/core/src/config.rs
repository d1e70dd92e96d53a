//! Engine configuration
//!
//! Loaded from an optional TOML file; every field has a default matching the
//! reference timings (100ms sweep, 1s settle, 5s forget), so a missing file
//! yields a fully working configuration watching the user's downloads folder.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory to watch; defaults to the user's downloads directory
    #[serde(default)]
    pub watch_dir: Option<PathBuf>,

    /// Period between sweeps, in milliseconds
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Quiet time before a pending file becomes eligible, in milliseconds
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Retention of processed entries, in milliseconds
    #[serde(default = "default_forget_ms")]
    pub forget_ms: u64,
}

fn default_sweep_interval_ms() -> u64 {
    100
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_forget_ms() -> u64 {
    5000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            watch_dir: None,
            sweep_interval_ms: default_sweep_interval_ms(),
            settle_ms: default_settle_ms(),
            forget_ms: default_forget_ms(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields the defaults; a malformed file is an error
    /// (silently misreading timing values would be worse than failing).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_ms == 0 {
            anyhow::bail!("sweep_interval_ms must be greater than zero");
        }
        if self.settle_ms == 0 {
            anyhow::bail!("settle_ms must be greater than zero");
        }
        if self.forget_ms == 0 {
            anyhow::bail!("forget_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn forget_window(&self) -> Duration {
        Duration::from_millis(self.forget_ms)
    }

    /// Configured watch directory, falling back to the platform downloads dir
    pub fn effective_watch_dir(&self) -> Option<PathBuf> {
        self.watch_dir.clone().or_else(dirs::download_dir)
    }
}
