//! Shared paths and config loading for CLI commands

use anyhow::{Context, Result};
use iub_core::EngineConfig;
use std::path::{Path, PathBuf};

/// Per-user state directory holding the settings file and the instance lock
pub fn state_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .context("no local data directory for this user")?
        .join("insta-unblock");
    Ok(dir)
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("settings.json"))
}

pub fn lock_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("iub.lock"))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("insta-unblock/config.toml"))
}

/// Load the engine config from an explicit path or the default location
///
/// An explicit `--config` pointing at a missing file is an error; the default
/// location being absent just means defaults.
pub fn load_config(override_path: Option<&Path>) -> Result<EngineConfig> {
    match override_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            EngineConfig::load(path)
        }
        None => match default_config_path() {
            Some(path) => EngineConfig::load(&path),
            None => Ok(EngineConfig::default()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn explicit_missing_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");

        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_config_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "settle_ms = 1500\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.settle_ms, 1500);
        assert_eq!(config.forget_ms, 5000);
    }
}
