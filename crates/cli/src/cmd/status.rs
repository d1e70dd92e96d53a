//! Show the current mode and effective configuration

use crate::util;
use anyhow::Result;
use iub_core::{FileSettings, SettingsStore, UNBLOCKING_DEFAULT, UNBLOCKING_SETTING_NAME};
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = util::load_config(config_path)?;
    let settings = FileSettings::new(util::settings_path()?);

    let enabled = settings.get_bool(UNBLOCKING_SETTING_NAME, UNBLOCKING_DEFAULT);
    println!("mode: {}", if enabled { "unblocking" } else { "idle" });

    match config.effective_watch_dir() {
        Some(dir) => println!("watch dir: {}", dir.display()),
        None => println!("watch dir: (none found)"),
    }

    println!(
        "settle: {}ms, forget: {}ms, sweep every {}ms",
        config.settle_ms, config.forget_ms, config.sweep_interval_ms
    );

    Ok(())
}
