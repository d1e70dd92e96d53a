//! Toggle the unblock mode
//!
//! Writes through to the shared settings file. A running daemon re-reads the
//! flag once per sweep, so the change takes effect within one sweep interval
//! with no signalling between the two processes.

use crate::util;
use anyhow::Result;
use iub_core::{FileSettings, SettingsStore, UNBLOCKING_SETTING_NAME};

pub fn run(value: bool) -> Result<()> {
    let settings = FileSettings::new(util::settings_path()?);
    settings.set_bool(UNBLOCKING_SETTING_NAME, value);

    println!(
        "unblocking {}",
        if value { "enabled" } else { "disabled" }
    );
    Ok(())
}
