//! The daemon loop: watch, sweep, unblock

use crate::locks::{InstanceLock, LockError};
use crate::util;
use anyhow::{Context, Result};
use iub_core::{FileSettings, MarkOfTheWebRemover, UnblockEngine};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::info;
use watcher::DirectoryWatcher;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = util::load_config(config_path)?;

    // One daemon per user; a second invocation exits cleanly
    let _lock = match InstanceLock::acquire(&util::lock_path()?) {
        Ok(lock) => lock,
        Err(LockError::AlreadyRunning { pid }) => {
            info!("another instance is already running (pid {pid})");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let settings = Arc::new(FileSettings::new(util::settings_path()?));
    let action = Arc::new(MarkOfTheWebRemover);
    let engine = Arc::new(UnblockEngine::new(&config, settings, action));

    let watch_dir = config
        .effective_watch_dir()
        .context("no watch directory configured and no downloads directory found")?;

    let recorder = engine.clone();
    let mut dir_watcher = DirectoryWatcher::start(&watch_dir, move |path| {
        recorder.on_file_changed(&path, Instant::now());
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(engine.clone().run(shutdown_rx));

    info!(
        "insta-unblock running (mode: {})",
        if engine.is_unblocking_enabled() {
            "unblocking"
        } else {
            "idle"
        }
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    // Shutdown order: disarm the timer first and let an in-flight sweep
    // finish, then cancel the notification subscription. Pending entries are
    // discarded with the process.
    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
    dir_watcher.stop();

    info!("done");
    Ok(())
}
