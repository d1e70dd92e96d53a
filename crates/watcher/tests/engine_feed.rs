//! End-to-end: filesystem writes flow through the watcher into the engine
//! and come out as exactly one unblock invocation once the file settles.

use iub_core::{EngineConfig, MemorySettings, UnblockAction, UnblockEngine};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use watcher::DirectoryWatcher;

#[derive(Default)]
struct RecordingAction {
    calls: Mutex<Vec<PathBuf>>,
}

impl RecordingAction {
    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }
}

impl UnblockAction for RecordingAction {
    fn unblock(&self, path: &Path) -> anyhow::Result<()> {
        self.calls.lock().push(path.to_path_buf());
        Ok(())
    }
}

#[tokio::test]
async fn settled_download_is_unblocked_once() {
    let temp_dir = tempfile::TempDir::new().unwrap();

    let config = EngineConfig {
        watch_dir: Some(temp_dir.path().to_path_buf()),
        sweep_interval_ms: 50,
        settle_ms: 300,
        forget_ms: 5000,
    };

    let action = Arc::new(RecordingAction::default());
    let engine = Arc::new(UnblockEngine::new(
        &config,
        Arc::new(MemorySettings::new()),
        action.clone(),
    ));

    let recorder = engine.clone();
    let mut dir_watcher = DirectoryWatcher::start(temp_dir.path(), move |path| {
        recorder.on_file_changed(&path, Instant::now());
    });
    assert!(dir_watcher.is_active());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(engine.clone().run(shutdown_rx));

    let file = temp_dir.path().join("payload.zip");
    fs::write(&file, b"downloaded bytes").unwrap();

    // Wait for the write to settle and the sweep to promote it
    let mut unblocked = false;
    for _ in 0..60 {
        if !action.calls().is_empty() {
            unblocked = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(unblocked, "file was never unblocked");
    assert_eq!(action.calls().len(), 1);
    assert!(action.calls()[0].ends_with("payload.zip"));

    // Quiet period: no further invocations for the same write burst
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(action.calls().len(), 1);

    shutdown_tx.send(true).unwrap();
    sweeper.await.unwrap();
    dir_watcher.stop();
}
