//! Filesystem notification source for Insta-Unblock
//!
//! Watches a single directory (non-recursive) and forwards paths whose
//! content changed to a caller-supplied handler. Attribute-only and
//! rename-only modifications are filtered out here, so the engine only ever
//! sees events worth debouncing. The handler timestamps arrivals itself; no
//! timestamp from the notification backend is trusted.

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Non-recursive watch over one directory
///
/// A failed subscription (directory missing, backend unavailable) degrades to
/// a watcher that watches nothing: the process stays alive with zero watched
/// paths rather than aborting.
pub struct DirectoryWatcher {
    watcher: Option<RecommendedWatcher>,
    dir: PathBuf,
}

impl DirectoryWatcher {
    /// Start watching `dir`, invoking `handler` once per changed path
    ///
    /// The handler runs on the notification backend's thread and must not
    /// block; the engine's recorder only takes a short-lived lock.
    pub fn start<F>(dir: &Path, handler: F) -> Self
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        match Self::subscribe(dir, handler) {
            Ok(watcher) => Self {
                watcher: Some(watcher),
                dir: dir.to_path_buf(),
            },
            Err(err) => {
                warn!(
                    "cannot watch {}: {err:#}; continuing with no watched paths",
                    dir.display()
                );
                Self {
                    watcher: None,
                    dir: dir.to_path_buf(),
                }
            }
        }
    }

    fn subscribe<F>(dir: &Path, handler: F) -> Result<RecommendedWatcher>
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !is_content_event(&event.kind) {
                        return;
                    }
                    for path in event.paths {
                        handler(path);
                    }
                }
                // Backend errors never propagate past this callback
                Err(err) => warn!("watcher error: {err}"),
            },
            NotifyConfig::default(),
        )
        .context("failed to create filesystem watcher")?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;

        info!("monitoring {}", dir.display());
        Ok(watcher)
    }

    /// Whether the subscription actually attached
    pub fn is_active(&self) -> bool {
        self.watcher.is_some()
    }

    /// Directory this watcher was asked to monitor
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cancel the subscription; events already in flight may still arrive
    pub fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            let _ = watcher.unwatch(&self.dir);
            info!("stopped watching {}", self.dir.display());
        }
    }
}

/// Keep creations and data modifications, drop everything else
///
/// Metadata-only changes (permissions, timestamps) and pure renames do not
/// represent new content and must not restart a file's quiet-time clock.
fn is_content_event(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => true,
        EventKind::Modify(ModifyKind::Metadata(_))
        | EventKind::Modify(ModifyKind::Name(_))
        | EventKind::Modify(ModifyKind::Other) => false,
        // Some backends cannot classify at all; treat as content to be safe
        EventKind::Any => true,
        EventKind::Access(_) | EventKind::Remove(_) | EventKind::Other => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{
        AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode,
    };
    use parking_lot::Mutex;
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn content_events_pass_the_filter() {
        assert!(is_content_event(&EventKind::Create(CreateKind::File)));
        assert!(is_content_event(&EventKind::Create(CreateKind::Any)));
        assert!(is_content_event(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(is_content_event(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_content_event(&EventKind::Any));
    }

    #[test]
    fn attribute_and_name_events_are_dropped() {
        assert!(!is_content_event(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Permissions
        ))));
        assert!(!is_content_event(&EventKind::Modify(ModifyKind::Name(
            RenameMode::Both
        ))));
        assert!(!is_content_event(&EventKind::Access(AccessKind::Any)));
        assert!(!is_content_event(&EventKind::Remove(RemoveKind::File)));
    }

    #[test]
    fn missing_directory_degrades_instead_of_failing() {
        let temp_dir = TempDir::new().unwrap();
        let gone = temp_dir.path().join("no-such-dir");

        let watcher = DirectoryWatcher::start(&gone, |_| {});
        assert!(!watcher.is_active());
        assert_eq!(watcher.dir(), gone.as_path());
    }

    #[tokio::test]
    async fn written_file_reaches_the_handler() {
        let temp_dir = TempDir::new().unwrap();
        let seen: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let mut watcher = DirectoryWatcher::start(temp_dir.path(), move |path| {
            sink.lock().push(path);
        });
        assert!(watcher.is_active());

        let file = temp_dir.path().join("download.part");
        fs::write(&file, b"first chunk").unwrap();

        // Backends deliver asynchronously; poll for up to two seconds
        let mut observed = false;
        for _ in 0..40 {
            if seen.lock().iter().any(|p| p.ends_with("download.part")) {
                observed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(observed, "watcher never delivered the write event");

        watcher.stop();
        assert!(!watcher.is_active());
    }
}
