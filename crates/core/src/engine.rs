//! Debounced two-stage file unblock engine
//!
//! Raw change notifications land in a pending table keyed by path. A periodic
//! sweep promotes entries that have been quiet for the settle window into a
//! processed table (invoking the unblock action once per promotion), and
//! evicts processed entries once the forget window has elapsed. Both tables
//! live behind a single mutex so the notification callback and the sweep
//! never race on the same path.

use crate::action::UnblockAction;
use crate::config::EngineConfig;
use crate::settings::SettingsStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Settings key holding the unblock-enabled flag
pub const UNBLOCKING_SETTING_NAME: &str = "Unblocking";

/// Default value when the settings store has no entry (or is unreachable)
pub const UNBLOCKING_DEFAULT: bool = true;

/// Pending and processed tables, guarded jointly
///
/// A path moves pending -> processed in one critical section; it is inserted
/// into `processed` before it is removed from `pending`.
struct FileTables {
    /// path -> last notification arrival (refreshed on every new event)
    pending: HashMap<PathBuf, Instant>,
    /// path -> promotion time (entry suppresses re-unblocking until forgotten)
    processed: HashMap<PathBuf, Instant>,
}

/// Debounced file unblock engine
///
/// Owns the two tables, the sweep reentrancy guard, and the sticky
/// changed flags polled by a presentation layer.
pub struct UnblockEngine {
    tables: Mutex<FileTables>,

    settings: Arc<dyn SettingsStore>,
    action: Arc<dyn UnblockAction>,

    /// Minimum quiet time before a pending path is eligible for unblocking
    settle_window: Duration,
    /// How long a processed path is remembered before it can be unblocked again
    forget_window: Duration,
    /// Period between sweeps
    sweep_interval: Duration,

    /// Set while a sweep is executing; a tick that fires during a sweep is dropped
    sweep_in_flight: AtomicBool,

    /// Sticky flags raised by mode changes, consumed by single reads
    icon_changed: AtomicBool,
    menu_changed: AtomicBool,
}

impl UnblockEngine {
    /// Create an engine with empty tables
    pub fn new(
        config: &EngineConfig,
        settings: Arc<dyn SettingsStore>,
        action: Arc<dyn UnblockAction>,
    ) -> Self {
        Self {
            tables: Mutex::new(FileTables {
                pending: HashMap::new(),
                processed: HashMap::new(),
            }),
            settings,
            action,
            settle_window: config.settle_window(),
            forget_window: config.forget_window(),
            sweep_interval: config.sweep_interval(),
            sweep_in_flight: AtomicBool::new(false),
            icon_changed: AtomicBool::new(false),
            menu_changed: AtomicBool::new(false),
        }
    }

    /// Record a change notification for a path
    ///
    /// Safe to call from any thread, concurrently with sweeps. A repeat
    /// notification while the path is pending restarts its quiet-time clock;
    /// a notification for a path still in the processed table only updates
    /// the pending table (the processed entry keeps suppressing re-unblock
    /// until it is forgotten).
    pub fn on_file_changed(&self, path: &Path, now: Instant) {
        let mut tables = self.tables.lock();

        debug!("change notification for {}", path.display());
        tables.pending.insert(path.to_path_buf(), now);
    }

    /// Run one sweep, unless another sweep is still in flight
    ///
    /// The guard makes a tick that fires mid-sweep a no-op instead of queuing
    /// a second concurrent sweep behind a slow unblock action.
    pub fn sweep(&self, now: Instant) {
        if self
            .sweep_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("sweep already in flight, dropping tick");
            return;
        }

        self.sweep_tables(now);

        self.sweep_in_flight.store(false, Ordering::Release);
    }

    /// Forget pass then promote pass, one critical section
    fn sweep_tables(&self, now: Instant) {
        let mut tables = self.tables.lock();

        // Forget processed entries whose retention window has elapsed.
        let mut to_forget = Vec::new();
        for (path, promoted_at) in &tables.processed {
            let elapsed = now.saturating_duration_since(*promoted_at);
            if elapsed >= self.forget_window {
                info!(
                    "forgetting {} (after {}ms)",
                    path.display(),
                    elapsed.as_millis()
                );
                to_forget.push(path.clone());
            }
        }
        for path in to_forget {
            tables.processed.remove(&path);
        }

        // Promote settled pending entries. The enabled flag is read at most
        // once per sweep, lazily, so every candidate in this sweep sees the
        // same value. While disabled, candidates stay pending and keep aging.
        let mut unblock: Option<bool> = None;
        let mut to_remove = Vec::new();
        let mut to_promote = Vec::new();
        for (path, seen_at) in &tables.pending {
            let elapsed = now.saturating_duration_since(*seen_at);
            if elapsed < self.settle_window {
                continue;
            }

            let enabled = *unblock.get_or_insert_with(|| {
                self.settings
                    .get_bool(UNBLOCKING_SETTING_NAME, UNBLOCKING_DEFAULT)
            });
            if !enabled {
                continue;
            }

            to_remove.push(path.clone());

            // A path still remembered in the processed table was already
            // handled; drop it from pending without invoking the action again.
            if !tables.processed.contains_key(path) {
                to_promote.push((path.clone(), elapsed));
            }
        }

        for (path, elapsed) in to_promote {
            info!(
                "unblocking {} (after {}ms)",
                path.display(),
                elapsed.as_millis()
            );
            if let Err(err) = self.action.unblock(&path) {
                // At-most-once attempt: a failed unblock is still marked
                // processed and is not retried until the path is forgotten
                // and produces a fresh notification.
                warn!("unblock failed for {}: {err:#}", path.display());
            }
            tables.processed.insert(path, now);
        }

        for path in to_remove {
            tables.pending.remove(&path);
        }
    }

    /// Run the periodic sweep loop until the shutdown signal changes
    ///
    /// An in-flight sweep completes before the loop exits; pending entries
    /// are simply discarded with the engine (state is process-lifetime only).
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(self.sweep_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("starting unblock sweeper (interval: {:?})", self.sweep_interval);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.sweep(Instant::now());
                }
                _ = shutdown.changed() => {
                    info!("unblock sweeper stopping");
                    break;
                }
            }
        }
    }

    /// Read the enabled flag from the settings store
    pub fn is_unblocking_enabled(&self) -> bool {
        self.settings
            .get_bool(UNBLOCKING_SETTING_NAME, UNBLOCKING_DEFAULT)
    }

    /// Write the enabled flag through to the settings store
    ///
    /// Takes effect on the very next sweep's flag read. Raises the sticky
    /// icon/menu changed flags for a presentation layer to poll.
    pub fn set_unblocking_enabled(&self, value: bool) {
        self.settings.set_bool(UNBLOCKING_SETTING_NAME, value);
        self.icon_changed.store(true, Ordering::Release);
        self.menu_changed.store(true, Ordering::Release);

        info!("unblock mode: {value}");
    }

    /// Consume the icon-changed flag (true at most once per change)
    pub fn get_and_clear_icon_changed(&self) -> bool {
        self.icon_changed.swap(false, Ordering::AcqRel)
    }

    /// Consume the menu-changed flag (true at most once per change)
    pub fn get_and_clear_menu_changed(&self) -> bool {
        self.menu_changed.swap(false, Ordering::AcqRel)
    }

    /// Number of paths awaiting their settle window
    pub fn pending_len(&self) -> usize {
        self.tables.lock().pending.len()
    }

    /// Number of paths inside their retention window
    pub fn processed_len(&self) -> usize {
        self.tables.lock().processed.len()
    }
}
