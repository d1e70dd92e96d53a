//! Core engine for Insta-Unblock
//!
//! Debounced, two-stage, time-windowed processing of file change events:
//! notifications refresh a pending table, a periodic sweep promotes entries
//! that have been quiet long enough (unblocking each exactly once) and
//! forgets processed entries after a retention window. The filesystem
//! notification source, the settings backend, and the unblock operation all
//! plug in behind small traits.

pub mod action;
pub mod config;
pub mod engine;
pub mod settings;

pub use action::{MarkOfTheWebRemover, UnblockAction};
pub use config::EngineConfig;
pub use engine::{UnblockEngine, UNBLOCKING_DEFAULT, UNBLOCKING_SETTING_NAME};
pub use settings::{FileSettings, MemorySettings, SettingsStore};
