//! Settings storage for the unblock engine
//!
//! The engine reads one boolean per sweep and never caches it, so a toggle
//! written by another process takes effect on the very next sweep. Every
//! failure at this boundary degrades to the caller-supplied default; nothing
//! here ever propagates an error into the sweep logic.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key/value settings store
///
/// Reads fall back to the provided default on any failure; writes are
/// best-effort and silent.
pub trait SettingsStore: Send + Sync {
    fn get_bool(&self, name: &str, default: bool) -> bool;
    fn set_bool(&self, name: &str, value: bool);

    fn get_int(&self, name: &str, default: i64) -> i64;
    fn set_int(&self, name: &str, value: i64);

    fn get_string(&self, name: &str, default: &str) -> String;
    /// `None` deletes the entry
    fn set_string(&self, name: &str, value: Option<&str>);
}

/// JSON-file-backed settings store
///
/// Re-reads the file on every get so that writes from a second process (the
/// `enable`/`disable` commands) are visible to a running daemon without any
/// notification channel between the two.
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Option<Map<String, Value>> {
        let bytes = fs::read(&self.path).ok()?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => {
                warn!("settings file {} is not a JSON object", self.path.display());
                None
            }
            Err(err) => {
                warn!("unreadable settings file {}: {err}", self.path.display());
                None
            }
        }
    }

    fn get_value(&self, name: &str) -> Option<Value> {
        self.read_map()?.get(name).cloned()
    }

    fn update(&self, apply: impl FnOnce(&mut Map<String, Value>)) {
        let mut map = self.read_map().unwrap_or_default();
        apply(&mut map);

        let serialized = match serde_json::to_vec_pretty(&Value::Object(map)) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("failed to serialize settings: {err}");
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(err) = fs::write(&self.path, serialized) {
            warn!("failed to write settings {}: {err}", self.path.display());
        }
    }
}

impl SettingsStore for FileSettings {
    fn get_bool(&self, name: &str, default: bool) -> bool {
        self.get_value(name)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    fn set_bool(&self, name: &str, value: bool) {
        self.update(|map| {
            map.insert(name.to_string(), Value::Bool(value));
        });
    }

    fn get_int(&self, name: &str, default: i64) -> i64 {
        self.get_value(name)
            .and_then(|v| v.as_i64())
            .unwrap_or(default)
    }

    fn set_int(&self, name: &str, value: i64) {
        self.update(|map| {
            map.insert(name.to_string(), Value::from(value));
        });
    }

    fn get_string(&self, name: &str, default: &str) -> String {
        self.get_value(name)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    fn set_string(&self, name: &str, value: Option<&str>) {
        self.update(|map| match value {
            Some(value) => {
                map.insert(name.to_string(), Value::from(value));
            }
            None => {
                map.remove(name);
            }
        });
    }
}

/// In-memory settings store for tests and embedding
pub struct MemorySettings {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemorySettings {
    fn get_bool(&self, name: &str, default: bool) -> bool {
        self.values
            .lock()
            .get(name)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    fn set_bool(&self, name: &str, value: bool) {
        self.values
            .lock()
            .insert(name.to_string(), Value::Bool(value));
    }

    fn get_int(&self, name: &str, default: i64) -> i64 {
        self.values
            .lock()
            .get(name)
            .and_then(|v| v.as_i64())
            .unwrap_or(default)
    }

    fn set_int(&self, name: &str, value: i64) {
        self.values.lock().insert(name.to_string(), Value::from(value));
    }

    fn get_string(&self, name: &str, default: &str) -> String {
        self.values
            .lock()
            .get(name)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    fn set_string(&self, name: &str, value: Option<&str>) {
        let mut values = self.values.lock();
        match value {
            Some(value) => {
                values.insert(name.to_string(), Value::from(value));
            }
            None => {
                values.remove(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = FileSettings::new(temp_dir.path().join("settings.json"));

        assert!(settings.get_bool("Unblocking", true));
        assert!(!settings.get_bool("Unblocking", false));
        assert_eq!(settings.get_int("Count", 7), 7);
        assert_eq!(settings.get_string("Name", "fallback"), "fallback");
    }

    #[test]
    fn write_then_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let settings = FileSettings::new(temp_dir.path().join("settings.json"));

        settings.set_bool("Unblocking", false);
        settings.set_int("Count", 42);
        settings.set_string("Name", Some("downloads"));

        assert!(!settings.get_bool("Unblocking", true));
        assert_eq!(settings.get_int("Count", 0), 42);
        assert_eq!(settings.get_string("Name", ""), "downloads");

        settings.set_string("Name", None);
        assert_eq!(settings.get_string("Name", "gone"), "gone");
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, b"{not json").unwrap();

        let settings = FileSettings::new(&path);
        assert!(settings.get_bool("Unblocking", true));

        // A write replaces the corrupt file with a fresh object
        settings.set_bool("Unblocking", false);
        assert!(!settings.get_bool("Unblocking", true));
    }

    #[test]
    fn unwritable_location_fails_silently() {
        let settings = FileSettings::new("/proc/no-such-dir/settings.json");

        settings.set_bool("Unblocking", false);
        assert!(settings.get_bool("Unblocking", true));
    }

    #[test]
    fn two_stores_share_one_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        let writer = FileSettings::new(&path);
        let reader = FileSettings::new(&path);

        writer.set_bool("Unblocking", false);
        assert!(!reader.get_bool("Unblocking", true));
    }

    #[test]
    fn memory_store_round_trip() {
        let settings = MemorySettings::new();

        assert!(settings.get_bool("Unblocking", true));
        settings.set_bool("Unblocking", false);
        assert!(!settings.get_bool("Unblocking", true));

        settings.set_int("Count", 3);
        assert_eq!(settings.get_int("Count", 0), 3);

        settings.set_string("Name", Some("x"));
        assert_eq!(settings.get_string("Name", ""), "x");
        settings.set_string("Name", None);
        assert_eq!(settings.get_string("Name", "y"), "y");
    }

    #[test]
    fn settings_file_created_lazily_with_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state/nested/settings.json");

        let settings = FileSettings::new(&path);
        settings.set_bool("Unblocking", true);

        assert!(path.exists());
        assert!(settings.get_bool("Unblocking", false));
    }
}
