//! Persisted user preferences.
//!
//! Only the unit store and the location store read or write these keys.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const UNIT_SYSTEM_KEY: &str = "unit_system";
pub const FAVORITE_LOCATIONS_KEY: &str = "favorite_locations";
pub const SEARCHED_LOCATIONS_KEY: &str = "searched_locations";

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("Preference IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Preference encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Key/value store that survives restarts.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value) -> Result<(), PreferenceError>;
}

/// Reads `key` as `T`, treating a missing or mistyped value as absent.
pub fn read_pref<T: DeserializeOwned>(store: &dyn PreferenceStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Ignoring invalid preference {}: {}", key, e);
            None
        }
    }
}

/// Writes `value` under `key`, logging instead of failing.
pub fn write_pref<T: Serialize>(store: &dyn PreferenceStore, key: &str, value: &T) {
    let result = serde_json::to_value(value)
        .map_err(PreferenceError::from)
        .and_then(|v| store.set(key, v));

    if let Err(e) = result {
        tracing::warn!("Failed to persist preference {}: {}", key, e);
    }
}

/// Preferences kept in a single JSON object on disk.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFilePreferences {
    /// Open the preference file at `path`. A missing or unreadable file
    /// starts empty; the file is created on the first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<Map<String, Value>>(&json) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("Preference file {:?} is malformed, starting empty: {}", path, e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                tracing::warn!("Failed to read preference file {:?}: {}", path, e);
                Map::new()
            }
        };

        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    /// The in-memory value is updated even when the file write fails.
    ///
    /// The lock is held through the write so the file always reflects the
    /// latest snapshot.
    fn set(&self, key: &str, value: Value) -> Result<(), PreferenceError> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value);
        let json = serde_json::to_string_pretty(&*values)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Non-persistent preferences, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<Map<String, Value>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), PreferenceError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }
}
