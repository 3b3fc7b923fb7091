//! Durable key-value backends.
//!
//! Every persisted collection is written as one whole JSON value under a
//! fixed key. Writes replace the previous value completely; a reader never
//! observes a partially written value.

use crate::error::{Error, Result};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Store Keys
// ─────────────────────────────────────────────────────────────────────────────

/// Key of the saved items array.
pub const SAVED_ITEMS_KEY: &str = "savedTabs";

/// Key of the saved groups array.
pub const SAVED_GROUPS_KEY: &str = "savedGroups";

/// Key of the theme preference.
pub const THEME_KEY: &str = "theme";

// ─────────────────────────────────────────────────────────────────────────────
// KeyValueStore Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Whole-value persistence keyed by name.
pub trait KeyValueStore {
    /// Read the raw JSON stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Load and deserialize `key`, falling back to `T::default()` when the value
/// is missing or unreadable.
pub fn load_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    match store.read(key) {
        Ok(Some(raw)) if !raw.trim().is_empty() => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Stored value '{}' is not valid JSON: {}. Using default.", key, e);
                T::default()
            }
        },
        Ok(_) => {
            debug!("No stored value for '{}', using default", key);
            T::default()
        }
        Err(e) => {
            warn!("{}. Using default.", e);
            T::default()
        }
    }
}

/// Serialize `value` and write it under `key`.
pub fn save_value<T, S>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string(value).map_err(|e| Error::StoreWrite {
        key: key.to_string(),
        source: Box::new(e),
    })?;
    store.write(key, &json)
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON File Store
// ─────────────────────────────────────────────────────────────────────────────

/// Stores each key as `<key>.json` inside a directory.
///
/// Writes go to `<key>.json.tmp` first and are renamed over the target, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            debug!("Creating data directory: {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| Error::FileWrite {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| Error::StoreRead {
                key: key.to_string(),
                source: Box::new(e),
            })
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!("{}.json.tmp", key));

        fs::write(&tmp_path, value).map_err(|e| Error::StoreWrite {
            key: key.to_string(),
            source: Box::new(e),
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| Error::StoreWrite {
            key: key.to_string(),
            source: Box::new(e),
        })?;

        debug!("Persisted '{}' to {}", key, path.display());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Store
// ─────────────────────────────────────────────────────────────────────────────

/// Non-durable store used for `--in-memory` runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    /// Keys whose writes are rejected, to exercise failure paths
    #[cfg(test)]
    failing_keys: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write to `key` fail.
    #[cfg(test)]
    pub fn fail_writes_to(&mut self, key: &str) {
        self.failing_keys.push(key.to_string());
    }

    /// Allow writes to all keys again.
    #[cfg(test)]
    pub fn clear_failures(&mut self) {
        self.failing_keys.clear();
    }

    /// Raw stored value, for assertions.
    #[cfg(test)]
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        #[cfg(test)]
        if self.failing_keys.iter().any(|k| k == key) {
            return Err(Error::StoreWrite {
                key: key.to_string(),
                source: "write rejected".into(),
            });
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
