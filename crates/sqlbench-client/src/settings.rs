//! Persisted client settings.
//!
//! Settings live in one small JSON record. The migration ledger flag is
//! part of it, so whoever holds the settings decides whether the legacy
//! import runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Errors raised while loading or saving settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error reading or writing the settings file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Client-side preferences and bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Whether legacy local state has been imported into the backend.
    #[serde(default)]
    pub migrated_to_backend: bool,
    /// Whether the history panel is collapsed.
    #[serde(default)]
    pub history_collapsed: bool,
}

/// Durable storage for [`ClientSettings`].
pub trait SettingsStore: Send {
    /// Loads the stored settings, or the defaults if nothing is stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if stored settings exist but cannot be read.
    fn load(&self) -> Result<ClientSettings, SettingsError>;

    /// Replaces the stored settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be written.
    fn save(&mut self, settings: &ClientSettings) -> Result<(), SettingsError>;
}

/// Settings stored as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    /// Creates a store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettings {
    fn load(&self) -> Result<ClientSettings, SettingsError> {
        if !self.path.exists() {
            return Ok(ClientSettings::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&mut self, settings: &ClientSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Settings held in memory.
///
/// Clones share the same record, so a test can keep a handle while the
/// workbench owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    inner: Arc<Mutex<ClientSettings>>,
}

impl MemorySettings {
    /// Creates a store holding `settings`.
    #[must_use]
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(settings)),
        }
    }

    /// Returns a copy of the stored record.
    #[must_use]
    pub fn snapshot(&self) -> ClientSettings {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> Result<ClientSettings, SettingsError> {
        Ok(self.snapshot())
    }

    fn save(&mut self, settings: &ClientSettings) -> Result<(), SettingsError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = settings.clone();
        Ok(())
    }
}

/// The current settings together with the store they persist to.
pub struct PersistedSettings {
    current: ClientSettings,
    store: Box<dyn SettingsStore>,
}

impl std::fmt::Debug for PersistedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedSettings")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl PersistedSettings {
    /// Loads settings from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn open(store: impl SettingsStore + 'static) -> Result<Self, SettingsError> {
        let current = store.load()?;
        Ok(Self {
            current,
            store: Box::new(store),
        })
    }

    /// Returns the current settings.
    #[must_use]
    pub const fn get(&self) -> &ClientSettings {
        &self.current
    }

    /// Applies `change` and persists the result.
    ///
    /// The in-memory copy is updated even if saving fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn update(&mut self, change: impl FnOnce(&mut ClientSettings)) -> Result<(), SettingsError> {
        change(&mut self.current);
        self.store.save(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSettings::new(dir.path().join("settings.json"));
        assert_eq!(store.load().unwrap(), ClientSettings::default());
    }

    #[test]
    fn test_file_round_trip_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".sqlbench").join("settings.json");

        let mut settings = PersistedSettings::open(JsonFileSettings::new(&path)).unwrap();
        settings.update(|s| s.migrated_to_backend = true).unwrap();

        let reopened = PersistedSettings::open(JsonFileSettings::new(&path)).unwrap();
        assert!(reopened.get().migrated_to_backend);
        assert!(!reopened.get().history_collapsed);
    }

    #[test]
    fn test_unknown_and_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"history_collapsed": true, "theme": "dark"}"#).unwrap();

        let loaded = JsonFileSettings::new(&path).load().unwrap();
        assert!(loaded.history_collapsed);
        assert!(!loaded.migrated_to_backend);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileSettings::new(&path).load(),
            Err(SettingsError::Serialization(_))
        ));
    }

    #[test]
    fn test_memory_settings_share_state() {
        let handle = MemorySettings::default();
        let mut settings = PersistedSettings::open(handle.clone()).unwrap();
        settings.update(|s| s.history_collapsed = true).unwrap();
        assert!(handle.snapshot().history_collapsed);
    }
}
