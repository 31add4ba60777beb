//! Device Configuration Store
//!
//! Flat key/value settings, one scope per output device id.
//!
//! # Storage Locations
//! - Linux: `~/.config/tonal/devices.json`
//! - Windows: `%APPDATA%\tonal\config\devices.json`
//! - macOS: `~/Library/Application Support/com.tonal.tonal/devices.json`

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, CoreResult};

/// Per-device settings storage
///
/// Values are strings underneath; booleans are stored as `"true"`/`"false"`.
/// Implementations must be callable from any thread.
pub trait DeviceConfigurationStore: Send + Sync {
    fn get_string(&self, scope: &str, key: &str, default: &str) -> String;

    fn put_string(&self, scope: &str, key: &str, value: &str) -> CoreResult<()>;

    fn get_bool(&self, scope: &str, key: &str, default: bool) -> bool {
        let raw = self.get_string(scope, key, if default { "true" } else { "false" });
        match raw.as_str() {
            "true" => true,
            "false" => false,
            other => {
                warn!("{}/{}: {:?} is not a boolean, using {}", scope, key, other, default);
                default
            }
        }
    }

    fn put_bool(&self, scope: &str, key: &str, value: bool) -> CoreResult<()> {
        self.put_string(scope, key, if value { "true" } else { "false" })
    }
}

/// `{ scope: { key: value } }`
type ScopeMap = HashMap<String, BTreeMap<String, String>>;

fn lookup(scopes: &ScopeMap, scope: &str, key: &str, default: &str) -> String {
    scopes
        .get(scope)
        .and_then(|values| values.get(key))
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

/// Volatile store, for tests and hosts without persistence
#[derive(Default)]
pub struct MemoryConfigStore {
    scopes: RwLock<ScopeMap>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key set under `scope`
    pub fn scope_values(&self, scope: &str) -> BTreeMap<String, String> {
        self.scopes.read().get(scope).cloned().unwrap_or_default()
    }
}

impl DeviceConfigurationStore for MemoryConfigStore {
    fn get_string(&self, scope: &str, key: &str, default: &str) -> String {
        lookup(&self.scopes.read(), scope, key, default)
    }

    fn put_string(&self, scope: &str, key: &str, value: &str) -> CoreResult<()> {
        self.scopes
            .write()
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a single JSON document, rewritten after each put
pub struct JsonConfigStore {
    path: PathBuf,
    scopes: RwLock<ScopeMap>,
}

impl JsonConfigStore {
    /// Open the store at the platform config location
    pub fn open_default() -> CoreResult<Self> {
        let path = Self::default_path()
            .ok_or_else(|| CoreError::Store("Could not determine config path".into()))?;
        Ok(Self::open(path))
    }

    /// Open `path`, starting empty if it is missing or unreadable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let scopes = Self::load(&path);
        Self {
            path,
            scopes: RwLock::new(scopes),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Platform-specific location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "tonal", "tonal")
            .map(|proj| proj.config_dir().join("devices.json"))
    }

    fn load(path: &Path) -> ScopeMap {
        if !path.exists() {
            debug!("No device settings at {:?}, starting empty", path);
            return ScopeMap::new();
        }

        match fs::File::open(path) {
            Ok(file) => match serde_json::from_reader(file) {
                Ok(scopes) => {
                    info!("Device settings loaded from {:?}", path);
                    return scopes;
                }
                Err(e) => {
                    error!("Failed to parse device settings file: {}", e);
                }
            },
            Err(e) => {
                error!("Failed to open device settings file: {}", e);
            }
        }

        ScopeMap::new()
    }

    fn save(&self, scopes: &ScopeMap) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::Store(e.to_string()))?;
        }

        // Stable scope order keeps the file diffable
        let ordered: BTreeMap<_, _> = scopes.iter().collect();
        let file = fs::File::create(&self.path).map_err(|e| CoreError::Store(e.to_string()))?;
        serde_json::to_writer_pretty(file, &ordered).map_err(|e| CoreError::Store(e.to_string()))?;

        debug!("Device settings saved to {:?}", self.path);
        Ok(())
    }
}

impl DeviceConfigurationStore for JsonConfigStore {
    fn get_string(&self, scope: &str, key: &str, default: &str) -> String {
        lookup(&self.scopes.read(), scope, key, default)
    }

    fn put_string(&self, scope: &str, key: &str, value: &str) -> CoreResult<()> {
        // Held across the save so concurrent writers hit the file in order
        let mut scopes = self.scopes.write();
        scopes
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self.save(&scopes)
    }
}
