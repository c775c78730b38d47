use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{AppError, AppResult};

const DATA_DIR: &str = ".loyalty_relay";
const DATA_DIR_ENV: &str = "LOYALTY_RELAY_DATA_DIR";
const STORAGE_FILE: &str = "local_storage.json";

/// Well-known storage keys
pub const TOKEN_KEY: &str = "jwtToken";
pub const SESSION_KEY: &str = "sessionId";
pub const MESSAGES_KEY: &str = "chatMessages";

/// Get data directory path
pub fn get_data_dir() -> Result<PathBuf, String> {
    let data_dir = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let home = dirs::home_dir().ok_or("Failed to get user home directory")?;
            home.join(DATA_DIR)
        }
    };

    // Ensure directory exists
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)
            .map_err(|e| format!("Failed to create data directory: {}", e))?;
    }

    Ok(data_dir)
}

/// Key-value string storage persisted as a single JSON file.
///
/// Every mutation rewrites the file through a temp file and a rename, so a
/// crash never leaves a half-written store behind.
pub struct LocalStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl LocalStore {
    /// Open the store in the default data directory
    pub fn open_default() -> AppResult<Self> {
        let dir = get_data_dir().map_err(AppError::Storage)?;
        Self::open(dir.join(STORAGE_FILE))
    }

    /// Open (or create on first write) the store at `path`.
    ///
    /// An unreadable store is logged and replaced rather than blocking startup.
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("Discarding corrupt local storage {:?}: {}", path, e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().ok()?.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> AppResult<()> {
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), value.into());
        self.persist(&entries)
    }

    pub fn remove(&self, key: &str) -> AppResult<()> {
        let mut entries = self.lock()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> AppResult<()> {
        let mut entries = self.lock()?;
        entries.clear();
        self.persist(&entries)
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Storage("Local storage lock poisoned".to_string()))
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;
        let temp_path = self.path.with_extension("json.tmp");

        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
