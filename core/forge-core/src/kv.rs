//! Persistent key-value slot (the client's "local storage").
//!
//! Holds the credential token and the last visited route. Writes are
//! synchronous and durable: every `set`/`remove` rewrites the backing file
//! before returning.
//!
//! The file is shared by every client process, so reads and writes always go
//! to disk. A write reloads the current entries, applies its one change and
//! persists the result; a key another process removed stays removed.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": { "token": "...", "lastRoute": "/friends" }
//! }
//! ```
//!
//! # Defensive Loading
//!
//! - Missing or empty file → empty store
//! - Corrupt JSON or unknown version → empty store, logged warning
//!
//! Uses temp file + rename so a crash mid-write never leaves a torn file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{ForgeError, Result};

/// Key holding the credential token.
pub const TOKEN_KEY: &str = "token";

/// Key holding the last authorized route.
pub const LAST_ROUTE_KEY: &str = "lastRoute";

const STORE_VERSION: u32 = 1;

/// A persistent string slot keyed by name.
pub trait KeyValueSlot: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// File-backed slot used by real clients.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn open(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `change` to the entries currently on disk and persists them.
    /// Nothing is written when the change leaves the entries as they were.
    fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.lock();
        let current = load_entries(&self.path);
        let mut next = current.clone();
        change(&mut next);
        if next == current {
            return Ok(());
        }
        self.persist(&next)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let store_file = StoreFile {
            version: STORE_VERSION,
            entries: entries.clone(),
        };
        let content = serde_json::to_string_pretty(&store_file)
            .map_err(|err| ForgeError::json("serialize local storage", err))?;

        let parent_dir = self.path.parent().ok_or_else(|| ForgeError::StorageMalformed {
            path: self.path.clone(),
            details: "path has no parent directory".to_string(),
        })?;
        fs_err::create_dir_all(parent_dir)
            .map_err(|err| ForgeError::io("create local storage directory", err))?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|err| ForgeError::io("create temp local storage file", err))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|err| ForgeError::io("write temp local storage file", err))?;
        temp_file
            .flush()
            .map_err(|err| ForgeError::io("flush temp local storage file", err))?;
        temp_file
            .persist(&self.path)
            .map_err(|err| ForgeError::io("commit local storage file", err.error))?;
        Ok(())
    }
}

impl KeyValueSlot for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock();
        load_entries(&self.path).remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            warn!(error = %err, "Failed to read local storage, starting empty");
            return BTreeMap::new();
        }
    };

    if content.trim().is_empty() {
        return BTreeMap::new();
    }

    match serde_json::from_str::<StoreFile>(&content) {
        Ok(file) if file.version == STORE_VERSION => file.entries,
        Ok(file) => {
            warn!(
                version = file.version,
                expected = STORE_VERSION,
                "Unsupported local storage version, starting empty"
            );
            BTreeMap::new()
        }
        Err(err) => {
            warn!(error = %err, path = %path.display(), "Corrupt local storage, starting empty");
            BTreeMap::new()
        }
    }
}

/// In-memory slot for tests and ephemeral clients.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueSlot for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}
