mod sqlite_storage;

pub use sqlite_storage::SqliteStorage;

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Local, device-scoped key-value persistence: synchronous, string-keyed,
/// string-valued. This is the seam the session store persists through,
/// backed by SQLite or by plain memory.
pub trait StorageBackend: Send + Sync {
    /// Returns the value stored under the key.
    /// Returns Ok(None) if the key is not present.
    /// Returns Err if the backend fails.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores the value under the key, replacing any previous value.
    /// Returns Err if the backend fails.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory [`StorageBackend`], used by tests and by hosts that do not
/// want cross-restart persistence. Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries, for asserting that an operation left the
    /// persisted state untouched.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.lock().unwrap().clone()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
