use std::collections::HashMap;
use std::sync::Mutex;

use crate::{GridState, StorageError};

/// Storage keys are namespaced as `table:{table_id}`.
pub const STORAGE_KEY_PREFIX: &str = "table:";

/// A synchronous key-value backend (browser local storage, a file, an in-memory map).
///
/// Implementations should behave like a fast local cache: the engine calls `set` after every
/// committed state transition.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

pub fn storage_key(table_id: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}{table_id}")
}

/// Loads the persisted state for `table_id`.
///
/// A missing entry and an entry that fails to parse are both reported as `None`.
pub fn load_state(store: &dyn KeyValueStore, table_id: &str) -> Option<GridState> {
    let raw = store.get(&storage_key(table_id))?;
    match serde_json::from_str::<GridState>(&raw) {
        Ok(state) => Some(state),
        Err(_err) => {
            gwarn!(table_id, error = %_err, "discarding unparseable persisted grid state");
            None
        }
    }
}

pub fn save_state(
    store: &dyn KeyValueStore,
    table_id: &str,
    state: &GridState,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(state)?;
    store.set(&storage_key(table_id), &raw)
}

/// An in-memory store, mainly for tests and server-side sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.into(), value.into());
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A store that remembers nothing (server-rendered passes, persistence turned off).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopStore;

impl KeyValueStore for NoopStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }
}
