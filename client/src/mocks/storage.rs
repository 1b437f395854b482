//! Mock key-value store for testing.

use crate::storage::{KeyValueStore, StorageError};
use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, PoisonError};

/// In-memory [`KeyValueStore`].
///
/// [`MemoryStore::failing`] builds a store whose every call fails, for
/// exercising the "log and carry on" paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    failing: bool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that fails every operation.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            failing: true,
        }
    }

    /// Current value of `key`, bypassing the failure switch.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing {
            Err(StorageError::Io(io::Error::other("storage unavailable")))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
