//! Encryption key repository for JSON storage
//!
//! Manages loading and saving DEK versions to encryption_keys.json.
//! Key rows are append-only; only the active flag ever changes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::FleetPayError;
use crate::models::{EncryptionKey, KeyId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable key data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct KeyData {
    keys: Vec<EncryptionKey>,
}

/// Repository for encryption key persistence
pub struct KeyRepository {
    path: PathBuf,
    data: RwLock<HashMap<KeyId, EncryptionKey>>,
}

impl KeyRepository {
    /// Create a new key repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load keys from disk
    pub fn load(&self) -> Result<(), FleetPayError> {
        let file_data: KeyData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        for key in file_data.keys {
            data.insert(key.id, key);
        }

        Ok(())
    }

    /// Save keys to disk
    pub fn save(&self) -> Result<(), FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut keys: Vec<_> = data.values().cloned().collect();
        keys.sort_by_key(|k| k.version);

        write_json_atomic(&self.path, &KeyData { keys })
    }

    /// Get a key by ID
    pub fn get(&self, id: KeyId) -> Result<Option<EncryptionKey>, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Get the currently active key, if any
    pub fn active(&self) -> Result<Option<EncryptionKey>, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.values().find(|k| k.active).cloned())
    }

    /// The version number the next key should carry
    pub fn next_version(&self) -> Result<u32, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.values().map(|k| k.version).max().unwrap_or(0) + 1)
    }

    /// Insert a new active key, clearing the active flag on all others
    ///
    /// Runs under a single write lock so no reader ever observes two
    /// active keys.
    pub fn insert_active(&self, key: EncryptionKey) -> Result<(), FleetPayError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        for existing in data.values_mut() {
            existing.active = false;
        }
        data.insert(key.id, key);
        Ok(())
    }

    /// Count stored key versions
    pub fn count(&self) -> Result<usize, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.len())
    }
}
