//! Driver settings repository for JSON storage
//!
//! Manages loading and saving driver payment settings. The closure-based
//! `update_with` keeps PIN-attempt accounting atomic per driver row: two
//! concurrent wrong guesses serialize on the write lock, so neither can
//! race past the lockout threshold.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::Utc;

use crate::error::FleetPayError;
use crate::models::{DriverId, DriverPaymentSettings};

use super::file_io::{read_json, write_json_atomic};

/// Serializable driver settings data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct DriverSettingsData {
    drivers: Vec<DriverPaymentSettings>,
}

/// Repository for driver payment settings persistence
pub struct DriverSettingsRepository {
    path: PathBuf,
    data: RwLock<HashMap<DriverId, DriverPaymentSettings>>,
}

impl DriverSettingsRepository {
    /// Create a new driver settings repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load settings from disk
    pub fn load(&self) -> Result<(), FleetPayError> {
        let file_data: DriverSettingsData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        for settings in file_data.drivers {
            data.insert(settings.driver_id, settings);
        }

        Ok(())
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut drivers: Vec<_> = data.values().cloned().collect();
        drivers.sort_by_key(|d| d.created_at);

        write_json_atomic(&self.path, &DriverSettingsData { drivers })
    }

    /// Get a driver's settings row
    pub fn get(&self, id: DriverId) -> Result<Option<DriverPaymentSettings>, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Insert or update a driver's settings row
    pub fn upsert(&self, settings: DriverPaymentSettings) -> Result<(), FleetPayError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(settings.driver_id, settings);
        Ok(())
    }

    /// Atomically read-modify-write a driver's row
    ///
    /// Holds the write lock across the closure so the read, the decision,
    /// and the write cannot interleave with another caller. Returns `None`
    /// when the driver has no row.
    pub fn update_with<T>(
        &self,
        id: DriverId,
        f: impl FnOnce(&mut DriverPaymentSettings) -> T,
    ) -> Result<Option<T>, FleetPayError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        match data.get_mut(&id) {
            Some(settings) => {
                let result = f(settings);
                settings.updated_at = Utc::now();
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    /// Count stored rows
    pub fn count(&self) -> Result<usize, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.len())
    }
}
