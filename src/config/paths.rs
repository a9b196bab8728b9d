//! Path management for the payment core
//!
//! Provides XDG-compliant path resolution for configuration and data.
//!
//! ## Path Resolution Order
//!
//! 1. `FLEETPAY_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/fleetpay` or `~/.config/fleetpay`
//! 3. Windows: `%APPDATA%\fleetpay`

use std::path::PathBuf;

use crate::error::FleetPayError;

/// Manages all paths used by the payment core
#[derive(Debug, Clone)]
pub struct VaultPaths {
    /// Base directory for all payment core data
    base_dir: PathBuf,
}

impl VaultPaths {
    /// Create a new VaultPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, FleetPayError> {
        let base_dir = if let Ok(custom) = std::env::var("FLEETPAY_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create VaultPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Get the path to encryption_keys.json
    pub fn keys_file(&self) -> PathBuf {
        self.data_dir().join("encryption_keys.json")
    }

    /// Get the path to payment_cards.json
    pub fn cards_file(&self) -> PathBuf {
        self.data_dir().join("payment_cards.json")
    }

    /// Get the path to driver_settings.json
    pub fn driver_settings_file(&self) -> PathBuf {
        self.data_dir().join("driver_settings.json")
    }

    /// Get the path to nfc_transactions.json
    pub fn nfc_transactions_file(&self) -> PathBuf {
        self.data_dir().join("nfc_transactions.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), FleetPayError> {
        std::fs::create_dir_all(self.data_dir()).map_err(|e| {
            FleetPayError::Io(format!(
                "Failed to create data directory {}: {}",
                self.data_dir().display(),
                e
            ))
        })?;
        Ok(())
    }
}

fn resolve_default_path() -> Result<PathBuf, FleetPayError> {
    #[cfg(windows)]
    {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| FleetPayError::Io("APPDATA environment variable not set".into()))?;
        Ok(PathBuf::from(appdata).join("fleetpay"))
    }

    #[cfg(not(windows))]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg).join("fleetpay"));
        }
        let home = std::env::var("HOME")
            .map_err(|_| FleetPayError::Io("HOME environment variable not set".into()))?;
        Ok(PathBuf::from(home).join(".config").join("fleetpay"))
    }
}
