//! Runtime settings for the payment core
//!
//! PIN policy (attempt budget, lockout duration) and fallback spend limits
//! for drivers without configured ceilings.

use std::fs;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::error::{FleetPayError, FleetPayResult};
use crate::models::Money;

/// Runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Failed PIN attempts allowed before a lockout window opens
    #[serde(default = "default_pin_max_attempts")]
    pub pin_max_attempts: u32,

    /// Length of the lockout window in minutes
    #[serde(default = "default_lockout_minutes")]
    pub lockout_minutes: i64,

    /// Daily spend ceiling applied when a driver row has none configured;
    /// absent means no daily ceiling by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_daily_limit: Option<Money>,

    /// Monthly counterpart of `default_daily_limit`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_monthly_limit: Option<Money>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_pin_max_attempts() -> u32 {
    3
}

fn default_lockout_minutes() -> i64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            pin_max_attempts: default_pin_max_attempts(),
            lockout_minutes: default_lockout_minutes(),
            default_daily_limit: None,
            default_monthly_limit: None,
        }
    }
}

impl Settings {
    /// Load settings from disk, creating the file with defaults if absent
    pub fn load_or_create(paths: &VaultPaths) -> FleetPayResult<Self> {
        let path = paths.settings_file();
        if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|e| {
                FleetPayError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                FleetPayError::Json(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            Ok(settings)
        } else {
            let settings = Settings::default();
            settings.save(paths)?;
            Ok(settings)
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &VaultPaths) -> FleetPayResult<()> {
        if let Some(parent) = paths.settings_file().parent() {
            fs::create_dir_all(parent)
                .map_err(|e| FleetPayError::Io(format!("Failed to create config dir: {}", e)))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(paths.settings_file(), json)
            .map_err(|e| FleetPayError::Io(format!("Failed to write settings: {}", e)))?;
        Ok(())
    }

    /// Lockout window length as a chrono duration
    pub fn lockout_duration(&self) -> Duration {
        Duration::minutes(self.lockout_minutes)
    }
}
