//! Driver payment settings model
//!
//! One row per driver: the PIN hash, failed-attempt accounting, lockout
//! window, and configured spend limits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::DriverId;
use super::money::Money;

/// Which spend ceiling a check ran against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitScope {
    Daily,
    Monthly,
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// A driver's payment settings row
///
/// Invariant: `failed_attempts` resets to 0 whenever a PIN check succeeds
/// or a lockout window is created or expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverPaymentSettings {
    /// The driver this row belongs to
    pub driver_id: DriverId,

    /// Argon2id hash of the PIN, in PHC string format
    pub pin_hash: String,

    /// Whether a PIN is currently active
    pub pin_active: bool,

    /// Consecutive failed verification attempts (0-3)
    pub failed_attempts: u32,

    /// End of the current lockout window, if one is open
    pub lockout_until: Option<DateTime<Utc>>,

    /// Daily spend ceiling; absent means the configured default applies
    pub daily_limit: Option<Money>,

    /// Monthly spend ceiling; absent means the configured default applies
    pub monthly_limit: Option<Money>,

    /// Whether the driver must change the PIN at next use
    #[serde(default)]
    pub require_pin_change: bool,

    /// When the PIN was last set
    pub pin_changed_at: Option<DateTime<Utc>>,

    /// When the row was created
    pub created_at: DateTime<Utc>,

    /// When the row was last modified
    pub updated_at: DateTime<Utc>,
}

impl DriverPaymentSettings {
    /// Create a fresh row with no PIN configured
    pub fn new(driver_id: DriverId) -> Self {
        let now = Utc::now();
        Self {
            driver_id,
            pin_hash: String::new(),
            pin_active: false,
            failed_attempts: 0,
            lockout_until: None,
            daily_limit: None,
            monthly_limit: None,
            require_pin_change: false,
            pin_changed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a lockout window is open at `now`
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lockout_until, Some(until) if until > now)
    }

    /// Install a new PIN hash, resetting attempt accounting
    pub fn set_pin_hash(&mut self, hash: String) {
        let now = Utc::now();
        self.pin_hash = hash;
        self.pin_active = true;
        self.failed_attempts = 0;
        self.lockout_until = None;
        self.require_pin_change = false;
        self.pin_changed_at = Some(now);
        self.updated_at = now;
    }
}
