//! PIN authenticator service
//!
//! Stores a salted Argon2id hash of each driver's 4-digit PIN, verifies
//! attempts, and enforces the failed-attempt counter and timed lockout.
//! Attempt accounting runs inside a single write-lock critical section
//! per driver row, so two concurrent wrong guesses cannot race past the
//! lockout threshold.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::audit::EntityType;
use crate::config::Settings;
use crate::crypto::pin_hash;
use crate::error::{FleetPayError, FleetPayResult};
use crate::models::{DriverId, DriverPaymentSettings};
use crate::storage::Storage;

/// Service for driver PIN management
pub struct PinAuthenticator<'a> {
    storage: &'a Storage,
    max_attempts: u32,
    lockout: Duration,
}

/// Decision taken inside the attempt-accounting critical section
enum VerifyOutcome {
    NoPin,
    Locked(DateTime<Utc>),
    Verified,
    Incorrect { attempts_remaining: u32 },
    JustLocked(DateTime<Utc>),
    CorruptHash(FleetPayError),
}

impl<'a> PinAuthenticator<'a> {
    /// Create a new PIN authenticator with the configured policy
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            max_attempts: settings.pin_max_attempts,
            lockout: settings.lockout_duration(),
        }
    }

    /// Set or change a driver's PIN
    ///
    /// The new PIN must be exactly 4 digits and survive the weak-PIN
    /// checks. When a PIN is already active and `old_pin` is supplied, it
    /// must verify against the stored hash first. On success a fresh
    /// salted hash is stored, attempt accounting resets, and any lockout
    /// clears.
    pub fn set_pin(
        &self,
        driver_id: DriverId,
        new_pin: &str,
        old_pin: Option<&str>,
    ) -> FleetPayResult<()> {
        if let Some(reason) = pin_weakness(new_pin) {
            return Err(FleetPayError::WeakPin(reason.to_string()));
        }

        let existing = self.storage.driver_settings.get(driver_id)?;

        if let Some(ref row) = existing {
            if row.pin_active {
                if let Some(old) = old_pin {
                    if !pin_hash::verify_pin(old, &row.pin_hash)? {
                        return Err(FleetPayError::IncorrectOldPin);
                    }
                }
            }
        }

        let hash = pin_hash::hash_pin(new_pin)?;
        let had_pin = existing.as_ref().map(|r| r.pin_active).unwrap_or(false);

        let mut row = existing.unwrap_or_else(|| DriverPaymentSettings::new(driver_id));
        row.set_pin_hash(hash);

        self.storage.driver_settings.upsert(row)?;
        self.storage.driver_settings.save()?;

        self.storage.log_update(
            EntityType::DriverSettings,
            driver_id.to_string(),
            None,
            &json!({ "pin_active": had_pin }),
            &json!({ "pin_active": true }),
            Some(if had_pin {
                "PIN changed".to_string()
            } else {
                "PIN set".to_string()
            }),
        )?;

        Ok(())
    }

    /// Verify a PIN attempt
    ///
    /// Fails fast with `NoPinConfigured` when no active PIN exists and
    /// with `Locked` while a lockout window is open; no hash comparison
    /// runs in either case. A mismatch increments the failed counter and,
    /// at the attempt budget, opens a lockout window. The counter resets
    /// whenever a check succeeds or a window is created or expires.
    pub fn verify_pin(&self, driver_id: DriverId, pin: &str) -> FleetPayResult<()> {
        let now = Utc::now();
        let max_attempts = self.max_attempts;
        let lockout = self.lockout;

        let outcome = self
            .storage
            .driver_settings
            .update_with(driver_id, |row| {
                if !row.pin_active {
                    return VerifyOutcome::NoPin;
                }

                if let Some(until) = row.lockout_until {
                    if until > now {
                        return VerifyOutcome::Locked(until);
                    }
                    // Window elapsed: fresh counter before the comparison
                    row.failed_attempts = 0;
                    row.lockout_until = None;
                }

                match pin_hash::verify_pin(pin, &row.pin_hash) {
                    Ok(true) => {
                        row.failed_attempts = 0;
                        row.lockout_until = None;
                        VerifyOutcome::Verified
                    }
                    Ok(false) => {
                        row.failed_attempts += 1;
                        if row.failed_attempts >= max_attempts {
                            let until = now + lockout;
                            row.lockout_until = Some(until);
                            row.failed_attempts = 0;
                            VerifyOutcome::JustLocked(until)
                        } else {
                            VerifyOutcome::Incorrect {
                                attempts_remaining: max_attempts - row.failed_attempts,
                            }
                        }
                    }
                    Err(e) => VerifyOutcome::CorruptHash(e),
                }
            })?
            .unwrap_or(VerifyOutcome::NoPin);

        self.storage.driver_settings.save()?;

        match outcome {
            VerifyOutcome::Verified => Ok(()),
            VerifyOutcome::NoPin => Err(FleetPayError::NoPinConfigured),
            VerifyOutcome::Locked(until) => Err(FleetPayError::Locked { until }),
            VerifyOutcome::Incorrect { attempts_remaining } => {
                Err(FleetPayError::IncorrectPin { attempts_remaining })
            }
            VerifyOutcome::JustLocked(until) => {
                self.storage.log_update(
                    EntityType::DriverSettings,
                    driver_id.to_string(),
                    None,
                    &json!({ "locked": false }),
                    &json!({ "locked": true, "lockout_until": until }),
                    Some(format!("locked out until {}", until)),
                )?;
                Err(FleetPayError::IncorrectPin {
                    attempts_remaining: 0,
                })
            }
            VerifyOutcome::CorruptHash(e) => Err(e),
        }
    }
}

/// Why a candidate PIN is too weak, or `None` if acceptable
///
/// Rejected: anything but 4 digits, all-identical digits, strictly
/// ascending or descending runs (`1234`, `4321`), and two-digit repeats
/// (`1212`).
fn pin_weakness(pin: &str) -> Option<&'static str> {
    if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Some("PIN must be exactly 4 digits");
    }

    let d: Vec<i16> = pin.bytes().map(|b| (b - b'0') as i16).collect();

    if d.iter().all(|&x| x == d[0]) {
        return Some("PIN digits must not all be identical");
    }
    if d.windows(2).all(|w| w[1] - w[0] == 1) || d.windows(2).all(|w| w[1] - w[0] == -1) {
        return Some("PIN must not be a sequential run");
    }
    if d[0] == d[2] && d[1] == d[3] {
        return Some("PIN must not be a repeating pattern");
    }

    None
}
