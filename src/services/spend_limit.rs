//! Spend limit guard service
//!
//! Compares a proposed transaction amount against the driver's daily and
//! monthly ceilings. Spend already settled comes from the external
//! transaction ledger; this guard reads and compares, never writes.

use std::cmp::max;

use crate::config::Settings;
use crate::error::{FleetPayError, FleetPayResult};
use crate::models::{DriverId, LimitScope, Money};
use crate::storage::Storage;

/// External collaborator exposing the settled-transaction ledger
///
/// The ledger itself updates only when an actual fuel transaction
/// settles, outside this crate.
pub trait SpendLedger {
    /// The driver's settled spend so far today
    fn spent_today(&self, driver: DriverId) -> FleetPayResult<Money>;

    /// The driver's settled spend so far this calendar month
    fn spent_this_month(&self, driver: DriverId) -> FleetPayResult<Money>;
}

/// Service enforcing daily/monthly spend ceilings
pub struct SpendLimitGuard<'a> {
    storage: &'a Storage,
    ledger: &'a dyn SpendLedger,
    default_daily: Option<Money>,
    default_monthly: Option<Money>,
}

impl<'a> SpendLimitGuard<'a> {
    /// Create a new spend limit guard
    pub fn new(storage: &'a Storage, ledger: &'a dyn SpendLedger, settings: &Settings) -> Self {
        Self {
            storage,
            ledger,
            default_daily: settings.default_daily_limit,
            default_monthly: settings.default_monthly_limit,
        }
    }

    /// Check a proposed amount against both ceilings
    ///
    /// Daily is evaluated first since it is the tighter ceiling in
    /// practice; the first violated scope is reported with its remaining
    /// headroom. An amount exactly equal to the headroom passes.
    pub fn check_limits(&self, driver: DriverId, amount: Money) -> FleetPayResult<()> {
        let row = self.storage.driver_settings.get(driver)?;

        let daily_limit = row
            .as_ref()
            .and_then(|r| r.daily_limit)
            .or(self.default_daily);
        let monthly_limit = row
            .as_ref()
            .and_then(|r| r.monthly_limit)
            .or(self.default_monthly);

        if let Some(limit) = daily_limit {
            let remaining = limit - self.ledger.spent_today(driver)?;
            if amount > remaining {
                return Err(FleetPayError::LimitExceeded {
                    scope: LimitScope::Daily,
                    remaining: max(remaining, Money::zero()),
                });
            }
        }

        if let Some(limit) = monthly_limit {
            let remaining = limit - self.ledger.spent_this_month(driver)?;
            if amount > remaining {
                return Err(FleetPayError::LimitExceeded {
                    scope: LimitScope::Monthly,
                    remaining: max(remaining, Money::zero()),
                });
            }
        }

        Ok(())
    }
}
