//! NFC payment transaction model
//!
//! One row per payment attempt, created the moment a PIN check succeeds.
//! Rows are append-only except for status transitions and are never
//! deleted: every prepared-but-unfinished attempt stays auditable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{CardId, DriverId, FuelTransactionId, NfcTransactionId, OrganizationId};
use super::money::Money;

/// Status of an NFC payment transaction
///
/// `PinEntered → PinVerified → {NfcReady | Failed}`, with `Linked` once a
/// settled fuel transaction references the NFC transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NfcTransactionStatus {
    PinEntered,
    PinVerified,
    NfcReady,
    Failed,
    Linked,
}

impl NfcTransactionStatus {
    /// Whether this status admits no further transition except `Linked`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NfcReady | Self::Failed | Self::Linked)
    }
}

impl fmt::Display for NfcTransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinEntered => write!(f, "pin_entered"),
            Self::PinVerified => write!(f, "pin_verified"),
            Self::NfcReady => write!(f, "nfc_ready"),
            Self::Failed => write!(f, "failed"),
            Self::Linked => write!(f, "linked"),
        }
    }
}

/// Point-of-sale device metadata attached to a payment attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device identifier as reported by the driver app
    pub device_id: String,
    /// Platform description (e.g. "android 14")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// Location metadata attached to a payment attempt
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single NFC payment attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NfcPaymentTransaction {
    /// Unique identifier
    pub id: NfcTransactionId,

    /// The driver who initiated the payment
    pub driver_id: DriverId,

    /// The organization charged
    pub organization_id: OrganizationId,

    /// Resolved card, absent when paying from a direct account
    pub card_id: Option<CardId>,

    /// Transaction amount
    pub amount: Money,

    /// Current status
    pub status: NfcTransactionStatus,

    /// When the driver entered the PIN
    pub pin_entered_at: DateTime<Utc>,

    /// When the PIN verified
    pub pin_verified_at: Option<DateTime<Utc>>,

    /// When the encrypted payload was handed to the transport
    pub nfc_activated_at: Option<DateTime<Utc>>,

    /// Device metadata, if the driver app supplied any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,

    /// Location metadata, if the driver app supplied any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,

    /// Back-reference to the fuel transaction that settled against this attempt
    pub fuel_transaction_id: Option<FuelTransactionId>,

    /// When the row was created
    pub created_at: DateTime<Utc>,

    /// When the row was last modified
    pub updated_at: DateTime<Utc>,
}

impl NfcPaymentTransaction {
    /// Create a row in `PinVerified` state with entry/verification stamps set
    pub fn pin_verified(
        driver_id: DriverId,
        organization_id: OrganizationId,
        amount: Money,
        pin_entered_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: NfcTransactionId::new(),
            driver_id,
            organization_id,
            card_id: None,
            amount,
            status: NfcTransactionStatus::PinVerified,
            pin_entered_at,
            pin_verified_at: Some(now),
            nfc_activated_at: None,
            device_info: None,
            location: None,
            fuel_transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to `NfcReady`, stamping the activation time
    pub fn mark_ready(&mut self) {
        self.status = NfcTransactionStatus::NfcReady;
        let now = Utc::now();
        self.nfc_activated_at = Some(now);
        self.updated_at = now;
    }

    /// Transition to the terminal `Failed` state
    ///
    /// Already-terminal rows are left untouched.
    pub fn mark_failed(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = NfcTransactionStatus::Failed;
        self.updated_at = Utc::now();
    }

    /// Link the settled fuel transaction, moving `NfcReady` to `Linked`
    pub fn mark_linked(&mut self, fuel_transaction_id: FuelTransactionId) -> Result<(), String> {
        if self.status != NfcTransactionStatus::NfcReady {
            return Err(format!(
                "cannot link a transaction in state {}",
                self.status
            ));
        }
        self.status = NfcTransactionStatus::Linked;
        self.fuel_transaction_id = Some(fuel_transaction_id);
        self.updated_at = Utc::now();
        Ok(())
    }
}
