//! Core data models for the payment core
//!
//! This module contains the data structures of the payment domain: the
//! encrypted card record, the versioned encryption key, per-driver PIN
//! and limit settings, and the NFC payment transaction.

pub mod card;
pub mod driver_settings;
pub mod ids;
pub mod key;
pub mod money;
pub mod nfc_transaction;

pub use card::{luhn_valid, normalize_card_number, CardBrand, CardKind, CardSummary, PaymentCard};
pub use driver_settings::{DriverPaymentSettings, LimitScope};
pub use ids::{
    CardId, DriverId, FuelTransactionId, KeyId, NfcTransactionId, OrganizationId, UserId,
    VehicleId,
};
pub use key::{EncryptionKey, KEY_ALGORITHM};
pub use money::Money;
pub use nfc_transaction::{
    DeviceInfo, GeoPoint, NfcPaymentTransaction, NfcTransactionStatus,
};
