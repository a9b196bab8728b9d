//! Custom error types for the payment core
//!
//! This module defines the error hierarchy using thiserror. Variants are
//! grouped by origin: configuration, validation, authentication, business
//! rule, integrity, and infrastructure.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{LimitScope, Money};

/// The main error type for payment core operations
#[derive(Error, Debug)]
pub enum FleetPayError {
    /// The master encryption key is absent from the process configuration.
    /// Fatal for every path that touches the key vault; surfaced to the
    /// operator, not the end user.
    #[error("master encryption key is not available to this process")]
    KeyUnavailable,

    /// A wrapped DEK failed to decrypt/authenticate under the master key
    #[error("encryption key {0} failed to unwrap: stored key material is corrupt")]
    KeyCorrupt(String),

    /// An encrypted field failed authentication on decrypt
    #[error("decryption failed: ciphertext did not authenticate")]
    DecryptionFailed,

    /// Other cryptographic failures (encoding, cipher setup)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Card number failed Luhn or format validation
    #[error("invalid card number")]
    InvalidCardNumber,

    /// New PIN rejected at set time
    #[error("weak PIN rejected: {0}")]
    WeakPin(String),

    /// Old PIN supplied on change did not verify
    #[error("old PIN does not match")]
    IncorrectOldPin,

    /// Verification attempted with no active PIN on file
    #[error("no active PIN is configured for this driver")]
    NoPinConfigured,

    /// PIN mismatch, with the attempts left before lockout
    #[error("incorrect PIN ({attempts_remaining} attempts remaining)")]
    IncorrectPin { attempts_remaining: u32 },

    /// Verification refused while a lockout window is open
    #[error("PIN entry is locked until {until}")]
    Locked { until: DateTime<Utc> },

    /// Proposed amount exceeds a spend ceiling
    #[error("{scope} spend limit exceeded: {remaining} remaining")]
    LimitExceeded { scope: LimitScope, remaining: Money },

    /// Organization pays by card but has no active default card
    #[error("no active default card on file for this organization")]
    NoCardOnFile,

    /// Organization pays by direct account but the vehicle has none linked
    #[error("no fuel account is linked to this vehicle")]
    AccountUnavailable,

    /// Required request input missing or malformed
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Caller is not authorized to manage payment data
    #[error("caller is not authorized to manage payment data")]
    Forbidden,

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),
}

impl FleetPayError {
    /// Create a "not found" error for encryption keys
    pub fn key_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "EncryptionKey",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for cards
    pub fn card_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "PaymentCard",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for NFC transactions
    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "NfcTransaction",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Integrity failures are never masked as validation problems
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::DecryptionFailed | Self::KeyCorrupt(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for FleetPayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FleetPayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for payment core operations
pub type FleetPayResult<T> = Result<T, FleetPayError>;
