//! Payment card model
//!
//! Represents an organization's stored payment card. Every sensitive field
//! is independently encrypted; only the brand, last four digits, and
//! nickname are held in plaintext for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::EncryptedField;

use super::ids::{CardId, KeyId, OrganizationId, UserId};

/// Card brand, detected from the card number prefix at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Other,
}

impl CardBrand {
    /// Detect the brand from a normalized (digits-only) card number
    pub fn detect(number: &str) -> Self {
        if number.starts_with('4') {
            return Self::Visa;
        }
        if let Ok(prefix2) = number.get(..2).unwrap_or("").parse::<u32>() {
            if (51..=55).contains(&prefix2) {
                return Self::Mastercard;
            }
            if prefix2 == 34 || prefix2 == 37 {
                return Self::Amex;
            }
            if prefix2 == 65 {
                return Self::Discover;
            }
        }
        if let Ok(prefix4) = number.get(..4).unwrap_or("").parse::<u32>() {
            if (2221..=2720).contains(&prefix4) {
                return Self::Mastercard;
            }
            if prefix4 == 6011 {
                return Self::Discover;
            }
        }
        Self::Other
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visa => write!(f, "VISA"),
            Self::Mastercard => write!(f, "MASTERCARD"),
            Self::Amex => write!(f, "AMEX"),
            Self::Discover => write!(f, "DISCOVER"),
            Self::Other => write!(f, "CARD"),
        }
    }
}

/// Type of payment card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    #[default]
    Credit,
    Debit,
    Fleet,
    Prepaid,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credit => write!(f, "Credit"),
            Self::Debit => write!(f, "Debit"),
            Self::Fleet => write!(f, "Fleet"),
            Self::Prepaid => write!(f, "Prepaid"),
        }
    }
}

/// An organization's stored payment card
///
/// The five sensitive fields each carry their own ciphertext and IV, all
/// encrypted under the DEK version referenced by `key_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCard {
    /// Unique identifier
    pub id: CardId,

    /// The organization this card belongs to
    pub organization_id: OrganizationId,

    /// Encrypted card number
    pub number: EncryptedField,

    /// Encrypted cardholder name
    pub holder_name: EncryptedField,

    /// Encrypted expiry month
    pub expiry_month: EncryptedField,

    /// Encrypted expiry year
    pub expiry_year: EncryptedField,

    /// Encrypted CVV
    pub cvv: EncryptedField,

    /// The DEK version used to encrypt this card's fields
    pub key_id: KeyId,

    /// Card brand (plaintext, for display)
    pub brand: CardBrand,

    /// Card type
    pub kind: CardKind,

    /// Last four digits (plaintext, for display only)
    pub last_four: String,

    /// Display nickname (e.g., "Fleet Visa")
    #[serde(default)]
    pub nickname: String,

    /// Whether this card is active (cleared on replacement, never deleted)
    pub active: bool,

    /// Whether this is the organization's default card
    pub is_default: bool,

    /// Who registered the card
    pub created_by: UserId,

    /// When the card was registered
    pub created_at: DateTime<Utc>,

    /// When the card was last modified
    pub updated_at: DateTime<Utc>,
}

impl PaymentCard {
    /// Masked display form, e.g. "VISA •••• 4242"
    pub fn masked_display(&self) -> String {
        format!("{} •••• {}", self.brand, self.last_four)
    }

    /// Logically deactivate this card
    pub fn deactivate(&mut self) {
        self.active = false;
        self.is_default = false;
        self.updated_at = Utc::now();
    }

    /// Non-sensitive summary for API responses
    pub fn summary(&self) -> CardSummary {
        CardSummary {
            id: self.id,
            brand: self.brand,
            kind: self.kind,
            last_four: self.last_four.clone(),
            nickname: self.nickname.clone(),
            is_default: self.is_default,
            display: self.masked_display(),
        }
    }
}

/// Non-sensitive card summary returned from registration and listing
///
/// Raw card data never appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSummary {
    pub id: CardId,
    pub brand: CardBrand,
    pub kind: CardKind,
    pub last_four: String,
    pub nickname: String,
    pub is_default: bool,
    pub display: String,
}

/// Validate a card number with the Luhn checksum
///
/// Expects a digits-only string of 13-19 characters; anything else fails.
pub fn luhn_valid(number: &str) -> bool {
    if number.len() < 13 || number.len() > 19 {
        return false;
    }
    if !number.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = number
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Strip spaces and dashes from a card number as entered
pub fn normalize_card_number(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
}
