//! Encryption key record
//!
//! Represents one version of the data-encryption key (DEK), stored wrapped
//! under the master key. The plaintext DEK never touches storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::EncryptedField;

use super::ids::KeyId;

/// Algorithm tag recorded on every key version
pub const KEY_ALGORITHM: &str = "aes-256-gcm";

/// A versioned data-encryption key, wrapped under the master key
///
/// Exactly one key is active at a time. Older versions are retained and
/// never deleted: cards encrypted under them must stay decryptable. Only
/// the active flag ever mutates, cleared when a newer version takes over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionKey {
    /// Unique identifier
    pub id: KeyId,

    /// The DEK ciphertext and IV, wrapped under the master key
    pub wrapped: EncryptedField,

    /// Algorithm tag (currently always "aes-256-gcm")
    pub algorithm: String,

    /// Monotonically increasing version number
    pub version: u32,

    /// Whether this is the key new encryptions use
    pub active: bool,

    /// When the key was generated
    pub created_at: DateTime<Utc>,
}

impl EncryptionKey {
    /// Create a new active key record from wrapped DEK material
    pub fn new_active(version: u32, wrapped: EncryptedField) -> Self {
        Self {
            id: KeyId::new(),
            wrapped,
            algorithm: KEY_ALGORITHM.to_string(),
            version,
            active: true,
            created_at: Utc::now(),
        }
    }
}
