//! Key vault service
//!
//! Manages versioned envelope encryption keys. A long-lived master key,
//! supplied externally and never persisted, wraps randomly generated
//! per-installation data-encryption keys (DEKs). Cards reference the DEK
//! version they were encrypted under, so old versions stay decryptable
//! forever.

use serde_json::json;

use crate::audit::EntityType;
use crate::config::MasterKey;
use crate::crypto::{self, CipherKey};
use crate::error::{FleetPayError, FleetPayResult};
use crate::models::{EncryptionKey, KeyId};
use crate::storage::Storage;

/// Service for envelope key management
///
/// Holding a `MasterKey` is the precondition for constructing this
/// service; a process without one fails at startup with `KeyUnavailable`,
/// before any card data could be partially written.
pub struct KeyVault<'a> {
    storage: &'a Storage,
    master: &'a MasterKey,
}

impl<'a> KeyVault<'a> {
    /// Create a new key vault
    pub fn new(storage: &'a Storage, master: &'a MasterKey) -> Self {
        Self { storage, master }
    }

    /// Get the active DEK, creating one lazily if none exists
    ///
    /// Returns the key id and the plaintext DEK for immediate use. The
    /// plaintext never touches storage; only the wrapped form is
    /// persisted.
    pub fn get_or_create_active_key(&self) -> FleetPayResult<(KeyId, CipherKey)> {
        if let Some(record) = self.storage.keys.active()? {
            let dek = self.unwrap_record(&record)?;
            return Ok((record.id, dek));
        }

        let dek = CipherKey::generate();
        let wrapped = crypto::encrypt(self.master.cipher_key(), dek.as_bytes())?;
        let record = EncryptionKey::new_active(self.storage.keys.next_version()?, wrapped);
        let id = record.id;
        let version = record.version;
        let algorithm = record.algorithm.clone();

        self.storage.keys.insert_active(record)?;
        self.storage.keys.save()?;

        self.storage.log_create(
            EntityType::EncryptionKey,
            id.to_string(),
            None,
            &json!({ "version": version, "algorithm": algorithm, "active": true }),
        )?;

        Ok((id, dek))
    }

    /// Unwrap a stored DEK version
    ///
    /// Fails with `KeyCorrupt` when the wrapped material does not
    /// authenticate under the master key.
    pub fn unwrap_key(&self, id: KeyId) -> FleetPayResult<CipherKey> {
        let record = self
            .storage
            .keys
            .get(id)?
            .ok_or_else(|| FleetPayError::key_not_found(id.to_string()))?;

        self.unwrap_record(&record)
    }

    fn unwrap_record(&self, record: &EncryptionKey) -> FleetPayResult<CipherKey> {
        let bytes = crypto::decrypt(self.master.cipher_key(), &record.wrapped)
            .map_err(|_| FleetPayError::KeyCorrupt(record.id.to_string()))?;
        CipherKey::from_slice(&bytes)
            .map_err(|_| FleetPayError::KeyCorrupt(record.id.to_string()))
    }
}
