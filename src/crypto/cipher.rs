//! AES-256-GCM field encryption/decryption
//!
//! Provides authenticated encryption for individual card fields, DEK
//! wrapping, and the ephemeral transport layer. Each encryption operation
//! generates a unique nonce.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{FleetPayError, FleetPayResult};

/// Size of an AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// A 256-bit symmetric key, zeroized on drop
///
/// Used for data-encryption keys, the master key, and the single-use
/// ephemeral keys generated per NFC session.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CipherKey {
    bytes: [u8; KEY_SIZE],
}

impl CipherKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create a key from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Create a key from a byte slice, failing if the length is wrong
    pub fn from_slice(slice: &[u8]) -> FleetPayResult<Self> {
        if slice.len() != KEY_SIZE {
            return Err(FleetPayError::Encryption(format!(
                "Invalid key size: expected {}, got {}",
                KEY_SIZE,
                slice.len()
            )));
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self { bytes })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Encode the key as base64 for the out-of-band transport hop
    ///
    /// Only the single-use ephemeral session key should ever be exported
    /// this way; persisted keys stay wrapped.
    pub fn to_base64(&self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD.encode(self.bytes)
    }

    /// Decode a key from base64
    pub fn from_base64(encoded: &str) -> FleetPayResult<Self> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| FleetPayError::Encryption(format!("Invalid key encoding: {}", e)))?;
        Self::from_slice(&bytes)
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey").finish_non_exhaustive()
    }
}

/// An encrypted field with its initialization vector
///
/// This is the persisted form of every sensitive card column and of the
/// wrapped DEK material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedField {
    /// The encrypted ciphertext with authentication tag (base64 encoded)
    pub ciphertext: String,
    /// The nonce used for this encryption (base64 encoded)
    pub iv: String,
    /// Version for future algorithm upgrades
    #[serde(default = "default_version")]
    pub version: u8,
}

fn default_version() -> u8 {
    1
}

impl EncryptedField {
    fn new(ciphertext: &[u8], iv: &[u8]) -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine};
        Self {
            ciphertext: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(iv),
            version: 1,
        }
    }

    /// Decode the ciphertext from base64
    fn decode_ciphertext(&self) -> FleetPayResult<Vec<u8>> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD
            .decode(&self.ciphertext)
            .map_err(|e| FleetPayError::Encryption(format!("Invalid ciphertext encoding: {}", e)))
    }

    /// Decode the IV from base64
    fn decode_iv(&self) -> FleetPayResult<Vec<u8>> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD
            .decode(&self.iv)
            .map_err(|e| FleetPayError::Encryption(format!("Invalid IV encoding: {}", e)))
    }
}

/// Encrypt raw bytes using AES-256-GCM
///
/// Generates a random nonce for each call. Two encryptions of the same
/// plaintext under the same key never share an IV.
pub fn encrypt(key: &CipherKey, plaintext: &[u8]) -> FleetPayResult<EncryptedField> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| FleetPayError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| FleetPayError::Encryption(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedField::new(&ciphertext, &nonce_bytes))
}

/// Decrypt bytes using AES-256-GCM
///
/// Fails with `DecryptionFailed` when the authentication tag does not
/// verify (tampered ciphertext or wrong key/IV pairing). Callers must
/// surface that error, never substitute a default value.
pub fn decrypt(key: &CipherKey, encrypted: &EncryptedField) -> FleetPayResult<Vec<u8>> {
    if encrypted.version != 1 {
        return Err(FleetPayError::Encryption(format!(
            "Unsupported encryption version: {}",
            encrypted.version
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| FleetPayError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let iv_bytes = encrypted.decode_iv()?;
    if iv_bytes.len() != NONCE_SIZE {
        return Err(FleetPayError::Encryption(format!(
            "Invalid IV size: expected {}, got {}",
            NONCE_SIZE,
            iv_bytes.len()
        )));
    }
    let nonce = Nonce::from_slice(&iv_bytes);

    let ciphertext = encrypted.decode_ciphertext()?;

    cipher
        .decrypt(nonce, ciphertext.as_ref())
        .map_err(|_| FleetPayError::DecryptionFailed)
}

/// Encrypt a plaintext string field
pub fn encrypt_field(key: &CipherKey, plaintext: &str) -> FleetPayResult<EncryptedField> {
    encrypt(key, plaintext.as_bytes())
}

/// Decrypt a field back to a string
pub fn decrypt_field(key: &CipherKey, encrypted: &EncryptedField) -> FleetPayResult<String> {
    let plaintext = decrypt(key, encrypted)?;
    String::from_utf8(plaintext)
        .map_err(|e| FleetPayError::Encryption(format!("Invalid UTF-8 in decrypted data: {}", e)))
}
