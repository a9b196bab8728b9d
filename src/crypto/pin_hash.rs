//! PIN hashing using Argon2id
//!
//! Stores driver PINs as salted Argon2id hashes in PHC string format.
//! A fresh salt is generated for every hash, so identical PINs never
//! produce identical stored values.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{FleetPayError, FleetPayResult};

/// Hash a PIN with a fresh random salt
pub fn hash_pin(pin: &str) -> FleetPayResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| FleetPayError::Encryption(format!("PIN hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a PIN attempt against a stored hash
///
/// Returns `Ok(false)` on mismatch; a malformed stored hash is an error,
/// not a mismatch.
pub fn verify_pin(pin: &str, stored_hash: &str) -> FleetPayResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| FleetPayError::Encryption(format!("Invalid stored PIN hash: {}", e)))?;

    match Argon2::default().verify_password(pin.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(FleetPayError::Encryption(format!(
            "PIN verification failed: {}",
            e
        ))),
    }
}
