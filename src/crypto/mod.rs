//! Cryptographic functions for the payment core
//!
//! Provides AES-256-GCM authenticated field encryption and Argon2id PIN
//! hashing. Neither primitive is hand-rolled; this module only manages
//! key material, nonces, and encoding.

pub mod cipher;
pub mod pin_hash;
pub mod secure_memory;

pub use cipher::{
    decrypt, decrypt_field, encrypt, encrypt_field, CipherKey, EncryptedField, KEY_SIZE,
};
pub use pin_hash::{hash_pin, verify_pin};
pub use secure_memory::SecureString;
