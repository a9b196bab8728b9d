//! Master encryption key configuration
//!
//! The master key wraps every data-encryption key. It is supplied
//! externally, read once per process start, and never persisted. Rather
//! than ambient global state, it is an explicit dependency injected into
//! the key vault; constructing one is the checked-once precondition that
//! lets every dependent operation fail fast with `KeyUnavailable` before
//! any storage access happens.

use std::fmt;

use crate::crypto::{CipherKey, KEY_SIZE};
use crate::error::{FleetPayError, FleetPayResult};

/// Environment variable holding the base64-encoded 256-bit master key
pub const MASTER_KEY_ENV: &str = "FLEETPAY_MASTER_KEY";

/// The process-wide master encryption key
pub struct MasterKey {
    key: CipherKey,
}

impl MasterKey {
    /// Read the master key from the process environment
    ///
    /// Fails with `KeyUnavailable` when the variable is absent, not valid
    /// base64, or not exactly 256 bits. Call this once at startup; an
    /// operator-actionable failure here must stop the process before it
    /// accepts requests.
    pub fn from_env() -> FleetPayResult<Self> {
        let encoded = std::env::var(MASTER_KEY_ENV).map_err(|_| FleetPayError::KeyUnavailable)?;
        Self::from_base64(&encoded)
    }

    /// Decode a master key from base64
    pub fn from_base64(encoded: &str) -> FleetPayResult<Self> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| FleetPayError::KeyUnavailable)?;
        if bytes.len() != KEY_SIZE {
            return Err(FleetPayError::KeyUnavailable);
        }
        let key = CipherKey::from_slice(&bytes).map_err(|_| FleetPayError::KeyUnavailable)?;
        Ok(Self { key })
    }

    /// Build a master key from raw bytes (useful for testing)
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self {
            key: CipherKey::from_bytes(bytes),
        }
    }

    /// Borrow the underlying cipher key for wrap/unwrap operations
    pub(crate) fn cipher_key(&self) -> &CipherKey {
        &self.key
    }
}

// Never expose key material through Debug
impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey").finish_non_exhaustive()
    }
}
