//! Service layer for the payment core
//!
//! The service layer provides business logic on top of the storage layer:
//! envelope key management, card registration and decryption, PIN
//! verification with lockout accounting, spend-limit checks, and the NFC
//! session pipeline that composes them.

pub mod card_vault;
pub mod key_vault;
pub mod nfc_session;
pub mod pin_auth;
pub mod spend_limit;

pub use card_vault::{CardFields, CardVault, DecryptedCard};
pub use key_vault::KeyVault;
pub use nfc_session::{
    NfcPreparation, NfcSessionPreparer, OrganizationDirectory, PaymentOption, PaymentPayload,
    PrepareRequest,
};
pub use pin_auth::PinAuthenticator;
pub use spend_limit::{SpendLedger, SpendLimitGuard};
