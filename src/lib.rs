//! fleetpay-core - Encrypted payment-card vault and NFC payment preparation
//!
//! This library is the payment core of a fleet-fuel platform: drivers use
//! PIN-authenticated NFC taps to charge fuel purchases to their
//! organization's stored card or linked fuel account. It covers envelope
//! key management, field-level authenticated encryption of card data, PIN
//! hashing with lockout, spend-limit enforcement, and the transaction
//! state machine that turns a verified PIN into a short-lived encrypted
//! payload for the point-of-sale hop.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: master key, paths, and runtime settings
//! - `error`: custom error types
//! - `models`: core data models (cards, keys, driver settings, transactions)
//! - `crypto`: AES-256-GCM field encryption and Argon2id PIN hashing
//! - `storage`: JSON file storage layer
//! - `audit`: append-only audit logging
//! - `services`: business logic layer
//! - `api`: JSON boundary consumed by the transport layer
//!
//! # Example
//!
//! ```rust,ignore
//! use fleetpay_core::config::{MasterKey, Settings, VaultPaths};
//! use fleetpay_core::storage::Storage;
//!
//! let master = MasterKey::from_env()?; // fails fast if unconfigured
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let mut storage = Storage::new(paths)?;
//! storage.load_all()?;
//! ```

pub mod api;
pub mod audit;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{FleetPayError, FleetPayResult};
