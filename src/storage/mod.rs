//! Storage layer for the payment core
//!
//! Provides JSON file storage with atomic writes behind per-table
//! repositories, coordinated by a single `Storage` struct. The audit
//! logger hangs off the same coordinator so services can record changes
//! next to the writes that caused them.

pub mod cards;
pub mod driver_settings;
pub mod file_io;
pub mod keys;
pub mod nfc_transactions;

pub use cards::CardRepository;
pub use driver_settings::DriverSettingsRepository;
pub use file_io::{read_json, write_json_atomic};
pub use keys::KeyRepository;
pub use nfc_transactions::NfcTransactionRepository;

use serde::Serialize;

use crate::audit::{AuditEntry, AuditLogger, EntityType};
use crate::config::paths::VaultPaths;
use crate::error::FleetPayError;

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: VaultPaths,
    audit: AuditLogger,
    pub keys: KeyRepository,
    pub cards: CardRepository,
    pub driver_settings: DriverSettingsRepository,
    pub nfc_transactions: NfcTransactionRepository,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: VaultPaths) -> Result<Self, FleetPayError> {
        // Ensure directories exist
        paths.ensure_directories()?;

        Ok(Self {
            audit: AuditLogger::new(paths.audit_log()),
            keys: KeyRepository::new(paths.keys_file()),
            cards: CardRepository::new(paths.cards_file()),
            driver_settings: DriverSettingsRepository::new(paths.driver_settings_file()),
            nfc_transactions: NfcTransactionRepository::new(paths.nfc_transactions_file()),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    /// Get the audit logger
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Load all data from disk
    pub fn load_all(&mut self) -> Result<(), FleetPayError> {
        self.keys.load()?;
        self.cards.load()?;
        self.driver_settings.load()?;
        self.nfc_transactions.load()?;
        Ok(())
    }

    /// Save all data to disk
    pub fn save_all(&self) -> Result<(), FleetPayError> {
        self.keys.save()?;
        self.cards.save()?;
        self.driver_settings.save()?;
        self.nfc_transactions.save()?;
        Ok(())
    }

    /// Log an entity creation
    ///
    /// `entity` must already be redacted: pass a summary or a filtered
    /// snapshot, never a raw row with ciphertexts or hashes.
    pub fn log_create<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Result<(), FleetPayError> {
        self.audit
            .log(&AuditEntry::create(entity_type, entity_id, entity_name, entity))
    }

    /// Log an entity update with redacted before/after snapshots
    pub fn log_update<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
        diff_summary: Option<String>,
    ) -> Result<(), FleetPayError> {
        self.audit.log(&AuditEntry::update(
            entity_type,
            entity_id,
            entity_name,
            before,
            after,
            diff_summary,
        ))
    }
}
