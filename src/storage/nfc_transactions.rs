//! NFC transaction repository for JSON storage
//!
//! Rows are append-only except for status transitions; nothing is ever
//! deleted.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::Utc;

use crate::error::FleetPayError;
use crate::models::{DriverId, NfcPaymentTransaction, NfcTransactionId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable transaction data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct NfcTransactionData {
    transactions: Vec<NfcPaymentTransaction>,
}

/// Repository for NFC payment transaction persistence
pub struct NfcTransactionRepository {
    path: PathBuf,
    data: RwLock<HashMap<NfcTransactionId, NfcPaymentTransaction>>,
}

impl NfcTransactionRepository {
    /// Create a new transaction repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load transactions from disk
    pub fn load(&self) -> Result<(), FleetPayError> {
        let file_data: NfcTransactionData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        for txn in file_data.transactions {
            data.insert(txn.id, txn);
        }

        Ok(())
    }

    /// Save transactions to disk
    pub fn save(&self) -> Result<(), FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut transactions: Vec<_> = data.values().cloned().collect();
        transactions.sort_by_key(|t| t.created_at);

        write_json_atomic(&self.path, &NfcTransactionData { transactions })
    }

    /// Insert a new transaction row
    pub fn insert(&self, txn: NfcPaymentTransaction) -> Result<(), FleetPayError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(txn.id, txn);
        Ok(())
    }

    /// Get a transaction by ID
    pub fn get(
        &self,
        id: NfcTransactionId,
    ) -> Result<Option<NfcPaymentTransaction>, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Atomically apply a status transition to a row
    ///
    /// Returns `None` when the transaction does not exist.
    pub fn update_with<T>(
        &self,
        id: NfcTransactionId,
        f: impl FnOnce(&mut NfcPaymentTransaction) -> T,
    ) -> Result<Option<T>, FleetPayError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        match data.get_mut(&id) {
            Some(txn) => {
                let result = f(txn);
                txn.updated_at = Utc::now();
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    /// All transactions for a driver, newest first
    pub fn all_for_driver(
        &self,
        driver: DriverId,
    ) -> Result<Vec<NfcPaymentTransaction>, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut transactions: Vec<_> = data
            .values()
            .filter(|t| t.driver_id == driver)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    /// Count stored transactions
    pub fn count(&self) -> Result<usize, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.len())
    }
}
