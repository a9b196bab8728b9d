//! Payment card repository for JSON storage
//!
//! Manages loading and saving encrypted card rows to payment_cards.json.
//! Default-card reassignment runs under a single write lock so a
//! concurrent reader never observes two defaults or zero defaults
//! mid-transition.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::FleetPayError;
use crate::models::{CardId, OrganizationId, PaymentCard};

use super::file_io::{read_json, write_json_atomic};

/// Serializable card data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct CardData {
    cards: Vec<PaymentCard>,
}

/// Repository for payment card persistence
pub struct CardRepository {
    path: PathBuf,
    data: RwLock<HashMap<CardId, PaymentCard>>,
}

impl CardRepository {
    /// Create a new card repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load cards from disk
    pub fn load(&self) -> Result<(), FleetPayError> {
        let file_data: CardData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        for card in file_data.cards {
            data.insert(card.id, card);
        }

        Ok(())
    }

    /// Save cards to disk
    pub fn save(&self) -> Result<(), FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut cards: Vec<_> = data.values().cloned().collect();
        cards.sort_by_key(|c| c.created_at);

        write_json_atomic(&self.path, &CardData { cards })
    }

    /// Get a card by ID
    pub fn get(&self, id: CardId) -> Result<Option<PaymentCard>, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Get all cards for an organization, newest first
    pub fn all_for_org(&self, org: OrganizationId) -> Result<Vec<PaymentCard>, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut cards: Vec<_> = data
            .values()
            .filter(|c| c.organization_id == org)
            .cloned()
            .collect();
        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cards)
    }

    /// Get the organization's default active card, if any
    pub fn default_active_for_org(
        &self,
        org: OrganizationId,
    ) -> Result<Option<PaymentCard>, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data
            .values()
            .find(|c| c.organization_id == org && c.is_default && c.active)
            .cloned())
    }

    /// Insert a card as the organization's new default
    ///
    /// Clears the default flag on every other card of the organization and
    /// inserts the new row inside one write-lock critical section.
    pub fn insert_as_default(&self, card: PaymentCard) -> Result<(), FleetPayError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        for existing in data
            .values_mut()
            .filter(|c| c.organization_id == card.organization_id)
        {
            existing.is_default = false;
        }
        data.insert(card.id, card);
        Ok(())
    }

    /// Insert or update a card
    pub fn upsert(&self, card: PaymentCard) -> Result<(), FleetPayError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(card.id, card);
        Ok(())
    }

    /// Count stored cards
    pub fn count(&self) -> Result<usize, FleetPayError> {
        let data = self
            .data
            .read()
            .map_err(|e| FleetPayError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.len())
    }
}
