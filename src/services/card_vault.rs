//! Card vault service
//!
//! Registration, lookup, and decryption of organization payment cards.
//! Every sensitive field is encrypted independently with its own IV under
//! the active DEK; raw card data never leaves this module except through
//! `decrypt_card`, which the NFC preparation pipeline consumes.

use chrono::Utc;

use crate::audit::EntityType;
use crate::crypto::{self, SecureString};
use crate::error::{FleetPayError, FleetPayResult};
use crate::models::{
    luhn_valid, normalize_card_number, CardBrand, CardId, CardKind, CardSummary,
    OrganizationId, PaymentCard, UserId,
};
use crate::storage::Storage;

use super::key_vault::KeyVault;

/// Raw card fields as entered at registration
///
/// Exists only transiently between the API boundary and encryption.
#[derive(Debug, Clone)]
pub struct CardFields {
    pub number: String,
    pub holder_name: String,
    pub expiry_month: u32,
    pub expiry_year: u32,
    pub cvv: String,
    pub nickname: String,
    pub kind: CardKind,
}

/// Decrypted card fields for payload construction
///
/// Contents are zeroed on drop.
pub struct DecryptedCard {
    pub number: SecureString,
    pub holder_name: SecureString,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvv: SecureString,
}

/// Service for payment card management
pub struct CardVault<'a> {
    storage: &'a Storage,
    key_vault: &'a KeyVault<'a>,
}

impl<'a> CardVault<'a> {
    /// Create a new card vault
    pub fn new(storage: &'a Storage, key_vault: &'a KeyVault<'a>) -> Self {
        Self { storage, key_vault }
    }

    /// Register a new card for an organization
    ///
    /// Validates the number against the Luhn checksum, encrypts the five
    /// sensitive fields independently, atomically clears any prior default
    /// for the organization, and inserts the new row as active+default.
    /// Only a non-sensitive summary is returned.
    pub fn register_card(
        &self,
        organization_id: OrganizationId,
        fields: CardFields,
        created_by: UserId,
    ) -> FleetPayResult<CardSummary> {
        let number = normalize_card_number(&fields.number);
        if !luhn_valid(&number) {
            return Err(FleetPayError::InvalidCardNumber);
        }
        validate_expiry(fields.expiry_month, fields.expiry_year)?;
        validate_cvv(&fields.cvv)?;

        // KeyUnavailable surfaces here before any row is written
        let (key_id, dek) = self.key_vault.get_or_create_active_key()?;

        let brand = CardBrand::detect(&number);
        let last_four = number[number.len() - 4..].to_string();
        let now = Utc::now();

        let card = PaymentCard {
            id: CardId::new(),
            organization_id,
            number: crypto::encrypt_field(&dek, &number)?,
            holder_name: crypto::encrypt_field(&dek, fields.holder_name.trim())?,
            expiry_month: crypto::encrypt_field(&dek, &fields.expiry_month.to_string())?,
            expiry_year: crypto::encrypt_field(&dek, &fields.expiry_year.to_string())?,
            cvv: crypto::encrypt_field(&dek, &fields.cvv)?,
            key_id,
            brand,
            kind: fields.kind,
            last_four,
            nickname: fields.nickname.trim().to_string(),
            active: true,
            is_default: true,
            created_by,
            created_at: now,
            updated_at: now,
        };

        let summary = card.summary();

        self.storage.cards.insert_as_default(card)?;
        self.storage.cards.save()?;

        self.storage.log_create(
            EntityType::PaymentCard,
            summary.id.to_string(),
            Some(summary.display.clone()),
            &summary,
        )?;

        Ok(summary)
    }

    /// Get the organization's default active card, if any
    ///
    /// `None` means "no card on file" and is not an error; callers decide
    /// whether that is fatal for their flow.
    pub fn default_active_card(
        &self,
        organization_id: OrganizationId,
    ) -> FleetPayResult<Option<PaymentCard>> {
        self.storage.cards.default_active_for_org(organization_id)
    }

    /// List an organization's cards as summaries, newest first
    pub fn list_cards(&self, organization_id: OrganizationId) -> FleetPayResult<Vec<CardSummary>> {
        Ok(self
            .storage
            .cards
            .all_for_org(organization_id)?
            .iter()
            .map(PaymentCard::summary)
            .collect())
    }

    /// Logically deactivate a card
    ///
    /// The row is kept forever; only the active and default flags clear.
    pub fn deactivate_card(
        &self,
        organization_id: OrganizationId,
        card_id: CardId,
    ) -> FleetPayResult<CardSummary> {
        let mut card = self
            .storage
            .cards
            .get(card_id)?
            .filter(|c| c.organization_id == organization_id)
            .ok_or_else(|| FleetPayError::card_not_found(card_id.to_string()))?;

        if !card.active {
            return Err(FleetPayError::Validation("Card is already inactive".into()));
        }

        let before = card.summary();
        card.deactivate();
        let after = card.summary();

        self.storage.cards.upsert(card)?;
        self.storage.cards.save()?;

        self.storage.log_update(
            EntityType::PaymentCard,
            card_id.to_string(),
            Some(after.display.clone()),
            &before,
            &after,
            Some("active: true -> false".to_string()),
        )?;

        Ok(after)
    }

    /// Decrypt a card's sensitive fields
    ///
    /// Unwraps the DEK version the card references and decrypts all five
    /// fields. An authentication failure on any field propagates as
    /// `DecryptionFailed`; it is never swallowed into a default value.
    pub fn decrypt_card(&self, card: &PaymentCard) -> FleetPayResult<DecryptedCard> {
        let dek = self.key_vault.unwrap_key(card.key_id)?;

        Ok(DecryptedCard {
            number: SecureString::new(crypto::decrypt_field(&dek, &card.number)?),
            holder_name: SecureString::new(crypto::decrypt_field(&dek, &card.holder_name)?),
            expiry_month: crypto::decrypt_field(&dek, &card.expiry_month)?,
            expiry_year: crypto::decrypt_field(&dek, &card.expiry_year)?,
            cvv: SecureString::new(crypto::decrypt_field(&dek, &card.cvv)?),
        })
    }
}

fn validate_expiry(month: u32, year: u32) -> FleetPayResult<()> {
    if !(1..=12).contains(&month) {
        return Err(FleetPayError::Validation(format!(
            "Invalid expiry month: {}",
            month
        )));
    }
    if !(2000..=2100).contains(&year) {
        return Err(FleetPayError::Validation(format!(
            "Invalid expiry year: {}",
            year
        )));
    }
    Ok(())
}

fn validate_cvv(cvv: &str) -> FleetPayResult<()> {
    if !(cvv.len() == 3 || cvv.len() == 4) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(FleetPayError::Validation("Invalid CVV".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::VaultPaths;
    use crate::config::MasterKey;
    use crate::crypto::KEY_SIZE;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage, MasterKey) {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage, MasterKey::from_bytes([9u8; KEY_SIZE]))
    }

    fn visa_fields() -> CardFields {
        CardFields {
            number: "4242 4242 4242 4242".to_string(),
            holder_name: "Jane Driver".to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvv: "123".to_string(),
            nickname: "Fleet Visa".to_string(),
            kind: CardKind::Fleet,
        }
    }

    #[test]
    fn test_register_card() {
        let (_temp_dir, storage, master) = create_test_storage();
        let key_vault = KeyVault::new(&storage, &master);
        let vault = CardVault::new(&storage, &key_vault);

        let summary = vault
            .register_card(OrganizationId::new(), visa_fields(), UserId::new())
            .unwrap();

        assert_eq!(summary.brand, CardBrand::Visa);
        assert_eq!(summary.last_four, "4242");
        assert!(summary.is_default);
        assert_eq!(summary.display, "VISA •••• 4242");
    }

    #[test]
    fn test_register_rejects_bad_checksum() {
        let (_temp_dir, storage, master) = create_test_storage();
        let key_vault = KeyVault::new(&storage, &master);
        let vault = CardVault::new(&storage, &key_vault);

        let mut fields = visa_fields();
        fields.number = "4242424242424241".to_string();

        let result = vault.register_card(OrganizationId::new(), fields, UserId::new());
        assert!(matches!(result, Err(FleetPayError::InvalidCardNumber)));
        // Nothing was written
        assert_eq!(storage.cards.count().unwrap(), 0);
        assert_eq!(storage.keys.count().unwrap(), 0);
    }

    #[test]
    fn test_register_rejects_bad_expiry() {
        let (_temp_dir, storage, master) = create_test_storage();
        let key_vault = KeyVault::new(&storage, &master);
        let vault = CardVault::new(&storage, &key_vault);

        let mut fields = visa_fields();
        fields.expiry_month = 13;

        let result = vault.register_card(OrganizationId::new(), fields, UserId::new());
        assert!(matches!(result, Err(FleetPayError::Validation(_))));
    }

    #[test]
    fn test_stored_fields_are_encrypted_with_distinct_ivs() {
        let (_temp_dir, storage, master) = create_test_storage();
        let key_vault = KeyVault::new(&storage, &master);
        let vault = CardVault::new(&storage, &key_vault);

        let org = OrganizationId::new();
        vault
            .register_card(org, visa_fields(), UserId::new())
            .unwrap();

        let card = vault.default_active_card(org).unwrap().unwrap();

        // Ciphertext never matches plaintext, and the five fields each
        // carry their own IV
        assert_ne!(card.number.ciphertext, "4242424242424242");
        let ivs = [
            &card.number.iv,
            &card.holder_name.iv,
            &card.expiry_month.iv,
            &card.expiry_year.iv,
            &card.cvv.iv,
        ];
        for i in 0..ivs.len() {
            for j in (i + 1)..ivs.len() {
                assert_ne!(ivs[i], ivs[j]);
            }
        }
    }

    #[test]
    fn test_default_exclusivity_across_registrations() {
        let (_temp_dir, storage, master) = create_test_storage();
        let key_vault = KeyVault::new(&storage, &master);
        let vault = CardVault::new(&storage, &key_vault);

        let org = OrganizationId::new();
        vault
            .register_card(org, visa_fields(), UserId::new())
            .unwrap();

        let mut second = visa_fields();
        second.number = "5555555555554444".to_string();
        let second_summary = vault.register_card(org, second, UserId::new()).unwrap();

        let defaults: Vec<_> = storage
            .cards
            .all_for_org(org)
            .unwrap()
            .into_iter()
            .filter(|c| c.is_default && c.active)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, second_summary.id);
    }

    #[test]
    fn test_decrypt_card_roundtrip() {
        let (_temp_dir, storage, master) = create_test_storage();
        let key_vault = KeyVault::new(&storage, &master);
        let vault = CardVault::new(&storage, &key_vault);

        let org = OrganizationId::new();
        vault
            .register_card(org, visa_fields(), UserId::new())
            .unwrap();

        let card = vault.default_active_card(org).unwrap().unwrap();
        let decrypted = vault.decrypt_card(&card).unwrap();

        assert_eq!(decrypted.number.as_str(), "4242424242424242");
        assert_eq!(decrypted.holder_name.as_str(), "Jane Driver");
        assert_eq!(decrypted.expiry_month, "12");
        assert_eq!(decrypted.expiry_year, "2030");
        assert_eq!(decrypted.cvv.as_str(), "123");
    }

    #[test]
    fn test_tampered_field_fails_decrypt() {
        let (_temp_dir, storage, master) = create_test_storage();
        let key_vault = KeyVault::new(&storage, &master);
        let vault = CardVault::new(&storage, &key_vault);

        let org = OrganizationId::new();
        vault
            .register_card(org, visa_fields(), UserId::new())
            .unwrap();

        let mut card = vault.default_active_card(org).unwrap().unwrap();
        card.cvv.ciphertext = card.number.ciphertext.clone();

        let result = vault.decrypt_card(&card);
        assert!(matches!(result, Err(FleetPayError::DecryptionFailed)));
    }

    #[test]
    fn test_deactivate_card() {
        let (_temp_dir, storage, master) = create_test_storage();
        let key_vault = KeyVault::new(&storage, &master);
        let vault = CardVault::new(&storage, &key_vault);

        let org = OrganizationId::new();
        let summary = vault
            .register_card(org, visa_fields(), UserId::new())
            .unwrap();

        vault.deactivate_card(org, summary.id).unwrap();

        assert!(vault.default_active_card(org).unwrap().is_none());
        // The row survives as inactive
        assert_eq!(storage.cards.count().unwrap(), 1);
    }

    #[test]
    fn test_deactivate_wrong_org_not_found() {
        let (_temp_dir, storage, master) = create_test_storage();
        let key_vault = KeyVault::new(&storage, &master);
        let vault = CardVault::new(&storage, &key_vault);

        let summary = vault
            .register_card(OrganizationId::new(), visa_fields(), UserId::new())
            .unwrap();

        let result = vault.deactivate_card(OrganizationId::new(), summary.id);
        assert!(matches!(result, Err(FleetPayError::NotFound { .. })));
    }

    #[test]
    fn test_list_cards_summaries_only() {
        let (_temp_dir, storage, master) = create_test_storage();
        let key_vault = KeyVault::new(&storage, &master);
        let vault = CardVault::new(&storage, &key_vault);

        let org = OrganizationId::new();
        vault
            .register_card(org, visa_fields(), UserId::new())
            .unwrap();

        let summaries = vault.list_cards(org).unwrap();
        assert_eq!(summaries.len(), 1);
        // Summaries serialize without ciphertext
        let json = serde_json::to_string(&summaries[0]).unwrap();
        assert!(!json.contains("ciphertext"));
    }
}
