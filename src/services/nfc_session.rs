//! NFC session preparer
//!
//! Orchestrates PIN verification, spend-limit checks, payment method
//! resolution, and payload encryption into one synchronous request. A
//! verified PIN becomes a short-lived payload encrypted under a fresh
//! single-use key, ready for the transmission hop to the point-of-sale
//! device. Once a transaction row exists, every outcome leaves it in a
//! terminal, queryable state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::EntityType;
use crate::crypto::{self, CipherKey, EncryptedField};
use crate::error::{FleetPayError, FleetPayResult};
use crate::models::{
    DeviceInfo, DriverId, FuelTransactionId, GeoPoint, Money, NfcPaymentTransaction,
    NfcTransactionId, OrganizationId, PaymentCard, VehicleId,
};
use crate::storage::Storage;

use super::card_vault::{CardVault, DecryptedCard};
use super::pin_auth::PinAuthenticator;
use super::spend_limit::SpendLimitGuard;

/// How an organization pays for fuel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOption {
    /// Charge the organization's stored default card
    Card,
    /// Charge the account linked to the vehicle
    DirectAccount,
}

/// External collaborator resolving organization payment configuration
///
/// Organization and vehicle records live outside this core; only the
/// two lookups the pipeline needs cross the boundary.
pub trait OrganizationDirectory {
    /// The organization's configured payment option
    fn payment_option(&self, organization: OrganizationId) -> FleetPayResult<PaymentOption>;

    /// The fuel account identifier linked to a vehicle, if any
    fn vehicle_account(&self, vehicle: VehicleId) -> FleetPayResult<Option<String>>;
}

/// A payment preparation request
#[derive(Debug, Clone, Deserialize)]
pub struct PrepareRequest {
    pub driver_id: DriverId,
    pub pin: String,
    pub amount: Money,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
    #[serde(default)]
    pub fuel_transaction_id: Option<FuelTransactionId>,
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// The plaintext payload encrypted for the point-of-sale hop
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentPayload {
    Card {
        transaction_id: NfcTransactionId,
        amount_cents: i64,
        number: String,
        holder_name: String,
        expiry_month: String,
        expiry_year: String,
        cvv: String,
    },
    DirectAccount {
        transaction_id: NfcTransactionId,
        amount_cents: i64,
        account_id: String,
    },
}

/// The prepared session handed back to the transport
///
/// Deliberately does NOT carry the ephemeral key: the key and the
/// ciphertext it decrypts must travel over distinct channels, so
/// `prepare_payment` returns the key as a separate value.
#[derive(Debug, Clone, Serialize)]
pub struct NfcPreparation {
    pub transaction_id: NfcTransactionId,
    pub payload: EncryptedField,
    pub payment_type: PaymentOption,
    pub display: String,
}

/// Payment method resolved for one request
enum ResolvedMethod {
    Card {
        card: Box<PaymentCard>,
        decrypted: DecryptedCard,
    },
    DirectAccount {
        account_id: String,
    },
}

/// Service orchestrating the PIN-to-payload pipeline
pub struct NfcSessionPreparer<'a> {
    storage: &'a Storage,
    pins: &'a PinAuthenticator<'a>,
    limits: &'a SpendLimitGuard<'a>,
    cards: &'a CardVault<'a>,
    directory: &'a dyn OrganizationDirectory,
}

impl<'a> NfcSessionPreparer<'a> {
    /// Create a new session preparer
    pub fn new(
        storage: &'a Storage,
        pins: &'a PinAuthenticator<'a>,
        limits: &'a SpendLimitGuard<'a>,
        cards: &'a CardVault<'a>,
        directory: &'a dyn OrganizationDirectory,
    ) -> Self {
        Self {
            storage,
            pins,
            limits,
            cards,
            directory,
        }
    }

    /// Prepare an NFC payment
    ///
    /// Verifies the PIN, checks spend limits, resolves the payment
    /// method, records a transaction row, and encrypts the payload under
    /// a fresh single-use key. Returns the preparation and the ephemeral
    /// key as two separate values for the transport's two channels. The
    /// key is never persisted.
    pub fn prepare_payment(
        &self,
        request: PrepareRequest,
    ) -> FleetPayResult<(NfcPreparation, CipherKey)> {
        let pin_entered_at = Utc::now();

        if request.pin.is_empty() {
            return Err(FleetPayError::BadRequest("PIN is required".into()));
        }
        if !request.amount.is_positive() {
            return Err(FleetPayError::BadRequest(
                "Amount must be greater than zero".into(),
            ));
        }

        self.pins.verify_pin(request.driver_id, &request.pin)?;
        self.limits.check_limits(request.driver_id, request.amount)?;

        let method = self.resolve_method(&request)?;

        // PIN verified: from here on the attempt is recorded and every
        // outcome leaves a queryable row
        let mut txn = NfcPaymentTransaction::pin_verified(
            request.driver_id,
            request.organization_id,
            request.amount,
            pin_entered_at,
        );
        if let ResolvedMethod::Card { ref card, .. } = method {
            txn.card_id = Some(card.id);
        }
        txn.fuel_transaction_id = request.fuel_transaction_id;
        txn.device_info = request.device_info.clone();
        txn.location = request.location;

        let txn_id = txn.id;
        self.storage.nfc_transactions.insert(txn)?;
        self.storage.nfc_transactions.save()?;

        match self.seal_payload(txn_id, request.amount, method) {
            Ok((preparation, ephemeral_key)) => {
                self.storage
                    .nfc_transactions
                    .update_with(txn_id, |t| t.mark_ready())?;
                self.storage.nfc_transactions.save()?;

                self.storage.log_create(
                    EntityType::NfcTransaction,
                    txn_id.to_string(),
                    Some(preparation.display.clone()),
                    &json!({
                        "driver_id": request.driver_id.to_string(),
                        "amount_cents": request.amount.cents(),
                        "payment_type": preparation.payment_type,
                        "status": "nfc_ready",
                    }),
                )?;

                Ok((preparation, ephemeral_key))
            }
            Err(e) => {
                self.fail_transaction(txn_id, &e);
                Err(e)
            }
        }
    }

    /// Link the settled fuel transaction back to a prepared session
    pub fn link_fuel_transaction(
        &self,
        transaction_id: NfcTransactionId,
        fuel_transaction_id: FuelTransactionId,
    ) -> FleetPayResult<()> {
        let result = self
            .storage
            .nfc_transactions
            .update_with(transaction_id, |t| t.mark_linked(fuel_transaction_id))?
            .ok_or_else(|| FleetPayError::transaction_not_found(transaction_id.to_string()))?;

        result.map_err(FleetPayError::Validation)?;
        self.storage.nfc_transactions.save()?;

        self.storage.log_update(
            EntityType::NfcTransaction,
            transaction_id.to_string(),
            None,
            &json!({ "status": "nfc_ready" }),
            &json!({ "status": "linked", "fuel_transaction_id": fuel_transaction_id.to_string() }),
            Some("status: nfc_ready -> linked".to_string()),
        )?;

        Ok(())
    }

    /// Get a transaction row by ID
    pub fn transaction(
        &self,
        id: NfcTransactionId,
    ) -> FleetPayResult<Option<NfcPaymentTransaction>> {
        self.storage.nfc_transactions.get(id)
    }

    /// All of a driver's payment attempts, newest first
    pub fn transactions_for_driver(
        &self,
        driver: DriverId,
    ) -> FleetPayResult<Vec<NfcPaymentTransaction>> {
        self.storage.nfc_transactions.all_for_driver(driver)
    }

    fn resolve_method(&self, request: &PrepareRequest) -> FleetPayResult<ResolvedMethod> {
        match self.directory.payment_option(request.organization_id)? {
            PaymentOption::DirectAccount => {
                let vehicle = request.vehicle_id.ok_or_else(|| {
                    FleetPayError::BadRequest(
                        "Vehicle is required for direct-account payment".into(),
                    )
                })?;
                let account_id = self
                    .directory
                    .vehicle_account(vehicle)?
                    .ok_or(FleetPayError::AccountUnavailable)?;
                Ok(ResolvedMethod::DirectAccount { account_id })
            }
            PaymentOption::Card => {
                let card = self
                    .cards
                    .default_active_card(request.organization_id)?
                    .ok_or(FleetPayError::NoCardOnFile)?;
                let decrypted = self.cards.decrypt_card(&card)?;
                Ok(ResolvedMethod::Card {
                    card: Box::new(card),
                    decrypted,
                })
            }
        }
    }

    /// Build the plaintext payload and encrypt it under a fresh
    /// single-use key, independent of the persisted DEK
    fn seal_payload(
        &self,
        transaction_id: NfcTransactionId,
        amount: Money,
        method: ResolvedMethod,
    ) -> FleetPayResult<(NfcPreparation, CipherKey)> {
        let (payload, payment_type, display) = match method {
            ResolvedMethod::Card { card, decrypted } => (
                PaymentPayload::Card {
                    transaction_id,
                    amount_cents: amount.cents(),
                    number: decrypted.number.as_str().to_string(),
                    holder_name: decrypted.holder_name.as_str().to_string(),
                    expiry_month: decrypted.expiry_month.clone(),
                    expiry_year: decrypted.expiry_year.clone(),
                    cvv: decrypted.cvv.as_str().to_string(),
                },
                PaymentOption::Card,
                card.masked_display(),
            ),
            ResolvedMethod::DirectAccount { account_id } => {
                let display = masked_account(&account_id);
                (
                    PaymentPayload::DirectAccount {
                        transaction_id,
                        amount_cents: amount.cents(),
                        account_id,
                    },
                    PaymentOption::DirectAccount,
                    display,
                )
            }
        };

        let plaintext = serde_json::to_vec(&payload)?;
        let ephemeral_key = CipherKey::generate();
        let sealed = crypto::encrypt(&ephemeral_key, &plaintext)?;

        Ok((
            NfcPreparation {
                transaction_id,
                payload: sealed,
                payment_type,
                display,
            },
            ephemeral_key,
        ))
    }

    /// Move a row to the terminal `Failed` state, best effort
    ///
    /// The original error is what propagates to the caller; a storage
    /// failure here must not mask it.
    fn fail_transaction(&self, id: NfcTransactionId, cause: &FleetPayError) {
        let _ = self.storage.nfc_transactions.update_with(id, |t| t.mark_failed());
        let _ = self.storage.nfc_transactions.save();
        let _ = self.storage.log_update(
            EntityType::NfcTransaction,
            id.to_string(),
            None,
            &json!({ "status": "pin_verified" }),
            &json!({ "status": "failed", "cause": cause.to_string() }),
            Some("status: pin_verified -> failed".to_string()),
        );
    }
}

/// Masked display form of a direct account identifier
fn masked_account(account_id: &str) -> String {
    let tail: String = account_id
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("ACCOUNT •••• {}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::VaultPaths;
    use crate::config::{MasterKey, Settings};
    use crate::crypto::KEY_SIZE;
    use crate::models::{CardKind, NfcTransactionStatus, UserId};
    use crate::services::card_vault::CardFields;
    use crate::services::key_vault::KeyVault;
    use crate::services::spend_limit::SpendLedger;
    use tempfile::TempDir;

    struct ZeroLedger;

    impl SpendLedger for ZeroLedger {
        fn spent_today(&self, _driver: DriverId) -> FleetPayResult<Money> {
            Ok(Money::zero())
        }

        fn spent_this_month(&self, _driver: DriverId) -> FleetPayResult<Money> {
            Ok(Money::zero())
        }
    }

    struct TestDirectory {
        option: PaymentOption,
        account: Option<String>,
    }

    impl OrganizationDirectory for TestDirectory {
        fn payment_option(&self, _organization: OrganizationId) -> FleetPayResult<PaymentOption> {
            Ok(self.option)
        }

        fn vehicle_account(&self, _vehicle: VehicleId) -> FleetPayResult<Option<String>> {
            Ok(self.account.clone())
        }
    }

    struct TestStack {
        _temp_dir: TempDir,
        storage: Storage,
        master: MasterKey,
        settings: Settings,
    }

    fn create_stack() -> TestStack {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        TestStack {
            _temp_dir: temp_dir,
            storage,
            master: MasterKey::from_bytes([3u8; KEY_SIZE]),
            settings: Settings::default(),
        }
    }

    fn visa_fields() -> CardFields {
        CardFields {
            number: "4242424242424242".to_string(),
            holder_name: "Jane Driver".to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvv: "123".to_string(),
            nickname: String::new(),
            kind: CardKind::Fleet,
        }
    }

    fn card_request(driver: DriverId, org: OrganizationId, pin: &str, cents: i64) -> PrepareRequest {
        PrepareRequest {
            driver_id: driver,
            pin: pin.to_string(),
            amount: Money::from_cents(cents),
            organization_id: org,
            vehicle_id: None,
            fuel_transaction_id: None,
            device_info: None,
            location: None,
        }
    }

    #[test]
    fn test_end_to_end_card_payment() {
        let stack = create_stack();
        let key_vault = KeyVault::new(&stack.storage, &stack.master);
        let cards = CardVault::new(&stack.storage, &key_vault);
        let pins = PinAuthenticator::new(&stack.storage, &stack.settings);
        let ledger = ZeroLedger;
        let limits = SpendLimitGuard::new(&stack.storage, &ledger, &stack.settings);
        let directory = TestDirectory {
            option: PaymentOption::Card,
            account: None,
        };
        let preparer =
            NfcSessionPreparer::new(&stack.storage, &pins, &limits, &cards, &directory);

        let driver = DriverId::new();
        let org = OrganizationId::new();

        // Weak PIN rejected at setup, then an acceptable one sticks
        assert!(matches!(
            pins.set_pin(driver, "1111", None),
            Err(FleetPayError::WeakPin(_))
        ));
        pins.set_pin(driver, "2580", None).unwrap();

        cards.register_card(org, visa_fields(), UserId::new()).unwrap();

        let (preparation, ephemeral_key) = preparer
            .prepare_payment(card_request(driver, org, "2580", 10000))
            .unwrap();

        assert_eq!(preparation.payment_type, PaymentOption::Card);
        assert_eq!(preparation.display, "VISA •••• 4242");

        // The row is terminal and queryable
        let row = preparer.transaction(preparation.transaction_id).unwrap().unwrap();
        assert_eq!(row.status, NfcTransactionStatus::NfcReady);
        assert!(row.nfc_activated_at.is_some());
        assert!(row.card_id.is_some());

        // The ephemeral payload decrypts to the resolved card and amount
        let plaintext = crypto::decrypt(&ephemeral_key, &preparation.payload).unwrap();
        let payload: PaymentPayload = serde_json::from_slice(&plaintext).unwrap();
        match payload {
            PaymentPayload::Card {
                amount_cents,
                number,
                cvv,
                ..
            } => {
                assert_eq!(amount_cents, 10000);
                assert_eq!(number, "4242424242424242");
                assert_eq!(cvv, "123");
            }
            other => panic!("unexpected payload: {:?}", other),
        }

        // Three wrong attempts lock the driver
        for _ in 0..3 {
            assert!(matches!(
                preparer.prepare_payment(card_request(driver, org, "0000", 10000)),
                Err(FleetPayError::IncorrectPin { .. })
            ));
        }
        // A fourth attempt with the CORRECT pin is still refused
        assert!(matches!(
            preparer.prepare_payment(card_request(driver, org, "2580", 10000)),
            Err(FleetPayError::Locked { .. })
        ));
    }

    #[test]
    fn test_direct_account_payment() {
        let stack = create_stack();
        let key_vault = KeyVault::new(&stack.storage, &stack.master);
        let cards = CardVault::new(&stack.storage, &key_vault);
        let pins = PinAuthenticator::new(&stack.storage, &stack.settings);
        let ledger = ZeroLedger;
        let limits = SpendLimitGuard::new(&stack.storage, &ledger, &stack.settings);
        let directory = TestDirectory {
            option: PaymentOption::DirectAccount,
            account: Some("FA-100200300".to_string()),
        };
        let preparer =
            NfcSessionPreparer::new(&stack.storage, &pins, &limits, &cards, &directory);

        let driver = DriverId::new();
        let org = OrganizationId::new();
        pins.set_pin(driver, "2580", None).unwrap();

        let mut request = card_request(driver, org, "2580", 5000);
        request.vehicle_id = Some(VehicleId::new());

        let (preparation, ephemeral_key) = preparer.prepare_payment(request).unwrap();

        assert_eq!(preparation.payment_type, PaymentOption::DirectAccount);
        assert_eq!(preparation.display, "ACCOUNT •••• 0300");

        let plaintext = crypto::decrypt(&ephemeral_key, &preparation.payload).unwrap();
        let payload: PaymentPayload = serde_json::from_slice(&plaintext).unwrap();
        match payload {
            PaymentPayload::DirectAccount { account_id, .. } => {
                assert_eq!(account_id, "FA-100200300")
            }
            other => panic!("unexpected payload: {:?}", other),
        }

        // No card involved
        let row = preparer.transaction(preparation.transaction_id).unwrap().unwrap();
        assert!(row.card_id.is_none());
    }

    #[test]
    fn test_direct_account_requires_vehicle() {
        let stack = create_stack();
        let key_vault = KeyVault::new(&stack.storage, &stack.master);
        let cards = CardVault::new(&stack.storage, &key_vault);
        let pins = PinAuthenticator::new(&stack.storage, &stack.settings);
        let ledger = ZeroLedger;
        let limits = SpendLimitGuard::new(&stack.storage, &ledger, &stack.settings);
        let directory = TestDirectory {
            option: PaymentOption::DirectAccount,
            account: Some("FA-1".to_string()),
        };
        let preparer =
            NfcSessionPreparer::new(&stack.storage, &pins, &limits, &cards, &directory);

        let driver = DriverId::new();
        pins.set_pin(driver, "2580", None).unwrap();

        let result =
            preparer.prepare_payment(card_request(driver, OrganizationId::new(), "2580", 5000));
        assert!(matches!(result, Err(FleetPayError::BadRequest(_))));
        // No row recorded: resolution precedes insertion
        assert_eq!(stack.storage.nfc_transactions.count().unwrap(), 0);
    }

    #[test]
    fn test_no_card_on_file() {
        let stack = create_stack();
        let key_vault = KeyVault::new(&stack.storage, &stack.master);
        let cards = CardVault::new(&stack.storage, &key_vault);
        let pins = PinAuthenticator::new(&stack.storage, &stack.settings);
        let ledger = ZeroLedger;
        let limits = SpendLimitGuard::new(&stack.storage, &ledger, &stack.settings);
        let directory = TestDirectory {
            option: PaymentOption::Card,
            account: None,
        };
        let preparer =
            NfcSessionPreparer::new(&stack.storage, &pins, &limits, &cards, &directory);

        let driver = DriverId::new();
        pins.set_pin(driver, "2580", None).unwrap();

        let result =
            preparer.prepare_payment(card_request(driver, OrganizationId::new(), "2580", 5000));
        assert!(matches!(result, Err(FleetPayError::NoCardOnFile)));
    }

    #[test]
    fn test_limit_exceeded_propagates_without_row() {
        let stack = create_stack();
        let key_vault = KeyVault::new(&stack.storage, &stack.master);
        let cards = CardVault::new(&stack.storage, &key_vault);
        let pins = PinAuthenticator::new(&stack.storage, &stack.settings);
        let ledger = ZeroLedger;
        let settings = Settings {
            default_daily_limit: Some(Money::from_cents(1000)),
            ..Settings::default()
        };
        let limits = SpendLimitGuard::new(&stack.storage, &ledger, &settings);
        let directory = TestDirectory {
            option: PaymentOption::Card,
            account: None,
        };
        let preparer =
            NfcSessionPreparer::new(&stack.storage, &pins, &limits, &cards, &directory);

        let driver = DriverId::new();
        pins.set_pin(driver, "2580", None).unwrap();

        let result =
            preparer.prepare_payment(card_request(driver, OrganizationId::new(), "2580", 5000));
        assert!(matches!(result, Err(FleetPayError::LimitExceeded { .. })));
        assert_eq!(stack.storage.nfc_transactions.count().unwrap(), 0);
    }

    #[test]
    fn test_bad_request_before_subsystems() {
        let stack = create_stack();
        let key_vault = KeyVault::new(&stack.storage, &stack.master);
        let cards = CardVault::new(&stack.storage, &key_vault);
        let pins = PinAuthenticator::new(&stack.storage, &stack.settings);
        let ledger = ZeroLedger;
        let limits = SpendLimitGuard::new(&stack.storage, &ledger, &stack.settings);
        let directory = TestDirectory {
            option: PaymentOption::Card,
            account: None,
        };
        let preparer =
            NfcSessionPreparer::new(&stack.storage, &pins, &limits, &cards, &directory);

        // Zero amount fails before PIN verification ever runs
        let driver = DriverId::new();
        let result =
            preparer.prepare_payment(card_request(driver, OrganizationId::new(), "2580", 0));
        assert!(matches!(result, Err(FleetPayError::BadRequest(_))));

        let result = preparer.prepare_payment(card_request(driver, OrganizationId::new(), "", 100));
        assert!(matches!(result, Err(FleetPayError::BadRequest(_))));
    }

    #[test]
    fn test_link_fuel_transaction() {
        let stack = create_stack();
        let key_vault = KeyVault::new(&stack.storage, &stack.master);
        let cards = CardVault::new(&stack.storage, &key_vault);
        let pins = PinAuthenticator::new(&stack.storage, &stack.settings);
        let ledger = ZeroLedger;
        let limits = SpendLimitGuard::new(&stack.storage, &ledger, &stack.settings);
        let directory = TestDirectory {
            option: PaymentOption::Card,
            account: None,
        };
        let preparer =
            NfcSessionPreparer::new(&stack.storage, &pins, &limits, &cards, &directory);

        let driver = DriverId::new();
        let org = OrganizationId::new();
        pins.set_pin(driver, "2580", None).unwrap();
        cards.register_card(org, visa_fields(), UserId::new()).unwrap();

        let (preparation, _key) = preparer
            .prepare_payment(card_request(driver, org, "2580", 7500))
            .unwrap();

        let fuel_id = FuelTransactionId::new();
        preparer
            .link_fuel_transaction(preparation.transaction_id, fuel_id)
            .unwrap();

        let row = preparer.transaction(preparation.transaction_id).unwrap().unwrap();
        assert_eq!(row.status, NfcTransactionStatus::Linked);
        assert_eq!(row.fuel_transaction_id, Some(fuel_id));

        // Linking twice is rejected
        assert!(matches!(
            preparer.link_fuel_transaction(preparation.transaction_id, fuel_id),
            Err(FleetPayError::Validation(_))
        ));
    }

    #[test]
    fn test_ephemeral_key_differs_from_dek_and_per_session() {
        let stack = create_stack();
        let key_vault = KeyVault::new(&stack.storage, &stack.master);
        let cards = CardVault::new(&stack.storage, &key_vault);
        let pins = PinAuthenticator::new(&stack.storage, &stack.settings);
        let ledger = ZeroLedger;
        let limits = SpendLimitGuard::new(&stack.storage, &ledger, &stack.settings);
        let directory = TestDirectory {
            option: PaymentOption::Card,
            account: None,
        };
        let preparer =
            NfcSessionPreparer::new(&stack.storage, &pins, &limits, &cards, &directory);

        let driver = DriverId::new();
        let org = OrganizationId::new();
        pins.set_pin(driver, "2580", None).unwrap();
        cards.register_card(org, visa_fields(), UserId::new()).unwrap();

        let (_prep1, key1) = preparer
            .prepare_payment(card_request(driver, org, "2580", 100))
            .unwrap();
        let (_prep2, key2) = preparer
            .prepare_payment(card_request(driver, org, "2580", 100))
            .unwrap();

        let (_, dek) = key_vault.get_or_create_active_key().unwrap();
        assert_ne!(key1.as_bytes(), dek.as_bytes());
        assert_ne!(key2.as_bytes(), dek.as_bytes());
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_each_attempt_creates_a_row() {
        let stack = create_stack();
        let key_vault = KeyVault::new(&stack.storage, &stack.master);
        let cards = CardVault::new(&stack.storage, &key_vault);
        let pins = PinAuthenticator::new(&stack.storage, &stack.settings);
        let ledger = ZeroLedger;
        let limits = SpendLimitGuard::new(&stack.storage, &ledger, &stack.settings);
        let directory = TestDirectory {
            option: PaymentOption::Card,
            account: None,
        };
        let preparer =
            NfcSessionPreparer::new(&stack.storage, &pins, &limits, &cards, &directory);

        let driver = DriverId::new();
        let org = OrganizationId::new();
        pins.set_pin(driver, "2580", None).unwrap();
        cards.register_card(org, visa_fields(), UserId::new()).unwrap();

        preparer
            .prepare_payment(card_request(driver, org, "2580", 100))
            .unwrap();
        preparer
            .prepare_payment(card_request(driver, org, "2580", 200))
            .unwrap();

        let rows = preparer.transactions_for_driver(driver).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_masked_account() {
        assert_eq!(masked_account("FA-100200300"), "ACCOUNT •••• 0300");
        assert_eq!(masked_account("42"), "ACCOUNT •••• 42");
    }
}
