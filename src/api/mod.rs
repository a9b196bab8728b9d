//! JSON API boundary for the payment core
//!
//! Request/response DTOs plus a facade that dispatches to the services
//! and maps errors to a wire envelope with stable codes. The transport
//! itself (HTTP routing, sessions) lives outside this crate; callers
//! hand deserialized requests in and serialize the responses out.
//!
//! `prepare_nfc_payment` returns the ephemeral session key as a separate
//! value from the response body. The key and the ciphertext it decrypts
//! must travel over distinct channels; putting both in one response
//! would make the second encryption layer pointless.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{MasterKey, Settings};
use crate::crypto::CipherKey;
use crate::error::FleetPayError;
use crate::models::{
    CardKind, CardSummary, DeviceInfo, DriverId, FuelTransactionId, GeoPoint, Money,
    NfcTransactionId, OrganizationId, UserId, VehicleId,
};
use crate::services::{
    CardFields, CardVault, KeyVault, NfcSessionPreparer, OrganizationDirectory, PaymentOption,
    PinAuthenticator, PrepareRequest, SpendLedger, SpendLimitGuard,
};
use crate::storage::Storage;

/// External collaborator answering capability checks
///
/// Role and membership data live with the caller; the core only asks
/// one question.
pub trait Authorizer {
    /// May `actor` manage payment data for `organization`?
    fn can_manage_payment_data(&self, actor: UserId, organization: OrganizationId) -> bool;
}

/// Error envelope returned to the transport
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Stable machine-readable code
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
    /// Structured detail for driving UI (attempts remaining, lockout
    /// expiry, limit headroom)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<FleetPayError> for ApiError {
    fn from(err: FleetPayError) -> Self {
        let message = err.to_string();
        match err {
            FleetPayError::KeyUnavailable => Self {
                code: "encryption_unavailable",
                message,
                details: None,
            },
            FleetPayError::KeyCorrupt(_) | FleetPayError::DecryptionFailed => Self {
                code: "integrity_failure",
                message,
                details: None,
            },
            FleetPayError::InvalidCardNumber => Self {
                code: "invalid_card_number",
                message,
                details: None,
            },
            FleetPayError::WeakPin(reason) => Self {
                code: "weak_pin",
                message,
                details: Some(json!({ "reason": reason })),
            },
            FleetPayError::IncorrectOldPin => Self {
                code: "incorrect_old_pin",
                message,
                details: None,
            },
            FleetPayError::NoPinConfigured => Self {
                code: "no_pin_configured",
                message,
                details: None,
            },
            FleetPayError::IncorrectPin { attempts_remaining } => Self {
                code: "incorrect_pin",
                message,
                details: Some(json!({ "attempts_remaining": attempts_remaining })),
            },
            FleetPayError::Locked { until } => Self {
                code: "locked",
                message,
                details: Some(json!({ "locked_until": until })),
            },
            FleetPayError::LimitExceeded { scope, remaining } => Self {
                code: "limit_exceeded",
                message,
                details: Some(json!({
                    "scope": scope,
                    "remaining_cents": remaining.cents(),
                })),
            },
            FleetPayError::NoCardOnFile => Self {
                code: "no_card_on_file",
                message,
                details: None,
            },
            FleetPayError::AccountUnavailable => Self {
                code: "account_unavailable",
                message,
                details: None,
            },
            FleetPayError::BadRequest(_) | FleetPayError::Validation(_) => Self {
                code: "bad_request",
                message,
                details: None,
            },
            FleetPayError::Forbidden => Self {
                code: "forbidden",
                message,
                details: None,
            },
            FleetPayError::NotFound { .. } => Self {
                code: "not_found",
                message,
                details: None,
            },
            FleetPayError::Encryption(_)
            | FleetPayError::Storage(_)
            | FleetPayError::Io(_)
            | FleetPayError::Json(_) => Self {
                code: "internal",
                message,
                details: None,
            },
        }
    }
}

/// Result type for boundary operations
pub type ApiResult<T> = Result<T, ApiError>;

/// POST /cards request body
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterCardRequest {
    pub organization_id: OrganizationId,
    pub acting_user: UserId,
    pub number: String,
    pub holder_name: String,
    pub expiry_month: u32,
    pub expiry_year: u32,
    pub cvv: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub kind: CardKind,
}

/// POST /driver-pin request body
#[derive(Debug, Clone, Deserialize)]
pub struct SetPinRequest {
    pub driver_id: DriverId,
    pub new_pin: String,
    #[serde(default)]
    pub old_pin: Option<String>,
}

/// POST /driver-pin response body
#[derive(Debug, Clone, Serialize)]
pub struct SetPinResponse {
    pub success: bool,
}

/// POST /driver-pin/verify request body
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPinRequest {
    pub driver_id: DriverId,
    pub pin: String,
}

/// POST /driver-pin/verify response body
#[derive(Debug, Clone, Serialize)]
pub struct VerifyPinResponse {
    pub verified: bool,
}

/// POST /nfc/prepare request body
#[derive(Debug, Clone, Deserialize)]
pub struct PrepareNfcRequest {
    pub driver_id: DriverId,
    pub pin: String,
    pub amount_cents: i64,
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

/// POST /nfc/prepare response body
///
/// Carries the ciphertext but never the key that decrypts it.
#[derive(Debug, Clone, Serialize)]
pub struct PrepareNfcResponse {
    pub transaction_id: NfcTransactionId,
    pub payload: crate::crypto::EncryptedField,
    pub payment_type: PaymentOption,
    pub display: String,
}

/// The single-use session key, handed to the transport's second channel
///
/// Deliberately not serializable as part of a response body.
pub struct SessionKey(CipherKey);

impl SessionKey {
    /// Base64 form for the out-of-band channel
    pub fn to_base64(&self) -> String {
        self.0.to_base64()
    }

    /// Consume the handle, exposing the key for decryption
    pub fn into_key(self) -> CipherKey {
        self.0
    }
}

/// Boundary facade over the payment services
///
/// Construction requires a `MasterKey`, so a process without one fails
/// at startup with `encryption_unavailable` rather than surfacing
/// generic errors per request.
pub struct PaymentApi<'a> {
    storage: &'a Storage,
    settings: &'a Settings,
    master: &'a MasterKey,
    ledger: &'a dyn SpendLedger,
    directory: &'a dyn OrganizationDirectory,
    authorizer: &'a dyn Authorizer,
}

impl<'a> PaymentApi<'a> {
    /// Create the API facade
    pub fn new(
        storage: &'a Storage,
        settings: &'a Settings,
        master: &'a MasterKey,
        ledger: &'a dyn SpendLedger,
        directory: &'a dyn OrganizationDirectory,
        authorizer: &'a dyn Authorizer,
    ) -> Self {
        Self {
            storage,
            settings,
            master,
            ledger,
            directory,
            authorizer,
        }
    }

    /// POST /cards
    pub fn register_card(&self, request: RegisterCardRequest) -> ApiResult<CardSummary> {
        if !self
            .authorizer
            .can_manage_payment_data(request.acting_user, request.organization_id)
        {
            return Err(FleetPayError::Forbidden.into());
        }

        let key_vault = KeyVault::new(self.storage, self.master);
        let cards = CardVault::new(self.storage, &key_vault);

        let summary = cards.register_card(
            request.organization_id,
            CardFields {
                number: request.number,
                holder_name: request.holder_name,
                expiry_month: request.expiry_month,
                expiry_year: request.expiry_year,
                cvv: request.cvv,
                nickname: request.nickname,
                kind: request.kind,
            },
            request.acting_user,
        )?;

        Ok(summary)
    }

    /// POST /driver-pin
    pub fn set_driver_pin(&self, request: SetPinRequest) -> ApiResult<SetPinResponse> {
        let pins = PinAuthenticator::new(self.storage, self.settings);
        pins.set_pin(request.driver_id, &request.new_pin, request.old_pin.as_deref())?;
        Ok(SetPinResponse { success: true })
    }

    /// POST /driver-pin/verify
    pub fn verify_driver_pin(&self, request: VerifyPinRequest) -> ApiResult<VerifyPinResponse> {
        let pins = PinAuthenticator::new(self.storage, self.settings);
        pins.verify_pin(request.driver_id, &request.pin)?;
        Ok(VerifyPinResponse { verified: true })
    }

    /// POST /nfc/prepare
    ///
    /// Returns the response body and the session key separately; the
    /// transport delivers them over distinct channels.
    pub fn prepare_nfc_payment(
        &self,
        request: PrepareNfcRequest,
    ) -> ApiResult<(PrepareNfcResponse, SessionKey)> {
        let key_vault = KeyVault::new(self.storage, self.master);
        let cards = CardVault::new(self.storage, &key_vault);
        let pins = PinAuthenticator::new(self.storage, self.settings);
        let limits = SpendLimitGuard::new(self.storage, self.ledger, self.settings);
        let preparer =
            NfcSessionPreparer::new(self.storage, &pins, &limits, &cards, self.directory);

        let (preparation, ephemeral_key) = preparer.prepare_payment(PrepareRequest {
            driver_id: request.driver_id,
            pin: request.pin,
            amount: Money::from_cents(request.amount_cents),
            organization_id: request.organization_id,
            vehicle_id: request.vehicle_id,
            fuel_transaction_id: request.fuel_transaction_id,
            device_info: request.device_info,
            location: request.location,
        })?;

        Ok((
            PrepareNfcResponse {
                transaction_id: preparation.transaction_id,
                payload: preparation.payload,
                payment_type: preparation.payment_type,
                display: preparation.display,
            },
            SessionKey(ephemeral_key),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::VaultPaths;
    use crate::crypto::KEY_SIZE;
    use crate::error::FleetPayResult;
    use crate::models::CardBrand;
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

    struct CardDirectory;

    impl OrganizationDirectory for CardDirectory {
        fn payment_option(&self, _organization: OrganizationId) -> FleetPayResult<PaymentOption> {
            Ok(PaymentOption::Card)
        }

        fn vehicle_account(&self, _vehicle: VehicleId) -> FleetPayResult<Option<String>> {
            Ok(None)
        }
    }

    struct AllowAll;

    impl Authorizer for AllowAll {
        fn can_manage_payment_data(&self, _actor: UserId, _organization: OrganizationId) -> bool {
            true
        }
    }

    struct DenyAll;

    impl Authorizer for DenyAll {
        fn can_manage_payment_data(&self, _actor: UserId, _organization: OrganizationId) -> bool {
            false
        }
    }

    struct TestHarness {
        _temp_dir: TempDir,
        storage: Storage,
        settings: Settings,
        master: MasterKey,
        ledger: ZeroLedger,
        directory: CardDirectory,
    }

    fn create_harness() -> TestHarness {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        TestHarness {
            _temp_dir: temp_dir,
            storage,
            settings: Settings::default(),
            master: MasterKey::from_bytes([5u8; KEY_SIZE]),
            ledger: ZeroLedger,
            directory: CardDirectory,
        }
    }

    fn register_request(org: OrganizationId) -> RegisterCardRequest {
        RegisterCardRequest {
            organization_id: org,
            acting_user: UserId::new(),
            number: "4242424242424242".to_string(),
            holder_name: "Jane Driver".to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvv: "123".to_string(),
            nickname: "Fleet Visa".to_string(),
            kind: CardKind::Fleet,
        }
    }

    #[test]
    fn test_register_card_happy_path() {
        let h = create_harness();
        let auth = AllowAll;
        let api = PaymentApi::new(
            &h.storage,
            &h.settings,
            &h.master,
            &h.ledger,
            &h.directory,
            &auth,
        );

        let summary = api.register_card(register_request(OrganizationId::new())).unwrap();
        assert_eq!(summary.brand, CardBrand::Visa);

        // The serialized response carries no raw card data
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("4242424242424242"));
        assert!(!json.contains("ciphertext"));
    }

    #[test]
    fn test_register_card_forbidden() {
        let h = create_harness();
        let auth = DenyAll;
        let api = PaymentApi::new(
            &h.storage,
            &h.settings,
            &h.master,
            &h.ledger,
            &h.directory,
            &auth,
        );

        let err = api
            .register_card(register_request(OrganizationId::new()))
            .unwrap_err();
        assert_eq!(err.code, "forbidden");
    }

    #[test]
    fn test_invalid_card_number_code() {
        let h = create_harness();
        let auth = AllowAll;
        let api = PaymentApi::new(
            &h.storage,
            &h.settings,
            &h.master,
            &h.ledger,
            &h.directory,
            &auth,
        );

        let mut request = register_request(OrganizationId::new());
        request.number = "4242424242424241".to_string();
        let err = api.register_card(request).unwrap_err();
        assert_eq!(err.code, "invalid_card_number");
    }

    #[test]
    fn test_pin_endpoints() {
        let h = create_harness();
        let auth = AllowAll;
        let api = PaymentApi::new(
            &h.storage,
            &h.settings,
            &h.master,
            &h.ledger,
            &h.directory,
            &auth,
        );

        let driver = DriverId::new();

        let err = api
            .set_driver_pin(SetPinRequest {
                driver_id: driver,
                new_pin: "1234".to_string(),
                old_pin: None,
            })
            .unwrap_err();
        assert_eq!(err.code, "weak_pin");

        let response = api
            .set_driver_pin(SetPinRequest {
                driver_id: driver,
                new_pin: "2580".to_string(),
                old_pin: None,
            })
            .unwrap();
        assert!(response.success);

        let response = api
            .verify_driver_pin(VerifyPinRequest {
                driver_id: driver,
                pin: "2580".to_string(),
            })
            .unwrap();
        assert!(response.verified);

        let err = api
            .verify_driver_pin(VerifyPinRequest {
                driver_id: driver,
                pin: "0000".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.code, "incorrect_pin");
        let details = err.details.unwrap();
        assert_eq!(details["attempts_remaining"], 2);
    }

    #[test]
    fn test_prepare_nfc_key_travels_out_of_band() {
        let h = create_harness();
        let auth = AllowAll;
        let api = PaymentApi::new(
            &h.storage,
            &h.settings,
            &h.master,
            &h.ledger,
            &h.directory,
            &auth,
        );

        let driver = DriverId::new();
        let org = OrganizationId::new();

        api.set_driver_pin(SetPinRequest {
            driver_id: driver,
            new_pin: "2580".to_string(),
            old_pin: None,
        })
        .unwrap();
        api.register_card(register_request(org)).unwrap();

        let (response, session_key) = api
            .prepare_nfc_payment(PrepareNfcRequest {
                driver_id: driver,
                pin: "2580".to_string(),
                amount_cents: 10000,
                organization_id: org,
                vehicle_id: None,
                fuel_transaction_id: None,
                device_info: None,
                location: None,
            })
            .unwrap();

        // The response body never contains the session key
        let body = serde_json::to_string(&response).unwrap();
        assert!(!body.contains(&session_key.to_base64()));

        // The out-of-band key decrypts the payload
        let key = session_key.into_key();
        let plaintext = crate::crypto::decrypt(&key, &response.payload).unwrap();
        let payload: crate::services::PaymentPayload =
            serde_json::from_slice(&plaintext).unwrap();
        match payload {
            crate::services::PaymentPayload::Card { amount_cents, .. } => {
                assert_eq!(amount_cents, 10000)
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_locked_error_carries_expiry() {
        let h = create_harness();
        let auth = AllowAll;
        let api = PaymentApi::new(
            &h.storage,
            &h.settings,
            &h.master,
            &h.ledger,
            &h.directory,
            &auth,
        );

        let driver = DriverId::new();
        api.set_driver_pin(SetPinRequest {
            driver_id: driver,
            new_pin: "2580".to_string(),
            old_pin: None,
        })
        .unwrap();

        for _ in 0..3 {
            let _ = api.verify_driver_pin(VerifyPinRequest {
                driver_id: driver,
                pin: "0000".to_string(),
            });
        }

        let err = api
            .verify_driver_pin(VerifyPinRequest {
                driver_id: driver,
                pin: "2580".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.code, "locked");
        assert!(err.details.unwrap().get("locked_until").is_some());
    }

    #[test]
    fn test_key_unavailable_maps_to_operator_code() {
        let err: ApiError = FleetPayError::KeyUnavailable.into();
        assert_eq!(err.code, "encryption_unavailable");
    }
}
