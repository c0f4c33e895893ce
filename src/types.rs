//! Core types for the TokiPay third-party API

use crate::{Result, TokiPayError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Envelope code the provider uses for success
pub const SUCCESS_CODE: i32 = 200;

/// Token lifetime assumed when the provider does not send one (two weeks)
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 2 * 7 * 24 * 60 * 60;

/// Country code used for mobile payments when the caller leaves it empty
pub const DEFAULT_COUNTRY_CODE: &str = "+976";

/// Default value of the `api-key` header
pub const DEFAULT_API_KEY: &str = "third_party_pay";

/// Known provider deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Staging,
}

impl Environment {
    /// Base URL of this deployment
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Production => "https://api.toki.mn",
            Environment::Staging => "https://qams-api.toki.mn",
        }
    }
}

/// Provider API paths, relative to the base URL
pub mod endpoints {
    pub const TOKEN: &str = "/third-party-service/v1/auth/token";
    pub const QR_PAYMENT: &str = "/third-party-service/v1/payment-request/merchant-qr";
    pub const MOBILE_PAYMENT: &str = "/third-party-service/v1/payment-request/phone-number";
    pub const DEEPLINK_PAYMENT: &str = "/third-party-service/v1/payment-request/deeplink";
    pub const PAYMENT_STATUS: &str = "/third-party-service/v1/payment-request/status";
    /// Cancellation appends `/{requestId}`
    pub const PAYMENT_REQUEST: &str = "/third-party-service/v1/payment-request";
    pub const REFUND: &str = "/third-party-service/v1/payment-request/refund";
    pub const VAT: &str = "/third-party-service/v1/payment-request/vat";
}

/// VAT types reported by the provider
pub mod vat_types {
    pub const ORGANIZATION: &str = "ORGANIZATION";
    pub const INDIVIDUAL: &str = "INDIVIDUAL";
}

/// A single provider call, used for error reporting, logging and header policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Token,
    QrPayment,
    MobilePayment,
    DeeplinkPayment,
    PaymentStatus,
    CancelPayment,
    Refund,
    RegisterVat,
}

impl Operation {
    /// All operations, in API order
    pub const ALL: [Operation; 8] = [
        Operation::Token,
        Operation::QrPayment,
        Operation::MobilePayment,
        Operation::DeeplinkPayment,
        Operation::PaymentStatus,
        Operation::CancelPayment,
        Operation::Refund,
        Operation::RegisterVat,
    ];

    /// Human-readable name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Token => "token request",
            Operation::QrPayment => "QR payment request",
            Operation::MobilePayment => "mobile payment request",
            Operation::DeeplinkPayment => "deeplink payment request",
            Operation::PaymentStatus => "payment status check",
            Operation::CancelPayment => "payment cancellation",
            Operation::Refund => "refund request",
            Operation::RegisterVat => "VAT registration",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform wrapper around every provider reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Provider status code, `200` on success
    pub code: i32,
    /// Provider status label
    #[serde(default)]
    pub status: String,
    /// Server timestamp in milliseconds
    #[serde(default)]
    pub timestamp: i64,
    /// Operation payload, meaningful only on success
    pub data: Option<T>,
    /// Error detail, present on failure
    pub error: Option<ApiErrorDetail>,
}

/// Error detail carried by a failed envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}

impl<T> Envelope<T> {
    /// Whether the envelope carries the success code
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// The provider's error message, or a placeholder if none was sent
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .map(|e| e.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "unknown error".to_string())
    }

    /// Fail with an API error unless the envelope reports success
    pub fn ensure_success(&self, operation: Operation) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(TokiPayError::api(operation, self.code, self.error_message()))
        }
    }

    /// Extract the payload of a successful envelope
    pub fn into_data(self, operation: Operation) -> Result<T> {
        self.ensure_success(operation)?;
        self.data
            .ok_or(TokiPayError::MissingData { operation })
    }
}

/// Token endpoint payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "accessToken", default)]
    pub access_token: String,
    /// Lifetime in seconds, if the provider sends one
    #[serde(
        rename = "expiresIn",
        alias = "expires_in",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_in: Option<i64>,
}

/// Payment flavour understood by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentType {
    #[serde(rename = "SPOS")]
    Spos,
    #[serde(rename = "THIRD_PARTY_PAY")]
    ThirdPartyPay,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Spos => "SPOS",
            PaymentType::ThirdPartyPay => "THIRD_PARTY_PAY",
        }
    }
}

/// Lifecycle status of a payment request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Expired,
    Cancelled,
    Refunded,
    Success,
    Failure,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Money has been collected
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Success)
    }

    /// No further transitions are expected
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending | PaymentStatus::Unknown)
    }
}

/// Merchant QR payment request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QrPaymentRequest {
    #[serde(rename = "successUrl")]
    pub success_url: String,
    #[serde(rename = "failureUrl")]
    pub failure_url: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Always replaced by the client's configured merchant id
    #[serde(rename = "merchantId")]
    pub merchant_id: String,
}

impl QrPaymentRequest {
    pub fn new(
        order_id: impl Into<String>,
        amount: Decimal,
        success_url: impl Into<String>,
        failure_url: impl Into<String>,
    ) -> Self {
        Self {
            success_url: success_url.into(),
            failure_url: failure_url.into(),
            order_id: order_id.into(),
            amount,
            ..Default::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrPaymentResponse {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
}

/// Payment request pushed to a customer's phone number
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MobilePaymentRequest {
    #[serde(rename = "successUrl")]
    pub success_url: String,
    #[serde(rename = "failureUrl")]
    pub failure_url: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "merchantId")]
    pub merchant_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "phoneNo")]
    pub phone_no: String,
    /// Defaults to `+976` when absent or empty
    #[serde(rename = "countryCode", skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Defaults to `THIRD_PARTY_PAY` when absent
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentType>,
    #[serde(rename = "successText", skip_serializing_if = "Option::is_none")]
    pub success_text: Option<String>,
    #[serde(rename = "ebarimtText", skip_serializing_if = "Option::is_none")]
    pub ebarimt_text: Option<String>,
    #[serde(rename = "productsInfo", skip_serializing_if = "Vec::is_empty", default)]
    pub products_info: Vec<String>,
    #[serde(rename = "paymentCategory", skip_serializing_if = "Option::is_none")]
    pub payment_category: Option<String>,
}

impl MobilePaymentRequest {
    pub fn new(
        order_id: impl Into<String>,
        amount: Decimal,
        phone_no: impl Into<String>,
        success_url: impl Into<String>,
        failure_url: impl Into<String>,
    ) -> Self {
        Self {
            success_url: success_url.into(),
            failure_url: failure_url.into(),
            order_id: order_id.into(),
            amount,
            phone_no: phone_no.into(),
            ..Default::default()
        }
    }

    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }

    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = Some(payment_type);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Text shown to the customer after a successful payment
    pub fn with_success_text(mut self, text: impl Into<String>) -> Self {
        self.success_text = Some(text.into());
        self
    }

    /// Text printed on the e-receipt (ebarimt)
    pub fn with_ebarimt_text(mut self, text: impl Into<String>) -> Self {
        self.ebarimt_text = Some(text.into());
        self
    }

    pub fn with_products_info(mut self, products: Vec<String>) -> Self {
        self.products_info = products;
        self
    }

    pub fn with_payment_category(mut self, category: impl Into<String>) -> Self {
        self.payment_category = Some(category.into());
        self
    }

    /// Fill provider defaults for fields the caller left empty
    pub(crate) fn apply_defaults(&mut self) {
        if self.country_code.as_deref().map_or(true, str::is_empty) {
            self.country_code = Some(DEFAULT_COUNTRY_CODE.to_string());
        }
        if self.payment_type.is_none() {
            self.payment_type = Some(PaymentType::ThirdPartyPay);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobilePaymentResponse {
    #[serde(rename = "requestId")]
    pub request_id: String,
}

/// Payment request answered with a deeplink into the TokiPay app
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeeplinkPaymentRequest {
    #[serde(rename = "successUrl")]
    pub success_url: String,
    #[serde(rename = "failureUrl")]
    pub failure_url: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "merchantId")]
    pub merchant_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Always sent as `THIRD_PARTY_PAY`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentType>,
}

impl DeeplinkPaymentRequest {
    pub fn new(
        order_id: impl Into<String>,
        amount: Decimal,
        success_url: impl Into<String>,
        failure_url: impl Into<String>,
    ) -> Self {
        Self {
            success_url: success_url.into(),
            failure_url: failure_url.into(),
            order_id: order_id.into(),
            amount,
            ..Default::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeeplinkPaymentResponse {
    pub deeplink: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
}

/// VAT identity attached to a paid request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VatDetails {
    #[serde(rename = "vatType")]
    pub vat_type: String,
    #[serde(rename = "vatId")]
    pub vat_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentStatusResponse {
    pub status: PaymentStatus,
    #[serde(rename = "transNumber", skip_serializing_if = "Option::is_none")]
    pub trans_number: Option<String>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub fee: Option<Decimal>,
    #[serde(rename = "vatDetails", skip_serializing_if = "Option::is_none")]
    pub vat_details: Option<VatDetails>,
}

/// Refund of a settled transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundRequest {
    #[serde(rename = "merchantId")]
    pub merchant_id: String,
    #[serde(rename = "transNumber")]
    pub trans_number: String,
    /// Partial refund amount; the full amount is refunded when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

impl RefundRequest {
    pub fn new(trans_number: impl Into<String>) -> Self {
        Self {
            trans_number: trans_number.into(),
            ..Default::default()
        }
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefundResponse {
    #[serde(rename = "transNumber")]
    pub trans_number: String,
    pub response: String,
    #[serde(rename = "txnNumber")]
    pub txn_number: String,
    #[serde(rename = "topupTransnumber")]
    pub topup_transnumber: String,
}

/// Organization VAT details for an e-receipt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VatRegistrationRequest {
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    #[serde(rename = "DDTD")]
    pub ddtd: String,
    #[serde(rename = "totalAmount", skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
    #[serde(rename = "vatAmount", skip_serializing_if = "Option::is_none")]
    pub vat_amount: Option<String>,
    #[serde(rename = "createdDate", skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(rename = "merchantName", skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(rename = "merchantTin", skip_serializing_if = "Option::is_none")]
    pub merchant_tin: Option<String>,
}

impl VatRegistrationRequest {
    pub fn new(transaction_id: impl Into<String>, ddtd: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            ddtd: ddtd.into(),
            ..Default::default()
        }
    }

    pub fn with_amounts(mut self, total: impl Into<String>, vat: impl Into<String>) -> Self {
        self.total_amount = Some(total.into());
        self.vat_amount = Some(vat.into());
        self
    }

    pub fn with_created_date(mut self, date: impl Into<String>) -> Self {
        self.created_date = Some(date.into());
        self
    }

    pub fn with_merchant(mut self, name: impl Into<String>, tin: impl Into<String>) -> Self {
        self.merchant_name = Some(name.into());
        self.merchant_tin = Some(tin.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VatRegistrationResponse {
    pub status: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success_payload() {
        let envelope: Envelope<QrPaymentResponse> = serde_json::from_value(json!({
            "code": 200,
            "status": "OK",
            "timestamp": 1718000000000i64,
            "data": {"requestId": "R1", "transactionId": "T1"},
            "error": null
        }))
        .unwrap();

        assert!(envelope.is_success());
        let data = envelope.into_data(Operation::QrPayment).unwrap();
        assert_eq!(data.request_id, "R1");
        assert_eq!(data.transaction_id, "T1");
    }

    #[test]
    fn test_envelope_failure_ignores_payload() {
        let envelope: Envelope<QrPaymentResponse> = serde_json::from_value(json!({
            "code": 400,
            "status": "BAD_REQUEST",
            "data": {"requestId": "stale"},
            "error": {"message": "invalid amount"}
        }))
        .unwrap();

        let err = envelope.into_data(Operation::QrPayment).unwrap_err();
        assert!(matches!(err, TokiPayError::Api { code: 400, .. }));
        assert_eq!(err.to_string(), "QR payment request failed: invalid amount");
    }

    #[test]
    fn test_envelope_failure_without_error_detail() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_value(json!({"code": 500})).unwrap();

        let err = envelope.ensure_success(Operation::CancelPayment).unwrap_err();
        assert_eq!(err.provider_message(), Some("unknown error"));
    }

    #[test]
    fn test_envelope_success_without_data() {
        let envelope: Envelope<RefundResponse> =
            serde_json::from_value(json!({"code": 200, "data": null})).unwrap();

        let err = envelope.into_data(Operation::Refund).unwrap_err();
        assert!(matches!(
            err,
            TokiPayError::MissingData {
                operation: Operation::Refund
            }
        ));
    }

    #[test]
    fn test_token_response_lifetime_aliases() {
        let camel: TokenResponse =
            serde_json::from_value(json!({"accessToken": "a", "expiresIn": 60})).unwrap();
        let snake: TokenResponse =
            serde_json::from_value(json!({"accessToken": "a", "expires_in": 60})).unwrap();
        let missing: TokenResponse = serde_json::from_value(json!({"accessToken": "a"})).unwrap();

        assert_eq!(camel.expires_in, Some(60));
        assert_eq!(snake.expires_in, Some(60));
        assert_eq!(missing.expires_in, None);
    }

    #[test]
    fn test_mobile_request_defaults() {
        let mut request = MobilePaymentRequest::new(
            "O1",
            Decimal::new(1500, 0),
            "99112233",
            "https://a",
            "https://b",
        )
        .with_country_code("");
        request.apply_defaults();

        assert_eq!(request.country_code.as_deref(), Some(DEFAULT_COUNTRY_CODE));
        assert_eq!(request.payment_type, Some(PaymentType::ThirdPartyPay));

        let mut spos = MobilePaymentRequest::new("O2", Decimal::ONE, "1", "a", "b")
            .with_country_code("+82")
            .with_payment_type(PaymentType::Spos);
        spos.apply_defaults();
        assert_eq!(spos.country_code.as_deref(), Some("+82"));
        assert_eq!(spos.payment_type, Some(PaymentType::Spos));
    }

    #[test]
    fn test_request_wire_names() {
        let request = QrPaymentRequest::new("O1", Decimal::new(1000, 0), "https://a", "https://b");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["orderId"], "O1");
        assert_eq!(value["amount"], json!(1000.0));
        assert_eq!(value["successUrl"], "https://a");
        assert_eq!(value["failureUrl"], "https://b");
        assert!(value.get("notes").is_none());

        let vat = serde_json::to_value(VatRegistrationRequest::new("T1", "D-77")).unwrap();
        assert_eq!(vat["DDTD"], "D-77");
        assert!(vat.get("merchantTin").is_none());
    }

    #[test]
    fn test_payment_status_parsing() {
        let status: PaymentStatusResponse = serde_json::from_value(json!({
            "status": "APPROVED",
            "transNumber": "TN-1",
            "fee": 12.5,
            "vatDetails": {"vatType": "ORGANIZATION", "vatId": "5012345"}
        }))
        .unwrap();

        assert_eq!(status.status, PaymentStatus::Approved);
        assert!(status.status.is_paid());
        assert_eq!(status.fee, Some(Decimal::new(125, 1)));
        assert_eq!(status.vat_details.unwrap().vat_type, vat_types::ORGANIZATION);

        let odd: PaymentStatusResponse =
            serde_json::from_value(json!({"status": "ON_HOLD"})).unwrap();
        assert_eq!(odd.status, PaymentStatus::Unknown);
        assert!(!odd.status.is_terminal());
    }

    #[test]
    fn test_environment_urls() {
        assert_eq!(Environment::Production.base_url(), "https://api.toki.mn");
        assert_eq!(Environment::Staging.base_url(), "https://qams-api.toki.mn");
    }
}
