//! HTTP client for the TokiPay third-party API

use crate::auth::TokenManager;
use crate::config::TokiPayConfig;
use crate::types::*;
use crate::{Result, TokiPayError};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Characters left as-is when a request id is placed in a URL
const ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Name of the static API key header
pub const API_KEY_HEADER: &str = "api-key";

/// TokiPay API client
///
/// Clones share the HTTP connection pool and the cached access token.
#[derive(Debug, Clone)]
pub struct TokiPayClient {
    config: TokiPayConfig,
    http: Client,
    tokens: TokenManager,
}

impl TokiPayClient {
    /// Create a new client, validating the configuration
    pub fn new(config: TokiPayConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TokiPayError::config(format!("Failed to create HTTP client: {}", e)))?;

        let tokens = TokenManager::new(&config.base_url, &config.credentials, config.timeout);

        Ok(Self {
            config,
            http,
            tokens,
        })
    }

    /// Create a client from `TOKIPAY_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(TokiPayConfig::from_env()?)
    }

    pub fn config(&self) -> &TokiPayConfig {
        &self.config
    }

    /// Token state shared by this client and its clones
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Return a valid bearer token, fetching one if needed
    pub async fn access_token(&self) -> Result<String> {
        self.tokens.ensure_token(&self.http).await
    }

    /// Create a merchant QR payment
    pub async fn create_qr_payment(&self, mut request: QrPaymentRequest) -> Result<QrPaymentResponse> {
        let token = self.access_token().await?;
        request.merchant_id = self.config.credentials.merchant_id.clone();

        let response: QrPaymentResponse = self
            .send(Operation::QrPayment, Method::POST, endpoints::QR_PAYMENT, &token, Some(&request))
            .await?
            .into_data(Operation::QrPayment)?;

        info!(
            order_id = %request.order_id,
            request_id = %response.request_id,
            "QR payment created"
        );
        Ok(response)
    }

    /// Push a payment request to the customer's phone
    pub async fn create_mobile_payment(
        &self,
        mut request: MobilePaymentRequest,
    ) -> Result<MobilePaymentResponse> {
        let token = self.access_token().await?;
        request.merchant_id = self.config.credentials.merchant_id.clone();
        request.apply_defaults();

        let response: MobilePaymentResponse = self
            .send(
                Operation::MobilePayment,
                Method::POST,
                endpoints::MOBILE_PAYMENT,
                &token,
                Some(&request),
            )
            .await?
            .into_data(Operation::MobilePayment)?;

        info!(
            order_id = %request.order_id,
            request_id = %response.request_id,
            "Mobile payment created"
        );
        Ok(response)
    }

    /// Create a payment that opens the TokiPay app through a deeplink
    pub async fn create_deeplink_payment(
        &self,
        mut request: DeeplinkPaymentRequest,
    ) -> Result<DeeplinkPaymentResponse> {
        let token = self.access_token().await?;
        request.merchant_id = self.config.credentials.merchant_id.clone();
        request.payment_type = Some(PaymentType::ThirdPartyPay);

        let response: DeeplinkPaymentResponse = self
            .send(
                Operation::DeeplinkPayment,
                Method::POST,
                endpoints::DEEPLINK_PAYMENT,
                &token,
                Some(&request),
            )
            .await?
            .into_data(Operation::DeeplinkPayment)?;

        info!(
            order_id = %request.order_id,
            transaction_id = %response.transaction_id,
            "Deeplink payment created"
        );
        Ok(response)
    }

    /// Check the status of a payment request
    pub async fn check_payment_status(&self, request_id: &str) -> Result<PaymentStatusResponse> {
        let token = self.access_token().await?;

        self.send::<(), _>(
            Operation::PaymentStatus,
            Method::GET,
            &status_path(request_id),
            &token,
            None,
        )
        .await?
        .into_data(Operation::PaymentStatus)
    }

    /// Cancel a pending payment request
    pub async fn cancel_payment(&self, request_id: &str) -> Result<()> {
        let token = self.access_token().await?;

        self.send::<(), serde_json::Value>(
            Operation::CancelPayment,
            Method::PATCH,
            &cancel_path(request_id),
            &token,
            None,
        )
        .await?
        .ensure_success(Operation::CancelPayment)?;

        info!(request_id, "Payment request cancelled");
        Ok(())
    }

    /// Refund a settled transaction, fully or partially
    pub async fn refund_payment(&self, mut request: RefundRequest) -> Result<RefundResponse> {
        let token = self.access_token().await?;
        request.merchant_id = self.config.credentials.merchant_id.clone();

        let response: RefundResponse = self
            .send(Operation::Refund, Method::POST, endpoints::REFUND, &token, Some(&request))
            .await?
            .into_data(Operation::Refund)?;

        info!(trans_number = %request.trans_number, "Refund processed");
        Ok(response)
    }

    /// Register organization VAT details for a transaction
    pub async fn register_vat(
        &self,
        request: VatRegistrationRequest,
    ) -> Result<VatRegistrationResponse> {
        let token = self.access_token().await?;

        self.send(Operation::RegisterVat, Method::POST, endpoints::VAT, &token, Some(&request))
            .await?
            .into_data(Operation::RegisterVat)
    }

    /// Send one authenticated request and decode the response envelope
    async fn send<B, T>(
        &self,
        operation: Operation,
        method: Method,
        path: &str,
        token: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%operation, %method, path, "Sending TokiPay request");

        let mut request = self
            .http
            .request(method, self.config.url(path))
            .header(AUTHORIZATION, format!("Bearer {}", token));

        if self.config.sends_api_key(operation) {
            request = request.header(API_KEY_HEADER, &self.config.credentials.api_key);
        }

        if let Some(body) = body {
            let payload = serde_json::to_vec(body).map_err(TokiPayError::Serialization)?;
            request = request.header(CONTENT_TYPE, "application/json").body(payload);
        }

        let response = request.send().await.map_err(|e| {
            error!(%operation, "Request failed: {}", e);
            TokiPayError::transport(e, self.config.timeout)
        })?;

        let envelope = read_envelope::<T>(response, operation, self.config.timeout).await?;
        if !envelope.is_success() {
            warn!(
                %operation,
                code = envelope.code,
                status = %envelope.status,
                "Provider rejected request: {}",
                envelope.error_message()
            );
        }
        Ok(envelope)
    }
}

/// Read a full response body and decode it as an envelope
pub(crate) async fn read_envelope<T>(
    response: Response,
    operation: Operation,
    timeout: Duration,
) -> Result<Envelope<T>>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| TokiPayError::transport(e, timeout))?;

    serde_json::from_slice(&body).map_err(|source| {
        error!(
            %operation,
            http_status = %status,
            body = %String::from_utf8_lossy(&body),
            "Undecodable response body"
        );
        TokiPayError::Deserialization { operation, source }
    })
}

fn encode_id(id: &str) -> String {
    utf8_percent_encode(id, ID_ENCODE_SET).to_string()
}

fn status_path(request_id: &str) -> String {
    format!("{}?requestId={}", endpoints::PAYMENT_STATUS, encode_id(request_id))
}

fn cancel_path(request_id: &str) -> String {
    format!("{}/{}", endpoints::PAYMENT_REQUEST, encode_id(request_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = TokiPayConfig::for_environment(Environment::Staging, "u", "p", "M1");
        let client = TokiPayClient::new(config).unwrap();
        assert_eq!(client.config().base_url, "https://qams-api.toki.mn");
        assert_eq!(client.config().credentials.merchant_id, "M1");
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = TokiPayConfig::new("not a url", "u", "p", "M1");
        assert!(matches!(
            TokiPayClient::new(config),
            Err(TokiPayError::Config { .. })
        ));
    }

    #[test]
    fn test_request_paths() {
        assert_eq!(
            status_path("R-1_a.b~"),
            "/third-party-service/v1/payment-request/status?requestId=R-1_a.b~"
        );
        assert_eq!(
            cancel_path("a/b c"),
            "/third-party-service/v1/payment-request/a%2Fb%20c"
        );
    }
}
