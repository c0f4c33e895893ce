//! Inbound payment notifications
//!
//! TokiPay posts the final outcome of a payment request to the merchant's
//! callback URL. Organization payers additionally carry their VAT identity in
//! the `VAT_ID` / `VAT_TYPE` headers.

use crate::types::{vat_types, VatDetails};
use crate::{Result, TokiPayError};
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Header carrying the payer's VAT id
pub const VAT_ID_HEADER: &str = "vat_id";
/// Header carrying the payer's VAT type
pub const VAT_TYPE_HEADER: &str = "vat_type";

/// Final outcome reported by a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackStatus {
    Success,
    Failure,
}

/// Callback body sent by TokiPay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackRequest {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub status: CallbackStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub authorization: String,
}

/// VAT headers sent for organization transactions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackHeaders {
    pub vat_id: Option<String>,
    pub vat_type: Option<String>,
}

impl CallbackHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            vat_id: read(VAT_ID_HEADER),
            vat_type: read(VAT_TYPE_HEADER),
        }
    }
}

/// A validated callback
#[derive(Debug, Clone, PartialEq)]
pub struct Callback {
    pub request: CallbackRequest,
    pub headers: CallbackHeaders,
}

impl Callback {
    pub fn is_success(&self) -> bool {
        self.request.status == CallbackStatus::Success
    }

    /// The payer is an organization that asked for a VAT receipt
    pub fn is_organization(&self) -> bool {
        self.headers
            .vat_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(vat_types::ORGANIZATION))
    }

    pub fn vat_details(&self) -> Option<VatDetails> {
        match (&self.headers.vat_id, &self.headers.vat_type) {
            (Some(vat_id), Some(vat_type)) => Some(VatDetails {
                vat_type: vat_type.clone(),
                vat_id: vat_id.clone(),
            }),
            _ => None,
        }
    }

    /// Check the callback's authorization value against the expected secret
    pub fn verify_authorization(&self, expected: &str) -> Result<()> {
        if expected.is_empty() || self.request.authorization.is_empty() {
            return Err(TokiPayError::invalid_callback("missing authorization"));
        }
        if constant_time_eq(self.request.authorization.as_bytes(), expected.as_bytes()) {
            Ok(())
        } else {
            Err(TokiPayError::invalid_callback("authorization mismatch"))
        }
    }
}

/// Validate headers and decode a callback body
pub fn parse_callback(headers: &HeaderMap, body: &[u8]) -> Result<Callback> {
    if let Some(content_type) = headers.get(CONTENT_TYPE) {
        let content_type = content_type.to_str().unwrap_or_default();
        if !content_type.to_ascii_lowercase().starts_with("application/json") {
            return Err(TokiPayError::invalid_callback(format!(
                "unsupported content type {}",
                content_type
            )));
        }
    }

    let request: CallbackRequest = serde_json::from_slice(body)
        .map_err(|e| TokiPayError::invalid_callback(format!("malformed body: {}", e)))?;

    if request.order_id.trim().is_empty() || request.request_id.trim().is_empty() {
        return Err(TokiPayError::invalid_callback(
            "orderId and requestId are required",
        ));
    }

    let callback = Callback {
        request,
        headers: CallbackHeaders::from_headers(headers),
    };

    debug!(
        order_id = %callback.request.order_id,
        request_id = %callback.request.request_id,
        status = ?callback.request.status,
        "Parsed TokiPay callback"
    );
    Ok(callback)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    fn body(status: &str) -> Vec<u8> {
        json!({
            "orderId": "O1",
            "requestId": "R1",
            "status": status,
            "amount": 1000,
            "authorization": "cb-secret"
        })
        .to_string()
        .into_bytes()
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn test_parse_success_callback() {
        let callback = parse_callback(&json_headers(), &body("SUCCESS")).unwrap();

        assert!(callback.is_success());
        assert_eq!(callback.request.order_id, "O1");
        assert_eq!(callback.request.amount, Decimal::new(1000, 0));
        assert!(!callback.is_organization());
        assert!(callback.vat_details().is_none());
        assert!(callback.verify_authorization("cb-secret").is_ok());
        assert!(callback.verify_authorization("other").is_err());
    }

    #[test]
    fn test_empty_authorization_is_rejected() {
        let unsigned = json!({"orderId": "O1", "requestId": "R1", "status": "SUCCESS", "amount": 5})
            .to_string();
        let callback = parse_callback(&json_headers(), unsigned.as_bytes()).unwrap();
        assert!(callback.request.authorization.is_empty());

        let err = callback.verify_authorization("").unwrap_err();
        assert!(matches!(err, TokiPayError::InvalidCallback { .. }));
        assert!(callback.verify_authorization("cb-secret").is_err());

        let signed = parse_callback(&json_headers(), &body("SUCCESS")).unwrap();
        assert!(signed.verify_authorization("").is_err());
    }

    #[test]
    fn test_organization_headers() {
        let mut headers = json_headers();
        headers.insert(VAT_ID_HEADER, HeaderValue::from_static("5012345"));
        headers.insert(VAT_TYPE_HEADER, HeaderValue::from_static("ORGANIZATION"));

        let callback = parse_callback(&headers, &body("FAILURE")).unwrap();
        assert!(!callback.is_success());
        assert!(callback.is_organization());
        assert_eq!(
            callback.vat_details(),
            Some(VatDetails {
                vat_type: "ORGANIZATION".to_string(),
                vat_id: "5012345".to_string(),
            })
        );
    }

    #[test]
    fn test_rejects_invalid_callbacks() {
        let mut text = HeaderMap::new();
        text.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(parse_callback(&text, &body("SUCCESS")).is_err());

        assert!(parse_callback(&json_headers(), &body("MAYBE")).is_err());
        assert!(parse_callback(&json_headers(), b"not json").is_err());

        let blank = json!({"orderId": "", "requestId": "R1", "status": "SUCCESS", "amount": 1})
            .to_string();
        let err = parse_callback(&HeaderMap::new(), blank.as_bytes()).unwrap_err();
        assert!(matches!(err, TokiPayError::InvalidCallback { .. }));
    }
}
