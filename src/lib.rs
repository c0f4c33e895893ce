//! # tokipay - TokiPay third-party payment client
//!
//! An async client for the TokiPay merchant API. The client authenticates
//! once with Basic credentials, reuses the bearer token until it expires and
//! exposes one method per provider operation: QR, mobile and deeplink payment
//! creation, status checks, cancellation, refunds and VAT registration.
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use tokipay::{QrPaymentRequest, TokiPayClient, TokiPayConfig};
//!
//! # async fn run() -> tokipay::Result<()> {
//! let config = TokiPayConfig::new("https://api.toki.mn", "user", "pass", "merchant-1");
//! let client = TokiPayClient::new(config)?;
//!
//! let payment = client
//!     .create_qr_payment(QrPaymentRequest::new(
//!         "order-1",
//!         Decimal::new(1000, 0),
//!         "https://shop.example/success",
//!         "https://shop.example/failure",
//!     ))
//!     .await?;
//! println!("request {}", payment.request_id);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod callback;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use auth::{AccessToken, TokenManager};
pub use callback::{parse_callback, Callback, CallbackHeaders, CallbackRequest, CallbackStatus};
pub use client::TokiPayClient;
pub use config::{Credentials, TokiPayConfig};
pub use error::{Result, TokiPayError};
pub use types::*;

// Feature-gated framework support
#[cfg(feature = "axum")]
pub mod axum;

/// Current version of the tokipay library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
