//! Callback receiver for TokiPay payment notifications

use async_trait::async_trait;
use std::sync::Arc;
use tokipay::axum::{callback_router, CallbackHandler, CALLBACK_PATH};
use tokipay::Callback;

struct LoggingHandler {
    secret: Option<String>,
}

#[async_trait]
impl CallbackHandler for LoggingHandler {
    async fn handle(&self, callback: Callback) -> tokipay::Result<()> {
        if let Some(secret) = &self.secret {
            callback.verify_authorization(secret)?;
        }

        println!(
            "order {} request {} -> {:?} ({})",
            callback.request.order_id,
            callback.request.request_id,
            callback.request.status,
            callback.request.amount
        );
        if let Some(vat) = callback.vat_details() {
            println!("   VAT {} {}", vat.vat_type, vat.vat_id);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let handler = Arc::new(LoggingHandler {
        secret: std::env::var("TOKIPAY_CALLBACK_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty()),
    });
    let app = callback_router(handler);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:4021").await?;
    println!("Listening on http://0.0.0.0:4021{}", CALLBACK_PATH);

    axum::serve(listener, app).await?;
    Ok(())
}
