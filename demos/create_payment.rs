//! Create a QR payment and poll its status
//!
//! Reads credentials from `TOKIPAY_*` environment variables.

use rust_decimal::Decimal;
use std::time::Duration;
use tokipay::{QrPaymentRequest, TokiPayClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let client = TokiPayClient::from_env()?;

    let payment = client
        .create_qr_payment(
            QrPaymentRequest::new(
                "demo-order-1",
                Decimal::new(1000, 0),
                "https://shop.example/success",
                "https://shop.example/failure",
            )
            .with_notes("demo payment"),
        )
        .await?;

    println!("Request id:     {}", payment.request_id);
    println!("Transaction id: {}", payment.transaction_id);

    for _ in 0..5 {
        let status = client.check_payment_status(&payment.request_id).await?;
        println!("Status: {:?}", status.status);
        if status.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
    }

    Ok(())
}
