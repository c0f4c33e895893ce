//! Axum integration for TokiPay callbacks

use crate::callback::{parse_callback, Callback};
use crate::TokiPayError;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Route the callback receiver is mounted on
pub const CALLBACK_PATH: &str = "/tokipay/callback";

/// Application hook invoked for every accepted callback
#[async_trait]
pub trait CallbackHandler: Send + Sync + 'static {
    async fn handle(&self, callback: Callback) -> crate::Result<()>;
}

/// Generic success body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
    pub success: bool,
}

/// Generic error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    fn respond(status: StatusCode, error: &str, message: String) -> Response {
        let body = ErrorResponse {
            error: error.to_string(),
            message,
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create a router that accepts TokiPay callbacks and hands them to `handler`
pub fn callback_router<H: CallbackHandler>(handler: Arc<H>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, post(receive_callback::<H>))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

async fn receive_callback<H: CallbackHandler>(
    State(handler): State<Arc<H>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let callback = match parse_callback(&headers, &body) {
        Ok(callback) => callback,
        Err(e) => {
            warn!("Rejected TokiPay callback: {}", e);
            return ErrorResponse::respond(StatusCode::BAD_REQUEST, "invalid_callback", e.to_string());
        }
    };

    let request_id = callback.request.request_id.clone();
    match handler.handle(callback).await {
        Ok(()) => {
            info!(%request_id, "TokiPay callback processed");
            (
                StatusCode::OK,
                Json(SuccessResponse {
                    message: "callback received".to_string(),
                    success: true,
                }),
            )
                .into_response()
        }
        Err(TokiPayError::InvalidCallback { message }) => {
            warn!(%request_id, "Callback refused by handler: {}", message);
            ErrorResponse::respond(StatusCode::BAD_REQUEST, "invalid_callback", message)
        }
        Err(e) => {
            error!(%request_id, "Callback handler failed: {}", e);
            ErrorResponse::respond(StatusCode::INTERNAL_SERVER_ERROR, "handler_error", e.to_string())
        }
    }
}
