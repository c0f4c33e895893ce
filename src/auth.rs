//! Access token lifecycle
//!
//! The provider issues a bearer token in exchange for Basic credentials. The
//! token is fetched lazily, reused until it expires and replaced in place. The
//! state lives behind an async mutex that is held across the refresh, so
//! concurrent callers wait for a single fetch instead of racing on it.

use crate::client::read_envelope;
use crate::config::Credentials;
use crate::types::{endpoints, Operation, TokenResponse, DEFAULT_TOKEN_LIFETIME_SECS};
use crate::{Result, TokiPayError};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Bearer token and the instant it stops being usable
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A token is usable only while its expiry is strictly in the future
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && self.expires_at > now
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// Fetches, caches and refreshes the bearer token
#[derive(Clone)]
pub struct TokenManager {
    token_url: String,
    basic_auth: String,
    timeout: Duration,
    state: Arc<Mutex<Option<AccessToken>>>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TokenManager {
    /// Create a token manager for the given provider and credentials
    pub fn new(base_url: &str, credentials: &Credentials, timeout: Duration) -> Self {
        let encoded = general_purpose::STANDARD.encode(format!(
            "{}:{}",
            credentials.username, credentials.password
        ));

        Self {
            token_url: format!("{}{}", base_url.trim_end_matches('/'), endpoints::TOKEN),
            basic_auth: format!("Basic {}", encoded),
            timeout,
            state: Arc::new(Mutex::new(None)),
        }
    }

    /// Return a valid bearer token, fetching a new one if none is held or it expired
    pub async fn ensure_token(&self, http: &reqwest::Client) -> Result<String> {
        let mut state = self.state.lock().await;

        if let Some(token) = state.as_ref().filter(|t| t.is_valid()) {
            debug!(expires_at = %token.expires_at, "Reusing cached access token");
            return Ok(token.value.clone());
        }

        let token = self.fetch(http).await?;
        let value = token.value.clone();
        *state = Some(token);
        Ok(value)
    }

    /// The token currently held, valid or not
    pub async fn current(&self) -> Option<AccessToken> {
        self.state.lock().await.clone()
    }

    /// Drop the held token so the next call fetches a new one
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }

    /// Install a previously obtained token, e.g. one persisted across restarts
    pub async fn restore(&self, token: AccessToken) {
        *self.state.lock().await = Some(token);
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<AccessToken> {
        debug!(url = %self.token_url, "Requesting access token");

        let response = http
            .get(&self.token_url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, &self.basic_auth)
            .send()
            .await
            .map_err(|e| {
                error!("Token request failed: {}", e);
                TokiPayError::transport(e, self.timeout)
            })?;

        let envelope = read_envelope::<TokenResponse>(response, Operation::Token, self.timeout).await?;

        if !envelope.is_success() {
            let message = envelope.error_message();
            warn!(code = envelope.code, "Token request rejected: {}", message);
            return Err(TokiPayError::authentication(message));
        }

        let data = envelope.data.unwrap_or_default();
        if data.access_token.is_empty() {
            return Err(TokiPayError::authentication(
                "token response did not contain an access token",
            ));
        }

        let lifetime = data
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let now = Utc::now();
        let expires_at = TimeDelta::try_seconds(lifetime)
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        info!(%expires_at, "Obtained TokiPay access token");
        Ok(AccessToken::new(data.access_token, expires_at))
    }
}
