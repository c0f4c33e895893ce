//! Client configuration

use crate::types::{Environment, Operation, DEFAULT_API_KEY};
use crate::{Result, TokiPayError};
use std::collections::HashSet;
use std::time::Duration;

/// Default timeout applied to every provider call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Static merchant credentials, fixed for the client's lifetime
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub merchant_id: String,
    /// Value of the `api-key` header
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("merchant_id", &self.merchant_id)
            .field("api_key", &self.api_key)
            .finish()
    }
}

/// TokiPay client configuration
#[derive(Debug, Clone)]
pub struct TokiPayConfig {
    /// Base URL of the provider, without a trailing slash
    pub base_url: String,
    /// Merchant credentials
    pub credentials: Credentials,
    /// Overall timeout of each HTTP call
    pub timeout: Duration,
    /// Operations sent without the `api-key` header
    pub omit_api_key: HashSet<Operation>,
}

impl TokiPayConfig {
    /// Create a new config against an arbitrary base URL
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        merchant_id: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: Credentials {
                username: username.into(),
                password: password.into(),
                merchant_id: merchant_id.into(),
                api_key: DEFAULT_API_KEY.to_string(),
            },
            timeout: DEFAULT_TIMEOUT,
            omit_api_key: HashSet::new(),
        }
    }

    /// Create a new config for a known deployment
    pub fn for_environment(
        environment: Environment,
        username: impl Into<String>,
        password: impl Into<String>,
        merchant_id: impl Into<String>,
    ) -> Self {
        Self::new(environment.base_url(), username, password, merchant_id)
    }

    /// Load the config from `TOKIPAY_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| TokiPayError::config(format!("{} environment variable is required", key)))
        };

        let base_url = lookup("TOKIPAY_BASE_URL")
            .unwrap_or_else(|| Environment::Production.base_url().to_string());

        let mut config = Self::new(
            base_url,
            required("TOKIPAY_USERNAME")?,
            required("TOKIPAY_PASSWORD")?,
            required("TOKIPAY_MERCHANT_ID")?,
        );

        if let Some(api_key) = lookup("TOKIPAY_API_KEY") {
            config = config.with_api_key(api_key);
        }

        if let Some(raw) = lookup("TOKIPAY_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                TokiPayError::config(format!("TOKIPAY_TIMEOUT_SECS must be a number, got {}", raw))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(TokiPayError::config(
                "Base URL must start with http:// or https://",
            ));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| TokiPayError::config(format!("Invalid base URL {}: {}", self.base_url, e)))?;

        let creds = &self.credentials;
        for (name, value) in [
            ("username", &creds.username),
            ("password", &creds.password),
            ("merchant id", &creds.merchant_id),
            ("API key", &creds.api_key),
        ] {
            if value.trim().is_empty() {
                return Err(TokiPayError::config(format!("{} cannot be empty", name)));
            }
        }

        if self.timeout.is_zero() {
            return Err(TokiPayError::config("Timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Set the `api-key` header value
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.credentials.api_key = api_key.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `operation` without the `api-key` header
    pub fn without_api_key_for(mut self, operation: Operation) -> Self {
        self.omit_api_key.insert(operation);
        self
    }

    /// Whether `operation` carries the `api-key` header
    pub fn sends_api_key(&self, operation: Operation) -> bool {
        operation != Operation::Token && !self.omit_api_key.contains(&operation)
    }

    /// Full URL of a provider path
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = TokiPayConfig::new("https://api.toki.mn/", "user", "pass", "M1");
        assert_eq!(config.base_url, "https://api.toki.mn");
        assert_eq!(config.credentials.api_key, DEFAULT_API_KEY);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.url("/x"),
            "https://api.toki.mn/x"
        );
    }

    #[test]
    fn test_url_with_assigned_trailing_slash() {
        let mut config = TokiPayConfig::new("https://api.toki.mn", "u", "p", "M1");
        config.base_url = "https://api.toki.mn//".to_string();
        assert_eq!(config.url("/x"), "https://api.toki.mn/x");
    }

    #[test]
    fn test_api_key_policy() {
        let config = TokiPayConfig::new("https://api.toki.mn", "u", "p", "M1")
            .without_api_key_for(Operation::Refund);

        assert!(config.sends_api_key(Operation::QrPayment));
        assert!(!config.sends_api_key(Operation::Refund));
        assert!(!config.sends_api_key(Operation::Token));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_scheme = TokiPayConfig::new("ftp://api.toki.mn", "u", "p", "M1");
        assert!(bad_scheme.validate().is_err());

        let empty_merchant = TokiPayConfig::new("https://api.toki.mn", "u", "p", " ");
        let err = empty_merchant.validate().unwrap_err();
        assert!(err.to_string().contains("merchant id"));

        let zero_timeout = TokiPayConfig::new("https://api.toki.mn", "u", "p", "M1")
            .with_timeout(Duration::ZERO);
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = TokiPayConfig::from_lookup(lookup_from(&[
            ("TOKIPAY_USERNAME", "user"),
            ("TOKIPAY_PASSWORD", "secret"),
            ("TOKIPAY_MERCHANT_ID", "M-42"),
            ("TOKIPAY_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, Environment::Production.base_url());
        assert_eq!(config.credentials.merchant_id, "M-42");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_lookup_missing_and_invalid() {
        let missing = TokiPayConfig::from_lookup(lookup_from(&[("TOKIPAY_USERNAME", "user")]));
        assert!(missing
            .unwrap_err()
            .to_string()
            .contains("TOKIPAY_PASSWORD"));

        let bad_timeout = TokiPayConfig::from_lookup(lookup_from(&[
            ("TOKIPAY_USERNAME", "user"),
            ("TOKIPAY_PASSWORD", "secret"),
            ("TOKIPAY_MERCHANT_ID", "M-42"),
            ("TOKIPAY_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(bad_timeout, Err(TokiPayError::Config { .. })));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = TokiPayConfig::new("https://api.toki.mn", "user", "hunter2", "M1");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
