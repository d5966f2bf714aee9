//! Client configuration
//!
//! Read once at construction by the infrastructure loader. Only
//! `subscription_key` is required; everything else has a default.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_CALLBACK_HOST, DEFAULT_TIMEOUT_SECS,
    DEFAULT_TOKEN_REFRESH_MARGIN_SECS, MAX_TOKEN_REFRESH_MARGIN_SECS,
};
use crate::errors::{MomoError, Result};
use crate::types::{ApiKey, TargetEnvironment};

/// Settings for one subscription
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomoConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub environment: TargetEnvironment,
    pub subscription_key: String,
    /// Pre-provisioned API user; treated as caller-supplied
    #[serde(default)]
    pub api_user_id: Option<String>,
    /// Pre-issued API key for `api_user_id`
    #[serde(default, skip_serializing)]
    pub api_key: Option<ApiKey>,
    #[serde(default = "default_callback_host")]
    pub callback_host: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_token_refresh_margin_secs")]
    pub token_refresh_margin_secs: i64,
    /// Ignore `HTTP_PROXY`/`HTTPS_PROXY` and connect directly
    #[serde(default)]
    pub no_proxy: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_callback_host() -> String {
    DEFAULT_CALLBACK_HOST.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_token_refresh_margin_secs() -> i64 {
    DEFAULT_TOKEN_REFRESH_MARGIN_SECS
}

impl MomoConfig {
    /// Sandbox configuration with defaults for everything but the key
    #[must_use]
    pub fn new(subscription_key: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            environment: TargetEnvironment::default(),
            subscription_key: subscription_key.into(),
            api_user_id: None,
            api_key: None,
            callback_host: default_callback_host(),
            timeout_secs: default_timeout_secs(),
            token_refresh_margin_secs: default_token_refresh_margin_secs(),
            no_proxy: false,
        }
    }

    /// Check values that serde cannot reject on its own
    ///
    /// # Errors
    /// Returns `MomoError::Config` for an empty subscription key or base URL,
    /// a zero timeout, a refresh margin outside `0..=86400` seconds, or an API
    /// key configured without an API user id.
    pub fn validate(&self) -> Result<()> {
        if self.subscription_key.trim().is_empty() {
            return Err(MomoError::Config("subscription_key must not be empty".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(MomoError::Config("base_url must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(MomoError::Config("timeout_secs must be greater than zero".to_string()));
        }
        if !(0..=MAX_TOKEN_REFRESH_MARGIN_SECS).contains(&self.token_refresh_margin_secs) {
            return Err(MomoError::Config(format!(
                "token_refresh_margin_secs must be between 0 and {MAX_TOKEN_REFRESH_MARGIN_SECS}"
            )));
        }
        if self.api_key.is_some() && self.api_user_id.is_none() {
            return Err(MomoError::Config(
                "api_key is configured without an api_user_id".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    #[must_use]
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl fmt::Debug for MomoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MomoConfig")
            .field("base_url", &self.base_url)
            .field("environment", &self.environment)
            .field("subscription_key", &"<redacted>")
            .field("api_user_id", &self.api_user_id)
            .field("api_key", &self.api_key)
            .field("callback_host", &self.callback_host)
            .field("timeout_secs", &self.timeout_secs)
            .field("token_refresh_margin_secs", &self.token_refresh_margin_secs)
            .field("no_proxy", &self.no_proxy)
            .finish()
    }
}
