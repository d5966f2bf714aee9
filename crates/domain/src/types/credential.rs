//! Provisioning credential types

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a fresh version-4 UUID string for an API user or reference id
#[must_use]
pub fn new_reference_id() -> String {
    Uuid::new_v4().to_string()
}

/// Secret issued by the provisioning endpoint for one API user
///
/// Immutable once issued. `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret for the basic-auth token exchange
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Body of `POST /v1_0/apiuser/{id}/apikey`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: ApiKey,
}

/// Details of a registered API user (`GET /v1_0/apiuser/{id}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUserInfo {
    #[serde(default)]
    pub provider_callback_host: Option<String>,
    #[serde(default)]
    pub target_environment: Option<String>,
}
