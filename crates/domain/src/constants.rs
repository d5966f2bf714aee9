//! Protocol constants
//!
//! Header names, default endpoints and provisioning paths shared by the core
//! and the infrastructure adapters.

// Defaults
pub const DEFAULT_BASE_URL: &str = "https://sandbox.momodeveloper.mtn.com";
pub const DEFAULT_CALLBACK_HOST: &str = "webhook.site";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOKEN_REFRESH_MARGIN_SECS: i64 = 0;
pub const MAX_TOKEN_REFRESH_MARGIN_SECS: i64 = 86_400;

// Header names
pub const HEADER_SUBSCRIPTION_KEY: &str = "Ocp-Apim-Subscription-Key";
pub const HEADER_TARGET_ENVIRONMENT: &str = "X-Target-Environment";
pub const HEADER_REFERENCE_ID: &str = "X-Reference-Id";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json";

// Provisioning resources
pub const API_USER_PATH: &str = "/v1_0/apiuser";

// Token endpoint error code for unmapped user/key pairs
pub const LOGIN_FAILED_ERROR: &str = "login_failed";
