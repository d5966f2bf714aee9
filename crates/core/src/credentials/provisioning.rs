//! Provisioning and token-exchange calls
//!
//! Thin request builders plus the status mapping for the four remote
//! credential endpoints. Holds no state besides the subscription it acts for;
//! the manager decides when each call is made.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use momo_domain::constants::{
    API_USER_PATH, CONTENT_TYPE_JSON, HEADER_CONTENT_TYPE, HEADER_REFERENCE_ID,
    HEADER_SUBSCRIPTION_KEY, LOGIN_FAILED_ERROR,
};
use momo_domain::types::credential::ApiKeyResponse;
use momo_domain::{
    AccessToken, ApiKey, ApiUserInfo, HttpMethod, MomoError, Product, Result, TokenResponse,
    TransportRequest, TransportResponse,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::ports::Transport;

/// Result of a create-user call that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUserOutcome {
    Created,
    /// 409: the id is already registered remotely
    Conflict,
}

/// Client for `/v1_0/apiuser` and `/{product}/token/`
pub struct ProvisioningApi {
    transport: Arc<dyn Transport>,
    base_url: String,
    subscription_key: String,
}

impl ProvisioningApi {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        subscription_key: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { transport, base_url, subscription_key: subscription_key.into() }
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn subscription_key(&self) -> &str {
        &self.subscription_key
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: HttpMethod, path: &str) -> TransportRequest {
        TransportRequest::new(method, self.url(path))
            .header(HEADER_SUBSCRIPTION_KEY, self.subscription_key.clone())
    }

    /// `GET /v1_0/apiuser/{id}`: `Some(info)` on 200, `None` on 404
    ///
    /// # Errors
    /// 401 → `SubscriptionUnauthorized`, 400 → `InvalidIdentifier`, any other
    /// non-2xx → `RemoteRejected`; a 2xx body that is not an API user →
    /// `Decode`.
    pub async fn get_api_user(&self, api_user_id: &str) -> Result<Option<ApiUserInfo>> {
        let path = format!("{API_USER_PATH}/{api_user_id}");
        let response = self.transport.execute(self.request(HttpMethod::Get, &path)).await?;

        if response.is_success() {
            let info = if response.body.trim().is_empty() {
                ApiUserInfo::default()
            } else {
                serde_json::from_str(&response.body)
                    .map_err(|e| MomoError::Decode(format!("invalid API user payload: {e}")))?
            };
            debug!(api_user_id, "API user exists");
            return Ok(Some(info));
        }

        match response.status {
            404 => {
                debug!(api_user_id, "API user not found");
                Ok(None)
            }
            _ => Err(map_provisioning_status(response)),
        }
    }

    /// `POST /v1_0/apiuser` with `X-Reference-Id = api_user_id`
    ///
    /// # Errors
    /// 401 → `SubscriptionUnauthorized`, 400 → `InvalidIdentifier`, any other
    /// non-2xx besides 409 → `RemoteRejected`.
    pub async fn create_api_user(
        &self,
        api_user_id: &str,
        callback_host: &str,
    ) -> Result<CreateUserOutcome> {
        let request = self
            .request(HttpMethod::Post, API_USER_PATH)
            .header(HEADER_REFERENCE_ID, api_user_id)
            .header(HEADER_CONTENT_TYPE, CONTENT_TYPE_JSON)
            .json(json!({ "providerCallbackHost": callback_host }));
        let response = self.transport.execute(request).await?;

        if response.is_success() {
            return Ok(CreateUserOutcome::Created);
        }
        if response.status == 409 {
            warn!(api_user_id, "API user id already registered");
            return Ok(CreateUserOutcome::Conflict);
        }
        Err(map_provisioning_status(response))
    }

    /// `POST /v1_0/apiuser/{id}/apikey`
    ///
    /// # Errors
    /// 404 → `PrerequisiteMissing` (user not registered), 401 →
    /// `SubscriptionUnauthorized`, 400 → `InvalidIdentifier`, other non-2xx →
    /// `RemoteRejected`, malformed body → `Decode`.
    pub async fn create_api_key(&self, api_user_id: &str) -> Result<ApiKey> {
        let path = format!("{API_USER_PATH}/{api_user_id}/apikey");
        let response = self.transport.execute(self.request(HttpMethod::Post, &path)).await?;

        if response.is_success() {
            let parsed: ApiKeyResponse = serde_json::from_str(&response.body)
                .map_err(|e| MomoError::Decode(format!("invalid API key payload: {e}")))?;
            return Ok(parsed.api_key);
        }
        if response.status == 404 {
            return Err(MomoError::PrerequisiteMissing(format!(
                "API user {api_user_id} is not registered; create the API user first ({})",
                response.body
            )));
        }
        Err(map_provisioning_status(response))
    }

    /// `POST /{product}/token/` with HTTP Basic (`api_user_id`, `api_key`)
    ///
    /// The expiry is computed from `expires_in` relative to `issued_at`.
    ///
    /// # Errors
    /// A body with `error == "login_failed"` or a 500 →
    /// `CredentialMappingFailed`; 401 → `SubscriptionUnauthorized`; other
    /// non-2xx → `RemoteRejected`; malformed body → `Decode`.
    pub async fn request_token(
        &self,
        product: Product,
        api_user_id: &str,
        api_key: &ApiKey,
        issued_at: DateTime<Utc>,
    ) -> Result<AccessToken> {
        let request = self
            .request(HttpMethod::Post, &product.token_path())
            .basic_auth(api_user_id, api_key.expose());
        let response = self.transport.execute(request).await?;

        if response.is_success() {
            let parsed: TokenResponse = serde_json::from_str(&response.body)
                .map_err(|e| MomoError::Decode(format!("invalid token payload: {e}")))?;
            return parsed.into_token(product, issued_at);
        }

        if response.status == 500 || is_login_failed(&response.body) {
            return Err(MomoError::CredentialMappingFailed {
                status: response.status,
                body: response.body,
            });
        }
        match response.status {
            401 => Err(MomoError::SubscriptionUnauthorized { body: response.body }),
            status => Err(MomoError::RemoteRejected { status, body: response.body }),
        }
    }
}

fn map_provisioning_status(response: TransportResponse) -> MomoError {
    match response.status {
        401 => MomoError::SubscriptionUnauthorized { body: response.body },
        400 => MomoError::InvalidIdentifier { body: response.body },
        status => MomoError::RemoteRejected { status, body: response.body },
    }
}

fn is_login_failed(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .is_ok_and(|value| value.get("error").and_then(Value::as_str) == Some(LOGIN_FAILED_ERROR))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::testing::MockTransport;

    const USER: &str = "c72025f5-5cd1-4630-99e4-8ba4722fad56";

    fn api(transport: &MockTransport) -> ProvisioningApi {
        ProvisioningApi::new(Arc::new(transport.clone()), "http://momo.test/", "sub123")
    }

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 5, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn create_user_sends_reference_id_and_callback_host() {
        let transport = MockTransport::new();
        transport.push_response(201, "");

        let outcome = api(&transport).create_api_user(USER, "webhook.site").await.unwrap();

        assert_eq!(outcome, CreateUserOutcome::Created);
        let request = transport.last_request().unwrap();
        assert_eq!(request.url, "http://momo.test/v1_0/apiuser");
        assert_eq!(request.header_value("X-Reference-Id"), Some(USER));
        assert_eq!(request.header_value("Ocp-Apim-Subscription-Key"), Some("sub123"));
        assert_eq!(request.json_body, Some(json!({"providerCallbackHost": "webhook.site"})));
    }

    #[tokio::test]
    async fn create_user_maps_conflict_and_rejections() {
        let transport = MockTransport::new();
        transport.push_response(409, r#"{"code":"RESOURCE_ALREADY_EXIST"}"#);
        transport.push_response(401, "Access denied");
        transport.push_response(400, "bad reference id");

        let api = api(&transport);
        assert_eq!(
            api.create_api_user(USER, "webhook.site").await.unwrap(),
            CreateUserOutcome::Conflict
        );
        assert!(matches!(
            api.create_api_user(USER, "webhook.site").await,
            Err(MomoError::SubscriptionUnauthorized { body }) if body == "Access denied"
        ));
        assert!(matches!(
            api.create_api_user("not-a-uuid", "webhook.site").await,
            Err(MomoError::InvalidIdentifier { .. })
        ));
    }

    #[tokio::test]
    async fn get_user_distinguishes_absent_from_failure() {
        let transport = MockTransport::new();
        transport.push_response(200, r#"{"providerCallbackHost":"webhook.site","targetEnvironment":"sandbox"}"#);
        transport.push_response(404, "");
        transport.push_response(503, "maintenance");

        let api = api(&transport);
        let info = api.get_api_user(USER).await.unwrap().unwrap();
        assert_eq!(info.target_environment.as_deref(), Some("sandbox"));
        assert_eq!(api.get_api_user(USER).await.unwrap(), None);
        assert!(matches!(
            api.get_api_user(USER).await,
            Err(MomoError::RemoteRejected { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn create_key_parses_key_and_maps_missing_user() {
        let transport = MockTransport::new();
        transport.push_response(201, r#"{"apiKey":"abc"}"#);
        transport.push_response(404, r#"{"code":"RESOURCE_NOT_FOUND"}"#);

        let api = api(&transport);
        assert_eq!(api.create_api_key(USER).await.unwrap().expose(), "abc");
        assert_eq!(
            transport.last_request().unwrap().url,
            format!("http://momo.test/v1_0/apiuser/{USER}/apikey")
        );
        assert!(matches!(
            api.create_api_key(USER).await,
            Err(MomoError::PrerequisiteMissing(msg)) if msg.contains(USER)
        ));
    }

    #[tokio::test]
    async fn token_request_uses_basic_auth_and_computes_expiry() {
        let transport = MockTransport::new();
        transport.push_response(
            200,
            r#"{"access_token":"tok1","token_type":"access_token","expires_in":3600}"#,
        );

        let token = api(&transport)
            .request_token(Product::Collection, USER, &ApiKey::new("abc"), issued())
            .await
            .unwrap();

        assert_eq!(token.value(), "tok1");
        assert_eq!(token.expires_at(), issued() + Duration::seconds(3600));
        let request = transport.last_request().unwrap();
        assert_eq!(request.url, "http://momo.test/collection/token/");
        assert_eq!(request.basic_auth, Some((USER.to_string(), "abc".to_string())));
    }

    #[tokio::test]
    async fn token_request_maps_login_failed() {
        let transport = MockTransport::new();
        transport.push_response(500, r#"{"error":"login_failed"}"#);
        transport.push_response(401, r#"{"error":"login_failed"}"#);
        transport.push_response(401, r#"{"statusCode":401,"message":"Access denied"}"#);
        transport.push_response(403, "forbidden");

        let api = api(&transport);
        let key = ApiKey::new("abc");
        assert!(matches!(
            api.request_token(Product::Collection, USER, &key, issued()).await,
            Err(MomoError::CredentialMappingFailed { status: 500, .. })
        ));
        assert!(matches!(
            api.request_token(Product::Collection, USER, &key, issued()).await,
            Err(MomoError::CredentialMappingFailed { status: 401, .. })
        ));
        assert!(matches!(
            api.request_token(Product::Collection, USER, &key, issued()).await,
            Err(MomoError::SubscriptionUnauthorized { .. })
        ));
        assert!(matches!(
            api.request_token(Product::Collection, USER, &key, issued()).await,
            Err(MomoError::RemoteRejected { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn token_request_rejects_malformed_body() {
        let transport = MockTransport::new();
        transport.push_response(200, "<html>gateway</html>");

        let result = api(&transport)
            .request_token(Product::Widget, USER, &ApiKey::new("abc"), issued())
            .await;
        assert!(matches!(result, Err(MomoError::Decode(_))));
    }

    #[tokio::test]
    async fn token_request_rejects_unrepresentable_expiry() {
        let transport = MockTransport::new();
        transport.push_response(200, r#"{"access_token":"t","expires_in":10000000000000}"#);

        let result = api(&transport)
            .request_token(Product::Collection, USER, &ApiKey::new("abc"), issued())
            .await;
        assert!(matches!(result, Err(MomoError::Decode(msg)) if msg.contains("expires_in")));
    }
}
