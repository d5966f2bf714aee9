//! Request dispatcher
//!
//! One generic path for every operation: obtain a token, assemble headers,
//! execute, map the result. No retries.

use std::sync::Arc;

use momo_domain::constants::{
    CONTENT_TYPE_JSON, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE, HEADER_REFERENCE_ID,
    HEADER_SUBSCRIPTION_KEY, HEADER_TARGET_ENVIRONMENT,
};
use momo_domain::types::new_reference_id;
use momo_domain::{
    ApiResponse, MomoConfig, MomoError, OperationCall, OperationSpec, Result, TargetEnvironment,
    TransportRequest,
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::operations;
use crate::credentials::CredentialManager;
use crate::ports::Transport;

/// Executes operations with credentials from a shared [`CredentialManager`]
///
/// Base URL and subscription key are those of the manager, so every call is
/// made for the subscription its tokens were issued to.
pub struct RequestDispatcher {
    credentials: Arc<CredentialManager>,
    transport: Arc<dyn Transport>,
    environment: TargetEnvironment,
}

impl RequestDispatcher {
    pub fn new(
        credentials: Arc<CredentialManager>,
        transport: Arc<dyn Transport>,
        environment: TargetEnvironment,
    ) -> Self {
        Self { credentials, transport, environment }
    }

    pub fn from_config(
        config: &MomoConfig,
        credentials: Arc<CredentialManager>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::new(credentials, transport, config.environment)
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Execute `operation` with the per-call inputs in `call`
    ///
    /// Mutating operations carry an `X-Reference-Id` (the caller's, or a fresh
    /// v4 UUID) which is echoed in the response for status polling.
    ///
    /// # Errors
    /// - `InvalidRequest` if a path placeholder has no value (no network call)
    /// - any credential error from obtaining the token (no operation call)
    /// - `RemoteRejected` with the raw body for a non-2xx response
    /// - `TransportFailure` if no response was received
    /// - `Decode` if a 2xx body is not JSON
    #[instrument(skip(self, call), fields(operation = operation.name))]
    pub async fn invoke(
        &self,
        operation: &OperationSpec,
        call: OperationCall,
    ) -> Result<ApiResponse> {
        let path = operation.render_path(&call.path_params)?;
        let token = self.credentials.ensure_token(operation.product).await?;

        let reference_id = operation
            .mutating
            .then(|| call.reference_id.clone().unwrap_or_else(new_reference_id));

        let url = format!("{}{path}", self.credentials.base_url());
        let mut request = TransportRequest::new(operation.method, url)
            .header(HEADER_CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header(HEADER_SUBSCRIPTION_KEY, self.credentials.subscription_key())
            .header(HEADER_TARGET_ENVIRONMENT, self.environment.to_string())
            .header(HEADER_AUTHORIZATION, format!("Bearer {}", token.value()))
            .query(call.query);
        if let Some(reference_id) = &reference_id {
            request = request.header(HEADER_REFERENCE_ID, reference_id.clone());
        }
        if let Some(body) = call.body {
            request = request.json(body);
        }

        debug!(method = %operation.method, path = %path, "Dispatching request");
        let response = self.transport.execute(request).await?;

        if !response.is_success() {
            let error =
                MomoError::RemoteRejected { status: response.status, body: response.body };
            warn!(status = ?error.status(), error = error.label(), "Operation rejected");
            return Err(error);
        }

        let body = if response.body.trim().is_empty() {
            None
        } else {
            let value: Value = serde_json::from_str(&response.body)
                .map_err(|e| MomoError::Decode(format!("{}: {e}", operation.name)))?;
            Some(value)
        };

        debug!(status = response.status, "Operation succeeded");
        Ok(ApiResponse { status: response.status, reference_id, body })
    }

    /// Execute an operation looked up by name
    ///
    /// # Errors
    /// `InvalidRequest` for an unknown name, otherwise as [`Self::invoke`].
    pub async fn invoke_named(&self, name: &str, call: OperationCall) -> Result<ApiResponse> {
        let operation = operations::find(name)
            .ok_or_else(|| MomoError::InvalidRequest(format!("unknown operation '{name}'")))?;
        self.invoke(operation, call).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use momo_domain::{ApiKey, HttpMethod, Party, Product, RequestToPay};

    use super::*;
    use crate::dispatch::operations::{
        ACCOUNT_HOLDER_ACTIVE, COLLECTION_BALANCE, REQUEST_TO_PAY, WIDGET_LIST,
    };
    use crate::testing::{MockClock, MockTransport};

    const USER: &str = "c72025f5-5cd1-4630-99e4-8ba4722fad56";
    const TOKEN_1H: &str = r#"{"access_token":"tok1","token_type":"access_token","expires_in":3600}"#;

    /// Dispatcher over a manager already holding a user/key pair
    fn dispatcher(transport: &MockTransport) -> RequestDispatcher {
        let clock = MockClock::at(Utc.with_ymd_and_hms(2024, 8, 5, 12, 0, 0).unwrap());
        let credentials = CredentialManager::builder(Arc::new(transport.clone()), "sub123")
            .base_url("http://momo.test/")
            .clock(Arc::new(clock))
            .api_user_id(USER)
            .api_key(ApiKey::new("abc"))
            .build()
            .unwrap();
        RequestDispatcher::new(
            Arc::new(credentials),
            Arc::new(transport.clone()),
            TargetEnvironment::Sandbox,
        )
    }

    fn payment() -> OperationCall {
        let payload = RequestToPay {
            amount: "1000".to_string(),
            currency: "EUR".to_string(),
            external_id: "123456789".to_string(),
            payer: Party::msisdn("46733123453"),
            payer_message: None,
            payee_note: None,
        };
        OperationCall::new().json_body(&payload).unwrap()
    }

    #[tokio::test]
    async fn mutating_calls_get_distinct_reference_ids() {
        let transport = MockTransport::new();
        transport.push_response(200, TOKEN_1H);
        transport.push_response(202, "");
        transport.push_response(202, "");
        let dispatcher = dispatcher(&transport);

        let first = dispatcher.invoke(&REQUEST_TO_PAY, payment()).await.unwrap();
        let second = dispatcher.invoke(&REQUEST_TO_PAY, payment()).await.unwrap();

        assert_eq!(first.status, 202);
        assert_eq!(first.body, None);
        let (first_id, second_id) = (first.reference_id.unwrap(), second.reference_id.unwrap());
        assert_ne!(first_id, second_id);

        let requests = transport.requests();
        assert_eq!(requests[1].header_value("X-Reference-Id"), Some(first_id.as_str()));
        assert_eq!(requests[2].header_value("X-Reference-Id"), Some(second_id.as_str()));
    }

    #[tokio::test]
    async fn read_only_calls_carry_no_reference_id() {
        let transport = MockTransport::new();
        transport.push_response(200, TOKEN_1H);
        transport.push_response(200, r#"{"availableBalance":"1000","currency":"EUR"}"#);
        let dispatcher = dispatcher(&transport);

        let response = dispatcher.invoke(&COLLECTION_BALANCE, OperationCall::new()).await.unwrap();

        assert_eq!(response.reference_id, None);
        assert_eq!(response.body.unwrap()["availableBalance"], "1000");
        let request = transport.last_request().unwrap();
        assert_eq!(request.header_value("X-Reference-Id"), None);
        assert_eq!(request.url, "http://momo.test/collection/v1_0/account/balance");
        assert_eq!(request.header_value("Authorization"), Some("Bearer tok1"));
        assert_eq!(request.header_value("X-Target-Environment"), Some("sandbox"));
        assert_eq!(request.header_value("Ocp-Apim-Subscription-Key"), Some("sub123"));
        assert_eq!(request.header_value("Content-Type"), Some("application/json"));
    }

    #[tokio::test]
    async fn operations_use_the_subscription_of_their_credentials() {
        let transport = MockTransport::new();
        transport.push_response(200, TOKEN_1H);
        transport.push_response(200, "{}");
        let credentials = CredentialManager::builder(Arc::new(transport.clone()), "sub-other")
            .base_url("http://other.test")
            .clock(Arc::new(MockClock::new()))
            .api_user_id(USER)
            .api_key(ApiKey::new("abc"))
            .build()
            .unwrap();
        let dispatcher = RequestDispatcher::new(
            Arc::new(credentials),
            Arc::new(transport.clone()),
            TargetEnvironment::Production,
        );

        dispatcher.invoke(&COLLECTION_BALANCE, OperationCall::new()).await.unwrap();

        for request in transport.requests() {
            assert!(request.url.starts_with("http://other.test/"), "{}", request.url);
            assert_eq!(request.header_value("Ocp-Apim-Subscription-Key"), Some("sub-other"));
        }
        let request = transport.last_request().unwrap();
        assert_eq!(request.header_value("X-Target-Environment"), Some("production"));
    }

    #[tokio::test]
    async fn explicit_reference_id_is_reused() {
        let transport = MockTransport::new();
        transport.push_response(200, TOKEN_1H);
        transport.push_response(202, "");
        let dispatcher = dispatcher(&transport);

        let call = payment().with_reference_id("3f2c7a0e-8c1b-4d5e-9f6a-1b2c3d4e5f60");
        let response = dispatcher.invoke(&REQUEST_TO_PAY, call).await.unwrap();

        assert_eq!(response.reference_id.as_deref(), Some("3f2c7a0e-8c1b-4d5e-9f6a-1b2c3d4e5f60"));
        assert_eq!(
            transport.last_request().unwrap().json_body.unwrap()["payer"]["partyId"],
            "46733123453"
        );
    }

    #[tokio::test]
    async fn remote_rejection_keeps_status_and_literal_body() {
        let transport = MockTransport::new();
        transport.push_response(200, TOKEN_1H);
        let body = r#"{"message":"...INVALID_CALLBACK_URL_HOST"}"#;
        transport.push_response(500, body);
        let dispatcher = dispatcher(&transport);

        let err = dispatcher.invoke(&REQUEST_TO_PAY, payment()).await.unwrap_err();

        assert_eq!(err, MomoError::RemoteRejected { status: 500, body: body.to_string() });
    }

    #[tokio::test]
    async fn missing_path_parameter_fails_before_network() {
        let transport = MockTransport::new();
        let dispatcher = dispatcher(&transport);

        let call = OperationCall::new().path_param("accountHolderIdType", "msisdn");
        let err = dispatcher.invoke(&ACCOUNT_HOLDER_ACTIVE, call).await.unwrap_err();

        assert!(matches!(err, MomoError::InvalidRequest(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn token_failure_short_circuits() {
        let transport = MockTransport::new();
        transport.push_response(500, r#"{"error":"login_failed"}"#);
        let dispatcher = dispatcher(&transport);

        let err = dispatcher.invoke(&COLLECTION_BALANCE, OperationCall::new()).await.unwrap_err();

        assert!(matches!(err, MomoError::CredentialMappingFailed { .. }));
        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.count_matching(HttpMethod::Get, "/account/balance"), 0);
    }

    #[tokio::test]
    async fn transport_failure_has_no_status() {
        let transport = MockTransport::new();
        transport.push_response(200, TOKEN_1H);
        transport.push_failure("connection reset");
        let dispatcher = dispatcher(&transport);

        let err = dispatcher.invoke(&COLLECTION_BALANCE, OperationCall::new()).await.unwrap_err();

        assert!(matches!(err, MomoError::TransportFailure(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn non_json_success_body_is_decode_error() {
        let transport = MockTransport::new();
        transport.push_response(200, TOKEN_1H);
        transport.push_response(200, "<html>ok</html>");
        let dispatcher = dispatcher(&transport);

        let err = dispatcher.invoke(&COLLECTION_BALANCE, OperationCall::new()).await.unwrap_err();
        assert!(matches!(err, MomoError::Decode(msg) if msg.contains("collection.account_balance")));
    }

    #[tokio::test]
    async fn named_invocation_passes_query_and_uses_product_token() {
        let transport = MockTransport::new();
        transport.push_response(200, TOKEN_1H);
        transport.push_response(200, r#"{"widgets":[]}"#);
        let dispatcher = dispatcher(&transport);

        let call = OperationCall::new().query_param("perPage", "20").query_param("page", "2");
        dispatcher.invoke_named(WIDGET_LIST.name, call).await.unwrap();

        let requests = transport.requests();
        assert!(requests[0].url.ends_with("/widget/token/"));
        assert_eq!(
            requests[1].query,
            vec![("perPage".to_string(), "20".to_string()), ("page".to_string(), "2".to_string())]
        );
        assert!(dispatcher.credentials().token_status(Product::Widget).await.is_valid());
    }

    #[tokio::test]
    async fn unknown_operation_is_invalid_request() {
        let transport = MockTransport::new();
        let dispatcher = dispatcher(&transport);

        let err = dispatcher.invoke_named("collection.refund", OperationCall::new()).await;
        assert!(matches!(err, Err(MomoError::InvalidRequest(_))));
        assert_eq!(transport.request_count(), 0);
    }
}
