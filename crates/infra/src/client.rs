//! Client facade
//!
//! Wires the reqwest transport, the system clock, the credential manager and
//! the dispatcher from one [`MomoConfig`], and adds typed helpers over the
//! operation table.

use std::sync::Arc;

use momo_core::dispatch::operations;
use momo_core::{Clock, CredentialManager, RequestDispatcher, SystemClock, Transport};
use momo_domain::{
    AccessToken, ApiResponse, MomoConfig, MomoError, OperationCall, OperationSpec, Product,
    RequestToPay, Result, Transfer, WidgetCreate, WidgetListQuery, WidgetUpdate,
};
use serde_json::Value;

use crate::config;
use crate::http::HttpTransport;

/// Entry point for applications
pub struct MomoClient {
    config: MomoConfig,
    credentials: Arc<CredentialManager>,
    dispatcher: RequestDispatcher,
}

impl MomoClient {
    /// Client over HTTP with the system clock
    ///
    /// # Errors
    /// Returns `MomoError::Config` if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(config: MomoConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(&config)?;
        Self::with_transport(config, Arc::new(transport), Arc::new(SystemClock))
    }

    /// Client configured by [`config::load`]
    ///
    /// # Errors
    /// Returns `MomoError::Config` if no valid configuration is found.
    pub fn from_env() -> Result<Self> {
        Self::from_config(config::load()?)
    }

    /// Client over an arbitrary transport and clock
    ///
    /// # Errors
    /// Returns `MomoError::Config` if the configuration is invalid.
    pub fn with_transport(
        config: MomoConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let credentials =
            Arc::new(CredentialManager::from_config(&config, Arc::clone(&transport), clock)?);
        let dispatcher = RequestDispatcher::from_config(&config, Arc::clone(&credentials), transport);
        Ok(Self { config, credentials, dispatcher })
    }

    #[must_use]
    pub fn config(&self) -> &MomoConfig {
        &self.config
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    #[must_use]
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// Valid bearer token for `product`, provisioning as needed
    ///
    /// # Errors
    /// See [`CredentialManager::ensure_token`].
    pub async fn token(&self, product: Product) -> Result<AccessToken> {
        self.credentials.ensure_token(product).await
    }

    /// Invoke an operation by name
    ///
    /// # Errors
    /// See [`RequestDispatcher::invoke_named`].
    pub async fn invoke(&self, name: &str, call: OperationCall) -> Result<ApiResponse> {
        self.dispatcher.invoke_named(name, call).await
    }

    /// Request a payment from a consumer; returns the reference id to poll
    ///
    /// # Errors
    /// See [`RequestDispatcher::invoke`].
    pub async fn request_to_pay(&self, payment: &RequestToPay) -> Result<String> {
        let call = OperationCall::new().json_body(payment)?;
        let response = self.dispatcher.invoke(&operations::REQUEST_TO_PAY, call).await?;
        reference_id(response)
    }

    /// # Errors
    /// See [`RequestDispatcher::invoke`].
    pub async fn request_to_pay_status(&self, reference_id: &str) -> Result<Value> {
        self.get_by_reference(&operations::REQUEST_TO_PAY_STATUS, reference_id).await
    }

    /// # Errors
    /// See [`RequestDispatcher::invoke`].
    pub async fn payment_status(&self, reference_id: &str) -> Result<Value> {
        self.get_by_reference(&operations::PAYMENT_STATUS, reference_id).await
    }

    /// Balance of the account behind `product`
    ///
    /// # Errors
    /// `InvalidRequest` for the widget product, which has no account.
    pub async fn account_balance(&self, product: Product) -> Result<Value> {
        let operation = match product {
            Product::Collection => &operations::COLLECTION_BALANCE,
            Product::Disbursement => &operations::DISBURSEMENT_BALANCE,
            Product::Remittance => &operations::REMITTANCE_BALANCE,
            Product::Widget => {
                return Err(MomoError::InvalidRequest(
                    "the widget product has no account balance".to_string(),
                ))
            }
        };
        Ok(body_or_null(self.dispatcher.invoke(operation, OperationCall::new()).await?))
    }

    /// Whether an account holder is active (`id_type` e.g. `msisdn`)
    ///
    /// # Errors
    /// See [`RequestDispatcher::invoke`].
    pub async fn account_holder_active(&self, id_type: &str, id: &str) -> Result<Value> {
        let call = OperationCall::new()
            .path_param("accountHolderIdType", id_type)
            .path_param("accountHolderId", id);
        Ok(body_or_null(self.dispatcher.invoke(&operations::ACCOUNT_HOLDER_ACTIVE, call).await?))
    }

    /// Send money from a disbursement or remittance account
    ///
    /// # Errors
    /// `InvalidRequest` for products without transfers.
    pub async fn transfer(&self, product: Product, transfer: &Transfer) -> Result<String> {
        let operation = match product {
            Product::Disbursement => &operations::DISBURSEMENT_TRANSFER,
            Product::Remittance => &operations::REMITTANCE_TRANSFER,
            other => {
                return Err(MomoError::InvalidRequest(format!(
                    "the {other} product does not support transfers"
                )))
            }
        };
        let call = OperationCall::new().json_body(transfer)?;
        reference_id(self.dispatcher.invoke(operation, call).await?)
    }

    /// # Errors
    /// `InvalidRequest` for products without transfers.
    pub async fn transfer_status(&self, product: Product, reference_id: &str) -> Result<Value> {
        let operation = match product {
            Product::Disbursement => &operations::DISBURSEMENT_TRANSFER_STATUS,
            Product::Remittance => &operations::REMITTANCE_TRANSFER_STATUS,
            other => {
                return Err(MomoError::InvalidRequest(format!(
                    "the {other} product does not support transfers"
                )))
            }
        };
        self.get_by_reference(operation, reference_id).await
    }

    /// # Errors
    /// See [`RequestDispatcher::invoke`].
    pub async fn create_widget(&self, widget: &WidgetCreate) -> Result<ApiResponse> {
        let call = OperationCall::new().json_body(widget)?;
        self.dispatcher.invoke(&operations::WIDGET_CREATE, call).await
    }

    /// # Errors
    /// See [`RequestDispatcher::invoke`].
    pub async fn get_widget(&self, widget_id: &str) -> Result<Value> {
        let call = OperationCall::new().path_param("widgetId", widget_id);
        Ok(body_or_null(self.dispatcher.invoke(&operations::WIDGET_GET, call).await?))
    }

    /// # Errors
    /// See [`RequestDispatcher::invoke`].
    pub async fn list_widgets(&self, query: WidgetListQuery) -> Result<Value> {
        let mut call = OperationCall::new();
        call.query = query.to_pairs();
        Ok(body_or_null(self.dispatcher.invoke(&operations::WIDGET_LIST, call).await?))
    }

    /// # Errors
    /// See [`RequestDispatcher::invoke`].
    pub async fn update_widget(&self, widget_id: &str, update: &WidgetUpdate) -> Result<ApiResponse> {
        let call = OperationCall::new().path_param("widgetId", widget_id).json_body(update)?;
        self.dispatcher.invoke(&operations::WIDGET_UPDATE, call).await
    }

    async fn get_by_reference(&self, operation: &OperationSpec, reference_id: &str) -> Result<Value> {
        let call = OperationCall::new().path_param("referenceId", reference_id);
        Ok(body_or_null(self.dispatcher.invoke(operation, call).await?))
    }
}

fn reference_id(response: ApiResponse) -> Result<String> {
    response.reference_id.ok_or_else(|| {
        MomoError::InvalidRequest("mutating operation returned without a reference id".to_string())
    })
}

fn body_or_null(response: ApiResponse) -> Value {
    response.body.unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use momo_core::testing::{MockClock, MockTransport};
    use momo_domain::{ApiKey, Party};

    use super::*;

    const TOKEN_1H: &str = r#"{"access_token":"tok1","token_type":"access_token","expires_in":3600}"#;

    fn client(transport: &MockTransport) -> MomoClient {
        let mut config = MomoConfig::new("sub123");
        config.base_url = "http://momo.test".to_string();
        config.api_user_id = Some("c72025f5-5cd1-4630-99e4-8ba4722fad56".to_string());
        config.api_key = Some(ApiKey::new("abc"));
        MomoClient::with_transport(config, Arc::new(transport.clone()), Arc::new(MockClock::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn widget_has_no_balance() {
        let transport = MockTransport::new();
        let err = client(&transport).account_balance(Product::Widget).await.unwrap_err();

        assert!(matches!(err, MomoError::InvalidRequest(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn collection_cannot_transfer() {
        let transport = MockTransport::new();
        let transfer = Transfer {
            amount: "5".to_string(),
            currency: "EUR".to_string(),
            external_id: "1".to_string(),
            payee: Party::msisdn("46733123454"),
            payer_message: None,
            payee_note: None,
        };

        let err = client(&transport).transfer(Product::Collection, &transfer).await.unwrap_err();
        assert!(matches!(err, MomoError::InvalidRequest(msg) if msg.contains("collection")));
    }

    #[tokio::test]
    async fn list_widgets_forwards_pagination() {
        let transport = MockTransport::new();
        transport.push_response(200, TOKEN_1H);
        transport.push_response(200, "[]");

        let query = WidgetListQuery { per_page: Some(10), page: Some(3) };
        let body = client(&transport).list_widgets(query).await.unwrap();

        assert_eq!(body, Value::Array(vec![]));
        let request = transport.last_request().unwrap();
        assert_eq!(request.url, "http://momo.test/widget/v1_0/widgets");
        assert_eq!(request.query, query.to_pairs());
    }
}
