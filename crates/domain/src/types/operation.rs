//! Operation descriptors and call payloads
//!
//! Every endpoint is described by data rather than code: a product, a
//! method, a path template with `{placeholder}` segments and whether the
//! call mutates remote state (mutating calls carry a fresh reference id).

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::http::HttpMethod;
use super::product::Product;
use crate::errors::{MomoError, Result};

/// Static description of one logical API operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub product: Product,
    pub method: HttpMethod,
    pub path: &'static str,
    pub mutating: bool,
}

impl OperationSpec {
    /// Names of the `{placeholder}` segments in the path template
    #[must_use]
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else { break };
            names.push(&rest[start + 1..start + len]);
            rest = &rest[start + len + 1..];
        }
        names
    }

    /// Substitute path parameters into the template
    ///
    /// Values are percent-encoded as single path segments and substituted in
    /// one pass, so a value can never introduce a separator or placeholder.
    ///
    /// # Errors
    /// Returns `MomoError::InvalidRequest` if a placeholder has no value or a
    /// value is empty.
    pub fn render_path(&self, params: &BTreeMap<String, String>) -> Result<String> {
        let mut path = String::with_capacity(self.path.len());
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else { break };
            let name = &rest[start + 1..start + len];
            let value = params.get(name).filter(|v| !v.is_empty()).ok_or_else(|| {
                MomoError::InvalidRequest(format!(
                    "operation {} requires path parameter '{name}'",
                    self.name
                ))
            })?;
            path.push_str(&rest[..start]);
            path.push_str(&urlencoding::encode(value));
            rest = &rest[start + len + 1..];
        }
        path.push_str(rest);
        Ok(path)
    }
}

/// Per-call inputs for an operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationCall {
    pub path_params: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    /// Explicit reference id for a mutating call; a fresh one is generated
    /// when absent
    pub reference_id: Option<String>,
}

impl OperationCall {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize a typed payload as the JSON body
    ///
    /// # Errors
    /// Returns `MomoError::InvalidRequest` if the payload cannot be serialized.
    pub fn json_body<T: Serialize>(self, payload: &T) -> Result<Self> {
        let body = serde_json::to_value(payload)
            .map_err(|e| MomoError::InvalidRequest(format!("failed to serialize body: {e}")))?;
        Ok(self.body(body))
    }

    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_reference_id(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }
}

/// Successful response of a dispatched operation
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// `X-Reference-Id` sent with a mutating call; use it to poll status
    pub reference_id: Option<String>,
    /// Parsed JSON payload, `None` for bodyless 2xx responses
    pub body: Option<Value>,
}

impl ApiResponse {
    /// Deserialize the payload into a typed value
    ///
    /// # Errors
    /// Returns `MomoError::Decode` if the response had no body or the body
    /// does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body.clone().ok_or_else(|| {
            MomoError::Decode(format!("response with status {} has no body", self.status))
        })?;
        serde_json::from_value(body).map_err(|e| MomoError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const HOLDER: OperationSpec = OperationSpec {
        name: "collection.account_holder_active",
        product: Product::Collection,
        method: HttpMethod::Get,
        path: "/collection/v1_0/accountholder/{accountHolderIdType}/{accountHolderId}/active",
        mutating: false,
    };

    #[test]
    fn placeholders_in_order() {
        assert_eq!(HOLDER.placeholders(), vec!["accountHolderIdType", "accountHolderId"]);
    }

    #[test]
    fn render_substitutes_all_placeholders() {
        let call = OperationCall::new()
            .path_param("accountHolderIdType", "msisdn")
            .path_param("accountHolderId", "46733123453");

        let path = HOLDER.render_path(&call.path_params).unwrap();
        assert_eq!(path, "/collection/v1_0/accountholder/msisdn/46733123453/active");
    }

    #[test]
    fn render_encodes_values_as_single_segments() {
        let call = OperationCall::new()
            .path_param("accountHolderIdType", "{accountHolderId}")
            .path_param("accountHolderId", "a/b?c");

        let path = HOLDER.render_path(&call.path_params).unwrap();
        assert_eq!(path, "/collection/v1_0/accountholder/%7BaccountHolderId%7D/a%2Fb%3Fc/active");
    }

    #[test]
    fn render_rejects_missing_parameter() {
        let call = OperationCall::new().path_param("accountHolderIdType", "msisdn");

        let err = HOLDER.render_path(&call.path_params).unwrap_err();
        assert!(matches!(err, MomoError::InvalidRequest(msg) if msg.contains("accountHolderId")));
    }

    #[test]
    fn response_json_decodes_typed_payload() {
        #[derive(serde::Deserialize)]
        struct Balance {
            #[serde(rename = "availableBalance")]
            available_balance: String,
        }

        let response = ApiResponse {
            status: 200,
            reference_id: None,
            body: Some(json!({"availableBalance": "1000", "currency": "EUR"})),
        };
        let balance: Balance = response.json().unwrap();
        assert_eq!(balance.available_balance, "1000");
    }

    #[test]
    fn response_json_without_body_is_decode_error() {
        let response = ApiResponse { status: 202, reference_id: None, body: None };
        let result: Result<Value> = response.json();
        assert!(matches!(result, Err(MomoError::Decode(_))));
    }
}
