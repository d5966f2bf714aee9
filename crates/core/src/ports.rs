//! Port interfaces for the HTTP boundary
//!
//! The core never opens a connection itself. Adapters implement
//! [`Transport`] with a real client; tests use a scripted one.

use async_trait::async_trait;
use momo_domain::{Result, TransportRequest, TransportResponse};

/// Executes one assembled HTTP request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return its status and raw body
    ///
    /// Any HTTP status, including 4xx/5xx, is a successful return. Only a
    /// failure to obtain a response (connect, TLS, timeout) is an error and
    /// must be reported as `MomoError::TransportFailure`.
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse>;
}
