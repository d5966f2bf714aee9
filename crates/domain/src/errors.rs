//! Error types used throughout the client

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for MoMo operations
///
/// Every variant names the prerequisite or remote condition that failed so
/// callers can branch on the kind instead of parsing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum MomoError {
    /// The caller asked for a specific API user id that the remote side
    /// already holds and that could not be claimed.
    #[error("API user {api_user_id} already exists and cannot be created again")]
    UserAlreadyExists { api_user_id: String },

    #[error(
        "Subscription key rejected (401): {body}. Ensure the subscription key is the primary key"
    )]
    SubscriptionUnauthorized { body: String },

    #[error(
        "Invalid identifier or request body (400): {body}. Ensure the API user (X-Reference-Id) is a version 4 UUID"
    )]
    InvalidIdentifier { body: String },

    #[error("Prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error(
        "Token exchange failed ({status}): {body}. Ensure the API user and API key are mapped correctly"
    )]
    CredentialMappingFailed { status: u16, body: String },

    #[error("Remote API rejected the request with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MomoError {
    /// HTTP status code carried by the error, if a response was received
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SubscriptionUnauthorized { .. } => Some(401),
            Self::InvalidIdentifier { .. } => Some(400),
            Self::UserAlreadyExists { .. } => Some(409),
            Self::CredentialMappingFailed { status, .. } | Self::RemoteRejected { status, .. } => {
                Some(*status)
            }
            Self::PrerequisiteMissing(_)
            | Self::TransportFailure(_)
            | Self::InvalidRequest(_)
            | Self::Decode(_)
            | Self::Config(_) => None,
        }
    }

    /// Stable label suitable for structured logging
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::UserAlreadyExists { .. } => "user_already_exists",
            Self::SubscriptionUnauthorized { .. } => "subscription_unauthorized",
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::PrerequisiteMissing(_) => "prerequisite_missing",
            Self::CredentialMappingFailed { .. } => "credential_mapping_failed",
            Self::RemoteRejected { .. } => "remote_rejected",
            Self::TransportFailure(_) => "transport_failure",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Decode(_) => "decode",
            Self::Config(_) => "config",
        }
    }
}

/// Result type alias for MoMo operations
pub type Result<T> = std::result::Result<T, MomoError>;
