//! Bearer token types
//!
//! A token is scoped to one product and carries an absolute expiry computed
//! from the token endpoint's `expires_in` at issue time.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::product::Product;
use crate::errors::{MomoError, Result};

/// Bearer credential for one product
///
/// Valid strictly before `expires_at`. The value is redacted from `Debug`
/// output so tokens never leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    product: Product,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Create a token issued at `issued_at` that lives for `expires_in_secs`
    ///
    /// A negative lifetime yields an already expired token.
    ///
    /// # Errors
    /// Returns `MomoError::Decode` if the expiry is not a representable
    /// timestamp.
    pub fn new(
        value: String,
        product: Product,
        issued_at: DateTime<Utc>,
        expires_in_secs: i64,
    ) -> Result<Self> {
        let expires_at = Duration::try_seconds(expires_in_secs.max(0))
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                MomoError::Decode(format!("expires_in of {expires_in_secs}s is out of range"))
            })?;
        Ok(Self { value, product, issued_at, expires_at })
    }

    /// Bearer string sent in the `Authorization` header
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn product(&self) -> Product {
        self.product
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check validity at `now`, treating the token as expiring `margin` early
    ///
    /// With a zero margin this is exactly `now < expires_at`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now.checked_add_signed(margin).is_some_and(|deadline| deadline < self.expires_at)
    }

    /// Remaining lifetime at `now`, or `None` once expired
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.expires_at - now;
        (remaining > Duration::zero()).then_some(remaining)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("product", &self.product)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response body
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: i64,
}

impl TokenResponse {
    /// Convert into a cached token issued at `issued_at`
    ///
    /// # Errors
    /// Returns `MomoError::Decode` for an `expires_in` too large to represent.
    pub fn into_token(self, product: Product, issued_at: DateTime<Utc>) -> Result<AccessToken> {
        AccessToken::new(self.access_token, product, issued_at, self.expires_in)
    }
}

/// Snapshot of the cached token for one product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TokenStatus {
    /// No token has been issued yet
    Missing,
    Valid { expires_at: DateTime<Utc>, remaining_secs: i64 },
    Expired { expired_at: DateTime<Utc> },
}

impl TokenStatus {
    /// Classify `token` at `now` using the same rule as the cache
    #[must_use]
    pub fn of(token: Option<&AccessToken>, now: DateTime<Utc>, margin: Duration) -> Self {
        match token {
            None => Self::Missing,
            Some(token) if token.is_valid_at(now, margin) => Self::Valid {
                expires_at: token.expires_at(),
                remaining_secs: token.remaining_at(now).map_or(0, |d| d.num_seconds()),
            },
            Some(token) => Self::Expired { expired_at: token.expires_at() },
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("no token issued"),
            Self::Valid { expires_at, remaining_secs } => {
                write!(f, "valid, expires at {expires_at} ({remaining_secs}s remaining)")
            }
            Self::Expired { expired_at } => write!(f, "expired at {expired_at}"),
        }
    }
}
