//! Per-product bearer token cache
//!
//! In-memory only. Validity is evaluated at lookup time against the caller's
//! clock reading, optionally treating tokens as expiring `margin` early.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use momo_domain::{AccessToken, Product};
use tokio::sync::RwLock;

/// Time-bounded token store keyed by product
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: RwLock<HashMap<Product, AccessToken>>,
    margin: Duration,
}

impl TokenCache {
    /// Cache with no refresh margin (tokens valid until `expires_at`)
    #[must_use]
    pub fn new() -> Self {
        Self::with_margin(Duration::zero())
    }

    /// Cache that treats tokens as expired `margin` before their expiry
    #[must_use]
    pub fn with_margin(margin: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), margin: margin.max(Duration::zero()) }
    }

    #[must_use]
    pub fn margin(&self) -> Duration {
        self.margin
    }

    /// Token for `product` if one is cached and still valid at `now`
    pub async fn get(&self, product: Product, now: DateTime<Utc>) -> Option<AccessToken> {
        let entries = self.entries.read().await;
        entries.get(&product).filter(|token| token.is_valid_at(now, self.margin)).cloned()
    }

    /// Cached token for `product` regardless of validity
    pub async fn peek(&self, product: Product) -> Option<AccessToken> {
        self.entries.read().await.get(&product).cloned()
    }

    /// Store `token`, replacing any entry for its product
    pub async fn put(&self, token: AccessToken) {
        self.entries.write().await.insert(token.product(), token);
    }

    /// Drop the entry for `product`; returns whether one existed
    pub async fn invalidate(&self, product: Product) -> bool {
        self.entries.write().await.remove(&product).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
