//! Credential manager
//!
//! Owns the provisioning identity (API user id and API key) for one
//! subscription key and the per-product bearer tokens derived from it:
//! - Confirms or creates the API user (at most one retry on a generated-id
//!   conflict)
//! - Issues the API key once and never rotates it implicitly
//! - Exchanges the pair for bearer tokens and caches them until expiry
//! - Single-flights token exchanges per product

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use momo_domain::constants::{DEFAULT_BASE_URL, DEFAULT_CALLBACK_HOST};
use momo_domain::types::new_reference_id;
use momo_domain::{
    AccessToken, ApiKey, ApiUserInfo, MomoConfig, MomoError, Product, Result, TokenStatus,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::cache::TokenCache;
use super::provisioning::{CreateUserOutcome, ProvisioningApi};
use crate::clock::{Clock, SystemClock};
use crate::ports::Transport;

/// Provisioning identity held by the manager
#[derive(Debug, Default)]
struct Identity {
    api_user_id: Option<String>,
    /// The id exists remotely (checked, created, or configured with a key)
    confirmed: bool,
    api_key: Option<ApiKey>,
    /// Bumped whenever the identity is replaced, so a token exchange that
    /// started under the old identity does not populate the cache
    generation: u64,
}

impl Identity {
    fn held_pair(&self) -> Option<(String, ApiKey)> {
        match (&self.api_user_id, &self.api_key) {
            (Some(id), Some(key)) => Some((id.clone(), key.clone())),
            _ => None,
        }
    }
}

/// Credential lifecycle and token cache for one subscription key
///
/// Share across tasks with `Arc<CredentialManager>`; all methods take
/// `&self`.
pub struct CredentialManager {
    api: ProvisioningApi,
    clock: Arc<dyn Clock>,
    callback_host: String,
    identity: Mutex<Identity>,
    cache: TokenCache,
    flights: Mutex<HashMap<Product, Arc<Mutex<()>>>>,
}

impl CredentialManager {
    /// Start building a manager for `subscription_key`
    pub fn builder(
        transport: Arc<dyn Transport>,
        subscription_key: impl Into<String>,
    ) -> CredentialManagerBuilder {
        CredentialManagerBuilder::new(transport, subscription_key)
    }

    /// Build a manager from loaded configuration
    ///
    /// # Errors
    /// Returns `MomoError::Config` if the configuration is invalid.
    pub fn from_config(
        config: &MomoConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let margin = Duration::try_seconds(config.token_refresh_margin_secs).ok_or_else(|| {
            MomoError::Config("token_refresh_margin_secs is out of range".to_string())
        })?;
        let mut builder = Self::builder(transport, config.subscription_key.clone())
            .base_url(config.base_url.clone())
            .callback_host(config.callback_host.clone())
            .refresh_margin(margin)
            .clock(clock);
        if let Some(id) = &config.api_user_id {
            builder = builder.api_user_id(id.clone());
        }
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key.clone());
        }
        builder.build()
    }

    /// Make sure an API user exists and return its id
    ///
    /// Without `preferred_id` a cached confirmed user is returned as is. A
    /// `preferred_id` that differs from the held id replaces the identity
    /// (dropping the key and all tokens) before it is checked.
    ///
    /// # Errors
    /// - `UserAlreadyExists` if a supplied id conflicts on creation, or a
    ///   generated id conflicts twice
    /// - `SubscriptionUnauthorized` / `InvalidIdentifier` / `RemoteRejected`
    ///   for rejected provisioning calls
    /// - `TransportFailure` if no response was received
    #[instrument(skip(self))]
    pub async fn ensure_api_user(&self, preferred_id: Option<&str>) -> Result<String> {
        let mut identity = self.identity.lock().await;
        if let Some(preferred) = preferred_id {
            if identity.api_user_id.as_deref() != Some(preferred) {
                self.reset_identity(&mut identity, preferred.to_string()).await;
            }
        }
        self.ensure_api_user_locked(&mut identity).await
    }

    /// Return the API key for the confirmed user, creating it on first use
    ///
    /// # Errors
    /// - `PrerequisiteMissing` if no API user has been confirmed yet or the
    ///   remote side does not know the user
    /// - `SubscriptionUnauthorized` / `InvalidIdentifier` / `RemoteRejected`
    ///   for rejected calls, `Decode` for a malformed key payload
    #[instrument(skip(self))]
    pub async fn ensure_api_key(&self) -> Result<ApiKey> {
        let mut identity = self.identity.lock().await;
        self.ensure_api_key_locked(&mut identity).await
    }

    /// Return a valid bearer token for `product`
    ///
    /// A cached token that is still valid is returned without any network
    /// call. Otherwise the API user and key are provisioned if not already
    /// held and a new token is exchanged. Concurrent callers for the same
    /// product share one exchange.
    ///
    /// # Errors
    /// Any provisioning error, plus `CredentialMappingFailed` when the token
    /// endpoint does not accept the user/key pair.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn ensure_token(&self, product: Product) -> Result<AccessToken> {
        if let Some(token) = self.cache.get(product, self.clock.now()).await {
            debug!("Using cached access token");
            return Ok(token);
        }

        let flight = self.flight(product).await;
        let _guard = flight.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(token) = self.cache.get(product, self.clock.now()).await {
            debug!("Access token refreshed by concurrent caller");
            return Ok(token);
        }

        let (api_user_id, api_key, generation) = {
            let mut identity = self.identity.lock().await;
            if identity.held_pair().is_none() {
                self.ensure_api_user_locked(&mut identity).await?;
                self.ensure_api_key_locked(&mut identity).await?;
            }
            let (id, key) = identity.held_pair().ok_or_else(|| {
                MomoError::PrerequisiteMissing("API user and API key are not available".into())
            })?;
            (id, key, identity.generation)
        };

        let token =
            self.api.request_token(product, &api_user_id, &api_key, self.clock.now()).await?;

        let identity = self.identity.lock().await;
        if identity.generation == generation {
            self.cache.put(token.clone()).await;
        } else {
            warn!("Identity replaced during token exchange, not caching token");
        }
        drop(identity);
        info!(expires_at = %token.expires_at(), "Access token issued");
        Ok(token)
    }

    /// Whether `api_user_id` is registered remotely
    ///
    /// # Errors
    /// `SubscriptionUnauthorized`, `InvalidIdentifier` or `RemoteRejected`
    /// for anything but 200/404; never folds failures into `false`.
    #[instrument(skip(self))]
    pub async fn api_user_exists(&self, api_user_id: &str) -> Result<bool> {
        Ok(self.api.get_api_user(api_user_id).await?.is_some())
    }

    /// Remote details of `api_user_id`, or of the held user when `None`
    ///
    /// # Errors
    /// `PrerequisiteMissing` if no id is given and none is held; remote
    /// failures as for [`Self::api_user_exists`].
    #[instrument(skip(self))]
    pub async fn api_user_info(&self, api_user_id: Option<&str>) -> Result<Option<ApiUserInfo>> {
        let id = match api_user_id {
            Some(id) => id.to_string(),
            None => self.api_user_id().await.ok_or_else(|| {
                MomoError::PrerequisiteMissing("no API user id is held or given".to_string())
            })?,
        };
        self.api.get_api_user(&id).await
    }

    /// Switch to `api_user_id`, dropping the key and every cached token
    ///
    /// No network call is made; the id is checked on next use.
    pub async fn replace_api_user(&self, api_user_id: impl Into<String>) {
        let mut identity = self.identity.lock().await;
        self.reset_identity(&mut identity, api_user_id.into()).await;
    }

    /// Forget the held API key; the next provisioning issues a new one
    pub async fn clear_api_key(&self) {
        let mut identity = self.identity.lock().await;
        if identity.api_key.take().is_some() {
            info!("API key cleared");
        }
    }

    /// Drop the cached token for `product`; returns whether one existed
    pub async fn invalidate_token(&self, product: Product) -> bool {
        self.cache.invalidate(product).await
    }

    /// Validity of the cached token for `product`
    pub async fn token_status(&self, product: Product) -> TokenStatus {
        let token = self.cache.peek(product).await;
        TokenStatus::of(token.as_ref(), self.clock.now(), self.cache.margin())
    }

    /// Provider base URL the credentials are issued against
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }

    /// Subscription key bound at construction
    #[must_use]
    pub fn subscription_key(&self) -> &str {
        self.api.subscription_key()
    }

    pub async fn api_user_id(&self) -> Option<String> {
        self.identity.lock().await.api_user_id.clone()
    }

    pub async fn has_api_key(&self) -> bool {
        self.identity.lock().await.api_key.is_some()
    }

    async fn flight(&self, product: Product) -> Arc<Mutex<()>> {
        let mut flights = self.flights.lock().await;
        Arc::clone(flights.entry(product).or_default())
    }

    async fn reset_identity(&self, identity: &mut Identity, api_user_id: String) {
        info!(api_user_id = %api_user_id, "Replacing API user");
        identity.api_user_id = Some(api_user_id);
        identity.confirmed = false;
        identity.api_key = None;
        identity.generation += 1;
        self.cache.clear().await;
    }

    async fn ensure_api_user_locked(&self, identity: &mut Identity) -> Result<String> {
        if let Some(id) = identity.api_user_id.clone() {
            if identity.confirmed {
                return Ok(id);
            }
            return self.confirm_supplied_user(identity, id).await;
        }

        let first = new_reference_id();
        if self.create_generated_user(&first).await? == CreateUserOutcome::Created {
            return Ok(Self::confirm(identity, first));
        }

        // One retry with a fresh id; a second conflict is terminal
        let second = new_reference_id();
        match self.create_generated_user(&second).await? {
            CreateUserOutcome::Created => Ok(Self::confirm(identity, second)),
            CreateUserOutcome::Conflict => {
                Err(MomoError::UserAlreadyExists { api_user_id: second })
            }
        }
    }

    async fn confirm_supplied_user(&self, identity: &mut Identity, id: String) -> Result<String> {
        if self.api.get_api_user(&id).await?.is_some() {
            info!(api_user_id = %id, "Using existing API user");
            return Ok(Self::confirm(identity, id));
        }

        match self.api.create_api_user(&id, &self.callback_host).await? {
            CreateUserOutcome::Created => {
                info!(api_user_id = %id, "API user created");
                Ok(Self::confirm(identity, id))
            }
            CreateUserOutcome::Conflict => Err(MomoError::UserAlreadyExists { api_user_id: id }),
        }
    }

    async fn create_generated_user(&self, id: &str) -> Result<CreateUserOutcome> {
        let outcome = self.api.create_api_user(id, &self.callback_host).await?;
        if outcome == CreateUserOutcome::Created {
            info!(api_user_id = %id, "API user created");
        }
        Ok(outcome)
    }

    fn confirm(identity: &mut Identity, id: String) -> String {
        identity.api_user_id = Some(id.clone());
        identity.confirmed = true;
        id
    }

    async fn ensure_api_key_locked(&self, identity: &mut Identity) -> Result<ApiKey> {
        if let Some(key) = &identity.api_key {
            return Ok(key.clone());
        }
        let api_user_id = match (&identity.api_user_id, identity.confirmed) {
            (Some(id), true) => id.clone(),
            _ => {
                return Err(MomoError::PrerequisiteMissing(
                    "an API key requires a confirmed API user; create the API user first"
                        .to_string(),
                ))
            }
        };

        let key = self.api.create_api_key(&api_user_id).await?;
        info!(api_user_id = %api_user_id, "API key issued");
        identity.api_key = Some(key.clone());
        Ok(key)
    }
}

/// Builder for [`CredentialManager`]
pub struct CredentialManagerBuilder {
    transport: Arc<dyn Transport>,
    subscription_key: String,
    base_url: String,
    callback_host: String,
    clock: Arc<dyn Clock>,
    refresh_margin: Duration,
    api_user_id: Option<String>,
    api_key: Option<ApiKey>,
}

impl CredentialManagerBuilder {
    fn new(transport: Arc<dyn Transport>, subscription_key: impl Into<String>) -> Self {
        Self {
            transport,
            subscription_key: subscription_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            callback_host: DEFAULT_CALLBACK_HOST.to_string(),
            clock: Arc::new(SystemClock),
            refresh_margin: Duration::zero(),
            api_user_id: None,
            api_key: None,
        }
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn callback_host(mut self, callback_host: impl Into<String>) -> Self {
        self.callback_host = callback_host.into();
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Treat tokens as expiring this long before their reported expiry
    #[must_use]
    pub fn refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Use an existing API user instead of generating one
    #[must_use]
    pub fn api_user_id(mut self, api_user_id: impl Into<String>) -> Self {
        self.api_user_id = Some(api_user_id.into());
        self
    }

    /// Use a previously issued key for the configured API user
    #[must_use]
    pub fn api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// # Errors
    /// Returns `MomoError::Config` for an empty subscription key or an API key
    /// without an API user id.
    pub fn build(self) -> Result<CredentialManager> {
        if self.subscription_key.trim().is_empty() {
            return Err(MomoError::Config("subscription key must not be empty".to_string()));
        }
        if self.api_key.is_some() && self.api_user_id.is_none() {
            return Err(MomoError::Config(
                "an API key was supplied without its API user id".to_string(),
            ));
        }

        // A configured user/key pair is trusted as provisioned
        let identity = Identity {
            confirmed: self.api_key.is_some(),
            api_user_id: self.api_user_id,
            api_key: self.api_key,
            generation: 0,
        };

        Ok(CredentialManager {
            api: ProvisioningApi::new(self.transport, self.base_url, self.subscription_key),
            clock: self.clock,
            callback_host: self.callback_host,
            identity: Mutex::new(identity),
            cache: TokenCache::with_margin(self.refresh_margin),
            flights: Mutex::new(HashMap::new()),
        })
    }
}
