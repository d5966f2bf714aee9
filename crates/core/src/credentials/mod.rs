//! Credential lifecycle: provisioning identity, API key and bearer tokens

pub mod cache;
pub mod manager;
pub mod provisioning;

pub use cache::TokenCache;
pub use manager::{CredentialManager, CredentialManagerBuilder};
pub use provisioning::{CreateUserOutcome, ProvisioningApi};
