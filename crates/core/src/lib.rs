//! # MoMo Core
//!
//! Business logic for the mobile-money client, free of I/O.
//!
//! This crate contains:
//! - The [`Transport`] port implemented by infrastructure adapters
//! - The [`Clock`] abstraction used for token expiry
//! - Credential lifecycle: provisioning, API key, per-product token cache
//! - The operation table and the generic request dispatcher
//!
//! ## Architecture Principles
//! - Only depends on `momo-domain`
//! - No HTTP client or filesystem code
//! - All external effects via traits

pub mod clock;
pub mod credentials;
pub mod dispatch;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use clock::{Clock, SystemClock};
pub use credentials::{CredentialManager, CredentialManagerBuilder, TokenCache};
pub use dispatch::{operations, RequestDispatcher, OPERATIONS};
pub use ports::Transport;
