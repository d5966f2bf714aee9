//! # MoMo Domain
//!
//! Business domain types for the mobile-money API client.
//!
//! This crate contains:
//! - Products, target environments and operation descriptors
//! - Credential and access token types
//! - Transport request/response values exchanged with the HTTP port
//! - Payment payloads (request-to-pay, transfers, widgets)
//! - Configuration structures
//! - The error taxonomy and `Result` alias
//!
//! ## Architecture
//! - No dependencies on other MoMo crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
