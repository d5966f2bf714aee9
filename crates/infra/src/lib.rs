//! # MoMo Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport
//! - Configuration loading from the environment, `.env` and files
//! - The `MomoClient` facade wiring everything together
//!
//! ## Architecture
//! - Implements traits defined in `momo-core`
//! - Contains all "impure" code (network, filesystem, process environment)

pub mod client;
pub mod config;
pub mod http;

// Re-export commonly used items
pub use client::MomoClient;
pub use http::{HttpTransport, HttpTransportBuilder};
