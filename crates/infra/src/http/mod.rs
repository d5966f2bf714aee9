//! HTTP adapter for the transport port

pub mod client;

pub use client::{HttpTransport, HttpTransportBuilder};
