//! Products and target environments
//!
//! Each product is a separate API surface with its own token endpoint.

use serde::{Deserialize, Serialize};

use crate::impl_wire_name_conversions;

/// A distinct API surface requiring its own bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Collection,
    Disbursement,
    Remittance,
    Widget,
}

impl_wire_name_conversions!(Product {
    Collection => "collection",
    Disbursement => "disbursement",
    Remittance => "remittance",
    Widget => "widget",
});

impl Product {
    /// All known products
    pub const ALL: [Self; 4] = [Self::Collection, Self::Disbursement, Self::Remittance, Self::Widget];

    /// Wire name used in URL segments
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Disbursement => "disbursement",
            Self::Remittance => "remittance",
            Self::Widget => "widget",
        }
    }

    /// Path of the product-specific token endpoint (trailing slash required)
    #[must_use]
    pub fn token_path(self) -> String {
        format!("/{}/token/", self.as_str())
    }
}

/// Value of the `X-Target-Environment` header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl_wire_name_conversions!(TargetEnvironment {
    Sandbox => "sandbox",
    Production => "production",
});
