//! Request payloads for payment and widget operations
//!
//! Field names follow the provider's camelCase wire format. Optional fields
//! are omitted when absent.

use serde::{Deserialize, Serialize};

/// Kind of identifier used for a payer or payee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartyIdType {
    Msisdn,
    Email,
    PartyCode,
}

/// A payer or payee account holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub party_id_type: PartyIdType,
    pub party_id: String,
}

impl Party {
    #[must_use]
    pub fn msisdn(number: impl Into<String>) -> Self {
        Self { party_id_type: PartyIdType::Msisdn, party_id: number.into() }
    }
}

/// Body of `collection.request_to_pay`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestToPay {
    pub amount: String,
    pub currency: String,
    pub external_id: String,
    pub payer: Party,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee_note: Option<String>,
}

/// Body of `disbursement.transfer` and `remittance.transfer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub amount: String,
    pub currency: String,
    pub external_id: String,
    pub payee: Party,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee_note: Option<String>,
}

/// Body of `widget.create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub amount: String,
    pub currency: String,
}

/// Body of `widget.update`; only present fields are changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Pagination for `widget.list` (provider defaults: 50 per page, page 1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WidgetListQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

impl WidgetListQuery {
    /// Query pairs to append to the request URL
    #[must_use]
    pub fn to_pairs(self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(per_page) = self.per_page {
            pairs.push(("perPage".to_string(), per_page.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        pairs
    }
}
