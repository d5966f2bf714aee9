//! Operation table
//!
//! The complete endpoint surface as data. Adding an endpoint means adding a
//! row here; the dispatcher needs no per-endpoint code.

use momo_domain::{HttpMethod, OperationSpec, Product};

const fn op(
    name: &'static str,
    product: Product,
    method: HttpMethod,
    path: &'static str,
    mutating: bool,
) -> OperationSpec {
    OperationSpec { name, product, method, path, mutating }
}

pub const REQUEST_TO_PAY: OperationSpec = op(
    "collection.request_to_pay",
    Product::Collection,
    HttpMethod::Post,
    "/collection/v1_0/requesttopay",
    true,
);
pub const REQUEST_TO_PAY_STATUS: OperationSpec = op(
    "collection.request_to_pay_status",
    Product::Collection,
    HttpMethod::Get,
    "/collection/v1_0/requesttopay/{referenceId}",
    false,
);
pub const PAYMENT_STATUS: OperationSpec = op(
    "collection.payment_status",
    Product::Collection,
    HttpMethod::Get,
    "/collection/v2_0/payment/{referenceId}",
    false,
);
pub const COLLECTION_BALANCE: OperationSpec = op(
    "collection.account_balance",
    Product::Collection,
    HttpMethod::Get,
    "/collection/v1_0/account/balance",
    false,
);
pub const ACCOUNT_HOLDER_ACTIVE: OperationSpec = op(
    "collection.account_holder_active",
    Product::Collection,
    HttpMethod::Get,
    "/collection/v1_0/accountholder/{accountHolderIdType}/{accountHolderId}/active",
    false,
);
pub const DISBURSEMENT_TRANSFER: OperationSpec = op(
    "disbursement.transfer",
    Product::Disbursement,
    HttpMethod::Post,
    "/disbursement/v1_0/transfer",
    true,
);
pub const DISBURSEMENT_TRANSFER_STATUS: OperationSpec = op(
    "disbursement.transfer_status",
    Product::Disbursement,
    HttpMethod::Get,
    "/disbursement/v1_0/transfer/{referenceId}",
    false,
);
pub const DISBURSEMENT_BALANCE: OperationSpec = op(
    "disbursement.account_balance",
    Product::Disbursement,
    HttpMethod::Get,
    "/disbursement/v1_0/account/balance",
    false,
);
pub const REMITTANCE_TRANSFER: OperationSpec = op(
    "remittance.transfer",
    Product::Remittance,
    HttpMethod::Post,
    "/remittance/v1_0/transfer",
    true,
);
pub const REMITTANCE_TRANSFER_STATUS: OperationSpec = op(
    "remittance.transfer_status",
    Product::Remittance,
    HttpMethod::Get,
    "/remittance/v1_0/transfer/{referenceId}",
    false,
);
pub const REMITTANCE_BALANCE: OperationSpec = op(
    "remittance.account_balance",
    Product::Remittance,
    HttpMethod::Get,
    "/remittance/v1_0/account/balance",
    false,
);
pub const WIDGET_CREATE: OperationSpec =
    op("widget.create", Product::Widget, HttpMethod::Post, "/widget/v1_0/widgets", true);
pub const WIDGET_GET: OperationSpec =
    op("widget.get", Product::Widget, HttpMethod::Get, "/widget/v1_0/widgets/{widgetId}", false);
pub const WIDGET_LIST: OperationSpec =
    op("widget.list", Product::Widget, HttpMethod::Get, "/widget/v1_0/widgets", false);
pub const WIDGET_UPDATE: OperationSpec =
    op("widget.update", Product::Widget, HttpMethod::Put, "/widget/v1_0/widgets/{widgetId}", true);

/// Every known operation
pub static OPERATIONS: &[OperationSpec] = &[
    REQUEST_TO_PAY,
    REQUEST_TO_PAY_STATUS,
    PAYMENT_STATUS,
    COLLECTION_BALANCE,
    ACCOUNT_HOLDER_ACTIVE,
    DISBURSEMENT_TRANSFER,
    DISBURSEMENT_TRANSFER_STATUS,
    DISBURSEMENT_BALANCE,
    REMITTANCE_TRANSFER,
    REMITTANCE_TRANSFER_STATUS,
    REMITTANCE_BALANCE,
    WIDGET_CREATE,
    WIDGET_GET,
    WIDGET_LIST,
    WIDGET_UPDATE,
];

/// Look up an operation by its dotted name (case-insensitive)
#[must_use]
pub fn find(name: &str) -> Option<&'static OperationSpec> {
    let name = name.trim();
    OPERATIONS.iter().find(|op| op.name.eq_ignore_ascii_case(name))
}

/// Operations served by one product
pub fn for_product(product: Product) -> impl Iterator<Item = &'static OperationSpec> {
    OPERATIONS.iter().filter(move |op| op.product == product)
}
