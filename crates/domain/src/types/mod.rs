//! Domain types and models

pub mod credential;
pub mod http;
pub mod operation;
pub mod payments;
pub mod product;
pub mod token;

pub use credential::{new_reference_id, ApiKey, ApiKeyResponse, ApiUserInfo};
pub use http::{HttpMethod, TransportRequest, TransportResponse};
pub use operation::{ApiResponse, OperationCall, OperationSpec};
pub use payments::{
    Party, PartyIdType, RequestToPay, Transfer, WidgetCreate, WidgetListQuery, WidgetUpdate,
};
pub use product::{Product, TargetEnvironment};
pub use token::{AccessToken, TokenResponse, TokenStatus};
