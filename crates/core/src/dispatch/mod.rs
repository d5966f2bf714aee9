//! Generic operation dispatch over the operation table

pub mod dispatcher;
pub mod operations;

pub use dispatcher::RequestDispatcher;
pub use operations::{find, for_product, OPERATIONS};
