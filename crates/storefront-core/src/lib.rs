//! Storefront services.
//!
//! Every operation takes the shared [`Database`](storefront_db::Database)
//! handle and, where identity matters, the caller's user id as explicit
//! arguments. Nothing here reads cookies, environment or other ambient state.

pub mod auth;
pub mod catalog;
pub mod comments;
pub mod error;
pub mod ratings;

pub use error::{ServiceError, ServiceResult};

#[cfg(test)]
pub(crate) mod test_support;
