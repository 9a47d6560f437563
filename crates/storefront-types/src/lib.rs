pub mod api;
pub mod models;
pub mod price;

pub use price::{Price, PriceError};
