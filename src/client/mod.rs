//! Catalog gateway client module.

pub mod api;
pub mod models;

pub use api::{ApiClientError, CatalogClient};
