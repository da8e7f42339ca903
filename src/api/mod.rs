pub mod client;
pub mod error;
pub mod events;
pub mod models;

pub use client::{
    AdminBackend, ApiClient, AuthBackend, CatalogBackend, ChatBackend, SearchBackend, SellerBackend,
};
pub use error::{ApiError, FieldError, Result};
