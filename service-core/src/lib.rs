//! service-core: Shared infrastructure for the diocese directory services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod retry;

pub use axum;
