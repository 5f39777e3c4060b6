pub mod auth;
pub mod contacts;
pub mod directory;
pub mod metrics;
