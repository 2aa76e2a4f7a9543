//! Credential handling for remote inference endpoints.

pub mod credentials;

pub use credentials::{ApiKey, ModelEndpoint};
