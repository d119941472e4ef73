//! Authenticated backend API client
//!
//! Every request obtains a token through [`AccessTokenProvider`] first, so
//! an expired session is refreshed before the call goes out.

pub mod auth;
pub mod client;
pub mod errors;

pub use auth::AccessTokenProvider;
pub use client::{ApiClient, ApiClientBuilder, ApiClientConfig};
pub use errors::ApiError;
