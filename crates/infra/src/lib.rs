//! # Nishiki Infrastructure
//!
//! Infrastructure implementations of the auth ports.
//!
//! This crate contains:
//! - Backend token proxy client (reqwest)
//! - Memory and file key-value stores
//! - Host navigation adapter
//! - Authenticated backend API client
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `nishiki-common`
//! - Wires them into `nishiki-core` services
//! - Contains all "impure" code (HTTP, filesystem, environment)

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod navigation;
pub mod observability;
pub mod storage;

// Re-export commonly used items
pub use api::{AccessTokenProvider, ApiClient, ApiClientConfig, ApiError};
pub use auth::{build_auth_service, oauth_config, BackendTokenClient};
pub use errors::InfraError;
pub use http::HttpClient;
pub use navigation::HostNavigator;
pub use observability::init_tracing;
pub use storage::{FileStore, MemoryStore};
