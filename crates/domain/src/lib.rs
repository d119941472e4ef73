//! # Nishiki Domain
//!
//! Domain types shared by the Nishiki client crates.
//!
//! This crate contains:
//! - Application configuration structure
//! - Domain error types and Result definitions
//! - Identity types returned by the backend (`/auth/me`, OIDC discovery)
//!
//! ## Architecture
//! - No dependencies on other Nishiki crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
