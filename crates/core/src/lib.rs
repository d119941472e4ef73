//! # Nishiki Core
//!
//! Pure sign-in logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The OAuth 2.0 Authorization Code + PKCE state machine (`AuthService`)
//! - Typed access to the persisted session layout (`SessionStore`)
//! - Startup routing and the auth event queue (`AuthCoordinator`)
//!
//! ## Architecture Principles
//! - Only depends on `nishiki-common` and `nishiki-domain`
//! - No HTTP, filesystem or platform code
//! - All external dependencies via the ports in `nishiki_common::auth`

pub mod auth;

// Re-export specific items to avoid ambiguity
pub use auth::{
    AuthCoordinator, AuthEvent, AuthFailure, AuthService, AuthServiceError, AuthView,
    SessionStore,
};
