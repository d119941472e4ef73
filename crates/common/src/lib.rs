//! Shared building blocks for the Nishiki sign-in flow.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: session/token wire types and the clock abstraction
//! - `platform`: auth ports and PKCE generation (default)
//! - `test-utils`: in-memory port doubles and a controllable clock

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod time;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "platform")))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "platform")]
pub use auth::{
    AuthSession, EntropySource, KeyValueStore, Navigator, OAuthConfig, PkceChallenge,
    TokenEndpoint,
};
#[cfg(feature = "foundation")]
pub use time::{Clock, SystemClock};
