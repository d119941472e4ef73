//! Domain types and models

pub mod user;

pub use user::{AuthInfo, Claims, OidcConfiguration, User};
