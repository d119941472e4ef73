//! OAuth 2.0 Authorization Code + PKCE building blocks
//!
//! Everything the sign-in flow needs that does not depend on a concrete
//! host: PKCE generation, session and token wire types, and the ports the
//! service talks to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   AuthService   │  (nishiki-core)
//! └────────┬────────┘
//!          │
//!          ├──► KeyValueStore   (session + pending authorization)
//!          ├──► Navigator       (redirects, callback URL)
//!          ├──► EntropySource   (state + code verifier)
//!          └──► TokenEndpoint   (backend token proxy)
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: `AuthSession`, `TokenResponse`, `OAuthConfig`
//! - **[`pkce`]**: PKCE challenge generation and state validation
//! - **[`traits`]**: ports implemented by infra adapters and test mocks
//! - **[`errors`]**: per-port error types

pub mod errors;
pub mod pkce;
pub mod traits;
pub mod types;

pub use errors::{EntropyError, NavigationError, StorageError, TokenEndpointError};
pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_state, validate_state, OsEntropy,
    PkceChallenge,
};
pub use traits::{EntropySource, KeyValueStore, Navigator, TokenEndpoint};
pub use types::{
    AuthSession, CodeExchangeRequest, OAuthConfig, OAuthErrorBody, PendingAuthorization,
    TokenResponse,
};
