//! Sign-in flow
//!
//! - **[`service`]**: `AuthService`, the OAuth state machine
//! - **[`storage`]**: `SessionStore`, persisted keys and session JSON
//! - **[`coordinator`]**: startup routing and UI event queue
//! - **[`errors`]**: `AuthServiceError` and `AuthFailure`

pub mod coordinator;
pub mod errors;
pub mod service;
pub mod storage;

pub use coordinator::{AuthCoordinator, AuthEvent, AuthView};
pub use errors::{AuthFailure, AuthServiceError};
pub use service::AuthService;
pub use storage::SessionStore;
