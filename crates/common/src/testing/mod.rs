//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory doubles for the auth ports
//! - **[`time`]**: controllable clock for expiry tests
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use nishiki_common::testing::{MockClock, MockKeyValueStore, MockNavigator};
//!
//! let store = Arc::new(MockKeyValueStore::new());
//! let navigator = Arc::new(MockNavigator::at("http://localhost:8080/"));
//! let clock = MockClock::from_timestamp(1_700_000_000);
//! # let _ = (store, navigator, clock);
//! ```

pub mod mocks;
pub mod time;

pub use mocks::{
    token_response, FailingEntropy, FixedEntropy, MockKeyValueStore, MockNavigator,
    MockTokenEndpoint,
};
pub use time::MockClock;
