//! Wall-clock abstraction
//!
//! Session expiry is an absolute UTC instant, so everything that compares
//! against it asks a [`Clock`] for "now". Production code uses
//! [`SystemClock`]; tests drive a `MockClock` from [`crate::testing`].
//!
//! ```
//! use nishiki_common::time::{Clock, SystemClock};
//!
//! let now = SystemClock.now();
//! assert!(now.timestamp() > 0);
//! ```

use chrono::{DateTime, Utc};

/// Source of the current UTC time
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
