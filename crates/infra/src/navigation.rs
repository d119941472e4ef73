//! Host navigation adapter
//!
//! The UI shell owns the real window or browser. [`HostNavigator`] tracks
//! the URL the shell reports and hands redirect targets back to it over a
//! channel; the shell performs the actual navigation.

use std::sync::Mutex;

use nishiki_common::auth::{NavigationError, Navigator};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// [`Navigator`] backed by the host UI shell
pub struct HostNavigator {
    current: Mutex<String>,
    redirects: UnboundedSender<String>,
}

impl HostNavigator {
    /// Create a navigator positioned at `current_url`
    ///
    /// Returns the receiver on which redirect targets arrive.
    pub fn new(current_url: impl Into<String>) -> (Self, UnboundedReceiver<String>) {
        let (redirects, receiver) = mpsc::unbounded_channel();
        (Self { current: Mutex::new(current_url.into()), redirects }, receiver)
    }

    /// Record a location change made by the host (page load, deep link)
    pub fn set_current_url(&self, url: impl Into<String>) {
        match self.current.lock() {
            Ok(mut current) => *current = url.into(),
            Err(poisoned) => *poisoned.into_inner() = url.into(),
        }
    }
}

impl Navigator for HostNavigator {
    fn redirect(&self, url: &str) -> Result<(), NavigationError> {
        debug!(url = %url, "Forwarding redirect to host");
        self.redirects
            .send(url.to_string())
            .map_err(|_| NavigationError::RedirectFailed("host navigation channel closed".into()))
    }

    fn current_url(&self) -> Result<String, NavigationError> {
        let current = self
            .current
            .lock()
            .map_err(|_| NavigationError::LocationUnavailable("location lock poisoned".into()))?;

        if current.is_empty() {
            return Err(NavigationError::LocationUnavailable("host has not reported a URL".into()));
        }
        Ok(current.clone())
    }
}
