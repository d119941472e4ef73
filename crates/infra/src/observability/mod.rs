//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level so a single run
//! can be made verbose without touching the config file.

use nishiki_domain::NishikiError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set and valid, else `default_level`
///
/// # Errors
/// Returns `NishikiError::Config` if `default_level` is not a valid filter
pub fn env_filter(default_level: &str) -> Result<EnvFilter, NishikiError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level).map_err(|e| {
            NishikiError::Config(format!("Invalid log level {:?}: {}", default_level, e))
        }),
    }
}

/// Install the global fmt subscriber
///
/// Calling it again after a subscriber is installed is a no-op.
///
/// # Errors
/// Returns `NishikiError::Config` if `default_level` is not a valid filter
pub fn init_tracing(default_level: &str) -> Result<(), NishikiError> {
    let filter = env_filter(default_level)?;

    if tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}
