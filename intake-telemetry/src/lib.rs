//! Log subscriber installation for the intake gateway.
//!
//! Library crates only emit `tracing` events; the process entry point calls
//! [`init`] once to route them to stderr through an `EnvFilter`.

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// Directive as supplied.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Subscriber settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelemetryConfig {
    filter: String,
    with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl TelemetryConfig {
    /// Creates settings using `filter` as the `EnvFilter` directive.
    #[must_use]
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            with_target: false,
        }
    }

    /// Includes the event target (module path) in each line.
    #[must_use]
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Returns the filter directive.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Parses the filter directive.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidFilter`] when the directive is malformed.
    pub fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_new(&self.filter).map_err(|err| TelemetryError::InvalidFilter {
            filter: self.filter.clone(),
            reason: err.to_string(),
        })
    }
}

/// Installs the global fmt subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a malformed directive and
/// [`TelemetryError::AlreadyInstalled`] when called twice.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = config.env_filter()?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_level(true)
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInstalled)?;

    debug!(filter = config.filter(), "tracing subscriber installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_module_directives() {
        let config = TelemetryConfig::new("info,intake_kernel=debug");
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn rejects_malformed_directive() {
        let err = TelemetryConfig::new("intake_kernel=loud").env_filter().unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidFilter { .. }));
    }

    #[test]
    fn second_install_is_reported() {
        let config = TelemetryConfig::default();
        let _ = init(&config);
        assert!(matches!(init(&config), Err(TelemetryError::AlreadyInstalled)));
    }
}
