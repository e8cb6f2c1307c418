//! Configuration errors.

use thiserror::Error;

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid or incomplete configuration. Always fatal at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A key holds a value that cannot be used.
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        /// Configuration key.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The credential required by the selected provider is absent.
    #[error("{key} must be set when the {provider} provider is selected")]
    MissingCredential {
        /// Credential key.
        key: &'static str,
        /// Selected provider.
        provider: &'static str,
    },
}

impl ConfigError {
    /// Convenience constructor for invalid values.
    #[must_use]
    pub fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
