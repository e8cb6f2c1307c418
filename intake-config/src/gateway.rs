//! Top-level gateway configuration.

use std::env;
use std::num::NonZeroU32;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::provider::ProviderConfig;

/// Maximum provider attempts per request.
pub const LLM_MAX_ATTEMPTS: &str = "LLM_MAX_ATTEMPTS";
/// Directory of template documents; unset selects the bundled set.
pub const PROMPT_TEMPLATES_DIR: &str = "PROMPT_TEMPLATES_DIR";
/// `tracing` filter directive.
pub const GATEWAY_LOG: &str = "GATEWAY_LOG";

/// Attempt bound used when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: NonZeroU32 = NonZeroU32::new(3).expect("three is non-zero");
/// Log filter used when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Validated configuration for one gateway process.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayConfig {
    /// Model provider settings.
    pub provider: ProviderConfig,
    /// Maximum provider attempts per request.
    pub max_attempts: NonZeroU32,
    /// Template directory; `None` selects the bundled templates.
    pub templates_dir: Option<PathBuf>,
    /// `tracing` filter directive.
    pub log_filter: String,
}

impl GatewayConfig {
    /// Creates a configuration with defaults around `provider`.
    #[must_use]
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            templates_dir: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }

    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`GatewayConfig::from_lookup`].
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] when the selected provider's
    /// key is absent and [`ConfigError::InvalidValue`] for malformed values,
    /// an unknown provider, or a zero attempt bound.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = move |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let provider = ProviderConfig::from_lookup(&lookup)?;
        let mut config = Self::new(provider);
        if let Some(raw) = lookup(LLM_MAX_ATTEMPTS) {
            config.max_attempts = parse_attempts(&raw)?;
        }
        config.templates_dir = lookup(PROMPT_TEMPLATES_DIR).map(PathBuf::from);
        if let Some(filter) = lookup(GATEWAY_LOG) {
            config.log_filter = filter;
        }

        debug!(
            provider = %config.provider.kind,
            model = %config.provider.model,
            max_attempts = config.max_attempts.get(),
            bundled_templates = config.templates_dir.is_none(),
            "loaded gateway configuration"
        );
        Ok(config)
    }
}

fn parse_attempts(raw: &str) -> ConfigResult<NonZeroU32> {
    raw.trim()
        .parse::<NonZeroU32>()
        .map_err(|_| ConfigError::invalid(LLM_MAX_ATTEMPTS, raw, "must be a positive integer"))
}
