//! Model provider selection and credentials.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Selects the provider implementation.
pub const LLM_PROVIDER: &str = "LLM_PROVIDER";
/// Model identifier passed to the provider.
pub const LLM_MODEL: &str = "LLM_MODEL";
/// `OpenAI` credential.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Optional `OpenAI`-compatible base URL.
pub const OPENAI_ENDPOINT: &str = "OPENAI_ENDPOINT";
/// Gemini credential.
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
/// Per-call HTTP timeout in whole seconds.
pub const LLM_TIMEOUT_SECS: &str = "LLM_TIMEOUT_SECS";
/// Sampling temperature.
pub const LLM_TEMPERATURE: &str = "LLM_TEMPERATURE";
/// Output token budget per call; unset leaves the provider default.
pub const LLM_MAX_OUTPUT_TOKENS: &str = "LLM_MAX_OUTPUT_TOKENS";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Per-call timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Sampling temperature used when none is configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Supported model providers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// `OpenAI` chat completions (or a compatible endpoint).
    #[default]
    OpenAi,
    /// Google Gemini.
    Gemini,
}

impl ProviderKind {
    /// Returns the configuration label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// Returns the key holding this provider's credential.
    #[must_use]
    pub const fn credential_key(self) -> &'static str {
        match self {
            Self::OpenAi => OPENAI_API_KEY,
            Self::Gemini => GOOGLE_API_KEY,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            _ => Err(ConfigError::invalid(
                LLM_PROVIDER,
                s,
                "expected `openai` or `gemini`",
            )),
        }
    }
}

/// Everything needed to construct the selected provider.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    /// Selected provider.
    pub kind: ProviderKind,
    /// Model identifier.
    pub model: String,
    /// Credential for the selected provider.
    pub api_key: String,
    /// Optional base URL override (`OpenAI` only).
    pub endpoint: Option<String>,
    /// Per-call HTTP timeout.
    pub timeout: Duration,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token budget per call.
    pub max_output_tokens: Option<u32>,
}

impl ProviderConfig {
    /// Creates a configuration with defaults for everything but the credential.
    #[must_use]
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            model: DEFAULT_MODEL.to_owned(),
            api_key: api_key.into(),
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: None,
        }
    }

    /// Overrides the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the base URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Overrides the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Caps the output tokens of each call.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub(crate) fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let kind = lookup(LLM_PROVIDER)
            .map(|value| value.parse::<ProviderKind>())
            .transpose()?
            .unwrap_or_default();

        let api_key = lookup(kind.credential_key()).ok_or(ConfigError::MissingCredential {
            key: kind.credential_key(),
            provider: kind.as_str(),
        })?;

        let mut config = Self::new(kind, api_key);
        if let Some(model) = lookup(LLM_MODEL) {
            config.model = model;
        }
        if kind == ProviderKind::OpenAi {
            config.endpoint = lookup(OPENAI_ENDPOINT);
        }
        if let Some(raw) = lookup(LLM_TIMEOUT_SECS) {
            config.timeout = parse_timeout(&raw)?;
        }
        if let Some(raw) = lookup(LLM_TEMPERATURE) {
            config.temperature = parse_temperature(&raw)?;
        }
        if let Some(raw) = lookup(LLM_MAX_OUTPUT_TOKENS) {
            config.max_output_tokens = Some(parse_max_output_tokens(&raw)?);
        }
        Ok(config)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

fn parse_timeout(raw: &str) -> ConfigResult<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::invalid(LLM_TIMEOUT_SECS, raw, "must be at least 1 second")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(err) => Err(ConfigError::invalid(LLM_TIMEOUT_SECS, raw, err.to_string())),
    }
}

fn parse_temperature(raw: &str) -> ConfigResult<f32> {
    let value = raw
        .trim()
        .parse::<f32>()
        .map_err(|err| ConfigError::invalid(LLM_TEMPERATURE, raw, err.to_string()))?;
    if !(0.0..=2.0).contains(&value) {
        return Err(ConfigError::invalid(LLM_TEMPERATURE, raw, "must be between 0.0 and 2.0"));
    }
    Ok(value)
}

fn parse_max_output_tokens(raw: &str) -> ConfigResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::invalid(LLM_MAX_OUTPUT_TOKENS, raw, "must be at least 1")),
        Ok(tokens) => Ok(tokens),
        Err(err) => Err(ConfigError::invalid(LLM_MAX_OUTPUT_TOKENS, raw, err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" gemini ".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("anthropic".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn kind_deserializes_from_lowercase_label() {
        let kind: ProviderKind = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(kind, ProviderKind::Gemini);
    }

    #[test]
    fn debug_output_hides_the_credential() {
        let config = ProviderConfig::new(ProviderKind::OpenAi, "sk-secret");
        assert!(!format!("{config:?}").contains("sk-secret"));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
        assert!(parse_temperature("2.5").is_err());
        assert!(parse_temperature("NaN").is_err());
        assert_eq!(parse_timeout("15").unwrap(), Duration::from_secs(15));
        assert!(parse_max_output_tokens("0").is_err());
        assert!(parse_max_output_tokens("-5").is_err());
        assert_eq!(parse_max_output_tokens(" 2048 ").unwrap(), 2048);
    }
}
