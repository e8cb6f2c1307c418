//! Configuration for the intake gateway.
//!
//! Values come from the process environment (or an injected lookup in tests)
//! and are validated once at start-up into a typed [`GatewayConfig`].

#![warn(missing_docs, clippy::pedantic)]

pub mod error;
pub mod gateway;
pub mod provider;

pub use error::{ConfigError, ConfigResult};
pub use gateway::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_ATTEMPTS, GatewayConfig, LLM_MAX_ATTEMPTS, GATEWAY_LOG,
    PROMPT_TEMPLATES_DIR,
};
pub use provider::{
    DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT, GOOGLE_API_KEY, LLM_MAX_OUTPUT_TOKENS,
    LLM_MODEL, LLM_PROVIDER, LLM_TEMPERATURE, LLM_TIMEOUT_SECS, OPENAI_API_KEY, OPENAI_ENDPOINT,
    ProviderConfig, ProviderKind,
};
