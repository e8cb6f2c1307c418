//! Student-support intake gateway facade.
//!
//! Bundles the pipeline crates behind feature flags. With the default
//! `bootstrap` feature, [`Gateway`] wires configuration, logging, templates,
//! guardrails, and the model provider into a ready [`kernel::Pipeline`].

#![warn(missing_docs, clippy::pedantic)]

/// Shared request, result, and shape types.
pub use intake_primitives as primitives;

/// Completion orchestrator and call-site services (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use intake_kernel as kernel;

/// Model provider adapters (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use intake_adapters as adapters;

/// Input and output guardrails (enabled by `guardrails` feature).
#[cfg(feature = "guardrails")]
pub use intake_guardrails as guardrails;

/// Prompt templates and rendering (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use intake_prompts as prompts;

/// Environment configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use intake_config as config;

/// Log subscriber installation (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use intake_telemetry as telemetry;

#[cfg(feature = "bootstrap")]
mod bootstrap;

#[cfg(feature = "bootstrap")]
pub use bootstrap::Gateway;
