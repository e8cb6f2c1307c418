//! Process start-up: configuration, logging, and pipeline wiring.

use std::sync::Arc;

use anyhow::{Context, Result};
use intake_adapters::provider_from_config;
use intake_config::GatewayConfig;
use intake_guardrails::GuardrailEngine;
use intake_kernel::{AttemptPolicy, Pipeline};
use intake_prompts::{DirectorySource, StaticSource, TemplateSource, TemplateStore};
use intake_telemetry::TelemetryConfig;
use tracing::info;

/// A fully wired gateway.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    pipeline: Pipeline,
}

impl Gateway {
    /// Reads configuration from the environment, installs the log
    /// subscriber, and wires the pipeline.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, a second subscriber installation, or
    /// any error from [`Gateway::from_config`].
    pub fn from_env() -> Result<Self> {
        let config = GatewayConfig::from_env().context("invalid gateway configuration")?;
        intake_telemetry::init(&TelemetryConfig::new(config.log_filter.clone()))
            .context("failed to install log subscriber")?;
        Self::from_config(config)
    }

    /// Wires the pipeline described by `config`. Does not touch logging.
    ///
    /// # Errors
    ///
    /// Fails when templates do not load, guardrail patterns do not compile,
    /// or the provider cannot be constructed.
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        let source: Arc<dyn TemplateSource> = match &config.templates_dir {
            Some(dir) => Arc::new(DirectorySource::new(dir)),
            None => Arc::new(StaticSource::bundled()),
        };
        let description = source.describe();
        let templates = TemplateStore::load(source)
            .with_context(|| format!("failed to load prompt templates from {description}"))?;

        let guardrails = GuardrailEngine::new().context("failed to compile guardrail patterns")?;
        let provider = provider_from_config(&config.provider).with_context(|| {
            format!("failed to construct {} provider", config.provider.kind)
        })?;

        info!(
            templates = templates.snapshot().len(),
            source = %description,
            provider = %provider.describe(),
            patterns = guardrails.pattern_version(),
            max_attempts = config.max_attempts.get(),
            "intake gateway ready"
        );

        let pipeline = Pipeline::new(Arc::new(templates), provider, Arc::new(guardrails))
            .with_attempt_policy(AttemptPolicy::new(config.max_attempts));

        Ok(Self { config, pipeline })
    }

    /// Returns the pipeline serving the call-sites.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the configuration the gateway was built from.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Reloads templates from their source, keeping the old set on failure.
    ///
    /// # Errors
    ///
    /// Returns the load failure.
    pub fn reload_templates(&self) -> Result<usize> {
        self.pipeline
            .templates()
            .reload()
            .context("prompt template reload failed")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::num::NonZeroU32;

    use intake_config::{ProviderConfig, ProviderKind};

    use super::*;

    const SUMMARIZE: &str = include_str!("../../intake-prompts/templates/assist_summarize.yaml");
    const DRAFT_REPLY: &str =
        include_str!("../../intake-prompts/templates/assist_draft_reply.yaml");

    fn config() -> GatewayConfig {
        GatewayConfig::new(ProviderConfig::new(ProviderKind::OpenAi, "sk-test"))
    }

    #[test]
    fn wires_bundled_templates_by_default() {
        let mut config = config();
        config.max_attempts = NonZeroU32::new(5).unwrap();
        let gateway = Gateway::from_config(config).expect("gateway");

        assert_eq!(gateway.pipeline().templates().snapshot().len(), 4);
        assert_eq!(gateway.pipeline().attempt_policy().max_attempts(), 5);
    }

    #[test]
    fn directory_templates_reload() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("assist_summarize.yaml"), SUMMARIZE).unwrap();

        let mut config = config();
        config.templates_dir = Some(dir.path().to_path_buf());
        let gateway = Gateway::from_config(config).expect("gateway");
        assert_eq!(gateway.pipeline().templates().snapshot().len(), 1);

        fs::write(dir.path().join("assist_draft_reply.yaml"), DRAFT_REPLY).unwrap();
        assert_eq!(gateway.reload_templates().unwrap(), 2);

        fs::write(dir.path().join("broken.yaml"), "name: [unclosed").unwrap();
        assert!(gateway.reload_templates().is_err());
        assert_eq!(gateway.pipeline().templates().snapshot().len(), 2);
    }

    #[test]
    fn invalid_templates_fail_start_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.yaml"), "just a string").unwrap();

        let mut config = config();
        config.templates_dir = Some(dir.path().to_path_buf());
        let err = Gateway::from_config(config).unwrap_err();
        assert!(err.to_string().contains("failed to load prompt templates"));
    }

    #[test]
    fn bad_endpoint_fails_start_up() {
        let config = GatewayConfig::new(
            ProviderConfig::new(ProviderKind::OpenAi, "sk-test").with_endpoint("localhost:8080"),
        );
        let err = Gateway::from_config(config).unwrap_err();
        assert!(err.to_string().contains("openai"));
    }
}
