//! Selects the concrete provider once, from configuration.

use std::sync::Arc;

use intake_config::{ProviderConfig, ProviderKind};
use tracing::info;

use crate::gemini::{GeminiAdapter, GeminiConfig};
use crate::openai::{OpenAiAdapter, OpenAiConfig};
use crate::structured::{JsonCompletionProvider, ProviderAdapter};
use crate::traits::{AdapterResult, ModelAdapter, Sampling};

/// Builds the structured provider described by `config`.
///
/// # Errors
///
/// Returns [`AdapterError::Configuration`](crate::traits::AdapterError::Configuration)
/// when the credential is blank or the endpoint override is not a valid URL.
pub fn provider_from_config(config: &ProviderConfig) -> AdapterResult<Arc<dyn ProviderAdapter>> {
    let adapter: Arc<dyn ModelAdapter> = match config.kind {
        ProviderKind::OpenAi => {
            let mut openai = OpenAiConfig::new(config.model.clone())
                .with_api_key(config.api_key.clone())
                .with_timeout(config.timeout);
            if let Some(endpoint) = &config.endpoint {
                openai = openai.with_base_url(endpoint)?;
            }
            Arc::new(OpenAiAdapter::new(openai)?)
        }
        ProviderKind::Gemini => {
            let gemini = GeminiConfig::new(config.model.clone())
                .with_api_key(config.api_key.clone())
                .with_timeout(config.timeout);
            Arc::new(GeminiAdapter::new(gemini)?)
        }
    };

    let identity = adapter.identity();
    info!(
        provider = identity.provider(),
        model = identity.model(),
        temperature = config.temperature,
        max_output_tokens = ?config.max_output_tokens,
        "model provider selected"
    );
    Ok(Arc::new(
        JsonCompletionProvider::new(adapter).with_sampling(sampling(config)),
    ))
}

fn sampling(config: &ProviderConfig) -> Sampling {
    Sampling {
        temperature: Some(config.temperature),
        max_output_tokens: config.max_output_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AdapterError;

    #[test]
    fn builds_each_provider_kind() {
        let openai = provider_from_config(&ProviderConfig::new(ProviderKind::OpenAi, "sk-test"))
            .expect("openai provider");
        assert_eq!(openai.describe(), "openai/gpt-4o");

        let gemini = provider_from_config(
            &ProviderConfig::new(ProviderKind::Gemini, "g-test").with_model("gemini-1.5-pro"),
        )
        .expect("gemini provider");
        assert_eq!(gemini.describe(), "gemini/gemini-1.5-pro");
    }

    #[test]
    fn sampling_follows_configuration() {
        let config = ProviderConfig::new(ProviderKind::OpenAi, "sk-test")
            .with_temperature(0.2)
            .with_max_output_tokens(1024);
        assert_eq!(
            sampling(&config),
            Sampling {
                temperature: Some(0.2),
                max_output_tokens: Some(1024),
            }
        );

        let defaults = sampling(&ProviderConfig::new(ProviderKind::Gemini, "g-test"));
        assert_eq!(defaults.max_output_tokens, None);
        assert_eq!(defaults.temperature, Some(0.7));
    }

    #[test]
    fn rejects_bad_endpoint_override() {
        let config =
            ProviderConfig::new(ProviderKind::OpenAi, "sk-test").with_endpoint("not a url");
        let Err(err) = provider_from_config(&config) else {
            panic!("endpoint without a scheme must be rejected");
        };
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn blank_credential_is_rejected() {
        let Err(err) = provider_from_config(&ProviderConfig::new(ProviderKind::Gemini, "  ")) else {
            panic!("blank credential must be rejected");
        };
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }
}
