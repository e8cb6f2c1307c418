//! Structured JSON completion on top of any [`ModelAdapter`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use intake_primitives::{OutputShape, StructuredShape};
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::schema::response_schema;
use crate::traits::{AdapterError, InferenceRequest, ModelAdapter, Sampling};

/// Result alias for structured completions.
pub type ProviderResult<T> = Result<T, ProviderFailure>;

/// Why a structured completion attempt failed.
///
/// Every variant is retryable from the orchestrator's point of view.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderFailure {
    /// The provider kept rate limiting after local backoff was exhausted.
    #[error("provider rate limited: {reason}")]
    RateLimited {
        /// Provider-supplied context.
        reason: String,
    },

    /// Network, timeout, or upstream service failure.
    #[error("transient provider failure: {reason}")]
    Transient {
        /// Additional context.
        reason: String,
    },

    /// The model answered with something that is not the requested shape.
    #[error("malformed model output: {reason}")]
    MalformedOutput {
        /// What was wrong with the output.
        reason: String,
    },

    /// Anything else, including misconfiguration.
    #[error("provider failure: {reason}")]
    Other {
        /// Additional context.
        reason: String,
    },
}

impl ProviderFailure {
    /// Convenience constructor for malformed output.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            reason: reason.into(),
        }
    }

    /// Short label used in structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Transient { .. } => "transient",
            Self::MalformedOutput { .. } => "malformed_output",
            Self::Other { .. } => "other",
        }
    }
}

impl From<AdapterError> for ProviderFailure {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::RateLimited { .. } => Self::RateLimited {
                reason: err.to_string(),
            },
            AdapterError::Transport { .. } | AdapterError::Response { .. } => Self::Transient {
                reason: err.to_string(),
            },
            AdapterError::Configuration { .. } | AdapterError::InvalidRequest { .. } => {
                Self::Other {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Capability the orchestrator consumes: one structured completion per call.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Human-readable provider and model description for logs.
    fn describe(&self) -> String;

    /// Produces a JSON object intended to match `shape`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderFailure`] classifying why no object was produced.
    async fn complete(&self, system: &str, user: &str, shape: OutputShape)
    -> ProviderResult<Value>;
}

/// Local backoff applied when the provider answers with a rate-limit error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    max_retries: u32,
    initial_backoff: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RateLimitPolicy {
    /// Creates a policy with `max_retries` extra tries after the first call.
    #[must_use]
    pub const fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    /// Number of extra tries after the first rate-limited call.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `retry` (zero based), preferring the
    /// provider's hint.
    #[must_use]
    pub fn delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| {
            self.initial_backoff
                .saturating_mul(2_u32.saturating_pow(retry))
        })
    }
}

/// [`ProviderAdapter`] that asks a [`ModelAdapter`] for schema-constrained JSON.
pub struct JsonCompletionProvider {
    adapter: Arc<dyn ModelAdapter>,
    sampling: Sampling,
    rate_limit: RateLimitPolicy,
}

impl fmt::Debug for JsonCompletionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCompletionProvider")
            .field("model", &self.adapter.identity().to_string())
            .field("sampling", &self.sampling)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}

impl JsonCompletionProvider {
    /// Wraps `adapter` with the default rate-limit policy.
    #[must_use]
    pub fn new(adapter: Arc<dyn ModelAdapter>) -> Self {
        Self {
            adapter,
            sampling: Sampling::default(),
            rate_limit: RateLimitPolicy::default(),
        }
    }

    /// Sets the temperature and output token budget sent with each call.
    #[must_use]
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Overrides the rate-limit backoff policy.
    #[must_use]
    pub fn with_rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = policy;
        self
    }

    async fn infer_text(&self, request: InferenceRequest) -> Result<String, AdapterError> {
        let mut stream = self.adapter.infer(request).await?;
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            text.push_str(&chunk.delta);
            if chunk.done {
                break;
            }
        }
        Ok(text)
    }
}

#[async_trait]
impl ProviderAdapter for JsonCompletionProvider {
    fn describe(&self) -> String {
        self.adapter.identity().to_string()
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        shape: OutputShape,
    ) -> ProviderResult<Value> {
        let request = InferenceRequest::new(system, user)?
            .with_sampling(self.sampling)
            .with_response_schema(response_schema(shape));

        let mut retry = 0;
        let text = loop {
            match self.infer_text(request.clone()).await {
                Ok(text) => break text,
                Err(AdapterError::RateLimited { retry_after })
                    if retry < self.rate_limit.max_retries =>
                {
                    let delay = self.rate_limit.delay(retry, retry_after);
                    retry += 1;
                    warn!(
                        provider = %self.describe(),
                        retry,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "rate limited, backing off"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err.into()),
            }
        };

        debug!(provider = %self.describe(), %shape, chars = text.len(), "completion received");
        parse_object(&text)
    }
}

/// Decodes a provider JSON object into `S`, normalising and validating it.
///
/// # Errors
///
/// Returns [`ProviderFailure::MalformedOutput`] when the value does not
/// decode or violates the shape's structural constraints.
pub fn decode_shape<S: StructuredShape>(value: Value) -> ProviderResult<S> {
    let mut decoded: S = serde_json::from_value(value)
        .map_err(|err| ProviderFailure::malformed(format!("{}: {err}", S::SHAPE)))?;
    decoded.normalize();
    decoded
        .validate_structure()
        .map_err(|err| ProviderFailure::malformed(err.to_string()))?;
    Ok(decoded)
}

fn parse_object(text: &str) -> ProviderResult<Value> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(ProviderFailure::malformed("empty response"));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|err| ProviderFailure::malformed(format!("invalid JSON: {err}")))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(ProviderFailure::malformed("response is not a JSON object"))
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop the info string (e.g. `json`) after the opening fence.
    let body = match rest.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with(['{', '[']) => body,
        Some(_) => rest,
        None => rest.find(['{', '[']).map_or("", |start| &rest[start..]),
    };
    body.trim()
}
