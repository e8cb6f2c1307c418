//! Text-level contract between the gateway and a hosted model.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use thiserror::Error;

/// Result alias used by model adapters.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Streaming response emitted by [`ModelAdapter::infer`].
pub type AdapterStream = Pin<Box<dyn Stream<Item = AdapterResult<InferenceChunk>> + Send>>;

/// Failures reported by a model adapter.
///
/// [`ProviderFailure`](crate::ProviderFailure) classifies these for the
/// orchestrator; rate limits are retried locally first.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Missing credential or unusable endpoint.
    #[error("adapter not configured: {reason}")]
    Configuration {
        /// What is misconfigured.
        reason: String,
    },

    /// The request could not be encoded for the provider.
    #[error("invalid inference request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected locally.
        reason: String,
    },

    /// Network failure or timeout.
    #[error("adapter transport error: {reason}")]
    Transport {
        /// Additional context.
        reason: String,
    },

    /// HTTP 429 from the provider.
    #[error("adapter rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Delay from the provider's `retry-after` header, when present.
        retry_after: Option<Duration>,
    },

    /// Non-success status or an undecodable envelope.
    #[error("adapter response error: {reason}")]
    Response {
        /// Additional context.
        reason: String,
    },
}

impl AdapterError {
    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for response failures.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}

/// Provider label and model an adapter is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelIdentity {
    provider: &'static str,
    model: String,
}

impl ModelIdentity {
    /// Creates an identity, e.g. `("openai", "gpt-4o")`.
    #[must_use]
    pub fn new(provider: &'static str, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Returns the provider label.
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Returns the model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Sampling settings sent with every call. `None` leaves the provider default.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sampling {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Output token budget.
    pub max_output_tokens: Option<u32>,
}

/// JSON schema the provider must constrain its output to.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseSchema {
    /// Schema name reported to the provider.
    pub name: String,
    /// JSON schema document.
    pub schema: Value,
}

impl ResponseSchema {
    /// Creates a named schema.
    #[must_use]
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A single-turn request: system instructions plus one rendered user prompt.
///
/// Adapters map the system text to the provider's native slot (a leading
/// system message for `OpenAI`, `systemInstruction` for Gemini).
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceRequest {
    system: String,
    user: String,
    sampling: Sampling,
    response_schema: Option<ResponseSchema>,
}

impl InferenceRequest {
    /// Creates a request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] when the user text is blank.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> AdapterResult<Self> {
        let user = user.into();
        if user.trim().is_empty() {
            return Err(AdapterError::invalid_request("user prompt is empty"));
        }

        Ok(Self {
            system: system.into(),
            user,
            sampling: Sampling::default(),
            response_schema: None,
        })
    }

    /// Applies sampling settings.
    #[must_use]
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Requests JSON output constrained to `schema`.
    #[must_use]
    pub fn with_response_schema(mut self, schema: ResponseSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Returns the system text, if any.
    #[must_use]
    pub fn system(&self) -> Option<&str> {
        Some(self.system.as_str()).filter(|system| !system.trim().is_empty())
    }

    /// Returns the user prompt.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the sampling settings.
    #[must_use]
    pub const fn sampling(&self) -> Sampling {
        self.sampling
    }

    /// Returns the requested response schema.
    #[must_use]
    pub const fn response_schema(&self) -> Option<&ResponseSchema> {
        self.response_schema.as_ref()
    }
}

/// Piece of model text. The last chunk of a response sets `done`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InferenceChunk {
    /// Text delta.
    pub delta: String,
    /// Whether the generation is complete.
    pub done: bool,
}

impl InferenceChunk {
    /// Creates a chunk.
    #[must_use]
    pub fn new(delta: impl Into<String>, done: bool) -> Self {
        Self {
            delta: delta.into(),
            done,
        }
    }
}

/// A hosted model reachable over HTTP.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Returns the provider and model this adapter calls.
    fn identity(&self) -> &ModelIdentity;

    /// Sends the request, returning the model text as a stream of chunks.
    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream>;
}
