//! Shared plumbing for the call-site services.

use std::sync::Arc;

use intake_adapters::ProviderAdapter;
use intake_guardrails::{GuardrailEngine, GuardrailError};
use intake_primitives::{Error as ShapeError, OutputShape, RequestId, StructuredShape};
use intake_prompts::{
    MissingVariableError, RenderedPrompt, TemplateNotFound, TemplateStore, Variables,
};
use thiserror::Error;
use tracing::{Instrument, info, info_span, warn};

use crate::cancel::CancelToken;
use crate::orchestrator::{AttemptPolicy, CompletionOrchestrator, CompletionOutcome};

/// Result alias for call-site services.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Configuration or caller defects surfaced by a call-site.
///
/// Provider failures never appear here; they end in a fallback.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The call-site's template is not loaded.
    #[error(transparent)]
    TemplateNotFound(#[from] TemplateNotFound),

    /// The template needs a variable the call-site did not supply.
    #[error(transparent)]
    MissingVariables(#[from] MissingVariableError),

    /// The template declares a different output shape than the call-site decodes.
    #[error("template `{template}` declares {declared} but the call site expects {expected}")]
    ShapeMismatch {
        /// Template name.
        template: String,
        /// Shape declared by the template.
        declared: OutputShape,
        /// Shape the call-site decodes.
        expected: OutputShape,
    },

    /// A caller-supplied structured value violates its shape.
    #[error("invalid `{field}` in request: {source}")]
    InvalidRequest {
        /// Request field holding the value.
        field: &'static str,
        /// Structural violation.
        #[source]
        source: ShapeError,
    },

    /// The call-site's fallback failed validation.
    #[error(transparent)]
    Guardrail(#[from] GuardrailError),
}

/// One completion request as assembled by a call-site.
pub(crate) struct CallSite<'a, S> {
    pub(crate) name: &'static str,
    pub(crate) template: &'static str,
    pub(crate) screened: Vec<&'a str>,
    pub(crate) variables: Variables,
    pub(crate) fallback: S,
}

/// Template store, guardrails, and orchestrator shared by every call-site.
#[derive(Debug, Clone)]
pub struct Pipeline {
    templates: Arc<TemplateStore>,
    orchestrator: CompletionOrchestrator,
    attempts: AttemptPolicy,
}

impl Pipeline {
    /// Creates a pipeline with the default attempt policy.
    #[must_use]
    pub fn new(
        templates: Arc<TemplateStore>,
        provider: Arc<dyn ProviderAdapter>,
        guardrails: Arc<GuardrailEngine>,
    ) -> Self {
        Self {
            templates,
            orchestrator: CompletionOrchestrator::new(provider, guardrails),
            attempts: AttemptPolicy::default(),
        }
    }

    /// Overrides the attempt policy.
    #[must_use]
    pub fn with_attempt_policy(mut self, attempts: AttemptPolicy) -> Self {
        self.attempts = attempts;
        self
    }

    /// Returns the template store.
    #[must_use]
    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Returns the orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &CompletionOrchestrator {
        &self.orchestrator
    }

    /// Returns the guardrail engine.
    #[must_use]
    pub fn guardrails(&self) -> &GuardrailEngine {
        self.orchestrator.guardrails()
    }

    /// Returns the attempt policy.
    #[must_use]
    pub const fn attempt_policy(&self) -> AttemptPolicy {
        self.attempts
    }

    /// Resolves `name` and renders it, checking the declared shape.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TemplateNotFound`], [`PipelineError::ShapeMismatch`],
    /// or [`PipelineError::MissingVariables`].
    pub fn prepare<S: StructuredShape>(
        &self,
        name: &str,
        variables: &Variables,
    ) -> PipelineResult<RenderedPrompt> {
        let template = self.templates.get(name)?;
        if template.output_shape() != S::SHAPE {
            return Err(PipelineError::ShapeMismatch {
                template: name.to_owned(),
                declared: template.output_shape(),
                expected: S::SHAPE,
            });
        }
        Ok(template.prepare(variables)?)
    }

    pub(crate) async fn run<S: StructuredShape>(
        &self,
        call: CallSite<'_, S>,
        cancel: &CancelToken,
    ) -> PipelineResult<CompletionOutcome<S>> {
        let request_id = RequestId::random();
        let span = info_span!("completion", call_site = call.name, %request_id);
        self.run_inner(call, cancel).instrument(span).await
    }

    async fn run_inner<S: StructuredShape>(
        &self,
        call: CallSite<'_, S>,
        cancel: &CancelToken,
    ) -> PipelineResult<CompletionOutcome<S>> {
        let fallback = self.guardrails().certify(call.fallback)?;

        if let Some(refusal) = self.orchestrator.screen(call.screened) {
            warn!(refusal = %refusal.kind(), "input refused; returning safe fallback");
            return Ok(CompletionOutcome::refused(fallback, refusal));
        }

        let prompt = self.prepare::<S>(call.template, &call.variables)?;
        let outcome = self
            .orchestrator
            .complete(&prompt, &self.attempts, fallback, cancel)
            .await;

        info!(
            attempts = outcome.attempts(),
            fallback = outcome.is_fallback(),
            cancelled = outcome.is_cancelled(),
            "call site finished"
        );
        Ok(outcome)
    }
}
