//! Bounded retry loop around the structured provider.

use std::num::NonZeroU32;
use std::sync::Arc;

use intake_adapters::{ProviderAdapter, ProviderFailure, decode_shape};
use intake_config::DEFAULT_MAX_ATTEMPTS;
use intake_guardrails::{GuardrailEngine, GuardrailVerdict, Refusal, SafeFallback, ViolationKind};
use intake_primitives::StructuredShape;
use intake_prompts::RenderedPrompt;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::state::{CompletionState, StateTracker};

/// Maximum number of provider attempts per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    max_attempts: NonZeroU32,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl AttemptPolicy {
    /// Creates a policy allowing `max_attempts` provider calls.
    #[must_use]
    pub const fn new(max_attempts: NonZeroU32) -> Self {
        Self { max_attempts }
    }

    /// Returns the attempt bound.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }
}

/// Why a single attempt did not produce an accepted result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    /// The provider failed or answered with the wrong structure.
    #[error(transparent)]
    Provider(#[from] ProviderFailure),

    /// The decoded result broke an output rule.
    #[error("output rejected ({kind}): {reason}")]
    Guardrail {
        /// Violated rule.
        kind: ViolationKind,
        /// Verdict message.
        reason: String,
    },
}

/// Why the certified fallback was returned instead of a model result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackCause {
    /// Input screening refused the request; the provider was never called.
    Refused(Refusal),
    /// Every attempt failed.
    Exhausted {
        /// Provider calls made.
        attempts: u32,
        /// Failure of the final attempt.
        last: AttemptFailure,
    },
}

/// Caller-visible outcome of a completion request.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome<S> {
    /// The model produced an accepted result.
    Completed {
        /// Accepted result.
        value: S,
        /// Attempt that produced it, starting at 1.
        attempts: u32,
    },
    /// The certified fallback was substituted.
    Fallback {
        /// Certified fallback value.
        value: S,
        /// Why it was substituted.
        cause: FallbackCause,
    },
    /// The caller cancelled; no value is produced.
    Cancelled {
        /// Provider calls started before cancellation.
        attempts: u32,
    },
}

impl<S> CompletionOutcome<S> {
    /// Outcome for a request refused during screening.
    #[must_use]
    pub fn refused(fallback: SafeFallback<S>, refusal: Refusal) -> Self {
        Self::Fallback {
            value: fallback.into_inner(),
            cause: FallbackCause::Refused(refusal),
        }
    }

    /// Borrows the result, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&S> {
        match self {
            Self::Completed { value, .. } | Self::Fallback { value, .. } => Some(value),
            Self::Cancelled { .. } => None,
        }
    }

    /// Returns the result, if any.
    #[must_use]
    pub fn into_value(self) -> Option<S> {
        match self {
            Self::Completed { value, .. } | Self::Fallback { value, .. } => Some(value),
            Self::Cancelled { .. } => None,
        }
    }

    /// Provider calls made for this request.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts, .. }
            | Self::Cancelled { attempts }
            | Self::Fallback {
                cause: FallbackCause::Exhausted { attempts, .. },
                ..
            } => *attempts,
            Self::Fallback {
                cause: FallbackCause::Refused(_),
                ..
            } => 0,
        }
    }

    /// Returns `true` when the fallback was substituted.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Returns `true` when the request was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the refusal when screening rejected the input.
    #[must_use]
    pub const fn refusal(&self) -> Option<&Refusal> {
        match self {
            Self::Fallback {
                cause: FallbackCause::Refused(refusal),
                ..
            } => Some(refusal),
            _ => None,
        }
    }
}

/// Drives provider attempts, output validation, and fallback substitution.
#[derive(Clone)]
pub struct CompletionOrchestrator {
    provider: Arc<dyn ProviderAdapter>,
    guardrails: Arc<GuardrailEngine>,
}

impl std::fmt::Debug for CompletionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionOrchestrator")
            .field("provider", &self.provider.describe())
            .field("patterns", &self.guardrails.pattern_version())
            .finish()
    }
}

impl CompletionOrchestrator {
    /// Creates an orchestrator over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn ProviderAdapter>, guardrails: Arc<GuardrailEngine>) -> Self {
        Self {
            provider,
            guardrails,
        }
    }

    /// Returns the guardrail engine.
    #[must_use]
    pub fn guardrails(&self) -> &GuardrailEngine {
        &self.guardrails
    }

    /// Screens every input in order, returning the first refusal.
    pub fn screen<'a, I>(&self, inputs: I) -> Option<Refusal>
    where
        I: IntoIterator<Item = &'a str>,
    {
        inputs
            .into_iter()
            .find_map(|input| self.guardrails.check_input(input))
    }

    /// Runs up to `policy.max_attempts()` provider calls for a screened prompt.
    ///
    /// Returns the first accepted result, the certified `fallback` once every
    /// attempt has failed, or [`CompletionOutcome::Cancelled`] when `cancel`
    /// fires. The provider is never called after cancellation.
    pub async fn complete<S: StructuredShape>(
        &self,
        prompt: &RenderedPrompt,
        policy: &AttemptPolicy,
        fallback: SafeFallback<S>,
        cancel: &CancelToken,
    ) -> CompletionOutcome<S> {
        debug_assert_eq!(prompt.shape, S::SHAPE);
        let max_attempts = policy.max_attempts();
        let mut tracker = StateTracker::new();
        let mut attempt = 0;

        let last = loop {
            if cancel.is_cancelled() {
                tracker.enter(CompletionState::Cancelled);
                info!(attempts = attempt, "request cancelled before provider call");
                return CompletionOutcome::Cancelled { attempts: attempt };
            }

            attempt += 1;
            tracker.enter(CompletionState::Calling(attempt));
            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracker.enter(CompletionState::Cancelled);
                    info!(attempts = attempt, "request cancelled during provider call");
                    return CompletionOutcome::Cancelled { attempts: attempt };
                }
                response = self.provider.complete(&prompt.system, &prompt.user, prompt.shape) => response,
            };

            let failure = match response {
                Ok(json) => {
                    tracker.enter(CompletionState::Validating(attempt));
                    match self.validate::<S>(json, attempt) {
                        Ok(value) => {
                            tracker.enter(CompletionState::Succeeded);
                            info!(attempt, shape = %S::SHAPE, "completion accepted");
                            return CompletionOutcome::Completed {
                                value,
                                attempts: attempt,
                            };
                        }
                        Err(failure) => failure,
                    }
                }
                Err(failure) => AttemptFailure::Provider(failure),
            };

            warn!(attempt, max_attempts, %failure, "completion attempt failed");
            if attempt >= max_attempts {
                break failure;
            }
            tracker.enter(CompletionState::Retrying(attempt));
        };

        tracker.enter(CompletionState::Exhausted);
        error!(
            attempts = attempt,
            shape = %S::SHAPE,
            last = %last,
            "completion attempts exhausted; returning safe fallback"
        );
        tracker.enter(CompletionState::Fallback);
        CompletionOutcome::Fallback {
            value: fallback.into_inner(),
            cause: FallbackCause::Exhausted {
                attempts: attempt,
                last,
            },
        }
    }

    fn validate<S: StructuredShape>(&self, json: Value, attempt: u32) -> Result<S, AttemptFailure> {
        let mut value = decode_shape::<S>(json)?;
        if value.force_review() {
            info!(attempt, "model cleared the staff review flag; forcing it on");
        }
        match self.guardrails.check_output(&value) {
            GuardrailVerdict::Accepted => Ok(value),
            GuardrailVerdict::Rejected { kind, reason } => {
                Err(AttemptFailure::Guardrail { kind, reason })
            }
        }
    }
}
