//! Guardrail configuration errors.

use thiserror::Error;

/// Result alias for guardrail construction and certification.
pub type GuardrailResult<T> = Result<T, GuardrailError>;

/// Defects in guardrail configuration or caller-supplied fallbacks.
///
/// Business outcomes such as refusals and rejected outputs are never errors;
/// see [`crate::Refusal`] and [`crate::GuardrailVerdict`].
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// A pattern in the library failed to compile.
    #[error("invalid guardrail pattern in group `{group}`")]
    InvalidPattern {
        /// Pattern group name.
        group: &'static str,
        /// Compiler error.
        #[source]
        source: regex::Error,
    },

    /// A fallback value failed output validation.
    #[error("fallback value failed guardrail validation: {reason}")]
    UnsafeFallback {
        /// Validation failure.
        reason: String,
    },
}
