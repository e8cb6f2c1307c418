//! Deterministic guardrails for model-backed student support.
//!
//! The [`GuardrailEngine`] screens user input before a provider is called,
//! validates structured results before they are trusted, certifies fallback
//! values, and redacts personal data from text destined for logs. All rules
//! come from a versioned, statically compiled [`PatternLibrary`].

#![warn(missing_docs, clippy::pedantic)]

pub mod engine;
pub mod error;
pub mod patterns;
pub mod refusal;
pub mod verdict;

pub use engine::{GuardrailEngine, PREVIEW_CHARS, SafeFallback};
pub use error::{GuardrailError, GuardrailResult};
pub use patterns::{PATTERN_LIBRARY_VERSION, PatternLibrary};
pub use refusal::{
    GIBBERISH_MESSAGE, HARMFUL_MESSAGE, INJECTION_MESSAGE, NON_STANDARD_TEXT_MESSAGE, Refusal,
    RefusalKind, SCOPE_REDIRECT_MESSAGE, TOO_SHORT_MESSAGE,
};
pub use verdict::{GuardrailVerdict, ViolationKind};
