//! Completion orchestration and call-site services.
//!
//! A [`Pipeline`] owns the template store, the guardrail engine, and a
//! [`CompletionOrchestrator`] over one structured provider. Each call-site
//! (triage, follow-up, summarize, draft reply) renders its template, screens
//! its input, and lets the orchestrator retry until a result passes the
//! output checks or the certified fallback is returned.

#![warn(missing_docs, clippy::pedantic)]

mod assist;
mod cancel;
mod intake;
mod orchestrator;
mod pipeline;
mod state;

pub use assist::{DRAFT_REPLY_TEMPLATE, SUMMARIZE_TEMPLATE};
pub use cancel::CancelToken;
pub use intake::{FOLLOWUP_TEMPLATE, TRIAGE_TEMPLATE};
pub use orchestrator::{
    AttemptFailure, AttemptPolicy, CompletionOrchestrator, CompletionOutcome, FallbackCause,
};
pub use pipeline::{Pipeline, PipelineError, PipelineResult};
pub use state::CompletionState;
