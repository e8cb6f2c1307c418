//! Model provider adapters for the intake gateway.
//!
//! [`traits`] defines the text-level [`ModelAdapter`](traits::ModelAdapter)
//! implemented by the `OpenAI` and Gemini clients. [`structured`] layers the
//! JSON completion capability the orchestrator consumes on top of any model
//! adapter, and [`factory`] selects the concrete provider from configuration.

#![warn(missing_docs, clippy::pedantic)]

pub mod factory;
pub mod gemini;
pub mod openai;
pub mod schema;
pub mod structured;
pub mod traits;

mod http_client;

pub use factory::provider_from_config;
pub use structured::{
    JsonCompletionProvider, ProviderAdapter, ProviderFailure, ProviderResult, RateLimitPolicy,
    decode_shape,
};
