//! Core shared types for the student-support intake gateway.

#![warn(missing_docs, clippy::pedantic)]

mod category;
mod error;
mod ids;
mod requests;
mod results;
mod shape;

/// Fixed support category enumeration.
pub use category::Category;
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Correlation identifier attached to each gateway request.
pub use ids::RequestId;
/// Transport-free request payloads accepted by the call-site services.
pub use requests::{
    DraftReplyRequest, FollowupRequest, MessageSender, SummarizeRequest, TicketMessage,
    TriageRequest, Tone,
};
/// Concrete structured results returned by the model.
pub use results::{
    DraftReplyResult, FollowupResult, HandoffRecommendation, Priority, Sentiment, SummaryResult,
    TicketDraft, TriageResult,
};
/// Output shape identifiers and the policy-field capability every shape exposes.
pub use shape::{OutputShape, PolicyFields, StructuredShape, TextField, TextFields};
