//! Staff-facing assist call-sites: conversation summaries and reply drafts.
//!
//! Staff input is not screened; output checks still apply.

use intake_primitives::{
    DraftReplyRequest, DraftReplyResult, SummarizeRequest, SummaryResult, TicketMessage,
};
use intake_prompts::Variables;
use tracing::info;

use crate::cancel::CancelToken;
use crate::orchestrator::CompletionOutcome;
use crate::pipeline::{CallSite, Pipeline, PipelineResult};

/// Template rendered by [`Pipeline::summarize`].
pub const SUMMARIZE_TEMPLATE: &str = "assist_summarize";
/// Template rendered by [`Pipeline::draft_reply`].
pub const DRAFT_REPLY_TEMPLATE: &str = "assist_draft_reply";

/// Longest ticket id quoted verbatim in the summary fallback.
const FALLBACK_TICKET_ID_CHARS: usize = 64;

impl Pipeline {
    /// Summarizes a ticket conversation.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`](crate::PipelineError) for template or
    /// fallback defects.
    pub async fn summarize(
        &self,
        request: &SummarizeRequest,
        cancel: &CancelToken,
    ) -> PipelineResult<CompletionOutcome<SummaryResult>> {
        info!(
            ticket_id = %request.ticket_id,
            messages = request.messages.len(),
            "assist summarize request"
        );

        let variables = Variables::from([
            ("ticket_id".to_owned(), request.ticket_id.clone()),
            ("messages".to_owned(), transcript(&request.messages)),
        ]);

        self.run(
            CallSite {
                name: "assist_summarize",
                template: SUMMARIZE_TEMPLATE,
                screened: Vec::new(),
                variables,
                fallback: summary_fallback(request),
            },
            cancel,
        )
        .await
    }

    /// Drafts a reply for staff to review before sending.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::summarize`].
    pub async fn draft_reply(
        &self,
        request: &DraftReplyRequest,
        cancel: &CancelToken,
    ) -> PipelineResult<CompletionOutcome<DraftReplyResult>> {
        let tone = request.tone.unwrap_or_default();
        info!(
            ticket_id = %request.ticket_id,
            %tone,
            messages = request.messages.len(),
            "assist draft-reply request"
        );

        let variables = Variables::from([
            ("ticket_id".to_owned(), request.ticket_id.clone()),
            ("tone".to_owned(), tone.to_string()),
            ("messages".to_owned(), transcript(&request.messages)),
            (
                "additional_context_section".to_owned(),
                additional_context_section(request.context.as_deref()),
            ),
        ]);

        self.run(
            CallSite {
                name: "assist_draft_reply",
                template: DRAFT_REPLY_TEMPLATE,
                screened: Vec::new(),
                variables,
                fallback: draft_reply_fallback(),
            },
            cancel,
        )
        .await
    }
}

fn transcript(messages: &[TicketMessage]) -> String {
    messages
        .iter()
        .map(|message| match &message.timestamp {
            Some(timestamp) => format!("[{}] [{timestamp}]: {}", message.sender, message.content),
            None => format!("[{}]: {}", message.sender, message.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn additional_context_section(context: Option<&str>) -> String {
    match context {
        Some(context) if !context.is_empty() => {
            format!("<additional_context>\n{context}\n</additional_context>")
        }
        _ => String::new(),
    }
}

fn summary_fallback(request: &SummarizeRequest) -> SummaryResult {
    let mut ticket_id: String = request
        .ticket_id
        .chars()
        .take(FALLBACK_TICKET_ID_CHARS)
        .collect();
    if ticket_id.len() < request.ticket_id.len() {
        ticket_id.push_str("...");
    }
    SummaryResult {
        summary: format!(
            "Automated summary unavailable for ticket {ticket_id}. Please review the {} message(s) directly.",
            request.messages.len()
        ),
        key_points: Vec::new(),
        sentiment: None,
    }
}

fn draft_reply_fallback() -> DraftReplyResult {
    DraftReplyResult {
        draft: "Thank you for contacting Student Services. We have received your message \
                and a staff member will review your request and respond shortly."
            .to_owned(),
        suggested_next_steps: vec![
            "Review the ticket conversation in full before sending".to_owned(),
            "Route to the appropriate department if needed".to_owned(),
        ],
        requires_staff_review: true,
    }
}
