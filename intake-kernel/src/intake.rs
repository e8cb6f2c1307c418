//! Student-facing intake call-sites: triage and follow-up refinement.

use std::collections::BTreeMap;

use intake_primitives::{
    Category, FollowupRequest, FollowupResult, HandoffRecommendation, Priority, StructuredShape,
    TicketDraft, TriageRequest, TriageResult,
};
use intake_prompts::Variables;
use serde_json::Value;
use tracing::info;

use crate::cancel::CancelToken;
use crate::orchestrator::CompletionOutcome;
use crate::pipeline::{CallSite, Pipeline, PipelineError, PipelineResult};

/// Template rendered by [`Pipeline::triage`].
pub const TRIAGE_TEMPLATE: &str = "intake_triage";
/// Template rendered by [`Pipeline::followup`].
pub const FOLLOWUP_TEMPLATE: &str = "intake_followup";

const FOLLOWUP_FALLBACK_NOTE: &str = "Automated refinement was unavailable. \
     Original triage result preserved for staff review.";

impl Pipeline {
    /// Triages a student's free-form description into a ticket draft.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`](crate::PipelineError) for template or
    /// fallback defects. Provider failures end in the fallback instead.
    pub async fn triage(
        &self,
        request: &TriageRequest,
        cancel: &CancelToken,
    ) -> PipelineResult<CompletionOutcome<TriageResult>> {
        info!(
            preview = %self.guardrails().redacted_preview(&request.text),
            "intake triage request"
        );

        let variables = Variables::from([
            ("text".to_owned(), request.text.clone()),
            (
                "user_context_section".to_owned(),
                user_context_section(request.user_context.as_ref()),
            ),
        ]);

        self.run(
            CallSite {
                name: "intake_triage",
                template: TRIAGE_TEMPLATE,
                screened: vec![request.text.as_str()],
                variables,
                fallback: triage_fallback(),
            },
            cancel,
        )
        .await
    }

    /// Refines a triage result using the student's answers.
    ///
    /// Every answer is screened; a single refusal returns the fallback.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] when the original triage
    /// result violates its shape, since the fallback is built from it.
    /// Otherwise see [`Pipeline::triage`].
    pub async fn followup(
        &self,
        request: &FollowupRequest,
        cancel: &CancelToken,
    ) -> PipelineResult<CompletionOutcome<FollowupResult>> {
        let original = &request.triage_result;
        info!(
            answers = request.answers.len(),
            preview = %self.guardrails().redacted_preview(&request.answers.join(" | ")),
            "intake follow-up request"
        );
        original
            .validate_structure()
            .map_err(|source| PipelineError::InvalidRequest {
                field: "triageResult",
                source,
            })?;

        let variables = Variables::from([
            ("original_category".to_owned(), original.category.clone()),
            ("original_service".to_owned(), original.service.clone()),
            (
                "original_summary".to_owned(),
                original.ticket_draft.summary.clone(),
            ),
            (
                "original_description".to_owned(),
                original.ticket_draft.description.clone(),
            ),
            (
                "original_priority".to_owned(),
                original.ticket_draft.priority.as_str().to_owned(),
            ),
            (
                "original_confidence".to_owned(),
                original.confidence.to_string(),
            ),
            (
                "questions_and_answers".to_owned(),
                questions_and_answers(&original.clarifying_questions, &request.answers),
            ),
        ]);

        self.run(
            CallSite {
                name: "intake_followup",
                template: FOLLOWUP_TEMPLATE,
                screened: request.answers.iter().map(String::as_str).collect(),
                variables,
                fallback: followup_fallback(original),
            },
            cancel,
        )
        .await
    }
}

fn triage_fallback() -> TriageResult {
    TriageResult {
        category: Category::StudentServices.as_str().to_owned(),
        service: "General Inquiry".to_owned(),
        clarifying_questions: Vec::new(),
        suggested_article_ids: Vec::new(),
        ticket_draft: TicketDraft {
            summary: "Student support request requiring staff review".to_owned(),
            description: "A student has submitted a support request. \
                 The automated triage system was unable to classify it at this time. \
                 Please review and route this ticket to the appropriate department."
                .to_owned(),
            priority: Priority::Medium,
        },
        confidence: 0.0,
        handoff_recommendation: HandoffRecommendation::CreateTicket,
    }
}

fn followup_fallback(original: &TriageResult) -> FollowupResult {
    FollowupResult {
        category: original.category.clone(),
        service: original.service.clone(),
        ticket_draft: original.ticket_draft.clone(),
        confidence: 0.0,
        additional_context: Some(FOLLOWUP_FALLBACK_NOTE.to_owned()),
    }
}

fn user_context_section(context: Option<&BTreeMap<String, Value>>) -> String {
    let Some(context) = context.filter(|context| !context.is_empty()) else {
        return String::new();
    };

    let mut lines = vec!["<user_context>".to_owned()];
    lines.extend(context.iter().map(|(key, value)| match value {
        Value::String(text) => format!("  {key}: {text}"),
        other => format!("  {key}: {other}"),
    }));
    lines.push("</user_context>".to_owned());
    lines.join("\n")
}

fn questions_and_answers(questions: &[String], answers: &[String]) -> String {
    answers
        .iter()
        .enumerate()
        .map(|(index, answer)| {
            let number = index + 1;
            let question = questions
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("Question {number}"));
            format!("Q{number}: {question}\nA{number}: {answer}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
