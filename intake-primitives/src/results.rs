//! Structured results produced by the model for each output shape.

use serde::{Deserialize, Serialize};

use crate::shape::{OutputShape, PolicyFields, StructuredShape, TextField, TextFields};
use crate::{Error, Result};

/// Suggested priority of a drafted ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// Can wait for normal processing.
    Low,
    /// Default priority.
    Medium,
    /// Blocking the student right now.
    High,
}

impl Priority {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// Next step recommended after triage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandoffRecommendation {
    /// Show knowledge base articles before opening a ticket.
    ArticleFirst,
    /// Open a ticket immediately.
    CreateTicket,
}

/// Overall tone of a ticket conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    /// Student is satisfied.
    Positive,
    /// No strong signal.
    Neutral,
    /// Student is unhappy.
    Negative,
    /// Needs immediate attention.
    Urgent,
}

/// Draft ticket carried by triage and follow-up results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketDraft {
    /// Brief summary of the issue.
    pub summary: String,
    /// Detailed description of the issue.
    pub description: String,
    /// Suggested priority.
    pub priority: Priority,
}

impl TicketDraft {
    fn validate(&self, shape: OutputShape) -> Result<()> {
        check_len(shape, "ticketDraft.summary", &self.summary, 5, Some(200))?;
        check_len(shape, "ticketDraft.description", &self.description, 10, None)
    }

    fn text_fields(&self) -> TextFields<'_> {
        TextFields::new()
            .field("summary", &self.summary)
            .field("description", &self.description)
    }
}

/// Result of the initial intake triage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResult {
    /// One of the fixed support categories.
    pub category: String,
    /// Specific service within the category.
    pub service: String,
    /// Up to four clarifying questions for the student.
    #[serde(default)]
    pub clarifying_questions: Vec<String>,
    /// Up to three knowledge base article ids.
    #[serde(default)]
    pub suggested_article_ids: Vec<String>,
    /// Drafted ticket.
    pub ticket_draft: TicketDraft,
    /// Confidence score in `[0, 1]`.
    pub confidence: f64,
    /// Recommended next step.
    pub handoff_recommendation: HandoffRecommendation,
}

impl PolicyFields for TriageResult {
    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn confidence(&self) -> Option<f64> {
        Some(self.confidence)
    }

    fn text_fields(&self) -> Vec<TextField<'_>> {
        TextFields::new()
            .field("category", &self.category)
            .field("service", &self.service)
            .list("clarifyingQuestions", &self.clarifying_questions)
            .list("suggestedArticleIds", &self.suggested_article_ids)
            .nested("ticketDraft", self.ticket_draft.text_fields())
            .into_vec()
    }
}

impl StructuredShape for TriageResult {
    const SHAPE: OutputShape = OutputShape::IntakeTriage;

    fn normalize(&mut self) {
        self.clarifying_questions = trimmed_non_blank(&self.clarifying_questions);
    }

    fn validate_structure(&self) -> Result<()> {
        check_len(Self::SHAPE, "service", &self.service, 1, Some(100))?;
        check_count(Self::SHAPE, "clarifyingQuestions", &self.clarifying_questions, 4)?;
        check_count(Self::SHAPE, "suggestedArticleIds", &self.suggested_article_ids, 3)?;
        self.ticket_draft.validate(Self::SHAPE)
    }
}

/// Refined triage after the student answered clarifying questions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupResult {
    /// Possibly refined category.
    pub category: String,
    /// Possibly refined service.
    pub service: String,
    /// Refined ticket draft.
    pub ticket_draft: TicketDraft,
    /// Updated confidence score.
    pub confidence: f64,
    /// Additional context discovered from the answers.
    #[serde(default)]
    pub additional_context: Option<String>,
}

impl PolicyFields for FollowupResult {
    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn confidence(&self) -> Option<f64> {
        Some(self.confidence)
    }

    fn text_fields(&self) -> Vec<TextField<'_>> {
        TextFields::new()
            .field("category", &self.category)
            .field("service", &self.service)
            .nested("ticketDraft", self.ticket_draft.text_fields())
            .optional("additionalContext", self.additional_context.as_deref())
            .into_vec()
    }
}

impl StructuredShape for FollowupResult {
    const SHAPE: OutputShape = OutputShape::IntakeFollowup;

    fn validate_structure(&self) -> Result<()> {
        check_len(Self::SHAPE, "service", &self.service, 1, Some(100))?;
        self.ticket_draft.validate(Self::SHAPE)
    }
}

/// Staff-facing summary of a ticket conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    /// Concise summary.
    pub summary: String,
    /// Up to five key points.
    #[serde(default)]
    pub key_points: Vec<String>,
    /// Overall sentiment, if determined.
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
}

impl PolicyFields for SummaryResult {
    fn text_fields(&self) -> Vec<TextField<'_>> {
        TextFields::new()
            .field("summary", &self.summary)
            .list("keyPoints", &self.key_points)
            .into_vec()
    }
}

impl StructuredShape for SummaryResult {
    const SHAPE: OutputShape = OutputShape::Summarize;

    fn validate_structure(&self) -> Result<()> {
        check_len(Self::SHAPE, "summary", &self.summary, 20, Some(1000))?;
        check_count(Self::SHAPE, "keyPoints", &self.key_points, 5)
    }
}

/// Staff-facing draft reply; always subject to human review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftReplyResult {
    /// Drafted reply text.
    pub draft: String,
    /// Up to four suggested next steps.
    #[serde(default)]
    pub suggested_next_steps: Vec<String>,
    /// Must be `true`; forced on before validation.
    #[serde(default = "default_requires_review")]
    pub requires_staff_review: bool,
}

const fn default_requires_review() -> bool {
    true
}

impl PolicyFields for DraftReplyResult {
    fn requires_review(&self) -> Option<bool> {
        Some(self.requires_staff_review)
    }

    fn text_fields(&self) -> Vec<TextField<'_>> {
        TextFields::new()
            .field("draft", &self.draft)
            .list("suggestedNextSteps", &self.suggested_next_steps)
            .into_vec()
    }
}

impl StructuredShape for DraftReplyResult {
    const SHAPE: OutputShape = OutputShape::DraftReply;

    fn normalize(&mut self) {
        self.draft = self.draft.trim().to_owned();
    }

    fn validate_structure(&self) -> Result<()> {
        check_len(Self::SHAPE, "draft", &self.draft, 10, Some(2000))?;
        check_count(Self::SHAPE, "suggestedNextSteps", &self.suggested_next_steps, 4)
    }

    fn force_review(&mut self) -> bool {
        let changed = !self.requires_staff_review;
        self.requires_staff_review = true;
        changed
    }
}

fn check_len(
    shape: OutputShape,
    field: &str,
    value: &str,
    min: usize,
    max: Option<usize>,
) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(Error::structure(
            shape,
            format!("`{field}` must be at least {min} characters (got {len})"),
        ));
    }
    if let Some(max) = max.filter(|max| len > *max) {
        return Err(Error::structure(
            shape,
            format!("`{field}` must be at most {max} characters (got {len})"),
        ));
    }
    Ok(())
}

fn check_count(shape: OutputShape, field: &str, items: &[String], max: usize) -> Result<()> {
    if items.len() > max {
        return Err(Error::structure(
            shape,
            format!("`{field}` allows at most {max} entries (got {})", items.len()),
        ));
    }
    Ok(())
}

fn trimmed_non_blank(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
