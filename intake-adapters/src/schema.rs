//! JSON schemas sent to providers for each output shape.
//!
//! Schemas follow the strict structured-output dialect: every object closes
//! `additionalProperties`, every property is listed as required, and optional
//! values are nullable. Length and list bounds are stated in descriptions and
//! enforced when the response is decoded.

use intake_primitives::{Category, OutputShape};
use serde_json::{Value, json};

use crate::traits::ResponseSchema;

/// Returns the named schema for `shape`.
#[must_use]
pub fn response_schema(shape: OutputShape) -> ResponseSchema {
    ResponseSchema::new(shape.identifier(), schema_document(shape))
}

/// Returns the schema document for `shape`.
#[must_use]
pub fn schema_document(shape: OutputShape) -> Value {
    match shape {
        OutputShape::IntakeTriage => object(&[
            ("category", category()),
            ("service", string("Specific service within the category, at most 100 characters")),
            (
                "clarifyingQuestions",
                string_list("Up to four clarifying questions for the student"),
            ),
            (
                "suggestedArticleIds",
                string_list("Up to three knowledge base article ids"),
            ),
            ("ticketDraft", ticket_draft()),
            ("confidence", confidence()),
            (
                "handoffRecommendation",
                json!({ "type": "string", "enum": ["ARTICLE_FIRST", "CREATE_TICKET"] }),
            ),
        ]),
        OutputShape::IntakeFollowup => object(&[
            ("category", category()),
            ("service", string("Possibly refined service, at most 100 characters")),
            ("ticketDraft", ticket_draft()),
            ("confidence", confidence()),
            (
                "additionalContext",
                nullable_string("Additional context learned from the answers"),
            ),
        ]),
        OutputShape::Summarize => object(&[
            ("summary", string("Concise summary, 20 to 1000 characters")),
            ("keyPoints", string_list("Up to five key points")),
            (
                "sentiment",
                json!({
                    "type": ["string", "null"],
                    "enum": ["POSITIVE", "NEUTRAL", "NEGATIVE", "URGENT", null],
                }),
            ),
        ]),
        OutputShape::DraftReply => object(&[
            ("draft", string("Reply text for staff to review, 10 to 2000 characters")),
            ("suggestedNextSteps", string_list("Up to four next steps for staff")),
            (
                "requiresStaffReview",
                json!({ "type": "boolean", "description": "Always true" }),
            ),
        ]),
    }
}

fn object(properties: &[(&str, Value)]) -> Value {
    let required: Vec<&str> = properties.iter().map(|(name, _)| *name).collect();
    let properties: serde_json::Map<String, Value> = properties
        .iter()
        .map(|(name, schema)| ((*name).to_owned(), schema.clone()))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn nullable_string(description: &str) -> Value {
    json!({ "type": ["string", "null"], "description": description })
}

fn string_list(description: &str) -> Value {
    json!({ "type": "array", "items": { "type": "string" }, "description": description })
}

fn category() -> Value {
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    json!({ "type": "string", "enum": labels })
}

fn confidence() -> Value {
    json!({ "type": "number", "description": "Confidence between 0.0 and 1.0" })
}

fn ticket_draft() -> Value {
    object(&[
        ("summary", string("Brief summary, 5 to 200 characters")),
        ("description", string("Detailed description, at least 10 characters")),
        (
            "priority",
            json!({ "type": "string", "enum": ["LOW", "MEDIUM", "HIGH"] }),
        ),
    ])
}
