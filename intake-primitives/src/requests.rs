//! Request payloads accepted by the call-site services.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::results::TriageResult;

/// Initial intake request: the student's free-form description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageRequest {
    /// Student's description of the issue.
    pub text: String,
    /// Optional context about the user (role, program, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_context: Option<BTreeMap<String, Value>>,
}

impl TriageRequest {
    /// Creates a request without user context.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_context: None,
        }
    }

    /// Adds a user context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.user_context
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Follow-up request carrying the student's answers to clarifying questions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupRequest {
    /// Original triage result.
    pub triage_result: TriageResult,
    /// Answers, in question order.
    pub answers: Vec<String>,
}

/// Author of a ticket message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageSender {
    /// Message written by the student.
    Student,
    /// Message written by staff.
    Staff,
}

impl fmt::Display for MessageSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Student => "STUDENT",
            Self::Staff => "STAFF",
        })
    }
}

/// A single message in a ticket conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketMessage {
    /// Who sent the message.
    pub sender: MessageSender,
    /// Message content.
    pub content: String,
    /// ISO timestamp, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TicketMessage {
    /// Creates a message without a timestamp.
    #[must_use]
    pub fn new(sender: MessageSender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            timestamp: None,
        }
    }

    /// Sets the message timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// Request to summarize a ticket conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    /// Ticket identifier.
    pub ticket_id: String,
    /// Conversation messages.
    pub messages: Vec<TicketMessage>,
}

/// Desired tone of a drafted reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tone {
    /// Neutral and formal.
    #[default]
    Professional,
    /// Warm and approachable.
    Friendly,
    /// Acknowledges the student's frustration.
    Empathetic,
    /// As short as possible.
    Concise,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Professional => "PROFESSIONAL",
            Self::Friendly => "FRIENDLY",
            Self::Empathetic => "EMPATHETIC",
            Self::Concise => "CONCISE",
        })
    }
}

/// Request to draft a staff reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftReplyRequest {
    /// Ticket identifier.
    pub ticket_id: String,
    /// Conversation messages.
    pub messages: Vec<TicketMessage>,
    /// Desired tone; defaults to professional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    /// Extra instructions from staff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}
