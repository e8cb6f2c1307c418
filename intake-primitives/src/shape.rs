//! Output shape identifiers and the capabilities every structured result exposes.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Closed set of structured result schemas the gateway knows how to validate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputShape {
    /// Initial intake triage decision.
    #[serde(rename = "IntakeTriageResponse")]
    IntakeTriage,
    /// Triage refinement after clarifying answers.
    #[serde(rename = "IntakeFollowupResponse")]
    IntakeFollowup,
    /// Staff-facing conversation summary.
    #[serde(rename = "SummarizeResponse")]
    Summarize,
    /// Staff-facing draft reply.
    #[serde(rename = "DraftReplyResponse")]
    DraftReply,
}

impl OutputShape {
    /// Every known shape.
    pub const ALL: [Self; 4] = [
        Self::IntakeTriage,
        Self::IntakeFollowup,
        Self::Summarize,
        Self::DraftReply,
    ];

    /// Returns the identifier used in template documents and provider schemas.
    #[must_use]
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::IntakeTriage => "IntakeTriageResponse",
            Self::IntakeFollowup => "IntakeFollowupResponse",
            Self::Summarize => "SummarizeResponse",
            Self::DraftReply => "DraftReplyResponse",
        }
    }

    /// Resolves an identifier from the closed set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownShape`] for identifiers outside the set.
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|shape| shape.identifier() == identifier)
            .ok_or_else(|| Error::UnknownShape {
                identifier: identifier.to_owned(),
            })
    }
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for OutputShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_identifier(s)
    }
}

/// A text-valued field exposed for policy scanning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextField<'a> {
    /// Dotted/indexed path of the field, e.g. `ticketDraft.summary` or `keyPoints[1]`.
    pub path: String,
    /// Field content.
    pub text: &'a str,
}

/// Collects the non-blank text fields of a structured value.
#[derive(Debug, Default)]
pub struct TextFields<'a> {
    fields: Vec<TextField<'a>>,
}

impl<'a> TextFields<'a> {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, skipping blank text.
    #[must_use]
    pub fn field(mut self, path: impl Into<String>, text: &'a str) -> Self {
        if !text.trim().is_empty() {
            self.fields.push(TextField {
                path: path.into(),
                text,
            });
        }
        self
    }

    /// Adds an optional field.
    #[must_use]
    pub fn optional(self, path: impl Into<String>, text: Option<&'a str>) -> Self {
        match text {
            Some(text) => self.field(path, text),
            None => self,
        }
    }

    /// Adds every entry of a list as `path[index]`.
    #[must_use]
    pub fn list(mut self, path: &str, items: &'a [String]) -> Self {
        for (index, item) in items.iter().enumerate() {
            self = self.field(format!("{path}[{index}]"), item);
        }
        self
    }

    /// Adds the fields of a nested value under `prefix`.
    #[must_use]
    pub fn nested(mut self, prefix: &str, nested: TextFields<'a>) -> Self {
        for field in nested.fields {
            self.fields.push(TextField {
                path: format!("{prefix}.{}", field.path),
                text: field.text,
            });
        }
        self
    }

    /// Returns the collected fields.
    #[must_use]
    pub fn into_vec(self) -> Vec<TextField<'a>> {
        self.fields
    }
}

/// Policy-relevant view of a structured result.
///
/// Each shape declares which policy fields it carries instead of being walked
/// reflectively, so guardrail scans stay stable when shapes change.
pub trait PolicyFields {
    /// Category label, when the shape carries one.
    fn category(&self) -> Option<&str> {
        None
    }

    /// Confidence score, when the shape carries one.
    fn confidence(&self) -> Option<f64> {
        None
    }

    /// Mandatory human-review flag, when the shape carries one.
    fn requires_review(&self) -> Option<bool> {
        None
    }

    /// Every non-blank text field, including nested values and list entries.
    fn text_fields(&self) -> Vec<TextField<'_>>;
}

/// A schema-typed model result bound to one [`OutputShape`].
pub trait StructuredShape:
    PolicyFields + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Shape identifier this type decodes.
    const SHAPE: OutputShape;

    /// Normalises decoded values (trimming, dropping blank list entries).
    fn normalize(&mut self) {}

    /// Checks length, list-size, and presence constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructureViolation`] describing the first violated constraint.
    fn validate_structure(&self) -> Result<()>;

    /// Forces the mandatory-review flag on, returning `true` when the value changed.
    fn force_review(&mut self) -> bool {
        false
    }
}
