//! Post-call validation verdicts.

use std::fmt;

/// Which output rule a structured result violated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Category outside the fixed set.
    InvalidCategory,
    /// Confidence outside `[0, 1]` or not a number.
    ConfidenceOutOfRange,
    /// A promise, approval, or legal determination.
    ForbiddenClaim,
    /// Harmful content in a text field.
    HarmfulContent,
    /// The mandatory review flag is not set.
    ReviewNotRequired,
}

impl ViolationKind {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCategory => "invalid_category",
            Self::ConfidenceOutOfRange => "confidence_out_of_range",
            Self::ForbiddenClaim => "forbidden_claim",
            Self::HarmfulContent => "harmful_content",
            Self::ReviewNotRequired => "review_not_required",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating a structured result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailVerdict {
    /// Every rule passed.
    Accepted,
    /// The first violated rule.
    Rejected {
        /// Violated rule.
        kind: ViolationKind,
        /// Human-readable description naming the offending value or field.
        reason: String,
    },
}

impl GuardrailVerdict {
    /// Creates a rejection.
    #[must_use]
    pub fn rejected(kind: ViolationKind, reason: impl Into<String>) -> Self {
        Self::Rejected {
            kind,
            reason: reason.into(),
        }
    }

    /// Returns `true` when every rule passed.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Returns the violated rule, if any.
    #[must_use]
    pub const fn violation(&self) -> Option<ViolationKind> {
        match self {
            Self::Accepted => None,
            Self::Rejected { kind, .. } => Some(*kind),
        }
    }

    /// Returns `"OK"` when accepted, otherwise the rejection reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Accepted => "OK",
            Self::Rejected { reason, .. } => reason,
        }
    }
}

impl fmt::Display for GuardrailVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}
