//! Pre-call refusals and their fixed user-facing messages.

use std::fmt;

/// Returned when the input is empty or too short to act on.
pub const TOO_SHORT_MESSAGE: &str = "I didn't receive a complete question. Could you please describe your support request in more detail?";

/// Returned for attempts to override the assistant's instructions.
pub const INJECTION_MESSAGE: &str = "I can only help with student support requests and can't change how I operate. Please describe the issue you need help with, such as enrollment, financial aid, or technical support.";

/// Returned for harmful requests; points to crisis resources.
pub const HARMFUL_MESSAGE: &str = "I'm not able to assist with that type of request. If you're experiencing a crisis, please contact emergency services or the campus counseling center. For student support questions, I'm happy to help with enrollment, financial aid, technical support, and other university services.";

/// Returned for requests outside student support.
pub const SCOPE_REDIRECT_MESSAGE: &str = "I'm here to help with university student support questions. I can assist with topics like enrollment, financial aid, technical support, academic records, and other student services. How can I help you with your student support needs today?";

/// Returned when words are implausibly long.
pub const GIBBERISH_MESSAGE: &str = "I couldn't understand your request. Could you please rephrase your question about student support services?";

/// Returned when most characters are outside ordinary text.
pub const NON_STANDARD_TEXT_MESSAGE: &str = "I had trouble reading your message. Could you please rephrase your question using standard text?";

/// Why a request was refused before reaching the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefusalKind {
    /// Fewer than three characters after trimming.
    TooShort,
    /// Prompt-injection attempt.
    Injection,
    /// Harmful or crisis-related content.
    Harmful,
    /// Outside student support.
    OffTopic,
    /// Average word length above the plausible maximum.
    Gibberish,
    /// Too many characters outside ordinary text.
    NonStandardText,
}

impl RefusalKind {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::Injection => "injection",
            Self::Harmful => "harmful",
            Self::OffTopic => "off_topic",
            Self::Gibberish => "gibberish",
            Self::NonStandardText => "non_standard_text",
        }
    }

    /// Returns the fixed user-facing message for this kind.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TooShort => TOO_SHORT_MESSAGE,
            Self::Injection => INJECTION_MESSAGE,
            Self::Harmful => HARMFUL_MESSAGE,
            Self::OffTopic => SCOPE_REDIRECT_MESSAGE,
            Self::Gibberish => GIBBERISH_MESSAGE,
            Self::NonStandardText => NON_STANDARD_TEXT_MESSAGE,
        }
    }
}

impl fmt::Display for RefusalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision that a request must not be sent to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Refusal {
    kind: RefusalKind,
}

impl Refusal {
    /// Creates a refusal of `kind`.
    #[must_use]
    pub const fn new(kind: RefusalKind) -> Self {
        Self { kind }
    }

    /// Returns the refusal kind.
    #[must_use]
    pub const fn kind(&self) -> RefusalKind {
        self.kind
    }

    /// Returns the user-facing message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.kind.message()
    }
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
