//! Shared error definitions for intake primitives.

use thiserror::Error;
use uuid::Error as UuidError;

use crate::OutputShape;

/// Result alias used throughout the gateway primitives.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided request identifier could not be parsed.
    #[error("invalid request id: {source}")]
    InvalidRequestId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// An output-shape identifier is not part of the closed set.
    #[error("unknown output shape `{identifier}`")]
    UnknownShape {
        /// The offending identifier string.
        identifier: String,
    },

    /// A structured value violated the structural constraints of its shape.
    #[error("{shape} violates its structure: {reason}")]
    StructureViolation {
        /// Shape being validated.
        shape: OutputShape,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl Error {
    /// Convenience constructor for structural violations.
    #[must_use]
    pub fn structure(shape: OutputShape, reason: impl Into<String>) -> Self {
        Self::StructureViolation {
            shape,
            reason: reason.into(),
        }
    }
}
