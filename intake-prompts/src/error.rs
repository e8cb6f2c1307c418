//! Errors raised while loading, looking up, and rendering templates.

use thiserror::Error;

/// Result alias for template loading operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that make a template set invalid. Always fatal for the load that
/// raised them; a previously loaded set stays in effect.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template source could not be read.
    #[error("failed to read templates from {origin}: {reason}")]
    Source {
        /// Path or label of the source.
        origin: String,
        /// Underlying failure.
        reason: String,
    },

    /// The document is not valid YAML or has wrongly typed fields.
    #[error("failed to parse template {origin}: {reason}")]
    Parse {
        /// Path or label of the document.
        origin: String,
        /// Parser message.
        reason: String,
    },

    /// Required keys are absent from the document.
    #[error("template {origin} missing required fields: {}", .fields.join(", "))]
    MissingFields {
        /// Path or label of the document.
        origin: String,
        /// Missing keys, sorted.
        fields: Vec<&'static str>,
    },

    /// The declared output schema is not in the known set.
    #[error("template {origin} has invalid output_schema `{identifier}`; must be one of: {known}")]
    UnknownShape {
        /// Path or label of the document.
        origin: String,
        /// Declared identifier.
        identifier: String,
        /// Known identifiers, comma separated.
        known: String,
    },

    /// The version is not `MAJOR.MINOR.PATCH`.
    #[error("template {origin} has invalid version `{version}`; expected MAJOR.MINOR.PATCH (e.g. 1.0.0)")]
    InvalidVersion {
        /// Path or label of the document.
        origin: String,
        /// Declared version text.
        version: String,
    },

    /// Two documents declare the same name.
    #[error("duplicate template name `{name}` in {second} (first declared in {first})")]
    DuplicateName {
        /// Conflicting name.
        name: String,
        /// Origin of the first declaration.
        first: String,
        /// Origin of the second declaration.
        second: String,
    },

    /// One or more documents failed; nothing was loaded.
    #[error("failed to load {} template(s):\n{}", .failures.len(), render_failures(.failures))]
    LoadFailed {
        /// Every per-document failure.
        failures: Vec<TemplateError>,
    },
}

fn render_failures(failures: &[TemplateError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A template name that is absent from the loaded set.
#[derive(Debug, Error)]
#[error("unknown prompt template `{name}`; available templates: {}", display_available(.available))]
pub struct TemplateNotFound {
    /// Requested name.
    pub name: String,
    /// Names currently loaded, sorted.
    pub available: Vec<String>,
}

fn display_available(available: &[String]) -> String {
    if available.is_empty() {
        "(none)".to_owned()
    } else {
        available.join(", ")
    }
}

/// Required placeholders were not supplied at render time.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("missing required template variables for `{template}`: {}", .missing.join(", "))]
pub struct MissingVariableError {
    /// Template being rendered.
    pub template: String,
    /// Every missing required placeholder, sorted.
    pub missing: Vec<String>,
}
