//! Template documents, validation, and placeholder extraction.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use intake_primitives::OutputShape;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::error::{TemplateError, TemplateResult};

/// Placeholders whose names end with this suffix are optional sections and
/// render as empty text when absent.
pub const OPTIONAL_SECTION_SUFFIX: &str = "_section";

/// Phrases that indicate a system prompt carries safety instructions.
const SAFETY_INDICATORS: [&str; 6] = [
    "guardrail",
    "security",
    "must not",
    "never",
    "guidance only",
    "no legal",
];

pub(crate) static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

/// Semantic version of a template: three non-negative integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl FromStr for TemplateVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(());
        };
        let parse = |part: &str| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(());
            }
            part.parse::<u64>().map_err(|_| ())
        };
        Ok(Self {
            major: parse(major)?,
            minor: parse(minor)?,
            patch: parse(patch)?,
        })
    }
}

impl fmt::Display for TemplateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Raw YAML shape of a template document. Every key is optional here so that
/// all missing keys can be reported at once.
#[derive(Debug, Default, Deserialize)]
struct TemplateDocument {
    name: Option<String>,
    version: Option<serde_yaml::Value>,
    system: Option<String>,
    user_template: Option<String>,
    output_schema: Option<String>,
}

/// A validated, immutable prompt template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    name: String,
    version: TemplateVersion,
    system: String,
    user_template: String,
    output_shape: OutputShape,
    origin: String,
    required: BTreeSet<String>,
    optional: BTreeSet<String>,
}

impl Template {
    /// Parses and validates a YAML template document.
    ///
    /// A system prompt without any recognisable safety phrasing only produces a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] when the document is not a mapping, misses
    /// required keys, declares an unknown output schema, or carries a version
    /// that is not `MAJOR.MINOR.PATCH`.
    pub fn parse(origin: &str, contents: &str) -> TemplateResult<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(contents).map_err(|err| TemplateError::Parse {
                origin: origin.to_owned(),
                reason: err.to_string(),
            })?;
        if !value.is_mapping() {
            return Err(TemplateError::Parse {
                origin: origin.to_owned(),
                reason: "document must be a YAML mapping".to_owned(),
            });
        }
        let document: TemplateDocument =
            serde_yaml::from_value(value).map_err(|err| TemplateError::Parse {
                origin: origin.to_owned(),
                reason: err.to_string(),
            })?;

        Self::from_document(origin, document)
    }

    fn from_document(origin: &str, document: TemplateDocument) -> TemplateResult<Self> {
        let TemplateDocument {
            name: Some(name),
            version: Some(version),
            system: Some(system),
            user_template: Some(user_template),
            output_schema: Some(output_schema),
        } = document
        else {
            return Err(TemplateError::MissingFields {
                origin: origin.to_owned(),
                fields: missing_fields(&document),
            });
        };

        let output_shape =
            OutputShape::from_identifier(&output_schema).map_err(|_| TemplateError::UnknownShape {
                origin: origin.to_owned(),
                identifier: output_schema.clone(),
                known: OutputShape::ALL
                    .iter()
                    .map(|shape| shape.identifier())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let version_text = scalar_text(&version);
        let version = version_text
            .parse::<TemplateVersion>()
            .map_err(|()| TemplateError::InvalidVersion {
                origin: origin.to_owned(),
                version: version_text.clone(),
            })?;

        let system = system.trim().to_owned();
        if !has_safety_language(&system) {
            warn!(template = %name, origin, "system prompt may be missing guardrail language");
        }

        let user_template = user_template.trim().to_owned();
        let (required, optional) = partition_placeholders(&user_template);

        Ok(Self {
            name,
            version,
            system,
            user_template,
            output_shape,
            origin: origin.to_owned(),
            required,
            optional,
        })
    }

    /// Returns the unique template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the template version.
    #[must_use]
    pub const fn version(&self) -> TemplateVersion {
        self.version
    }

    /// Returns the system instruction verbatim. It is never interpolated.
    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Returns the raw user-text pattern.
    #[must_use]
    pub fn user_template(&self) -> &str {
        &self.user_template
    }

    /// Returns the declared output shape.
    #[must_use]
    pub const fn output_shape(&self) -> OutputShape {
        self.output_shape
    }

    /// Returns the document path or label the template was loaded from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the placeholders that must be supplied at render time.
    #[must_use]
    pub fn required_placeholders(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Returns the optional-section placeholders.
    #[must_use]
    pub fn optional_placeholders(&self) -> &BTreeSet<String> {
        &self.optional
    }

    /// Returns every placeholder name.
    #[must_use]
    pub fn placeholders(&self) -> BTreeSet<String> {
        self.required.union(&self.optional).cloned().collect()
    }

    pub(crate) fn is_optional(&self, name: &str) -> bool {
        self.optional.contains(name)
    }
}

fn missing_fields(document: &TemplateDocument) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if document.name.is_none() {
        missing.push("name");
    }
    if document.output_schema.is_none() {
        missing.push("output_schema");
    }
    if document.system.is_none() {
        missing.push("system");
    }
    if document.user_template.is_none() {
        missing.push("user_template");
    }
    if document.version.is_none() {
        missing.push("version");
    }
    missing
}

fn scalar_text(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(text) => text.clone(),
        serde_yaml::Value::Number(number) => number.to_string(),
        serde_yaml::Value::Bool(flag) => flag.to_string(),
        other => format!("{other:?}"),
    }
}

fn has_safety_language(system: &str) -> bool {
    let lowered = system.to_lowercase();
    SAFETY_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
}

fn partition_placeholders(user_template: &str) -> (BTreeSet<String>, BTreeSet<String>) {
    PLACEHOLDER
        .captures_iter(user_template)
        .map(|caps| caps[1].to_owned())
        .partition(|name| !name.ends_with(OPTIONAL_SECTION_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r"
name: intake_triage
version: 1.2.3
system: |
  You are a support assistant. You must not give legal advice.
user_template: |
  Student text: {text}
  {user_context_section}
output_schema: IntakeTriageResponse
";

    #[test]
    fn parses_valid_document() {
        let template = Template::parse("inline", VALID).unwrap();

        assert_eq!(template.name(), "intake_triage");
        assert_eq!(template.version().to_string(), "1.2.3");
        assert_eq!(template.output_shape(), OutputShape::IntakeTriage);
        assert!(template.required_placeholders().contains("text"));
        assert!(template.optional_placeholders().contains("user_context_section"));
        assert!(!template.system().ends_with('\n'));
    }

    #[test]
    fn reports_every_missing_field() {
        let err = Template::parse("inline", "name: only_name\n").expect_err("missing fields");
        let TemplateError::MissingFields { fields, .. } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(fields, ["output_schema", "system", "user_template", "version"]);
    }

    #[test]
    fn rejects_unknown_output_schema() {
        let doc = VALID.replace("IntakeTriageResponse", "PoemResponse");
        let err = Template::parse("inline", &doc).expect_err("unknown schema");
        assert!(matches!(err, TemplateError::UnknownShape { .. }));
    }

    #[test]
    fn rejects_non_semver_versions() {
        for version in ["1.0", "\"1.0.0-beta\"", "v1.0.0", "1..0", "\"1.0.0.0\""] {
            let doc = VALID.replace("1.2.3", version);
            let err = Template::parse("inline", &doc).expect_err(version);
            assert!(matches!(err, TemplateError::InvalidVersion { .. }), "{version}");
        }
    }

    #[test]
    fn rejects_non_mapping_documents() {
        let err = Template::parse("inline", "- just\n- a list\n").expect_err("not a mapping");
        assert!(matches!(err, TemplateError::Parse { .. }));
    }

    #[test]
    fn version_parser_accepts_large_components() {
        let version: TemplateVersion = "10.20.30".parse().unwrap();
        assert_eq!((version.major, version.minor, version.patch), (10, 20, 30));
        assert!("1.2.-3".parse::<TemplateVersion>().is_err());
    }

    #[test]
    fn detects_safety_language() {
        assert!(has_safety_language("Provide GUIDANCE ONLY."));
        assert!(!has_safety_language("Be helpful and kind."));
    }
}
