//! Placeholder substitution.

use std::collections::{BTreeSet, HashMap};

use intake_primitives::OutputShape;
use regex::Captures;
use tracing::debug;

use crate::error::MissingVariableError;
use crate::template::{PLACEHOLDER, Template};

/// Named values substituted into a template's user text.
pub type Variables = HashMap<String, String>;

/// A fully rendered prompt ready for a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System instruction, verbatim from the template.
    pub system: String,
    /// Rendered user text.
    pub user: String,
    /// Shape the provider must produce.
    pub shape: OutputShape,
}

/// Substitutes `variables` into the template's user text.
///
/// Substitution happens in a single pass, so placeholder syntax inside a
/// supplied value is emitted literally. Optional sections that were not
/// supplied render as empty text; extra variables are ignored.
///
/// # Errors
///
/// Returns [`MissingVariableError`] listing every required placeholder that
/// was not supplied.
pub fn render(template: &Template, variables: &Variables) -> Result<String, MissingVariableError> {
    let missing: BTreeSet<&String> = template
        .required_placeholders()
        .iter()
        .filter(|name| !variables.contains_key(name.as_str()))
        .collect();
    if !missing.is_empty() {
        return Err(MissingVariableError {
            template: template.name().to_owned(),
            missing: missing.into_iter().cloned().collect(),
        });
    }

    let rendered = PLACEHOLDER.replace_all(template.user_template(), |caps: &Captures<'_>| {
        let name = &caps[1];
        match variables.get(name) {
            Some(value) => value.clone(),
            None if template.is_optional(name) => String::new(),
            None => caps[0].to_owned(),
        }
    });

    debug!(
        template = template.name(),
        variables = variables.len(),
        "rendered prompt template"
    );
    Ok(rendered.into_owned())
}

impl Template {
    /// Renders the user text and pairs it with the system instruction and
    /// declared output shape.
    ///
    /// # Errors
    ///
    /// See [`render`].
    pub fn prepare(&self, variables: &Variables) -> Result<RenderedPrompt, MissingVariableError> {
        Ok(RenderedPrompt {
            system: self.system().to_owned(),
            user: render(self, variables)?,
            shape: self.output_shape(),
        })
    }
}
