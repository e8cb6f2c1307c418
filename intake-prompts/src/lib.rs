//! Prompt template management for the intake gateway.
//!
//! Templates are YAML documents pairing an immutable system instruction with a
//! user-text pattern and a declared output shape. The [`TemplateStore`] loads a
//! complete set at construction and swaps it atomically on reload; the
//! [`render`] function binds request variables into the user text only.

#![warn(missing_docs, clippy::pedantic)]

pub mod error;
pub mod render;
pub mod source;
pub mod store;
pub mod template;

pub use error::{MissingVariableError, TemplateError, TemplateNotFound, TemplateResult};
pub use render::{RenderedPrompt, Variables, render};
pub use source::{DirectorySource, SourceDocument, StaticSource, TemplateSource};
pub use store::{TemplateSet, TemplateStore};
pub use template::{OPTIONAL_SECTION_SUFFIX, Template, TemplateVersion};
