//! Where template documents come from.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{TemplateError, TemplateResult};

/// A raw template document and the label it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path or label used in diagnostics.
    pub origin: String,
    /// YAML contents.
    pub contents: String,
}

impl SourceDocument {
    /// Creates a document.
    #[must_use]
    pub fn new(origin: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            contents: contents.into(),
        }
    }
}

/// Supplies template documents to the store on every (re)load.
pub trait TemplateSource: Send + Sync {
    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// Reads every document currently available.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Source`] when the backing storage cannot be read.
    fn documents(&self) -> TemplateResult<Vec<SourceDocument>>;
}

/// Reads every `*.yaml` / `*.yml` file from a directory, in file-name order.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the directory this source reads.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn source_error(&self, reason: impl ToString) -> TemplateError {
        TemplateError::Source {
            origin: self.root.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl TemplateSource for DirectorySource {
    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }

    fn documents(&self) -> TemplateResult<Vec<SourceDocument>> {
        let entries = fs::read_dir(&self.root).map_err(|err| self.source_error(err))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| self.source_error(err))?.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            if is_yaml && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let origin = path.display().to_string();
                fs::read_to_string(&path)
                    .map(|contents| SourceDocument { origin: origin.clone(), contents })
                    .map_err(|err| TemplateError::Source {
                        origin,
                        reason: err.to_string(),
                    })
            })
            .collect()
    }
}

/// A fixed, in-memory set of documents.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    documents: Vec<SourceDocument>,
}

impl StaticSource {
    /// Creates a source serving exactly `documents`.
    #[must_use]
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self { documents }
    }

    /// The templates compiled into the binary.
    #[must_use]
    pub fn bundled() -> Self {
        Self::new(vec![
            SourceDocument::new(
                "bundled:intake_triage.yaml",
                include_str!("../templates/intake_triage.yaml"),
            ),
            SourceDocument::new(
                "bundled:intake_followup.yaml",
                include_str!("../templates/intake_followup.yaml"),
            ),
            SourceDocument::new(
                "bundled:assist_summarize.yaml",
                include_str!("../templates/assist_summarize.yaml"),
            ),
            SourceDocument::new(
                "bundled:assist_draft_reply.yaml",
                include_str!("../templates/assist_draft_reply.yaml"),
            ),
        ])
    }
}

impl TemplateSource for StaticSource {
    fn describe(&self) -> String {
        format!("{} in-memory document(s)", self.documents.len())
    }

    fn documents(&self) -> TemplateResult<Vec<SourceDocument>> {
        Ok(self.documents.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_source_reads_yaml_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.yml"), "b").unwrap();
        fs::write(dir.path().join("a.yaml"), "a").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = DirectorySource::new(dir.path()).documents().unwrap();
        let contents: Vec<_> = docs.iter().map(|d| d.contents.as_str()).collect();

        assert_eq!(contents, ["a", "b"]);
    }

    #[test]
    fn missing_directory_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path().join("absent"));

        assert!(matches!(source.documents(), Err(TemplateError::Source { .. })));
    }

    #[test]
    fn bundled_source_has_four_documents() {
        assert_eq!(StaticSource::bundled().documents().unwrap().len(), 4);
    }
}
