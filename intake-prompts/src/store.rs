//! Loaded template sets with atomic reload.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info, warn};

use crate::error::{TemplateError, TemplateNotFound, TemplateResult};
use crate::source::TemplateSource;
use crate::template::Template;

/// An immutable, validated set of templates keyed by name.
#[derive(Clone, Debug, Default)]
pub struct TemplateSet {
    templates: BTreeMap<String, Arc<Template>>,
}

impl TemplateSet {
    /// Parses every document of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::LoadFailed`] aggregating every per-document
    /// failure, or the source error when documents cannot be listed. Any
    /// failure means no template is returned.
    pub fn load(source: &dyn TemplateSource) -> TemplateResult<Self> {
        let documents = source.documents()?;
        if documents.is_empty() {
            warn!(source = %source.describe(), "no prompt templates found");
        }

        let mut templates: BTreeMap<String, Arc<Template>> = BTreeMap::new();
        let mut failures = Vec::new();
        for document in documents {
            let template = match Template::parse(&document.origin, &document.contents) {
                Ok(template) => template,
                Err(err) => {
                    failures.push(err);
                    continue;
                }
            };
            match templates.entry(template.name().to_owned()) {
                Entry::Occupied(existing) => failures.push(TemplateError::DuplicateName {
                    name: template.name().to_owned(),
                    first: existing.get().origin().to_owned(),
                    second: template.origin().to_owned(),
                }),
                Entry::Vacant(slot) => {
                    debug!(
                        template = template.name(),
                        version = %template.version(),
                        shape = %template.output_shape(),
                        "parsed prompt template"
                    );
                    slot.insert(Arc::new(template));
                }
            }
        }

        if failures.is_empty() {
            Ok(Self { templates })
        } else {
            Err(TemplateError::LoadFailed { failures })
        }
    }

    /// Looks up a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.get(name).cloned()
    }

    /// Returns the loaded names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    /// Returns the number of loaded templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` when no template is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Iterates over templates in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.values()
    }
}

/// Process-wide template store.
///
/// Readers always observe a complete set: a reload builds the replacement off
/// to the side and swaps it in only when every document validated.
pub struct TemplateStore {
    source: Arc<dyn TemplateSource>,
    current: RwLock<Arc<TemplateSet>>,
}

impl std::fmt::Debug for TemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateStore")
            .field("source", &self.source.describe())
            .field("templates", &self.snapshot().names())
            .finish()
    }
}

impl TemplateStore {
    /// Loads `source` and builds a store around it.
    ///
    /// # Errors
    ///
    /// Propagates the [`TemplateError`] of the initial load.
    pub fn load(source: Arc<dyn TemplateSource>) -> TemplateResult<Self> {
        let set = TemplateSet::load(source.as_ref()).inspect_err(|err| {
            error!(source = %source.describe(), error = %err, "initial prompt template load failed");
        })?;
        info!(
            source = %source.describe(),
            templates = set.len(),
            "loaded prompt templates"
        );
        Ok(Self {
            source,
            current: RwLock::new(Arc::new(set)),
        })
    }

    /// Returns the template registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateNotFound`] listing the available names.
    pub fn get(&self, name: &str) -> Result<Arc<Template>, TemplateNotFound> {
        let set = self.snapshot();
        set.get(name).ok_or_else(|| TemplateNotFound {
            name: name.to_owned(),
            available: set.names(),
        })
    }

    /// Returns the set currently in effect.
    #[must_use]
    pub fn snapshot(&self) -> Arc<TemplateSet> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Rebuilds the set from the source and swaps it in.
    ///
    /// # Errors
    ///
    /// Returns the load failure; the previous set stays in effect.
    pub fn reload(&self) -> TemplateResult<usize> {
        let set = match TemplateSet::load(self.source.as_ref()) {
            Ok(set) => set,
            Err(err) => {
                warn!(
                    source = %self.source.describe(),
                    error = %err,
                    "prompt template reload failed; keeping previous set"
                );
                return Err(err);
            }
        };
        let count = set.len();
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(set);
        drop(guard);
        info!(source = %self.source.describe(), templates = count, "reloaded prompt templates");
        Ok(count)
    }
}
