//! Semantic core for PHP code intelligence.
//!
//! The [`Backend`] ties together the pieces that turn PHP source into
//! queryable knowledge:
//!
//! - **parser**: per-file indexing of namespaces, imports, functions,
//!   constants and classlikes into a [`SymbolStore`]
//! - **names**: FQSEN resolution of names against a namespace context
//! - **inheritance**: the flattened view of a classlike with everything it
//!   inherits through parents, interfaces and traits
//! - **deduction**: the possible types of an expression at a position
//! - **project**: whole-project indexing on top of per-file indexing
//! - **linting**: unknown-symbol and syntax diagnostics for one file
//!
//! Everything persisted goes through the [`SymbolStore`] handle the backend
//! was built with; [`MemoryStore`] is the in-process implementation.

pub mod config;
pub mod deduction;
pub mod docblock;
pub mod errors;
pub mod inheritance;
pub mod linting;
pub mod names;
pub mod parser;
pub mod project;
pub mod store;
pub mod types;
pub mod util;

use std::sync::Arc;

use parking_lot::Mutex;

pub use config::Config;
pub use errors::{IndexingError, MissingContextError, NodeError, ResolutionError, StoreError};
pub use linting::{LintMessage, LintReport, Linter};
pub use names::{ClassScope, NameContext, NameKind};
pub use parser::Document;
pub use project::{IndexingReport, ProjectIndexer};
pub use store::{MemoryStore, SymbolStore};
pub use types::*;

/// The entry point of the core.  Cheap to share: the store is behind an
/// [`Arc`] and every query takes `&self`.
///
/// Writes made through one backend are serialized on its writer lock, so
/// files may be indexed from several threads at once.
pub struct Backend {
    pub(crate) store: Arc<dyn SymbolStore>,
    pub(crate) config: Config,
    pub(crate) writer: Mutex<()>,
}

impl Backend {
    pub fn new(store: Arc<dyn SymbolStore>) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(store: Arc<dyn SymbolStore>, config: Config) -> Self {
        Self {
            store,
            config,
            writer: Mutex::new(()),
        }
    }

    /// A backend over a fresh [`MemoryStore`] with default settings.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn in_memory_with(config: Config) -> Self {
        Self::with_config(Arc::new(MemoryStore::new()), config)
    }

    pub fn store(&self) -> &Arc<dyn SymbolStore> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Every indexed classlike, sorted by FQCN.
    pub fn class_list(&self) -> Vec<ClassLikeInfo> {
        let mut classes = self.store.classlikes();
        classes.sort_by(|a, b| a.fqcn.cmp(&b.fqcn));
        classes
    }

    /// The namespace scopes recorded for `path`.
    pub fn namespace_list(&self, path: &str) -> Vec<NamespaceScope> {
        self.store.namespaces(path)
    }
}
