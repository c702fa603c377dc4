//! Error types for indexing, resolution and the symbol store.

use thiserror::Error;

/// Errors raised by a [`SymbolStore`](crate::store::SymbolStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("a transaction is already active")]
    TransactionActive,

    #[error("no transaction is active")]
    NoTransaction,

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Errors raised while indexing a single file.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// The source could not be parsed at all; nothing was persisted.
    #[error("indexing {path} failed: {reason}")]
    IndexingFailed { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by classlike resolution and store lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("unknown classlike {0}")]
    UnknownClasslike(String),

    #[error("unknown function {0}")]
    UnknownFunction(String),

    #[error("unknown constant {0}")]
    UnknownConstant(String),

    /// Resolving `fqcn` required resolving itself through `chain`.
    #[error("circular dependency while resolving {fqcn}: {}", chain.join(" -> "))]
    CircularDependency { fqcn: String, chain: Vec<String> },

    #[error("resolution of {0} exceeded the maximum depth")]
    DepthExceeded(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// A name was resolved without a namespace context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no namespace context available for name {name}")]
pub struct MissingContextError {
    pub name: String,
}

/// A node of the wrong shape was handed to a retrieval helper.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("unsupported node: expected {expected}")]
    UnsupportedNode { expected: &'static str },

    #[error(transparent)]
    Indexing(#[from] IndexingFailure),
}

/// Cloneable summary of an [`IndexingError::IndexingFailed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not parse {path}: {reason}")]
pub struct IndexingFailure {
    pub path: String,
    pub reason: String,
}

impl From<IndexingFailure> for IndexingError {
    fn from(f: IndexingFailure) -> Self {
        IndexingError::IndexingFailed {
            path: f.path,
            reason: f.reason,
        }
    }
}
