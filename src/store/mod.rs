//! The symbol store boundary.
//!
//! The core never talks to a database directly.  Everything it persists or
//! reads back goes through [`SymbolStore`], which callers implement over
//! whatever storage they like.  [`MemoryStore`] is the in-process
//! implementation used by the CLI and by tests.
//!
//! Writes are only accepted inside a transaction (`begin` .. `commit` or
//! `rollback`).  Reads always observe the current state, including writes of
//! the transaction in progress.

mod memory;

pub use memory::MemoryStore;

use crate::errors::StoreError;
use crate::types::{ClassLikeInfo, ConstantInfo, FileRecord, FunctionInfo, NamespaceScope};

pub trait SymbolStore: Send + Sync {
    // ─── Transactions ───────────────────────────────────────────────────
    fn begin(&self) -> Result<(), StoreError>;
    fn commit(&self) -> Result<(), StoreError>;
    fn rollback(&self) -> Result<(), StoreError>;

    // ─── Files ──────────────────────────────────────────────────────────
    fn upsert_file(&self, file: FileRecord) -> Result<(), StoreError>;
    /// Delete a file together with every declaration it owns.
    fn delete_file(&self, path: &str) -> Result<(), StoreError>;
    fn file(&self, path: &str) -> Option<FileRecord>;
    fn files(&self) -> Vec<FileRecord>;

    // ─── Namespaces and imports ─────────────────────────────────────────
    fn upsert_namespaces(&self, path: &str, scopes: Vec<NamespaceScope>)
    -> Result<(), StoreError>;
    fn namespaces(&self, path: &str) -> Vec<NamespaceScope>;

    // ─── Declarations ───────────────────────────────────────────────────
    fn upsert_classlike(&self, classlike: ClassLikeInfo) -> Result<(), StoreError>;
    fn delete_classlike(&self, fqcn: &str) -> Result<(), StoreError>;
    fn classlike(&self, fqcn: &str) -> Option<ClassLikeInfo>;
    fn classlikes(&self) -> Vec<ClassLikeInfo>;

    fn upsert_function(&self, function: FunctionInfo) -> Result<(), StoreError>;
    fn delete_function(&self, fqsen: &str) -> Result<(), StoreError>;
    fn function(&self, fqsen: &str) -> Option<FunctionInfo>;

    fn upsert_constant(&self, constant: ConstantInfo) -> Result<(), StoreError>;
    fn delete_constant(&self, fqsen: &str) -> Result<(), StoreError>;
    fn constant(&self, fqsen: &str) -> Option<ConstantInfo>;

    // ─── Existence checks ───────────────────────────────────────────────
    fn has_classlike(&self, fqcn: &str) -> bool {
        self.classlike(fqcn).is_some()
    }

    fn has_function(&self, fqsen: &str) -> bool {
        self.function(fqsen).is_some()
    }

    fn has_constant(&self, fqsen: &str) -> bool {
        self.constant(fqsen).is_some()
    }
}
