/// Per-file indexing orchestration.
///
/// [`Backend::index`] parses a file and replaces its declarations in the
/// store.  Parsing happens outside the backend's writer lock; the store work
/// runs under it in three transactions:
///
/// 1. the previous record of the file is deleted;
/// 2. the file record and its namespace scopes with their imports are
///    written (pass 1);
/// 3. functions, constants, and classlikes are extracted in one traversal,
///    resolving names against the scopes committed by pass 1 (pass 2).
///
/// A failure in pass 1 or 2 rolls the open transaction back and deletes
/// whatever earlier passes committed, so a file is either fully indexed or
/// absent.
use std::time::SystemTime;

use bumpalo::Bump;
use mago_syntax::ast::*;

use crate::Backend;
use crate::errors::{IndexingError, StoreError};
use crate::store::SymbolStore;
use crate::types::{FileRecord, NamespaceScope};

use super::Document;
use super::signatures::SignatureCtx;

impl Backend {
    /// Parse `source` and replace the declarations indexed for `path`.
    ///
    /// Recoverable syntax errors are stored on the file record as
    /// diagnostics.  A fatal parse failure leaves no record for the file.
    pub fn index(&self, path: &str, source: &str) -> Result<(), IndexingError> {
        tracing::debug!("indexing {}", path);

        let arena = Bump::new();
        let parsed = Document::parse(&arena, path, source);

        let _writer = self.writer.lock();
        self.transaction(|store| store.delete_file(path))?;
        let doc = parsed?;

        let diagnostics = doc.diagnostics();
        if !diagnostics.is_empty() {
            tracing::debug!("{}: {} syntax error(s)", path, diagnostics.len());
        }

        let result = self
            .transaction(|store| {
                store.upsert_file(FileRecord {
                    path: path.to_string(),
                    indexed_at: SystemTime::now(),
                    diagnostics,
                })?;
                store.upsert_namespaces(path, doc.namespace_scopes())
            })
            .and_then(|()| {
                let scopes = self.store.namespaces(path);
                self.transaction(|_| self.index_declarations(&doc, &scopes))
            });

        if let Err(err) = result {
            tracing::error!("indexing {} failed: {}", path, err);
            if let Err(cleanup) = self.transaction(|store| store.delete_file(path)) {
                tracing::error!("could not remove partial index of {}: {}", path, cleanup);
            }
            return Err(err.into());
        }

        Ok(())
    }

    /// Run `f` inside a store transaction, committing on success and
    /// rolling back on failure.
    pub(crate) fn transaction<T>(
        &self,
        f: impl FnOnce(&dyn SymbolStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.store.begin()?;
        match f(self.store.as_ref()) {
            Ok(value) => {
                self.store.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.store.rollback() {
                    tracing::error!("rollback failed: {}", rollback);
                }
                Err(err)
            }
        }
    }

    fn index_declarations(
        &self,
        doc: &Document<'_>,
        scopes: &[NamespaceScope],
    ) -> Result<(), StoreError> {
        let ctx = SignatureCtx {
            doc,
            scopes,
            class_scope: None,
        };
        self.index_statements(doc.statements().iter(), &ctx)
    }

    /// Walk top-level statements, descending into namespaces, blocks, and
    /// `if` bodies (for `if (!function_exists(...))` guards).  Function
    /// and method bodies are not entered.
    fn index_statements<'s, 'a: 's>(
        &self,
        statements: impl Iterator<Item = &'s Statement<'a>>,
        ctx: &SignatureCtx<'_, '_>,
    ) -> Result<(), StoreError> {
        for statement in statements {
            match statement {
                Statement::Namespace(ns) => {
                    self.index_statements(ns.statements().iter(), ctx)?;
                }
                Statement::Block(block) => {
                    self.index_statements(block.statements.iter(), ctx)?;
                }
                Statement::If(if_stmt) => match &if_stmt.body {
                    IfBody::Statement(body) => {
                        self.index_statements(std::iter::once(body.statement), ctx)?;
                        for clause in body.else_if_clauses.iter() {
                            self.index_statements(std::iter::once(clause.statement), ctx)?;
                        }
                        if let Some(else_clause) = &body.else_clause {
                            self.index_statements(std::iter::once(else_clause.statement), ctx)?;
                        }
                    }
                    IfBody::ColonDelimited(body) => {
                        self.index_statements(body.statements.iter(), ctx)?;
                        for clause in body.else_if_clauses.iter() {
                            self.index_statements(clause.statements.iter(), ctx)?;
                        }
                        if let Some(else_clause) = &body.else_clause {
                            self.index_statements(else_clause.statements.iter(), ctx)?;
                        }
                    }
                },
                Statement::Function(func) => self.index_function(func, ctx)?,
                Statement::Constant(constant) => {
                    self.index_constant_statement(statement, constant, ctx)?;
                }
                Statement::Expression(expr_stmt) => {
                    self.index_define(statement, expr_stmt.expression, ctx)?;
                }
                _ => {
                    self.index_classlike(statement, ctx.doc, ctx.scopes)?;
                }
            }
        }
        Ok(())
    }
}
