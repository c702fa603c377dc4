/// PHP parsing and AST extraction.
///
/// This module wraps the mago_syntax parser in a [`Document`] and holds the
/// extractors that turn its AST into the declarations persisted by the
/// indexer.
///
/// Sub-modules:
/// - [`use_statements`]: namespace scopes and `use` imports
/// - [`functions`]: global functions, `const` and `define()` constants
/// - [`classes`]: classes, interfaces, traits and enums with their members
/// - [`signatures`]: parameter and return typing shared by the above
/// - [`file_indexer`]: the per-file indexing orchestration
pub(crate) mod classes;
mod file_indexer;
mod functions;
pub(crate) mod signatures;
pub(crate) mod use_statements;

use bumpalo::Bump;
use mago_span::{HasSpan, Span};
use mago_syntax::ast::*;

use crate::Backend;
use crate::docblock::{self, DocblockData, Tag};
use crate::errors::IndexingFailure;
use crate::names::NameContext;
use crate::types::{NamespaceScope, ParseDiagnostic, Visibility};
use crate::util::offset_to_line;

/// Context for resolving PHPDoc annotations from docblock comments.
///
/// Bundles the program's trivia (comments/whitespace) and the raw source
/// text so that extraction functions can look up the `/** ... */` comment
/// preceding any AST node.
pub(crate) struct DocblockCtx<'a> {
    pub trivias: &'a [Trivia<'a>],
    pub content: &'a str,
}

/// A parsed source file.  The AST lives in the caller's arena.
pub struct Document<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub program: &'a Program<'a>,
}

impl<'a> Document<'a> {
    /// Parse `content`.
    ///
    /// Recoverable syntax errors are kept on the program (see
    /// [`Document::diagnostics`]).  The parser can panic on some malformed
    /// input; that is reported as an [`IndexingFailure`].
    pub fn parse(arena: &'a Bump, path: &'a str, content: &'a str) -> Result<Self, IndexingFailure> {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let file_id = mago_database::file::FileId::new(path);
            mago_syntax::parser::parse_file_content(arena, file_id, content)
        }));

        match result {
            Ok(program) => Ok(Self {
                path,
                content,
                program,
            }),
            Err(_) => {
                tracing::error!("parser panicked while parsing {}", path);
                Err(IndexingFailure {
                    path: path.to_string(),
                    reason: "the parser aborted".to_string(),
                })
            }
        }
    }

    pub fn statements(&self) -> &'a [Statement<'a>] {
        self.program.statements.as_slice()
    }

    pub fn diagnostics(&self) -> Vec<ParseDiagnostic> {
        self.program
            .errors
            .iter()
            .map(|err| {
                let span = err.span();
                ParseDiagnostic {
                    message: err.to_string(),
                    start: span.start.offset,
                    end: span.end.offset,
                }
            })
            .collect()
    }

    pub(crate) fn doc_ctx(&self) -> DocblockCtx<'a> {
        DocblockCtx {
            trivias: self.program.trivia.as_slice(),
            content: self.content,
        }
    }

    pub fn line_of(&self, offset: u32) -> u32 {
        offset_to_line(self.content, offset)
    }

    /// Source text covered by `span`.
    pub fn text(&self, span: Span) -> &'a str {
        self.content
            .get(span.start.offset as usize..span.end.offset as usize)
            .unwrap_or("")
    }

    /// Namespace scopes and imports of this document, computed from the
    /// AST rather than read from the store.
    pub fn namespace_scopes(&self) -> Vec<NamespaceScope> {
        Backend::extract_namespace_scopes(self)
    }

    /// The name context at byte `offset`.
    pub fn name_context_at(&self, scopes: &[NamespaceScope], offset: u32) -> NameContext {
        NameContext::at_line(scopes, self.line_of(offset)).unwrap_or_default()
    }
}

/// A docblock attached to a node, parsed, together with the offset it
/// starts at.
pub(crate) struct NodeDocblock {
    pub data: DocblockData,
    pub offset: u32,
}

impl DocblockCtx<'_> {
    pub fn docblock_for(&self, node: &impl HasSpan, item_name: Option<&str>) -> Option<NodeDocblock> {
        let (text, offset) = docblock::get_docblock_for_node(self.trivias, self.content, node)?;
        Some(NodeDocblock {
            data: docblock::parse_docblock(text, Tag::ALL, item_name),
            offset,
        })
    }
}

impl Backend {
    /// Extract a string representation of a type hint from the AST.
    pub(crate) fn extract_hint_string(hint: &Hint) -> String {
        match hint {
            Hint::Identifier(ident) => ident.value().to_string(),
            Hint::Nullable(nullable) => {
                format!("?{}", Self::extract_hint_string(nullable.hint))
            }
            Hint::Union(union) => {
                let left = Self::extract_hint_string(union.left);
                let right = Self::extract_hint_string(union.right);
                format!("{}|{}", left, right)
            }
            Hint::Intersection(intersection) => {
                let left = Self::extract_hint_string(intersection.left);
                let right = Self::extract_hint_string(intersection.right);
                format!("{}&{}", left, right)
            }
            Hint::Void(ident)
            | Hint::Never(ident)
            | Hint::Float(ident)
            | Hint::Bool(ident)
            | Hint::Integer(ident)
            | Hint::String(ident)
            | Hint::Object(ident)
            | Hint::Mixed(ident)
            | Hint::Iterable(ident) => ident.value.to_string(),
            Hint::Null(keyword)
            | Hint::True(keyword)
            | Hint::False(keyword)
            | Hint::Array(keyword)
            | Hint::Callable(keyword)
            | Hint::Static(keyword)
            | Hint::Self_(keyword)
            | Hint::Parent(keyword) => keyword.value.to_string(),
            Hint::Parenthesized(paren) => Self::extract_hint_string(paren.hint),
        }
    }

    /// Split a hint into its union members, appending `null` for `?T`.
    pub(crate) fn hint_members(hint: &Hint) -> Vec<String> {
        match hint {
            Hint::Nullable(nullable) => {
                let mut members = Self::hint_members(nullable.hint);
                if !members.iter().any(|m| m.eq_ignore_ascii_case("null")) {
                    members.push("null".to_string());
                }
                members
            }
            Hint::Union(union) => {
                let mut members = Self::hint_members(union.left);
                for m in Self::hint_members(union.right) {
                    if !members.contains(&m) {
                        members.push(m);
                    }
                }
                members
            }
            // Intersections are not modelled; the first member stands in.
            Hint::Intersection(intersection) => Self::hint_members(intersection.left),
            Hint::Parenthesized(paren) => Self::hint_members(paren.hint),
            other => vec![Self::extract_hint_string(other)],
        }
    }

    /// Extract visibility from a set of modifiers.
    /// Defaults to `Public` if no visibility modifier is present.
    pub(crate) fn extract_visibility<'a>(
        modifiers: impl Iterator<Item = &'a Modifier<'a>>,
    ) -> Visibility {
        for m in modifiers {
            if m.is_private() {
                return Visibility::Private;
            }
            if m.is_protected() {
                return Visibility::Protected;
            }
            if m.is_public() {
                return Visibility::Public;
            }
        }
        Visibility::Public
    }
}

/// The expression of a positional or named argument.
pub(crate) fn argument_value<'a>(arg: &'a Argument<'a>) -> &'a Expression<'a> {
    match arg {
        Argument::Positional(pos) => pos.value,
        Argument::Named(named) => named.value,
    }
}

/// The `$name` of a plain variable expression.
pub(crate) fn direct_variable_name<'a>(expr: &'a Expression<'a>) -> Option<&'a str> {
    match expr {
        Expression::Variable(Variable::Direct(dv)) => Some(dv.name),
        Expression::Parenthesized(p) => direct_variable_name(p.expression),
        _ => None,
    }
}
