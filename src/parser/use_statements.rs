/// Namespace scope and `use` import extraction.
///
/// This is the first indexing pass: every later pass resolves names
/// against the scopes produced here.
use mago_span::HasSpan;
use mago_syntax::ast::*;

use crate::Backend;
use crate::types::{Import, ImportKind, NamespaceScope};
use crate::util::{short_name, to_fqsen};

use super::Document;

impl Backend {
    /// Compute the namespace scopes of a document, each with the imports
    /// declared directly inside it.
    ///
    /// A file without namespace declarations has a single anonymous scope
    /// spanning the whole file.  An implicit `namespace Foo;` runs until
    /// the next namespace declaration or the end of the file.
    pub(crate) fn extract_namespace_scopes(doc: &Document<'_>) -> Vec<NamespaceScope> {
        let last_line = doc.line_of(doc.content.len() as u32);
        let statements = doc.statements();

        let namespaces: Vec<&Namespace> = statements
            .iter()
            .filter_map(|s| match s {
                Statement::Namespace(ns) => Some(ns),
                _ => None,
            })
            .collect();

        if namespaces.is_empty() {
            let mut imports = Vec::new();
            Self::collect_imports(doc, statements.iter(), &mut imports);
            return vec![NamespaceScope {
                name: None,
                start_line: 1,
                end_line: last_line,
                imports,
            }];
        }

        let mut scopes = Vec::new();

        // Code before the first namespace lives in the global namespace.
        let first_start = doc.line_of(namespaces[0].span().start.offset);
        let leading: Vec<&Statement> = statements
            .iter()
            .take_while(|s| !matches!(s, Statement::Namespace(_)))
            .filter(|s| {
                matches!(
                    s,
                    Statement::Use(_)
                        | Statement::Class(_)
                        | Statement::Interface(_)
                        | Statement::Trait(_)
                        | Statement::Enum(_)
                        | Statement::Function(_)
                        | Statement::Constant(_)
                        | Statement::Expression(_)
                )
            })
            .collect();
        if !leading.is_empty() && first_start > 1 {
            let mut imports = Vec::new();
            Self::collect_imports(doc, leading.into_iter(), &mut imports);
            scopes.push(NamespaceScope {
                name: None,
                start_line: 1,
                end_line: first_start - 1,
                imports,
            });
        }

        for (i, ns) in namespaces.iter().enumerate() {
            let span = ns.span();
            let start_line = doc.line_of(span.start.offset);
            let end_line = if matches!(ns.body, NamespaceBody::Implicit(_)) {
                namespaces
                    .get(i + 1)
                    .map_or(last_line, |next| {
                        doc.line_of(next.span().start.offset).saturating_sub(1).max(start_line)
                    })
            } else {
                doc.line_of(span.end.offset)
            };

            let name = ns
                .name
                .as_ref()
                .map(|ident| ident.value().trim_start_matches('\\').to_string())
                .filter(|n| !n.is_empty());

            let mut imports = Vec::new();
            Self::collect_imports(doc, ns.statements().iter(), &mut imports);

            scopes.push(NamespaceScope {
                name,
                start_line,
                end_line,
                imports,
            });
        }

        scopes
    }

    fn collect_imports<'a>(
        doc: &Document<'_>,
        statements: impl Iterator<Item = &'a Statement<'a>>,
        imports: &mut Vec<Import>,
    ) {
        for statement in statements {
            if let Statement::Use(use_stmt) = statement {
                let line = doc.line_of(use_stmt.span().start.offset);
                Self::extract_use_items(&use_stmt.items, line, imports);
            }
        }
    }

    /// Extract individual use items from a `UseItems` node.
    pub(crate) fn extract_use_items(items: &UseItems, line: u32, imports: &mut Vec<Import>) {
        match items {
            UseItems::Sequence(seq) => {
                // `use Foo\Bar;` or `use Foo\Bar, Baz\Qux;`
                for item in seq.items.iter() {
                    Self::register_use_item(item, None, ImportKind::Classlike, line, imports);
                }
            }
            UseItems::TypedSequence(seq) => {
                // `use function Foo\bar;` or `use const Foo\BAR;`
                let kind = Self::use_type_kind(&seq.r#type);
                for item in seq.items.iter() {
                    Self::register_use_item(item, None, kind, line, imports);
                }
            }
            UseItems::TypedList(list) => {
                // `use function Foo\{bar, baz};`
                let kind = Self::use_type_kind(&list.r#type);
                let prefix = list.namespace.value();
                for item in list.items.iter() {
                    Self::register_use_item(item, Some(prefix), kind, line, imports);
                }
            }
            UseItems::MixedList(list) => {
                // `use Foo\{Bar, function baz, const QUX};`
                let prefix = list.namespace.value();
                for maybe_typed in list.items.iter() {
                    let kind = maybe_typed
                        .r#type
                        .as_ref()
                        .map_or(ImportKind::Classlike, Self::use_type_kind);
                    Self::register_use_item(&maybe_typed.item, Some(prefix), kind, line, imports);
                }
            }
        }
    }

    fn use_type_kind(use_type: &UseType) -> ImportKind {
        if use_type.is_function() {
            ImportKind::Function
        } else if use_type.is_const() {
            ImportKind::Constant
        } else {
            ImportKind::Classlike
        }
    }

    /// Register a single `UseItem`.
    ///
    /// If `group_prefix` is `Some`, the item name is relative to that prefix
    /// (e.g. for `use Foo\{Bar}`, prefix is `"Foo"` and item name is `"Bar"`,
    /// giving FQN `"\Foo\Bar"`).
    fn register_use_item(
        item: &UseItem,
        group_prefix: Option<&str>,
        kind: ImportKind,
        line: u32,
        imports: &mut Vec<Import>,
    ) {
        let item_name = item.name.value().trim_start_matches('\\');

        let fqn = match group_prefix {
            Some(prefix) => format!("{}\\{}", prefix.trim_matches('\\'), item_name),
            None => item_name.to_string(),
        };

        let alias = match &item.alias {
            Some(alias) => alias.identifier.value.to_string(),
            None => short_name(&fqn).to_string(),
        };

        // Aliases are unique per scope and kind; a later duplicate wins.
        imports.retain(|i| !(i.kind == kind && i.alias.eq_ignore_ascii_case(&alias)));
        imports.push(Import {
            kind,
            alias,
            name: to_fqsen(&fqn),
            line,
        });
    }
}
