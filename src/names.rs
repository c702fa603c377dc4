//! Name and FQSEN resolution.
//!
//! Names are resolved against a [`NameContext`]: the namespace and the
//! `use` imports in effect at a given line.  The rules differ per kind of
//! name:
//!
//!   - fully qualified (`\A\B`): returned verbatim
//!   - qualified (`B\C`): the first segment is replaced when it is an
//!     imported alias, otherwise the current namespace is prefixed
//!   - unqualified classlike (`C`): the matching import, otherwise the
//!     current namespace
//!   - unqualified function or constant (`f`): the matching import,
//!     otherwise `\ns\f` when the store knows it, otherwise `\f`
//!
//! The last rule mirrors the runtime fallback PHP applies to function and
//! constant lookups.
use crate::Backend;
use crate::docblock::DocblockType;
use crate::errors::MissingContextError;
use crate::types::{Import, ImportKind, NamespaceScope, TypeInfo, TypeList};
use crate::util::{join_namespace, short_name, to_fqsen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Classlike,
    Function,
    Constant,
}

impl NameKind {
    fn import_kind(self) -> ImportKind {
        match self {
            NameKind::Classlike => ImportKind::Classlike,
            NameKind::Function => ImportKind::Function,
            NameKind::Constant => ImportKind::Constant,
        }
    }
}

/// The namespace and imports in effect at one position of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameContext {
    /// Namespace name without leading `\`; `None` for the global namespace.
    pub namespace: Option<String>,
    pub imports: Vec<Import>,
}

impl NameContext {
    /// The global namespace without imports.
    pub fn global() -> Self {
        Self::default()
    }

    pub fn new(namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace
                .map(|ns| ns.trim_matches('\\').to_string())
                .filter(|ns| !ns.is_empty()),
            imports: Vec::new(),
        }
    }

    pub fn with_import(mut self, kind: ImportKind, alias: &str, name: &str) -> Self {
        self.imports.push(Import {
            kind,
            alias: alias.to_string(),
            name: to_fqsen(name),
            line: 0,
        });
        self
    }

    /// The context at `line`, from the namespace scopes of a file.  Only
    /// imports declared on or before `line` are in effect.
    pub fn at_line(scopes: &[NamespaceScope], line: u32) -> Option<Self> {
        let scope = scopes.iter().rev().find(|s| s.contains_line(line))?;
        Some(Self {
            namespace: scope.name.clone(),
            imports: scope
                .imports
                .iter()
                .filter(|i| i.line <= line)
                .cloned()
                .collect(),
        })
    }

    fn import(&self, kind: ImportKind, alias: &str) -> Option<&Import> {
        // Classlike aliases are case-insensitive, constants are not.
        self.imports.iter().rev().find(|i| {
            i.kind == kind
                && match kind {
                    ImportKind::Constant => i.alias == alias,
                    _ => i.alias.eq_ignore_ascii_case(alias),
                }
        })
    }
}

/// The classlike a name is used inside of, for `self` and `parent`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassScope {
    pub fqcn: String,
    pub parent: Option<String>,
}

/// Type names that never resolve to a classlike.
const BUILTIN_TYPES: &[&str] = &[
    "int",
    "integer",
    "float",
    "double",
    "string",
    "bool",
    "boolean",
    "array",
    "callable",
    "iterable",
    "object",
    "resource",
    "null",
    "true",
    "false",
    "mixed",
    "void",
    "never",
    "static",
    "$this",
    "array-key",
    "scalar",
    "numeric",
    "class-string",
    "callable-string",
    "numeric-string",
    "non-empty-string",
    "positive-int",
    "negative-int",
];

pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES
        .iter()
        .any(|b| b.eq_ignore_ascii_case(name))
}

impl Backend {
    /// Resolve `name` to an FQSEN.
    ///
    /// `self`, `static` and `parent` are returned unchanged.
    pub fn resolve_name(
        &self,
        name: &str,
        kind: NameKind,
        context: Option<&NameContext>,
    ) -> Result<String, MissingContextError> {
        let context = context.ok_or_else(|| MissingContextError {
            name: name.to_string(),
        })?;

        if name.starts_with('\\') {
            return Ok(name.to_string());
        }
        if let Some(relative) = name.strip_prefix("namespace\\") {
            return Ok(join_namespace(context.namespace.as_deref(), relative));
        }

        if let Some((first, rest)) = name.split_once('\\') {
            if let Some(import) = context.import(ImportKind::Classlike, first) {
                return Ok(format!("{}\\{}", import.name, rest));
            }
            return Ok(join_namespace(context.namespace.as_deref(), name));
        }

        if kind == NameKind::Classlike
            && ["self", "static", "parent"]
                .iter()
                .any(|s| s.eq_ignore_ascii_case(name))
        {
            return Ok(name.to_ascii_lowercase());
        }

        if let Some(import) = context.import(kind.import_kind(), name) {
            return Ok(import.name.clone());
        }

        let in_namespace = join_namespace(context.namespace.as_deref(), name);
        match kind {
            NameKind::Classlike => Ok(in_namespace),
            NameKind::Function | NameKind::Constant if context.namespace.is_none() => {
                Ok(in_namespace)
            }
            NameKind::Function => {
                if self.store.has_function(&in_namespace) {
                    Ok(in_namespace)
                } else {
                    Ok(format!("\\{name}"))
                }
            }
            NameKind::Constant => {
                if self.store.has_constant(&in_namespace) {
                    Ok(in_namespace)
                } else {
                    Ok(format!("\\{name}"))
                }
            }
        }
    }

    /// Resolve one type name as written in a hint or docblock into a
    /// [`TypeInfo`].  Keywords stay as they are (lowercased), `self` and
    /// `parent` become the enclosing classlike and its parent, `static` and
    /// `$this` are left for query time.  A trailing `[]` is kept.
    pub fn resolve_type(
        &self,
        local: &str,
        context: &NameContext,
        class_scope: Option<&ClassScope>,
    ) -> TypeInfo {
        let base = local.trim_end_matches("[]");
        let suffix = &local[base.len()..];
        let lower = base.to_ascii_lowercase();

        let fqn = match lower.as_str() {
            "self" => class_scope.map_or(lower.clone(), |c| c.fqcn.clone()),
            "parent" => class_scope
                .and_then(|c| c.parent.clone())
                .unwrap_or(lower.clone()),
            "integer" => "int".to_string(),
            "double" => "float".to_string(),
            "boolean" => "bool".to_string(),
            _ if is_builtin_type(&lower) => lower.clone(),
            _ => match self.resolve_name(base, NameKind::Classlike, Some(context)) {
                Ok(name) => name,
                Err(_) => to_fqsen(base),
            },
        };

        TypeInfo::new(local, format!("{fqn}{suffix}"))
    }

    /// Resolve every member of a parsed docblock type.
    pub fn resolve_docblock_type(
        &self,
        ty: &DocblockType,
        context: &NameContext,
        class_scope: Option<&ClassScope>,
    ) -> TypeList {
        ty.flatten()
            .iter()
            .map(|local| self.resolve_type(local, context, class_scope))
            .collect()
    }

    /// The shortest name that refers to `fqsen` from `line` of `path`.
    ///
    /// Falls back to the fully-qualified name when nothing shorter is
    /// unambiguous.
    pub fn localize_type(&self, fqsen: &str, path: &str, line: u32, kind: NameKind) -> String {
        let fqsen = to_fqsen(fqsen);
        let scopes = self.store.namespaces(path);
        let context = NameContext::at_line(&scopes, line).unwrap_or_default();

        let import_kind = kind.import_kind();
        for import in context.imports.iter().rev() {
            if import.name.eq_ignore_ascii_case(&fqsen) && import.kind == import_kind {
                return import.alias.clone();
            }
            if import.kind == ImportKind::Classlike {
                let prefix = format!("{}\\", import.name);
                let head = fqsen.get(..prefix.len());
                let rest = fqsen.get(prefix.len()..).unwrap_or_default();
                if !rest.is_empty() && head.is_some_and(|h| h.eq_ignore_ascii_case(&prefix)) {
                    return format!("{}\\{}", import.alias, rest);
                }
            }
        }

        let namespace_prefix = join_namespace(context.namespace.as_deref(), "");
        if let Some(relative) = fqsen.strip_prefix(&namespace_prefix) {
            let unqualified = !relative.contains('\\');
            // An unqualified name must not be shadowed by an import.
            if !unqualified || context.import(import_kind, relative).is_none() {
                return relative.to_string();
            }
        }

        // Root functions and constants are reachable through the fallback,
        // unless the current namespace declares a symbol of the same name.
        if kind != NameKind::Classlike && fqsen.matches('\\').count() == 1 {
            let shadow = join_namespace(context.namespace.as_deref(), short_name(&fqsen));
            let shadowed = match kind {
                NameKind::Function => self.store.has_function(&shadow),
                _ => self.store.has_constant(&shadow),
            };
            if !shadowed {
                return short_name(&fqsen).to_string();
            }
        }

        fqsen
    }
}
