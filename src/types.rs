//! Data types shared by the indexer, the resolution engines and the store.
//!
//! Every declaration is owned data (no parser lifetimes) so that it can be
//! persisted in a [`SymbolStore`](crate::store::SymbolStore) and handed out
//! to callers freely.  Names are stored as fully-qualified FQSENs with a
//! leading `\` (e.g. `\App\Models\User`).

use std::time::SystemTime;

use serde::Serialize;

/// Visibility of a class member (method, property, or constant).
///
/// In PHP, members without an explicit visibility modifier default to `Public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

// ─── Types ──────────────────────────────────────────────────────────────────

/// A single resolved type: the name as written next to its fully-qualified
/// form.  Keywords (`int`, `null`, `static`, ...) carry the same text in
/// both fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeInfo {
    pub local: String,
    pub fqn: String,
}

impl TypeInfo {
    pub fn new(local: impl Into<String>, fqn: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            fqn: fqn.into(),
        }
    }

    /// A type whose local and fully-qualified names are identical.
    pub fn keyword(name: &str) -> Self {
        Self::new(name, name)
    }

    /// Whether this is the `null` type.
    pub fn is_null(&self) -> bool {
        self.fqn.eq_ignore_ascii_case("null")
    }
}

/// An order-preserving union of types.
///
/// Duplicates (by fully-qualified name) are dropped on insertion so the
/// first discovery position wins.  An empty list means "unknown", which is
/// different from a list holding `mixed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TypeList(Vec<TypeInfo>);

impl TypeList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn single(ty: TypeInfo) -> Self {
        Self(vec![ty])
    }

    /// Push `ty` unless a type with the same FQN is already present.
    pub fn push(&mut self, ty: TypeInfo) {
        if !self.contains(&ty.fqn) {
            self.0.push(ty);
        }
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = TypeInfo>) {
        for ty in other {
            self.push(ty);
        }
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.0.iter().any(|t| t.fqn.eq_ignore_ascii_case(fqn))
    }

    pub fn remove(&mut self, fqn: &str) {
        self.0.retain(|t| !t.fqn.eq_ignore_ascii_case(fqn));
    }

    pub fn retain(&mut self, f: impl FnMut(&TypeInfo) -> bool) {
        self.0.retain(f);
    }

    pub fn without_null(&self) -> Self {
        Self(self.0.iter().filter(|t| !t.is_null()).cloned().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypeInfo> {
        self.0.iter()
    }

    /// The fully-qualified names, in order.
    pub fn fqns(&self) -> Vec<&str> {
        self.0.iter().map(|t| t.fqn.as_str()).collect()
    }
}

impl FromIterator<TypeInfo> for TypeList {
    fn from_iter<I: IntoIterator<Item = TypeInfo>>(iter: I) -> Self {
        let mut list = TypeList::new();
        list.extend(iter);
        list
    }
}

impl IntoIterator for TypeList {
    type Item = TypeInfo;
    type IntoIter = std::vec::IntoIter<TypeInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TypeList {
    type Item = &'a TypeInfo;
    type IntoIter = std::slice::Iter<'a, TypeInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ─── Documentation ──────────────────────────────────────────────────────────

/// Documentation attached to a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Documentation {
    pub short_description: String,
    pub long_description: String,
    pub is_deprecated: bool,
    /// Whether the declaration has its own docblock (as opposed to none).
    pub has_docblock: bool,
    /// Set by `{@inheritDoc}`: the text comes from the shadowed ancestor.
    pub inherits_documentation: bool,
}

// ─── Functions and members ──────────────────────────────────────────────────

/// A parameter of a function or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterInfo {
    /// The parameter name including the `$` prefix (e.g. "$text").
    pub name: String,
    pub types: TypeList,
    /// Source text of the default value, if any.
    pub default_value: Option<String>,
    pub is_nullable: bool,
    pub is_reference: bool,
    pub is_variadic: bool,
    pub description: String,
}

/// A global function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionInfo {
    pub fqsen: String,
    pub name: String,
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub parameters: Vec<ParameterInfo>,
    pub return_types: TypeList,
    pub throws: TypeList,
    pub documentation: Documentation,
}

/// A global constant, from `const X = ...;` or `define('X', ...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstantInfo {
    pub fqsen: String,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub default_value: String,
    pub types: TypeList,
    pub documentation: Documentation,
}

/// A method, either declared or magic (`@method`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodInfo {
    pub name: String,
    /// FQCN of the classlike that declares this method.
    pub declaring_fqcn: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_magic: bool,
    pub line: u32,
    pub parameters: Vec<ParameterInfo>,
    pub return_types: TypeList,
    pub throws: TypeList,
    pub documentation: Documentation,
}

/// A property, either declared or magic (`@property`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyInfo {
    /// The property name WITHOUT the `$` prefix.
    pub name: String,
    pub declaring_fqcn: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_magic: bool,
    pub is_readable: bool,
    pub is_writable: bool,
    pub line: u32,
    pub default_value: Option<String>,
    pub types: TypeList,
    pub documentation: Documentation,
}

/// A class constant or enum case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassConstantInfo {
    pub name: String,
    pub declaring_fqcn: String,
    pub visibility: Visibility,
    pub line: u32,
    pub default_value: String,
    pub types: TypeList,
    pub documentation: Documentation,
}

// ─── Classlikes ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLikeKind {
    Class,
    Interface,
    Trait,
}

/// `use T { m as protected n; }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraitAlias {
    /// The trait named in the adaptation, if the reference was absolute.
    pub trait_fqcn: Option<String>,
    pub method: String,
    pub alias: Option<String>,
    pub visibility: Option<Visibility>,
}

/// `use A, B { A::m insteadof B; }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraitPrecedence {
    pub trait_fqcn: String,
    pub method: String,
    pub insteadof: Vec<String>,
}

/// A class, interface or trait together with its own members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassLikeInfo {
    pub fqcn: String,
    pub name: String,
    pub kind: ClassLikeKind,
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub documentation: Documentation,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_enum: bool,
    /// Classes carry at most one parent; interfaces may extend several.
    pub parents: Vec<String>,
    pub interfaces: Vec<String>,
    pub traits: Vec<String>,
    pub trait_aliases: Vec<TraitAlias>,
    pub trait_precedences: Vec<TraitPrecedence>,
    pub constants: Vec<ClassConstantInfo>,
    pub properties: Vec<PropertyInfo>,
    pub methods: Vec<MethodInfo>,
}

impl ClassLikeInfo {
    pub fn find_method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

// ─── Files, namespaces, imports ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Classlike,
    Function,
    Constant,
}

/// A `use` alias in effect from `line` until the end of its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub kind: ImportKind,
    pub alias: String,
    /// Fully-qualified target, with a leading `\`.
    pub name: String,
    pub line: u32,
}

/// A namespace scope of a file.  The anonymous (global) namespace has no
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceScope {
    pub name: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    pub imports: Vec<Import>,
}

impl NamespaceScope {
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// A recoverable syntax error reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    pub message: String,
    pub start: u32,
    pub end: u32,
}

/// An indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: String,
    pub indexed_at: SystemTime,
    pub diagnostics: Vec<ParseDiagnostic>,
}

// ─── Flattened classlikes ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberOrigin {
    /// Declared (or aliased in) by the queried classlike itself.
    Own,
    /// Inherited unmodified from a parent, interface or trait.
    Inherited,
}

/// A member as seen from a particular classlike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlattenedMember<T> {
    #[serde(flatten)]
    pub member: T,
    pub origin: MemberOrigin,
    /// The FQCN of the ancestor whose same-named member this one shadows.
    pub overrides: Option<String>,
}

impl<T> FlattenedMember<T> {
    pub fn own(member: T) -> Self {
        Self {
            member,
            origin: MemberOrigin::Own,
            overrides: None,
        }
    }

    pub fn inherited(member: T) -> Self {
        Self {
            member,
            origin: MemberOrigin::Inherited,
            overrides: None,
        }
    }
}

/// The complete view of a classlike: own members merged with everything
/// reachable through parents, interfaces and traits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlattenedClasslikeInfo {
    pub classlike: ClassLikeInfo,
    /// Every ancestor class (or parent interface), nearest first.
    pub parents: Vec<String>,
    /// Every implemented interface, including inherited ones.
    pub interfaces: Vec<String>,
    /// Every used trait, including traits of traits and of parents.
    pub traits: Vec<String>,
    pub constants: Vec<FlattenedMember<ClassConstantInfo>>,
    pub properties: Vec<FlattenedMember<PropertyInfo>>,
    pub methods: Vec<FlattenedMember<MethodInfo>>,
}

impl FlattenedClasslikeInfo {
    pub fn fqcn(&self) -> &str {
        &self.classlike.fqcn
    }

    /// Method names are case-insensitive in PHP.
    pub fn method(&self, name: &str) -> Option<&FlattenedMember<MethodInfo>> {
        self.methods
            .iter()
            .find(|m| m.member.name.eq_ignore_ascii_case(name))
    }

    pub fn property(&self, name: &str) -> Option<&FlattenedMember<PropertyInfo>> {
        let name = name.strip_prefix('$').unwrap_or(name);
        self.properties.iter().find(|p| p.member.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&FlattenedMember<ClassConstantInfo>> {
        self.constants.iter().find(|c| c.member.name == name)
    }

    /// Whether the classlike is, extends or implements `fqcn`.
    pub fn is_subtype_of(&self, fqcn: &str) -> bool {
        std::iter::once(self.fqcn())
            .chain(self.parents.iter().map(String::as_str))
            .chain(self.interfaces.iter().map(String::as_str))
            .any(|n| n.eq_ignore_ascii_case(fqcn))
    }
}
