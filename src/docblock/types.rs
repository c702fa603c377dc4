//! Docblock type expressions.
//!
//! [`DocblockType::parse`] turns the free-text type of a `@param`,
//! `@return` or `@var` tag into a small tree.  Names are kept exactly as
//! written; turning them into FQSENs depends on the namespace context and
//! happens in [`crate::names`].
//!
//! Parsing never fails.  Fragments that make no sense degrade to a
//! [`DocblockType::Keyword`] holding the raw text.

use std::fmt;

/// Built-in scalar-ish keywords, in their canonical spelling.
const KEYWORDS: &[(&str, &str)] = &[
    ("int", "int"),
    ("integer", "int"),
    ("float", "float"),
    ("double", "float"),
    ("string", "string"),
    ("bool", "bool"),
    ("boolean", "bool"),
    ("array", "array"),
    ("callable", "callable"),
    ("iterable", "iterable"),
    ("object", "object"),
    ("resource", "resource"),
    ("null", "null"),
    ("true", "true"),
    ("false", "false"),
    ("array-key", "array-key"),
    ("scalar", "scalar"),
    ("numeric", "numeric"),
    ("class-string", "class-string"),
    ("callable-string", "callable-string"),
    ("numeric-string", "numeric-string"),
    ("non-empty-string", "non-empty-string"),
    ("positive-int", "positive-int"),
    ("negative-int", "negative-int"),
];

/// Context-dependent keywords.
const SPECIALS: &[&str] = &["self", "static", "parent", "$this", "mixed", "void", "never"];

/// Generic containers whose last template argument is the element type.
const ARRAY_LIKE_GENERICS: &[&str] = &[
    "array",
    "list",
    "iterable",
    "non-empty-array",
    "non-empty-list",
];

/// Iterable classes whose template arguments name what a `foreach` yields.
const ITERABLE_CLASSES: &[&str] = &[
    "Traversable",
    "Iterator",
    "IteratorAggregate",
    "Generator",
    "ArrayIterator",
    "ArrayObject",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocblockType {
    /// A class, interface or trait name as written.
    Class(String),
    /// `T[]`, `list<T>`, `array<K, T>`.
    Array(Box<DocblockType>),
    /// `A|B|C`.
    Compound(Vec<DocblockType>),
    /// `?T`.
    Nullable(Box<DocblockType>),
    /// `Iterator<T>`, `Generator<K, T>`: an iterable class and the type of
    /// its values.
    Iterable(Box<DocblockType>, Box<DocblockType>),
    /// `self`, `static`, `parent`, `$this`, `mixed`, `void`, `never`.
    Special(String),
    /// Scalars and anything that could not be understood.
    Keyword(String),
}

impl DocblockType {
    pub fn parse(spec: &str) -> DocblockType {
        let spec = spec.trim();
        if spec.is_empty() {
            return DocblockType::Special("mixed".to_string());
        }

        let parts = split_top_level(spec, '|');
        if parts.len() > 1 {
            let mut members = Vec::new();
            for part in parts {
                match DocblockType::parse(part) {
                    DocblockType::Compound(inner) => members.extend(inner),
                    other => members.push(other),
                }
            }
            return DocblockType::Compound(members);
        }

        // Intersections are not modelled; the first member stands in.
        let parts = split_top_level(spec, '&');
        if parts.len() > 1 {
            return DocblockType::parse(parts[0]);
        }

        if let Some(rest) = spec.strip_prefix('?') {
            return DocblockType::Nullable(Box::new(DocblockType::parse(rest)));
        }

        if let Some(base) = spec.strip_suffix("[]") {
            return DocblockType::Array(Box::new(DocblockType::parse(base)));
        }

        if spec.starts_with('(') && matching_close(spec, 0) == Some(spec.len() - 1) {
            return DocblockType::parse(&spec[1..spec.len() - 1]);
        }

        if let Some(open) = spec.find('<')
            && spec.ends_with('>')
        {
            let base = &spec[..open];
            let args = split_top_level(&spec[open + 1..spec.len() - 1], ',');
            if ARRAY_LIKE_GENERICS
                .iter()
                .any(|g| g.eq_ignore_ascii_case(base))
            {
                let element = args.last().map_or_else(
                    || DocblockType::Special("mixed".to_string()),
                    |arg| DocblockType::parse(arg),
                );
                return DocblockType::Array(Box::new(element));
            }
            let base_name = base.trim_start_matches('\\');
            if ITERABLE_CLASSES
                .iter()
                .any(|c| c.eq_ignore_ascii_case(base_name))
            {
                // `Generator<TKey, TValue, TSend, TReturn>`
                let value = if base_name.eq_ignore_ascii_case("Generator") && args.len() > 1 {
                    args.get(1)
                } else {
                    args.last()
                };
                if let Some(value) = value.filter(|v| !v.is_empty()) {
                    return DocblockType::Iterable(
                        Box::new(DocblockType::parse(base)),
                        Box::new(DocblockType::parse(value)),
                    );
                }
            }
            return DocblockType::parse(base);
        }

        // Shapes: `array{id: int}` / `object{...}`.
        if let Some(open) = spec.find('{') {
            return DocblockType::parse(&spec[..open]);
        }

        parse_atom(spec)
    }

    /// Flatten into individual type strings: unions are spread, nullable
    /// types add `null`, arrays append `[]` to every element type.  An
    /// iterable class yields itself followed by its values as an array.
    pub fn flatten(&self) -> Vec<String> {
        match self {
            DocblockType::Compound(members) => {
                let mut out = Vec::new();
                for m in members {
                    for s in m.flatten() {
                        if !out.contains(&s) {
                            out.push(s);
                        }
                    }
                }
                out
            }
            DocblockType::Nullable(inner) => {
                let mut out = inner.flatten();
                if !out.iter().any(|s| s == "null") {
                    out.push("null".to_string());
                }
                out
            }
            DocblockType::Array(inner) => inner.flatten().into_iter().map(|s| s + "[]").collect(),
            DocblockType::Iterable(base, value) => {
                let mut out = base.flatten();
                for s in value.flatten() {
                    let s = s + "[]";
                    if !out.contains(&s) {
                        out.push(s);
                    }
                }
                out
            }
            other => vec![other.to_string()],
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            DocblockType::Nullable(_) => true,
            DocblockType::Keyword(k) => k == "null",
            DocblockType::Compound(members) => members.iter().any(DocblockType::is_nullable),
            _ => false,
        }
    }
}

impl fmt::Display for DocblockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocblockType::Class(name) | DocblockType::Special(name) | DocblockType::Keyword(name) => {
                f.write_str(name)
            }
            DocblockType::Array(inner) => match inner.as_ref() {
                DocblockType::Compound(_) | DocblockType::Nullable(_) => write!(f, "({inner})[]"),
                _ => write!(f, "{inner}[]"),
            },
            DocblockType::Compound(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
            DocblockType::Nullable(inner) => match inner.as_ref() {
                DocblockType::Compound(_) => write!(f, "?({inner})"),
                _ => write!(f, "?{inner}"),
            },
            DocblockType::Iterable(base, value) => write!(f, "{base}<{value}>"),
        }
    }
}

fn parse_atom(spec: &str) -> DocblockType {
    let lower = spec.to_ascii_lowercase();
    if let Some((_, canonical)) = KEYWORDS.iter().find(|(k, _)| *k == lower) {
        return DocblockType::Keyword((*canonical).to_string());
    }
    if SPECIALS.contains(&lower.as_str()) {
        return DocblockType::Special(lower);
    }
    if is_class_name(spec) {
        return DocblockType::Class(spec.to_string());
    }
    DocblockType::Keyword(spec.to_string())
}

fn is_class_name(s: &str) -> bool {
    let body = s.strip_prefix('\\').unwrap_or(s);
    !body.is_empty()
        && body.split('\\').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_' || !c.is_ascii())
                && chars.all(|c| c.is_alphanumeric() || c == '_' || !c.is_ascii())
        })
}

/// Split `s` on `sep` where it is not nested in `<>`, `()`, `{}` or `[]`.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '(' | '{' | '[' => depth += 1,
            '>' | ')' | '}' | ']' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

/// Index of the `)` matching the `(` at `open`.
fn matching_close(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split off the first type token from `s`, respecting `<…>`, `(…)` and
/// `{…}` nesting, and allowing spaces around `|`.
///
/// Returns `(type_token, remainder)`.
pub(crate) fn split_type_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    let mut depth = 0i32;
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '<' | '(' | '{' => depth += 1,
            '>' | ')' | '}' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                // `int | string` is still a single type.
                let rest = s[i..].trim_start();
                let prev_is_pipe = s[..i].trim_end().ends_with('|');
                if rest.starts_with('|') || prev_is_pipe {
                    continue;
                }
                return (&s[..i], &s[i..]);
            }
            _ => {}
        }
    }
    (s, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_type_token_from_description() {
        assert_eq!(split_type_token("int|null $x desc"), ("int|null", " $x desc"));
        assert_eq!(
            split_type_token("array<int, Foo> $x"),
            ("array<int, Foo>", " $x")
        );
        assert_eq!(split_type_token("int | string $x"), ("int | string", " $x"));
    }

    #[test]
    fn class_name_detection() {
        assert!(is_class_name("\\A\\B"));
        assert!(is_class_name("Foo_Bar2"));
        assert!(!is_class_name("1abc"));
        assert!(!is_class_name("a b"));
    }
}
