//! PHPDoc tag extraction.
//!
//! [`parse_docblock`] reads a raw `/** ... */` comment once and returns the
//! requested tags as structured records: types are already parsed into
//! [`DocblockType`] trees, descriptions are joined across continuation
//! lines.

use mago_span::HasSpan;
use mago_syntax::ast::*;

use super::types::{DocblockType, split_type_token};

/// The tags [`parse_docblock`] can extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Description,
    Deprecated,
    InheritDoc,
    Var,
    Param,
    Return,
    Throws,
    Property,
    Method,
}

impl Tag {
    pub const ALL: &'static [Tag] = &[
        Tag::Description,
        Tag::Deprecated,
        Tag::InheritDoc,
        Tag::Var,
        Tag::Param,
        Tag::Return,
        Tag::Throws,
        Tag::Property,
        Tag::Method,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamTag {
    /// The parameter name including `$`.
    pub name: String,
    /// `None` for `@param $name` without a type.
    pub ty: Option<DocblockType>,
    pub description: String,
    pub is_variadic: bool,
    pub is_reference: bool,
}

/// `@return` and `@throws`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTag {
    pub ty: DocblockType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarTag {
    /// The variable name including `$`, when the tag names one.
    pub name: Option<String>,
    pub ty: DocblockType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTag {
    /// The property name without `$`.
    pub name: String,
    pub ty: Option<DocblockType>,
    pub is_readable: bool,
    pub is_writable: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTagParam {
    pub name: String,
    pub ty: Option<DocblockType>,
    pub default_value: Option<String>,
    pub is_variadic: bool,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTag {
    pub name: String,
    pub is_static: bool,
    pub return_type: Option<DocblockType>,
    pub parameters: Vec<MethodTagParam>,
    pub description: String,
}

/// Everything extracted from one docblock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocblockData {
    pub short_description: String,
    pub long_description: String,
    pub is_deprecated: bool,
    pub has_inherit_doc: bool,
    pub params: Vec<ParamTag>,
    pub return_tag: Option<TypeTag>,
    pub var_tags: Vec<VarTag>,
    pub throws: Vec<TypeTag>,
    pub properties: Vec<PropertyTag>,
    pub methods: Vec<MethodTag>,
}

impl DocblockData {
    pub fn param(&self, name: &str) -> Option<&ParamTag> {
        self.params.iter().find(|p| p.name == name)
    }

    /// The `@var` tag for `name`: a tag naming it, or else an unnamed one.
    pub fn var_for(&self, name: &str) -> Option<&VarTag> {
        self.var_tags
            .iter()
            .find(|v| v.name.as_deref() == Some(name))
            .or_else(|| self.var_tags.iter().find(|v| v.name.is_none()))
    }
}

/// Parse `docblock`, extracting only the tags listed in `tags`.
///
/// `item_name` is the name of the documented element (e.g. `$x` for a
/// property); an inline `@var` naming another variable is then ignored.
pub fn parse_docblock(docblock: &str, tags: &[Tag], item_name: Option<&str>) -> DocblockData {
    let mut data = DocblockData::default();
    let wants = |t: Tag| tags.contains(&t);

    let (description_lines, blocks) = split_into_blocks(docblock);

    if wants(Tag::Description) {
        let (short, long) = split_description(&description_lines);
        data.short_description = short;
        data.long_description = long;
    }
    if wants(Tag::InheritDoc) {
        data.has_inherit_doc = description_lines
            .iter()
            .any(|l| l.to_ascii_lowercase().contains("{@inheritdoc}"));
    }

    for block in &blocks {
        let (tag, rest) = match block.split_once(char::is_whitespace) {
            Some((tag, rest)) => (tag, rest.trim()),
            None => (block.as_str(), ""),
        };
        match tag.to_ascii_lowercase().as_str() {
            "@deprecated" if wants(Tag::Deprecated) => data.is_deprecated = true,
            "@inheritdoc" if wants(Tag::InheritDoc) => data.has_inherit_doc = true,
            "@param" | "@phpstan-param" | "@psalm-param" if wants(Tag::Param) => {
                if let Some(param) = parse_param(rest) {
                    data.params.retain(|p| p.name != param.name);
                    data.params.push(param);
                }
            }
            "@return" | "@phpstan-return" | "@psalm-return" if wants(Tag::Return) => {
                if !rest.is_empty() {
                    let (ty, description) = split_type_token(rest);
                    data.return_tag = Some(TypeTag {
                        ty: DocblockType::parse(ty),
                        description: description.trim().to_string(),
                    });
                }
            }
            "@var" | "@phpstan-var" | "@psalm-var" if wants(Tag::Var) => {
                if let Some(var) = parse_var(rest)
                    && (var.name.is_none()
                        || item_name.is_none()
                        || var.name.as_deref() == item_name)
                {
                    data.var_tags.push(var);
                }
            }
            "@throws" if wants(Tag::Throws) => {
                if !rest.is_empty() {
                    let (ty, description) = split_type_token(rest);
                    data.throws.push(TypeTag {
                        ty: DocblockType::parse(ty),
                        description: description.trim().to_string(),
                    });
                }
            }
            "@property" | "@property-read" | "@property-write" if wants(Tag::Property) => {
                let tag = tag.to_ascii_lowercase();
                if let Some(mut prop) = parse_property(rest) {
                    prop.is_readable = tag != "@property-write";
                    prop.is_writable = tag != "@property-read";
                    data.properties.push(prop);
                }
            }
            "@method" if wants(Tag::Method) => {
                if let Some(method) = parse_method(rest) {
                    data.methods.push(method);
                }
            }
            _ => {}
        }
    }

    data
}

// ─── Block splitting ────────────────────────────────────────────────────────

/// Strip the comment markers and split the docblock into free-text lines
/// (before the first tag) and tag blocks (a tag line plus its continuation
/// lines, joined by a space).
fn split_into_blocks(docblock: &str) -> (Vec<String>, Vec<String>) {
    let inner = docblock.trim();
    let inner = inner.strip_prefix("/**").unwrap_or(inner);
    let inner = inner.strip_suffix("*/").unwrap_or(inner);

    let mut description = Vec::new();
    let mut blocks: Vec<String> = Vec::new();

    for line in inner.lines() {
        let trimmed = line.trim().trim_start_matches('*').trim();
        if trimmed.starts_with('@') {
            blocks.push(trimmed.to_string());
        } else if let Some(current) = blocks.last_mut() {
            if !trimmed.is_empty() {
                current.push(' ');
                current.push_str(trimmed);
            }
        } else {
            description.push(trimmed.to_string());
        }
    }

    (description, blocks)
}

/// The summary is the first paragraph; everything after the first blank
/// line is the long description.
fn split_description(lines: &[String]) -> (String, String) {
    let lines: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .skip_while(|l| l.is_empty())
        .collect();

    let split = lines.iter().position(|l| l.is_empty()).unwrap_or(lines.len());
    let short = lines[..split].join(" ");
    let long = lines[split..]
        .iter()
        .skip_while(|l| l.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");

    (short.trim().to_string(), long.trim_end().to_string())
}

// ─── Individual tags ────────────────────────────────────────────────────────

/// `@param Type $name description`, `@param Type ...$rest`, `@param $name`.
fn parse_param(rest: &str) -> Option<ParamTag> {
    let (ty, remainder) = if rest.starts_with('$') || rest.starts_with('&') || rest.starts_with("...")
    {
        ("", rest)
    } else {
        split_type_token(rest)
    };

    let remainder = remainder.trim_start();
    let (name_token, description) = remainder
        .split_once(char::is_whitespace)
        .unwrap_or((remainder, ""));

    let mut name = name_token;
    let is_reference = name.starts_with('&');
    name = name.trim_start_matches('&');
    let is_variadic = name.starts_with("...");
    name = name.trim_start_matches("...");

    if !name.starts_with('$') || name.len() < 2 {
        return None;
    }

    Some(ParamTag {
        name: name.trim_end_matches(',').to_string(),
        ty: (!ty.is_empty()).then(|| DocblockType::parse(ty)),
        description: description.trim().to_string(),
        is_variadic,
        is_reference,
    })
}

/// `@var Type`, `@var Type $name description`.
fn parse_var(rest: &str) -> Option<VarTag> {
    if rest.is_empty() || rest.starts_with('$') {
        return None;
    }
    let (ty, remainder) = split_type_token(rest);
    let remainder = remainder.trim_start();

    let (name, description) = match remainder.split_once(char::is_whitespace) {
        Some((first, desc)) if first.starts_with('$') => (Some(first.to_string()), desc),
        None if remainder.starts_with('$') => (Some(remainder.to_string()), ""),
        _ => (None, remainder),
    };

    Some(VarTag {
        name,
        ty: DocblockType::parse(ty),
        description: description.trim().to_string(),
    })
}

/// `@property Type $name description` or `@property $name`.
fn parse_property(rest: &str) -> Option<PropertyTag> {
    let (ty, remainder) = if rest.starts_with('$') {
        (None, rest)
    } else {
        let (ty, remainder) = split_type_token(rest);
        (Some(DocblockType::parse(ty)), remainder)
    };

    let remainder = remainder.trim_start();
    let (name, description) = remainder
        .split_once(char::is_whitespace)
        .unwrap_or((remainder, ""));
    let name = name.strip_prefix('$')?;
    if name.is_empty() {
        return None;
    }

    Some(PropertyTag {
        name: name.to_string(),
        ty,
        is_readable: true,
        is_writable: true,
        description: description.trim().to_string(),
    })
}

/// `@method [static] [ReturnType] name(ParamType $p = default, ...) description`.
fn parse_method(rest: &str) -> Option<MethodTag> {
    let open = rest.find('(')?;
    let close = open + rest[open..].find(')')?;

    let head: Vec<&str> = rest[..open].split_whitespace().collect();
    let (name, before_name) = head.split_last()?;

    let mut before_name = before_name.to_vec();
    let is_static = before_name
        .first()
        .is_some_and(|t| t.eq_ignore_ascii_case("static"));
    if is_static {
        before_name.remove(0);
    }
    let return_type = if before_name.is_empty() {
        None
    } else {
        Some(DocblockType::parse(&before_name.join(" ")))
    };

    let parameters = rest[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(parse_method_param)
        .collect();

    Some(MethodTag {
        name: name.to_string(),
        is_static,
        return_type,
        parameters,
        description: rest[close + 1..].trim().to_string(),
    })
}

fn parse_method_param(param: &str) -> Option<MethodTagParam> {
    let (decl, default_value) = match param.split_once('=') {
        Some((decl, default)) => (decl.trim(), Some(default.trim().to_string())),
        None => (param, None),
    };

    let dollar = decl.find('$')?;
    let prefix = decl[..dollar].trim();
    let name = decl[dollar..].trim().to_string();

    let is_variadic = prefix.ends_with("...");
    let prefix = prefix.trim_end_matches("...").trim_end();
    let is_reference = prefix.ends_with('&');
    let prefix = prefix.trim_end_matches('&').trim_end();

    Some(MethodTagParam {
        name,
        ty: (!prefix.is_empty()).then(|| DocblockType::parse(prefix)),
        default_value,
        is_variadic,
        is_reference,
    })
}

// ─── Locating docblocks ─────────────────────────────────────────────────────

/// Look up the docblock comment (if any) that immediately precedes `node`.
/// Returns its raw text and start offset.
///
/// Whitespace and ordinary comments may sit between the docblock and the
/// node; any code in between disqualifies it.
pub fn get_docblock_for_node<'a>(
    trivia: &'a [Trivia<'a>],
    content: &str,
    node: &impl HasSpan,
) -> Option<(&'a str, u32)> {
    let node_start = node.span().start.offset;
    let candidate_idx = trivia.partition_point(|t| t.span.start.offset < node_start);
    if candidate_idx == 0 {
        return None;
    }

    let content_bytes = content.as_bytes();
    let mut covered_from = node_start;

    for t in trivia[..candidate_idx].iter().rev() {
        let gap = content_bytes
            .get(t.span.end.offset as usize..covered_from as usize)
            .unwrap_or(&[]);
        if !gap.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        match t.kind {
            TriviaKind::DocBlockComment => return Some((t.value, t.span.start.offset)),
            TriviaKind::WhiteSpace
            | TriviaKind::SingleLineComment
            | TriviaKind::MultiLineComment
            | TriviaKind::HashComment => {
                covered_from = t.span.start.offset;
            }
        }
    }

    None
}

/// Search backward in `content` from `stmt_start` for an inline
/// `/** @var … */` docblock separated from the statement by whitespace
/// alone.  Returns the docblock text and its start offset.
pub fn find_inline_var_docblock(content: &str, stmt_start: usize) -> Option<(&str, usize)> {
    let before = content.get(..stmt_start)?;
    let trimmed = before.trim_end();
    if !trimmed.ends_with("*/") {
        return None;
    }

    let open_pos = trimmed.rfind("/**")?;
    let line_start = trimmed[..open_pos].rfind('\n').map_or(0, |p| p + 1);
    if !trimmed[line_start..open_pos]
        .chars()
        .all(|c| c.is_ascii_whitespace())
    {
        return None;
    }

    Some((&trimmed[open_pos..], open_pos))
}
