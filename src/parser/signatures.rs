/// Parameter, return and throws typing for functions and methods.
///
/// Every type list is drawn from the first non-empty source in the order
/// docblock tag, native hint, default value.  Docblock types resolve at the
/// position of the docblock, hints at the position of the declaration.
use mago_span::HasSpan;
use mago_syntax::ast::*;

use crate::Backend;
use crate::docblock::DocblockData;
use crate::names::{ClassScope, NameContext};
use crate::types::{Documentation, NamespaceScope, ParameterInfo, TypeInfo, TypeList};

use super::{Document, NodeDocblock};

/// Where the names of one declaration resolve.
pub(crate) struct SignatureCtx<'c, 'a> {
    pub doc: &'c Document<'a>,
    pub scopes: &'c [NamespaceScope],
    pub class_scope: Option<&'c ClassScope>,
}

impl SignatureCtx<'_, '_> {
    pub fn context_at(&self, offset: u32) -> NameContext {
        self.doc.name_context_at(self.scopes, offset)
    }
}

impl Backend {
    pub(crate) fn extract_parameters(
        &self,
        parameter_list: &FunctionLikeParameterList<'_>,
        docblock: Option<&NodeDocblock>,
        ctx: &SignatureCtx<'_, '_>,
    ) -> Vec<ParameterInfo> {
        let doc_context = docblock.map(|d| ctx.context_at(d.offset));

        parameter_list
            .parameters
            .iter()
            .map(|param| {
                let name = param.variable.name.to_string();
                let is_variadic = param.ellipsis.is_some();
                let is_reference = param.ampersand.is_some();
                let default_value = param
                    .default_value
                    .as_ref()
                    .map(|d| ctx.doc.text(d.value.span()).trim().to_string());
                let defaults_to_null = default_value
                    .as_deref()
                    .is_some_and(|v| v.eq_ignore_ascii_case("null"));

                let doc_param = docblock.and_then(|d| d.data.param(&name));

                let mut types = match (doc_param.and_then(|p| p.ty.as_ref()), &doc_context) {
                    (Some(ty), Some(context)) => {
                        self.resolve_docblock_type(ty, context, ctx.class_scope)
                    }
                    _ => TypeList::new(),
                };

                if types.is_empty()
                    && let Some(hint) = &param.hint
                {
                    let context = ctx.context_at(param.span().start.offset);
                    types = self.resolve_hint(hint, &context, ctx.class_scope);
                    if defaults_to_null {
                        types.push(TypeInfo::keyword("null"));
                    }
                }

                if types.is_empty()
                    && let Some(default) = &param.default_value
                {
                    types = Self::literal_types(default.value);
                }

                if is_variadic {
                    types = types
                        .into_iter()
                        .map(|t| TypeInfo::new(format!("{}[]", t.local), format!("{}[]", t.fqn)))
                        .collect();
                }

                ParameterInfo {
                    is_nullable: types.iter().any(TypeInfo::is_null),
                    name,
                    types,
                    default_value,
                    is_reference,
                    is_variadic,
                    description: doc_param.map(|p| p.description.clone()).unwrap_or_default(),
                }
            })
            .collect()
    }

    /// Return types: `@return` wins over the native hint.
    pub(crate) fn extract_return_types(
        &self,
        return_hint: Option<&FunctionLikeReturnTypeHint<'_>>,
        docblock: Option<&NodeDocblock>,
        ctx: &SignatureCtx<'_, '_>,
    ) -> TypeList {
        if let Some(docblock) = docblock
            && let Some(ret) = &docblock.data.return_tag
        {
            let context = ctx.context_at(docblock.offset);
            let types = self.resolve_docblock_type(&ret.ty, &context, ctx.class_scope);
            if !types.is_empty() {
                return types;
            }
        }

        match return_hint {
            Some(rth) => {
                let context = ctx.context_at(rth.span().start.offset);
                self.resolve_hint(&rth.hint, &context, ctx.class_scope)
            }
            None => TypeList::new(),
        }
    }

    pub(crate) fn extract_throws(
        &self,
        docblock: Option<&NodeDocblock>,
        ctx: &SignatureCtx<'_, '_>,
    ) -> TypeList {
        let Some(docblock) = docblock else {
            return TypeList::new();
        };
        let context = ctx.context_at(docblock.offset);
        docblock
            .data
            .throws
            .iter()
            .flat_map(|t| self.resolve_docblock_type(&t.ty, &context, ctx.class_scope))
            .collect()
    }

    /// Resolve every member of a native type hint.
    pub(crate) fn resolve_hint(
        &self,
        hint: &Hint<'_>,
        context: &NameContext,
        class_scope: Option<&ClassScope>,
    ) -> TypeList {
        Self::hint_members(hint)
            .iter()
            .map(|m| self.resolve_type(m, context, class_scope))
            .collect()
    }
}

pub(crate) fn documentation_of(docblock: Option<&DocblockData>) -> Documentation {
    match docblock {
        Some(data) => Documentation {
            short_description: data.short_description.clone(),
            long_description: data.long_description.clone(),
            is_deprecated: data.is_deprecated,
            has_docblock: true,
            inherits_documentation: data.has_inherit_doc,
        },
        None => Documentation::default(),
    }
}
