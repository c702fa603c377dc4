/// Class, interface, trait, and enum extraction.
///
/// Each declaration becomes a [`ClassLikeInfo`] holding only its own
/// members: methods, properties, constants (enum cases included), plus the
/// magic `@property` / `@method` members of its docblock.  Inherited members
/// are merged at query time by [`crate::inheritance`].
///
/// Enums are stored as final classes whose cases are constants typed as
/// the enum itself.
use mago_span::{HasSpan, Span};
use mago_syntax::ast::class_like::trait_use::{
    TraitUseAdaptation, TraitUseMethodReference, TraitUseSpecification,
};
use mago_syntax::ast::*;

use crate::Backend;
use crate::docblock::MethodTag;
use crate::errors::StoreError;
use crate::names::{ClassScope, NameContext, NameKind};
use crate::types::*;
use crate::util::join_namespace;

use super::signatures::{SignatureCtx, documentation_of};
use super::{Document, NodeDocblock};

/// The pieces shared by every classlike declaration form.
pub(crate) struct Header<'c, 'a> {
    pub span: Span,
    pub name: &'a str,
    pub kind: ClassLikeKind,
    pub members: Vec<&'c ClassLikeMember<'a>>,
    pub parents: Vec<&'a str>,
    pub interfaces: Vec<&'a str>,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_enum: bool,
}

impl<'c, 'a> Header<'c, 'a> {
    /// The header of a classlike statement, `None` for anything else.
    pub fn of(statement: &'c Statement<'a>) -> Option<Self> {
        let header = match statement {
            Statement::Class(class) => Header {
                span: class.span(),
                name: class.name.value,
                kind: ClassLikeKind::Class,
                members: class.members.iter().collect(),
                parents: class
                    .extends
                    .as_ref()
                    .and_then(|ext| ext.types.first())
                    .map(|ident| ident.value())
                    .into_iter()
                    .collect(),
                interfaces: class
                    .implements
                    .as_ref()
                    .map(|imp| imp.types.iter().map(|ident| ident.value()).collect())
                    .unwrap_or_default(),
                is_abstract: class.modifiers.contains_abstract(),
                is_final: class.modifiers.contains_final(),
                is_enum: false,
            },
            Statement::Interface(iface) => Header {
                span: iface.span(),
                name: iface.name.value,
                kind: ClassLikeKind::Interface,
                members: iface.members.iter().collect(),
                parents: iface
                    .extends
                    .as_ref()
                    .map(|ext| ext.types.iter().map(|ident| ident.value()).collect())
                    .unwrap_or_default(),
                interfaces: Vec::new(),
                is_abstract: false,
                is_final: false,
                is_enum: false,
            },
            Statement::Trait(trait_def) => Header {
                span: trait_def.span(),
                name: trait_def.name.value,
                kind: ClassLikeKind::Trait,
                members: trait_def.members.iter().collect(),
                parents: Vec::new(),
                interfaces: Vec::new(),
                is_abstract: false,
                is_final: false,
                is_enum: false,
            },
            Statement::Enum(enum_def) => {
                let mut interfaces: Vec<&str> = enum_def
                    .implements
                    .as_ref()
                    .map(|imp| imp.types.iter().map(|ident| ident.value()).collect())
                    .unwrap_or_default();
                // Enums implicitly implement UnitEnum or BackedEnum.
                interfaces.push(if enum_def.backing_type_hint.is_some() {
                    "\\BackedEnum"
                } else {
                    "\\UnitEnum"
                });
                Header {
                    span: enum_def.span(),
                    name: enum_def.name.value,
                    kind: ClassLikeKind::Class,
                    members: enum_def.members.iter().collect(),
                    parents: Vec::new(),
                    interfaces,
                    is_abstract: false,
                    is_final: true,
                    is_enum: true,
                }
            }
            _ => return None,
        };
        Some(header)
    }
}

impl Backend {
    /// Index one classlike statement.  Returns `Ok(false)` for statements
    /// that are not classlikes.
    pub(crate) fn index_classlike(
        &self,
        statement: &Statement<'_>,
        doc: &Document<'_>,
        scopes: &[NamespaceScope],
    ) -> Result<bool, StoreError> {
        let Some(header) = Header::of(statement) else {
            return Ok(false);
        };

        let info = self.extract_classlike(header, statement, doc, scopes);
        tracing::debug!("indexed {:?} {}", info.kind, info.fqcn);
        self.store.upsert_classlike(info)?;
        Ok(true)
    }

    fn extract_classlike(
        &self,
        header: Header<'_, '_>,
        statement: &Statement<'_>,
        doc: &Document<'_>,
        scopes: &[NamespaceScope],
    ) -> ClassLikeInfo {
        let span = header.span;
        let context = doc.name_context_at(scopes, span.start.offset);
        let fqcn = join_namespace(context.namespace.as_deref(), header.name);

        let resolve = |name: &str| {
            self.resolve_name(name, NameKind::Classlike, Some(&context))
                .unwrap_or_else(|_| name.to_string())
        };
        let parents: Vec<String> = header.parents.iter().map(|p| resolve(p)).collect();
        let interfaces: Vec<String> = header.interfaces.iter().map(|i| resolve(i)).collect();

        let class_scope = ClassScope {
            fqcn: fqcn.clone(),
            parent: match header.kind {
                ClassLikeKind::Class => parents.first().cloned(),
                _ => None,
            },
        };
        let ctx = SignatureCtx {
            doc,
            scopes,
            class_scope: Some(&class_scope),
        };

        let docblock = doc.doc_ctx().docblock_for(statement, None);

        let mut info = ClassLikeInfo {
            fqcn: fqcn.clone(),
            name: header.name.to_string(),
            kind: header.kind,
            file: doc.path.to_string(),
            start_line: doc.line_of(span.start.offset),
            end_line: doc.line_of(span.end.offset),
            documentation: documentation_of(docblock.as_ref().map(|d| &d.data)),
            is_abstract: header.is_abstract,
            is_final: header.is_final,
            is_enum: header.is_enum,
            parents,
            interfaces,
            traits: Vec::new(),
            trait_aliases: Vec::new(),
            trait_precedences: Vec::new(),
            constants: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        };

        for member in header.members {
            self.extract_member(member, &mut info, &ctx);
        }

        if let Some(docblock) = &docblock {
            self.merge_magic_members(docblock, &mut info, &ctx);
        }

        info
    }

    fn extract_member(
        &self,
        member: &ClassLikeMember<'_>,
        info: &mut ClassLikeInfo,
        ctx: &SignatureCtx<'_, '_>,
    ) {
        let doc = ctx.doc;
        let fqcn = info.fqcn.clone();

        match member {
            ClassLikeMember::Method(method) => {
                let docblock = doc.doc_ctx().docblock_for(method, None);
                let parameters =
                    self.extract_parameters(&method.parameter_list, docblock.as_ref(), ctx);

                // Promoted constructor parameters are properties too.
                if method.name.value.eq_ignore_ascii_case("__construct") {
                    for (param, param_info) in
                        method.parameter_list.parameters.iter().zip(&parameters)
                    {
                        if param.is_promoted_property() {
                            info.properties.push(PropertyInfo {
                                name: param_info.name.trim_start_matches('$').to_string(),
                                declaring_fqcn: fqcn.clone(),
                                visibility: Self::extract_visibility(param.modifiers.iter()),
                                is_static: false,
                                is_magic: false,
                                is_readable: true,
                                is_writable: true,
                                line: doc.line_of(param.span().start.offset),
                                default_value: param_info.default_value.clone(),
                                types: param_info.types.clone(),
                                documentation: Documentation {
                                    short_description: param_info.description.clone(),
                                    ..Documentation::default()
                                },
                            });
                        }
                    }
                }

                info.methods.push(MethodInfo {
                    name: method.name.value.to_string(),
                    declaring_fqcn: fqcn,
                    visibility: Self::extract_visibility(method.modifiers.iter()),
                    is_static: method.modifiers.iter().any(|m| m.is_static()),
                    is_abstract: method.modifiers.contains_abstract()
                        || info.kind == ClassLikeKind::Interface,
                    is_final: method.modifiers.contains_final(),
                    is_magic: false,
                    line: doc.line_of(method.span().start.offset),
                    parameters,
                    return_types: self.extract_return_types(
                        method.return_type_hint.as_ref(),
                        docblock.as_ref(),
                        ctx,
                    ),
                    throws: self.extract_throws(docblock.as_ref(), ctx),
                    documentation: documentation_of(docblock.as_ref().map(|d| &d.data)),
                });
            }
            ClassLikeMember::Property(property) => {
                let is_static = property.modifiers().iter().any(|m| m.is_static());
                let visibility = Self::extract_visibility(property.modifiers().iter());
                let hint_context = ctx.context_at(member.span().start.offset);
                let hint_types = property
                    .hint()
                    .map(|h| self.resolve_hint(h, &hint_context, ctx.class_scope))
                    .unwrap_or_default();

                for var in property.variables().iter() {
                    let var_name = var.name;
                    let docblock = doc.doc_ctx().docblock_for(member, Some(var_name));
                    let mut types = self.var_tag_types(docblock.as_ref(), var_name, ctx);
                    if types.is_empty() {
                        types = hint_types.clone();
                    }

                    info.properties.push(PropertyInfo {
                        name: var_name.trim_start_matches('$').to_string(),
                        declaring_fqcn: fqcn.clone(),
                        visibility,
                        is_static,
                        is_magic: false,
                        is_readable: true,
                        is_writable: true,
                        line: doc.line_of(member.span().start.offset),
                        default_value: None,
                        types,
                        documentation: documentation_of(docblock.as_ref().map(|d| &d.data)),
                    });
                }
            }
            ClassLikeMember::Constant(constant) => {
                let visibility = Self::extract_visibility(constant.modifiers.iter());
                let docblock = doc.doc_ctx().docblock_for(member, None);
                let hint_types = constant
                    .hint
                    .as_ref()
                    .map(|h| {
                        let context = ctx.context_at(member.span().start.offset);
                        self.resolve_hint(h, &context, ctx.class_scope)
                    })
                    .unwrap_or_default();

                for item in constant.items.iter() {
                    let name = item.name.value;
                    let mut types = self.var_tag_types(docblock.as_ref(), name, ctx);
                    if types.is_empty() {
                        types = hint_types.clone();
                    }
                    if types.is_empty() {
                        types = self.deduce_type(item.value, doc, item.value.span().end.offset);
                    }
                    info.constants.push(ClassConstantInfo {
                        name: name.to_string(),
                        declaring_fqcn: fqcn.clone(),
                        visibility,
                        line: doc.line_of(item.span().start.offset),
                        default_value: doc.text(item.value.span()).trim().to_string(),
                        types,
                        documentation: documentation_of(docblock.as_ref().map(|d| &d.data)),
                    });
                }
            }
            ClassLikeMember::EnumCase(enum_case) => {
                let docblock = doc.doc_ctx().docblock_for(member, None);
                info.constants.push(ClassConstantInfo {
                    name: enum_case.item.name().value.to_string(),
                    declaring_fqcn: fqcn.clone(),
                    visibility: Visibility::Public,
                    line: doc.line_of(member.span().start.offset),
                    default_value: String::new(),
                    types: TypeList::single(TypeInfo::new(info.name.clone(), fqcn)),
                    documentation: documentation_of(docblock.as_ref().map(|d| &d.data)),
                });
            }
            ClassLikeMember::TraitUse(trait_use) => {
                let context = ctx.context_at(trait_use.span().start.offset);
                let resolve = |name: &str| {
                    self.resolve_name(name, NameKind::Classlike, Some(&context))
                        .unwrap_or_else(|_| name.to_string())
                };

                for trait_name in trait_use.trait_names.iter() {
                    let resolved = resolve(trait_name.value());
                    if !info.traits.contains(&resolved) {
                        info.traits.push(resolved);
                    }
                }

                // `insteadof` (precedence) and `as` (alias) adaptations.
                if let TraitUseSpecification::Concrete(spec) = &trait_use.specification {
                    for adaptation in spec.adaptations.iter() {
                        match adaptation {
                            TraitUseAdaptation::Precedence(prec) => {
                                info.trait_precedences.push(TraitPrecedence {
                                    trait_fqcn: resolve(prec.method_reference.trait_name.value()),
                                    method: prec.method_reference.method_name.value.to_string(),
                                    insteadof: prec
                                        .trait_names
                                        .iter()
                                        .map(|id| resolve(id.value()))
                                        .collect(),
                                });
                            }
                            TraitUseAdaptation::Alias(alias_adapt) => {
                                let (trait_fqcn, method) = match &alias_adapt.method_reference {
                                    TraitUseMethodReference::Identifier(ident) => {
                                        (None, ident.value.to_string())
                                    }
                                    TraitUseMethodReference::Absolute(abs) => (
                                        Some(resolve(abs.trait_name.value())),
                                        abs.method_name.value.to_string(),
                                    ),
                                };
                                let visibility = alias_adapt.visibility.as_ref().map(|m| {
                                    if m.is_private() {
                                        Visibility::Private
                                    } else if m.is_protected() {
                                        Visibility::Protected
                                    } else {
                                        Visibility::Public
                                    }
                                });
                                info.trait_aliases.push(TraitAlias {
                                    trait_fqcn,
                                    method,
                                    alias: alias_adapt.alias.as_ref().map(|a| a.value.to_string()),
                                    visibility,
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    /// Types of the `@var` tag documenting `name`, if any.
    fn var_tag_types(
        &self,
        docblock: Option<&NodeDocblock>,
        name: &str,
        ctx: &SignatureCtx<'_, '_>,
    ) -> TypeList {
        let Some(docblock) = docblock else {
            return TypeList::new();
        };
        match docblock.data.var_for(name) {
            Some(var) => {
                let context = ctx.context_at(docblock.offset);
                self.resolve_docblock_type(&var.ty, &context, ctx.class_scope)
            }
            None => TypeList::new(),
        }
    }

    /// Add `@property` and `@method` members from the classlike docblock.
    /// Declared members of the same name win.
    fn merge_magic_members(
        &self,
        docblock: &NodeDocblock,
        info: &mut ClassLikeInfo,
        ctx: &SignatureCtx<'_, '_>,
    ) {
        let context = ctx.context_at(docblock.offset);
        let line = ctx.doc.line_of(docblock.offset);

        for prop in &docblock.data.properties {
            if info.properties.iter().any(|p| p.name == prop.name) {
                continue;
            }
            info.properties.push(PropertyInfo {
                name: prop.name.clone(),
                declaring_fqcn: info.fqcn.clone(),
                visibility: Visibility::Public,
                is_static: false,
                is_magic: true,
                is_readable: prop.is_readable,
                is_writable: prop.is_writable,
                line,
                default_value: None,
                types: prop
                    .ty
                    .as_ref()
                    .map(|ty| self.resolve_docblock_type(ty, &context, ctx.class_scope))
                    .unwrap_or_default(),
                documentation: Documentation {
                    short_description: prop.description.clone(),
                    ..Documentation::default()
                },
            });
        }

        for method in &docblock.data.methods {
            if info.find_method(&method.name).is_some() {
                continue;
            }
            let magic = self.magic_method(method, &context, ctx.class_scope, &info.fqcn, line);
            info.methods.push(magic);
        }
    }

    fn magic_method(
        &self,
        tag: &MethodTag,
        context: &NameContext,
        class_scope: Option<&ClassScope>,
        fqcn: &str,
        line: u32,
    ) -> MethodInfo {
        let parameters = tag
            .parameters
            .iter()
            .map(|p| {
                let types = p
                    .ty
                    .as_ref()
                    .map(|ty| self.resolve_docblock_type(ty, context, class_scope))
                    .unwrap_or_default();
                ParameterInfo {
                    name: p.name.clone(),
                    is_nullable: types.iter().any(TypeInfo::is_null),
                    types,
                    default_value: p.default_value.clone(),
                    is_reference: p.is_reference,
                    is_variadic: p.is_variadic,
                    description: String::new(),
                }
            })
            .collect();

        MethodInfo {
            name: tag.name.clone(),
            declaring_fqcn: fqcn.to_string(),
            visibility: Visibility::Public,
            is_static: tag.is_static,
            is_abstract: false,
            is_final: false,
            is_magic: true,
            line,
            parameters,
            return_types: tag
                .return_type
                .as_ref()
                .map(|ty| self.resolve_docblock_type(ty, context, class_scope))
                .unwrap_or_default(),
            throws: TypeList::new(),
            documentation: Documentation {
                short_description: tag.description.clone(),
                ..Documentation::default()
            },
        }
    }
}
