/// Calls, member access and global constants.
///
/// The object or class part is deduced first; every classlike among its
/// types is resolved through [`Backend::flattened`] and the member's own
/// type list is collected.  `static` and `$this` in a member type stand
/// for the classlike the member was accessed on.
use mago_syntax::ast::*;

use crate::Backend;
use crate::names::{NameKind, is_builtin_type};
use crate::types::{TypeInfo, TypeList};

use super::DeductionCtx;

#[derive(Clone, Copy)]
enum Member<'n> {
    Method(&'n str),
    Property(&'n str),
    Constant(&'n str),
}

impl Backend {
    pub(super) fn call_types(&self, call: &Call<'_>, ctx: &DeductionCtx<'_, '_>) -> TypeList {
        match call {
            Call::Function(function_call) => match function_call.function {
                Expression::Identifier(ident) => self.function_return_types(ident.value(), ctx),
                _ => TypeList::new(),
            },
            Call::Method(method_call) => {
                let Some(name) = selector_name(&method_call.method) else {
                    return TypeList::new();
                };
                let objects = self.deduce(method_call.object, ctx);
                self.member_types(&objects, Member::Method(name))
            }
            Call::NullSafeMethod(method_call) => {
                let Some(name) = selector_name(&method_call.method) else {
                    return TypeList::new();
                };
                let objects = self.deduce(method_call.object, ctx);
                with_null(self.member_types(&objects, Member::Method(name)))
            }
            Call::StaticMethod(static_call) => {
                let Some(name) = selector_name(&static_call.method) else {
                    return TypeList::new();
                };
                let classes = self.class_reference_types(static_call.class, ctx);
                self.member_types(&classes, Member::Method(name))
            }
        }
    }

    pub(super) fn access_types(&self, access: &Access<'_>, ctx: &DeductionCtx<'_, '_>) -> TypeList {
        match access {
            Access::Property(property_access) => {
                let Some(name) = selector_name(&property_access.property) else {
                    return TypeList::new();
                };
                let objects = self.deduce(property_access.object, ctx);
                self.member_types(&objects, Member::Property(name))
            }
            Access::NullSafeProperty(property_access) => {
                let Some(name) = selector_name(&property_access.property) else {
                    return TypeList::new();
                };
                let objects = self.deduce(property_access.object, ctx);
                with_null(self.member_types(&objects, Member::Property(name)))
            }
            Access::StaticProperty(property_access) => {
                let Variable::Direct(variable) = &property_access.property else {
                    return TypeList::new();
                };
                let classes = self.class_reference_types(property_access.class, ctx);
                self.member_types(&classes, Member::Property(variable.name))
            }
            Access::ClassConstant(constant_access) => {
                let ClassLikeConstantSelector::Identifier(ident) = &constant_access.constant else {
                    return TypeList::new();
                };
                if ident.value.eq_ignore_ascii_case("class") {
                    return TypeList::single(TypeInfo::keyword("string"));
                }
                let classes = self.class_reference_types(constant_access.class, ctx);
                self.member_types(&classes, Member::Constant(ident.value))
            }
        }
    }

    fn function_return_types(&self, name: &str, ctx: &DeductionCtx<'_, '_>) -> TypeList {
        let context = ctx.name_context();
        let Ok(fqsen) = self.resolve_name(name, NameKind::Function, Some(&context)) else {
            return TypeList::new();
        };
        match self.store.function(&fqsen) {
            Some(function) => function.return_types,
            None => {
                tracing::debug!("unknown function {}", fqsen);
                TypeList::new()
            }
        }
    }

    pub(super) fn global_constant_types(&self, name: &str, ctx: &DeductionCtx<'_, '_>) -> TypeList {
        let context = ctx.name_context();
        let Ok(fqsen) = self.resolve_name(name, NameKind::Constant, Some(&context)) else {
            return TypeList::new();
        };
        self.store
            .constant(&fqsen)
            .map(|constant| constant.types)
            .unwrap_or_default()
    }

    fn member_types(&self, owners: &TypeList, member: Member<'_>) -> TypeList {
        let mut types = TypeList::new();
        for owner in owners {
            if is_builtin_type(&owner.fqn) || owner.fqn.ends_with("[]") {
                continue;
            }
            let Some(flattened) = self.flattened(&owner.fqn) else {
                continue;
            };
            let found = match member {
                Member::Method(name) => flattened.method(name).map(|m| &m.member.return_types),
                Member::Property(name) => flattened.property(name).map(|p| &p.member.types),
                Member::Constant(name) => flattened.constant(name).map(|c| &c.member.types),
            };
            let Some(found) = found else {
                tracing::debug!("{} has no member {:?}", owner.fqn, member_name(member));
                continue;
            };
            types.extend(found.iter().map(|t| bind_static(t, owner)));
        }
        types
    }
}

fn member_name(member: Member<'_>) -> &str {
    match member {
        Member::Method(name) | Member::Property(name) | Member::Constant(name) => name,
    }
}

fn selector_name<'n>(selector: &ClassLikeMemberSelector<'n>) -> Option<&'n str> {
    match selector {
        ClassLikeMemberSelector::Identifier(ident) => Some(ident.value),
        _ => None,
    }
}

/// Replace a late-bound `static` or `$this` with the accessed classlike.
fn bind_static(ty: &TypeInfo, owner: &TypeInfo) -> TypeInfo {
    let base = ty.fqn.trim_end_matches("[]");
    if base.eq_ignore_ascii_case("static") || base == "$this" {
        let suffix = &ty.fqn[base.len()..];
        TypeInfo::new(
            format!("{}{}", owner.local, suffix),
            format!("{}{}", owner.fqn, suffix),
        )
    } else {
        ty.clone()
    }
}

fn with_null(mut types: TypeList) -> TypeList {
    if !types.is_empty() {
        types.push(TypeInfo::keyword("null"));
    }
    types
}
