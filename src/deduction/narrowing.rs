/// Condition-driven narrowing of a variable's candidate types.
///
/// A condition is read for one truth value and yields at most one
/// [`Narrowing`] for the variable:
///
///   - `$v instanceof A`: the checked class when true
///   - `$v === null`, `$v == null` and their negations: null or not-null
///   - a bare `$v`: not-null when true, null when false
///   - `is_array($v)`, `is_string($v)`, ...: the builtin type when true
///
/// `!` flips the truth value.  Under `&&` class narrowings accumulate;
/// under `||` both operands must narrow and their types are unioned.  For
/// false the roles of the two operators swap.
use mago_span::HasSpan;
use mago_syntax::ast::*;

use crate::Backend;
use crate::parser::{argument_value, direct_variable_name};
use crate::types::{TypeInfo, TypeList};

use super::DeductionCtx;

#[derive(Debug, Clone)]
pub(super) enum Narrowing {
    /// Narrowed to classlikes.
    Types(TypeList),
    /// Narrowed to builtin types; existing matching candidates are kept.
    Builtin(TypeList),
    NotNull,
    Null,
}

impl Narrowing {
    pub fn apply(self, results: &mut TypeList) {
        match self {
            Narrowing::Types(types) => *results = types,
            Narrowing::Builtin(types) => {
                let mut kept = results.clone();
                kept.retain(|r| types.contains(&r.fqn));
                *results = if kept.is_empty() { types } else { kept };
            }
            Narrowing::NotNull => results.retain(|t| !t.is_null()),
            Narrowing::Null => *results = TypeList::single(TypeInfo::keyword("null")),
        }
    }

    fn and(left: Option<Self>, right: Option<Self>) -> Option<Self> {
        match (left, right) {
            (Some(Narrowing::Types(mut a)), Some(Narrowing::Types(b))) => {
                a.extend(b);
                Some(Narrowing::Types(a))
            }
            (Some(Narrowing::Types(a)), Some(Narrowing::NotNull))
            | (Some(Narrowing::NotNull), Some(Narrowing::Types(a))) => Some(Narrowing::Types(a)),
            (Some(Narrowing::Builtin(a)), Some(Narrowing::NotNull))
            | (Some(Narrowing::NotNull), Some(Narrowing::Builtin(a))) => {
                Some(Narrowing::Builtin(a))
            }
            (Some(left), _) => Some(left),
            (None, right) => right,
        }
    }

    fn or(left: Option<Self>, right: Option<Self>) -> Option<Self> {
        let null = || TypeInfo::keyword("null");
        match (left?, right?) {
            (Narrowing::Types(mut a), Narrowing::Types(b))
            | (Narrowing::Types(mut a), Narrowing::Builtin(b))
            | (Narrowing::Builtin(mut a), Narrowing::Types(b)) => {
                a.extend(b);
                Some(Narrowing::Types(a))
            }
            (Narrowing::Builtin(mut a), Narrowing::Builtin(b)) => {
                a.extend(b);
                Some(Narrowing::Builtin(a))
            }
            (Narrowing::Types(mut a), Narrowing::Null) | (Narrowing::Null, Narrowing::Types(mut a)) => {
                a.push(null());
                Some(Narrowing::Types(a))
            }
            (Narrowing::Builtin(mut a), Narrowing::Null)
            | (Narrowing::Null, Narrowing::Builtin(mut a)) => {
                a.push(null());
                Some(Narrowing::Builtin(a))
            }
            (Narrowing::Null, Narrowing::Null) => Some(Narrowing::Null),
            (Narrowing::NotNull, Narrowing::NotNull) => Some(Narrowing::NotNull),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Logical {
    And,
    Or,
}

fn logical(operator: &BinaryOperator) -> Option<Logical> {
    match operator {
        BinaryOperator::And(_) | BinaryOperator::LowAnd(_) => Some(Logical::And),
        BinaryOperator::Or(_) | BinaryOperator::LowOr(_) => Some(Logical::Or),
        _ => None,
    }
}

fn is_null_literal(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::Literal(Literal::Null(_)) => true,
        Expression::ConstantAccess(access) => access.name.value().eq_ignore_ascii_case("null"),
        Expression::Parenthesized(inner) => is_null_literal(inner.expression),
        _ => false,
    }
}

/// The builtin types a type-checking function narrows to.  `None` inside
/// means `is_null`.
fn type_check(function: &str) -> Option<Option<&'static [&'static str]>> {
    let types: &'static [&'static str] = match function {
        "is_null" => return Some(None),
        "is_array" => &["array"],
        "is_bool" => &["bool"],
        "is_callable" => &["callable"],
        "is_float" | "is_double" => &["float"],
        "is_int" | "is_integer" | "is_long" => &["int"],
        "is_string" => &["string"],
        "is_object" => &["object"],
        "is_resource" => &["resource"],
        "is_iterable" => &["iterable"],
        "is_numeric" => &["int", "float", "string"],
        "is_scalar" => &["int", "float", "string", "bool"],
        _ => return None,
    };
    Some(Some(types))
}

impl Backend {
    /// Narrow `results` by `condition` evaluated to `truthy`.
    pub(super) fn apply_condition(
        &self,
        condition: &Expression<'_>,
        truthy: bool,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
    ) {
        if let Some(narrowing) = self.narrowing_for(condition, truthy, var, ctx) {
            narrowing.apply(results);
        }
    }

    pub(super) fn narrowing_for(
        &self,
        condition: &Expression<'_>,
        truthy: bool,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
    ) -> Option<Narrowing> {
        match condition {
            Expression::Parenthesized(inner) => {
                self.narrowing_for(inner.expression, truthy, var, ctx)
            }
            Expression::UnaryPrefix(prefix) if prefix.operator.is_not() => {
                self.narrowing_for(prefix.operand, !truthy, var, ctx)
            }
            Expression::Binary(binary) if binary.operator.is_instanceof() => {
                if !truthy || direct_variable_name(binary.lhs) != Some(var) {
                    return None;
                }
                let types = self.class_reference_types(binary.rhs, ctx);
                (!types.is_empty()).then_some(Narrowing::Types(types))
            }
            Expression::Binary(binary) if logical(&binary.operator).is_some() => {
                let left = self.narrowing_for(binary.lhs, truthy, var, ctx);
                let right = self.narrowing_for(binary.rhs, truthy, var, ctx);
                // !(a && b) is (!a || !b)
                match (logical(&binary.operator), truthy) {
                    (Some(Logical::And), true) | (Some(Logical::Or), false) => {
                        Narrowing::and(left, right)
                    }
                    _ => Narrowing::or(left, right),
                }
            }
            Expression::Binary(binary) => {
                let is_equality = match binary.operator {
                    BinaryOperator::Identical(_) | BinaryOperator::Equal(_) => true,
                    BinaryOperator::NotIdentical(_)
                    | BinaryOperator::NotEqual(_)
                    | BinaryOperator::AngledNotEqual(_) => false,
                    _ => return None,
                };
                let compares_var = (direct_variable_name(binary.lhs) == Some(var)
                    && is_null_literal(binary.rhs))
                    || (direct_variable_name(binary.rhs) == Some(var)
                        && is_null_literal(binary.lhs));
                if !compares_var {
                    return None;
                }
                Some(if is_equality == truthy {
                    Narrowing::Null
                } else {
                    Narrowing::NotNull
                })
            }
            Expression::Variable(_) if direct_variable_name(condition) == Some(var) => {
                Some(if truthy {
                    Narrowing::NotNull
                } else {
                    Narrowing::Null
                })
            }
            Expression::Call(Call::Function(call)) => {
                let Expression::Identifier(ident) = call.function else {
                    return None;
                };
                let name = ident.value().trim_start_matches('\\').to_ascii_lowercase();
                let checked = type_check(&name)?;
                let argument = call.argument_list.arguments.iter().next()?;
                if direct_variable_name(argument_value(argument)) != Some(var) {
                    return None;
                }
                match (checked, truthy) {
                    (None, true) => Some(Narrowing::Null),
                    (None, false) => Some(Narrowing::NotNull),
                    (Some(types), true) => Some(Narrowing::Builtin(
                        types.iter().map(|t| TypeInfo::keyword(t)).collect(),
                    )),
                    (Some(_), false) => None,
                }
            }
            _ => None,
        }
    }

    /// Apply the narrowing of the conditions enclosing the position within
    /// `expr`: ternary branches and the right operand of `&&` / `||`.
    pub(super) fn narrow_inside_expression(
        &self,
        expr: &Expression<'_>,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
    ) {
        if !ctx.contains(expr.span()) {
            return;
        }
        match expr {
            Expression::Parenthesized(inner) => {
                self.narrow_inside_expression(inner.expression, var, ctx, results);
            }
            Expression::Conditional(ternary) => {
                if ctx.contains(ternary.condition.span()) {
                    self.narrow_inside_expression(ternary.condition, var, ctx, results);
                } else if let Some(then) = ternary.then
                    && ctx.contains(then.span())
                {
                    self.apply_condition(ternary.condition, true, var, ctx, results);
                    self.narrow_inside_expression(then, var, ctx, results);
                } else {
                    self.apply_condition(ternary.condition, false, var, ctx, results);
                    self.narrow_inside_expression(ternary.r#else, var, ctx, results);
                }
            }
            Expression::Binary(binary) if logical(&binary.operator).is_some() => {
                if ctx.contains(binary.rhs.span()) {
                    let truthy = logical(&binary.operator) == Some(Logical::And);
                    self.apply_condition(binary.lhs, truthy, var, ctx, results);
                    self.narrow_inside_expression(binary.rhs, var, ctx, results);
                } else {
                    self.narrow_inside_expression(binary.lhs, var, ctx, results);
                }
            }
            Expression::Binary(binary) => {
                self.narrow_inside_expression(binary.lhs, var, ctx, results);
                self.narrow_inside_expression(binary.rhs, var, ctx, results);
            }
            Expression::Assignment(assignment) => {
                self.narrow_inside_expression(assignment.rhs, var, ctx, results);
            }
            Expression::UnaryPrefix(prefix) => {
                self.narrow_inside_expression(prefix.operand, var, ctx, results);
            }
            Expression::Match(match_expr) => {
                for arm in match_expr.arms.iter() {
                    self.narrow_inside_expression(arm.expression(), var, ctx, results);
                }
            }
            Expression::Call(call) => {
                let (callee, arguments) = match call {
                    Call::Function(c) => (c.function, &c.argument_list.arguments),
                    Call::Method(c) => (c.object, &c.argument_list.arguments),
                    Call::NullSafeMethod(c) => (c.object, &c.argument_list.arguments),
                    Call::StaticMethod(c) => (c.class, &c.argument_list.arguments),
                };
                self.narrow_inside_expression(callee, var, ctx, results);
                for argument in arguments.iter() {
                    self.narrow_inside_expression(argument_value(argument), var, ctx, results);
                }
            }
            Expression::Access(Access::Property(access)) => {
                self.narrow_inside_expression(access.object, var, ctx, results);
            }
            Expression::Access(Access::NullSafeProperty(access)) => {
                self.narrow_inside_expression(access.object, var, ctx, results);
            }
            _ => {}
        }
    }
}
