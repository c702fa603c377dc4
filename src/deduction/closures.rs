/// Closure and arrow-function scopes.
///
/// A closure body is a fresh scope: outer candidates only flow in through
/// a `use` capture.  A by-value capture freezes the candidates at the
/// point the closure is created; a by-reference capture also sees the
/// assignments the outer scope makes after that point.  Arrow functions
/// capture the whole outer scope by value.  Parameters shadow captures.
use mago_span::HasSpan;
use mago_syntax::ast::*;
use mago_syntax::ast::sequence::TokenSeparatedSequence;

use crate::Backend;
use crate::parser::argument_value;
use crate::types::TypeList;

use super::DeductionCtx;

pub(super) enum ClosureScope {
    /// The position is not inside a closure of the statement.
    Outside,
    Inside,
    /// Inside, and the variable is captured by reference.
    InsideByReference,
}

#[derive(Clone, Copy)]
pub(super) enum FunctionLike<'b> {
    Closure(&'b Closure<'b>),
    Arrow(&'b ArrowFunction<'b>),
}

impl Backend {
    /// If the position lies in a closure within `statement`, answer `var`
    /// from the closure's scope into `results`.
    pub(super) fn closure_scope_in_statement<'b>(
        &self,
        statement: &'b Statement<'b>,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
    ) -> ClosureScope {
        let expressions: Vec<&'b Expression<'b>> = match statement {
            Statement::Expression(expr_stmt) => vec![expr_stmt.expression],
            Statement::Return(ret) => ret.value.into_iter().collect(),
            Statement::Echo(echo) => echo.values.iter().copied().collect(),
            Statement::If(if_stmt) => vec![if_stmt.condition],
            Statement::While(while_stmt) => vec![while_stmt.condition],
            Statement::Foreach(foreach) => vec![foreach.expression],
            Statement::Switch(switch) => vec![switch.expression],
            _ => Vec::new(),
        };

        for expr in expressions {
            if let Some(function_like) = find_function_like(expr, ctx.offset) {
                return self.variable_in_closure(function_like, var, ctx, results);
            }
        }
        ClosureScope::Outside
    }

    fn variable_in_closure(
        &self,
        function_like: FunctionLike<'_>,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        outer: &mut TypeList,
    ) -> ClosureScope {
        match function_like {
            FunctionLike::Closure(closure) => {
                let docblock = ctx.doc.doc_ctx().docblock_for(closure, None);
                let parameters =
                    self.extract_parameters(&closure.parameter_list, docblock.as_ref(), &ctx.signature_ctx());

                let mut scope = ClosureScope::Inside;
                let mut results = TypeList::new();
                if let Some(parameter) = parameters.iter().find(|p| p.name == var) {
                    results = parameter.types.clone();
                } else if let Some(use_clause) = &closure.use_clause
                    && let Some(captured) = use_clause
                        .variables
                        .iter()
                        .find(|u| u.variable.name == var)
                {
                    results = outer.clone();
                    if captured.ampersand.is_some() {
                        scope = ClosureScope::InsideByReference;
                    }
                }

                let body = &closure.body;
                if !self.walk_statements(body.statements.iter(), var, ctx, &mut results, false) {
                    self.apply_var_override(var, body.left_brace.start.offset, ctx, &mut results);
                }
                *outer = results;
                scope
            }
            FunctionLike::Arrow(arrow) => {
                let docblock = ctx.doc.doc_ctx().docblock_for(arrow, None);
                let parameters =
                    self.extract_parameters(&arrow.parameter_list, docblock.as_ref(), &ctx.signature_ctx());

                let mut results = match parameters.iter().find(|p| p.name == var) {
                    Some(parameter) => parameter.types.clone(),
                    None => outer.clone(),
                };
                match find_function_like(arrow.expression, ctx.offset) {
                    Some(nested) => {
                        self.variable_in_closure(nested, var, ctx, &mut results);
                    }
                    None => self.narrow_inside_expression(arrow.expression, var, ctx, &mut results),
                }
                *outer = results;
                ClosureScope::Inside
            }
        }
    }
}

fn within(offset: u32, start: u32, end: u32) -> bool {
    start <= offset && offset <= end
}

/// The outermost closure or arrow function in `expr` whose body holds
/// `offset`.
fn find_function_like<'b>(expr: &'b Expression<'b>, offset: u32) -> Option<FunctionLike<'b>> {
    let span = expr.span();
    if !within(offset, span.start.offset, span.end.offset) {
        return None;
    }

    match expr {
        Expression::Closure(closure) => within(
            offset,
            closure.body.left_brace.start.offset,
            closure.body.right_brace.end.offset,
        )
        .then_some(FunctionLike::Closure(closure)),
        Expression::ArrowFunction(arrow) => within(
            offset,
            arrow.arrow.start.offset,
            arrow.expression.span().end.offset,
        )
        .then_some(FunctionLike::Arrow(arrow)),
        Expression::Parenthesized(p) => find_function_like(p.expression, offset),
        Expression::Assignment(a) => {
            find_function_like(a.lhs, offset).or_else(|| find_function_like(a.rhs, offset))
        }
        Expression::Binary(b) => {
            find_function_like(b.lhs, offset).or_else(|| find_function_like(b.rhs, offset))
        }
        Expression::Conditional(c) => find_function_like(c.condition, offset)
            .or_else(|| c.then.and_then(|e| find_function_like(e, offset)))
            .or_else(|| find_function_like(c.r#else, offset)),
        Expression::Call(call) => match call {
            Call::Function(fc) => find_function_like(fc.function, offset)
                .or_else(|| in_arguments(&fc.argument_list.arguments, offset)),
            Call::Method(mc) => find_function_like(mc.object, offset)
                .or_else(|| in_arguments(&mc.argument_list.arguments, offset)),
            Call::NullSafeMethod(mc) => find_function_like(mc.object, offset)
                .or_else(|| in_arguments(&mc.argument_list.arguments, offset)),
            Call::StaticMethod(sc) => find_function_like(sc.class, offset)
                .or_else(|| in_arguments(&sc.argument_list.arguments, offset)),
        },
        Expression::Array(array) => array.elements.iter().find_map(|e| in_element(e, offset)),
        Expression::LegacyArray(array) => array.elements.iter().find_map(|e| in_element(e, offset)),
        Expression::Match(m) => find_function_like(m.expression, offset).or_else(|| {
            m.arms
                .iter()
                .find_map(|arm| find_function_like(arm.expression(), offset))
        }),
        Expression::Access(access) => match access {
            Access::Property(pa) => find_function_like(pa.object, offset),
            Access::NullSafeProperty(pa) => find_function_like(pa.object, offset),
            Access::StaticProperty(pa) => find_function_like(pa.class, offset),
            Access::ClassConstant(pa) => find_function_like(pa.class, offset),
        },
        Expression::Instantiation(inst) => inst
            .argument_list
            .as_ref()
            .and_then(|args| in_arguments(&args.arguments, offset)),
        Expression::UnaryPrefix(u) => find_function_like(u.operand, offset),
        Expression::UnaryPostfix(u) => find_function_like(u.operand, offset),
        Expression::Yield(y) => match y {
            Yield::Value(yv) => yv.value.and_then(|v| find_function_like(v, offset)),
            Yield::Pair(yp) => find_function_like(yp.key, offset)
                .or_else(|| find_function_like(yp.value, offset)),
            Yield::From(yf) => find_function_like(yf.iterator, offset),
        },
        Expression::Throw(t) => find_function_like(t.exception, offset),
        Expression::Clone(c) => find_function_like(c.object, offset),
        Expression::Pipe(p) => {
            find_function_like(p.input, offset).or_else(|| find_function_like(p.callable, offset))
        }
        _ => None,
    }
}

fn in_arguments<'b>(
    arguments: &'b TokenSeparatedSequence<'b, Argument<'b>>,
    offset: u32,
) -> Option<FunctionLike<'b>> {
    arguments
        .iter()
        .find_map(|arg| find_function_like(argument_value(arg), offset))
}

fn in_element<'b>(element: &'b ArrayElement<'b>, offset: u32) -> Option<FunctionLike<'b>> {
    match element {
        ArrayElement::KeyValue(kv) => {
            find_function_like(kv.key, offset).or_else(|| find_function_like(kv.value, offset))
        }
        ArrayElement::Value(v) => find_function_like(v.value, offset),
        ArrayElement::Variadic(v) => find_function_like(v.value, offset),
        ArrayElement::Missing(_) => None,
    }
}
