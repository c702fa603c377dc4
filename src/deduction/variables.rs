/// Variable deduction by walking the enclosing scope.
///
/// The scope is the innermost function or method body containing the
/// position, else the namespace or file top level.  Its statements are
/// walked in order up to the position, tracking the candidate types of one
/// variable:
///
///   - a plain assignment replaces the candidates, or adds to them when it
///     sits in a branch or loop that may not have run
///   - `if`/`elseif`/`else`, `while` and ternaries narrow inside the branch
///     holding the position and nowhere else
///   - `foreach` value variables take the element type of the iterated
///     expression, `catch` variables the caught types
///   - parameters seed the walk with their declared types
///
/// A named inline `/** @var T $x */` takes effect where it stands: before
/// a statement of the walked scope, or directly before the position.
/// Later assignments replace it like any other candidate.
use mago_span::HasSpan;
use mago_syntax::ast::*;

use crate::Backend;
use crate::docblock::{Tag, find_inline_var_docblock, parse_docblock};
use crate::parser::classes::Header;
use crate::parser::{NodeDocblock, direct_variable_name};
use crate::types::{TypeInfo, TypeList};

use super::DeductionCtx;
use super::closures::ClosureScope;

/// One branch of an `if` statement.
struct Branch<'b> {
    start: u32,
    end: u32,
    statements: Vec<&'b Statement<'b>>,
    /// Conditions that hold inside the branch, with their truth value.
    conditions: Vec<(&'b Expression<'b>, bool)>,
    /// The branch's own condition, for `if` and `elseif`.
    condition: Option<&'b Expression<'b>>,
}

impl Backend {
    pub(super) fn deduce_variable(&self, var: &str, ctx: &DeductionCtx<'_, '_>) -> TypeList {
        let mut results = TypeList::new();
        self.variable_in_statements(ctx.doc.statements(), 0, var, ctx, &mut results);
        results
    }

    /// Find the function-like scope holding the position and walk it.
    fn variable_in_statements<'b>(
        &self,
        statements: &'b [Statement<'b>],
        scope_start: u32,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
    ) {
        let enclosing = statements.iter().find(|s| ctx.contains(s.span()));

        match enclosing {
            Some(Statement::Namespace(ns)) => {
                let start = ns.span().start.offset;
                return self.variable_in_statements(
                    ns.statements().as_slice(),
                    start,
                    var,
                    ctx,
                    results,
                );
            }
            Some(Statement::Function(function)) => {
                if ctx.contains(function.body.span()) {
                    let docblock = ctx.doc.doc_ctx().docblock_for(function, None);
                    self.variable_in_function_like(
                        &function.parameter_list,
                        docblock.as_ref(),
                        function.body.statements.as_slice(),
                        function.body.left_brace.start.offset,
                        var,
                        ctx,
                        results,
                    );
                }
                return;
            }
            Some(statement) => {
                if let Some(header) = Header::of(statement) {
                    for member in header.members {
                        if let ClassLikeMember::Method(method) = member
                            && let MethodBody::Concrete(block) = &method.body
                            && ctx.contains(block.span())
                        {
                            let docblock = ctx.doc.doc_ctx().docblock_for(method, None);
                            self.variable_in_function_like(
                                &method.parameter_list,
                                docblock.as_ref(),
                                block.statements.as_slice(),
                                block.left_brace.start.offset,
                                var,
                                ctx,
                                results,
                            );
                            return;
                        }
                    }
                    // Inside a classlike but outside any method body.
                    return;
                }
            }
            None => {}
        }

        if !self.walk_statements(statements, var, ctx, results, false) {
            self.apply_var_override(var, scope_start, ctx, results);
        }
    }

    /// Seed the candidates from the parameters, walk the body, then apply
    /// any inline `@var` override.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn variable_in_function_like<'b>(
        &self,
        parameter_list: &FunctionLikeParameterList<'_>,
        docblock: Option<&NodeDocblock>,
        body: &'b [Statement<'b>],
        body_start: u32,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
    ) {
        let parameters = self.extract_parameters(parameter_list, docblock, &ctx.signature_ctx());
        if let Some(parameter) = parameters.iter().find(|p| p.name == var) {
            *results = parameter.types.clone();
        }

        if self.walk_statements(body, var, ctx, results, false) {
            return;
        }
        self.apply_var_override(var, body_start, ctx, results);
    }

    /// Walk `statements` up to the position.  Returns `true` when the
    /// position was found inside a closure, whose scope then answered.
    ///
    /// With `conditional` set, assignments add to the candidates instead
    /// of replacing them.
    pub(super) fn walk_statements<'b>(
        &self,
        statements: impl IntoIterator<Item = &'b Statement<'b>>,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
        conditional: bool,
    ) -> bool {
        let statements: Vec<&Statement<'_>> = statements.into_iter().collect();

        for (index, &statement) in statements.iter().enumerate() {
            let span = statement.span();
            if span.start.offset >= ctx.offset {
                break;
            }

            if let Some(types) = self.named_var_types(span.start.offset, var, ctx) {
                if conditional {
                    results.extend(types);
                } else {
                    *results = types;
                }
            }

            if ctx.contains(span) {
                match self.closure_scope_in_statement(statement, var, ctx, results) {
                    ClosureScope::Outside => {}
                    ClosureScope::Inside => return true,
                    ClosureScope::InsideByReference => {
                        // Later assignments in the outer scope reach the
                        // closure through the reference.
                        let later = ctx.at(u32::MAX);
                        self.walk_statements(
                            statements[index + 1..].iter().copied(),
                            var,
                            &later,
                            results,
                            true,
                        );
                        return true;
                    }
                }
            }

            if self.walk_statement(statement, var, ctx, results, conditional) {
                return true;
            }
        }
        false
    }

    fn walk_statement<'b>(
        &self,
        statement: &'b Statement<'b>,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
        conditional: bool,
    ) -> bool {
        match statement {
            Statement::Expression(expr_stmt) => {
                let expr = expr_stmt.expression;
                if expr.span().end.offset > ctx.offset {
                    self.narrow_inside_expression(expr, var, ctx, results);
                } else {
                    let start = statement.span().start.offset;
                    self.assignment_effect(start, expr, var, ctx, results, conditional);
                }
                false
            }
            Statement::Return(ret) => {
                if let Some(value) = ret.value {
                    self.narrow_inside_expression(value, var, ctx, results);
                }
                false
            }
            Statement::Block(block) => {
                self.walk_branch(block.statements.iter(), block.span(), var, ctx, results, conditional)
            }
            // An implicit namespace may end before the position.
            Statement::Namespace(ns) => {
                self.walk_statements(ns.statements().iter(), var, ctx, results, conditional)
            }
            Statement::If(if_stmt) => self.walk_if(if_stmt, var, ctx, results, conditional),
            Statement::Foreach(foreach) => {
                let body_span = foreach.body.span();
                if ctx.contains(body_span) {
                    if direct_variable_name(foreach.target.value()) == Some(var) {
                        let start = statement.span().start.offset;
                        *results = match self.inline_var_types(start, var, ctx) {
                            Some(types) => types,
                            None => element_types(&self.deduce(foreach.expression, &ctx.at(start))),
                        };
                    } else if let Some(key) = foreach.target.key()
                        && direct_variable_name(key) == Some(var)
                    {
                        *results = [TypeInfo::keyword("int"), TypeInfo::keyword("string")]
                            .into_iter()
                            .collect();
                    }
                }
                self.walk_branch(foreach.body.statements(), body_span, var, ctx, results, conditional)
            }
            Statement::While(while_stmt) => {
                let (statements, body_span): (Vec<&Statement<'_>>, _) = match &while_stmt.body {
                    WhileBody::Statement(inner) => (vec![*inner], inner.span()),
                    WhileBody::ColonDelimited(body) => {
                        (body.statements.iter().collect(), while_stmt.body.span())
                    }
                };
                if ctx.contains(body_span) {
                    self.apply_condition(while_stmt.condition, true, var, ctx, results);
                } else if ctx.contains(while_stmt.condition.span()) {
                    self.narrow_inside_expression(while_stmt.condition, var, ctx, results);
                }
                self.walk_branch(statements, body_span, var, ctx, results, conditional)
            }
            Statement::DoWhile(do_while) => self.walk_branch(
                std::iter::once(do_while.statement),
                do_while.statement.span(),
                var,
                ctx,
                results,
                conditional,
            ),
            Statement::For(for_stmt) => {
                for initialization in for_stmt.initializations.iter() {
                    if initialization.span().end.offset <= ctx.offset {
                        let start = initialization.span().start.offset;
                        self.assignment_effect(start, initialization, var, ctx, results, conditional);
                    }
                }
                let (statements, body_span): (Vec<&Statement<'_>>, _) = match &for_stmt.body {
                    ForBody::Statement(inner) => (vec![*inner], inner.span()),
                    ForBody::ColonDelimited(body) => {
                        (body.statements.iter().collect(), for_stmt.body.span())
                    }
                };
                self.walk_branch(statements, body_span, var, ctx, results, conditional)
            }
            Statement::Switch(switch) => {
                let cases: Vec<&SwitchCase<'_>> = match &switch.body {
                    SwitchBody::BraceDelimited(body) => body.cases.iter().collect(),
                    SwitchBody::ColonDelimited(body) => body.cases.iter().collect(),
                };
                for case in cases {
                    if case.span().start.offset >= ctx.offset {
                        break;
                    }
                    if ctx.contains(case.span()) {
                        return self.walk_statements(case.statements().iter(), var, ctx, results, conditional);
                    }
                    if self.walk_statements(case.statements().iter(), var, ctx, results, true) {
                        return true;
                    }
                }
                false
            }
            Statement::Try(try_stmt) => self.walk_try(try_stmt, var, ctx, results, conditional),
            _ => false,
        }
    }

    /// Walk a nested body.  A body the position lies in keeps the current
    /// `conditional` flag; a body wholly before it may not have run.
    fn walk_branch<'b>(
        &self,
        statements: impl IntoIterator<Item = &'b Statement<'b>>,
        span: mago_span::Span,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
        conditional: bool,
    ) -> bool {
        let conditional = conditional || !ctx.contains(span);
        self.walk_statements(statements, var, ctx, results, conditional)
    }

    fn walk_if<'b>(
        &self,
        if_stmt: &'b If<'b>,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
        conditional: bool,
    ) -> bool {
        if ctx.contains(if_stmt.condition.span()) {
            self.narrow_inside_expression(if_stmt.condition, var, ctx, results);
            return false;
        }

        let branches = if_branches(if_stmt);

        if let Some(branch) = branches
            .iter()
            .find(|b| b.start <= ctx.offset && ctx.offset <= b.end)
        {
            for (condition, truthy) in &branch.conditions {
                self.apply_condition(condition, *truthy, var, ctx, results);
            }
            return self.walk_statements(branch.statements.iter().copied(), var, ctx, results, conditional);
        }

        // The position may sit in an `elseif` condition.
        if let Some(branch) = branches
            .iter()
            .find(|b| b.condition.is_some_and(|c| ctx.contains(c.span())))
        {
            let (own, prior) = branch
                .conditions
                .split_last()
                .map_or((None, &[][..]), |(last, rest)| (Some(last), rest));
            for (condition, truthy) in prior {
                self.apply_condition(condition, *truthy, var, ctx, results);
            }
            if let Some((condition, _)) = own {
                self.narrow_inside_expression(condition, var, ctx, results);
            }
            return false;
        }

        for branch in branches.iter().filter(|b| b.start < ctx.offset) {
            if self.walk_statements(branch.statements.iter().copied(), var, ctx, results, true) {
                return true;
            }
        }
        false
    }

    fn walk_try<'b>(
        &self,
        try_stmt: &'b Try<'b>,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
        conditional: bool,
    ) -> bool {
        let block_span = try_stmt.block.span();
        if ctx.contains(block_span) {
            return self.walk_statements(try_stmt.block.statements.iter(), var, ctx, results, conditional);
        }
        if self.walk_statements(try_stmt.block.statements.iter(), var, ctx, results, true) {
            return true;
        }

        for catch in try_stmt.catch_clauses.iter() {
            let catch_span = catch.span();
            if catch_span.start.offset >= ctx.offset {
                return false;
            }
            if ctx.contains(catch_span) {
                if let Some(variable) = &catch.variable
                    && variable.name == var
                {
                    *results = self.resolve_hint(&catch.hint, &ctx.name_context(), ctx.class_scope);
                }
                return self.walk_statements(catch.block.statements.iter(), var, ctx, results, conditional);
            }
            if self.walk_statements(catch.block.statements.iter(), var, ctx, results, true) {
                return true;
            }
        }

        if let Some(finally) = &try_stmt.finally_clause
            && finally.span().start.offset < ctx.offset
        {
            return self.walk_branch(
                finally.block.statements.iter(),
                finally.block.span(),
                var,
                ctx,
                results,
                conditional,
            );
        }
        false
    }

    /// Apply an assignment to `var`, following `$a = $b = expr` chains.
    fn assignment_effect(
        &self,
        statement_start: u32,
        expr: &Expression<'_>,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
        conditional: bool,
    ) {
        let Expression::Assignment(assignment) = expr else {
            return;
        };
        if !assignment.operator.is_assign() {
            return;
        }

        if direct_variable_name(assignment.lhs) == Some(var) {
            let types = match self.inline_var_types(statement_start, var, ctx) {
                Some(types) => types,
                None => self.deduce(assignment.rhs, &ctx.at(assignment.span().start.offset)),
            };
            if conditional {
                results.extend(types);
            } else {
                *results = types;
            }
        } else {
            self.assignment_effect(statement_start, assignment.rhs, var, ctx, results, conditional);
        }
    }

    /// The types of a `/** @var T */` or `/** @var T $var */` directly
    /// preceding the statement at `statement_start`.
    fn inline_var_types(
        &self,
        statement_start: u32,
        var: &str,
        ctx: &DeductionCtx<'_, '_>,
    ) -> Option<TypeList> {
        let (text, offset) = find_inline_var_docblock(ctx.doc.content, statement_start as usize)?;
        let data = parse_docblock(text, &[Tag::Var], Some(var));
        let tag = data.var_for(var)?;
        let types = self.resolve_docblock_type(
            &tag.ty,
            &ctx.at(offset as u32).name_context(),
            ctx.class_scope,
        );
        (!types.is_empty()).then_some(types)
    }

    /// Replace `results` with a named `/** @var T $var */` directly
    /// preceding the position, if it lies within the scope.
    pub(super) fn apply_var_override(
        &self,
        var: &str,
        scope_start: u32,
        ctx: &DeductionCtx<'_, '_>,
        results: &mut TypeList,
    ) {
        let Some((_, offset)) = find_inline_var_docblock(ctx.doc.content, ctx.offset as usize) else {
            return;
        };
        if (offset as u32) < scope_start {
            return;
        }
        if let Some(types) = self.named_var_types(ctx.offset, var, ctx) {
            *results = types;
        }
    }

    /// The types of a `/** @var T $var */` naming `var` and separated from
    /// `at` by whitespace alone.
    fn named_var_types(&self, at: u32, var: &str, ctx: &DeductionCtx<'_, '_>) -> Option<TypeList> {
        let (text, offset) = find_inline_var_docblock(ctx.doc.content, at as usize)?;
        let data = parse_docblock(text, &[Tag::Var], None);
        let tag = data
            .var_tags
            .into_iter()
            .find(|v| v.name.as_deref() == Some(var))?;
        let types = self.resolve_docblock_type(
            &tag.ty,
            &ctx.at(offset as u32).name_context(),
            ctx.class_scope,
        );
        (!types.is_empty()).then_some(types)
    }
}

/// Element types of iterated types: `Foo[]` yields `Foo`.
fn element_types(types: &TypeList) -> TypeList {
    types
        .iter()
        .filter_map(|t| {
            let fqn = t.fqn.strip_suffix("[]")?;
            let local = t.local.strip_suffix("[]").unwrap_or(&t.local);
            Some(TypeInfo::new(local, fqn))
        })
        .collect()
}

fn if_branches<'b>(if_stmt: &'b If<'b>) -> Vec<Branch<'b>> {
    let mut branches = Vec::new();
    // Conditions known false once a branch is skipped.
    let mut failed: Vec<(&'b Expression<'b>, bool)> = vec![(if_stmt.condition, false)];

    match &if_stmt.body {
        IfBody::Statement(body) => {
            let span = body.statement.span();
            branches.push(Branch {
                start: span.start.offset,
                end: span.end.offset,
                statements: vec![body.statement],
                conditions: vec![(if_stmt.condition, true)],
                condition: Some(if_stmt.condition),
            });
            for clause in body.else_if_clauses.iter() {
                let span = clause.statement.span();
                let mut conditions = failed.clone();
                conditions.push((clause.condition, true));
                branches.push(Branch {
                    start: span.start.offset,
                    end: span.end.offset,
                    statements: vec![clause.statement],
                    conditions,
                    condition: Some(clause.condition),
                });
                failed.push((clause.condition, false));
            }
            if let Some(else_clause) = &body.else_clause {
                let span = else_clause.statement.span();
                branches.push(Branch {
                    start: span.start.offset,
                    end: span.end.offset,
                    statements: vec![else_clause.statement],
                    conditions: failed,
                    condition: None,
                });
            }
        }
        IfBody::ColonDelimited(body) => {
            let endif = body.endif.span().start.offset;
            let else_start = body
                .else_clause
                .as_ref()
                .map_or(endif, |e| e.r#else.span().start.offset);
            let boundary = |index: usize| {
                body.else_if_clauses
                    .iter()
                    .nth(index)
                    .map_or(else_start, |c| c.elseif.span().start.offset)
            };

            branches.push(Branch {
                start: body.colon.start.offset,
                end: boundary(0),
                statements: body.statements.iter().collect(),
                conditions: vec![(if_stmt.condition, true)],
                condition: Some(if_stmt.condition),
            });
            for (index, clause) in body.else_if_clauses.iter().enumerate() {
                let mut conditions = failed.clone();
                conditions.push((clause.condition, true));
                branches.push(Branch {
                    start: clause.colon.start.offset,
                    end: boundary(index + 1),
                    statements: clause.statements.iter().collect(),
                    conditions,
                    condition: Some(clause.condition),
                });
                failed.push((clause.condition, false));
            }
            if let Some(else_clause) = &body.else_clause {
                branches.push(Branch {
                    start: else_clause.colon.start.offset,
                    end: endif,
                    statements: else_clause.statements.iter().collect(),
                    conditions: failed,
                    condition: None,
                });
            }
        }
    }
    branches
}
