/// Single-file diagnostics.
///
/// [`Linter::lint`] parses a file and checks it against the index:
///
///   - syntax errors reported by the parser
///   - classlikes named by `new`, static access, `instanceof`, `catch`,
///     `extends`/`implements`, trait uses and type hints
///   - global functions and constants, resolved with the runtime fallback
///     to the root namespace
///   - methods and properties fetched on expressions whose deduced types
///     are all known classlikes lacking the member
///
/// Unknown members are warnings, everything else is an error.  The file
/// itself is not indexed: its own declarations are only visible when the
/// caller indexed it beforehand.
use bumpalo::Bump;
use mago_span::{HasSpan, Span};
use mago_syntax::ast::*;
use serde::Serialize;

use crate::Backend;
use crate::deduction::DeductionCtx;
use crate::names::{NameKind, is_builtin_type};
use crate::parser::{Document, argument_value};
use crate::types::NamespaceScope;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintMessage {
    pub message: String,
    pub line: u32,
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LintReport {
    pub errors: Vec<LintMessage>,
    pub warnings: Vec<LintMessage>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

pub struct Linter<'b> {
    backend: &'b Backend,
}

/// A symbol use found in the file.
enum Reference<'a> {
    Class(&'a str, Span),
    Function(&'a str, Span),
    Constant(&'a str, Span),
    /// `$object->name()`, with the object expression.
    Method(&'a Expression<'a>, &'a str, Span),
    /// `$object->name`
    Property(&'a Expression<'a>, &'a str, Span),
}

impl<'b> Linter<'b> {
    pub fn new(backend: &'b Backend) -> Self {
        Self { backend }
    }

    pub fn lint(&self, path: &str, content: &str) -> LintReport {
        let mut report = LintReport::default();
        let settings = &self.backend.config.linting;

        let arena = Bump::new();
        let doc = match Document::parse(&arena, path, content) {
            Ok(doc) => doc,
            Err(failure) => {
                report.errors.push(LintMessage {
                    message: failure.to_string(),
                    line: 1,
                    start: 0,
                    end: 0,
                });
                return report;
            }
        };

        if settings.syntax_errors {
            for diagnostic in doc.diagnostics() {
                report.errors.push(LintMessage {
                    message: format!("Syntax error: {}", diagnostic.message),
                    line: doc.line_of(diagnostic.start),
                    start: diagnostic.start,
                    end: diagnostic.end,
                });
            }
        }

        let mut references = References::default();
        references.statements(doc.statements().iter());

        let scopes = doc.namespace_scopes();
        for reference in &references.found {
            let (message, span, is_error) = match reference {
                Reference::Class(name, span) if settings.unknown_classes => {
                    match self.unknown(name, NameKind::Classlike, *span, &doc, &scopes) {
                        Some(fqcn) => (format!("Unknown class {fqcn}"), *span, true),
                        None => continue,
                    }
                }
                Reference::Function(name, span) if settings.unknown_functions => {
                    match self.unknown(name, NameKind::Function, *span, &doc, &scopes) {
                        Some(fqsen) => (format!("Unknown function {fqsen}"), *span, true),
                        None => continue,
                    }
                }
                Reference::Constant(name, span) if settings.unknown_constants => {
                    match self.unknown(name, NameKind::Constant, *span, &doc, &scopes) {
                        Some(fqsen) => (format!("Unknown constant {fqsen}"), *span, true),
                        None => continue,
                    }
                }
                Reference::Method(object, name, span) if settings.unknown_members => {
                    match self.missing_member(object, name, true, &doc, &scopes) {
                        Some(owners) => (
                            format!("Method {name}() not found on {owners}"),
                            *span,
                            false,
                        ),
                        None => continue,
                    }
                }
                Reference::Property(object, name, span) if settings.unknown_members => {
                    match self.missing_member(object, name, false, &doc, &scopes) {
                        Some(owners) => (
                            format!("Property ${name} not found on {owners}"),
                            *span,
                            false,
                        ),
                        None => continue,
                    }
                }
                _ => continue,
            };

            let message = LintMessage {
                message,
                line: doc.line_of(span.start.offset),
                start: span.start.offset,
                end: span.end.offset,
            };
            if is_error {
                report.errors.push(message);
            } else {
                report.warnings.push(message);
            }
        }

        tracing::debug!(
            "{}: {} error(s), {} warning(s)",
            path,
            report.errors.len(),
            report.warnings.len()
        );
        report
    }

    /// The FQSEN `name` resolves to, when the index does not know it.
    fn unknown(
        &self,
        name: &str,
        kind: NameKind,
        span: Span,
        doc: &Document<'_>,
        scopes: &[NamespaceScope],
    ) -> Option<String> {
        if kind == NameKind::Classlike && is_builtin_type(name) {
            return None;
        }
        let context = doc.name_context_at(scopes, span.start.offset);
        let fqsen = self.backend.resolve_name(name, kind, Some(&context)).ok()?;
        let store = &self.backend.store;
        let known = match kind {
            NameKind::Classlike => store.has_classlike(&fqsen),
            NameKind::Function => store.has_function(&fqsen),
            NameKind::Constant => store.has_constant(&fqsen),
        };
        (!known).then_some(fqsen)
    }

    /// The owners a member is missing from, joined for display.  `None`
    /// when any candidate type has the member, handles it magically, or is
    /// not a known classlike.
    fn missing_member(
        &self,
        object: &Expression<'_>,
        name: &str,
        is_method: bool,
        doc: &Document<'_>,
        scopes: &[NamespaceScope],
    ) -> Option<String> {
        let offset = object.span().end.offset;
        let class_scope = self.backend.class_scope_at(doc, scopes, offset);
        let ctx = DeductionCtx {
            doc,
            scopes,
            class_scope: class_scope.as_ref(),
            offset,
            depth: 0,
        };
        let types = self.backend.deduce(object, &ctx).without_null();
        if types.is_empty() {
            return None;
        }

        let mut owners = Vec::new();
        for ty in &types {
            if is_builtin_type(&ty.fqn) || ty.fqn.ends_with("[]") {
                return None;
            }
            let flattened = self.backend.flattened(&ty.fqn)?;
            let found = if is_method {
                flattened.method(name).is_some() || flattened.method("__call").is_some()
            } else {
                flattened.property(name).is_some() || flattened.method("__get").is_some()
            };
            if found {
                return None;
            }
            owners.push(ty.fqn.clone());
        }
        Some(owners.join("|"))
    }
}

// ─── Reference collection ───────────────────────────────────────────────────

#[derive(Default)]
struct References<'a> {
    found: Vec<Reference<'a>>,
}

impl<'a> References<'a> {
    fn statements(&mut self, statements: impl IntoIterator<Item = &'a Statement<'a>>) {
        for statement in statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &'a Statement<'a>) {
        match statement {
            Statement::Namespace(ns) => self.statements(ns.statements().iter()),
            Statement::Block(block) => self.statements(block.statements.iter()),
            Statement::Class(class) => {
                if let Some(extends) = &class.extends {
                    self.class_names(extends.types.iter());
                }
                if let Some(implements) = &class.implements {
                    self.class_names(implements.types.iter());
                }
                self.members(class.members.iter());
            }
            Statement::Interface(iface) => {
                if let Some(extends) = &iface.extends {
                    self.class_names(extends.types.iter());
                }
                self.members(iface.members.iter());
            }
            Statement::Trait(trait_def) => self.members(trait_def.members.iter()),
            Statement::Enum(enum_def) => {
                if let Some(implements) = &enum_def.implements {
                    self.class_names(implements.types.iter());
                }
                self.members(enum_def.members.iter());
            }
            Statement::Function(function) => {
                self.parameters(&function.parameter_list);
                if let Some(return_hint) = &function.return_type_hint {
                    self.hint(&return_hint.hint);
                }
                self.statements(function.body.statements.iter());
            }
            Statement::Constant(constant) => {
                for item in constant.items.iter() {
                    self.expression(item.value);
                }
            }
            Statement::Expression(expr_stmt) => self.expression(expr_stmt.expression),
            Statement::Return(ret) => {
                if let Some(value) = ret.value {
                    self.expression(value);
                }
            }
            Statement::Echo(echo) => {
                for value in echo.values.iter() {
                    self.expression(value);
                }
            }
            Statement::If(if_stmt) => {
                self.expression(if_stmt.condition);
                match &if_stmt.body {
                    IfBody::Statement(body) => {
                        self.statement(body.statement);
                        for clause in body.else_if_clauses.iter() {
                            self.expression(clause.condition);
                            self.statement(clause.statement);
                        }
                        if let Some(else_clause) = &body.else_clause {
                            self.statement(else_clause.statement);
                        }
                    }
                    IfBody::ColonDelimited(body) => {
                        self.statements(body.statements.iter());
                        for clause in body.else_if_clauses.iter() {
                            self.expression(clause.condition);
                            self.statements(clause.statements.iter());
                        }
                        if let Some(else_clause) = &body.else_clause {
                            self.statements(else_clause.statements.iter());
                        }
                    }
                }
            }
            Statement::Foreach(foreach) => {
                self.expression(foreach.expression);
                self.statements(foreach.body.statements());
            }
            Statement::For(for_stmt) => {
                for initialization in for_stmt.initializations.iter() {
                    self.expression(initialization);
                }
                match &for_stmt.body {
                    ForBody::Statement(inner) => self.statement(inner),
                    ForBody::ColonDelimited(body) => self.statements(body.statements.iter()),
                }
            }
            Statement::While(while_stmt) => {
                self.expression(while_stmt.condition);
                match &while_stmt.body {
                    WhileBody::Statement(inner) => self.statement(inner),
                    WhileBody::ColonDelimited(body) => self.statements(body.statements.iter()),
                }
            }
            Statement::DoWhile(do_while) => {
                self.statement(do_while.statement);
                self.expression(do_while.condition);
            }
            Statement::Switch(switch) => {
                self.expression(switch.expression);
                let cases: Vec<&'a SwitchCase<'a>> = match &switch.body {
                    SwitchBody::BraceDelimited(body) => body.cases.iter().collect(),
                    SwitchBody::ColonDelimited(body) => body.cases.iter().collect(),
                };
                for case in cases {
                    self.statements(case.statements().iter());
                }
            }
            Statement::Try(try_stmt) => {
                self.statements(try_stmt.block.statements.iter());
                for catch in try_stmt.catch_clauses.iter() {
                    self.hint(&catch.hint);
                    self.statements(catch.block.statements.iter());
                }
                if let Some(finally) = &try_stmt.finally_clause {
                    self.statements(finally.block.statements.iter());
                }
            }
            _ => {}
        }
    }

    fn members(&mut self, members: impl IntoIterator<Item = &'a ClassLikeMember<'a>>) {
        for member in members {
            match member {
                ClassLikeMember::Method(method) => {
                    self.parameters(&method.parameter_list);
                    if let Some(return_hint) = &method.return_type_hint {
                        self.hint(&return_hint.hint);
                    }
                    if let MethodBody::Concrete(block) = &method.body {
                        self.statements(block.statements.iter());
                    }
                }
                ClassLikeMember::Property(property) => {
                    if let Some(hint) = property.hint() {
                        self.hint(hint);
                    }
                }
                ClassLikeMember::Constant(constant) => {
                    for item in constant.items.iter() {
                        self.expression(item.value);
                    }
                }
                ClassLikeMember::TraitUse(trait_use) => {
                    self.class_names(trait_use.trait_names.iter());
                }
                ClassLikeMember::EnumCase(_) => {}
            }
        }
    }

    fn class_names(&mut self, names: impl IntoIterator<Item = &'a Identifier<'a>>) {
        for ident in names {
            self.found.push(Reference::Class(ident.value(), ident.span()));
        }
    }

    fn parameters(&mut self, parameter_list: &'a FunctionLikeParameterList<'a>) {
        for parameter in parameter_list.parameters.iter() {
            if let Some(hint) = &parameter.hint {
                self.hint(hint);
            }
            if let Some(default) = &parameter.default_value {
                self.expression(default.value);
            }
        }
    }

    fn hint(&mut self, hint: &'a Hint<'a>) {
        match hint {
            Hint::Identifier(ident) => {
                self.found.push(Reference::Class(ident.value(), ident.span()));
            }
            Hint::Nullable(nullable) => self.hint(nullable.hint),
            Hint::Union(union) => {
                self.hint(union.left);
                self.hint(union.right);
            }
            Hint::Intersection(intersection) => {
                self.hint(intersection.left);
                self.hint(intersection.right);
            }
            Hint::Parenthesized(paren) => self.hint(paren.hint),
            _ => {}
        }
    }

    /// The class part of `new X`, `X::m()`, `X::C` or `instanceof X`.
    fn class_reference(&mut self, class: &'a Expression<'a>) {
        match class {
            Expression::Identifier(ident) => {
                self.found.push(Reference::Class(ident.value(), ident.span()));
            }
            other => self.expression(other),
        }
    }

    fn arguments(&mut self, argument_list: &'a ArgumentList<'a>) {
        for argument in argument_list.arguments.iter() {
            self.expression(argument_value(argument));
        }
    }

    fn expression(&mut self, expr: &'a Expression<'a>) {
        match expr {
            Expression::Parenthesized(inner) => self.expression(inner.expression),
            Expression::Assignment(assignment) => {
                self.expression(assignment.lhs);
                self.expression(assignment.rhs);
            }
            Expression::Binary(binary) => {
                self.expression(binary.lhs);
                if binary.operator.is_instanceof() {
                    self.class_reference(binary.rhs);
                } else {
                    self.expression(binary.rhs);
                }
            }
            Expression::UnaryPrefix(prefix) => self.expression(prefix.operand),
            Expression::UnaryPostfix(postfix) => self.expression(postfix.operand),
            Expression::Conditional(ternary) => {
                self.expression(ternary.condition);
                if let Some(then) = ternary.then {
                    self.expression(then);
                }
                self.expression(ternary.r#else);
            }
            Expression::Array(array) => self.elements(array.elements.iter()),
            Expression::LegacyArray(array) => self.elements(array.elements.iter()),
            Expression::Match(match_expr) => {
                self.expression(match_expr.expression);
                for arm in match_expr.arms.iter() {
                    self.expression(arm.expression());
                }
            }
            Expression::Instantiation(instantiation) => {
                self.class_reference(instantiation.class);
                if let Some(arguments) = &instantiation.argument_list {
                    self.arguments(arguments);
                }
            }
            Expression::Clone(clone) => self.expression(clone.object),
            Expression::Throw(throw) => self.expression(throw.exception),
            Expression::Yield(yield_expr) => match yield_expr {
                Yield::Value(value) => {
                    if let Some(value) = value.value {
                        self.expression(value);
                    }
                }
                Yield::Pair(pair) => {
                    self.expression(pair.key);
                    self.expression(pair.value);
                }
                Yield::From(from) => self.expression(from.iterator),
            },
            Expression::Pipe(pipe) => {
                self.expression(pipe.input);
                self.expression(pipe.callable);
            }
            Expression::Closure(closure) => {
                self.parameters(&closure.parameter_list);
                if let Some(return_hint) = &closure.return_type_hint {
                    self.hint(&return_hint.hint);
                }
                self.statements(closure.body.statements.iter());
            }
            Expression::ArrowFunction(arrow) => {
                self.parameters(&arrow.parameter_list);
                self.expression(arrow.expression);
            }
            Expression::Call(call) => match call {
                Call::Function(function_call) => {
                    match function_call.function {
                        Expression::Identifier(ident) => self
                            .found
                            .push(Reference::Function(ident.value(), ident.span())),
                        other => self.expression(other),
                    }
                    self.arguments(&function_call.argument_list);
                }
                Call::Method(method_call) => {
                    self.expression(method_call.object);
                    if let ClassLikeMemberSelector::Identifier(ident) = &method_call.method {
                        self.found.push(Reference::Method(
                            method_call.object,
                            ident.value,
                            ident.span(),
                        ));
                    }
                    self.arguments(&method_call.argument_list);
                }
                Call::NullSafeMethod(method_call) => {
                    self.expression(method_call.object);
                    if let ClassLikeMemberSelector::Identifier(ident) = &method_call.method {
                        self.found.push(Reference::Method(
                            method_call.object,
                            ident.value,
                            ident.span(),
                        ));
                    }
                    self.arguments(&method_call.argument_list);
                }
                Call::StaticMethod(static_call) => {
                    self.class_reference(static_call.class);
                    self.arguments(&static_call.argument_list);
                }
            },
            Expression::Access(access) => match access {
                Access::Property(property_access) => {
                    self.expression(property_access.object);
                    if let ClassLikeMemberSelector::Identifier(ident) = &property_access.property {
                        self.found.push(Reference::Property(
                            property_access.object,
                            ident.value,
                            ident.span(),
                        ));
                    }
                }
                Access::NullSafeProperty(property_access) => {
                    self.expression(property_access.object);
                    if let ClassLikeMemberSelector::Identifier(ident) = &property_access.property {
                        self.found.push(Reference::Property(
                            property_access.object,
                            ident.value,
                            ident.span(),
                        ));
                    }
                }
                Access::StaticProperty(property_access) => {
                    self.class_reference(property_access.class);
                }
                Access::ClassConstant(constant_access) => {
                    self.class_reference(constant_access.class);
                }
            },
            Expression::ConstantAccess(access) => {
                let name = access.name.value();
                let bare = name.trim_start_matches('\\');
                if !["true", "false", "null"]
                    .iter()
                    .any(|k| k.eq_ignore_ascii_case(bare))
                {
                    self.found
                        .push(Reference::Constant(name, access.name.span()));
                }
            }
            _ => {}
        }
    }

    fn elements(&mut self, elements: impl IntoIterator<Item = &'a ArrayElement<'a>>) {
        for element in elements {
            match element {
                ArrayElement::KeyValue(kv) => {
                    self.expression(kv.key);
                    self.expression(kv.value);
                }
                ArrayElement::Value(v) => self.expression(v.value),
                ArrayElement::Variadic(v) => self.expression(v.value),
                ArrayElement::Missing(_) => {}
            }
        }
    }
}
