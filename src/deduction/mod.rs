/// Type deduction for expressions.
///
/// [`Backend::deduce_type`] maps an expression at a position of a document
/// to the ordered union of types it may evaluate to.  Dispatch is a match
/// over the expression variant; variables are answered by a flow walk over
/// the enclosing function-like scope (see [`variables`]).
///
/// An empty [`TypeList`] means "unknown".  Nothing here fails for
/// unsupported expression kinds; the only error is handing a non-expression
/// statement to [`Backend::deduce_statement`].
///
/// Sub-modules:
/// - [`members`]: calls, member and constant access
/// - [`variables`]: scope discovery and the statement walker
/// - [`narrowing`]: `instanceof`, null-guard and `is_*()` narrowing
/// - [`closures`]: closure and arrow-function scopes with `use` captures
mod closures;
mod members;
mod narrowing;
mod variables;

use bumpalo::Bump;
use mago_span::{HasSpan, Span};
use mago_syntax::ast::*;

use crate::Backend;
use crate::errors::NodeError;
use crate::names::{ClassScope, NameContext, NameKind};
use crate::parser::Document;
use crate::parser::classes::Header;
use crate::parser::signatures::SignatureCtx;
use crate::types::{ClassLikeKind, NamespaceScope, TypeInfo, TypeList};
use crate::util::{join_namespace, short_name};

/// Where an expression is being deduced.
#[derive(Clone, Copy)]
pub(crate) struct DeductionCtx<'c, 'a> {
    pub doc: &'c Document<'a>,
    pub scopes: &'c [NamespaceScope],
    pub class_scope: Option<&'c ClassScope>,
    pub offset: u32,
    pub depth: usize,
}

impl<'c, 'a> DeductionCtx<'c, 'a> {
    /// The same context positioned at `offset`, one level deeper.
    pub fn at(&self, offset: u32) -> Self {
        Self {
            offset,
            depth: self.depth + 1,
            ..*self
        }
    }

    pub fn name_context(&self) -> NameContext {
        self.doc.name_context_at(self.scopes, self.offset)
    }

    pub fn signature_ctx(&self) -> SignatureCtx<'c, 'a> {
        SignatureCtx {
            doc: self.doc,
            scopes: self.scopes,
            class_scope: self.class_scope,
        }
    }

    /// Whether the position lies within `span`, bounds included.
    pub fn contains(&self, span: Span) -> bool {
        span.start.offset <= self.offset && self.offset <= span.end.offset
    }

    fn class_type(&self) -> Option<TypeInfo> {
        self.class_scope
            .map(|c| TypeInfo::new(short_name(&c.fqcn), c.fqcn.clone()))
    }

    fn parent_type(&self) -> Option<TypeInfo> {
        self.class_scope
            .and_then(|c| c.parent.as_deref())
            .map(|p| TypeInfo::new(short_name(p), p))
    }
}

impl Backend {
    /// Deduce the types of `expr` as evaluated at byte `offset` of `doc`.
    pub fn deduce_type(&self, expr: &Expression<'_>, doc: &Document<'_>, offset: u32) -> TypeList {
        let scopes = doc.namespace_scopes();
        let class_scope = self.class_scope_at(doc, &scopes, offset);
        let ctx = DeductionCtx {
            doc,
            scopes: &scopes,
            class_scope: class_scope.as_ref(),
            offset,
            depth: 0,
        };
        self.deduce(expr, &ctx)
    }

    /// Deduce the expression of an expression statement.
    pub fn deduce_statement(
        &self,
        statement: &Statement<'_>,
        doc: &Document<'_>,
        offset: u32,
    ) -> Result<TypeList, NodeError> {
        match statement {
            Statement::Expression(expr_stmt) => {
                Ok(self.deduce_type(expr_stmt.expression, doc, offset))
            }
            _ => Err(NodeError::UnsupportedNode {
                expected: "expression statement",
            }),
        }
    }

    /// Parse `expression` on its own and deduce it as if written at
    /// `offset` of the file `path` with source `content`.
    pub fn deduce_expression_at(
        &self,
        path: &str,
        content: &str,
        offset: u32,
        expression: &str,
    ) -> Result<TypeList, NodeError> {
        let arena = Bump::new();
        let doc = Document::parse(&arena, path, content)?;

        let source = format!("<?php {};", expression.trim().trim_end_matches(';'));
        let snippet_arena = Bump::new();
        let snippet = Document::parse(&snippet_arena, path, &source)?;
        let statement = snippet
            .statements()
            .last()
            .ok_or(NodeError::UnsupportedNode {
                expected: "expression statement",
            })?;

        self.deduce_statement(statement, &doc, offset)
    }

    /// The classlike whose body contains `offset`, for `self`, `static`,
    /// `parent` and `$this`.
    pub(crate) fn class_scope_at(
        &self,
        doc: &Document<'_>,
        scopes: &[NamespaceScope],
        offset: u32,
    ) -> Option<ClassScope> {
        let header = enclosing_classlike(doc.statements(), offset)?;
        let context = doc.name_context_at(scopes, header.span.start.offset);
        let fqcn = join_namespace(context.namespace.as_deref(), header.name);
        let parent = match header.kind {
            ClassLikeKind::Class => header.parents.first().map(|p| {
                self.resolve_name(p, NameKind::Classlike, Some(&context))
                    .unwrap_or_else(|_| p.to_string())
            }),
            _ => None,
        };
        Some(ClassScope { fqcn, parent })
    }

    /// Literal types that need no context: scalars, arrays and `!x`.
    pub(crate) fn literal_types(expr: &Expression<'_>) -> TypeList {
        let keyword = match expr {
            Expression::Literal(literal) => match literal {
                Literal::String(_) => "string",
                Literal::Integer(_) => "int",
                Literal::Float(_) => "float",
                Literal::True(_) | Literal::False(_) => "bool",
                Literal::Null(_) => "null",
                #[allow(unreachable_patterns)]
                _ => return TypeList::new(),
            },
            Expression::Array(_) | Expression::LegacyArray(_) | Expression::List(_) => "array",
            Expression::Parenthesized(inner) => return Self::literal_types(inner.expression),
            Expression::UnaryPrefix(prefix) if prefix.operator.is_not() => "bool",
            // `-1`, `+1.5`
            Expression::UnaryPrefix(prefix) => match prefix.operand {
                Expression::Literal(Literal::Integer(_)) => "int",
                Expression::Literal(Literal::Float(_)) => "float",
                _ => return TypeList::new(),
            },
            Expression::ConstantAccess(access) => {
                match access.name.value().trim_start_matches('\\').to_ascii_lowercase().as_str() {
                    "true" | "false" => "bool",
                    "null" => "null",
                    _ => return TypeList::new(),
                }
            }
            _ => return TypeList::new(),
        };
        TypeList::single(TypeInfo::keyword(keyword))
    }

    pub(crate) fn deduce(&self, expr: &Expression<'_>, ctx: &DeductionCtx<'_, '_>) -> TypeList {
        if ctx.depth > self.config.resolution.max_depth {
            tracing::debug!("deduction depth exceeded at offset {}", ctx.offset);
            return TypeList::new();
        }

        match expr {
            Expression::Parenthesized(inner) => self.deduce(inner.expression, ctx),
            Expression::Literal(_)
            | Expression::Array(_)
            | Expression::LegacyArray(_)
            | Expression::List(_) => Self::literal_types(expr),
            Expression::Variable(Variable::Direct(variable)) => {
                if variable.name == "$this" {
                    ctx.class_type().into_iter().collect()
                } else {
                    self.deduce_variable(variable.name, ctx)
                }
            }
            Expression::Assignment(assignment) if assignment.operator.is_assign() => {
                self.deduce(assignment.rhs, ctx)
            }
            Expression::Conditional(ternary) => {
                let mut types = match ternary.then {
                    Some(then) => self.deduce(then, ctx),
                    // `a ?: b` yields `a` when it is truthy.
                    None => self.deduce(ternary.condition, ctx).without_null(),
                };
                types.extend(self.deduce(ternary.r#else, ctx));
                types
            }
            Expression::Match(match_expr) => match_expr
                .arms
                .iter()
                .flat_map(|arm| self.deduce(arm.expression(), ctx))
                .collect(),
            Expression::Binary(binary) => self.binary_types(binary, ctx),
            Expression::UnaryPrefix(_) => Self::literal_types(expr),
            Expression::Instantiation(instantiation) => {
                self.class_reference_types(instantiation.class, ctx)
            }
            Expression::Clone(clone) => self.deduce(clone.object, ctx),
            Expression::Closure(_) | Expression::ArrowFunction(_) => {
                TypeList::single(TypeInfo::new("Closure", "\\Closure"))
            }
            Expression::Call(call) => self.call_types(call, ctx),
            Expression::Access(access) => self.access_types(access, ctx),
            Expression::ConstantAccess(access) => {
                let literal = Self::literal_types(expr);
                if literal.is_empty() {
                    self.global_constant_types(access.name.value(), ctx)
                } else {
                    literal
                }
            }
            _ => TypeList::new(),
        }
    }

    fn binary_types(&self, binary: &Binary<'_>, ctx: &DeductionCtx<'_, '_>) -> TypeList {
        if binary.operator.is_null_coalesce() {
            let mut types = self.deduce(binary.lhs, ctx).without_null();
            types.extend(self.deduce(binary.rhs, ctx));
            return types;
        }
        if binary.operator.is_instanceof() {
            return TypeList::single(TypeInfo::keyword("bool"));
        }
        match binary.operator {
            BinaryOperator::And(_)
            | BinaryOperator::Or(_)
            | BinaryOperator::LowAnd(_)
            | BinaryOperator::LowOr(_)
            | BinaryOperator::LowXor(_)
            | BinaryOperator::Equal(_)
            | BinaryOperator::NotEqual(_)
            | BinaryOperator::AngledNotEqual(_)
            | BinaryOperator::Identical(_)
            | BinaryOperator::NotIdentical(_)
            | BinaryOperator::LessThan(_)
            | BinaryOperator::LessThanOrEqual(_)
            | BinaryOperator::GreaterThan(_)
            | BinaryOperator::GreaterThanOrEqual(_) => TypeList::single(TypeInfo::keyword("bool")),
            BinaryOperator::Spaceship(_) => TypeList::single(TypeInfo::keyword("int")),
            BinaryOperator::StringConcat(_) => TypeList::single(TypeInfo::keyword("string")),
            _ => TypeList::new(),
        }
    }

    /// Types named by the class part of `new X`, `X::m()` or `X::$p`.
    fn class_reference_types(
        &self,
        class: &Expression<'_>,
        ctx: &DeductionCtx<'_, '_>,
    ) -> TypeList {
        match class {
            Expression::Identifier(ident) => TypeList::single(self.resolve_type(
                ident.value(),
                &ctx.name_context(),
                ctx.class_scope,
            )),
            Expression::Self_(_) | Expression::Static(_) => ctx.class_type().into_iter().collect(),
            Expression::Parent(_) => ctx.parent_type().into_iter().collect(),
            other => self.deduce(other, ctx),
        }
    }
}

fn enclosing_classlike<'c, 'a>(statements: &'c [Statement<'a>], offset: u32) -> Option<Header<'c, 'a>> {
    for statement in statements {
        let span = statement.span();
        if offset < span.start.offset || offset > span.end.offset {
            continue;
        }
        return match statement {
            Statement::Namespace(ns) => enclosing_classlike(ns.statements().as_slice(), offset),
            Statement::Block(block) => enclosing_classlike(block.statements.as_slice(), offset),
            _ => Header::of(statement),
        };
    }
    None
}
