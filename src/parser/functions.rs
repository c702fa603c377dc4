/// Global function and constant extraction.
///
/// Handles `function` declarations, `const X = ...;` statements and the
/// `define('X', ...)` idiom.  Constants without a documented `@var` type
/// take the type deduced from their initializer.
use mago_span::HasSpan;
use mago_syntax::ast::*;

use crate::Backend;
use crate::errors::StoreError;
use crate::types::{ConstantInfo, FunctionInfo, TypeList};
use crate::util::{join_namespace, to_fqsen};

use super::signatures::{SignatureCtx, documentation_of};
use super::argument_value;

impl Backend {
    pub(crate) fn index_function(
        &self,
        func: &Function<'_>,
        ctx: &SignatureCtx<'_, '_>,
    ) -> Result<(), StoreError> {
        let span = func.span();
        let name = func.name.value.to_string();
        let namespace = ctx.context_at(span.start.offset).namespace;
        let docblock = ctx.doc.doc_ctx().docblock_for(func, None);

        let info = FunctionInfo {
            fqsen: join_namespace(namespace.as_deref(), &name),
            name,
            file: ctx.doc.path.to_string(),
            start_line: ctx.doc.line_of(span.start.offset),
            end_line: ctx.doc.line_of(span.end.offset),
            parameters: self.extract_parameters(&func.parameter_list, docblock.as_ref(), ctx),
            return_types: self.extract_return_types(
                func.return_type_hint.as_ref(),
                docblock.as_ref(),
                ctx,
            ),
            throws: self.extract_throws(docblock.as_ref(), ctx),
            documentation: documentation_of(docblock.as_ref().map(|d| &d.data)),
        };

        tracing::debug!("indexed function {}", info.fqsen);
        self.store.upsert_function(info)
    }

    /// `const A = 1, B = 2;` at namespace level.
    pub(crate) fn index_constant_statement(
        &self,
        statement: &Statement<'_>,
        constant: &Constant<'_>,
        ctx: &SignatureCtx<'_, '_>,
    ) -> Result<(), StoreError> {
        let docblock = ctx.doc.doc_ctx().docblock_for(statement, None);

        for item in constant.items.iter() {
            let name = item.name.value.to_string();
            let offset = item.span().start.offset;
            let namespace = ctx.context_at(offset).namespace;

            let info = ConstantInfo {
                fqsen: join_namespace(namespace.as_deref(), &name),
                line: ctx.doc.line_of(offset),
                file: ctx.doc.path.to_string(),
                default_value: ctx.doc.text(item.value.span()).trim().to_string(),
                types: self.constant_types(item.value, docblock.as_ref(), &name, ctx),
                documentation: documentation_of(docblock.as_ref().map(|d| &d.data)),
                name,
            };
            tracing::debug!("indexed constant {}", info.fqsen);
            self.store.upsert_constant(info)?;
        }
        Ok(())
    }

    /// `define('NAME', value)`.  Returns `Ok(false)` when the expression is
    /// not a usable define call.
    pub(crate) fn index_define(
        &self,
        statement: &Statement<'_>,
        expr: &Expression<'_>,
        ctx: &SignatureCtx<'_, '_>,
    ) -> Result<bool, StoreError> {
        let Some((name, value)) = Self::try_extract_define(expr) else {
            return Ok(false);
        };
        let docblock = ctx.doc.doc_ctx().docblock_for(statement, None);
        let short = name.rsplit('\\').next().unwrap_or(&name).to_string();

        let info = ConstantInfo {
            fqsen: to_fqsen(&name),
            line: ctx.doc.line_of(expr.span().start.offset),
            file: ctx.doc.path.to_string(),
            default_value: ctx.doc.text(value.span()).trim().to_string(),
            types: self.constant_types(value, docblock.as_ref(), &short, ctx),
            documentation: documentation_of(docblock.as_ref().map(|d| &d.data)),
            name: short,
        };
        tracing::debug!("indexed define {}", info.fqsen);
        self.store.upsert_constant(info)?;
        Ok(true)
    }

    fn constant_types(
        &self,
        value: &Expression<'_>,
        docblock: Option<&super::NodeDocblock>,
        name: &str,
        ctx: &SignatureCtx<'_, '_>,
    ) -> TypeList {
        if let Some(docblock) = docblock
            && let Some(var) = docblock.data.var_for(name)
        {
            let context = ctx.context_at(docblock.offset);
            let types = self.resolve_docblock_type(&var.ty, &context, None);
            if !types.is_empty() {
                return types;
            }
        }
        self.deduce_type(value, ctx.doc, value.span().end.offset)
    }

    /// If `expr` is `define('NAME', value)` with at least two arguments and
    /// a literal string name, return the name and the value expression.
    fn try_extract_define<'b>(expr: &'b Expression<'b>) -> Option<(String, &'b Expression<'b>)> {
        let Expression::Call(Call::Function(func_call)) = expr else {
            return None;
        };
        let func_name = match func_call.function {
            Expression::Identifier(ident) => ident.value(),
            _ => return None,
        };
        if !func_name.trim_start_matches('\\').eq_ignore_ascii_case("define") {
            return None;
        }

        let mut args = func_call.argument_list.arguments.iter();
        let name_expr = argument_value(args.next()?);
        let value_expr = argument_value(args.next()?);

        if let Expression::Literal(Literal::String(lit_str)) = name_expr
            && let Some(value) = lit_str.value
        {
            let name = value.trim_start_matches('\\');
            if !name.is_empty() {
                return Some((name.to_string(), value_expr));
            }
        }
        None
    }
}
