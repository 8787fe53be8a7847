//! The compilation engine.

use alloc::sync::Arc;

use tracing::debug;

use super::{CompilationOptions, CompiledExpression, EngineOptions, EnvironmentBuilder, Error};
use crate::binder::{TypedExpression, bind_to};
use crate::evaluator::lower;
use crate::parser::parse_syntax_tree;
use crate::syntax_tree::SyntaxNode;
use crate::types::{Type, TypeResolver};
use crate::values::Value;

/// The compilation engine.
///
/// The engine owns:
/// - The type resolver used to look up names written in expressions
/// - Default compilation and execution options
///
/// Engines are `Send + Sync`; compiled expressions do not borrow from them.
///
/// # Example
///
/// ```
/// use cseval_core::api::{Engine, EngineOptions};
/// use cseval_core::types::Type;
/// use cseval_core::values::Value;
///
/// let engine = Engine::new(EngineOptions::default(), |_env| {});
/// let expr = engine
///     .compile("Math.Max(x, y) * 2", &[("x", Type::INT32), ("y", Type::INT32)])
///     .unwrap();
/// let result = expr.run(&[Value::Int32(4), Value::Int32(21)]).unwrap();
/// assert_eq!(result, Value::Int32(42));
/// ```
pub struct Engine {
    resolver: Arc<dyn TypeResolver>,
    options: EngineOptions,
}

static_assertions::assert_impl_all!(Engine: Send, Sync);

impl Engine {
    /// Create a new engine with host types registered by `init`.
    pub fn new(options: EngineOptions, init: impl FnOnce(&mut EnvironmentBuilder)) -> Self {
        let mut env = EnvironmentBuilder::new();
        init(&mut env);
        Self {
            resolver: env.build(),
            options,
        }
    }

    /// Create an engine over a caller-supplied resolver.
    ///
    /// System types stay resolvable when `resolver` does not know a name.
    pub fn with_resolver(options: EngineOptions, resolver: Arc<dyn TypeResolver>) -> Self {
        Self { resolver, options }
    }

    pub fn resolver(&self) -> &dyn TypeResolver {
        self.resolver.as_ref()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Parse `source` into a syntax tree.
    pub fn parse(&self, source: &str) -> Result<SyntaxNode, Error> {
        parse_syntax_tree(source, self.options.default_compilation_options.checked_by_default)
            .map_err(|e| Error::syntax(source, e))
    }

    /// Parse and bind `source` with the engine's default compilation options.
    ///
    /// When `result_type` is given the result is converted implicitly to it,
    /// and a lambda at the root takes its signature from a delegate type.
    pub fn parse_and_bind(
        &self,
        source: &str,
        params: &[(&str, Type)],
        result_type: Option<&Type>,
    ) -> Result<TypedExpression, Error> {
        self.parse_and_bind_with(
            &self.options.default_compilation_options,
            source,
            params,
            result_type,
        )
    }

    pub fn parse_and_bind_with(
        &self,
        options: &CompilationOptions,
        source: &str,
        params: &[(&str, Type)],
        result_type: Option<&Type>,
    ) -> Result<TypedExpression, Error> {
        let syntax = parse_syntax_tree(source, options.checked_by_default)
            .map_err(|e| Error::syntax(source, e))?;
        self.bind_syntax(options, source, &syntax, params, result_type)
    }

    /// Bind an already-built syntax tree. `source` is only used to anchor
    /// diagnostics.
    pub fn bind_syntax(
        &self,
        options: &CompilationOptions,
        source: &str,
        syntax: &SyntaxNode,
        params: &[(&str, Type)],
        result_type: Option<&Type>,
    ) -> Result<TypedExpression, Error> {
        bind_to(syntax, params, result_type, self.resolver.as_ref(), options)
            .map_err(|e| Error::bind(source, e))
    }

    /// Compile an expression.
    ///
    /// # Parameters
    ///
    /// - `source`: The source text of the expression
    /// - `params`: Parameters for the expression as (name, type) pairs
    pub fn compile(
        &self,
        source: &str,
        params: &[(&str, Type)],
    ) -> Result<CompiledExpression, Error> {
        self.compile_with(&self.options.default_compilation_options, source, params, None)
    }

    /// Compile with explicit options and an optional result type.
    pub fn compile_with(
        &self,
        options: &CompilationOptions,
        source: &str,
        params: &[(&str, Type)],
        result_type: Option<&Type>,
    ) -> Result<CompiledExpression, Error> {
        let typed = self.parse_and_bind_with(options, source, params, result_type)?;
        debug!(source, "Compiled expression");
        Ok(CompiledExpression::new(
            lower(&typed),
            self.options.default_execution_options.clone(),
        ))
    }
}

/// One-shot evaluation: parse, bind, lower and run `expression`.
///
/// Parameters are named `arg1`, `arg2`, ... in the order of `arg_types`.
/// `resolver` supplies host types beyond the System ones.
///
/// # Example
///
/// ```
/// use cseval_core::api::evaluate;
/// use cseval_core::types::Type;
/// use cseval_core::values::Value;
///
/// let result = evaluate("arg1.Length + arg2", &[Type::String, Type::INT32], None, None,
///     &[Value::string("abc"), Value::Int32(1)]).unwrap();
/// assert_eq!(result, Value::Int32(4));
/// ```
pub fn evaluate(
    expression: &str,
    arg_types: &[Type],
    result_type: Option<&Type>,
    resolver: Option<Arc<dyn TypeResolver>>,
    args: &[Value],
) -> Result<Value, Error> {
    let engine = match resolver {
        Some(resolver) => Engine::with_resolver(EngineOptions::default(), resolver),
        None => Engine::new(EngineOptions::default(), |_| {}),
    };
    let names: Vec<String> = (1..=arg_types.len()).map(|i| format!("arg{}", i)).collect();
    let params: Vec<(&str, Type)> = names
        .iter()
        .map(String::as_str)
        .zip(arg_types.iter().cloned())
        .collect();
    let expr = engine.compile_with(
        &engine.options.default_compilation_options,
        expression,
        &params,
        result_type,
    )?;
    expr.run(args)
}
