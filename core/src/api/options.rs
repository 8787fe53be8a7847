//! Configuration options for the engine.

/// Configuration options for compilation.
///
/// These options control how source text is parsed and bound.
///
/// # Example
///
/// ```
/// use cseval_core::api::CompilationOptions;
///
/// let options = CompilationOptions {
///     checked_by_default: false,
///     ..CompilationOptions::default()
/// };
/// assert!(options.context_parameter.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CompilationOptions {
    /// Whether arithmetic and conversions outside `checked(...)` /
    /// `unchecked(...)` detect overflow.
    ///
    /// Default: true
    pub checked_by_default: bool,

    /// Parameter whose members can be referenced by bare name, as if the
    /// expression were written inside that type.
    ///
    /// Default: None
    pub context_parameter: Option<String>,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            checked_by_default: true,
            context_parameter: None,
        }
    }
}

/// Configuration options for expression execution.
///
/// These options control resource limits during evaluation.
///
/// # Example
///
/// ```
/// use cseval_core::api::ExecutionOptions;
///
/// let options = ExecutionOptions { max_depth: 500 };
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Maximum number of nested lambda invocations. Guards against runaway
    /// recursion through delegates; the nesting of the expression itself is
    /// not limited.
    ///
    /// Default: 1000
    pub max_depth: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self { max_depth: 1000 }
    }
}

/// Configuration options for the engine.
///
/// These options set the defaults for compilation and execution.
///
/// # Example
///
/// ```
/// use cseval_core::api::{EngineOptions, CompilationOptions, ExecutionOptions};
///
/// let options = EngineOptions {
///     default_compilation_options: CompilationOptions::default(),
///     default_execution_options: ExecutionOptions { max_depth: 500 },
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Default options for compilation.
    pub default_compilation_options: CompilationOptions,

    /// Default options for execution.
    ///
    /// These can be overridden when calling `CompiledExpression::run_with()`.
    pub default_execution_options: ExecutionOptions,
}
