//! Public API for compiling and executing C# expressions.
//!
//! This module provides the stable entry points over the pipeline stages.
//! It offers three levels:
//!
//! 1. **One-shot**: [`evaluate`] parses, binds and runs in a single call
//! 2. **Compiled**: [`Engine::compile`] once, [`CompiledExpression::run`] many times
//! 3. **Staged**: [`Engine::parse_and_bind`] yields a typed tree for callers
//!    that lower and run it themselves
//!
//! # Example
//!
//! ```
//! use cseval_core::api::{Engine, EngineOptions};
//! use cseval_core::types::Type;
//! use cseval_core::values::Value;
//!
//! let engine = Engine::new(EngineOptions::default(), |_env| {});
//!
//! let expr = engine.compile("s?.Length ?? -1", &[("s", Type::String)]).unwrap();
//! assert_eq!(expr.run(&[Value::string("four")]).unwrap(), Value::Int32(4));
//! assert_eq!(expr.run(&[Value::Null]).unwrap(), Value::Int32(-1));
//! ```

pub mod engine;
pub mod environment;
pub mod error;
pub mod expression;
pub mod options;

pub use engine::{Engine, evaluate};
pub use environment::EnvironmentBuilder;
pub use error::{Diagnostic, Error, RelatedInfo, Severity};
pub use expression::CompiledExpression;
pub use options::{CompilationOptions, EngineOptions, ExecutionOptions};
