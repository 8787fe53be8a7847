//! cseval - An embeddable C# expression interpreter
//!
//! # Overview
//!
//! cseval evaluates single C# expressions against host-supplied parameters
//! and types, without a .NET runtime. Common use cases include:
//!
//! - Computed fields and validation rules in configuration
//! - Report and message templates
//! - Filters over host objects
//!
//! # Quick Start
//!
//! ```
//! use cseval::{Engine, EngineOptions, Type, Value};
//!
//! let engine = Engine::new(EngineOptions::default(), |_env| {});
//!
//! // Compile an expression once
//! let expr = engine
//!     .compile("price * qty > 100m ? \"bulk\" : \"retail\"", &[("price", Type::DECIMAL), ("qty", Type::INT32)])
//!     .unwrap();
//!
//! // Run it many times
//! let price = Value::Decimal(cseval::values::Decimal::from_i64(30));
//! let result = expr.run(&[price, Value::Int32(4)]).unwrap();
//! assert_eq!(result, Value::string("bulk"));
//! ```
//!
//! # One-shot evaluation
//!
//! [`evaluate`] names the parameters `arg1`, `arg2`, ...:
//!
//! ```
//! use cseval::{Type, Value, evaluate};
//!
//! let result = evaluate("arg1?.Length ?? 0", &[Type::String], None, None, &[Value::Null]).unwrap();
//! assert_eq!(result, Value::Int32(0));
//! ```
//!
//! # Host types
//!
//! Classes are declared with [`types::ClassInfo`] and registered with the
//! engine's [`EnvironmentBuilder`]; their members are closures over
//! [`Value`]s.

mod error_renderer;

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};

// Re-export public API from cseval_core
pub use cseval_core::api::{
    CompilationOptions, CompiledExpression, Diagnostic, Engine, EngineOptions, EnvironmentBuilder,
    Error, ExecutionOptions, RelatedInfo, Severity, evaluate,
};

// Re-export the pipeline stages for callers that drive them directly
pub use cseval_core::binder::{self, TypedExpression};
pub use cseval_core::evaluator::{self, ExecutionNode, Fault, lower};
pub use cseval_core::parser::{self, parse_syntax_tree};
pub use cseval_core::render::render;
pub use cseval_core::syntax_tree::{self, SyntaxKind, SyntaxNode};
pub use cseval_core::template::Template;

// Re-export commonly used types and values
pub use cseval_core::types::{self, Type, TypeCatalog, TypeResolver};
pub use cseval_core::values::{self, Value};
