//! Tree-walking execution engine for bound expressions.
//!
//! A typed expression is lowered once into an immutable [`ExecutionNode`]
//! and can then be run any number of times, from any number of threads.
//!
//! ## Design Principles
//!
//! - **Never panic**: runtime conditions surface as [`Fault`]s
//! - **Stack-safe**: deep trees grow the stack as they are walked, and
//!   runaway recursion through delegates becomes [`Fault::StackOverflow`]
//! - **Pre-resolved**: accessors, invokers, intrinsics and conversion plans
//!   are fixed at lowering. Operands reach an intrinsic already converted to
//!   the operator's primitive type, so intrinsics are chosen from the bound
//!   operand type, not by inspecting values at run time
//!
//! ## Example
//!
//! ```
//! use cseval_core::binder::bind;
//! use cseval_core::api::CompilationOptions;
//! use cseval_core::evaluator::lower;
//! use cseval_core::parser::parse_syntax_tree;
//! use cseval_core::types::{Type, TypeCatalog};
//! use cseval_core::values::Value;
//!
//! let syntax = parse_syntax_tree("x * 2 + 1", true).unwrap();
//! let catalog = TypeCatalog::empty();
//! let typed = bind(&syntax, &[("x", Type::INT32)], &catalog, &CompilationOptions::default()).unwrap();
//! let node = lower(&typed);
//! assert_eq!(node.run(&[Value::Int32(20)]), Ok(Value::Int32(41)));
//! ```

mod conversions;
mod error;
mod eval;
mod invoker;
mod lowering;
mod node;
mod operators;

#[cfg(test)]
mod eval_test;

pub use error::Fault;
pub use lowering::lower;

use crate::api::ExecutionOptions;
use crate::types::Type;
use crate::values::Value;
use eval::{Depth, Frame};
use node::Node;

/// A lowered expression, ready to run.
pub struct ExecutionNode {
    root: Node,
    parameters: Vec<Type>,
    temporaries: usize,
    result_type: Type,
}

static_assertions::assert_impl_all!(ExecutionNode: Send, Sync);

impl ExecutionNode {
    /// Runs with the default execution limits.
    pub fn run(&self, args: &[Value]) -> Result<Value, Fault> {
        self.run_with(args, &ExecutionOptions::default())
    }

    /// Runs with `args` bound to the declared parameters, in order.
    pub fn run_with(&self, args: &[Value], options: &ExecutionOptions) -> Result<Value, Fault> {
        if args.len() != self.parameters.len() {
            return Err(Fault::Argument(format!(
                "expected {} arguments, got {}",
                self.parameters.len(),
                args.len()
            )));
        }
        let mut locals = vec![Value::Null; self.temporaries];
        locals.extend_from_slice(args);
        let depth = Depth::new(options.max_depth);
        let mut frame = Frame {
            locals,
            depth: &depth,
        };
        self.root.eval(&mut frame)
    }

    pub fn parameter_types(&self) -> &[Type] {
        &self.parameters
    }

    pub fn result_type(&self) -> &Type {
        &self.result_type
    }
}
