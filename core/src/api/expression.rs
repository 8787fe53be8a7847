//! Compiled expressions.

use super::{Error, ExecutionOptions};
use crate::evaluator::ExecutionNode;
use crate::types::Type;
use crate::values::Value;

/// A compiled expression ready for execution.
///
/// Compiled expressions own their execution tree and can be run any number
/// of times, concurrently, with different arguments.
///
/// # Execution Tiers
///
/// - **`run()`**: validates argument count and runtime types (recommended)
/// - **[`ExecutionNode::run`]**: checks the count only, faults come back raw
///
/// # Example
///
/// ```
/// use cseval_core::api::{Engine, EngineOptions, Error};
/// use cseval_core::types::Type;
/// use cseval_core::values::Value;
///
/// let engine = Engine::new(EngineOptions::default(), |_| {});
/// let expr = engine.compile("x / y", &[("x", Type::INT32), ("y", Type::INT32)]).unwrap();
///
/// assert_eq!(expr.run(&[Value::Int32(84), Value::Int32(2)]).unwrap(), Value::Int32(42));
/// assert!(matches!(expr.run(&[Value::Int32(1)]), Err(Error::Api(_))));
/// assert!(matches!(expr.run(&[Value::Int32(1), Value::Int32(0)]), Err(Error::Runtime { .. })));
/// ```
pub struct CompiledExpression {
    node: ExecutionNode,
    options: ExecutionOptions,
}

impl CompiledExpression {
    pub(crate) fn new(node: ExecutionNode, options: ExecutionOptions) -> Self {
        Self { node, options }
    }

    /// Execute with the engine's default execution options.
    pub fn run(&self, args: &[Value]) -> Result<Value, Error> {
        self.run_with(args, &self.options)
    }

    /// Execute with explicit execution options.
    pub fn run_with(&self, args: &[Value], options: &ExecutionOptions) -> Result<Value, Error> {
        let params = self.node.parameter_types();
        if args.len() != params.len() {
            return Err(Error::Api(format!(
                "expected {} arguments, got {}",
                params.len(),
                args.len()
            )));
        }
        for (i, (arg, ty)) in args.iter().zip(params).enumerate() {
            let accepted = match arg {
                Value::Null => ty.can_be_null(),
                _ => arg.is_instance_of(ty),
            };
            if !accepted {
                return Err(Error::Api(format!(
                    "argument {} has type {}, expected {}",
                    i,
                    arg.runtime_type(),
                    ty
                )));
            }
        }
        Ok(self.node.run_with(args, options)?)
    }

    pub fn params(&self) -> &[Type] {
        self.node.parameter_types()
    }

    pub fn return_type(&self) -> &Type {
        self.node.result_type()
    }

    /// The underlying execution tree.
    pub fn node(&self) -> &ExecutionNode {
        &self.node
    }
}
