//! Runtime evaluation faults.
//!
//! Type errors never reach this point: the binder rejects them. What is left
//! are conditions that depend on the values flowing through the expression
//! (null receivers, overflow, bad casts) and failures raised by host code.

use thiserror::Error;

/// A fault raised while running an execution tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    /// Member access, indexing or unboxing through `null`.
    #[error("object reference not set to an instance of an object")]
    NullReference,

    #[error("unable to cast object of type '{from}' to type '{to}'")]
    InvalidCast { from: String, to: String },

    /// Checked arithmetic or conversion, decimal overflow, `MinValue / -1`.
    #[error("arithmetic operation resulted in an overflow")]
    Overflow,

    #[error("attempted to divide by zero")]
    DivideByZero,

    #[error("index was outside the bounds of the array")]
    IndexOutOfRange,

    /// An error raised by a host method.
    #[error("{method} failed: {message}")]
    Invocation { method: String, message: String },

    /// Lambda invocations nested deeper than `ExecutionOptions::max_depth`.
    #[error("delegate call depth exceeded the limit of {max_depth}")]
    StackOverflow { max_depth: usize },

    /// A call that is invalid for the current state of the receiver, such as
    /// `Nullable<T>.Value` on an empty value.
    #[error("{0}")]
    InvalidOperation(String),

    /// Malformed argument to a host method (`int.Parse("x")`).
    #[error("{0}")]
    Argument(String),
}

impl Fault {
    pub fn invalid_cast(from: impl ToString, to: impl ToString) -> Fault {
        Fault::InvalidCast {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Wraps an error raised by the host method `method`. Faults the engine
    /// itself understands pass through unchanged.
    pub fn invocation(method: &str, fault: Fault) -> Fault {
        match fault {
            Fault::Argument(message) | Fault::InvalidOperation(message) => Fault::Invocation {
                method: method.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Stable short name, used as the diagnostic code suffix.
    pub fn name(&self) -> &'static str {
        match self {
            Fault::NullReference => "NullReference",
            Fault::InvalidCast { .. } => "InvalidCast",
            Fault::Overflow => "Overflow",
            Fault::DivideByZero => "DivideByZero",
            Fault::IndexOutOfRange => "IndexOutOfRange",
            Fault::Invocation { .. } => "Invocation",
            Fault::StackOverflow { .. } => "StackOverflow",
            Fault::InvalidOperation(_) => "InvalidOperation",
            Fault::Argument(_) => "Argument",
        }
    }
}
