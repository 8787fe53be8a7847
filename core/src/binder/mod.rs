//! Resolves a syntax tree against declared parameters and a type resolver,
//! producing a fully typed expression tree.

#[allow(clippy::module_inception)]
pub mod binder;
mod conversions;
pub mod error;
mod operators;
mod overload;
pub mod typed_expr;

#[cfg(test)]
mod binder_test;

pub use binder::{bind, bind_to};
pub use error::{BindError, BindErrorKind};
pub use typed_expr::{
    BinaryKind, ElementInit, MemberBinding, TypedExpr, TypedExpression, TypedKind, UnaryKind,
};
