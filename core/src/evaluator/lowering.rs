//! Lowers a typed expression into an execution tree.

use alloc::sync::Arc;

use tracing::debug;

use super::ExecutionNode;
use super::conversions::ConversionPlan;
use super::invoker::{INVOKER_CACHE, InvokerCache};
use super::node::{Binding, BinaryOperator, ElementCall, LambdaBody, Node, UnaryOperator};
use super::operators::{binary_intrinsic, unary_intrinsic};
use crate::binder::{BinaryKind, ElementInit, MemberBinding, TypedExpr, TypedExpression, TypedKind, UnaryKind};
use crate::stack::ensure_sufficient_stack;
use crate::syntax::BinaryOp;

/// Lowers `expr`, resolving invokers through the process-wide cache.
pub fn lower(expr: &TypedExpression) -> ExecutionNode {
    lower_with(expr, &INVOKER_CACHE)
}

pub(crate) fn lower_with(expr: &TypedExpression, cache: &InvokerCache) -> ExecutionNode {
    let lowering = Lowering {
        temporaries: expr.temporaries,
        cache,
    };
    let root = lowering.lower(&expr.root);
    debug!(
        result_type = %expr.result_type,
        parameters = expr.parameters.len(),
        slots = expr.temporaries + expr.parameters.len(),
        "Lowered expression"
    );
    ExecutionNode {
        root,
        parameters: expr.parameters.iter().map(|(_, ty)| ty.clone()).collect(),
        temporaries: expr.temporaries,
        result_type: expr.result_type.clone(),
    }
}

struct Lowering<'a> {
    temporaries: usize,
    cache: &'a InvokerCache,
}

impl Lowering<'_> {
    fn boxed(&self, expr: &TypedExpr) -> Box<Node> {
        Box::new(self.lower(expr))
    }

    fn all(&self, exprs: &[TypedExpr]) -> Vec<Node> {
        exprs.iter().map(|e| self.lower(e)).collect()
    }

    fn optional(&self, exprs: &[Option<TypedExpr>]) -> Vec<Option<Node>> {
        exprs.iter().map(|e| e.as_ref().map(|e| self.lower(e))).collect()
    }

    fn lower(&self, expr: &TypedExpr) -> Node {
        ensure_sufficient_stack(|| self.lower_inner(expr))
    }

    fn lower_inner(&self, expr: &TypedExpr) -> Node {
        match &expr.kind {
            TypedKind::Constant(value) => Node::Constant(value.clone()),
            TypedKind::Parameter(i) => Node::Local(self.temporaries + i),
            TypedKind::Local(slot) => Node::Local(*slot),

            TypedKind::Field { target, property } => Node::Field {
                null_check: target.as_ref().is_some_and(|t| !t.ty.is_nullable()),
                target: target.as_ref().map(|t| self.boxed(t)),
                getter: property.getter.clone(),
            },
            TypedKind::ArrayIndex { array, index } => Node::ArrayIndex {
                array: self.boxed(array),
                index: self.boxed(index),
            },
            TypedKind::ArrayLength(array) => Node::ArrayLength(self.boxed(array)),
            TypedKind::Indexer {
                target,
                indexer,
                arguments,
            } => Node::Indexer {
                null_check: !target.ty.is_nullable(),
                target: self.boxed(target),
                getter: indexer.getter.clone(),
                arguments: self.all(arguments),
            },
            TypedKind::Call {
                target,
                method,
                arguments,
            } => Node::Call {
                null_check: target.as_ref().is_some_and(|t| !t.ty.is_nullable()),
                target: target.as_ref().map(|t| self.boxed(t)),
                invoker: self.cache.get(method),
                arguments: self.optional(arguments),
            },
            TypedKind::Invoke {
                delegate,
                arguments,
            } => Node::Invoke {
                delegate: self.boxed(delegate),
                arguments: self.all(arguments),
            },

            TypedKind::Binary {
                op,
                kind,
                left,
                right,
                checked,
                lifted,
            } => {
                let operator = match kind {
                    BinaryKind::Logical => {
                        let (left, right) = (self.boxed(left), self.boxed(right));
                        return if *op == BinaryOp::OrElse {
                            Node::OrElse(left, right)
                        } else {
                            Node::AndAlso(left, right)
                        };
                    }
                    BinaryKind::Primitive(p) => BinaryOperator::Intrinsic(binary_intrinsic(*p, *op, *checked)),
                    BinaryKind::StringEquality => BinaryOperator::StringEquality,
                    BinaryKind::ReferenceEquality => BinaryOperator::ReferenceEquality,
                    BinaryKind::User(method) => BinaryOperator::User(self.cache.get(method)),
                };
                Node::Binary {
                    op: *op,
                    operator,
                    left: self.boxed(left),
                    right: self.boxed(right),
                    lifted: *lifted,
                }
            }
            TypedKind::Unary {
                op,
                kind,
                operand,
                checked,
                lifted,
            } => Node::Unary {
                operator: match kind {
                    UnaryKind::Primitive(p) => UnaryOperator::Intrinsic(unary_intrinsic(*p, *op, *checked)),
                    UnaryKind::User(method) => UnaryOperator::User(self.cache.get(method)),
                },
                operand: self.boxed(operand),
                lifted: *lifted,
            },
            TypedKind::Conditional {
                condition,
                when_true,
                when_false,
            } => Node::Conditional {
                condition: self.boxed(condition),
                when_true: self.boxed(when_true),
                when_false: self.boxed(when_false),
            },
            TypedKind::Coalesce { left, right } => Node::Coalesce {
                left: self.boxed(left),
                right: self.boxed(right),
            },
            TypedKind::Convert {
                operand,
                checked,
                method,
            } => match method {
                Some(method) => Node::Call {
                    target: None,
                    invoker: self.cache.get(method),
                    arguments: vec![Some(self.lower(operand))],
                    null_check: false,
                },
                None => Node::Convert {
                    plan: ConversionPlan::new(&operand.ty, &expr.ty, *checked),
                    operand: self.boxed(operand),
                },
            },
            TypedKind::TypeIs { operand, target } => Node::TypeIs {
                operand: self.boxed(operand),
                target: target.clone(),
            },
            TypedKind::TypeAs { operand } => Node::TypeAs {
                operand: self.boxed(operand),
                target: expr.ty.clone(),
            },

            TypedKind::New {
                constructor,
                arguments,
            } => Node::New {
                invoker: self.cache.get(constructor),
                arguments: self.optional(arguments),
            },
            TypedKind::NewArrayBounds { element, length } => Node::NewArrayBounds {
                element: element.clone(),
                length: self.boxed(length),
            },
            TypedKind::NewArrayInit { element, elements } => Node::NewArrayInit {
                element: element.clone(),
                elements: self.all(elements),
            },
            TypedKind::ListInit { new, elements } => Node::ListInit {
                new: self.boxed(new),
                elements: self.elements(elements),
            },
            TypedKind::MemberInit { new, bindings } => Node::MemberInit {
                new: self.boxed(new),
                bindings: self.bindings(bindings),
            },
            TypedKind::Lambda { parameters, body } => Node::Lambda(Arc::new(LambdaBody {
                ty: expr.ty.clone(),
                parameters: parameters.clone(),
                body: self.lower(body),
            })),
            TypedKind::NullGuard {
                receiver,
                slot,
                body,
            } => Node::NullGuard {
                receiver: self.boxed(receiver),
                slot: *slot,
                body: self.boxed(body),
            },
        }
    }

    fn elements(&self, elements: &[ElementInit]) -> Vec<ElementCall> {
        elements
            .iter()
            .map(|e| ElementCall {
                invoker: self.cache.get(&e.method),
                arguments: self.all(&e.arguments),
            })
            .collect()
    }

    fn bindings(&self, bindings: &[MemberBinding]) -> Vec<Binding> {
        bindings
            .iter()
            .map(|b| match b {
                MemberBinding::Assign { property, value } => Binding::Assign {
                    member: property.name.to_string(),
                    setter: property.setter.clone(),
                    value: self.lower(value),
                },
                MemberBinding::MemberList { property, elements } => Binding::List {
                    getter: property.getter.clone(),
                    elements: self.elements(elements),
                },
                MemberBinding::MemberMember { property, bindings } => Binding::Member {
                    getter: property.getter.clone(),
                    bindings: self.bindings(bindings),
                },
            })
            .collect()
    }
}
