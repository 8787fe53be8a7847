//! Execution tree nodes.
//!
//! A node has everything resolved: slot indices instead of names, native
//! accessors instead of members, intrinsic function pointers and cached
//! invokers instead of operators and methods.

use alloc::sync::Arc;
use core::mem;

use super::conversions::ConversionPlan;
use super::invoker::Invoker;
use super::operators::{BinaryFn, UnaryFn};
use crate::syntax::BinaryOp;
use crate::types::{Getter, NativeFn, Setter, Type};
use crate::values::Value;

pub(crate) enum BinaryOperator {
    Intrinsic(BinaryFn),
    StringEquality,
    ReferenceEquality,
    User(Arc<Invoker>),
}

pub(crate) enum UnaryOperator {
    Intrinsic(UnaryFn),
    User(Arc<Invoker>),
}

/// One `Add(...)` call of a collection initializer.
pub(crate) struct ElementCall {
    pub invoker: Arc<Invoker>,
    pub arguments: Vec<Node>,
}

pub(crate) enum Binding {
    Assign {
        member: String,
        setter: Option<Setter>,
        value: Node,
    },
    List {
        getter: Getter,
        elements: Vec<ElementCall>,
    },
    Member {
        getter: Getter,
        bindings: Vec<Binding>,
    },
}

/// A lambda: the delegate type, the slots receiving its arguments, and the
/// body.
pub(crate) struct LambdaBody {
    pub ty: Type,
    pub parameters: Vec<usize>,
    pub body: Node,
}

pub(crate) enum Node {
    Constant(Value),
    Local(usize),

    /// `null_check` is set when a `null` receiver faults; it is clear for
    /// `Nullable<T>` receivers, whose members accept `null`.
    Field {
        target: Option<Box<Node>>,
        getter: Getter,
        null_check: bool,
    },
    ArrayIndex {
        array: Box<Node>,
        index: Box<Node>,
    },
    ArrayLength(Box<Node>),
    Indexer {
        target: Box<Node>,
        getter: NativeFn,
        arguments: Vec<Node>,
        null_check: bool,
    },
    Call {
        target: Option<Box<Node>>,
        invoker: Arc<Invoker>,
        arguments: Vec<Option<Node>>,
        null_check: bool,
    },
    Invoke {
        delegate: Box<Node>,
        arguments: Vec<Node>,
    },

    Binary {
        op: BinaryOp,
        operator: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
        lifted: bool,
    },
    AndAlso(Box<Node>, Box<Node>),
    OrElse(Box<Node>, Box<Node>),
    Unary {
        operator: UnaryOperator,
        operand: Box<Node>,
        lifted: bool,
    },
    Conditional {
        condition: Box<Node>,
        when_true: Box<Node>,
        when_false: Box<Node>,
    },
    Coalesce {
        left: Box<Node>,
        right: Box<Node>,
    },
    Convert {
        operand: Box<Node>,
        plan: ConversionPlan,
    },
    TypeIs {
        operand: Box<Node>,
        target: Type,
    },
    TypeAs {
        operand: Box<Node>,
        target: Type,
    },

    New {
        invoker: Arc<Invoker>,
        arguments: Vec<Option<Node>>,
    },
    NewArrayBounds {
        element: Type,
        length: Box<Node>,
    },
    NewArrayInit {
        element: Type,
        elements: Vec<Node>,
    },
    ListInit {
        new: Box<Node>,
        elements: Vec<ElementCall>,
    },
    MemberInit {
        new: Box<Node>,
        bindings: Vec<Binding>,
    },
    Lambda(Arc<LambdaBody>),
    NullGuard {
        receiver: Box<Node>,
        slot: usize,
        body: Box<Node>,
    },
}

/// Detaches children onto a worklist so dropping a deep tree does not
/// recurse.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

impl Node {
    fn detach_children(&mut self, out: &mut Vec<Node>) {
        if matches!(self, Node::Constant(_) | Node::Local(_) | Node::Lambda(_)) {
            return;
        }
        fn take(node: &mut Box<Node>) -> Node {
            mem::replace(&mut **node, Node::Local(0))
        }
        match self {
            Node::Constant(_) | Node::Local(_) | Node::Lambda(_) => {}
            Node::Field { target, .. } => out.extend(target.take().map(|t| *t)),
            Node::ArrayIndex { array, index } => {
                out.push(take(array));
                out.push(take(index));
            }
            Node::ArrayLength(array) => out.push(take(array)),
            Node::Indexer {
                target, arguments, ..
            } => {
                out.push(take(target));
                out.extend(mem::take(arguments));
            }
            Node::Call {
                target, arguments, ..
            } => {
                out.extend(target.take().map(|t| *t));
                out.extend(mem::take(arguments).into_iter().flatten());
            }
            Node::Invoke {
                delegate,
                arguments,
            } => {
                out.push(take(delegate));
                out.extend(mem::take(arguments));
            }
            Node::Binary { left, right, .. }
            | Node::AndAlso(left, right)
            | Node::OrElse(left, right)
            | Node::Coalesce { left, right } => {
                out.push(take(left));
                out.push(take(right));
            }
            Node::Unary { operand, .. }
            | Node::Convert { operand, .. }
            | Node::TypeIs { operand, .. }
            | Node::TypeAs { operand, .. } => out.push(take(operand)),
            Node::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                out.push(take(condition));
                out.push(take(when_true));
                out.push(take(when_false));
            }
            Node::New { arguments, .. } => out.extend(mem::take(arguments).into_iter().flatten()),
            Node::NewArrayBounds { length, .. } => out.push(take(length)),
            Node::NewArrayInit { elements, .. } => out.extend(mem::take(elements)),
            Node::ListInit { new, elements } => {
                out.push(take(new));
                out.extend(mem::take(elements).into_iter().flat_map(|e| e.arguments));
            }
            Node::MemberInit { new, bindings } => {
                out.push(take(new));
                detach_binding_children(mem::take(bindings), out);
            }
            Node::NullGuard { receiver, body, .. } => {
                out.push(take(receiver));
                out.push(take(body));
            }
        }
    }
}

fn detach_binding_children(bindings: Vec<Binding>, out: &mut Vec<Node>) {
    for binding in bindings {
        match binding {
            Binding::Assign { value, .. } => out.push(value),
            Binding::List { elements, .. } => out.extend(elements.into_iter().flat_map(|e| e.arguments)),
            Binding::Member { bindings, .. } => detach_binding_children(bindings, out),
        }
    }
}
