//! The typed expression tree produced by the binder.
//!
//! Every node carries its static type and the span of the syntax it came
//! from. Conversions the language performs implicitly are explicit
//! `Convert` nodes here, so the execution engine never has to decide
//! anything about types.

use alloc::sync::Arc;
use core::mem;

use crate::syntax::{BinaryOp, Span, UnaryOp};
use crate::types::{Indexer, Method, PrimitiveType, Property, Type};
use crate::values::Value;

/// A bound expression ready to be lowered.
#[derive(Debug, Clone)]
pub struct TypedExpression {
    pub root: TypedExpr,
    /// Declared parameters, in call order.
    pub parameters: Vec<(String, Type)>,
    /// Number of temporary slots (null-guard receivers, lambda parameters).
    /// Parameters are numbered after them in the closure.
    pub temporaries: usize,
    pub result_type: Type,
}

#[derive(Debug, Clone)]
pub struct TypedExpr {
    pub ty: Type,
    pub span: Span,
    pub kind: TypedKind,
}

/// How a binary operator is carried out.
#[derive(Debug, Clone)]
pub enum BinaryKind {
    /// Intrinsic over two operands already converted to this primitive.
    /// Shifts take an `int` right operand.
    Primitive(PrimitiveType),
    /// Short-circuit `&&` / `||` on `bool`.
    Logical,
    /// `==` / `!=` comparing string contents.
    StringEquality,
    /// `==` / `!=` by reference, or against `null`.
    ReferenceEquality,
    /// A user-defined `op_*` method.
    User(Arc<Method>),
}

#[derive(Debug, Clone)]
pub enum UnaryKind {
    Primitive(PrimitiveType),
    User(Arc<Method>),
}

/// One entry of an object initializer.
#[derive(Debug, Clone)]
pub enum MemberBinding {
    /// `Member = value`.
    Assign { property: Property, value: TypedExpr },
    /// `Member = { a, b }`: each element is passed to the member's `Add`.
    MemberList {
        property: Property,
        elements: Vec<ElementInit>,
    },
    /// `Member = { X = 1 }`: initializes the object the member already holds.
    MemberMember {
        property: Property,
        bindings: Vec<MemberBinding>,
    },
}

/// One `Add(...)` call of a collection initializer.
#[derive(Debug, Clone)]
pub struct ElementInit {
    pub method: Arc<Method>,
    pub arguments: Vec<TypedExpr>,
}

#[derive(Debug, Clone)]
pub enum TypedKind {
    Constant(Value),
    Parameter(usize),
    /// Temporary slot.
    Local(usize),

    /// Field or property read; `target` is `None` for static members.
    Field {
        target: Option<Box<TypedExpr>>,
        property: Property,
    },
    ArrayIndex {
        array: Box<TypedExpr>,
        index: Box<TypedExpr>,
    },
    ArrayLength(Box<TypedExpr>),
    Indexer {
        target: Box<TypedExpr>,
        indexer: Indexer,
        arguments: Vec<TypedExpr>,
    },
    /// Method call. An argument is `None` when an optional parameter was
    /// omitted and takes its default.
    Call {
        target: Option<Box<TypedExpr>>,
        method: Arc<Method>,
        arguments: Vec<Option<TypedExpr>>,
    },
    /// Delegate invocation.
    Invoke {
        delegate: Box<TypedExpr>,
        arguments: Vec<TypedExpr>,
    },

    Binary {
        op: BinaryOp,
        kind: BinaryKind,
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
        checked: bool,
        /// An operand is nullable: a `null` operand short-circuits.
        lifted: bool,
    },
    Unary {
        op: UnaryOp,
        kind: UnaryKind,
        operand: Box<TypedExpr>,
        checked: bool,
        lifted: bool,
    },
    Conditional {
        condition: Box<TypedExpr>,
        when_true: Box<TypedExpr>,
        when_false: Box<TypedExpr>,
    },
    /// `left ?? right`; `left` is already converted to the (nullable) result
    /// type.
    Coalesce {
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    /// Conversion from `operand.ty` to the node's type. `method` is set for a
    /// user-defined conversion, whose operand already has the parameter type.
    Convert {
        operand: Box<TypedExpr>,
        checked: bool,
        method: Option<Arc<Method>>,
    },
    TypeIs {
        operand: Box<TypedExpr>,
        target: Type,
    },
    TypeAs {
        operand: Box<TypedExpr>,
    },

    New {
        constructor: Arc<Method>,
        arguments: Vec<Option<TypedExpr>>,
    },
    NewArrayBounds {
        element: Type,
        length: Box<TypedExpr>,
    },
    NewArrayInit {
        element: Type,
        elements: Vec<TypedExpr>,
    },
    ListInit {
        new: Box<TypedExpr>,
        elements: Vec<ElementInit>,
    },
    MemberInit {
        new: Box<TypedExpr>,
        bindings: Vec<MemberBinding>,
    },

    Lambda {
        /// Temporary slots receiving the arguments.
        parameters: Vec<usize>,
        body: Box<TypedExpr>,
    },

    /// Evaluates `receiver`; `null` short-circuits the whole node to `null`,
    /// otherwise the value is stored in `slot` and `body` is evaluated.
    NullGuard {
        receiver: Box<TypedExpr>,
        slot: usize,
        body: Box<TypedExpr>,
    },
}

impl TypedExpr {
    pub fn new(ty: Type, span: Span, kind: TypedKind) -> Self {
        TypedExpr { ty, span, kind }
    }

    pub fn constant(value: Value, ty: Type, span: Span) -> Self {
        TypedExpr::new(ty, span, TypedKind::Constant(value))
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match &self.kind {
            TypedKind::Constant(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this is the `null` literal (typed `Type::Null`).
    pub fn is_null_literal(&self) -> bool {
        matches!(self.ty, Type::Null)
    }

    /// Number of nodes; used in bind logging.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            node.for_each_child(&mut |child| pending.push(child));
        }
        count
    }

    /// Visits direct children.
    pub fn for_each_child<'a>(&'a self, f: &mut dyn FnMut(&'a TypedExpr)) {
        match &self.kind {
            TypedKind::Constant(_) | TypedKind::Parameter(_) | TypedKind::Local(_) => {}
            TypedKind::Field { target, .. } => {
                if let Some(t) = target {
                    f(t);
                }
            }
            TypedKind::ArrayIndex { array, index } => {
                f(array);
                f(index);
            }
            TypedKind::ArrayLength(array) => f(array),
            TypedKind::Indexer {
                target, arguments, ..
            } => {
                f(target);
                arguments.iter().for_each(|a| f(a));
            }
            TypedKind::Call {
                target, arguments, ..
            } => {
                if let Some(t) = target {
                    f(t);
                }
                arguments.iter().flatten().for_each(|a| f(a));
            }
            TypedKind::Invoke {
                delegate,
                arguments,
            } => {
                f(delegate);
                arguments.iter().for_each(|a| f(a));
            }
            TypedKind::Binary { left, right, .. } | TypedKind::Coalesce { left, right } => {
                f(left);
                f(right);
            }
            TypedKind::Unary { operand, .. }
            | TypedKind::Convert { operand, .. }
            | TypedKind::TypeIs { operand, .. }
            | TypedKind::TypeAs { operand } => f(operand),
            TypedKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                f(condition);
                f(when_true);
                f(when_false);
            }
            TypedKind::New { arguments, .. } => arguments.iter().flatten().for_each(|a| f(a)),
            TypedKind::NewArrayBounds { length, .. } => f(length),
            TypedKind::NewArrayInit { elements, .. } => elements.iter().for_each(|a| f(a)),
            TypedKind::ListInit { new, elements } => {
                f(new);
                for e in elements {
                    e.arguments.iter().for_each(|a| f(a));
                }
            }
            TypedKind::MemberInit { new, bindings } => {
                f(new);
                for_each_binding_child(bindings, f);
            }
            TypedKind::Lambda { body, .. } => f(body),
            TypedKind::NullGuard { receiver, body, .. } => {
                f(receiver);
                f(body);
            }
        }
    }
}

fn for_each_binding_child<'a>(bindings: &'a [MemberBinding], f: &mut dyn FnMut(&'a TypedExpr)) {
    for binding in bindings {
        match binding {
            MemberBinding::Assign { value, .. } => f(value),
            MemberBinding::MemberList { elements, .. } => {
                for e in elements {
                    e.arguments.iter().for_each(|a| f(a));
                }
            }
            MemberBinding::MemberMember { bindings, .. } => for_each_binding_child(bindings, f),
        }
    }
}

/// Trees can be as deep as the source is long; children are detached and
/// dropped from a worklist instead of recursively.
impl Drop for TypedExpr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.kind.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.kind.detach_children(&mut pending);
        }
    }
}

impl TypedKind {
    /// Moves the direct children into `out`, leaving a leaf behind.
    fn detach_children(&mut self, out: &mut Vec<TypedExpr>) {
        if matches!(
            self,
            TypedKind::Constant(_) | TypedKind::Parameter(_) | TypedKind::Local(_)
        ) {
            return;
        }
        match mem::replace(self, TypedKind::Local(0)) {
            TypedKind::Constant(_) | TypedKind::Parameter(_) | TypedKind::Local(_) => {}
            TypedKind::Field { target, .. } => out.extend(target.map(|t| *t)),
            TypedKind::ArrayIndex { array, index } => {
                out.push(*array);
                out.push(*index);
            }
            TypedKind::ArrayLength(array) => out.push(*array),
            TypedKind::Indexer {
                target, arguments, ..
            } => {
                out.push(*target);
                out.extend(arguments);
            }
            TypedKind::Call {
                target, arguments, ..
            } => {
                out.extend(target.map(|t| *t));
                out.extend(arguments.into_iter().flatten());
            }
            TypedKind::Invoke {
                delegate,
                arguments,
            } => {
                out.push(*delegate);
                out.extend(arguments);
            }
            TypedKind::Binary { left, right, .. } | TypedKind::Coalesce { left, right } => {
                out.push(*left);
                out.push(*right);
            }
            TypedKind::Unary { operand, .. }
            | TypedKind::Convert { operand, .. }
            | TypedKind::TypeIs { operand, .. }
            | TypedKind::TypeAs { operand } => out.push(*operand),
            TypedKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                out.push(*condition);
                out.push(*when_true);
                out.push(*when_false);
            }
            TypedKind::New { arguments, .. } => out.extend(arguments.into_iter().flatten()),
            TypedKind::NewArrayBounds { length, .. } => out.push(*length),
            TypedKind::NewArrayInit { elements, .. } => out.extend(elements),
            TypedKind::ListInit { new, elements } => {
                out.push(*new);
                out.extend(elements.into_iter().flat_map(|e| e.arguments));
            }
            TypedKind::MemberInit { new, bindings } => {
                out.push(*new);
                detach_binding_children(bindings, out);
            }
            TypedKind::Lambda { body, .. } => out.push(*body),
            TypedKind::NullGuard { receiver, body, .. } => {
                out.push(*receiver);
                out.push(*body);
            }
        }
    }
}

fn detach_binding_children(bindings: Vec<MemberBinding>, out: &mut Vec<TypedExpr>) {
    for binding in bindings {
        match binding {
            MemberBinding::Assign { value, .. } => out.push(value),
            MemberBinding::MemberList { elements, .. } => {
                out.extend(elements.into_iter().flat_map(|e| e.arguments));
            }
            MemberBinding::MemberMember { bindings, .. } => detach_binding_children(bindings, out),
        }
    }
}
