//! The syntax tree: a closed, serializable description of an expression.
//!
//! Produced by lowering the parse tree, consumed by the binder and the
//! renderer. It carries no parser internals, so an alternative front end can
//! build one directly (or ship one as bytes, see [`SyntaxNode::to_bytes`]).

use core::mem;

use serde::{Deserialize, Serialize};

use crate::syntax::{BinaryOp, Span, UnaryOp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxNode {
    pub span: Span,
    pub kind: SyntaxKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyntaxKind {
    Literal(Literal),

    /// A bare name, optionally with explicit type arguments (`Max<int>`).
    Identifier {
        name: String,
        type_arguments: Vec<TypeRef>,
    },

    /// `target.member`, `target?.member`, `target.Member<T>`.
    MemberAccess {
        target: Box<SyntaxNode>,
        member: String,
        type_arguments: Vec<TypeRef>,
        null_conditional: bool,
    },

    /// `target[args]`, `target?[args]`.
    Index {
        target: Box<SyntaxNode>,
        arguments: ArgumentList,
        null_conditional: bool,
    },

    /// `target(args)`; `target` is the method group or delegate.
    Call {
        target: Box<SyntaxNode>,
        arguments: ArgumentList,
    },

    Unary {
        op: UnaryOp,
        operand: Box<SyntaxNode>,
        checked: bool,
    },

    Binary {
        op: BinaryOp,
        left: Box<SyntaxNode>,
        right: Box<SyntaxNode>,
        checked: bool,
    },

    Conditional {
        condition: Box<SyntaxNode>,
        when_true: Box<SyntaxNode>,
        when_false: Box<SyntaxNode>,
    },

    Cast {
        ty: TypeRef,
        operand: Box<SyntaxNode>,
        checked: bool,
    },

    Is {
        operand: Box<SyntaxNode>,
        ty: TypeRef,
    },

    As {
        operand: Box<SyntaxNode>,
        ty: TypeRef,
    },

    TypeOf(TypeRef),

    Default(TypeRef),

    /// `checked(...)` / `unchecked(...)`. Nodes inside already carry the
    /// resulting flag; the scope node is kept so the source can be rendered.
    OverflowScope {
        checked: bool,
        operand: Box<SyntaxNode>,
    },

    Lambda {
        parameters: Vec<LambdaParameter>,
        body: Box<SyntaxNode>,
    },

    New {
        ty: TypeRef,
        arguments: ArgumentList,
        initializer: Option<Initializer>,
    },

    /// `new T[n]`.
    NewArrayBounds {
        element: TypeRef,
        bounds: Vec<SyntaxNode>,
    },

    /// `new T[] { ... }` or `new[] { ... }` (element type inferred).
    NewArrayInit {
        element: Option<TypeRef>,
        elements: Vec<SyntaxNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Raw literal text including suffix; typed by the binder.
    Number(String),
    String(String),
    Char(char),
}

/// A reference to a type as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// Dotted path (`System.Collections.Generic.List`), with type arguments
    /// applying to the last segment.
    Named {
        path: Vec<String>,
        type_arguments: Vec<TypeRef>,
    },
    Nullable(Box<TypeRef>),
    Array {
        element: Box<TypeRef>,
        rank: u8,
    },
}

impl TypeRef {
    pub fn simple(name: &str) -> Self {
        TypeRef::Named {
            path: vec![name.to_string()],
            type_arguments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaParameter {
    pub name: String,
    pub ty: Option<TypeRef>,
    pub span: Span,
}

/// Call or indexer arguments. Positional arguments keep their order; named
/// arguments are matched to parameters by name and do not take part in the
/// positional ordering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArgumentList {
    pub positional: Vec<SyntaxNode>,
    pub named: Vec<NamedArgument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArgument {
    pub name: String,
    pub value: SyntaxNode,
    pub span: Span,
}

impl ArgumentList {
    pub fn positional(args: Vec<SyntaxNode>) -> Self {
        ArgumentList {
            positional: args,
            named: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The `{ ... }` part of an object creation expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    /// `{ 1, 2, { "k", 3 } }`: each element is passed to `Add`.
    Collection(Vec<ElementInitializer>),
    /// `{ Name = value, Items = { 1 }, Child = { X = 1 } }`.
    Object(Vec<MemberInitializer>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInitializer {
    pub arguments: Vec<SyntaxNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInitializer {
    pub member: String,
    pub value: MemberValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberValue {
    Expression(SyntaxNode),
    Initializer(Initializer),
}

impl SyntaxNode {
    pub fn new(span: Span, kind: SyntaxKind) -> Self {
        SyntaxNode { span, kind }
    }

    /// Compact binary form for handing a tree between processes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// Structural equality ignoring source positions; used to compare a tree
    /// with the tree of its rendering.
    pub fn same_shape(&self, other: &SyntaxNode) -> bool {
        self.without_spans() == other.without_spans()
    }

    /// A copy with every span zeroed.
    pub fn without_spans(&self) -> SyntaxNode {
        let mut node = self.clone();
        node.clear_spans();
        node
    }

    fn clear_spans(&mut self) {
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            node.span = Span::default();
            match &mut node.kind {
                SyntaxKind::Lambda { parameters, .. } => {
                    for p in parameters {
                        p.span = Span::default();
                    }
                }
                SyntaxKind::Call { arguments, .. } | SyntaxKind::Index { arguments, .. } => {
                    for named in &mut arguments.named {
                        named.span = Span::default();
                    }
                }
                SyntaxKind::New {
                    arguments,
                    initializer,
                    ..
                } => {
                    for named in &mut arguments.named {
                        named.span = Span::default();
                    }
                    if let Some(init) = initializer {
                        clear_initializer_spans(init);
                    }
                }
                _ => {}
            }
            node.for_each_child_mut(&mut |child| pending.push(child));
        }
    }

    /// Visits direct child expressions.
    pub fn for_each_child_mut<'a>(&'a mut self, f: &mut dyn FnMut(&'a mut SyntaxNode)) {
        match &mut self.kind {
            SyntaxKind::Literal(_)
            | SyntaxKind::Identifier { .. }
            | SyntaxKind::TypeOf(_)
            | SyntaxKind::Default(_) => {}
            SyntaxKind::MemberAccess { target, .. } => f(target),
            SyntaxKind::Index {
                target, arguments, ..
            }
            | SyntaxKind::Call { target, arguments } => {
                f(target);
                for a in &mut arguments.positional {
                    f(a);
                }
                for a in &mut arguments.named {
                    f(&mut a.value);
                }
            }
            SyntaxKind::Unary { operand, .. }
            | SyntaxKind::Cast { operand, .. }
            | SyntaxKind::Is { operand, .. }
            | SyntaxKind::As { operand, .. }
            | SyntaxKind::OverflowScope { operand, .. } => f(operand),
            SyntaxKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            SyntaxKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                f(condition);
                f(when_true);
                f(when_false);
            }
            SyntaxKind::Lambda { body, .. } => f(body),
            SyntaxKind::New {
                arguments,
                initializer,
                ..
            } => {
                for a in &mut arguments.positional {
                    f(a);
                }
                for a in &mut arguments.named {
                    f(&mut a.value);
                }
                if let Some(init) = initializer {
                    for_each_initializer_child(init, f);
                }
            }
            SyntaxKind::NewArrayBounds { bounds, .. } => {
                for b in bounds {
                    f(b);
                }
            }
            SyntaxKind::NewArrayInit { elements, .. } => {
                for e in elements {
                    f(e);
                }
            }
        }
    }
}

fn for_each_initializer_child<'a>(init: &'a mut Initializer, f: &mut dyn FnMut(&'a mut SyntaxNode)) {
    match init {
        Initializer::Collection(elements) => {
            for e in elements {
                for a in &mut e.arguments {
                    f(a);
                }
            }
        }
        Initializer::Object(members) => {
            for m in members {
                match &mut m.value {
                    MemberValue::Expression(e) => f(e),
                    MemberValue::Initializer(nested) => for_each_initializer_child(nested, f),
                }
            }
        }
    }
}

fn clear_initializer_spans(init: &mut Initializer) {
    match init {
        Initializer::Collection(elements) => {
            for e in elements {
                e.span = Span::default();
            }
        }
        Initializer::Object(members) => {
            for m in members {
                m.span = Span::default();
                if let MemberValue::Initializer(nested) = &mut m.value {
                    clear_initializer_spans(nested);
                }
            }
        }
    }
}

/// Dropping detaches children onto a worklist; a left-nested chain of
/// thousands of operators would otherwise recurse once per operator.
impl Drop for SyntaxNode {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.kind.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.kind.detach_children(&mut pending);
        }
    }
}

impl SyntaxKind {
    fn detach_children(&mut self, out: &mut Vec<SyntaxNode>) {
        if matches!(
            self,
            SyntaxKind::Literal(_) | SyntaxKind::Identifier { .. } | SyntaxKind::TypeOf(_) | SyntaxKind::Default(_)
        ) {
            return;
        }
        match mem::replace(self, SyntaxKind::Literal(Literal::Char('\0'))) {
            SyntaxKind::Literal(_)
            | SyntaxKind::Identifier { .. }
            | SyntaxKind::TypeOf(_)
            | SyntaxKind::Default(_) => {}
            SyntaxKind::MemberAccess { target, .. } => out.push(*target),
            SyntaxKind::Index {
                target, arguments, ..
            }
            | SyntaxKind::Call { target, arguments } => {
                out.push(*target);
                detach_arguments(arguments, out);
            }
            SyntaxKind::Unary { operand, .. }
            | SyntaxKind::Cast { operand, .. }
            | SyntaxKind::Is { operand, .. }
            | SyntaxKind::As { operand, .. }
            | SyntaxKind::OverflowScope { operand, .. } => out.push(*operand),
            SyntaxKind::Binary { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            SyntaxKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                out.push(*condition);
                out.push(*when_true);
                out.push(*when_false);
            }
            SyntaxKind::Lambda { body, .. } => out.push(*body),
            SyntaxKind::New {
                arguments,
                initializer,
                ..
            } => {
                detach_arguments(arguments, out);
                if let Some(init) = initializer {
                    detach_initializer(init, out);
                }
            }
            SyntaxKind::NewArrayBounds { bounds, .. } => out.extend(bounds),
            SyntaxKind::NewArrayInit { elements, .. } => out.extend(elements),
        }
    }
}

fn detach_arguments(arguments: ArgumentList, out: &mut Vec<SyntaxNode>) {
    out.extend(arguments.positional);
    out.extend(arguments.named.into_iter().map(|a| a.value));
}

fn detach_initializer(init: Initializer, out: &mut Vec<SyntaxNode>) {
    match init {
        Initializer::Collection(elements) => out.extend(elements.into_iter().flat_map(|e| e.arguments)),
        Initializer::Object(members) => {
            for m in members {
                match m.value {
                    MemberValue::Expression(e) => out.push(e),
                    MemberValue::Initializer(nested) => detach_initializer(nested, out),
                }
            }
        }
    }
}
