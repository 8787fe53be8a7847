//! Name, member and type resolution.

use alloc::sync::Arc;

use tracing::debug;

use super::conversions::{self, ConversionKind};
use super::error::{BindError, BindErrorKind};
use super::typed_expr::{ElementInit, MemberBinding, TypedExpr, TypedExpression, TypedKind};
use crate::api::CompilationOptions;
use crate::stack::ensure_sufficient_stack;
use crate::stdlib::{member_chain, members_of};
use crate::syntax::Span;
use crate::syntax::number_literal::{NumberLiteral, parse_number};
use crate::syntax_tree::{
    ArgumentList, ElementInitializer, Initializer, LambdaParameter, Literal, MemberInitializer,
    MemberValue, SyntaxKind, SyntaxNode, TypeRef,
};
use crate::types::{
    FunctionType, Indexer, MemberTable, Method, MethodId, PrimitiveType, Property, SYSTEM_CATALOG,
    Type, TypeResolver,
};
use crate::values::Value;

/// What a syntax node denotes before it is used as a value.
pub(super) enum Bound {
    Value(TypedExpr),
    Type(Type),
    Namespace(Vec<String>),
    MethodGroup(MethodGroup),
}

pub(super) struct MethodGroup {
    pub name: String,
    pub receiver: Option<TypedExpr>,
    /// Candidates per level of the member chain, most derived first.
    pub levels: Vec<Vec<Arc<Method>>>,
    pub type_arguments: Vec<Type>,
}

/// A call argument: bound up front, except lambdas, which need the
/// parameter type of the candidate being considered.
pub(super) enum ArgumentValue<'n> {
    Bound(TypedExpr),
    Lambda(&'n SyntaxNode),
}

pub(super) struct Argument<'n> {
    pub name: Option<&'n str>,
    pub value: ArgumentValue<'n>,
    pub span: Span,
}

impl Argument<'_> {
    pub fn ty(&self) -> Option<&Type> {
        match &self.value {
            ArgumentValue::Bound(e) => Some(&e.ty),
            ArgumentValue::Lambda(_) => None,
        }
    }
}

enum PostfixOp<'n> {
    Member {
        name: &'n str,
        type_arguments: &'n [TypeRef],
        null_conditional: bool,
    },
    Index {
        arguments: &'n ArgumentList,
        null_conditional: bool,
    },
    Call {
        arguments: &'n ArgumentList,
    },
}

struct ScopeEntry {
    name: String,
    slot: usize,
    ty: Type,
}

pub struct Binder<'a> {
    resolver: &'a dyn TypeResolver,
    options: &'a CompilationOptions,
    parameters: Vec<(String, Type)>,
    scopes: Vec<ScopeEntry>,
    pub(super) temporaries: usize,
}

/// Binds `syntax` with the given parameters in scope.
pub fn bind(
    syntax: &SyntaxNode,
    parameters: &[(&str, Type)],
    resolver: &dyn TypeResolver,
    options: &CompilationOptions,
) -> Result<TypedExpression, BindError> {
    bind_to(syntax, parameters, None, resolver, options)
}

/// Like [`bind`], converting the result implicitly to `result_type`. A
/// lambda root takes its signature from a delegate `result_type`.
pub fn bind_to(
    syntax: &SyntaxNode,
    parameters: &[(&str, Type)],
    result_type: Option<&Type>,
    resolver: &dyn TypeResolver,
    options: &CompilationOptions,
) -> Result<TypedExpression, BindError> {
    let parameters = parameters
        .iter()
        .map(|(name, ty)| (name.to_string(), ty.clone()))
        .collect();
    let mut binder = Binder::new(resolver, options, parameters)?;
    let root = match result_type {
        Some(target) if !target.is_void() => binder.bind_with_target(syntax, target)?,
        _ => binder.bind_expr(syntax)?,
    };
    debug!(
        result_type = %root.ty,
        temporaries = binder.temporaries,
        nodes = root.node_count(),
        "Bound expression"
    );
    Ok(TypedExpression {
        result_type: root.ty.clone(),
        root,
        parameters: binder.parameters,
        temporaries: binder.temporaries,
    })
}

fn error<T>(kind: BindErrorKind, span: &Span) -> Result<T, BindError> {
    Err(BindError::new(kind, span.clone()))
}

impl<'a> Binder<'a> {
    pub fn new(
        resolver: &'a dyn TypeResolver,
        options: &'a CompilationOptions,
        parameters: Vec<(String, Type)>,
    ) -> Result<Self, BindError> {
        for (i, (name, _)) in parameters.iter().enumerate() {
            if parameters[..i].iter().any(|(n, _)| n == name) {
                return error(BindErrorKind::DuplicateParameter(name.clone()), &Span::default());
            }
        }
        Ok(Binder {
            resolver,
            options,
            parameters,
            scopes: Vec::new(),
            temporaries: 0,
        })
    }

    pub fn parameters(&self) -> &[(String, Type)] {
        &self.parameters
    }

    pub(super) fn new_temporary(&mut self) -> usize {
        self.temporaries += 1;
        self.temporaries - 1
    }

    /// Runs `f` and discards the temporaries it allocated; used to try a
    /// lambda against a candidate signature.
    pub(super) fn trial<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, BindError>,
    ) -> Result<T, BindError> {
        let saved = self.temporaries;
        let result = f(self);
        self.temporaries = saved;
        result
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Binds `node` as a value, `void` included.
    pub fn bind_expr(&mut self, node: &SyntaxNode) -> Result<TypedExpr, BindError> {
        let bound = self.bind_node(node)?;
        self.into_value(bound, &node.span)
    }

    /// Binds `node` where a value is required.
    pub fn bind_value(&mut self, node: &SyntaxNode) -> Result<TypedExpr, BindError> {
        let expr = self.bind_expr(node)?;
        if expr.ty.is_void() {
            return error(BindErrorKind::VoidValue, &node.span);
        }
        Ok(expr)
    }

    /// Binds `node` and converts it implicitly to `target`. Lambdas take
    /// their parameter types from a delegate target.
    pub fn bind_with_target(&mut self, node: &SyntaxNode, target: &Type) -> Result<TypedExpr, BindError> {
        if let (SyntaxKind::Lambda { .. }, Type::Function(f)) = (&node.kind, target) {
            return self.bind_lambda(node, f);
        }
        let expr = self.bind_value(node)?;
        self.convert_implicit(expr, target)
    }

    pub(super) fn convert_implicit(&self, expr: TypedExpr, target: &Type) -> Result<TypedExpr, BindError> {
        match conversions::implicit(&expr, target) {
            Some(kind) => Ok(conversions::apply(expr, target, kind, false)),
            None => error(
                BindErrorKind::CannotConvert {
                    from: expr.ty.to_string(),
                    to: target.to_string(),
                },
                &expr.span,
            ),
        }
    }

    fn into_value(&self, bound: Bound, span: &Span) -> Result<TypedExpr, BindError> {
        match bound {
            Bound::Value(v) => Ok(v),
            Bound::Type(t) => error(BindErrorKind::NotAValue(t.to_string()), span),
            Bound::Namespace(path) => error(BindErrorKind::NotAValue(path.join(".")), span),
            Bound::MethodGroup(group) => error(
                BindErrorKind::Unsupported(format!("converting method group '{}' to a value", group.name)),
                span,
            ),
        }
    }

    fn bind_node(&mut self, node: &SyntaxNode) -> Result<Bound, BindError> {
        ensure_sufficient_stack(|| self.bind_node_inner(node))
    }

    fn bind_node_inner(&mut self, node: &SyntaxNode) -> Result<Bound, BindError> {
        let span = &node.span;
        let expr = match &node.kind {
            SyntaxKind::Literal(literal) => self.literal(literal, span)?,
            SyntaxKind::Identifier {
                name,
                type_arguments,
            } => return self.identifier(name, type_arguments, span),
            SyntaxKind::MemberAccess { .. } | SyntaxKind::Index { .. } | SyntaxKind::Call { .. } => {
                return self.postfix_chain(node);
            }
            SyntaxKind::Unary {
                op,
                operand,
                checked,
            } => self.unary(*op, operand, *checked, span)?,
            SyntaxKind::Binary {
                op,
                left,
                right,
                checked,
            } => self.binary(*op, left, right, *checked, span)?,
            SyntaxKind::Conditional {
                condition,
                when_true,
                when_false,
            } => self.conditional(condition, when_true, when_false, span)?,
            SyntaxKind::Cast {
                ty,
                operand,
                checked,
            } => self.cast(ty, operand, *checked, span)?,
            SyntaxKind::Is { operand, ty } => {
                let operand = self.bind_value(operand)?;
                let target = self.resolve_type_ref(ty, span)?;
                TypedExpr::new(
                    Type::BOOL,
                    span.clone(),
                    TypedKind::TypeIs {
                        operand: Box::new(operand),
                        target,
                    },
                )
            }
            SyntaxKind::As { operand, ty } => {
                let operand = self.bind_value(operand)?;
                let target = self.resolve_type_ref(ty, span)?;
                if !target.can_be_null() {
                    return error(BindErrorKind::InvalidAs(target.to_string()), span);
                }
                TypedExpr::new(
                    target,
                    span.clone(),
                    TypedKind::TypeAs {
                        operand: Box::new(operand),
                    },
                )
            }
            SyntaxKind::TypeOf(ty) => {
                let t = self.resolve_type_ref(ty, span)?;
                TypedExpr::constant(Value::Type(t), Type::MetaType, span.clone())
            }
            SyntaxKind::Default(ty) => {
                let t = self.resolve_type_ref(ty, span)?;
                TypedExpr::constant(Value::default_for(&t), t, span.clone())
            }
            SyntaxKind::OverflowScope { operand, .. } => return self.bind_node(operand),
            SyntaxKind::Lambda { parameters, body } => self.untargeted_lambda(parameters, body, span)?,
            SyntaxKind::New {
                ty,
                arguments,
                initializer,
            } => self.new_object(ty, arguments, initializer.as_ref(), span)?,
            SyntaxKind::NewArrayBounds { element, bounds } => {
                let [length] = bounds.as_slice() else {
                    return error(BindErrorKind::Unsupported("multi-dimensional arrays".into()), span);
                };
                let element = self.resolve_type_ref(element, span)?;
                let length = self.bind_value(length)?;
                let length = self.array_index_operand(length)?;
                TypedExpr::new(
                    Type::array(element.clone()),
                    span.clone(),
                    TypedKind::NewArrayBounds {
                        element,
                        length: Box::new(length),
                    },
                )
            }
            SyntaxKind::NewArrayInit { element, elements } => {
                self.new_array_init(element.as_ref(), elements, span)?
            }
        };
        Ok(Bound::Value(expr))
    }

    // ========================================================================
    // Leaves
    // ========================================================================

    fn literal(&self, literal: &Literal, span: &Span) -> Result<TypedExpr, BindError> {
        Ok(match literal {
            Literal::Number(text) => {
                let number = parse_number(text, false)
                    .map_err(|e| BindError::new(BindErrorKind::InvalidLiteral(e), span.clone()))?;
                number_constant(number, span)
            }
            Literal::String(s) => TypedExpr::constant(Value::string(s.as_str()), Type::String, span.clone()),
            Literal::Char(c) => TypedExpr::constant(Value::char(*c), Type::CHAR, span.clone()),
        })
    }

    fn identifier(&mut self, name: &str, type_arguments: &[TypeRef], span: &Span) -> Result<Bound, BindError> {
        let type_arguments = self.resolve_type_refs(type_arguments, span)?;
        if type_arguments.is_empty() {
            if let Some(entry) = self.scopes.iter().rev().find(|e| e.name == name) {
                return Ok(Bound::Value(TypedExpr::new(
                    entry.ty.clone(),
                    span.clone(),
                    TypedKind::Local(entry.slot),
                )));
            }
            if let Some(i) = self.parameters.iter().position(|(n, _)| n == name) {
                return Ok(Bound::Value(TypedExpr::new(
                    self.parameters[i].1.clone(),
                    span.clone(),
                    TypedKind::Parameter(i),
                )));
            }
        }
        if let Some(t) = self.resolve_path(&[name], &type_arguments) {
            return Ok(Bound::Type(t));
        }
        if type_arguments.is_empty() && self.is_namespace(&[name]) {
            return Ok(Bound::Namespace(vec![name.to_string()]));
        }
        if let Some(context) = self.context_parameter() {
            if member_chain(&context.ty).iter().any(|t| t.has_member(name)) {
                return self.member_access(Bound::Value(context), name, type_arguments, span);
            }
        }
        let constant = match name {
            "true" => TypedExpr::constant(Value::Bool(true), Type::BOOL, span.clone()),
            "false" => TypedExpr::constant(Value::Bool(false), Type::BOOL, span.clone()),
            "null" => TypedExpr::constant(Value::Null, Type::Null, span.clone()),
            _ => return error(BindErrorKind::UnknownName(name.to_string()), span),
        };
        Ok(Bound::Value(constant))
    }

    /// The parameter whose members are reachable as bare names.
    fn context_parameter(&self) -> Option<TypedExpr> {
        let name = self.options.context_parameter.as_deref()?;
        let i = self.parameters.iter().position(|(n, _)| n == name)?;
        Some(TypedExpr::new(
            self.parameters[i].1.clone(),
            Span::default(),
            TypedKind::Parameter(i),
        ))
    }

    // ========================================================================
    // Member access, calls, indexing and null-conditional chains
    // ========================================================================

    /// Binds a chain of `.m`, `?.m`, `[i]`, `?[i]` and `(args)`. Each `?`
    /// stores its receiver in a fresh slot; a `null` there skips the rest of
    /// the chain.
    fn postfix_chain(&mut self, node: &SyntaxNode) -> Result<Bound, BindError> {
        let mut ops = Vec::new();
        let mut current = node;
        loop {
            let op = match &current.kind {
                SyntaxKind::MemberAccess {
                    target,
                    member,
                    type_arguments,
                    null_conditional,
                } => (
                    target,
                    PostfixOp::Member {
                        name: member.as_str(),
                        type_arguments: type_arguments.as_slice(),
                        null_conditional: *null_conditional,
                    },
                ),
                SyntaxKind::Index {
                    target,
                    arguments,
                    null_conditional,
                } => (
                    target,
                    PostfixOp::Index {
                        arguments,
                        null_conditional: *null_conditional,
                    },
                ),
                SyntaxKind::Call { target, arguments } => (target, PostfixOp::Call { arguments }),
                _ => break,
            };
            ops.push((op.1, &current.span));
            current = &**op.0;
        }
        ops.reverse();

        let mut state = self.bind_node(current)?;
        let mut guards: Vec<(TypedExpr, usize)> = Vec::new();
        for (op, span) in ops {
            state = match op {
                PostfixOp::Member {
                    name,
                    type_arguments,
                    null_conditional,
                } => {
                    if null_conditional {
                        state = Bound::Value(self.guard(state, &mut guards, span)?);
                    }
                    let type_arguments = self.resolve_type_refs(type_arguments, span)?;
                    self.member_access(state, name, type_arguments, span)?
                }
                PostfixOp::Index {
                    arguments,
                    null_conditional,
                } => {
                    let target = if null_conditional {
                        self.guard(state, &mut guards, span)?
                    } else {
                        self.into_value(state, span)?
                    };
                    Bound::Value(self.index(target, arguments, span)?)
                }
                PostfixOp::Call { arguments } => Bound::Value(self.call(state, arguments, span)?),
            };
        }

        if guards.is_empty() {
            return Ok(state);
        }
        let mut body = self.into_value(state, &node.span)?;
        for (receiver, slot) in guards.into_iter().rev() {
            body = TypedExpr::new(
                body.ty.make_nullable(),
                node.span.clone(),
                TypedKind::NullGuard {
                    receiver: Box::new(receiver),
                    slot,
                    body: Box::new(body),
                },
            );
        }
        Ok(Bound::Value(body))
    }

    fn guard(
        &mut self,
        state: Bound,
        guards: &mut Vec<(TypedExpr, usize)>,
        span: &Span,
    ) -> Result<TypedExpr, BindError> {
        let receiver = self.into_value(state, span)?;
        if !receiver.ty.can_be_null() {
            return error(
                BindErrorKind::NullConditionalOnValueType(receiver.ty.to_string()),
                span,
            );
        }
        let slot = self.new_temporary();
        let ty = receiver.ty.non_nullable().clone();
        guards.push((receiver, slot));
        Ok(TypedExpr::new(ty, span.clone(), TypedKind::Local(slot)))
    }

    fn member_access(
        &mut self,
        state: Bound,
        member: &str,
        type_arguments: Vec<Type>,
        span: &Span,
    ) -> Result<Bound, BindError> {
        match state {
            Bound::Namespace(mut path) => {
                path.push(member.to_string());
                let refs: Vec<&str> = path.iter().map(String::as_str).collect();
                if let Some(t) = self.resolve_path(&refs, &type_arguments) {
                    return Ok(Bound::Type(t));
                }
                if type_arguments.is_empty() && self.is_namespace(&refs) {
                    return Ok(Bound::Namespace(path));
                }
                error(BindErrorKind::UnknownType(path.join(".")), span)
            }
            Bound::Type(t) => self.static_member(&t, member, type_arguments, span),
            Bound::Value(v) => self.instance_member(v, member, type_arguments, span),
            Bound::MethodGroup(group) => error(
                BindErrorKind::Unsupported(format!("member access on method group '{}'", group.name)),
                span,
            ),
        }
    }

    fn static_member(
        &mut self,
        ty: &Type,
        member: &str,
        type_arguments: Vec<Type>,
        span: &Span,
    ) -> Result<Bound, BindError> {
        if let Type::Enum(info) = ty {
            if let Some(raw) = info.value_of(member) {
                return Ok(Bound::Value(TypedExpr::constant(
                    Value::Enum(info.clone(), raw),
                    ty.clone(),
                    span.clone(),
                )));
            }
        }
        if let Type::Class(info) = ty {
            let mut path: Vec<&str> = info.full_name().split('.').collect();
            path.push(member);
            if let Some(nested) = self.resolve_path(&path, &type_arguments) {
                return Ok(Bound::Type(nested));
            }
        }

        let chain = member_chain(ty);
        if let Some(property) = chain.iter().find_map(|t| t.find_property(member)) {
            if !property.is_static {
                return error(
                    BindErrorKind::StaticMismatch {
                        member: member.to_string(),
                        access: "a type name; an object reference is required",
                    },
                    span,
                );
            }
            return Ok(Bound::Value(TypedExpr::new(
                property.ty.clone(),
                span.clone(),
                TypedKind::Field {
                    target: None,
                    property: property.clone(),
                },
            )));
        }
        let levels = method_levels(&chain, member, true);
        if !levels.is_empty() {
            return Ok(Bound::MethodGroup(MethodGroup {
                name: member.to_string(),
                receiver: None,
                levels,
                type_arguments,
            }));
        }
        if !method_levels(&chain, member, false).is_empty() {
            return error(
                BindErrorKind::StaticMismatch {
                    member: member.to_string(),
                    access: "a type name; an object reference is required",
                },
                span,
            );
        }
        error(
            BindErrorKind::UnknownMember {
                ty: ty.to_string(),
                member: member.to_string(),
                available: member_names(&chain, true),
            },
            span,
        )
    }

    fn instance_member(
        &mut self,
        target: TypedExpr,
        member: &str,
        type_arguments: Vec<Type>,
        span: &Span,
    ) -> Result<Bound, BindError> {
        if matches!(target.ty, Type::Null | Type::Void) {
            return error(
                BindErrorKind::UnknownMember {
                    ty: target.ty.to_string(),
                    member: member.to_string(),
                    available: Vec::new(),
                },
                span,
            );
        }
        if matches!(target.ty, Type::Array(_)) && member == "Length" {
            return Ok(Bound::Value(TypedExpr::new(
                Type::INT32,
                span.clone(),
                TypedKind::ArrayLength(Box::new(target)),
            )));
        }

        let chain = member_chain(&target.ty);
        if let Some(property) = chain.iter().find_map(|t| t.find_property(member)) {
            if property.is_static {
                return error(
                    BindErrorKind::StaticMismatch {
                        member: member.to_string(),
                        access: "an instance reference; qualify it with a type name instead",
                    },
                    span,
                );
            }
            return Ok(Bound::Value(TypedExpr::new(
                property.ty.clone(),
                span.clone(),
                TypedKind::Field {
                    target: Some(Box::new(target)),
                    property: property.clone(),
                },
            )));
        }
        let levels = method_levels(&chain, member, false);
        if !levels.is_empty() {
            return Ok(Bound::MethodGroup(MethodGroup {
                name: member.to_string(),
                receiver: Some(target),
                levels,
                type_arguments,
            }));
        }
        if !method_levels(&chain, member, true).is_empty() {
            return error(
                BindErrorKind::StaticMismatch {
                    member: member.to_string(),
                    access: "an instance reference; qualify it with a type name instead",
                },
                span,
            );
        }
        error(
            BindErrorKind::UnknownMember {
                ty: target.ty.to_string(),
                member: member.to_string(),
                available: member_names(&chain, false),
            },
            span,
        )
    }

    fn call(&mut self, state: Bound, arguments: &ArgumentList, span: &Span) -> Result<TypedExpr, BindError> {
        match state {
            Bound::MethodGroup(group) => {
                let args = self.prepare_arguments(arguments)?;
                let levels: Vec<&[Arc<Method>]> = group.levels.iter().map(Vec::as_slice).collect();
                let resolution = self.resolve_in_levels(&levels, &args, &group.type_arguments, &group.name, span)?;
                Ok(TypedExpr::new(
                    resolution.method.return_type.clone(),
                    span.clone(),
                    TypedKind::Call {
                        target: group.receiver.map(Box::new),
                        method: resolution.method,
                        arguments: resolution.arguments,
                    },
                ))
            }
            Bound::Value(delegate) => match delegate.ty.clone() {
                Type::Function(f) => self.invoke_delegate(delegate, &f, arguments, span),
                other => error(BindErrorKind::NotInvocable(other.to_string()), span),
            },
            Bound::Type(t) => error(BindErrorKind::NotInvocable(t.to_string()), span),
            Bound::Namespace(path) => error(BindErrorKind::NotInvocable(path.join(".")), span),
        }
    }

    fn invoke_delegate(
        &mut self,
        delegate: TypedExpr,
        signature: &FunctionType,
        arguments: &ArgumentList,
        span: &Span,
    ) -> Result<TypedExpr, BindError> {
        if !arguments.named.is_empty() {
            return error(BindErrorKind::Unsupported("named arguments to a delegate".into()), span);
        }
        if arguments.positional.len() != signature.parameters.len() {
            return error(
                BindErrorKind::NoOverload {
                    name: delegate.ty.to_string(),
                    arguments: format!("{} arguments", arguments.positional.len()),
                },
                span,
            );
        }
        let arguments = arguments
            .positional
            .iter()
            .zip(&signature.parameters)
            .map(|(a, p)| self.bind_with_target(a, p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypedExpr::new(
            signature.return_type.clone(),
            span.clone(),
            TypedKind::Invoke {
                delegate: Box::new(delegate),
                arguments,
            },
        ))
    }

    fn index(&mut self, target: TypedExpr, arguments: &ArgumentList, span: &Span) -> Result<TypedExpr, BindError> {
        if let Type::Array(element) = &target.ty {
            let element = (**element).clone();
            let [index] = arguments.positional.as_slice() else {
                return error(BindErrorKind::Unsupported("multi-dimensional arrays".into()), span);
            };
            if !arguments.named.is_empty() {
                return error(BindErrorKind::Unsupported("named array index".into()), span);
            }
            let index = self.bind_value(index)?;
            let index = self.array_index_operand(index)?;
            return Ok(TypedExpr::new(
                element,
                span.clone(),
                TypedKind::ArrayIndex {
                    array: Box::new(target),
                    index: Box::new(index),
                },
            ));
        }

        let chain = member_chain(&target.ty);
        let mut indexers: Vec<(MethodId, Indexer)> = Vec::new();
        let mut levels: Vec<Vec<Arc<Method>>> = Vec::new();
        for table in &chain {
            let level: Vec<Arc<Method>> = table
                .indexers
                .iter()
                .map(|ix| {
                    let method = Arc::new(Method::instance(
                        "this[]",
                        ix.parameters.clone(),
                        ix.ty.clone(),
                        ix.getter.clone(),
                    ));
                    indexers.push((method.id, ix.clone()));
                    method
                })
                .collect();
            if !level.is_empty() {
                levels.push(level);
            }
        }
        if levels.is_empty() {
            return error(BindErrorKind::NotIndexable(target.ty.to_string()), span);
        }
        let args = self.prepare_arguments(arguments)?;
        let levels: Vec<&[Arc<Method>]> = levels.iter().map(Vec::as_slice).collect();
        let resolution = self.resolve_in_levels(&levels, &args, &[], "this[]", span)?;
        let Some((_, indexer)) = indexers.into_iter().find(|(id, _)| *id == resolution.method.id) else {
            return error(BindErrorKind::NotIndexable(target.ty.to_string()), span);
        };
        let arguments = fill_defaults(&resolution.method, resolution.arguments, span);
        Ok(TypedExpr::new(
            indexer.ty.clone(),
            span.clone(),
            TypedKind::Indexer {
                target: Box::new(target),
                indexer,
                arguments,
            },
        ))
    }

    /// Array indices and lengths are `int`, `uint`, `long` or `ulong`.
    fn array_index_operand(&self, index: TypedExpr) -> Result<TypedExpr, BindError> {
        for target in [Type::INT32, Type::UINT32, Type::INT64, Type::UINT64] {
            if let Some(kind) = conversions::implicit(&index, &target) {
                return Ok(conversions::apply(index, &target, kind, false));
            }
        }
        error(
            BindErrorKind::CannotConvert {
                from: index.ty.to_string(),
                to: "int".to_string(),
            },
            &index.span,
        )
    }

    pub(super) fn prepare_arguments<'n>(&mut self, list: &'n ArgumentList) -> Result<Vec<Argument<'n>>, BindError> {
        let positional = list.positional.iter().map(|a| (None, a, a.span.clone()));
        let named = list
            .named
            .iter()
            .map(|a| (Some(a.name.as_str()), &a.value, a.span.clone()));
        positional
            .chain(named)
            .map(|(name, node, span)| {
                let value = match node.kind {
                    SyntaxKind::Lambda { .. } => ArgumentValue::Lambda(node),
                    _ => ArgumentValue::Bound(self.bind_value(node)?),
                };
                Ok(Argument { name, value, span })
            })
            .collect()
    }

    // ========================================================================
    // Lambdas
    // ========================================================================

    /// Binds a lambda against a delegate signature.
    pub(super) fn bind_lambda(&mut self, node: &SyntaxNode, signature: &FunctionType) -> Result<TypedExpr, BindError> {
        let SyntaxKind::Lambda { parameters, body } = &node.kind else {
            return error(BindErrorKind::LambdaWithoutTarget, &node.span);
        };
        if parameters.len() != signature.parameters.len() {
            return error(
                BindErrorKind::LambdaArity {
                    delegate: Type::Function(Arc::new(signature.clone())).to_string(),
                    found: parameters.len(),
                },
                &node.span,
            );
        }
        let (slots, body) = self.lambda_parts(parameters, &signature.parameters, Some(&signature.return_type), body)?;
        Ok(TypedExpr::new(
            Type::Function(Arc::new(signature.clone())),
            node.span.clone(),
            TypedKind::Lambda {
                parameters: slots,
                body: Box::new(body),
            },
        ))
    }

    /// The type of a lambda's body given its parameter types; used while
    /// inferring method type arguments.
    pub(super) fn lambda_body_type(&mut self, node: &SyntaxNode, parameter_types: &[Type]) -> Result<Type, BindError> {
        let SyntaxKind::Lambda { parameters, body } = &node.kind else {
            return error(BindErrorKind::LambdaWithoutTarget, &node.span);
        };
        if parameters.len() != parameter_types.len() {
            return error(BindErrorKind::LambdaWithoutTarget, &node.span);
        }
        let (_, body) = self.lambda_parts(parameters, parameter_types, None, body)?;
        Ok(body.ty.clone())
    }

    fn untargeted_lambda(
        &mut self,
        parameters: &[LambdaParameter],
        body: &SyntaxNode,
        span: &Span,
    ) -> Result<TypedExpr, BindError> {
        let types = parameters
            .iter()
            .map(|p| match &p.ty {
                Some(t) => self.resolve_type_ref(t, &p.span),
                None => error(BindErrorKind::LambdaWithoutTarget, span),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let (slots, body) = self.lambda_parts(parameters, &types, None, body)?;
        Ok(TypedExpr::new(
            Type::function(types, body.ty.clone()),
            span.clone(),
            TypedKind::Lambda {
                parameters: slots,
                body: Box::new(body),
            },
        ))
    }

    fn lambda_parts(
        &mut self,
        parameters: &[LambdaParameter],
        types: &[Type],
        return_type: Option<&Type>,
        body: &SyntaxNode,
    ) -> Result<(Vec<usize>, TypedExpr), BindError> {
        for (i, (p, ty)) in parameters.iter().zip(types).enumerate() {
            if let Some(declared) = &p.ty {
                let declared = self.resolve_type_ref(declared, &p.span)?;
                if declared != *ty {
                    return error(
                        BindErrorKind::CannotConvert {
                            from: declared.to_string(),
                            to: ty.to_string(),
                        },
                        &p.span,
                    );
                }
            }
            let shadows = parameters[..i].iter().any(|q| q.name == p.name)
                || self.scopes.iter().any(|e| e.name == p.name)
                || self.parameters.iter().any(|(n, _)| *n == p.name);
            if shadows {
                return error(BindErrorKind::DuplicateParameter(p.name.clone()), &p.span);
            }
        }

        let saved = self.scopes.len();
        let mut slots = Vec::with_capacity(parameters.len());
        for (p, ty) in parameters.iter().zip(types) {
            let slot = self.new_temporary();
            slots.push(slot);
            self.scopes.push(ScopeEntry {
                name: p.name.clone(),
                slot,
                ty: ty.clone(),
            });
        }
        let result = match return_type {
            Some(t) if t.is_void() => self.bind_expr(body),
            Some(t) => self.bind_with_target(body, t),
            None => self.bind_value(body),
        };
        self.scopes.truncate(saved);
        Ok((slots, result?))
    }

    // ========================================================================
    // Object and array creation
    // ========================================================================

    fn new_object(
        &mut self,
        ty: &TypeRef,
        arguments: &ArgumentList,
        initializer: Option<&Initializer>,
        span: &Span,
    ) -> Result<TypedExpr, BindError> {
        let ty = self.resolve_type_ref(ty, span)?;
        let table = members_of(&ty);
        let new = if table.constructors.is_empty() && arguments.is_empty() && ty.is_value_type() {
            TypedExpr::constant(Value::default_for(&ty), ty.clone(), span.clone())
        } else if table.constructors.is_empty() {
            return error(BindErrorKind::NoConstructor(ty.to_string()), span);
        } else {
            let args = self.prepare_arguments(arguments)?;
            let levels = [table.constructors.as_slice()];
            let resolution = self.resolve_in_levels(&levels, &args, &[], &ty.to_string(), span)?;
            TypedExpr::new(
                ty.clone(),
                span.clone(),
                TypedKind::New {
                    constructor: resolution.method,
                    arguments: resolution.arguments,
                },
            )
        };

        Ok(match initializer {
            None => new,
            Some(Initializer::Collection(elements)) => {
                let elements = self.element_inits(&ty, elements)?;
                TypedExpr::new(
                    ty,
                    span.clone(),
                    TypedKind::ListInit {
                        new: Box::new(new),
                        elements,
                    },
                )
            }
            Some(Initializer::Object(members)) => {
                let bindings = self.member_bindings(&ty, members)?;
                TypedExpr::new(
                    ty,
                    span.clone(),
                    TypedKind::MemberInit {
                        new: Box::new(new),
                        bindings,
                    },
                )
            }
        })
    }

    /// Resolves `Add` for each element of a collection initializer.
    fn element_inits(&mut self, ty: &Type, elements: &[ElementInitializer]) -> Result<Vec<ElementInit>, BindError> {
        let chain = member_chain(ty);
        let levels = method_levels(&chain, "Add", false);
        let levels: Vec<&[Arc<Method>]> = levels.iter().map(Vec::as_slice).collect();
        elements
            .iter()
            .map(|element| {
                if levels.is_empty() {
                    return error(
                        BindErrorKind::UnknownMember {
                            ty: ty.to_string(),
                            member: "Add".to_string(),
                            available: member_names(&chain, false),
                        },
                        &element.span,
                    );
                }
                let list = ArgumentList::positional(element.arguments.clone());
                let args = self.prepare_arguments(&list)?;
                let resolution = self.resolve_in_levels(&levels, &args, &[], "Add", &element.span)?;
                Ok(ElementInit {
                    arguments: fill_defaults(&resolution.method, resolution.arguments, &element.span),
                    method: resolution.method,
                })
            })
            .collect()
    }

    fn member_bindings(&mut self, ty: &Type, members: &[MemberInitializer]) -> Result<Vec<MemberBinding>, BindError> {
        let chain = member_chain(ty);
        members
            .iter()
            .map(|m| {
                let property: Property = match chain.iter().find_map(|t| t.find_property(&m.member)) {
                    Some(p) if !p.is_static => p.clone(),
                    _ => {
                        return error(
                            BindErrorKind::UnknownMember {
                                ty: ty.to_string(),
                                member: m.member.clone(),
                                available: member_names(&chain, false),
                            },
                            &m.span,
                        );
                    }
                };
                Ok(match &m.value {
                    MemberValue::Expression(value) => {
                        if property.setter.is_none() {
                            return error(BindErrorKind::ReadOnlyMember(m.member.clone()), &m.span);
                        }
                        let value = self.bind_with_target(value, &property.ty)?;
                        MemberBinding::Assign { property, value }
                    }
                    MemberValue::Initializer(Initializer::Collection(elements)) => {
                        let elements = self.element_inits(&property.ty, elements)?;
                        MemberBinding::MemberList { property, elements }
                    }
                    MemberValue::Initializer(Initializer::Object(nested)) => {
                        let bindings = self.member_bindings(&property.ty, nested)?;
                        MemberBinding::MemberMember { property, bindings }
                    }
                })
            })
            .collect()
    }

    fn new_array_init(
        &mut self,
        element: Option<&TypeRef>,
        elements: &[SyntaxNode],
        span: &Span,
    ) -> Result<TypedExpr, BindError> {
        let (element, elements) = match element {
            Some(t) => {
                let element = self.resolve_type_ref(t, span)?;
                let elements = elements
                    .iter()
                    .map(|e| self.bind_with_target(e, &element))
                    .collect::<Result<Vec<_>, _>>()?;
                (element, elements)
            }
            None => {
                let bound = elements
                    .iter()
                    .map(|e| self.bind_value(e))
                    .collect::<Result<Vec<_>, _>>()?;
                let Some(element) = best_common_type(&bound) else {
                    return error(
                        BindErrorKind::Unsupported("an implicitly-typed array without a best element type".into()),
                        span,
                    );
                };
                let elements = bound
                    .into_iter()
                    .map(|e| self.convert_implicit(e, &element))
                    .collect::<Result<Vec<_>, _>>()?;
                (element, elements)
            }
        };
        Ok(TypedExpr::new(
            Type::array(element.clone()),
            span.clone(),
            TypedKind::NewArrayInit { element, elements },
        ))
    }

    fn cast(&mut self, ty: &TypeRef, operand: &SyntaxNode, checked: bool, span: &Span) -> Result<TypedExpr, BindError> {
        let target = self.resolve_type_ref(ty, span)?;
        if let (SyntaxKind::Lambda { .. }, Type::Function(f)) = (&operand.kind, &target) {
            return self.bind_lambda(operand, f);
        }
        let expr = self.bind_value(operand)?;
        match conversions::explicit(&expr, &target) {
            Some(ConversionKind::Identity) if expr.ty == target => Ok(expr),
            Some(kind) => {
                let mut converted = conversions::apply(expr, &target, kind, checked);
                converted.span = span.clone();
                Ok(converted)
            }
            None => error(
                BindErrorKind::InvalidCast {
                    from: expr.ty.to_string(),
                    to: target.to_string(),
                },
                span,
            ),
        }
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn resolve_path(&self, path: &[&str], type_arguments: &[Type]) -> Option<Type> {
        self.resolver
            .resolve_type(path, type_arguments)
            .or_else(|| SYSTEM_CATALOG.resolve_type(path, type_arguments))
    }

    fn is_namespace(&self, path: &[&str]) -> bool {
        self.resolver.is_namespace(path) || SYSTEM_CATALOG.is_namespace(path)
    }

    fn resolve_type_refs(&self, refs: &[TypeRef], span: &Span) -> Result<Vec<Type>, BindError> {
        refs.iter().map(|r| self.resolve_type_ref(r, span)).collect()
    }

    pub(super) fn resolve_type_ref(&self, type_ref: &TypeRef, span: &Span) -> Result<Type, BindError> {
        match type_ref {
            TypeRef::Named {
                path,
                type_arguments,
            } => {
                let arguments = self.resolve_type_refs(type_arguments, span)?;
                let refs: Vec<&str> = path.iter().map(String::as_str).collect();
                match self.resolve_path(&refs, &arguments) {
                    Some(t) => Ok(t),
                    None => error(BindErrorKind::UnknownType(describe_type_ref(type_ref)), span),
                }
            }
            TypeRef::Nullable(inner) => {
                let inner = self.resolve_type_ref(inner, span)?;
                Ok(inner.make_nullable())
            }
            TypeRef::Array { element, rank } => {
                if *rank != 1 {
                    return error(BindErrorKind::Unsupported("multi-dimensional arrays".into()), span);
                }
                Ok(Type::array(self.resolve_type_ref(element, span)?))
            }
        }
    }
}

fn number_constant(number: NumberLiteral, span: &Span) -> TypedExpr {
    let (value, ty) = match number {
        NumberLiteral::Int32(v) => (Value::Int32(v), Type::INT32),
        NumberLiteral::UInt32(v) => (Value::UInt32(v), Type::UINT32),
        NumberLiteral::Int64(v) => (Value::Int64(v), Type::INT64),
        NumberLiteral::UInt64(v) => (Value::UInt64(v), Type::UINT64),
        NumberLiteral::Single(v) => (Value::Single(v), Type::SINGLE),
        NumberLiteral::Double(v) => (Value::Double(v), Type::DOUBLE),
        NumberLiteral::Decimal(d) => (Value::Decimal(d), Type::DECIMAL),
    };
    TypedExpr::constant(value, ty, span.clone())
}

pub(super) fn negated_literal(text: &str, span: &Span) -> Result<TypedExpr, BindError> {
    parse_number(text, true)
        .map(|n| number_constant(n, span))
        .map_err(|e| BindError::new(BindErrorKind::InvalidLiteral(e), span.clone()))
}

/// Methods named `name` per level of `chain`, keeping non-empty levels.
fn method_levels(chain: &[Arc<MemberTable>], name: &str, statics: bool) -> Vec<Vec<Arc<Method>>> {
    chain
        .iter()
        .map(|table| {
            table
                .methods_named(name)
                .filter(|m| m.is_static == statics)
                .cloned()
                .collect::<Vec<_>>()
        })
        .filter(|level| !level.is_empty())
        .collect()
}

fn member_names(chain: &[Arc<MemberTable>], statics: bool) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for table in chain {
        let properties = table.fields.iter().chain(&table.properties).filter(|p| p.is_static == statics);
        let methods = table.methods.iter().filter(|m| m.is_static == statics);
        for name in properties.map(|p| &p.name).chain(methods.map(|m| &m.name)) {
            if !names.iter().any(|n| n == name.as_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    names
}

/// Replaces omitted optional arguments with their default constants.
pub(super) fn fill_defaults(method: &Method, arguments: Vec<Option<TypedExpr>>, span: &Span) -> Vec<TypedExpr> {
    arguments
        .into_iter()
        .zip(&method.parameters)
        .map(|(arg, p)| {
            arg.unwrap_or_else(|| {
                TypedExpr::constant(p.default.clone().unwrap_or(Value::Null), p.ty.clone(), span.clone())
            })
        })
        .collect()
}

/// The element type every expression converts to, as for `new[] { ... }`
/// and the branches of `?:`.
pub(super) fn best_common_type(exprs: &[TypedExpr]) -> Option<Type> {
    let mut candidates: Vec<&Type> = Vec::new();
    for e in exprs {
        if !matches!(e.ty, Type::Null) && !candidates.contains(&&e.ty) {
            candidates.push(&e.ty);
        }
    }
    candidates
        .into_iter()
        .find(|c| exprs.iter().all(|e| conversions::implicit(e, c).is_some()))
        .cloned()
}

fn describe_type_ref(type_ref: &TypeRef) -> String {
    match type_ref {
        TypeRef::Named {
            path,
            type_arguments,
        } => {
            let mut s = path.join(".");
            if !type_arguments.is_empty() {
                let args: Vec<String> = type_arguments.iter().map(describe_type_ref).collect();
                s.push('<');
                s.push_str(&args.join(", "));
                s.push('>');
            }
            s
        }
        TypeRef::Nullable(inner) => format!("{}?", describe_type_ref(inner)),
        TypeRef::Array { element, rank } => {
            format!("{}[{}]", describe_type_ref(element), ",".repeat(*rank as usize - 1))
        }
    }
}

/// `int` for the unary promotion of small integral types.
pub(super) fn unary_promotion(p: PrimitiveType) -> PrimitiveType {
    match p {
        PrimitiveType::SByte
        | PrimitiveType::Byte
        | PrimitiveType::Int16
        | PrimitiveType::UInt16
        | PrimitiveType::Char => PrimitiveType::Int32,
        other => other,
    }
}
