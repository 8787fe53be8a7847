//! Operator binding: numeric promotion, nullable lifting, enum arithmetic
//! and user-defined operators.

use alloc::sync::Arc;

use super::binder::{Argument, ArgumentValue, Binder, negated_literal, unary_promotion};
use super::conversions::{self, ConversionKind};
use super::error::{BindError, BindErrorKind};
use super::typed_expr::{BinaryKind, TypedExpr, TypedKind, UnaryKind};
use crate::stdlib::members_of;
use crate::syntax::{BinaryOp, Span, UnaryOp};
use crate::syntax_tree::{Literal, SyntaxKind, SyntaxNode};
use crate::types::{Method, PrimitiveType, Type};

fn not_applicable(op: BinaryOp, left: &Type, right: &Type, span: &Span) -> BindError {
    BindError::new(
        BindErrorKind::BinaryNotApplicable {
            op: op.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        },
        span.clone(),
    )
}

/// Binary numeric promotion. `None` when the operands cannot be combined
/// (a `decimal` with a floating type, a `ulong` with a signed type).
fn binary_promotion(left: &TypedExpr, right: &TypedExpr, l: PrimitiveType, r: PrimitiveType) -> Option<PrimitiveType> {
    use PrimitiveType::*;
    if l == Bool || r == Bool {
        return None;
    }
    let either = |p| l == p || r == p;
    let other = |p| if l == p { (right, r) } else { (left, l) };
    let fits = |e: &TypedExpr, p: PrimitiveType| conversions::implicit(e, &Type::Primitive(p)).is_some();
    if either(Decimal) {
        let (_, o) = other(Decimal);
        return (!o.is_floating()).then_some(Decimal);
    }
    if either(Double) {
        return Some(Double);
    }
    if either(Single) {
        return Some(Single);
    }
    if either(UInt64) {
        let (e, o) = other(UInt64);
        return (!o.is_signed() || fits(e, UInt64)).then_some(UInt64);
    }
    if either(Int64) {
        return Some(Int64);
    }
    if either(UInt32) {
        let (e, o) = other(UInt32);
        return Some(if o.is_signed() && !fits(e, UInt32) { Int64 } else { UInt32 });
    }
    Some(Int32)
}

/// Wraps `ty` in `Nullable<>` when `lifted`.
fn lift(ty: Type, lifted: bool) -> Type {
    if lifted { ty.make_nullable() } else { ty }
}

impl Binder<'_> {
    pub(super) fn binary(
        &mut self,
        op: BinaryOp,
        left: &SyntaxNode,
        right: &SyntaxNode,
        checked: bool,
        span: &Span,
    ) -> Result<TypedExpr, BindError> {
        if op == BinaryOp::Coalesce {
            return self.coalesce(left, right, span);
        }
        let left = self.bind_value(left)?;
        let right = self.bind_value(right)?;
        if matches!(op, BinaryOp::AndAlso | BinaryOp::OrElse) {
            return self.logical(op, left, right, span);
        }
        self.binary_operator(op, left, right, checked, span)
    }

    fn logical(&mut self, op: BinaryOp, left: TypedExpr, right: TypedExpr, span: &Span) -> Result<TypedExpr, BindError> {
        if conversions::implicit(&left, &Type::BOOL).is_none() || conversions::implicit(&right, &Type::BOOL).is_none() {
            return Err(not_applicable(op, &left.ty, &right.ty, span));
        }
        let left = self.convert_implicit(left, &Type::BOOL)?;
        let right = self.convert_implicit(right, &Type::BOOL)?;
        Ok(binary_node(op, BinaryKind::Logical, left, right, Type::BOOL, false, false, span))
    }

    pub(super) fn binary_operator(
        &mut self,
        op: BinaryOp,
        left: TypedExpr,
        right: TypedExpr,
        checked: bool,
        span: &Span,
    ) -> Result<TypedExpr, BindError> {
        // Comparisons with the `null` literal never reach user operators.
        if op.is_equality() && (left.is_null_literal() || right.is_null_literal()) {
            return self.null_comparison(op, left, right, span);
        }
        if op == BinaryOp::Add && (left.ty.is_string() || right.ty.is_string()) {
            return self.string_concat(left, right, span);
        }
        if let Some(expr) = self.user_binary(op, &left, &right, span)? {
            return Ok(expr);
        }
        if matches!(left.ty.non_nullable(), Type::Enum(_)) || matches!(right.ty.non_nullable(), Type::Enum(_)) {
            return self.enum_binary(op, left, right, checked, span);
        }

        let (lp, rp) = (left.ty.non_nullable().primitive(), right.ty.non_nullable().primitive());
        let lifted = left.ty.is_nullable() || right.ty.is_nullable();
        if let (Some(lp), Some(rp)) = (lp, rp) {
            return self.primitive_binary(op, left, right, lp, rp, lifted, checked, span);
        }

        if op.is_equality() {
            if left.ty.is_string() && right.ty.is_string() {
                return Ok(binary_node(op, BinaryKind::StringEquality, left, right, Type::BOOL, false, false, span));
            }
            let related = left.ty.is_reference_type()
                && right.ty.is_reference_type()
                && (conversions::implicit_type(&left.ty, &right.ty).is_some()
                    || conversions::implicit_type(&right.ty, &left.ty).is_some());
            if related {
                return Ok(binary_node(op, BinaryKind::ReferenceEquality, left, right, Type::BOOL, false, false, span));
            }
        }
        Err(not_applicable(op, &left.ty, &right.ty, span))
    }

    /// `x == null` / `x != null`: true when `x` has no value.
    fn null_comparison(&mut self, op: BinaryOp, left: TypedExpr, right: TypedExpr, span: &Span) -> Result<TypedExpr, BindError> {
        let operand_type = if left.is_null_literal() { &right.ty } else { &left.ty };
        let ty = match operand_type {
            Type::Null => Type::Object,
            t => t.make_nullable(),
        };
        let left = self.convert_implicit(left, &ty)?;
        let right = self.convert_implicit(right, &ty)?;
        Ok(binary_node(op, BinaryKind::ReferenceEquality, left, right, Type::BOOL, false, false, span))
    }

    /// `string + x` and `x + string` call `String.Concat`.
    fn string_concat(&mut self, left: TypedExpr, right: TypedExpr, span: &Span) -> Result<TypedExpr, BindError> {
        let table = members_of(&Type::String);
        let candidates: Vec<Arc<Method>> = table
            .methods_named("Concat")
            .filter(|m| m.parameters.len() == 2)
            .cloned()
            .collect();
        let args = [bound_argument(left), bound_argument(right)];
        let resolution = self.resolve_in_levels(&[candidates.as_slice()], &args, &[], "Concat", span)?;
        Ok(TypedExpr::new(
            Type::String,
            span.clone(),
            TypedKind::Call {
                target: None,
                method: resolution.method,
                arguments: resolution.arguments,
            },
        ))
    }

    /// Looks for `op_*` methods on either operand type, first as declared
    /// and then in lifted form over nullable operands.
    fn user_binary(
        &mut self,
        op: BinaryOp,
        left: &TypedExpr,
        right: &TypedExpr,
        span: &Span,
    ) -> Result<Option<TypedExpr>, BindError> {
        let Some(name) = op.operator_method_name() else {
            return Ok(None);
        };
        let candidates = operator_candidates(name, &[&left.ty, &right.ty], 2);
        if candidates.is_empty() {
            return Ok(None);
        }

        let args = [bound_argument(left.clone()), bound_argument(right.clone())];
        match self.resolve_in_levels(&[candidates.as_slice()], &args, &[], name, span) {
            Ok(resolution) => {
                let mut arguments = resolution.arguments.into_iter().flatten();
                let (Some(l), Some(r)) = (arguments.next(), arguments.next()) else {
                    return Ok(None);
                };
                let ty = resolution.method.return_type.clone();
                return Ok(Some(binary_node(op, BinaryKind::User(resolution.method), l, r, ty, false, false, span)));
            }
            Err(BindError {
                kind: BindErrorKind::NoOverload { .. },
                ..
            }) => {}
            Err(e) => return Err(e),
        }

        if !(left.ty.is_nullable() || right.ty.is_nullable()) {
            return Ok(None);
        }
        let lifted = candidates.iter().find(|m| {
            m.parameters.iter().all(|p| p.ty.is_value_type() && !p.ty.is_nullable())
                && m.return_type.is_value_type()
                && conversions::implicit(left, &m.parameters[0].ty.make_nullable()).is_some()
                && conversions::implicit(right, &m.parameters[1].ty.make_nullable()).is_some()
        });
        let Some(method) = lifted.cloned() else {
            return Ok(None);
        };
        let l = self.convert_implicit(left.clone(), &method.parameters[0].ty.make_nullable())?;
        let r = self.convert_implicit(right.clone(), &method.parameters[1].ty.make_nullable())?;
        let ty = if op.is_comparison() && method.return_type.is_bool() {
            Type::BOOL
        } else {
            method.return_type.make_nullable()
        };
        Ok(Some(binary_node(op, BinaryKind::User(method), l, r, ty, false, true, span)))
    }

    #[allow(clippy::too_many_arguments)]
    fn primitive_binary(
        &mut self,
        op: BinaryOp,
        left: TypedExpr,
        right: TypedExpr,
        lp: PrimitiveType,
        rp: PrimitiveType,
        lifted: bool,
        checked: bool,
        span: &Span,
    ) -> Result<TypedExpr, BindError> {
        let (left_type, right_type, result) = if lp == PrimitiveType::Bool || rp == PrimitiveType::Bool {
            let boolean = lp == PrimitiveType::Bool && rp == PrimitiveType::Bool;
            if !boolean || !(op.is_bitwise() || op.is_equality()) {
                return Err(not_applicable(op, &left.ty, &right.ty, span));
            }
            (PrimitiveType::Bool, PrimitiveType::Bool, PrimitiveType::Bool)
        } else if op.is_shift() {
            let promoted = unary_promotion(lp);
            if !promoted.is_integral() || !unary_promotion(rp).is_integral() {
                return Err(not_applicable(op, &left.ty, &right.ty, span));
            }
            (promoted, PrimitiveType::Int32, promoted)
        } else if op == BinaryOp::Power {
            (PrimitiveType::Double, PrimitiveType::Double, PrimitiveType::Double)
        } else {
            let Some(promoted) = binary_promotion(&left, &right, lp, rp) else {
                return Err(not_applicable(op, &left.ty, &right.ty, span));
            };
            if op.is_bitwise() && !promoted.is_integral() {
                return Err(not_applicable(op, &left.ty, &right.ty, span));
            }
            (promoted, promoted, promoted)
        };

        if op.is_shift() && conversions::implicit(&right, &Type::INT32.make_nullable()).is_none() {
            return Err(not_applicable(op, &left.ty, &right.ty, span));
        }
        if op == BinaryOp::Power
            && (conversions::implicit(&left, &lift(Type::DOUBLE, lifted)).is_none()
                || conversions::implicit(&right, &lift(Type::DOUBLE, lifted)).is_none())
        {
            return Err(not_applicable(op, &left.ty, &right.ty, span));
        }

        let left = self.convert_implicit(left, &lift(Type::Primitive(left_type), lifted))?;
        let right = self.convert_implicit(right, &lift(Type::Primitive(right_type), lifted))?;
        let ty = if op.is_comparison() {
            Type::BOOL
        } else {
            lift(Type::Primitive(result), lifted)
        };
        Ok(binary_node(op, BinaryKind::Primitive(left_type), left, right, ty, checked, lifted, span))
    }

    /// Enum operators compute on the underlying type: comparisons and
    /// bitwise operators between values of one enum, `E + n`, `E - n` and
    /// `E - E`.
    fn enum_binary(
        &mut self,
        op: BinaryOp,
        left: TypedExpr,
        right: TypedExpr,
        checked: bool,
        span: &Span,
    ) -> Result<TypedExpr, BindError> {
        let enum_type = match (left.ty.non_nullable(), right.ty.non_nullable()) {
            (e @ Type::Enum(_), _) | (_, e @ Type::Enum(_)) => e.clone(),
            _ => return Err(not_applicable(op, &left.ty, &right.ty, span)),
        };
        let Some(underlying) = enum_type.arithmetic_primitive() else {
            return Err(not_applicable(op, &left.ty, &right.ty, span));
        };
        let lifted = left.ty.is_nullable() || right.ty.is_nullable();
        let is_enum = |e: &TypedExpr| conversions::implicit(e, &lift(enum_type.clone(), true)).is_some();
        let is_offset = |e: &TypedExpr| {
            !matches!(e.ty.non_nullable(), Type::Enum(_))
                && conversions::implicit(e, &lift(Type::Primitive(underlying), true)).is_some()
        };

        let result = match op {
            _ if op.is_comparison() && is_enum(&left) && is_enum(&right) => Type::BOOL,
            _ if op.is_bitwise() && is_enum(&left) && is_enum(&right) => enum_type.clone(),
            BinaryOp::Add if (is_enum(&left) && is_offset(&right)) || (is_offset(&left) && is_enum(&right)) => {
                enum_type.clone()
            }
            BinaryOp::Subtract if is_enum(&left) && is_offset(&right) => enum_type.clone(),
            BinaryOp::Subtract if is_enum(&left) && is_enum(&right) => Type::Primitive(underlying),
            _ => return Err(not_applicable(op, &left.ty, &right.ty, span)),
        };

        let operand_type = lift(Type::Primitive(underlying), lifted);
        let left = self.to_underlying(left, &enum_type, &operand_type)?;
        let right = self.to_underlying(right, &enum_type, &operand_type)?;
        if op.is_comparison() {
            return Ok(binary_node(op, BinaryKind::Primitive(underlying), left, right, Type::BOOL, false, lifted, span));
        }
        let computed = binary_node(
            op,
            BinaryKind::Primitive(underlying),
            left,
            right,
            operand_type,
            checked,
            lifted,
            span,
        );
        Ok(conversions::convert_to(computed, &lift(result, lifted), false))
    }

    fn to_underlying(&self, expr: TypedExpr, enum_type: &Type, underlying: &Type) -> Result<TypedExpr, BindError> {
        let expr = if matches!(expr.ty.non_nullable(), Type::Enum(_)) {
            expr
        } else if let Some(ConversionKind::Constant(folded)) = conversions::implicit(&expr, enum_type) {
            // The literal `0` standing for an enum value.
            TypedExpr::constant(folded, enum_type.clone(), expr.span.clone())
        } else {
            return self.convert_implicit(expr, underlying);
        };
        Ok(conversions::apply(expr, underlying, ConversionKind::Explicit, false))
    }

    // ========================================================================
    // Unary
    // ========================================================================

    pub(super) fn unary(&mut self, op: UnaryOp, operand: &SyntaxNode, checked: bool, span: &Span) -> Result<TypedExpr, BindError> {
        if let (UnaryOp::Negate, SyntaxKind::Literal(Literal::Number(text))) = (op, &operand.kind) {
            return negated_literal(text, span);
        }
        let operand = self.bind_value(operand)?;
        let unary_error = |operand: &TypedExpr| {
            BindError::new(
                BindErrorKind::UnaryNotApplicable {
                    op: op.to_string(),
                    operand: operand.ty.to_string(),
                },
                span.clone(),
            )
        };

        let candidates = operator_candidates(op.operator_method_name(), &[&operand.ty], 1);
        if !candidates.is_empty() {
            let lifted = operand.ty.is_nullable();
            let inner = operand.ty.non_nullable().clone();
            let method = candidates
                .iter()
                .find(|m| m.parameters[0].ty == operand.ty)
                .or_else(|| candidates.iter().find(|m| lifted && m.parameters[0].ty == inner))
                .or_else(|| candidates.iter().find(|m| conversions::implicit(&operand, &m.parameters[0].ty).is_some()))
                .cloned();
            if let Some(method) = method {
                let lifted = lifted && method.parameters[0].ty == inner;
                let parameter = lift(method.parameters[0].ty.clone(), lifted);
                let ty = lift(method.return_type.clone(), lifted);
                let operand = self.convert_implicit(operand, &parameter)?;
                return Ok(unary_node(op, UnaryKind::User(method), operand, ty, false, lifted, span));
            }
        }

        let lifted = operand.ty.is_nullable();
        if let Type::Enum(_) = operand.ty.non_nullable() {
            let enum_type = operand.ty.non_nullable().clone();
            let Some(underlying) = enum_type.arithmetic_primitive() else {
                return Err(unary_error(&operand));
            };
            if op != UnaryOp::Complement {
                return Err(unary_error(&operand));
            }
            let operand_type = lift(Type::Primitive(underlying), lifted);
            let converted = conversions::apply(operand, &operand_type, ConversionKind::Explicit, false);
            let computed = unary_node(op, UnaryKind::Primitive(underlying), converted, operand_type, false, lifted, span);
            return Ok(conversions::apply(computed, &lift(enum_type, lifted), ConversionKind::Explicit, false));
        }

        let Some(p) = operand.ty.non_nullable().primitive() else {
            return Err(unary_error(&operand));
        };
        let promoted = match op {
            UnaryOp::Not if p == PrimitiveType::Bool => PrimitiveType::Bool,
            UnaryOp::Not => return Err(unary_error(&operand)),
            _ if p == PrimitiveType::Bool => return Err(unary_error(&operand)),
            UnaryOp::Plus => unary_promotion(p),
            UnaryOp::Negate => match unary_promotion(p) {
                PrimitiveType::UInt32 => PrimitiveType::Int64,
                PrimitiveType::UInt64 => return Err(unary_error(&operand)),
                other => other,
            },
            UnaryOp::Complement => match unary_promotion(p) {
                q if q.is_integral() => q,
                _ => return Err(unary_error(&operand)),
            },
        };
        let ty = lift(Type::Primitive(promoted), lifted);
        let operand = self.convert_implicit(operand, &ty)?;
        Ok(unary_node(op, UnaryKind::Primitive(promoted), operand, ty, checked, lifted, span))
    }

    // ========================================================================
    // Conditional and coalescing
    // ========================================================================

    pub(super) fn conditional(
        &mut self,
        condition: &SyntaxNode,
        when_true: &SyntaxNode,
        when_false: &SyntaxNode,
        span: &Span,
    ) -> Result<TypedExpr, BindError> {
        let condition = self.bind_with_target(condition, &Type::BOOL)?;
        let when_true = self.bind_value(when_true)?;
        let when_false = self.bind_value(when_false)?;

        let true_to_false = conversions::implicit(&when_true, &when_false.ty).is_some();
        let false_to_true = conversions::implicit(&when_false, &when_true.ty).is_some();
        let ty = if when_true.ty == when_false.ty || (false_to_true && !true_to_false) {
            when_true.ty.clone()
        } else if true_to_false && !false_to_true {
            when_false.ty.clone()
        } else if when_true.is_null_literal() && when_false.ty.is_value_type() {
            when_false.ty.make_nullable()
        } else if when_false.is_null_literal() && when_true.ty.is_value_type() {
            when_true.ty.make_nullable()
        } else {
            return Err(BindError::new(
                BindErrorKind::NoCommonType(when_true.ty.to_string(), when_false.ty.to_string()),
                span.clone(),
            ));
        };

        let when_true = self.convert_implicit(when_true, &ty)?;
        let when_false = self.convert_implicit(when_false, &ty)?;
        Ok(TypedExpr::new(
            ty,
            span.clone(),
            TypedKind::Conditional {
                condition: Box::new(condition),
                when_true: Box::new(when_true),
                when_false: Box::new(when_false),
            },
        ))
    }

    /// `a ?? b`. With `a: A?` and `b` convertible to `A` the result is `A`;
    /// otherwise `A?` (or `A` for reference types) when `b` converts to it,
    /// otherwise `b`'s type when `a` converts to that.
    pub(super) fn coalesce(&mut self, left: &SyntaxNode, right: &SyntaxNode, span: &Span) -> Result<TypedExpr, BindError> {
        let left = self.bind_value(left)?;
        if !left.ty.can_be_null() && !left.is_null_literal() {
            let right = self.bind_value(right)?;
            return Err(not_applicable(BinaryOp::Coalesce, &left.ty, &right.ty, span));
        }
        let inner = left.ty.non_nullable().clone();
        let right = match (&right.kind, &inner) {
            (SyntaxKind::Lambda { .. }, Type::Function(_)) => self.bind_with_target(right, &inner)?,
            _ => self.bind_value(right)?,
        };

        let (left, right, ty) = if left.ty.is_nullable() && conversions::implicit(&right, &inner).is_some() {
            let right = self.convert_implicit(right, &inner)?;
            (left, right, inner)
        } else if !left.is_null_literal() && conversions::implicit(&right, &left.ty).is_some() {
            let ty = left.ty.clone();
            let right = self.convert_implicit(right, &ty)?;
            (left, right, ty)
        } else if conversions::implicit_type(&inner, &right.ty).is_some() || left.is_null_literal() {
            let ty = right.ty.clone();
            let left = self.convert_implicit(left, &ty.make_nullable())?;
            (left, right, ty)
        } else {
            return Err(not_applicable(BinaryOp::Coalesce, &left.ty, &right.ty, span));
        };
        Ok(TypedExpr::new(
            ty,
            span.clone(),
            TypedKind::Coalesce {
                left: Box::new(left),
                right: Box::new(right),
            },
        ))
    }
}

fn bound_argument<'n>(expr: TypedExpr) -> Argument<'n> {
    Argument {
        name: None,
        span: expr.span.clone(),
        value: ArgumentValue::Bound(expr),
    }
}

/// `op_*` methods named `name` taking `arity` parameters, declared on any
/// of `types` (nullables looked through).
fn operator_candidates(name: &str, types: &[&Type], arity: usize) -> Vec<Arc<Method>> {
    let mut candidates: Vec<Arc<Method>> = Vec::new();
    for ty in types {
        let ty = ty.non_nullable();
        if matches!(ty, Type::Primitive(_) | Type::Enum(_) | Type::Null | Type::Void) {
            continue;
        }
        for method in members_of(ty).operators_named(name) {
            if method.parameters.len() == arity && !candidates.iter().any(|m| m.id == method.id) {
                candidates.push(method.clone());
            }
        }
    }
    candidates
}

#[allow(clippy::too_many_arguments)]
fn binary_node(
    op: BinaryOp,
    kind: BinaryKind,
    left: TypedExpr,
    right: TypedExpr,
    ty: Type,
    checked: bool,
    lifted: bool,
    span: &Span,
) -> TypedExpr {
    TypedExpr::new(
        ty,
        span.clone(),
        TypedKind::Binary {
            op,
            kind,
            left: Box::new(left),
            right: Box::new(right),
            checked,
            lifted,
        },
    )
}

fn unary_node(op: UnaryOp, kind: UnaryKind, operand: TypedExpr, ty: Type, checked: bool, lifted: bool, span: &Span) -> TypedExpr {
    TypedExpr::new(
        ty,
        span.clone(),
        TypedKind::Unary {
            op,
            kind,
            operand: Box::new(operand),
            checked,
            lifted,
        },
    )
}
