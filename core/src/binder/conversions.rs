//! Implicit and explicit conversion rules.
//!
//! Classification works on types, plus the expression itself where C# looks
//! at it: the `null` literal, constant integers that fit a smaller type, and
//! the literal `0` converting to any enum.

use alloc::sync::Arc;

use crate::binder::typed_expr::{TypedExpr, TypedKind};
use crate::stdlib::members_of;
use crate::types::{Method, PrimitiveType, Type};
use crate::values::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConversionKind {
    Identity,
    /// `null` literal to a nullable or reference type.
    NullLiteral,
    /// Constant folded into the target type (`byte b = 1`, `E e = 0`).
    Constant(Value),
    Numeric,
    /// To `Nullable<T>` or between nullables.
    Nullable,
    /// Upcast, boxing or any other representation-preserving conversion.
    Reference,
    /// Numeric conversion that may lose information, enum conversions,
    /// unboxing, downcasts, nullable unwrapping.
    Explicit,
    User(Arc<Method>),
}

/// Standard implicit conversion between types (no user-defined step).
pub(crate) fn implicit_type(from: &Type, to: &Type) -> Option<ConversionKind> {
    if from == to {
        return Some(ConversionKind::Identity);
    }
    match (from, to) {
        (Type::Null, _) => to.can_be_null().then_some(ConversionKind::NullLiteral),
        (Type::Primitive(p), Type::Primitive(q)) => {
            p.implicitly_converts_to(*q).then_some(ConversionKind::Numeric)
        }
        (_, Type::Nullable(inner)) => {
            let source = from.non_nullable();
            match implicit_type(source, inner)? {
                ConversionKind::Identity | ConversionKind::Numeric => Some(ConversionKind::Nullable),
                _ => None,
            }
        }
        (_, Type::Object) => (from.is_value_type() || from.is_reference_type())
            .then_some(ConversionKind::Reference),
        _ => to
            .is_reference_assignable_from(from)
            .then_some(ConversionKind::Reference),
    }
}

/// Implicit conversion of `expr` to `to`, user-defined ones included.
pub(crate) fn implicit(expr: &TypedExpr, to: &Type) -> Option<ConversionKind> {
    if let Some(kind) = implicit_type(&expr.ty, to) {
        return Some(kind);
    }
    if let Some(folded) = constant_conversion(expr, to) {
        return Some(ConversionKind::Constant(folded));
    }
    user_conversion(&expr.ty, to, false).map(ConversionKind::User)
}

/// Explicit conversion (a cast) of `expr` to `to`; every implicit
/// conversion is also explicit.
pub(crate) fn explicit(expr: &TypedExpr, to: &Type) -> Option<ConversionKind> {
    if let Some(kind) = implicit(expr, to) {
        return Some(kind);
    }
    if explicit_type(&expr.ty, to) {
        return Some(ConversionKind::Explicit);
    }
    user_conversion(&expr.ty, to, true).map(ConversionKind::User)
}

fn explicit_type(from: &Type, to: &Type) -> bool {
    let numeric_like = |t: &Type| t.arithmetic_primitive().is_some();
    match (from, to) {
        (Type::Primitive(p), Type::Primitive(q)) => p.explicitly_converts_to(*q),
        // Enum to and from any numeric type or other enum.
        (Type::Enum(_), t) | (t, Type::Enum(_)) if numeric_like(t) => {
            !from.is_bool() && !to.is_bool()
        }
        (Type::Nullable(a), Type::Nullable(b)) => {
            implicit_type(a, b).is_some() || explicit_type(a, b)
        }
        (Type::Nullable(a), b) if b.is_value_type() => implicit_type(a, b).is_some() || explicit_type(a, b),
        (a, Type::Nullable(b)) if a.is_value_type() => explicit_type(a, b),
        // Unboxing.
        (Type::Object, t) if t.is_value_type() => true,
        // Downcasts.
        (Type::Object, t) => t.is_reference_type(),
        (Type::Class(a), Type::Class(b)) => b.derives_from(a),
        (Type::Array(a), Type::Array(b)) => {
            a.is_reference_type() && b.is_reference_type() && explicit_type(a, b)
        }
        _ => false,
    }
}

/// Folds an integral constant into a smaller or unsigned type when its value
/// fits, and the literal `0` into an enum.
fn constant_conversion(expr: &TypedExpr, to: &Type) -> Option<Value> {
    let TypedKind::Constant(value) = &expr.kind else {
        return None;
    };
    let target = to.non_nullable();
    match (value, target) {
        (Value::Int32(0), Type::Enum(info)) => Some(Value::Enum(info.clone(), 0)),
        (Value::Int32(v), Type::Primitive(q)) => match q {
            PrimitiveType::SByte
            | PrimitiveType::Byte
            | PrimitiveType::Int16
            | PrimitiveType::UInt16
            | PrimitiveType::UInt32
            | PrimitiveType::UInt64 => Value::from_integral(*q, *v as i128),
            _ => None,
        },
        (Value::Int64(v), Type::Primitive(PrimitiveType::UInt64)) => {
            Value::from_integral(PrimitiveType::UInt64, *v as i128)
        }
        _ => None,
    }
}

/// Finds `op_Implicit` (or, when `explicit`, also `op_Explicit`) declared on
/// either type whose parameter accepts `from` and whose result converts to
/// `to`. An exact match on both ends wins over one needing a standard
/// conversion.
fn user_conversion(from: &Type, to: &Type, explicit: bool) -> Option<Arc<Method>> {
    let source = from.non_nullable();
    let target = to.non_nullable();
    if matches!(source, Type::Null) {
        return None;
    }
    let mut candidates: Vec<Arc<Method>> = Vec::new();
    for owner in [source, target] {
        if !matches!(owner, Type::Class(_)) {
            continue;
        }
        for method in &members_of(owner).conversions {
            let allowed = method.name == "op_Implicit" || (explicit && method.name == "op_Explicit");
            if allowed && !candidates.iter().any(|m| m.id == method.id) {
                candidates.push(method.clone());
            }
        }
    }
    let accepts = |m: &Arc<Method>| {
        m.parameters.len() == 1
            && implicit_type(from, &m.parameters[0].ty).is_some()
            && implicit_type(&m.return_type, to).is_some()
    };
    let exact = candidates
        .iter()
        .find(|m| accepts(m) && m.parameters[0].ty == *from && m.return_type == *to);
    exact.or_else(|| candidates.iter().find(|m| accepts(m))).cloned()
}

/// Wraps `expr` so that it has type `to`.
pub(crate) fn apply(expr: TypedExpr, to: &Type, kind: ConversionKind, checked: bool) -> TypedExpr {
    let span = expr.span.clone();
    match kind {
        ConversionKind::Identity if expr.ty == *to => expr,
        ConversionKind::NullLiteral => TypedExpr::constant(Value::Null, to.clone(), span),
        ConversionKind::Constant(value) => TypedExpr::constant(value, to.clone(), span),
        ConversionKind::User(method) => {
            let parameter = method.parameters[0].ty.clone();
            let operand = convert_to(expr, &parameter, checked);
            let called = TypedExpr::new(
                method.return_type.clone(),
                span,
                TypedKind::Convert {
                    operand: Box::new(operand),
                    checked,
                    method: Some(method.clone()),
                },
            );
            convert_to(called, to, checked)
        }
        _ => TypedExpr::new(
            to.clone(),
            span,
            TypedKind::Convert {
                operand: Box::new(expr),
                checked,
                method: None,
            },
        ),
    }
}

/// Applies whichever standard conversion exists; used where the binder has
/// already established convertibility.
pub(crate) fn convert_to(expr: TypedExpr, to: &Type, checked: bool) -> TypedExpr {
    if expr.ty == *to {
        return expr;
    }
    let kind = implicit(&expr, to).unwrap_or(ConversionKind::Explicit);
    apply(expr, to, kind, checked)
}

/// Whether `t1` is a better conversion target than `t2`.
pub(crate) fn better_target(t1: &Type, t2: &Type) -> bool {
    if t1 == t2 {
        return false;
    }
    if implicit_type(t1, t2).is_some() && implicit_type(t2, t1).is_none() {
        return true;
    }
    match (t1, t2) {
        (Type::Primitive(a), Type::Primitive(b)) => a.is_better_target_than(*b),
        (Type::Nullable(a), Type::Nullable(b)) => better_target(a, b),
        (Type::Function(a), Type::Function(b)) if a.parameters == b.parameters => {
            !a.return_type.is_void() && (b.return_type.is_void() || better_target(&a.return_type, &b.return_type))
        }
        _ => false,
    }
}

/// Whether converting an argument of type `arg` to `t1` is better than to
/// `t2`. `arg` is `None` for a lambda argument.
pub(crate) fn better_conversion(arg: Option<&Type>, t1: &Type, t2: &Type) -> bool {
    if t1 == t2 {
        return false;
    }
    if let Some(arg) = arg {
        if arg == t1 {
            return true;
        }
        if arg == t2 {
            return false;
        }
    }
    better_target(t1, t2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Span;
    use crate::types::{ClassInfo, MemberTable, Parameter, native};

    fn constant(value: Value, ty: Type) -> TypedExpr {
        TypedExpr::constant(value, ty, Span::default())
    }

    #[test]
    fn test_numeric_and_nullable_implicit() {
        assert_eq!(implicit_type(&Type::INT32, &Type::INT64), Some(ConversionKind::Numeric));
        assert_eq!(implicit_type(&Type::INT64, &Type::INT32), None);
        assert_eq!(
            implicit_type(&Type::INT32, &Type::nullable(Type::INT64)),
            Some(ConversionKind::Nullable)
        );
        assert_eq!(
            implicit_type(&Type::Null, &Type::nullable(Type::INT32)),
            Some(ConversionKind::NullLiteral)
        );
        assert_eq!(implicit_type(&Type::Null, &Type::INT32), None);
        assert_eq!(implicit_type(&Type::INT32, &Type::Object), Some(ConversionKind::Reference));
    }

    #[test]
    fn test_constant_narrowing() {
        let one = constant(Value::Int32(1), Type::INT32);
        assert_eq!(
            implicit(&one, &Type::BYTE),
            Some(ConversionKind::Constant(Value::Byte(1)))
        );
        let big = constant(Value::Int32(300), Type::INT32);
        assert_eq!(implicit(&big, &Type::BYTE), None);
        let negative = constant(Value::Int32(-1), Type::INT32);
        assert_eq!(implicit(&negative, &Type::UINT32), None);
    }

    #[test]
    fn test_explicit_numeric_and_unboxing() {
        let long = constant(Value::Int64(1), Type::INT64);
        assert_eq!(explicit(&long, &Type::INT32), Some(ConversionKind::Explicit));
        let boolean = constant(Value::Bool(true), Type::BOOL);
        assert_eq!(explicit(&boolean, &Type::INT32), None);
        let object = TypedExpr::new(Type::Object, Span::default(), TypedKind::Parameter(0));
        assert_eq!(explicit(&object, &Type::INT32), Some(ConversionKind::Explicit));
        assert_eq!(explicit(&object, &Type::String), Some(ConversionKind::Explicit));
    }

    #[test]
    fn test_better_targets() {
        assert!(better_target(&Type::INT32, &Type::INT64));
        assert!(better_target(&Type::INT32, &Type::UINT32));
        assert!(!better_target(&Type::INT64, &Type::INT32));
        assert!(better_conversion(Some(&Type::INT32), &Type::INT32, &Type::DOUBLE));
    }

    #[test]
    fn test_user_defined_conversion() {
        let class = ClassInfo::declare("Tests", "Meters");
        let meters = Type::Class(class.clone());
        class.define(MemberTable::new().conversion(Method::new(
            "op_Implicit",
            vec![Parameter::new("value", Type::DOUBLE)],
            meters.clone(),
            native(|_, args| Ok(args[0].clone())),
        )));
        let method = class.members().conversions[0].clone();

        let real = constant(Value::Double(1.5), Type::DOUBLE);
        assert_eq!(implicit(&real, &meters), Some(ConversionKind::User(method.clone())));
        // int reaches the double parameter through a standard conversion
        let int = constant(Value::Int32(2), Type::INT32);
        assert_eq!(implicit(&int, &meters), Some(ConversionKind::User(method)));
        assert_eq!(implicit(&real, &Type::String), None);
    }
}
