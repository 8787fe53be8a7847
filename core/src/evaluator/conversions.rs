//! Runtime conversion plans.
//!
//! The binder decides which conversions happen; lowering turns each
//! `Convert` node into a [`ConversionPlan`] over the source and target
//! types, so evaluation never inspects static types again.

use alloc::sync::Arc;

use crate::evaluator::Fault;
use crate::types::{EnumInfo, PrimitiveType, Type};
use crate::values::{Decimal, Value};

#[derive(Debug, Clone)]
pub(crate) enum ConversionPlan {
    /// Same representation: identity, boxing, upcasts, `T` to `T?`.
    Identity,
    Primitive { to: PrimitiveType, checked: bool },
    /// Enum (or integral) source to an enum target.
    ToEnum { info: Arc<EnumInfo>, checked: bool },
    /// Enum source to a numeric target.
    FromEnum { to: PrimitiveType, checked: bool },
    /// `object` to a value type: the runtime type must match exactly.
    Unbox(Type),
    /// `object` to `T?`: `null` passes, anything else must be a `T`.
    UnboxNullable(Type),
    /// Downcast; `null` passes.
    CastClass(Type),
    /// `T?` to `U?`: `null` passes, a value goes through the inner plan.
    Lifted(Box<ConversionPlan>),
    /// `T?` to `U`: `null` faults.
    Unwrap(Box<ConversionPlan>),
}

impl ConversionPlan {
    pub(crate) fn new(from: &Type, to: &Type, checked: bool) -> ConversionPlan {
        if from == to || matches!(from, Type::Null) {
            return ConversionPlan::Identity;
        }
        match (from, to) {
            (Type::Nullable(a), Type::Nullable(b)) => match ConversionPlan::new(a, b, checked) {
                ConversionPlan::Identity => ConversionPlan::Identity,
                inner => ConversionPlan::Lifted(Box::new(inner)),
            },
            (Type::Nullable(a), b) if b.is_value_type() => {
                ConversionPlan::Unwrap(Box::new(ConversionPlan::new(a, b, checked)))
            }
            (Type::Object, Type::Nullable(b)) => ConversionPlan::UnboxNullable((**b).clone()),
            (a, Type::Nullable(b)) => ConversionPlan::new(a, b, checked),
            (Type::Object, t) if t.is_value_type() => ConversionPlan::Unbox(t.clone()),
            (Type::Primitive(_), Type::Primitive(q)) => ConversionPlan::Primitive { to: *q, checked },
            (Type::Enum(_) | Type::Primitive(_), Type::Enum(info)) => ConversionPlan::ToEnum {
                info: info.clone(),
                checked,
            },
            (Type::Enum(_), Type::Primitive(q)) => ConversionPlan::FromEnum { to: *q, checked },
            (_, Type::Object) => ConversionPlan::Identity,
            (_, t) if t.is_reference_type() && !t.is_reference_assignable_from(from) => {
                ConversionPlan::CastClass(t.clone())
            }
            _ => ConversionPlan::Identity,
        }
    }

    pub(crate) fn apply(&self, value: Value) -> Result<Value, Fault> {
        match self {
            ConversionPlan::Identity => Ok(value),
            ConversionPlan::Primitive { to, checked } => convert_primitive(&value, *to, *checked),
            ConversionPlan::ToEnum { info, checked } => {
                let source = match value {
                    Value::Enum(source, raw) => wrap_integral(source.underlying(), raw as i128),
                    other => other,
                };
                let converted = convert_primitive(&source, info.underlying(), *checked)?;
                let raw = converted
                    .as_i128()
                    .ok_or_else(|| Fault::invalid_cast(converted.runtime_type(), info.full_name()))?;
                Ok(Value::Enum(info.clone(), raw as i64))
            }
            ConversionPlan::FromEnum { to, checked } => match &value {
                Value::Enum(info, raw) => {
                    convert_primitive(&wrap_integral(info.underlying(), *raw as i128), *to, *checked)
                }
                other => Err(Fault::invalid_cast(other.runtime_type(), to)),
            },
            ConversionPlan::Unbox(target) => {
                if value.is_null() {
                    return Err(Fault::NullReference);
                }
                unbox(value, target)
            }
            ConversionPlan::UnboxNullable(target) => {
                if value.is_null() {
                    return Ok(value);
                }
                unbox(value, target)
            }
            ConversionPlan::CastClass(target) => {
                if value.is_null() || value.is_instance_of(target) {
                    Ok(value)
                } else {
                    Err(Fault::invalid_cast(value.runtime_type(), target))
                }
            }
            ConversionPlan::Lifted(inner) => {
                if value.is_null() {
                    Ok(value)
                } else {
                    inner.apply(value)
                }
            }
            ConversionPlan::Unwrap(inner) => {
                if value.is_null() {
                    Err(Fault::InvalidOperation("Nullable object must have a value.".to_string()))
                } else {
                    inner.apply(value)
                }
            }
        }
    }
}

/// Unboxing requires the exact runtime type; an enum also unboxes from its
/// underlying integral type.
fn unbox(value: Value, target: &Type) -> Result<Value, Fault> {
    let actual = value.runtime_type();
    if actual == *target {
        return Ok(value);
    }
    if let Type::Enum(info) = target {
        if actual == Type::Primitive(info.underlying()) {
            if let Some(raw) = value.as_i128() {
                return Ok(Value::Enum(info.clone(), raw as i64));
            }
        }
    }
    Err(Fault::invalid_cast(actual, target))
}

/// Truncates `v` to the bit width of `p`, two's complement.
fn wrap_integral(p: PrimitiveType, v: i128) -> Value {
    match p {
        PrimitiveType::Char => Value::Char(v as u16),
        PrimitiveType::SByte => Value::SByte(v as i8),
        PrimitiveType::Byte => Value::Byte(v as u8),
        PrimitiveType::Int16 => Value::Int16(v as i16),
        PrimitiveType::UInt16 => Value::UInt16(v as u16),
        PrimitiveType::Int32 => Value::Int32(v as i32),
        PrimitiveType::UInt32 => Value::UInt32(v as u32),
        PrimitiveType::UInt64 => Value::UInt64(v as u64),
        _ => Value::Int64(v as i64),
    }
}

fn integral_target(p: PrimitiveType, v: i128, checked: bool) -> Result<Value, Fault> {
    if checked {
        Value::from_integral(p, v).ok_or(Fault::Overflow)
    } else {
        Ok(wrap_integral(p, v))
    }
}

/// Numeric conversion between primitives.
///
/// Integral sources wrap unless `checked`. Floating sources truncate toward
/// zero; out-of-range values fault when `checked` and saturate otherwise.
/// Decimal sources and decimal targets always detect overflow.
pub(crate) fn convert_primitive(value: &Value, to: PrimitiveType, checked: bool) -> Result<Value, Fault> {
    if value.primitive_kind() == Some(to) {
        return Ok(value.clone());
    }
    let fail = || Fault::invalid_cast(value.runtime_type(), to);
    match to {
        PrimitiveType::Bool => Err(fail()),
        PrimitiveType::Single | PrimitiveType::Double => {
            let v = match value {
                Value::Single(f) => *f as f64,
                Value::Double(f) => *f,
                Value::Decimal(d) => d.to_f64(),
                other => other.as_i128().ok_or_else(fail)? as f64,
            };
            Ok(match (to, value) {
                (PrimitiveType::Single, Value::Decimal(d)) => Value::Single(d.to_f32()),
                (PrimitiveType::Single, _) => Value::Single(v as f32),
                _ => Value::Double(v),
            })
        }
        PrimitiveType::Decimal => {
            let d = match value {
                Value::Single(f) => Decimal::from_f32(*f),
                Value::Double(f) => Decimal::from_f64(*f),
                other => Decimal::from_i128(other.as_i128().ok_or_else(fail)?),
            };
            d.map(Value::Decimal).ok_or(Fault::Overflow)
        }
        _ => match value {
            Value::Decimal(d) => Value::from_integral(to, d.trunc_to_i128()).ok_or(Fault::Overflow),
            Value::Single(f) => float_to_integral(*f as f64, to, checked),
            Value::Double(f) => float_to_integral(*f, to, checked),
            other => integral_target(to, other.as_i128().ok_or_else(fail)?, checked),
        },
    }
}

fn float_to_integral(f: f64, to: PrimitiveType, checked: bool) -> Result<Value, Fault> {
    let Some((min, max)) = to.integral_range() else {
        return Err(Fault::invalid_cast("double", to));
    };
    let t = f.trunc();
    if t.is_nan() || t < min as f64 || t > max as f64 {
        if checked {
            return Err(Fault::Overflow);
        }
        let saturated = if t.is_nan() { 0 } else if t < min as f64 { min } else { max };
        return Ok(wrap_integral(to, saturated));
    }
    Ok(wrap_integral(to, t as i128))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrowing_wraps_unless_checked() {
        assert_eq!(
            convert_primitive(&Value::Int32(300), PrimitiveType::Byte, false),
            Ok(Value::Byte(44))
        );
        assert_eq!(
            convert_primitive(&Value::Int32(300), PrimitiveType::Byte, true),
            Err(Fault::Overflow)
        );
        assert_eq!(
            convert_primitive(&Value::Int32(-1), PrimitiveType::UInt32, false),
            Ok(Value::UInt32(u32::MAX))
        );
    }

    #[test]
    fn test_float_to_integral_truncates() {
        assert_eq!(
            convert_primitive(&Value::Double(-2.7), PrimitiveType::Int32, true),
            Ok(Value::Int32(-2))
        );
        assert_eq!(
            convert_primitive(&Value::Double(f64::NAN), PrimitiveType::Int32, true),
            Err(Fault::Overflow)
        );
        assert_eq!(
            convert_primitive(&Value::Double(1e20), PrimitiveType::Int32, false),
            Ok(Value::Int32(i32::MAX))
        );
    }

    #[test]
    fn test_decimal_always_checks() {
        let big = Value::Decimal(Decimal::from_i64(i64::MAX));
        assert_eq!(convert_primitive(&big, PrimitiveType::Int32, false), Err(Fault::Overflow));
        assert_eq!(
            convert_primitive(&Value::Double(f64::INFINITY), PrimitiveType::Decimal, false),
            Err(Fault::Overflow)
        );
    }

    #[test]
    fn test_nullable_plans() {
        let int_nullable = Type::nullable(Type::INT32);
        let unwrap = ConversionPlan::new(&int_nullable, &Type::INT32, true);
        assert!(matches!(unwrap.apply(Value::Null), Err(Fault::InvalidOperation(_))));
        assert_eq!(unwrap.apply(Value::Int32(3)), Ok(Value::Int32(3)));

        let lifted = ConversionPlan::new(&int_nullable, &Type::nullable(Type::INT64), true);
        assert_eq!(lifted.apply(Value::Null), Ok(Value::Null));
        assert_eq!(lifted.apply(Value::Int32(3)), Ok(Value::Int64(3)));
    }

    #[test]
    fn test_unboxing() {
        let unbox = ConversionPlan::new(&Type::Object, &Type::INT32, true);
        assert_eq!(unbox.apply(Value::Int32(1)), Ok(Value::Int32(1)));
        assert_eq!(unbox.apply(Value::Null), Err(Fault::NullReference));
        assert!(matches!(unbox.apply(Value::Int64(1)), Err(Fault::InvalidCast { .. })));

        let cast = ConversionPlan::new(&Type::Object, &Type::String, true);
        assert_eq!(cast.apply(Value::Null), Ok(Value::Null));
        assert!(matches!(cast.apply(Value::Int32(1)), Err(Fault::InvalidCast { .. })));
    }

    #[test]
    fn test_enum_conversions() {
        let info = EnumInfo::new("Test", "Color", PrimitiveType::Byte, &[("Red", 1), ("Blue", 2)]);
        let color = Type::Enum(info.clone());
        let to_enum = ConversionPlan::new(&Type::INT32, &color, true);
        assert_eq!(to_enum.apply(Value::Int32(2)), Ok(Value::Enum(info.clone(), 2)));
        assert_eq!(to_enum.apply(Value::Int32(256)), Err(Fault::Overflow));

        let from_enum = ConversionPlan::new(&color, &Type::INT64, true);
        assert_eq!(from_enum.apply(Value::Enum(info, 1)), Ok(Value::Int64(1)));
    }
}
