//! Static and instance members of the primitive types.

use alloc::sync::Arc;
use core::cmp::Ordering;

use crate::evaluator::Fault;
use crate::stdlib::{arg, str_arg};
use crate::types::{Method, MemberTable, Parameter, PrimitiveType, Property, Type, getter, native};
use crate::values::{Decimal, Value};

lazy_static::lazy_static! {
    static ref TABLES: Vec<Arc<MemberTable>> = PrimitiveType::ALL
        .iter()
        .map(|p| Arc::new(build(*p)))
        .collect();
}

pub(crate) fn members(p: PrimitiveType) -> Arc<MemberTable> {
    TABLES
        .get(p.index())
        .cloned()
        .unwrap_or_default()
}

fn constant(name: &str, ty: Type, value: Value) -> Property {
    Property::new(name, ty, getter(move |_| Ok(value.clone()))).static_member()
}

fn build(p: PrimitiveType) -> MemberTable {
    let ty = Type::Primitive(p);
    let mut table = MemberTable::new();

    if let Some((min, max)) = p.integral_range() {
        if let (Some(min), Some(max)) = (Value::from_integral(p, min), Value::from_integral(p, max)) {
            table = table
                .field(constant("MinValue", ty.clone(), min))
                .field(constant("MaxValue", ty.clone(), max));
        }
    }
    match p {
        PrimitiveType::Single => {
            table = table
                .field(constant("MinValue", ty.clone(), Value::Single(f32::MIN)))
                .field(constant("MaxValue", ty.clone(), Value::Single(f32::MAX)))
                .field(constant("Epsilon", ty.clone(), Value::Single(f32::from_bits(1))))
                .field(constant("NaN", ty.clone(), Value::Single(f32::NAN)))
                .field(constant("PositiveInfinity", ty.clone(), Value::Single(f32::INFINITY)))
                .field(constant("NegativeInfinity", ty.clone(), Value::Single(f32::NEG_INFINITY)));
        }
        PrimitiveType::Double => {
            table = table
                .field(constant("MinValue", ty.clone(), Value::Double(f64::MIN)))
                .field(constant("MaxValue", ty.clone(), Value::Double(f64::MAX)))
                .field(constant("Epsilon", ty.clone(), Value::Double(f64::from_bits(1))))
                .field(constant("NaN", ty.clone(), Value::Double(f64::NAN)))
                .field(constant("PositiveInfinity", ty.clone(), Value::Double(f64::INFINITY)))
                .field(constant("NegativeInfinity", ty.clone(), Value::Double(f64::NEG_INFINITY)));
        }
        PrimitiveType::Decimal => {
            table = table
                .field(constant("MinValue", ty.clone(), Value::Decimal(Decimal::MIN)))
                .field(constant("MaxValue", ty.clone(), Value::Decimal(Decimal::MAX)))
                .field(constant("Zero", ty.clone(), Value::Decimal(Decimal::ZERO)))
                .field(constant("One", ty.clone(), Value::Decimal(Decimal::ONE)));
        }
        _ => {}
    }
    if p.is_floating() {
        table = table
            .method(Method::new(
                "IsNaN",
                vec![Parameter::new("f", ty.clone())],
                Type::BOOL,
                native(|_, args| Ok(Value::Bool(arg(args, 0)?.as_f64().is_some_and(f64::is_nan)))),
            ))
            .method(Method::new(
                "IsInfinity",
                vec![Parameter::new("f", ty.clone())],
                Type::BOOL,
                native(|_, args| {
                    Ok(Value::Bool(arg(args, 0)?.as_f64().is_some_and(f64::is_infinite)))
                }),
            ));
    }

    table
        .method(Method::new(
            "Parse",
            vec![Parameter::new("s", Type::String)],
            ty.clone(),
            native(move |_, args| parse(p, str_arg(args, 0)?)),
        ))
        .method(Method::instance(
            "CompareTo",
            vec![Parameter::new("value", ty.clone())],
            Type::INT32,
            native(|this, args| Ok(Value::Int32(compare(this, arg(args, 0)?) as i32))),
        ))
}

/// `T.Parse(s)` in the invariant culture.
pub(crate) fn parse(p: PrimitiveType, text: &str) -> Result<Value, Fault> {
    let s = text.trim();
    let format_error = || Fault::Argument(format!("input string '{}' was not in a correct format", text));
    match p {
        PrimitiveType::Bool => match s.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format_error()),
        },
        PrimitiveType::Char => {
            let mut units = text.encode_utf16();
            match (units.next(), units.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(Fault::Argument("string must be exactly one character long".to_string())),
            }
        }
        PrimitiveType::Single => s.parse::<f32>().map(Value::Single).map_err(|_| format_error()),
        PrimitiveType::Double => s.parse::<f64>().map(Value::Double).map_err(|_| format_error()),
        PrimitiveType::Decimal => {
            let digits = s.strip_prefix('-').unwrap_or(s);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
                return Err(format_error());
            }
            Decimal::parse(s).map(Value::Decimal).ok_or(Fault::Overflow)
        }
        _ => {
            let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format_error());
            }
            let v: i128 = s.parse().map_err(|_| Fault::Overflow)?;
            Value::from_integral(p, v).ok_or(Fault::Overflow)
        }
    }
}

/// `CompareTo` ordering; NaN sorts before every other value.
pub(crate) fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Decimal(x), Value::Decimal(y)) => x.cmp_value(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => match (a.as_i128(), b.as_i128()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = a.as_f64().unwrap_or(f64::NAN);
                let y = b.as_f64().unwrap_or(f64::NAN);
                match (x.is_nan(), y.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        let int = members(PrimitiveType::Int32);
        let max = int.find_property("MaxValue").unwrap();
        assert_eq!((max.getter)(&Value::Null).unwrap(), Value::Int32(i32::MAX));
        let byte = members(PrimitiveType::Byte);
        let min = byte.find_property("MinValue").unwrap();
        assert_eq!((min.getter)(&Value::Null).unwrap(), Value::Byte(0));
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse(PrimitiveType::Int32, " 42 ").unwrap(), Value::Int32(42));
        assert_eq!(parse(PrimitiveType::Byte, "256"), Err(Fault::Overflow));
        assert!(matches!(parse(PrimitiveType::Int32, "4x"), Err(Fault::Argument(_))));
        assert_eq!(parse(PrimitiveType::Bool, "True").unwrap(), Value::Bool(true));
        assert_eq!(parse(PrimitiveType::Double, "1.5").unwrap(), Value::Double(1.5));
    }

    #[test]
    fn test_compare_orders_nan_first() {
        assert_eq!(compare(&Value::Double(f64::NAN), &Value::Double(0.0)), Ordering::Less);
        assert_eq!(compare(&Value::Int32(3), &Value::Int32(2)), Ordering::Greater);
    }
}
