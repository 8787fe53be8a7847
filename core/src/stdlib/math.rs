//! `System.Math`.
//!
//! Constants: PI, E
//! Functions: Abs, Max, Min, Pow, Sqrt, Floor, Ceiling, Round, Sign,
//!            Truncate, Exp, Log, Log10, Sin, Cos, Tan, Atan2

use alloc::sync::Arc;

use crate::evaluator::Fault;
use crate::stdlib::{arg, f64_arg, i32_arg};
use crate::types::{ClassInfo, Method, MemberTable, NativeFn, Parameter, PrimitiveType, Property, Type, getter, native};
use crate::values::{Decimal, Value};

lazy_static::lazy_static! {
    pub static ref MATH: Arc<ClassInfo> = {
        let math = ClassInfo::declare("System", "Math");
        math.define(members());
        math
    };
}

fn unary(name: &str, ty: Type, body: NativeFn) -> Method {
    Method::new(name, vec![Parameter::new("value", ty.clone())], ty, body)
}

fn binary(name: &str, ty: Type, body: NativeFn) -> Method {
    Method::new(
        name,
        vec![Parameter::new("val1", ty.clone()), Parameter::new("val2", ty.clone())],
        ty,
        body,
    )
}

fn double_fn(name: &str, f: fn(f64) -> f64) -> Method {
    unary(name, Type::DOUBLE, native(move |_, args| Ok(Value::Double(f(f64_arg(args, 0)?)))))
}

/// Integral `Abs`; `MinValue` has no positive counterpart.
fn abs_integral(p: PrimitiveType) -> Method {
    unary(
        "Abs",
        Type::Primitive(p),
        native(move |_, args| {
            let v = arg(args, 0)?.as_i128().ok_or(Fault::Overflow)?;
            Value::from_integral(p, v.abs()).ok_or(Fault::Overflow)
        }),
    )
}

fn extreme(p: PrimitiveType, name: &str, pick_max: bool) -> Method {
    binary(
        name,
        Type::Primitive(p),
        native(move |_, args| {
            let a = arg(args, 0)?;
            let b = arg(args, 1)?;
            if let (Value::Double(x), Value::Double(y)) = (a, b) {
                if x.is_nan() || y.is_nan() {
                    return Ok(Value::Double(f64::NAN));
                }
            }
            if let (Value::Single(x), Value::Single(y)) = (a, b) {
                if x.is_nan() || y.is_nan() {
                    return Ok(Value::Single(f32::NAN));
                }
            }
            let ord = super::primitives::compare(a, b);
            let first = if pick_max { ord.is_ge() } else { ord.is_le() };
            Ok(if first { a.clone() } else { b.clone() })
        }),
    )
}

fn sign(p: PrimitiveType) -> Method {
    Method::new(
        "Sign",
        vec![Parameter::new("value", Type::Primitive(p))],
        Type::INT32,
        native(|_, args| {
            let v = arg(args, 0)?;
            let s = match v {
                Value::Decimal(d) => d.signum(),
                Value::Double(f) if f.is_nan() => {
                    return Err(Fault::Argument("Sign of NaN is undefined".to_string()));
                }
                other => match other.as_i128() {
                    Some(i) => i.signum() as i32,
                    None => {
                        let f = other.as_f64().unwrap_or(0.0);
                        if f > 0.0 {
                            1
                        } else if f < 0.0 {
                            -1
                        } else {
                            0
                        }
                    }
                },
            };
            Ok(Value::Int32(s))
        }),
    )
}

fn decimal_fn(name: &str, f: fn(&Decimal) -> Decimal) -> Method {
    unary(
        name,
        Type::DECIMAL,
        native(move |_, args| match arg(args, 0)? {
            Value::Decimal(d) => Ok(Value::Decimal(f(d))),
            other => Err(Fault::invalid_cast(other.runtime_type(), "System.Decimal")),
        }),
    )
}

fn members() -> MemberTable {
    let constant = |name: &str, v: f64| {
        Property::new(name, Type::DOUBLE, getter(move |_| Ok(Value::Double(v)))).static_member()
    };
    let mut table = MemberTable::new()
        .field(constant("PI", core::f64::consts::PI))
        .field(constant("E", core::f64::consts::E));

    for p in [PrimitiveType::SByte, PrimitiveType::Int16, PrimitiveType::Int32, PrimitiveType::Int64] {
        table = table.method(abs_integral(p)).method(sign(p));
    }
    table = table
        .method(unary(
            "Abs",
            Type::SINGLE,
            native(|_, args| Ok(Value::Single(f64_arg(args, 0)?.abs() as f32))),
        ))
        .method(double_fn("Abs", f64::abs))
        .method(decimal_fn("Abs", Decimal::abs))
        .method(sign(PrimitiveType::Single))
        .method(sign(PrimitiveType::Double))
        .method(sign(PrimitiveType::Decimal));

    for p in PrimitiveType::ALL.into_iter().filter(|p| p.is_numeric()) {
        table = table.method(extreme(p, "Max", true)).method(extreme(p, "Min", false));
    }

    table
        .method(double_fn("Sqrt", f64::sqrt))
        .method(double_fn("Floor", f64::floor))
        .method(double_fn("Ceiling", f64::ceil))
        .method(double_fn("Truncate", f64::trunc))
        .method(double_fn("Round", f64::round_ties_even))
        .method(double_fn("Exp", f64::exp))
        .method(double_fn("Log", f64::ln))
        .method(double_fn("Log10", f64::log10))
        .method(double_fn("Sin", f64::sin))
        .method(double_fn("Cos", f64::cos))
        .method(double_fn("Tan", f64::tan))
        .method(decimal_fn("Floor", Decimal::floor))
        .method(decimal_fn("Ceiling", Decimal::ceiling))
        .method(decimal_fn("Truncate", Decimal::trunc))
        .method(decimal_fn("Round", |d| d.round(0)))
        .method(Method::new(
            "Round",
            vec![Parameter::new("value", Type::DOUBLE), Parameter::new("digits", Type::INT32)],
            Type::DOUBLE,
            native(|_, args| {
                let v = f64_arg(args, 0)?;
                let digits = i32_arg(args, 1)?;
                if !(0..=15).contains(&digits) {
                    return Err(Fault::Argument("Rounding digits must be between 0 and 15".to_string()));
                }
                let scale = 10f64.powi(digits);
                Ok(Value::Double((v * scale).round_ties_even() / scale))
            }),
        ))
        .method(Method::new(
            "Round",
            vec![Parameter::new("d", Type::DECIMAL), Parameter::new("decimals", Type::INT32)],
            Type::DECIMAL,
            native(|_, args| {
                let digits = i32_arg(args, 1)?;
                if !(0..=28).contains(&digits) {
                    return Err(Fault::Argument("Rounding digits must be between 0 and 28".to_string()));
                }
                match arg(args, 0)? {
                    Value::Decimal(d) => Ok(Value::Decimal(d.round(digits as u32))),
                    other => Err(Fault::invalid_cast(other.runtime_type(), "System.Decimal")),
                }
            }),
        ))
        .method(Method::new(
            "Pow",
            vec![Parameter::new("x", Type::DOUBLE), Parameter::new("y", Type::DOUBLE)],
            Type::DOUBLE,
            native(|_, args| Ok(Value::Double(f64_arg(args, 0)?.powf(f64_arg(args, 1)?)))),
        ))
        .method(Method::new(
            "Atan2",
            vec![Parameter::new("y", Type::DOUBLE), Parameter::new("x", Type::DOUBLE)],
            Type::DOUBLE,
            native(|_, args| Ok(Value::Double(f64_arg(args, 0)?.atan2(f64_arg(args, 1)?)))),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, Fault> {
        let table = MATH.members();
        let method = table
            .methods_named(name)
            .find(|m| {
                m.parameters.len() == args.len()
                    && m.parameters
                        .iter()
                        .zip(args)
                        .all(|(p, a)| a.runtime_type() == p.ty)
            })
            .unwrap_or_else(|| panic!("no overload of {} for {:?}", name, args));
        (method.body)(&Value::Null, args)
    }

    #[test]
    fn test_abs_of_min_value_overflows() {
        assert_eq!(call("Abs", &[Value::Int32(-3)]).unwrap(), Value::Int32(3));
        assert_eq!(call("Abs", &[Value::Int32(i32::MIN)]), Err(Fault::Overflow));
    }

    #[test]
    fn test_round_is_bankers() {
        assert_eq!(call("Round", &[Value::Double(2.5)]).unwrap(), Value::Double(2.0));
        assert_eq!(call("Round", &[Value::Double(3.5)]).unwrap(), Value::Double(4.0));
    }

    #[test]
    fn test_max_keeps_operand_type() {
        assert_eq!(
            call("Max", &[Value::Int64(3), Value::Int64(9)]).unwrap(),
            Value::Int64(9)
        );
        assert!(matches!(
            call("Min", &[Value::Double(f64::NAN), Value::Double(1.0)]).unwrap(),
            Value::Double(d) if d.is_nan()
        ));
    }
}
