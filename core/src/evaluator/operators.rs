//! Intrinsic operator tables.
//!
//! One function per `(primitive kind, operator, checked)`; the binder has
//! already converted both operands to the kind, so each function only
//! unpacks two values of one variant. Shifts take an `int` right operand.

use core::cmp::Ordering;

use crate::evaluator::Fault;
use crate::syntax::{BinaryOp, UnaryOp};
use crate::types::PrimitiveType;
use crate::values::{Decimal, Value};

pub(crate) type BinaryFn = fn(&Value, &Value) -> Result<Value, Fault>;
pub(crate) type UnaryFn = fn(&Value) -> Result<Value, Fault>;

const OPS: usize = BinaryOp::ALL.len();
const UNARY_OPS: usize = 4;

type BinaryTable = [[[BinaryFn; 2]; OPS]; PrimitiveType::COUNT];
type UnaryTable = [[[UnaryFn; 2]; UNARY_OPS]; PrimitiveType::COUNT];

lazy_static::lazy_static! {
    static ref BINARY: BinaryTable = binary_table();
    static ref UNARY: UnaryTable = unary_table();
}

/// The intrinsic for `op` over operands of kind `kind`.
pub(crate) fn binary_intrinsic(kind: PrimitiveType, op: BinaryOp, checked: bool) -> BinaryFn {
    BINARY[kind.index()][op as usize][checked as usize]
}

pub(crate) fn unary_intrinsic(kind: PrimitiveType, op: UnaryOp, checked: bool) -> UnaryFn {
    UNARY[kind.index()][op as usize][checked as usize]
}

fn unsupported(left: &Value, _: &Value) -> Result<Value, Fault> {
    Err(Fault::InvalidOperation(format!(
        "no intrinsic operator for '{}'",
        left.runtime_type()
    )))
}

fn unsupported_unary(operand: &Value) -> Result<Value, Fault> {
    Err(Fault::InvalidOperation(format!(
        "no intrinsic operator for '{}'",
        operand.runtime_type()
    )))
}

fn mismatch(value: &Value, expected: &str) -> Fault {
    Fault::invalid_cast(value.runtime_type(), expected)
}

fn set(table: &mut BinaryTable, kind: PrimitiveType, op: BinaryOp, unchecked: BinaryFn, checked: BinaryFn) {
    table[kind.index()][op as usize] = [unchecked, checked];
}

fn set_unary(table: &mut UnaryTable, kind: PrimitiveType, op: UnaryOp, unchecked: UnaryFn, checked: UnaryFn) {
    table[kind.index()][op as usize] = [unchecked, checked];
}

fn comparison(ordering: Option<Ordering>, op: BinaryOp) -> Value {
    let result = match (ordering, op) {
        (None, BinaryOp::NotEqual) => true,
        (None, _) => false,
        (Some(o), BinaryOp::Equal) => o.is_eq(),
        (Some(o), BinaryOp::NotEqual) => o.is_ne(),
        (Some(o), BinaryOp::LessThan) => o.is_lt(),
        (Some(o), BinaryOp::LessThanOrEqual) => o.is_le(),
        (Some(o), BinaryOp::GreaterThan) => o.is_gt(),
        (Some(o), BinaryOp::GreaterThanOrEqual) => o.is_ge(),
        _ => false,
    };
    Value::Bool(result)
}

macro_rules! comparisons {
    ($operands:ident, $cmp:expr) => {
        pub fn eq(l: &Value, r: &Value) -> Result<Value, Fault> {
            let (a, b) = $operands(l, r)?;
            Ok(comparison($cmp(&a, &b), BinaryOp::Equal))
        }
        pub fn ne(l: &Value, r: &Value) -> Result<Value, Fault> {
            let (a, b) = $operands(l, r)?;
            Ok(comparison($cmp(&a, &b), BinaryOp::NotEqual))
        }
        pub fn lt(l: &Value, r: &Value) -> Result<Value, Fault> {
            let (a, b) = $operands(l, r)?;
            Ok(comparison($cmp(&a, &b), BinaryOp::LessThan))
        }
        pub fn le(l: &Value, r: &Value) -> Result<Value, Fault> {
            let (a, b) = $operands(l, r)?;
            Ok(comparison($cmp(&a, &b), BinaryOp::LessThanOrEqual))
        }
        pub fn gt(l: &Value, r: &Value) -> Result<Value, Fault> {
            let (a, b) = $operands(l, r)?;
            Ok(comparison($cmp(&a, &b), BinaryOp::GreaterThan))
        }
        pub fn ge(l: &Value, r: &Value) -> Result<Value, Fault> {
            let (a, b) = $operands(l, r)?;
            Ok(comparison($cmp(&a, &b), BinaryOp::GreaterThanOrEqual))
        }
    };
}

macro_rules! register_comparisons {
    ($table:ident, $kind:expr, $module:tt) => {
        set($table, $kind, BinaryOp::Equal, $module::eq, $module::eq);
        set($table, $kind, BinaryOp::NotEqual, $module::ne, $module::ne);
        set($table, $kind, BinaryOp::LessThan, $module::lt, $module::lt);
        set($table, $kind, BinaryOp::LessThanOrEqual, $module::le, $module::le);
        set($table, $kind, BinaryOp::GreaterThan, $module::gt, $module::gt);
        set($table, $kind, BinaryOp::GreaterThanOrEqual, $module::ge, $module::ge);
    };
}

/// Wrapping and checked arithmetic, bitwise operators, shifts and
/// comparisons for one integral type. Division and remainder fault on a
/// zero divisor and on `MinValue / -1` regardless of the checked flag.
macro_rules! integral {
    ($module:ident, $t:ty, $variant:ident) => {
        mod $module {
            use super::*;

            fn operands(l: &Value, r: &Value) -> Result<($t, $t), Fault> {
                match (l, r) {
                    (Value::$variant(a), Value::$variant(b)) => Ok((*a, *b)),
                    (Value::$variant(_), other) | (other, _) => Err(mismatch(other, stringify!($t))),
                }
            }

            fn shift_operands(l: &Value, r: &Value) -> Result<($t, u32), Fault> {
                match (l, r) {
                    (Value::$variant(a), Value::Int32(b)) => Ok((*a, *b as u32)),
                    (Value::$variant(_), other) => Err(mismatch(other, "int")),
                    (other, _) => Err(mismatch(other, stringify!($t))),
                }
            }

            fn operand(v: &Value) -> Result<$t, Fault> {
                match v {
                    Value::$variant(a) => Ok(*a),
                    other => Err(mismatch(other, stringify!($t))),
                }
            }

            pub fn add(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a.wrapping_add(b)))
            }
            pub fn add_checked(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                a.checked_add(b).map(Value::$variant).ok_or(Fault::Overflow)
            }
            pub fn sub(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a.wrapping_sub(b)))
            }
            pub fn sub_checked(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                a.checked_sub(b).map(Value::$variant).ok_or(Fault::Overflow)
            }
            pub fn mul(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a.wrapping_mul(b)))
            }
            pub fn mul_checked(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                a.checked_mul(b).map(Value::$variant).ok_or(Fault::Overflow)
            }
            pub fn div(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                if b == 0 {
                    return Err(Fault::DivideByZero);
                }
                a.checked_div(b).map(Value::$variant).ok_or(Fault::Overflow)
            }
            pub fn rem(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                if b == 0 {
                    return Err(Fault::DivideByZero);
                }
                a.checked_rem(b).map(Value::$variant).ok_or(Fault::Overflow)
            }
            pub fn and(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a & b))
            }
            pub fn or(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a | b))
            }
            pub fn xor(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a ^ b))
            }
            pub fn shl(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, n) = shift_operands(l, r)?;
                Ok(Value::$variant(a.wrapping_shl(n)))
            }
            pub fn shr(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, n) = shift_operands(l, r)?;
                Ok(Value::$variant(a.wrapping_shr(n)))
            }

            pub fn plus(v: &Value) -> Result<Value, Fault> {
                Ok(Value::$variant(operand(v)?))
            }
            pub fn negate(v: &Value) -> Result<Value, Fault> {
                Ok(Value::$variant((0 as $t).wrapping_sub(operand(v)?)))
            }
            pub fn negate_checked(v: &Value) -> Result<Value, Fault> {
                (0 as $t).checked_sub(operand(v)?).map(Value::$variant).ok_or(Fault::Overflow)
            }
            pub fn complement(v: &Value) -> Result<Value, Fault> {
                Ok(Value::$variant(!operand(v)?))
            }

            comparisons!(operands, |a: &$t, b: &$t| Some(a.cmp(b)));

            pub fn register(table: &mut BinaryTable, unary: &mut UnaryTable, kind: PrimitiveType) {
                set(table, kind, BinaryOp::Add, add, add_checked);
                set(table, kind, BinaryOp::Subtract, sub, sub_checked);
                set(table, kind, BinaryOp::Multiply, mul, mul_checked);
                set(table, kind, BinaryOp::Divide, div, div);
                set(table, kind, BinaryOp::Modulo, rem, rem);
                set(table, kind, BinaryOp::And, and, and);
                set(table, kind, BinaryOp::Or, or, or);
                set(table, kind, BinaryOp::ExclusiveOr, xor, xor);
                set(table, kind, BinaryOp::LeftShift, shl, shl);
                set(table, kind, BinaryOp::RightShift, shr, shr);
                register_comparisons!(table, kind, self);
                set_unary(unary, kind, UnaryOp::Plus, plus, plus);
                set_unary(unary, kind, UnaryOp::Negate, negate, negate_checked);
                set_unary(unary, kind, UnaryOp::Complement, complement, complement);
            }
        }
    };
}

integral!(char_ops, u16, Char);
integral!(sbyte_ops, i8, SByte);
integral!(byte_ops, u8, Byte);
integral!(int16_ops, i16, Int16);
integral!(uint16_ops, u16, UInt16);
integral!(int32_ops, i32, Int32);
integral!(uint32_ops, u32, UInt32);
integral!(int64_ops, i64, Int64);
integral!(uint64_ops, u64, UInt64);

/// IEEE arithmetic; overflow gives infinities, never a fault.
macro_rules! floating {
    ($module:ident, $t:ty, $variant:ident) => {
        mod $module {
            use super::*;

            fn operands(l: &Value, r: &Value) -> Result<($t, $t), Fault> {
                match (l, r) {
                    (Value::$variant(a), Value::$variant(b)) => Ok((*a, *b)),
                    (Value::$variant(_), other) | (other, _) => Err(mismatch(other, stringify!($t))),
                }
            }

            fn operand(v: &Value) -> Result<$t, Fault> {
                match v {
                    Value::$variant(a) => Ok(*a),
                    other => Err(mismatch(other, stringify!($t))),
                }
            }

            pub fn add(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a + b))
            }
            pub fn sub(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a - b))
            }
            pub fn mul(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a * b))
            }
            pub fn div(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a / b))
            }
            pub fn rem(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a % b))
            }
            pub fn pow(l: &Value, r: &Value) -> Result<Value, Fault> {
                let (a, b) = operands(l, r)?;
                Ok(Value::$variant(a.powf(b)))
            }

            pub fn plus(v: &Value) -> Result<Value, Fault> {
                Ok(Value::$variant(operand(v)?))
            }
            pub fn negate(v: &Value) -> Result<Value, Fault> {
                Ok(Value::$variant(-operand(v)?))
            }

            comparisons!(operands, |a: &$t, b: &$t| a.partial_cmp(b));

            pub fn register(table: &mut BinaryTable, unary: &mut UnaryTable, kind: PrimitiveType) {
                set(table, kind, BinaryOp::Add, add, add);
                set(table, kind, BinaryOp::Subtract, sub, sub);
                set(table, kind, BinaryOp::Multiply, mul, mul);
                set(table, kind, BinaryOp::Divide, div, div);
                set(table, kind, BinaryOp::Modulo, rem, rem);
                set(table, kind, BinaryOp::Power, pow, pow);
                register_comparisons!(table, kind, self);
                set_unary(unary, kind, UnaryOp::Plus, plus, plus);
                set_unary(unary, kind, UnaryOp::Negate, negate, negate);
            }
        }
    };
}

floating!(single_ops, f32, Single);
floating!(double_ops, f64, Double);

/// Decimal arithmetic always detects overflow.
mod decimal_ops {
    use super::*;

    fn operands(l: &Value, r: &Value) -> Result<(Decimal, Decimal), Fault> {
        match (l, r) {
            (Value::Decimal(a), Value::Decimal(b)) => Ok((*a, *b)),
            (Value::Decimal(_), other) | (other, _) => Err(mismatch(other, "decimal")),
        }
    }

    fn operand(v: &Value) -> Result<Decimal, Fault> {
        match v {
            Value::Decimal(a) => Ok(*a),
            other => Err(mismatch(other, "decimal")),
        }
    }

    pub fn add(l: &Value, r: &Value) -> Result<Value, Fault> {
        let (a, b) = operands(l, r)?;
        a.checked_add(b).map(Value::Decimal).ok_or(Fault::Overflow)
    }
    pub fn sub(l: &Value, r: &Value) -> Result<Value, Fault> {
        let (a, b) = operands(l, r)?;
        a.checked_sub(b).map(Value::Decimal).ok_or(Fault::Overflow)
    }
    pub fn mul(l: &Value, r: &Value) -> Result<Value, Fault> {
        let (a, b) = operands(l, r)?;
        a.checked_mul(b).map(Value::Decimal).ok_or(Fault::Overflow)
    }
    pub fn div(l: &Value, r: &Value) -> Result<Value, Fault> {
        let (a, b) = operands(l, r)?;
        if b.is_zero() {
            return Err(Fault::DivideByZero);
        }
        a.checked_div(b).map(Value::Decimal).ok_or(Fault::Overflow)
    }
    pub fn rem(l: &Value, r: &Value) -> Result<Value, Fault> {
        let (a, b) = operands(l, r)?;
        if b.is_zero() {
            return Err(Fault::DivideByZero);
        }
        a.checked_rem(b).map(Value::Decimal).ok_or(Fault::Overflow)
    }

    pub fn plus(v: &Value) -> Result<Value, Fault> {
        Ok(Value::Decimal(operand(v)?))
    }
    pub fn negate(v: &Value) -> Result<Value, Fault> {
        Ok(Value::Decimal(operand(v)?.neg()))
    }

    comparisons!(operands, |a: &Decimal, b: &Decimal| Some(a.cmp_value(b)));

    pub fn register(table: &mut BinaryTable, unary: &mut UnaryTable) {
        let kind = PrimitiveType::Decimal;
        set(table, kind, BinaryOp::Add, add, add);
        set(table, kind, BinaryOp::Subtract, sub, sub);
        set(table, kind, BinaryOp::Multiply, mul, mul);
        set(table, kind, BinaryOp::Divide, div, div);
        set(table, kind, BinaryOp::Modulo, rem, rem);
        register_comparisons!(table, kind, self);
        set_unary(unary, kind, UnaryOp::Plus, plus, plus);
        set_unary(unary, kind, UnaryOp::Negate, negate, negate);
    }
}

mod bool_ops {
    use super::*;

    fn operands(l: &Value, r: &Value) -> Result<(bool, bool), Fault> {
        match (l, r) {
            (Value::Bool(a), Value::Bool(b)) => Ok((*a, *b)),
            (Value::Bool(_), other) | (other, _) => Err(mismatch(other, "bool")),
        }
    }

    pub fn and(l: &Value, r: &Value) -> Result<Value, Fault> {
        let (a, b) = operands(l, r)?;
        Ok(Value::Bool(a & b))
    }
    pub fn or(l: &Value, r: &Value) -> Result<Value, Fault> {
        let (a, b) = operands(l, r)?;
        Ok(Value::Bool(a | b))
    }
    pub fn xor(l: &Value, r: &Value) -> Result<Value, Fault> {
        let (a, b) = operands(l, r)?;
        Ok(Value::Bool(a ^ b))
    }
    pub fn eq(l: &Value, r: &Value) -> Result<Value, Fault> {
        let (a, b) = operands(l, r)?;
        Ok(Value::Bool(a == b))
    }
    pub fn ne(l: &Value, r: &Value) -> Result<Value, Fault> {
        let (a, b) = operands(l, r)?;
        Ok(Value::Bool(a != b))
    }
    pub fn not(v: &Value) -> Result<Value, Fault> {
        match v {
            Value::Bool(a) => Ok(Value::Bool(!a)),
            other => Err(mismatch(other, "bool")),
        }
    }

    pub fn register(table: &mut BinaryTable, unary: &mut UnaryTable) {
        let kind = PrimitiveType::Bool;
        set(table, kind, BinaryOp::And, and, and);
        set(table, kind, BinaryOp::Or, or, or);
        set(table, kind, BinaryOp::ExclusiveOr, xor, xor);
        set(table, kind, BinaryOp::Equal, eq, eq);
        set(table, kind, BinaryOp::NotEqual, ne, ne);
        set_unary(unary, kind, UnaryOp::Not, not, not);
    }
}

fn binary_table() -> BinaryTable {
    let (binary, _) = tables();
    binary
}

fn unary_table() -> UnaryTable {
    let (_, unary) = tables();
    unary
}

fn tables() -> (BinaryTable, UnaryTable) {
    let mut binary: BinaryTable = [[[unsupported as BinaryFn; 2]; OPS]; PrimitiveType::COUNT];
    let mut unary: UnaryTable = [[[unsupported_unary as UnaryFn; 2]; UNARY_OPS]; PrimitiveType::COUNT];
    let (b, u) = (&mut binary, &mut unary);
    bool_ops::register(b, u);
    char_ops::register(b, u, PrimitiveType::Char);
    sbyte_ops::register(b, u, PrimitiveType::SByte);
    byte_ops::register(b, u, PrimitiveType::Byte);
    int16_ops::register(b, u, PrimitiveType::Int16);
    uint16_ops::register(b, u, PrimitiveType::UInt16);
    int32_ops::register(b, u, PrimitiveType::Int32);
    uint32_ops::register(b, u, PrimitiveType::UInt32);
    int64_ops::register(b, u, PrimitiveType::Int64);
    uint64_ops::register(b, u, PrimitiveType::UInt64);
    single_ops::register(b, u, PrimitiveType::Single);
    double_ops::register(b, u, PrimitiveType::Double);
    decimal_ops::register(b, u);
    (binary, unary)
}
