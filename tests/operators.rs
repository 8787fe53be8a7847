/*
 * Operator Tests
 *
 * Precedence, numeric promotion, overflow contexts and string
 * concatenation, evaluated end to end through the engine.
 */

#[macro_use]
mod cases;

use cseval::values::Decimal;
use cseval::{Type, Value};

test_case! {
    name: multiplication_binds_tighter,
    input: "2 + 2 * 3",
    value: Value::Int32(8),
}

test_case! {
    name: mixed_precedence_chain,
    input: "2 * (2 + 3) << 1 - 1 & 7 | 25 ^ 10",
    value: Value::Int32(19),
}

test_case! {
    name: subtraction_is_left_associative,
    input: "10 - 4 - 3",
    value: Value::Int32(3),
}

test_case! {
    name: coalesce_is_right_associative,
    input: "a ?? b ?? 3",
    args: [
        ("a", Type::nullable(Type::INT32), Value::Null),
        ("b", Type::nullable(Type::INT32), Value::Null),
    ],
    value: Value::Int32(3),
}

test_case! {
    name: integer_division_truncates,
    input: "-7 / 2",
    value: Value::Int32(-3),
}

test_case! {
    name: remainder_keeps_dividend_sign,
    input: "-7 % 3",
    value: Value::Int32(-1),
}

test_case! {
    name: real_division,
    input: "7.0 / 2",
    value: Value::Double(3.5),
}

test_case! {
    name: power_is_double,
    input: "2 ** 10",
    value: Value::Double(1024.0),
}

test_case! {
    name: integer_division_by_zero,
    input: "1 / x",
    args: [("x", Type::INT32, Value::Int32(0))],
    fault: DivideByZero,
}

test_case! {
    name: double_division_by_zero_is_infinite,
    input: "1.0 / x",
    args: [("x", Type::DOUBLE, Value::Double(0.0))],
    value: Value::Double(f64::INFINITY),
}

test_case! {
    name: byte_promotes_to_int,
    input: "(Byte)1 + 1",
    value: Value::Int32(2),
}

test_case! {
    name: decimal_absorbs_int,
    input: "1m + 1",
    value: Value::Decimal(Decimal::from_i64(2)),
}

test_case! {
    name: uint_and_int_promote_to_long,
    input: "1u + -2",
    value: Value::Int64(-1),
}

test_case! {
    name: checked_addition_overflows,
    input: "checked(2147483647 + 2)",
    fault: Overflow,
}

test_case! {
    name: unchecked_addition_wraps,
    input: "unchecked(2147483647 + 2)",
    value: Value::Int32(-2147483647),
}

test_case! {
    name: unchecked_narrowing_truncates,
    input: "unchecked((byte)x)",
    args: [("x", Type::INT32, Value::Int32(300))],
    value: Value::Byte(44),
}

test_case! {
    name: checked_narrowing_overflows,
    input: "checked((byte)x)",
    args: [("x", Type::INT32, Value::Int32(300))],
    fault: Overflow,
}

test_case! {
    name: shift_count_is_masked,
    input: "1 << 33",
    value: Value::Int32(2),
}

test_case! {
    name: string_concatenation_left_to_right,
    input: "\"a\" + 1 + 2",
    value: Value::string("a12"),
}

test_case! {
    name: arithmetic_before_concatenation,
    input: "1 + 2 + \"a\"",
    value: Value::string("3a"),
}

test_case! {
    name: null_concatenates_as_empty,
    input: "\"[\" + s + \"]\"",
    args: [("s", Type::String, Value::Null)],
    value: Value::string("[]"),
}

test_case! {
    name: conditional_unifies_branches,
    input: "flag ? 1 : 2.5",
    args: [("flag", Type::BOOL, Value::Bool(true))],
    value: Value::Double(1.0),
}

test_case! {
    name: short_circuit_skips_fault,
    input: "x == 0 || 10 / x > 1",
    args: [("x", Type::INT32, Value::Int32(0))],
    value: Value::Bool(true),
}

test_case! {
    name: bool_plus_int_is_rejected,
    input: "1 + true",
    error: "B008",
}

test_case! {
    name: boxed_values_compare_by_value,
    input: "(object)1 == (object)1",
    value: Value::Bool(true),
}

test_case! {
    name: host_objects_compare_by_identity,
    input: "a == b || (object)a != (object)a",
    args: [
        ("a", cases::test_class_type(), cases::test_object(1)),
        ("b", cases::test_class_type(), cases::test_object(1)),
    ],
    value: Value::Bool(false),
}

test_case! {
    name: same_host_object_is_equal,
    input: "(object)a == a",
    args: [("a", cases::test_class_type(), cases::test_object(1))],
    value: Value::Bool(true),
}
