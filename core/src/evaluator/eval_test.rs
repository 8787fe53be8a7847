//! Unit tests for the evaluator.

use super::*;
use crate::api::CompilationOptions;
use crate::binder::bind;
use crate::parser::parse_syntax_tree;
use crate::stdlib::datetime::DAY_OF_WEEK;
use crate::types::{TypeCatalog, native};
use crate::values::{Decimal, NativeDelegate};
use pretty_assertions::assert_eq;

fn compile(source: &str, parameters: &[(&str, Type)]) -> ExecutionNode {
    let syntax = parse_syntax_tree(source, true).expect("parsing failed");
    let catalog = TypeCatalog::empty();
    let typed = bind(&syntax, parameters, &catalog, &CompilationOptions::default()).expect("binding failed");
    lower(&typed)
}

fn run(source: &str, parameters: &[(&str, Type)], args: &[Value]) -> Result<Value, Fault> {
    compile(source, parameters).run(args)
}

fn eval(source: &str) -> Result<Value, Fault> {
    run(source, &[], &[])
}

fn int_nullable() -> Type {
    Type::nullable(Type::INT32)
}

#[test]
fn test_precedence() {
    assert_eq!(eval("2 + 2 * 3"), Ok(Value::Int32(8)));
    assert_eq!(eval("2 * (2 + 3) << 1 - 1 & 7 | 25 ^ 10"), Ok(Value::Int32(19)));
    assert_eq!(eval("10 - 4 - 3"), Ok(Value::Int32(3)));
}

#[test]
fn test_overflow_contexts() {
    let x = [("x", Type::INT32)];
    let max = [Value::Int32(i32::MAX)];
    assert_eq!(run("checked(x + 2)", &x, &max), Err(Fault::Overflow));
    assert_eq!(run("unchecked(x + 2)", &x, &max), Ok(Value::Int32(-2147483647)));
}

#[test]
fn test_unchecked_by_default_option() {
    let syntax = parse_syntax_tree("x + 1", false).expect("parsing failed");
    let options = CompilationOptions {
        checked_by_default: false,
        ..CompilationOptions::default()
    };
    let typed = bind(&syntax, &[("x", Type::INT32)], &TypeCatalog::empty(), &options).expect("binding failed");
    assert_eq!(lower(&typed).run(&[Value::Int32(i32::MAX)]), Ok(Value::Int32(i32::MIN)));
}

#[test]
fn test_division_faults() {
    let x = [("x", Type::INT32)];
    assert_eq!(run("x / 0", &x, &[Value::Int32(1)]), Err(Fault::DivideByZero));
    assert_eq!(run("x % 0", &x, &[Value::Int32(1)]), Err(Fault::DivideByZero));
    assert_eq!(eval("7 / 2"), Ok(Value::Int32(3)));
    assert_eq!(eval("7.0 / 2"), Ok(Value::Double(3.5)));
}

#[test]
fn test_numeric_promotion() {
    assert_eq!(eval("(byte)1 + 1"), Ok(Value::Int32(2)));
    assert_eq!(eval("1m + 1"), Ok(Value::Decimal(Decimal::from_i64(2))));
    assert_eq!(eval("1L + 1"), Ok(Value::Int64(2)));
    assert_eq!(eval("1.5f * 2"), Ok(Value::Single(3.0)));
}

#[test]
fn test_operands_reach_intrinsics_converted() {
    let bc = [("b", Type::BYTE), ("c", Type::CHAR)];
    assert_eq!(run("b + c", &bc, &[Value::Byte(200), Value::Char(97)]), Ok(Value::Int32(297)));
    assert_eq!(run("b * 2L", &bc[..1], &[Value::Byte(3)]), Ok(Value::Int64(6)));
    let ui = [("u", Type::UINT32), ("i", Type::INT32)];
    assert_eq!(run("u + i", &ui, &[Value::UInt32(u32::MAX), Value::Int32(1)]), Ok(Value::Int64(4294967296)));
}

#[test]
fn test_nullable_lifting() {
    let ab = [("a", int_nullable()), ("b", int_nullable())];
    assert_eq!(run("a + b", &ab, &[Value::Int32(1), Value::Null]), Ok(Value::Null));
    assert_eq!(run("a + b", &ab, &[Value::Int32(1), Value::Int32(2)]), Ok(Value::Int32(3)));
    assert_eq!(run("null == a", &ab[..1], &[Value::Null]), Ok(Value::Bool(true)));
    assert_eq!(run("a != b", &ab, &[Value::Int32(1), Value::Null]), Ok(Value::Bool(true)));
    assert_eq!(run("a == b", &ab, &[Value::Null, Value::Null]), Ok(Value::Bool(true)));
    assert_eq!(run("a < b", &ab, &[Value::Null, Value::Int32(1)]), Ok(Value::Bool(false)));
    assert_eq!(run("-a", &ab[..1], &[Value::Null]), Ok(Value::Null));
}

#[test]
fn test_lifted_bool_logic() {
    let pq = [("p", Type::nullable(Type::BOOL)), ("q", Type::nullable(Type::BOOL))];
    assert_eq!(run("p & q", &pq, &[Value::Bool(false), Value::Null]), Ok(Value::Bool(false)));
    assert_eq!(run("p & q", &pq, &[Value::Bool(true), Value::Null]), Ok(Value::Null));
    assert_eq!(run("p | q", &pq, &[Value::Null, Value::Bool(true)]), Ok(Value::Bool(true)));
    assert_eq!(run("p | q", &pq, &[Value::Null, Value::Bool(false)]), Ok(Value::Null));
}

#[test]
fn test_short_circuit() {
    let x = [("x", Type::INT32)];
    assert_eq!(run("x != 0 && 10 / x > 1", &x, &[Value::Int32(0)]), Ok(Value::Bool(false)));
    assert_eq!(run("x == 0 || 10 / x > 1", &x, &[Value::Int32(0)]), Ok(Value::Bool(true)));
    assert_eq!(run("x > 0 ? 10 / x : -1", &x, &[Value::Int32(0)]), Ok(Value::Int32(-1)));
}

#[test]
fn test_coalesce() {
    let a = [("a", int_nullable())];
    assert_eq!(run("a ?? 5", &a, &[Value::Null]), Ok(Value::Int32(5)));
    assert_eq!(run("a ?? 5", &a, &[Value::Int32(3)]), Ok(Value::Int32(3)));
    let s = [("s", Type::String)];
    assert_eq!(run("s ?? \"none\"", &s, &[Value::Null]), Ok(Value::string("none")));
}

#[test]
fn test_strings() {
    let s = [("s", Type::String)];
    let abc = [Value::string("abc")];
    assert_eq!(eval("\"a\" + 1"), Ok(Value::string("a1")));
    assert_eq!(run("s.Length", &s, &abc), Ok(Value::Int32(3)));
    assert_eq!(run("s == \"abc\"", &s, &abc), Ok(Value::Bool(true)));
    assert_eq!(run("s.ToUpper()", &s, &abc), Ok(Value::string("ABC")));
    assert_eq!(run("s[1]", &s, &abc), Ok(Value::char('b')));
    assert_eq!(run("s.Substring(1)", &s, &abc), Ok(Value::string("bc")));
}

#[test]
fn test_null_conditional() {
    let s = [("s", Type::String)];
    assert_eq!(run("s?.Length", &s, &[Value::Null]), Ok(Value::Null));
    assert_eq!(run("s?.Length", &s, &[Value::string("ab")]), Ok(Value::Int32(2)));
    assert_eq!(run("s?.Length ?? -1", &s, &[Value::Null]), Ok(Value::Int32(-1)));
    assert_eq!(run("s.Length", &s, &[Value::Null]), Err(Fault::NullReference));
}

#[test]
fn test_arrays() {
    let arr = [("arr", Type::array(Type::INT32))];
    let numbers = [Value::array(Type::INT32, vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)])];
    assert_eq!(run("arr[1]", &arr, &numbers), Ok(Value::Int32(2)));
    assert_eq!(run("arr.Length", &arr, &numbers), Ok(Value::Int32(3)));
    assert_eq!(run("arr[5]", &arr, &numbers), Err(Fault::IndexOutOfRange));
    assert_eq!(run("arr[-1]", &arr, &numbers), Err(Fault::IndexOutOfRange));
    assert_eq!(run("arr?[0]", &arr, &[Value::Null]), Ok(Value::Null));
    assert_eq!(eval("(new int[3]).Length"), Ok(Value::Int32(3)));
    assert_eq!(eval("(new[] { 1, 2 })[1]"), Ok(Value::Int32(2)));
}

#[test]
fn test_negative_array_length() {
    let n = [("n", Type::INT32)];
    assert_eq!(run("new int[n]", &n, &[Value::Int32(-1)]), Err(Fault::Overflow));
}

#[test]
fn test_math_and_lambdas() {
    assert_eq!(eval("Math.Max(1, 2)"), Ok(Value::Int32(2)));
    assert_eq!(eval("Math.Abs(-2.5)"), Ok(Value::Double(2.5)));
    let arr = [("arr", Type::array(Type::INT32))];
    let numbers = [Value::array(Type::INT32, vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)])];
    assert_eq!(run("Array.Exists(arr, x => x > 2)", &arr, &numbers), Ok(Value::Bool(true)));
    assert_eq!(run("Array.Find(arr, x => x % 2 == 0)", &arr, &numbers), Ok(Value::Int32(2)));
    assert_eq!(run("Array.IndexOf(arr, 3)", &arr, &numbers), Ok(Value::Int32(2)));
}

#[test]
fn test_lambda_captures_parameters() {
    let params = [("arr", Type::array(Type::INT32)), ("limit", Type::INT32)];
    let args = [
        Value::array(Type::INT32, vec![Value::Int32(1), Value::Int32(5)]),
        Value::Int32(4),
    ];
    assert_eq!(run("Array.FindIndex(arr, x => x > limit)", &params, &args), Ok(Value::Int32(1)));
}

#[test]
fn test_delegate_parameter() {
    let f = [("f", Type::function(vec![Type::INT32], Type::INT32))];
    let double = NativeDelegate::value(
        vec![Type::INT32],
        Type::INT32,
        native(|_, args| Ok(Value::Int32(args[0].as_i32().unwrap_or_default() * 2))),
    );
    assert_eq!(run("f(3) + 1", &f, &[double]), Ok(Value::Int32(7)));
    assert_eq!(run("f(3)", &f, &[Value::Null]), Err(Fault::NullReference));
}

#[test]
fn test_enums() {
    assert_eq!(eval("(int)DayOfWeek.Friday"), Ok(Value::Int32(5)));
    assert_eq!(eval("DayOfWeek.Monday + 1"), Ok(Value::Enum(DAY_OF_WEEK.clone(), 2)));
    assert_eq!(eval("DayOfWeek.Monday < DayOfWeek.Friday"), Ok(Value::Bool(true)));
    assert_eq!(eval("(DayOfWeek)0"), Ok(Value::Enum(DAY_OF_WEEK.clone(), 0)));
}

#[test]
fn test_casts_and_type_tests() {
    let o = [("o", Type::Object)];
    assert!(matches!(run("(int)o", &o, &[Value::Int64(1)]), Err(Fault::InvalidCast { .. })));
    assert_eq!(run("(int)o", &o, &[Value::Int32(4)]), Ok(Value::Int32(4)));
    assert_eq!(run("(int)o", &o, &[Value::Null]), Err(Fault::NullReference));
    assert_eq!(run("o as string", &o, &[Value::Int32(1)]), Ok(Value::Null));
    assert_eq!(run("o is int", &o, &[Value::Int32(1)]), Ok(Value::Bool(true)));
    assert_eq!(run("o is string", &o, &[Value::Null]), Ok(Value::Bool(false)));
    assert_eq!(eval("(int)3.9"), Ok(Value::Int32(3)));
    assert_eq!(eval("(int)(-3.9)"), Ok(Value::Int32(-3)));
    assert_eq!(eval("typeof(int)"), Ok(Value::Type(Type::INT32)));
}

#[test]
fn test_nullable_unwrap_faults() {
    let a = [("a", int_nullable())];
    let fault = Fault::InvalidOperation("Nullable object must have a value.".to_string());
    assert_eq!(run("(int)a", &a, &[Value::Null]), Err(fault.clone()));
    assert_eq!(run("a.Value", &a, &[Value::Null]), Err(fault));
    assert_eq!(run("a.HasValue", &a, &[Value::Null]), Ok(Value::Bool(false)));
    assert_eq!(run("a.GetValueOrDefault()", &a, &[Value::Null]), Ok(Value::Int32(0)));
}

#[test]
fn test_collection_initializer() {
    assert_eq!(eval("(new List<int> { 1, 2 }).Count"), Ok(Value::Int32(2)));
    assert_eq!(eval("(new List<int> { 1, 2 })[1]"), Ok(Value::Int32(2)));
}

#[test]
fn test_date_time() {
    assert_eq!(eval("(new DateTime(2024, 1, 2)).Day"), Ok(Value::Int32(2)));
    assert_eq!(
        eval("(new DateTime(2024, 1, 2) - new DateTime(2024, 1, 1)).TotalHours"),
        Ok(Value::Double(24.0))
    );
}

#[test]
fn test_depth_limit_counts_delegate_calls() {
    let arr = [("arr", Type::array(Type::INT32))];
    let numbers = [Value::array(Type::INT32, vec![Value::Int32(1)])];
    let node = compile(
        "Array.Exists(arr, x => Array.Exists(arr, y => Array.Exists(arr, z => x + y + z > 2)))",
        &arr,
    );
    assert_eq!(node.run(&numbers), Ok(Value::Bool(true)));
    let options = ExecutionOptions { max_depth: 3 };
    assert_eq!(node.run_with(&numbers, &options), Ok(Value::Bool(true)));
    let options = ExecutionOptions { max_depth: 2 };
    assert_eq!(node.run_with(&numbers, &options), Err(Fault::StackOverflow { max_depth: 2 }));
}

#[test]
fn test_depth_limit_ignores_tree_depth() {
    let source = vec!["1"; 1200].join(" + ");
    let node = compile(&source, &[]);
    assert_eq!(node.run(&[]), Ok(Value::Int32(1200)));
    let options = ExecutionOptions { max_depth: 1 };
    assert_eq!(node.run_with(&[], &options), Ok(Value::Int32(1200)));
}

#[test]
fn test_deep_trees() {
    let x = [("x", Type::INT32)];
    let sum = vec!["x"; 10_000].join(" + ");
    assert_eq!(run(&sum, &x, &[Value::Int32(1)]), Ok(Value::Int32(10_000)));

    let grouped = format!("{}x + 1{}", "(".repeat(1000), ")".repeat(1000));
    assert_eq!(run(&grouped, &x, &[Value::Int32(1)]), Ok(Value::Int32(2)));

    let negated = format!("{}x{}", "-(".repeat(1001), ")".repeat(1001));
    assert_eq!(run(&negated, &x, &[Value::Int32(5)]), Ok(Value::Int32(-5)));
}

#[test]
fn test_argument_count_is_checked() {
    let node = compile("x", &[("x", Type::INT32)]);
    assert!(matches!(node.run(&[]), Err(Fault::Argument(_))));
}

#[test]
fn test_repeated_runs_are_independent() {
    let node = compile("s?.Length", &[("s", Type::String)]);
    assert_eq!(node.run(&[Value::string("abc")]), Ok(Value::Int32(3)));
    assert_eq!(node.run(&[Value::Null]), Ok(Value::Null));
    assert_eq!(node.run(&[Value::string("a")]), Ok(Value::Int32(1)));
}

#[test]
fn test_concurrent_runs() {
    let node = compile("x * x", &[("x", Type::INT32)]);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let node = &node;
                scope.spawn(move || node.run(&[Value::Int32(i)]))
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.join().expect("thread panicked");
            assert_eq!(result, Ok(Value::Int32((i * i) as i32)));
        }
    });
}
