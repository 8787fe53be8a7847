//! Shared fixtures for the integration tests.

#![allow(dead_code, unused_macros)]

use std::sync::{Arc, Weak};

use cseval::types::{ClassInfo, MemberTable, Method, Parameter, Property, native};
use cseval::values::DynamicObject;
use cseval::{Engine, EngineOptions, Error, Fault, Type, Value};
use once_cell::sync::Lazy;

/// `Tests.TestClass`, a host class with a field of each interesting shape:
///
/// ```text
/// class TestClass {
///     int IntField;
///     TestClass TestClassField;
///     int[] ArrayField;
///     int Twice(int x);
/// }
/// ```
pub static TEST_CLASS: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    let class = ClassInfo::declare("Tests", "TestClass");
    let this = Type::Class(class.clone());
    let weak: Weak<ClassInfo> = Arc::downgrade(&class);

    class.define(
        MemberTable::new()
            .constructor(Method::new(
                ".ctor",
                vec![],
                this.clone(),
                native(move |_, _| match weak.upgrade() {
                    Some(class) => Ok(DynamicObject::value(class, vec![Value::Int32(0), Value::Null, Value::Null])),
                    None => Err(Fault::InvalidOperation("TestClass was dropped".to_string())),
                }),
            ))
            .field(
                Property::new("IntField", Type::INT32, DynamicObject::slot_getter(0))
                    .with_setter(DynamicObject::slot_setter(0)),
            )
            .field(
                Property::new("TestClassField", this.clone(), DynamicObject::slot_getter(1))
                    .with_setter(DynamicObject::slot_setter(1)),
            )
            .field(
                Property::new("ArrayField", Type::array(Type::INT32), DynamicObject::slot_getter(2))
                    .with_setter(DynamicObject::slot_setter(2)),
            )
            .method(Method::instance(
                "Twice",
                vec![Parameter::new("x", Type::INT32)],
                Type::INT32,
                native(|_, args| match args {
                    [Value::Int32(x)] => x.checked_mul(2).map(Value::Int32).ok_or(Fault::Overflow),
                    _ => Err(Fault::Argument("expected an int".to_string())),
                }),
            )),
    );
    class
});

pub fn test_class_type() -> Type {
    Type::Class(TEST_CLASS.clone())
}

/// An instance with `IntField = int_field`, no nested instance and
/// `ArrayField = { 1, 2, 3 }`.
pub fn test_object(int_field: i32) -> Value {
    DynamicObject::value(
        TEST_CLASS.clone(),
        vec![
            Value::Int32(int_field),
            Value::Null,
            Value::array(Type::INT32, vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]),
        ],
    )
}

pub fn engine() -> Engine {
    Engine::new(EngineOptions::default(), |env| {
        env.register(test_class_type());
    })
}

/// Compiles and runs `source` with the given named parameters.
pub fn eval_with(source: &str, args: &[(&str, Type, Value)]) -> Result<Value, Error> {
    let params: Vec<(&str, Type)> = args.iter().map(|(name, ty, _)| (*name, ty.clone())).collect();
    let values: Vec<Value> = args.iter().map(|(_, _, value)| value.clone()).collect();
    engine().compile(source, &params)?.run(&values)
}

/// Declares a test evaluating `input`.
///
/// - `value:` the expected result
/// - `fault:` the expected runtime fault variant
/// - `error:` the expected diagnostic code of a compilation error
///
/// `args:` lists `(name, type, value)` parameters.
macro_rules! test_case {
    {
        name: $name:ident,
        input: $input:expr,
        $(args: [$(($arg:expr, $ty:expr, $val:expr)),* $(,)?],)?
        value: $expected:expr $(,)?
    } => {
        #[test]
        fn $name() {
            let args: Vec<(&str, cseval::Type, cseval::Value)> = vec![$($(($arg, $ty, $val)),*)?];
            match cases::eval_with($input, &args) {
                Ok(value) => pretty_assertions::assert_eq!(value, $expected),
                Err(err) => panic!("{:?} failed: {}", $input, err),
            }
        }
    };
    {
        name: $name:ident,
        input: $input:expr,
        $(args: [$(($arg:expr, $ty:expr, $val:expr)),* $(,)?],)?
        fault: $fault:ident $(,)?
    } => {
        #[test]
        fn $name() {
            let args: Vec<(&str, cseval::Type, cseval::Value)> = vec![$($(($arg, $ty, $val)),*)?];
            match cases::eval_with($input, &args) {
                Err(cseval::Error::Runtime { fault }) => {
                    pretty_assertions::assert_eq!(fault.name(), stringify!($fault))
                }
                other => panic!("{:?}: expected a {} fault, got {:?}", $input, stringify!($fault), other),
            }
        }
    };
    {
        name: $name:ident,
        input: $input:expr,
        $(args: [$(($arg:expr, $ty:expr, $val:expr)),* $(,)?],)?
        error: $code:expr $(,)?
    } => {
        #[test]
        fn $name() {
            let args: Vec<(&str, cseval::Type, cseval::Value)> = vec![$($(($arg, $ty, $val)),*)?];
            match cases::eval_with($input, &args) {
                Err(cseval::Error::Compilation { diagnostics, .. }) => {
                    pretty_assertions::assert_eq!(diagnostics[0].code.as_deref(), Some($code))
                }
                other => panic!("{:?}: expected error {}, got {:?}", $input, $code, other),
            }
        }
    };
}
