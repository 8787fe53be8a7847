//! `System.Array` generic helpers.
//!
//! Each helper is a generic static method over `T`; the binder infers `T`
//! from the array argument and binds the lambda against `Func<T, bool>`.

use alloc::sync::Arc;

use crate::evaluator::Fault;
use crate::stdlib::{arg, predicate};
use crate::types::{ClassInfo, Method, MemberTable, Parameter, Type, native};
use crate::values::{ArrayValue, Value};

lazy_static::lazy_static! {
    pub static ref ARRAY: Arc<ClassInfo> = {
        let array = ClassInfo::declare("System", "Array");
        array.define(members());
        array
    };
}

fn t() -> Type {
    Type::GenericParameter(0)
}

fn array_param() -> Parameter {
    Parameter::new("array", Type::array(t()))
}

fn match_param() -> Parameter {
    Parameter::new("match", Type::function(vec![t()], Type::BOOL))
}

fn array_arg(args: &[Value]) -> Result<&Arc<ArrayValue>, Fault> {
    match arg(args, 0)? {
        Value::Array(a) => Ok(a),
        Value::Null => Err(Fault::Argument("Value cannot be null. (Parameter 'array')".to_string())),
        other => Err(Fault::invalid_cast(other.runtime_type(), "System.Array")),
    }
}

/// Index of the first element matching the predicate argument.
fn find_index(args: &[Value]) -> Result<Option<usize>, Fault> {
    let array = array_arg(args)?;
    for (i, item) in array.items.iter().enumerate() {
        if predicate(args, 1, item)? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

fn members() -> MemberTable {
    MemberTable::new()
        .method(
            Method::new(
                "IndexOf",
                vec![array_param(), Parameter::new("value", t())],
                Type::INT32,
                native(|_, args| {
                    let needle = arg(args, 1)?;
                    let index = array_arg(args)?.items.iter().position(|v| v.equals(needle));
                    Ok(Value::Int32(index.map_or(-1, |i| i as i32)))
                }),
            )
            .generic(1),
        )
        .method(
            Method::new(
                "Exists",
                vec![array_param(), match_param()],
                Type::BOOL,
                native(|_, args| Ok(Value::Bool(find_index(args)?.is_some()))),
            )
            .generic(1),
        )
        .method(
            Method::new(
                "FindIndex",
                vec![array_param(), match_param()],
                Type::INT32,
                native(|_, args| Ok(Value::Int32(find_index(args)?.map_or(-1, |i| i as i32)))),
            )
            .generic(1),
        )
        .method(
            Method::new(
                "Find",
                vec![array_param(), match_param()],
                t(),
                native(|_, args| {
                    let array = array_arg(args)?;
                    Ok(match find_index(args)? {
                        Some(i) => array.items[i].clone(),
                        None => Value::default_for(&array.element),
                    })
                }),
            )
            .generic(1),
        )
        .method(
            Method::new(
                "FindAll",
                vec![array_param(), match_param()],
                Type::array(t()),
                native(|_, args| {
                    let array = array_arg(args)?;
                    let mut found = Vec::new();
                    for item in &array.items {
                        if predicate(args, 1, item)? {
                            found.push(item.clone());
                        }
                    }
                    Ok(Value::array(array.element.clone(), found))
                }),
            )
            .generic(1),
        )
        .method(
            Method::new(
                "TrueForAll",
                vec![array_param(), match_param()],
                Type::BOOL,
                native(|_, args| {
                    let array = array_arg(args)?;
                    for item in &array.items {
                        if !predicate(args, 1, item)? {
                            return Ok(Value::Bool(false));
                        }
                    }
                    Ok(Value::Bool(true))
                }),
            )
            .generic(1),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::NativeDelegate;

    fn is_even() -> Value {
        NativeDelegate::value(
            vec![Type::INT32],
            Type::BOOL,
            native(|_, args| Ok(Value::Bool(args[0].as_i32().unwrap_or(1) % 2 == 0))),
        )
    }

    fn call(name: &str, args: &[Value]) -> Result<Value, Fault> {
        let table = ARRAY.members();
        let method = table.methods_named(name).next().unwrap();
        (method.body)(&Value::Null, args)
    }

    fn numbers() -> Value {
        Value::array(Type::INT32, vec![Value::Int32(1), Value::Int32(4), Value::Int32(6)])
    }

    #[test]
    fn test_predicates() {
        assert_eq!(call("Exists", &[numbers(), is_even()]).unwrap(), Value::Bool(true));
        assert_eq!(call("FindIndex", &[numbers(), is_even()]).unwrap(), Value::Int32(1));
        assert_eq!(call("Find", &[numbers(), is_even()]).unwrap(), Value::Int32(4));
        assert_eq!(call("TrueForAll", &[numbers(), is_even()]).unwrap(), Value::Bool(false));
        let all = call("FindAll", &[numbers(), is_even()]).unwrap();
        assert_eq!(all.as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_find_returns_default_when_missing() {
        let odd_only = Value::array(Type::INT32, vec![Value::Int32(1)]);
        assert_eq!(call("Find", &[odd_only, is_even()]).unwrap(), Value::Int32(0));
        assert_eq!(
            call("IndexOf", &[numbers(), Value::Int32(6)]).unwrap(),
            Value::Int32(2)
        );
    }

    #[test]
    fn test_null_array_is_argument_error() {
        assert!(matches!(
            call("Exists", &[Value::Null, is_even()]),
            Err(Fault::Argument(_))
        ));
    }
}
