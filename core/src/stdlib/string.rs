//! `System.String`.
//!
//! Lengths and indices count UTF-16 code units, as in the CLR. Case mapping
//! uses the invariant (Unicode default) rules.

use alloc::sync::Arc;

use crate::evaluator::Fault;
use crate::stdlib::{arg, i32_arg, str_arg};
use crate::types::{Indexer, Method, MemberTable, Parameter, Property, Type, getter, native};
use crate::values::{Value, format_value};

lazy_static::lazy_static! {
    pub static ref STRING_MEMBERS: Arc<MemberTable> = Arc::new(members());
}

fn this_str(this: &Value) -> Result<&str, Fault> {
    match this {
        Value::String(s) => Ok(s.as_str()),
        Value::Null => Err(Fault::NullReference),
        other => Err(Fault::invalid_cast(other.runtime_type(), "System.String")),
    }
}

fn units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn from_units(units: &[u16]) -> Value {
    Value::string(String::from_utf16_lossy(units))
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// UTF-16 index of the first occurrence of `needle`, or -1.
fn index_of(haystack: &str, needle: &str) -> i32 {
    haystack
        .find(needle)
        .map(|byte| utf16_len(&haystack[..byte]) as i32)
        .unwrap_or(-1)
}

fn substring(s: &str, start: i32, length: Option<i32>) -> Result<Value, Fault> {
    let units = units(s);
    let out_of_range = || Fault::Argument("index and length must refer to a location within the string".to_string());
    let start = usize::try_from(start).map_err(|_| out_of_range())?;
    if start > units.len() {
        return Err(out_of_range());
    }
    let end = match length {
        Some(len) => {
            let len = usize::try_from(len).map_err(|_| out_of_range())?;
            start.checked_add(len).filter(|e| *e <= units.len()).ok_or_else(out_of_range)?
        }
        None => units.len(),
    };
    Ok(from_units(&units[start..end]))
}

/// `{0}`-style composite formatting with `{{`/`}}` escapes.
pub(crate) fn composite_format(format: &str, args: &[Value]) -> Result<String, Fault> {
    let bad_format = || Fault::Argument("input string was not in a correct format".to_string());
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut index = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(d) if d.is_ascii_digit() => index.push(d),
                        _ => return Err(bad_format()),
                    }
                }
                let i: usize = index.parse().map_err(|_| bad_format())?;
                let value = args.get(i).ok_or_else(bad_format)?;
                out.push_str(&format_value(value));
            }
            '}' => return Err(bad_format()),
            other => out.push(other),
        }
    }
    Ok(out)
}

fn instance(name: &str, parameters: Vec<Parameter>, ret: Type, f: fn(&str, &[Value]) -> Result<Value, Fault>) -> Method {
    Method::instance(name, parameters, ret, native(move |this, args| f(this_str(this)?, args)))
}

fn s(name: &str) -> Parameter {
    Parameter::new(name, Type::String)
}

fn members() -> MemberTable {
    MemberTable::new()
        .field(
            Property::new("Empty", Type::String, getter(|_| Ok(Value::string("")))).static_member(),
        )
        .property(Property::new(
            "Length",
            Type::INT32,
            getter(|this| Ok(Value::Int32(utf16_len(this_str(this)?) as i32))),
        ))
        .indexer(Indexer::new(
            vec![Parameter::new("index", Type::INT32)],
            Type::CHAR,
            native(|this, args| {
                let units = units(this_str(this)?);
                let i = i32_arg(args, 0)?;
                usize::try_from(i)
                    .ok()
                    .and_then(|i| units.get(i))
                    .map(|c| Value::Char(*c))
                    .ok_or(Fault::IndexOutOfRange)
            }),
        ))
        .method(instance("Substring", vec![Parameter::new("startIndex", Type::INT32)], Type::String, |s, args| {
            substring(s, i32_arg(args, 0)?, None)
        }))
        .method(instance(
            "Substring",
            vec![Parameter::new("startIndex", Type::INT32), Parameter::new("length", Type::INT32)],
            Type::String,
            |s, args| substring(s, i32_arg(args, 0)?, Some(i32_arg(args, 1)?)),
        ))
        .method(instance("IndexOf", vec![s("value")], Type::INT32, |s, args| {
            Ok(Value::Int32(index_of(s, str_arg(args, 0)?)))
        }))
        .method(instance("IndexOf", vec![Parameter::new("value", Type::CHAR)], Type::INT32, |s, args| {
            let needle = format_value(arg(args, 0)?);
            Ok(Value::Int32(index_of(s, &needle)))
        }))
        .method(instance("Contains", vec![s("value")], Type::BOOL, |s, args| {
            Ok(Value::Bool(s.contains(str_arg(args, 0)?)))
        }))
        .method(instance("StartsWith", vec![s("value")], Type::BOOL, |s, args| {
            Ok(Value::Bool(s.starts_with(str_arg(args, 0)?)))
        }))
        .method(instance("EndsWith", vec![s("value")], Type::BOOL, |s, args| {
            Ok(Value::Bool(s.ends_with(str_arg(args, 0)?)))
        }))
        .method(instance("ToUpper", vec![], Type::String, |s, _| Ok(Value::string(s.to_uppercase()))))
        .method(instance("ToLower", vec![], Type::String, |s, _| Ok(Value::string(s.to_lowercase()))))
        .method(instance("Trim", vec![], Type::String, |s, _| Ok(Value::string(s.trim()))))
        .method(instance("TrimStart", vec![], Type::String, |s, _| Ok(Value::string(s.trim_start()))))
        .method(instance("TrimEnd", vec![], Type::String, |s, _| Ok(Value::string(s.trim_end()))))
        .method(instance("Replace", vec![s("oldValue"), s("newValue")], Type::String, |s, args| {
            let old = str_arg(args, 0)?;
            if old.is_empty() {
                return Err(Fault::Argument("String cannot be of zero length.".to_string()));
            }
            let new = match arg(args, 1)? {
                Value::Null => "",
                _ => str_arg(args, 1)?,
            };
            Ok(Value::string(s.replace(old, new)))
        }))
        .method(instance(
            "Split",
            vec![Parameter::new("separator", Type::CHAR)],
            Type::array(Type::String),
            |s, args| {
                let sep = format_value(arg(args, 0)?);
                let parts = s.split(sep.as_str()).map(Value::string).collect();
                Ok(Value::array(Type::String, parts))
            },
        ))
        .method(instance("CompareTo", vec![s("strB")], Type::INT32, |s, args| {
            Ok(Value::Int32(match arg(args, 0)? {
                Value::Null => 1,
                other => super::primitives::compare(&Value::string(s), other) as i32,
            }))
        }))
        .method(Method::new(
            "IsNullOrEmpty",
            vec![s("value")],
            Type::BOOL,
            native(|_, args| {
                Ok(Value::Bool(match arg(args, 0)? {
                    Value::String(s) => s.is_empty(),
                    _ => true,
                }))
            }),
        ))
        .method(Method::new(
            "IsNullOrWhiteSpace",
            vec![s("value")],
            Type::BOOL,
            native(|_, args| {
                Ok(Value::Bool(match arg(args, 0)? {
                    Value::String(s) => s.trim().is_empty(),
                    _ => true,
                }))
            }),
        ))
        .method(Method::new(
            "Concat",
            vec![Parameter::new("arg0", Type::Object), Parameter::new("arg1", Type::Object)],
            Type::String,
            native(|_, args| Ok(Value::string(concat(args)))),
        ))
        .method(Method::new(
            "Concat",
            vec![s("str0"), s("str1")],
            Type::String,
            native(|_, args| Ok(Value::string(concat(args)))),
        ))
        .method(Method::new(
            "Concat",
            vec![s("str0"), s("str1"), s("str2")],
            Type::String,
            native(|_, args| Ok(Value::string(concat(args)))),
        ))
        .method(Method::new(
            "Join",
            vec![s("separator"), Parameter::new("value", Type::array(Type::String))],
            Type::String,
            native(|_, args| {
                let separator = match arg(args, 0)? {
                    Value::Null => "",
                    _ => str_arg(args, 0)?,
                };
                let items = arg(args, 1)?
                    .as_array()
                    .ok_or_else(|| Fault::Argument("Value cannot be null.".to_string()))?;
                let parts: Vec<String> = items.items.iter().map(format_value).collect();
                Ok(Value::string(parts.join(separator)))
            }),
        ))
        .method(format_overload(1))
        .method(format_overload(2))
        .method(format_overload(3))
        .method(Method::new(
            "Equals",
            vec![s("a"), s("b")],
            Type::BOOL,
            native(|_, args| Ok(Value::Bool(arg(args, 0)?.equals(arg(args, 1)?)))),
        ))
}

fn concat(args: &[Value]) -> String {
    args.iter().map(format_value).collect()
}

fn format_overload(count: usize) -> Method {
    let mut parameters = vec![s("format")];
    parameters.extend((0..count).map(|i| Parameter::new(&format!("arg{}", i), Type::Object)));
    Method::new(
        "Format",
        parameters,
        Type::String,
        native(|_, args| {
            let format = str_arg(args, 0)?;
            Ok(Value::string(composite_format(format, &args[1..])?))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, this: &str, args: &[Value]) -> Result<Value, Fault> {
        let method = STRING_MEMBERS
            .methods_named(name)
            .find(|m| m.parameters.len() == args.len() && !m.is_static)
            .unwrap_or_else(|| panic!("no overload of {}", name));
        (method.body)(&Value::string(this), args)
    }

    #[test]
    fn test_substring_counts_utf16_units() {
        assert_eq!(
            call("Substring", "héllo", &[Value::Int32(1), Value::Int32(3)]).unwrap(),
            Value::string("éll")
        );
        assert!(call("Substring", "abc", &[Value::Int32(4)]).is_err());
        assert_eq!(call("IndexOf", "héllo", &[Value::string("l")]).unwrap(), Value::Int32(2));
    }

    #[test]
    fn test_composite_format() {
        assert_eq!(
            composite_format("{0} + {1} = {{{2}}}", &[Value::Int32(1), Value::Int32(2), Value::Int32(3)])
                .unwrap(),
            "1 + 2 = {3}"
        );
        assert!(composite_format("{1}", &[Value::Int32(1)]).is_err());
    }

    #[test]
    fn test_concat_formats_null_as_empty() {
        assert_eq!(concat(&[Value::Null, Value::string("a"), Value::Bool(true)]), "aTrue");
    }
}
