//! Built-in System types.
//!
//! Every System type the binder knows about is described with the same
//! metadata model as host classes: a [`MemberTable`] per type, reachable
//! through [`member_chain`]. The tables are built once and shared.
//!
//! - `object`: `ToString`, `Equals`, `GetHashCode`, `GetType` on every value
//! - primitives: `MaxValue`, `MinValue`, `Parse`, `CompareTo`
//! - `System.Math`, `System.String`, `System.DateTime`, `System.TimeSpan`
//! - `List<T>`, `Dictionary<TKey, TValue>`, `System.Array` helpers
//! - `Nullable<T>`: `HasValue`, `Value`, `GetValueOrDefault`

use alloc::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::evaluator::Fault;
use crate::types::{
    Method, MemberTable, Parameter, PrimitiveType, Property, Type, TypeCatalog, getter, native,
};
use crate::values::{Value, format_value};

pub mod array;
pub mod collections;
pub mod datetime;
pub mod math;
mod primitives;
pub mod string;

pub use collections::{DictionaryObject, ListObject};

lazy_static::lazy_static! {
    static ref OBJECT_MEMBERS: Arc<MemberTable> = Arc::new(object_members());
    static ref TYPE_MEMBERS: Arc<MemberTable> = Arc::new(type_members());
    /// `Nullable<T>` tables per `T`, so their methods keep a stable identity.
    static ref NULLABLE_MEMBERS: RwLock<HashMap<Type, Arc<MemberTable>>> = RwLock::new(HashMap::new());
}

/// Registers the System types in `catalog`.
pub fn register_system_types(catalog: &TypeCatalog) {
    for p in PrimitiveType::ALL {
        catalog.register_as("System", p.name(), Type::Primitive(p));
    }
    catalog.register_as("System", "String", Type::String);
    catalog.register_as("System", "Object", Type::Object);
    catalog.register_as("System", "DateTime", Type::DateTime);
    catalog.register_as("System", "TimeSpan", Type::TimeSpan);
    catalog.register_as("System", "Type", Type::MetaType);
    catalog.register(Type::Enum(datetime::DAY_OF_WEEK.clone()));
    catalog.register(Type::Class(math::MATH.clone()));
    catalog.register(Type::Class(array::ARRAY.clone()));
    collections::register(catalog);
}

/// Member tables searched for a member of `ty`, most derived first and
/// ending with `object`.
pub fn member_chain(ty: &Type) -> Vec<Arc<MemberTable>> {
    let mut chain = Vec::new();
    match ty {
        Type::Primitive(p) => chain.push(primitives::members(*p)),
        Type::String => chain.push(string::STRING_MEMBERS.clone()),
        Type::DateTime => chain.push(datetime::DATE_TIME_MEMBERS.clone()),
        Type::TimeSpan => chain.push(datetime::TIME_SPAN_MEMBERS.clone()),
        Type::MetaType => chain.push(TYPE_MEMBERS.clone()),
        Type::Nullable(inner) => chain.push(nullable_table(inner)),
        Type::Class(info) => {
            chain.push(info.members());
            let mut base = info.base().cloned();
            while let Some(Type::Class(b)) = base {
                chain.push(b.members());
                base = b.base().cloned();
            }
        }
        _ => {}
    }
    chain.push(OBJECT_MEMBERS.clone());
    chain
}

/// Members of `ty` itself, without inherited ones.
pub fn members_of(ty: &Type) -> Arc<MemberTable> {
    member_chain(ty)
        .into_iter()
        .next()
        .unwrap_or_else(|| OBJECT_MEMBERS.clone())
}

fn object_members() -> MemberTable {
    MemberTable::new()
        .method(Method::instance(
            "ToString",
            vec![],
            Type::String,
            native(|this, _| Ok(Value::string(format_value(this)))),
        ))
        .method(Method::instance(
            "Equals",
            vec![Parameter::new("obj", Type::Object)],
            Type::BOOL,
            native(|this, args| Ok(Value::Bool(this.equals(arg(args, 0)?)))),
        ))
        .method(Method::instance(
            "GetHashCode",
            vec![],
            Type::INT32,
            native(|this, _| Ok(Value::Int32(this.hash_code()))),
        ))
        .method(Method::instance(
            "GetType",
            vec![],
            Type::MetaType,
            native(|this, _| match this {
                Value::Null => Err(Fault::NullReference),
                other => Ok(Value::Type(other.runtime_type())),
            }),
        ))
}

fn type_members() -> MemberTable {
    let type_of = |v: &Value| match v {
        Value::Type(t) => Ok(t.clone()),
        _ => Err(Fault::NullReference),
    };
    MemberTable::new()
        .property(Property::new(
            "Name",
            Type::String,
            getter(move |this| {
                let t = type_of(this)?;
                let full = t.full_name();
                let short = match &t {
                    Type::Class(info) => info.name().to_string(),
                    _ => full.rsplit('.').next().unwrap_or(&full).to_string(),
                };
                Ok(Value::string(short))
            }),
        ))
        .property(Property::new(
            "FullName",
            Type::String,
            getter(move |this| Ok(Value::string(type_of(this)?.full_name()))),
        ))
}

fn nullable_table(inner: &Type) -> Arc<MemberTable> {
    if let Some(table) = NULLABLE_MEMBERS.read().get(inner) {
        return table.clone();
    }
    NULLABLE_MEMBERS
        .write()
        .entry(inner.clone())
        .or_insert_with(|| Arc::new(nullable_members(inner)))
        .clone()
}

/// `HasValue`, `Value` and `GetValueOrDefault` of `Nullable<inner>`. The
/// receiver is the plain value or `null`, so these never fault on `null`
/// except `Value`.
fn nullable_members(inner: &Type) -> MemberTable {
    let default = Value::default_for(inner);
    MemberTable::new()
        .property(Property::new(
            "HasValue",
            Type::BOOL,
            getter(|this| Ok(Value::Bool(!this.is_null()))),
        ))
        .property(Property::new(
            "Value",
            inner.clone(),
            getter(|this| match this {
                Value::Null => Err(Fault::InvalidOperation(
                    "Nullable object must have a value.".to_string(),
                )),
                other => Ok(other.clone()),
            }),
        ))
        .method(Method::instance(
            "GetValueOrDefault",
            vec![],
            inner.clone(),
            native(move |this, _| {
                Ok(if this.is_null() {
                    default.clone()
                } else {
                    this.clone()
                })
            }),
        ))
        .method(Method::instance(
            "GetValueOrDefault",
            vec![Parameter::new("defaultValue", inner.clone())],
            inner.clone(),
            native(|this, args| {
                Ok(if this.is_null() {
                    arg(args, 0)?.clone()
                } else {
                    this.clone()
                })
            }),
        ))
}

// ============================================================================
// Argument helpers shared by the native bodies
// ============================================================================

pub(crate) fn arg(args: &[Value], i: usize) -> Result<&Value, Fault> {
    args.get(i)
        .ok_or_else(|| Fault::Argument(format!("missing argument {}", i)))
}

pub(crate) fn i32_arg(args: &[Value], i: usize) -> Result<i32, Fault> {
    let v = arg(args, i)?;
    v.as_i32()
        .ok_or_else(|| Fault::invalid_cast(v.runtime_type(), "System.Int32"))
}

pub(crate) fn f64_arg(args: &[Value], i: usize) -> Result<f64, Fault> {
    let v = arg(args, i)?;
    v.as_f64()
        .ok_or_else(|| Fault::invalid_cast(v.runtime_type(), "System.Double"))
}

/// A string argument; `null` is an argument error as in the BCL.
pub(crate) fn str_arg(args: &[Value], i: usize) -> Result<&str, Fault> {
    match arg(args, i)? {
        Value::String(s) => Ok(s.as_str()),
        Value::Null => Err(Fault::Argument("Value cannot be null.".to_string())),
        other => Err(Fault::invalid_cast(other.runtime_type(), "System.String")),
    }
}

/// Invokes a delegate argument with one argument and reads a `bool` result.
pub(crate) fn predicate(args: &[Value], i: usize, item: &Value) -> Result<bool, Fault> {
    match arg(args, i)? {
        Value::Delegate(d) => d
            .invoke(core::slice::from_ref(item))?
            .as_bool()
            .ok_or_else(|| Fault::invalid_cast("delegate result", "System.Boolean")),
        Value::Null => Err(Fault::Argument("Value cannot be null.".to_string())),
        other => Err(Fault::invalid_cast(other.runtime_type(), "System.Func")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeResolver;

    #[test]
    fn test_every_chain_ends_with_object() {
        for ty in [Type::INT32, Type::String, Type::nullable(Type::DOUBLE), Type::Object] {
            let chain = member_chain(&ty);
            assert!(chain.last().is_some_and(|t| t.methods_named("GetType").next().is_some()));
        }
    }

    #[test]
    fn test_system_types_resolve() {
        let catalog = TypeCatalog::new();
        assert_eq!(catalog.resolve_type(&["System", "DateTime"], &[]), Some(Type::DateTime));
        assert!(matches!(catalog.resolve_type(&["Math"], &[]), Some(Type::Class(_))));
        assert!(matches!(catalog.resolve_type(&["DayOfWeek"], &[]), Some(Type::Enum(_))));
    }

    #[test]
    fn test_nullable_members_accept_null() {
        let table = nullable_members(&Type::INT32);
        let has_value = table.find_property("HasValue").unwrap();
        assert_eq!((has_value.getter)(&Value::Null).unwrap(), Value::Bool(false));
        let value = table.find_property("Value").unwrap();
        assert!((value.getter)(&Value::Null).is_err());
        let or_default = table.methods_named("GetValueOrDefault").next().unwrap();
        assert_eq!((or_default.body)(&Value::Null, &[]).unwrap(), Value::Int32(0));
    }
}
