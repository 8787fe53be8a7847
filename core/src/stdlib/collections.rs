//! `List<T>` and `Dictionary<TKey, TValue>`.
//!
//! Both are generic definitions in the catalog; each instantiation gets its
//! own class with the element types substituted into its members.

use alloc::sync::{Arc, Weak};
use core::any::Any;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::evaluator::Fault;
use crate::stdlib::{arg, i32_arg};
use crate::types::{
    ClassInfo, GenericDefinition, Indexer, Method, MemberTable, Parameter, Property, Type,
    TypeCatalog, getter, native,
};
use crate::values::{HostObject, Value, format_value};

const NAMESPACE: &str = "System.Collections.Generic";

pub(super) fn register(catalog: &TypeCatalog) {
    catalog.register_generic(GenericDefinition::new(NAMESPACE, "List", 1, |args| {
        Type::Class(list_class(args[0].clone()))
    }));
    catalog.register_generic(GenericDefinition::new(NAMESPACE, "Dictionary", 2, |args| {
        Type::Class(dictionary_class(args[0].clone(), args[1].clone()))
    }));
}

fn constructor_of<F>(class: &Arc<ClassInfo>, make: F) -> impl Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static
where
    F: Fn(Arc<ClassInfo>) -> Value + Send + Sync + 'static,
{
    let weak: Weak<ClassInfo> = Arc::downgrade(class);
    move |_, _| {
        let class = weak
            .upgrade()
            .ok_or_else(|| Fault::InvalidOperation("class metadata was dropped".to_string()))?;
        Ok(make(class))
    }
}

// ============================================================================
// List<T>
// ============================================================================

pub struct ListObject {
    class: Arc<ClassInfo>,
    items: RwLock<Vec<Value>>,
}

impl ListObject {
    pub fn new(class: Arc<ClassInfo>, items: Vec<Value>) -> Self {
        ListObject {
            class,
            items: RwLock::new(items),
        }
    }

    pub fn items(&self) -> Vec<Value> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&self, value: Value) {
        self.items.write().push(value);
    }

    fn of(receiver: &Value) -> Result<&ListObject, Fault> {
        match receiver {
            Value::Null => Err(Fault::NullReference),
            other => other
                .downcast::<ListObject>()
                .ok_or_else(|| Fault::invalid_cast(other.runtime_type(), "List")),
        }
    }
}

impl HostObject for ListObject {
    fn class(&self) -> &Arc<ClassInfo> {
        &self.class
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The class of `List<element>`.
pub fn list_class(element: Type) -> Arc<ClassInfo> {
    let class = ClassInfo::builder(NAMESPACE, "List")
        .type_arguments(vec![element.clone()])
        .declare();
    let this_type = Type::Class(class.clone());
    let item = || Parameter::new("item", element.clone());

    let members = MemberTable::new()
        .constructor(Method::new(
            ".ctor",
            vec![],
            this_type.clone(),
            native(constructor_of(&class, |c| {
                Value::Object(Arc::new(ListObject::new(c, Vec::new())))
            })),
        ))
        .constructor(Method::new(
            ".ctor",
            vec![Parameter::new("capacity", Type::INT32)],
            this_type.clone(),
            native(constructor_of(&class, |c| {
                Value::Object(Arc::new(ListObject::new(c, Vec::new())))
            })),
        ))
        .property(Property::new(
            "Count",
            Type::INT32,
            getter(|this| Ok(Value::Int32(ListObject::of(this)?.len() as i32))),
        ))
        .indexer(Indexer::new(
            vec![Parameter::new("index", Type::INT32)],
            element.clone(),
            native(|this, args| {
                let list = ListObject::of(this)?;
                let i = i32_arg(args, 0)?;
                let items = list.items.read();
                usize::try_from(i)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .ok_or(Fault::IndexOutOfRange)
            }),
        ))
        .method(Method::instance(
            "Add",
            vec![item()],
            Type::Void,
            native(|this, args| {
                ListObject::of(this)?.push(arg(args, 0)?.clone());
                Ok(Value::Null)
            }),
        ))
        .method(Method::instance(
            "Contains",
            vec![item()],
            Type::BOOL,
            native(|this, args| {
                let needle = arg(args, 0)?;
                let found = ListObject::of(this)?.items.read().iter().any(|v| v.equals(needle));
                Ok(Value::Bool(found))
            }),
        ))
        .method(Method::instance(
            "IndexOf",
            vec![item()],
            Type::INT32,
            native(|this, args| {
                let needle = arg(args, 0)?;
                let index = ListObject::of(this)?.items.read().iter().position(|v| v.equals(needle));
                Ok(Value::Int32(index.map_or(-1, |i| i as i32)))
            }),
        ))
        .method(Method::instance(
            "Remove",
            vec![item()],
            Type::BOOL,
            native(|this, args| {
                let needle = arg(args, 0)?;
                let mut items = ListObject::of(this)?.items.write();
                let index = items.iter().position(|v| v.equals(needle));
                if let Some(i) = index {
                    items.remove(i);
                }
                Ok(Value::Bool(index.is_some()))
            }),
        ))
        .method(Method::instance(
            "Clear",
            vec![],
            Type::Void,
            native(|this, _| {
                ListObject::of(this)?.items.write().clear();
                Ok(Value::Null)
            }),
        ))
        .method(Method::instance(
            "ToArray",
            vec![],
            Type::array(element.clone()),
            native({
                let element = element.clone();
                move |this, _| Ok(Value::array(element.clone(), ListObject::of(this)?.items()))
            }),
        ));
    class.define(members);
    class
}

// ============================================================================
// Dictionary<TKey, TValue>
// ============================================================================

#[derive(Default)]
struct Entries {
    order: Vec<(Value, Value)>,
    index: HashMap<Value, usize>,
}

pub struct DictionaryObject {
    class: Arc<ClassInfo>,
    entries: RwLock<Entries>,
}

impl DictionaryObject {
    pub fn new(class: Arc<ClassInfo>) -> Self {
        DictionaryObject {
            class,
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds an entry; a duplicate key is an argument error.
    pub fn insert(&self, key: Value, value: Value) -> Result<(), Fault> {
        if key.is_null() {
            return Err(Fault::Argument("key cannot be null".to_string()));
        }
        let mut entries = self.entries.write();
        if entries.index.contains_key(&key) {
            return Err(Fault::Argument(format!(
                "an item with the same key has already been added. Key: {}",
                format_value(&key)
            )));
        }
        let position = entries.order.len();
        entries.index.insert(key.clone(), position);
        entries.order.push((key, value));
        Ok(())
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        let entries = self.entries.read();
        let position = *entries.index.get(key)?;
        entries.order.get(position).map(|(_, v)| v.clone())
    }

    fn of(receiver: &Value) -> Result<&DictionaryObject, Fault> {
        match receiver {
            Value::Null => Err(Fault::NullReference),
            other => other
                .downcast::<DictionaryObject>()
                .ok_or_else(|| Fault::invalid_cast(other.runtime_type(), "Dictionary")),
        }
    }
}

impl HostObject for DictionaryObject {
    fn class(&self) -> &Arc<ClassInfo> {
        &self.class
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The class of `Dictionary<key, value>`.
pub fn dictionary_class(key: Type, value: Type) -> Arc<ClassInfo> {
    let class = ClassInfo::builder(NAMESPACE, "Dictionary")
        .type_arguments(vec![key.clone(), value.clone()])
        .declare();
    let this_type = Type::Class(class.clone());
    let default_value = Value::default_for(&value);

    let members = MemberTable::new()
        .constructor(Method::new(
            ".ctor",
            vec![],
            this_type,
            native(constructor_of(&class, |c| {
                Value::Object(Arc::new(DictionaryObject::new(c)))
            })),
        ))
        .property(Property::new(
            "Count",
            Type::INT32,
            getter(|this| Ok(Value::Int32(DictionaryObject::of(this)?.len() as i32))),
        ))
        .indexer(Indexer::new(
            vec![Parameter::new("key", key.clone())],
            value.clone(),
            native(|this, args| {
                let key = arg(args, 0)?;
                DictionaryObject::of(this)?.get(key).ok_or_else(|| {
                    Fault::Argument(format!(
                        "the given key '{}' was not present in the dictionary",
                        format_value(key)
                    ))
                })
            }),
        ))
        .method(Method::instance(
            "Add",
            vec![Parameter::new("key", key.clone()), Parameter::new("value", value.clone())],
            Type::Void,
            native(|this, args| {
                DictionaryObject::of(this)?.insert(arg(args, 0)?.clone(), arg(args, 1)?.clone())?;
                Ok(Value::Null)
            }),
        ))
        .method(Method::instance(
            "ContainsKey",
            vec![Parameter::new("key", key.clone())],
            Type::BOOL,
            native(|this, args| {
                let key = arg(args, 0)?;
                Ok(Value::Bool(DictionaryObject::of(this)?.get(key).is_some()))
            }),
        ))
        .method(Method::instance(
            "ContainsValue",
            vec![Parameter::new("value", value.clone())],
            Type::BOOL,
            native(|this, args| {
                let needle = arg(args, 0)?;
                let dict = DictionaryObject::of(this)?;
                let found = dict.entries.read().order.iter().any(|(_, v)| v.equals(needle));
                Ok(Value::Bool(found))
            }),
        ))
        .method(Method::instance(
            "GetValueOrDefault",
            vec![Parameter::new("key", key)],
            value,
            native(move |this, args| {
                let key = arg(args, 0)?;
                Ok(DictionaryObject::of(this)?
                    .get(key)
                    .unwrap_or_else(|| default_value.clone()))
            }),
        ));
    class.define(members);
    class
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_members() {
        let class = list_class(Type::INT32);
        let members = class.members();
        let ctor = &members.constructors[0];
        let list = (ctor.body)(&Value::Null, &[]).unwrap();
        let add = members.methods_named("Add").next().unwrap();
        (add.body)(&list, &[Value::Int32(4)]).unwrap();
        (add.body)(&list, &[Value::Int32(5)]).unwrap();

        let count = members.find_property("Count").unwrap();
        assert_eq!((count.getter)(&list).unwrap(), Value::Int32(2));
        let indexer = &members.indexers[0];
        assert_eq!((indexer.getter)(&list, &[Value::Int32(1)]).unwrap(), Value::Int32(5));
        assert_eq!(
            (indexer.getter)(&list, &[Value::Int32(2)]),
            Err(Fault::IndexOutOfRange)
        );
        assert_eq!(class.full_name(), "System.Collections.Generic.List<System.Int32>");
    }

    #[test]
    fn test_dictionary_rejects_duplicate_keys() {
        let class = dictionary_class(Type::String, Type::INT32);
        let dict = DictionaryObject::new(class);
        dict.insert(Value::string("a"), Value::Int32(1)).unwrap();
        assert!(dict.insert(Value::string("a"), Value::Int32(2)).is_err());
        assert_eq!(dict.get(&Value::string("a")), Some(Value::Int32(1)));
        assert_eq!(dict.len(), 1);
    }
}
