//! Type resolution by dotted name.

use alloc::sync::Arc;

use ecow::EcoString;
use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use tracing::debug;

use crate::lexer::type_keyword_alias;
use crate::types::Type;

/// Resolves type names written in expressions.
///
/// `path` is the dotted name split on `.` (`["System", "Math"]`);
/// `type_arguments` are the already-resolved arguments of a generic name.
pub trait TypeResolver: Send + Sync {
    fn resolve_type(&self, path: &[&str], type_arguments: &[Type]) -> Option<Type>;

    /// Whether `path` names a namespace, so `System.Collections` can be the
    /// prefix of a type name.
    fn is_namespace(&self, _path: &[&str]) -> bool {
        false
    }
}

/// Builds the class for one instantiation of a generic type definition.
pub type GenericInstantiator = Arc<dyn Fn(&[Type]) -> Type + Send + Sync>;

pub struct GenericDefinition {
    pub namespace: EcoString,
    pub name: EcoString,
    pub arity: usize,
    pub instantiate: GenericInstantiator,
}

impl GenericDefinition {
    pub fn new<F>(namespace: &str, name: &str, arity: usize, instantiate: F) -> Self
    where
        F: Fn(&[Type]) -> Type + Send + Sync + 'static,
    {
        GenericDefinition {
            namespace: namespace.into(),
            name: name.into(),
            arity,
            instantiate: Arc::new(instantiate),
        }
    }

    fn full_name(&self) -> EcoString {
        qualified(&self.namespace, &self.name)
    }
}

fn qualified(namespace: &str, name: &str) -> EcoString {
    if namespace.is_empty() {
        name.into()
    } else {
        ecow::eco_format!("{}.{}", namespace, name)
    }
}

/// The default [`TypeResolver`]: types registered by full and short name,
/// plus generic definitions instantiated on demand and cached.
#[derive(Default)]
pub struct TypeCatalog {
    types: RwLock<HashMap<EcoString, Type>>,
    generics: RwLock<HashMap<(EcoString, usize), Arc<GenericDefinition>>>,
    instances: RwLock<HashMap<EcoString, Type>>,
    namespaces: RwLock<HashSet<EcoString>>,
}

impl TypeCatalog {
    /// A catalog with no types at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A catalog holding the System types.
    pub fn new() -> Self {
        let catalog = Self::empty();
        crate::stdlib::register_system_types(&catalog);
        catalog
    }

    fn add_namespaces(&self, namespace: &str) {
        if namespace.is_empty() {
            return;
        }
        let mut namespaces = self.namespaces.write();
        let mut prefix = EcoString::new();
        for part in namespace.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(part);
            namespaces.insert(prefix.clone());
        }
    }

    /// Registers `ty` under `namespace.name` and under `name` alone. A short
    /// name already taken keeps its first owner.
    pub fn register_as(&self, namespace: &str, name: &str, ty: Type) {
        self.add_namespaces(namespace);
        let mut types = self.types.write();
        types.insert(qualified(namespace, name), ty.clone());
        types.entry(EcoString::from(name)).or_insert(ty);
    }

    /// Registers a class or enum under its own namespace and name.
    pub fn register(&self, ty: Type) {
        let full = ty.full_name();
        let (namespace, name) = full.rsplit_once('.').unwrap_or(("", full.as_str()));
        self.register_as(namespace, name, ty);
    }

    pub fn register_generic(&self, definition: GenericDefinition) {
        self.add_namespaces(&definition.namespace);
        let definition = Arc::new(definition);
        let mut generics = self.generics.write();
        generics.insert(
            (definition.full_name(), definition.arity),
            definition.clone(),
        );
        generics
            .entry((definition.name.clone(), definition.arity))
            .or_insert(definition);
    }

    pub fn lookup(&self, name: &str) -> Option<Type> {
        self.types.read().get(name).cloned()
    }

    fn instantiate(&self, name: &str, arguments: &[Type]) -> Option<Type> {
        let definition = self
            .generics
            .read()
            .get(&(EcoString::from(name), arguments.len()))
            .cloned()?;
        let args: Vec<String> = arguments.iter().map(|t| t.full_name()).collect();
        let key = ecow::eco_format!("{}<{}>", definition.full_name(), args.join(","));

        if let Some(ty) = self.instances.read().get(&key) {
            return Some(ty.clone());
        }
        // The instantiator may resolve other types through this catalog, so
        // no lock is held while it runs. If two threads race, the first
        // instance stored is the one everybody gets.
        let ty = (definition.instantiate)(arguments);
        debug!(instance = %key, "instantiated generic type");
        Some(self.instances.write().entry(key).or_insert(ty).clone())
    }
}

impl TypeResolver for TypeCatalog {
    fn resolve_type(&self, path: &[&str], type_arguments: &[Type]) -> Option<Type> {
        let joined = path.join(".");
        if type_arguments.is_empty() {
            if let [single] = path {
                if let Some(full) = type_keyword_alias(single) {
                    return self.lookup(full);
                }
            }
            return self.lookup(&joined);
        }

        match (joined.as_str(), type_arguments) {
            ("Nullable" | "System.Nullable", [inner]) => {
                return (inner.is_value_type() && !inner.is_nullable())
                    .then(|| Type::nullable(inner.clone()));
            }
            ("Func" | "System.Func", [parameters @ .., result]) => {
                return Some(Type::function(parameters.to_vec(), result.clone()));
            }
            ("Action" | "System.Action", parameters) => {
                return Some(Type::function(parameters.to_vec(), Type::Void));
            }
            _ => {}
        }
        self.instantiate(&joined, type_arguments)
    }

    fn is_namespace(&self, path: &[&str]) -> bool {
        self.namespaces.read().contains(path.join(".").as_str())
    }
}

impl<T: TypeResolver + ?Sized> TypeResolver for Arc<T> {
    fn resolve_type(&self, path: &[&str], type_arguments: &[Type]) -> Option<Type> {
        (**self).resolve_type(path, type_arguments)
    }

    fn is_namespace(&self, path: &[&str]) -> bool {
        (**self).is_namespace(path)
    }
}

lazy_static::lazy_static! {
    /// System types, consulted after the engine's own resolver.
    pub static ref SYSTEM_CATALOG: TypeCatalog = TypeCatalog::new();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassInfo, MemberTable, PrimitiveType, Property, getter};
    use crate::values::Value;

    #[test]
    fn test_keyword_aliases_and_short_names() {
        let catalog = TypeCatalog::new();
        assert_eq!(catalog.resolve_type(&["int"], &[]), Some(Type::INT32));
        assert_eq!(catalog.resolve_type(&["System", "Int32"], &[]), Some(Type::INT32));
        assert_eq!(catalog.resolve_type(&["Int32"], &[]), Some(Type::INT32));
        assert_eq!(catalog.resolve_type(&["string"], &[]), Some(Type::String));
        assert_eq!(catalog.resolve_type(&["Nope"], &[]), None);
        assert!(catalog.is_namespace(&["System"]));
        assert!(catalog.is_namespace(&["System", "Collections"]));
        assert!(!catalog.is_namespace(&["System", "Math"]));
    }

    #[test]
    fn test_generic_instances_are_cached() {
        let catalog = TypeCatalog::new();
        let a = catalog.resolve_type(&["List"], &[Type::INT32]).unwrap();
        let b = catalog
            .resolve_type(&["System", "Collections", "Generic", "List"], &[Type::INT32])
            .unwrap();
        match (&a, &b) {
            (Type::Class(x), Type::Class(y)) => assert!(Arc::ptr_eq(x, y)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(a.to_string(), "List<int>");
    }

    #[test]
    fn test_instantiator_can_resolve_through_catalog() {
        let catalog = Arc::new(TypeCatalog::new());
        let weak = Arc::downgrade(&catalog);
        catalog.register_generic(GenericDefinition::new("Tests", "Bag", 1, move |args| {
            let Some(catalog) = weak.upgrade() else {
                return Type::Object;
            };
            let list = catalog.resolve_type(&["List"], args).unwrap_or(Type::Object);
            let class = ClassInfo::declare("Tests", "Bag");
            class.define(MemberTable::new().field(Property::new("Items", list, getter(|_| Ok(Value::Null)))));
            Type::Class(class)
        }));

        let bag = catalog.resolve_type(&["Bag"], &[Type::INT32]).unwrap();
        let Type::Class(class) = &bag else {
            panic!("unexpected {:?}", bag);
        };
        let members = class.members();
        assert_eq!(members.fields[0].ty.to_string(), "List<int>");
        let again = catalog.resolve_type(&["Tests", "Bag"], &[Type::INT32]).unwrap();
        match (&bag, &again) {
            (Type::Class(x), Type::Class(y)) => assert!(Arc::ptr_eq(x, y)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nullable_and_func() {
        let catalog = TypeCatalog::new();
        assert_eq!(
            catalog.resolve_type(&["Nullable"], &[Type::INT32]),
            Some(Type::nullable(Type::Primitive(PrimitiveType::Int32)))
        );
        assert_eq!(catalog.resolve_type(&["Nullable"], &[Type::String]), None);
        assert_eq!(
            catalog.resolve_type(&["Func"], &[Type::INT32, Type::BOOL]),
            Some(Type::function(vec![Type::INT32], Type::BOOL))
        );
    }
}
