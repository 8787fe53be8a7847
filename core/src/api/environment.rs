//! Environment builder for registering host types.

use alloc::sync::Arc;

use crate::types::{GenericDefinition, Type, TypeCatalog};

/// Builder for the set of host types visible to expressions.
///
/// System types (`Math`, `String`, `DateTime`, `List<T>`, ...) are always
/// resolvable; the builder only adds to them.
///
/// # Example
///
/// ```
/// use cseval_core::api::{Engine, EngineOptions};
/// use cseval_core::types::{EnumInfo, PrimitiveType, Type};
///
/// let engine = Engine::new(EngineOptions::default(), |env| {
///     let color = EnumInfo::new("Demo", "Color", PrimitiveType::Int32, &[("Red", 0), ("Blue", 1)]);
///     env.register(Type::Enum(color));
/// });
/// let expr = engine.compile("Color.Blue", &[]).unwrap();
/// assert_eq!(expr.run(&[]).unwrap().to_string(), "Blue");
/// ```
pub struct EnvironmentBuilder {
    catalog: TypeCatalog,
}

impl EnvironmentBuilder {
    pub(crate) fn new() -> Self {
        Self {
            catalog: TypeCatalog::empty(),
        }
    }

    /// Register a class or enum under its own namespace and name.
    ///
    /// The type is reachable by its full dotted name and by its short name.
    pub fn register(&mut self, ty: Type) -> &mut Self {
        self.catalog.register(ty);
        self
    }

    /// Register a type under an explicit namespace and name.
    pub fn register_as(&mut self, namespace: &str, name: &str, ty: Type) -> &mut Self {
        self.catalog.register_as(namespace, name, ty);
        self
    }

    /// Register a generic type definition, instantiated on first use.
    pub fn register_generic(&mut self, definition: GenericDefinition) -> &mut Self {
        self.catalog.register_generic(definition);
        self
    }

    pub(crate) fn build(self) -> Arc<TypeCatalog> {
        Arc::new(self.catalog)
    }
}
