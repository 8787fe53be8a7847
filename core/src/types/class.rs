//! Metadata for host classes and enums.
//!
//! A class is declared first (so its members can mention it) and defined
//! once afterwards:
//!
//! ```ignore
//! let point = ClassInfo::declare("Geometry", "Point");
//! point.define(
//!     MemberTable::new()
//!         .field(Property::new("X", Type::INT32, DynamicObject::slot_getter(0)))
//!         .constructor(Method::new(".ctor", params, Type::Class(point.clone()), ctor)),
//! );
//! ```

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use ecow::EcoString;
use once_cell::sync::OnceCell;
use tracing::warn;

use crate::evaluator::Fault;
use crate::types::{PrimitiveType, Type};
use crate::values::Value;

/// Native implementation of a method: `(receiver, arguments) -> result`.
/// The receiver is `Value::Null` for static methods and constructors.
pub type NativeFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync>;

/// Reads a field or property from a receiver (`Value::Null` when static).
pub type Getter = Arc<dyn Fn(&Value) -> Result<Value, Fault> + Send + Sync>;

/// Writes a field or property; used by object initializers.
pub type Setter = Arc<dyn Fn(&Value, Value) -> Result<(), Fault> + Send + Sync>;

pub fn native<F>(f: F) -> NativeFn
where
    F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn getter<F>(f: F) -> Getter
where
    F: Fn(&Value) -> Result<Value, Fault> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn setter<F>(f: F) -> Setter
where
    F: Fn(&Value, Value) -> Result<(), Fault> + Send + Sync + 'static,
{
    Arc::new(f)
}

// ============================================================================
// Classes
// ============================================================================

pub struct ClassInfo {
    namespace: EcoString,
    name: EcoString,
    full_name: EcoString,
    type_arguments: Vec<Type>,
    base: Option<Type>,
    value_type: bool,
    members: OnceCell<Arc<MemberTable>>,
}

pub struct ClassBuilder {
    namespace: EcoString,
    name: EcoString,
    type_arguments: Vec<Type>,
    base: Option<Type>,
    value_type: bool,
}

impl ClassBuilder {
    pub fn base(mut self, base: Type) -> Self {
        self.base = Some(base);
        self
    }

    pub fn type_arguments(mut self, arguments: Vec<Type>) -> Self {
        self.type_arguments = arguments;
        self
    }

    /// Declares a struct; values of it are never null.
    pub fn value_type(mut self) -> Self {
        self.value_type = true;
        self
    }

    pub fn declare(self) -> Arc<ClassInfo> {
        let mut full_name = EcoString::new();
        if !self.namespace.is_empty() {
            full_name.push_str(&self.namespace);
            full_name.push('.');
        }
        full_name.push_str(&self.name);
        if !self.type_arguments.is_empty() {
            let args: Vec<String> = self.type_arguments.iter().map(|t| t.full_name()).collect();
            full_name.push('<');
            full_name.push_str(&args.join(","));
            full_name.push('>');
        }
        Arc::new(ClassInfo {
            namespace: self.namespace,
            name: self.name,
            full_name,
            type_arguments: self.type_arguments,
            base: self.base,
            value_type: self.value_type,
            members: OnceCell::new(),
        })
    }
}

impl ClassInfo {
    pub fn builder(namespace: &str, name: &str) -> ClassBuilder {
        ClassBuilder {
            namespace: namespace.into(),
            name: name.into(),
            type_arguments: Vec::new(),
            base: None,
            value_type: false,
        }
    }

    /// Declares a reference class with no base other than `object`.
    pub fn declare(namespace: &str, name: &str) -> Arc<ClassInfo> {
        Self::builder(namespace, name).declare()
    }

    /// Sets the member table. A class is defined once; later calls are
    /// ignored.
    pub fn define(&self, members: MemberTable) {
        if self.members.set(Arc::new(members)).is_err() {
            warn!(class = %self.full_name, "class defined twice; keeping the first definition");
        }
    }

    pub fn members(&self) -> Arc<MemberTable> {
        self.members.get().cloned().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Name with C#-style type arguments, `List<int>`.
    pub fn display_name(&self) -> String {
        if self.type_arguments.is_empty() {
            return self.name.to_string();
        }
        let args: Vec<String> = self.type_arguments.iter().map(|t| t.to_string()).collect();
        format!("{}<{}>", self.name, args.join(", "))
    }

    pub fn type_arguments(&self) -> &[Type] {
        &self.type_arguments
    }

    pub fn base(&self) -> Option<&Type> {
        self.base.as_ref()
    }

    pub fn is_value_type(&self) -> bool {
        self.value_type
    }

    /// Whether `self` is `target` or inherits from it.
    pub fn derives_from(&self, target: &ClassInfo) -> bool {
        if self.full_name == target.full_name {
            return true;
        }
        match &self.base {
            Some(Type::Class(base)) => base.derives_from(target),
            _ => false,
        }
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassInfo({})", self.full_name)
    }
}

// ============================================================================
// Enums
// ============================================================================

pub struct EnumInfo {
    name: EcoString,
    full_name: EcoString,
    underlying: PrimitiveType,
    members: Vec<(EcoString, i64)>,
}

impl EnumInfo {
    pub fn new(
        namespace: &str,
        name: &str,
        underlying: PrimitiveType,
        members: &[(&str, i64)],
    ) -> Arc<EnumInfo> {
        let full_name = if namespace.is_empty() {
            EcoString::from(name)
        } else {
            ecow::eco_format!("{}.{}", namespace, name)
        };
        Arc::new(EnumInfo {
            name: name.into(),
            full_name,
            underlying,
            members: members.iter().map(|(n, v)| (EcoString::from(*n), *v)).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn underlying(&self) -> PrimitiveType {
        self.underlying
    }

    pub fn members(&self) -> &[(EcoString, i64)] {
        &self.members
    }

    pub fn value_of(&self, member: &str) -> Option<i64> {
        self.members
            .iter()
            .find(|(n, _)| n == member)
            .map(|(_, v)| *v)
    }

    pub fn name_of(&self, raw: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| *v == raw)
            .map(|(n, _)| n.as_str())
    }
}

impl fmt::Debug for EnumInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnumInfo({})", self.full_name)
    }
}

// ============================================================================
// Members
// ============================================================================

/// Identity of a method, stable for the life of the process. Generic
/// instantiations share the identity of their definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u64);

impl MethodId {
    pub fn next() -> MethodId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        MethodId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone)]
pub struct Parameter {
    pub name: EcoString,
    pub ty: Type,
    /// Value used when the argument is omitted.
    pub default: Option<Value>,
}

impl Parameter {
    pub fn new(name: &str, ty: Type) -> Self {
        Parameter {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.name)
    }
}

#[derive(Clone)]
pub struct Method {
    pub id: MethodId,
    pub name: EcoString,
    pub is_static: bool,
    /// Number of method type parameters of the definition.
    pub generic_arity: u8,
    /// Type arguments once instantiated; empty for the definition.
    pub type_arguments: Vec<Type>,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
    pub body: NativeFn,
}

impl Method {
    /// A static method (also used for constructors and operators).
    pub fn new(name: &str, parameters: Vec<Parameter>, return_type: Type, body: NativeFn) -> Self {
        Method {
            id: MethodId::next(),
            name: name.into(),
            is_static: true,
            generic_arity: 0,
            type_arguments: Vec::new(),
            parameters,
            return_type,
            body,
        }
    }

    pub fn instance(
        name: &str,
        parameters: Vec<Parameter>,
        return_type: Type,
        body: NativeFn,
    ) -> Self {
        Method {
            is_static: false,
            ..Method::new(name, parameters, return_type, body)
        }
    }

    /// Marks the method generic; its signature refers to
    /// `Type::GenericParameter(0..arity)`.
    pub fn generic(mut self, arity: u8) -> Self {
        self.generic_arity = arity;
        self
    }

    pub fn is_generic_definition(&self) -> bool {
        self.generic_arity > 0 && self.type_arguments.is_empty()
    }

    /// The signature with `type_arguments` substituted.
    pub fn instantiate(&self, type_arguments: &[Type]) -> Method {
        Method {
            type_arguments: type_arguments.to_vec(),
            parameters: self
                .parameters
                .iter()
                .map(|p| Parameter {
                    ty: p.ty.substitute(type_arguments),
                    ..p.clone()
                })
                .collect(),
            return_type: self.return_type.substitute(type_arguments),
            ..self.clone()
        }
    }

    pub fn required_parameters(&self) -> usize {
        self.parameters.iter().filter(|p| !p.is_optional()).count()
    }
}

/// Methods are equal when they are the same instantiation of the same
/// definition.
impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.type_arguments == other.type_arguments
    }
}

impl Eq for Method {}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.return_type, self.name)?;
        if !self.type_arguments.is_empty() {
            let args: Vec<String> = self.type_arguments.iter().map(|t| t.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        } else if self.generic_arity > 0 {
            let args: Vec<String> = (0..self.generic_arity).map(|i| format!("T{}", i)).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        let params: Vec<String> = self.parameters.iter().map(|p| format!("{:?}", p)).collect();
        write!(f, "({})", params.join(", "))
    }
}

/// A field or property.
#[derive(Clone)]
pub struct Property {
    pub name: EcoString,
    pub ty: Type,
    pub is_static: bool,
    pub getter: Getter,
    pub setter: Option<Setter>,
}

impl Property {
    pub fn new(name: &str, ty: Type, getter: Getter) -> Self {
        Property {
            name: name.into(),
            ty,
            is_static: false,
            getter,
            setter: None,
        }
    }

    pub fn with_setter(mut self, setter: Setter) -> Self {
        self.setter = Some(setter);
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.name)
    }
}

/// `this[...]` accessor.
#[derive(Clone)]
pub struct Indexer {
    pub parameters: Vec<Parameter>,
    pub ty: Type,
    pub getter: NativeFn,
}

impl Indexer {
    pub fn new(parameters: Vec<Parameter>, ty: Type, getter: NativeFn) -> Self {
        Indexer {
            parameters,
            ty,
            getter,
        }
    }
}

impl fmt::Debug for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters.iter().map(|p| format!("{:?}", p)).collect();
        write!(f, "{} this[{}]", self.ty, params.join(", "))
    }
}

/// All members of a type, looked up by name.
#[derive(Clone, Default)]
pub struct MemberTable {
    pub fields: Vec<Property>,
    pub properties: Vec<Property>,
    pub indexers: Vec<Indexer>,
    pub methods: Vec<Arc<Method>>,
    pub constructors: Vec<Arc<Method>>,
    /// User-defined operators (`op_Addition`, ...), static.
    pub operators: Vec<Arc<Method>>,
    /// `op_Implicit` / `op_Explicit`, static.
    pub conversions: Vec<Arc<Method>>,
}

impl MemberTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Property) -> Self {
        self.fields.push(field);
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn indexer(mut self, indexer: Indexer) -> Self {
        self.indexers.push(indexer);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(Arc::new(method));
        self
    }

    pub fn constructor(mut self, method: Method) -> Self {
        self.constructors.push(Arc::new(method));
        self
    }

    pub fn operator(mut self, method: Method) -> Self {
        self.operators.push(Arc::new(method));
        self
    }

    pub fn conversion(mut self, method: Method) -> Self {
        self.conversions.push(Arc::new(method));
        self
    }

    /// Field or property named `name`.
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.fields
            .iter()
            .chain(self.properties.iter())
            .find(|p| p.name == name)
    }

    pub fn methods_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s Arc<Method>> + 's {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn operators_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s Arc<Method>> + 's {
        self.operators.iter().filter(move |m| m.name == name)
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.find_property(name).is_some() || self.methods_named(name).next().is_some()
    }
}
