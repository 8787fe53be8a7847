use alloc::sync::Arc;
use core::fmt::{self, Display};
use core::hash::{Hash, Hasher};

use crate::types::class::{ClassInfo, EnumInfo};
use crate::types::primitive::PrimitiveType;

/// Static type of an expression.
///
/// Host classes and enums are shared by reference and compared by full name;
/// everything else is structural.
#[derive(Clone)]
pub enum Type {
    Primitive(PrimitiveType),
    String,
    Object,
    Void,
    DateTime,
    TimeSpan,
    /// `System.Type`, the type of `typeof(...)` and `GetType()`.
    MetaType,

    /// `Nullable<T>` over a value type.
    Nullable(Arc<Type>),
    /// Single-dimensional zero-based array.
    Array(Arc<Type>),

    Class(Arc<ClassInfo>),
    Enum(Arc<EnumInfo>),

    /// Delegate type (`Func<...>`), also the type of bound lambdas.
    Function(Arc<FunctionType>),

    /// Type of the `null` literal before conversion.
    Null,

    /// The n-th type parameter of a generic method signature.
    GenericParameter(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub parameters: Vec<Type>,
    pub return_type: Type,
}

impl FunctionType {
    pub fn new(parameters: Vec<Type>, return_type: Type) -> Self {
        FunctionType {
            parameters,
            return_type,
        }
    }
}

impl Type {
    pub const BOOL: Type = Type::Primitive(PrimitiveType::Bool);
    pub const CHAR: Type = Type::Primitive(PrimitiveType::Char);
    pub const SBYTE: Type = Type::Primitive(PrimitiveType::SByte);
    pub const BYTE: Type = Type::Primitive(PrimitiveType::Byte);
    pub const INT16: Type = Type::Primitive(PrimitiveType::Int16);
    pub const UINT16: Type = Type::Primitive(PrimitiveType::UInt16);
    pub const INT32: Type = Type::Primitive(PrimitiveType::Int32);
    pub const UINT32: Type = Type::Primitive(PrimitiveType::UInt32);
    pub const INT64: Type = Type::Primitive(PrimitiveType::Int64);
    pub const UINT64: Type = Type::Primitive(PrimitiveType::UInt64);
    pub const SINGLE: Type = Type::Primitive(PrimitiveType::Single);
    pub const DOUBLE: Type = Type::Primitive(PrimitiveType::Double);
    pub const DECIMAL: Type = Type::Primitive(PrimitiveType::Decimal);

    pub fn nullable(inner: Type) -> Type {
        Type::Nullable(Arc::new(inner))
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Arc::new(element))
    }

    pub fn function(parameters: Vec<Type>, return_type: Type) -> Type {
        Type::Function(Arc::new(FunctionType::new(parameters, return_type)))
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_primitive(&self, p: PrimitiveType) -> bool {
        self.primitive() == Some(p)
    }

    pub fn is_numeric(&self) -> bool {
        self.primitive().is_some_and(|p| p.is_numeric())
    }

    pub fn is_integral(&self) -> bool {
        self.primitive().is_some_and(|p| p.is_integral())
    }

    pub fn is_bool(&self) -> bool {
        self.is_primitive(PrimitiveType::Bool)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::String)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_value_type(&self) -> bool {
        match self {
            Type::Primitive(_)
            | Type::DateTime
            | Type::TimeSpan
            | Type::Nullable(_)
            | Type::Enum(_) => true,
            Type::Class(info) => info.is_value_type(),
            _ => false,
        }
    }

    pub fn is_reference_type(&self) -> bool {
        !self.is_value_type() && !matches!(self, Type::Void | Type::GenericParameter(_))
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_))
    }

    /// Whether `null` is a valid value of this type.
    pub fn can_be_null(&self) -> bool {
        self.is_nullable() || self.is_reference_type()
    }

    /// `T` for `Nullable<T>`, `None` otherwise.
    pub fn nullable_underlying(&self) -> Option<&Type> {
        match self {
            Type::Nullable(inner) => Some(inner),
            _ => None,
        }
    }

    /// `T` for `Nullable<T>`, the type itself otherwise.
    pub fn non_nullable(&self) -> &Type {
        self.nullable_underlying().unwrap_or(self)
    }

    /// `Nullable<T>` for a non-nullable value type, the type itself otherwise.
    pub fn make_nullable(&self) -> Type {
        if self.is_value_type() && !self.is_nullable() {
            Type::nullable(self.clone())
        } else {
            self.clone()
        }
    }

    pub fn array_element(&self) -> Option<&Type> {
        match self {
            Type::Array(e) => Some(e),
            _ => None,
        }
    }

    pub fn class_info(&self) -> Option<&Arc<ClassInfo>> {
        match self {
            Type::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn enum_info(&self) -> Option<&Arc<EnumInfo>> {
        match self {
            Type::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn function_type(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The primitive used for arithmetic on this type: the type itself for
    /// primitives, the underlying type for enums.
    pub fn arithmetic_primitive(&self) -> Option<PrimitiveType> {
        match self {
            Type::Primitive(p) => Some(*p),
            Type::Enum(e) => Some(e.underlying()),
            _ => None,
        }
    }

    pub fn contains_generic_parameter(&self) -> bool {
        match self {
            Type::GenericParameter(_) => true,
            Type::Nullable(t) | Type::Array(t) => t.contains_generic_parameter(),
            Type::Function(f) => {
                f.parameters.iter().any(|p| p.contains_generic_parameter())
                    || f.return_type.contains_generic_parameter()
            }
            _ => false,
        }
    }

    /// Replaces generic parameters by `arguments`.
    pub fn substitute(&self, arguments: &[Type]) -> Type {
        match self {
            Type::GenericParameter(i) => arguments
                .get(*i as usize)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            Type::Nullable(t) => Type::nullable(t.substitute(arguments)),
            Type::Array(t) => Type::array(t.substitute(arguments)),
            Type::Function(f) => Type::function(
                f.parameters.iter().map(|p| p.substitute(arguments)).collect(),
                f.return_type.substitute(arguments),
            ),
            _ => self.clone(),
        }
    }

    /// Whether an implicit reference conversion (or identity) exists from
    /// `source` to `self`.
    pub fn is_reference_assignable_from(&self, source: &Type) -> bool {
        if self == source {
            return true;
        }
        match (self, source) {
            (_, Type::Null) => self.can_be_null(),
            (Type::Object, s) => s.is_reference_type(),
            (Type::Class(target), Type::Class(s)) => s.derives_from(target),
            (Type::Array(t), Type::Array(s)) => {
                t.is_reference_type() && s.is_reference_type() && t.is_reference_assignable_from(s)
            }
            _ => false,
        }
    }

    /// Whether `source` converts to `self` by boxing (value type to `object`).
    pub fn is_boxing_target_of(&self, source: &Type) -> bool {
        matches!(self, Type::Object) && source.is_value_type()
    }

    pub fn full_name(&self) -> String {
        match self {
            Type::Primitive(p) => p.full_name().to_string(),
            Type::String => "System.String".to_string(),
            Type::Object => "System.Object".to_string(),
            Type::Void => "System.Void".to_string(),
            Type::DateTime => "System.DateTime".to_string(),
            Type::TimeSpan => "System.TimeSpan".to_string(),
            Type::MetaType => "System.Type".to_string(),
            Type::Nullable(t) => format!("System.Nullable<{}>", t.full_name()),
            Type::Array(t) => format!("{}[]", t.full_name()),
            Type::Class(c) => c.full_name().to_string(),
            Type::Enum(e) => e.full_name().to_string(),
            Type::Function(f) => {
                let mut parts: Vec<String> = f.parameters.iter().map(|p| p.full_name()).collect();
                if f.return_type.is_void() {
                    if parts.is_empty() {
                        return "System.Action".to_string();
                    }
                    format!("System.Action<{}>", parts.join(","))
                } else {
                    parts.push(f.return_type.full_name());
                    format!("System.Func<{}>", parts.join(","))
                }
            }
            Type::Null => "<null>".to_string(),
            Type::GenericParameter(i) => format!("T{}", i),
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::String, Type::String)
            | (Type::Object, Type::Object)
            | (Type::Void, Type::Void)
            | (Type::DateTime, Type::DateTime)
            | (Type::TimeSpan, Type::TimeSpan)
            | (Type::MetaType, Type::MetaType)
            | (Type::Null, Type::Null) => true,
            (Type::Nullable(a), Type::Nullable(b)) | (Type::Array(a), Type::Array(b)) => a == b,
            (Type::Class(a), Type::Class(b)) => Arc::ptr_eq(a, b) || a.full_name() == b.full_name(),
            (Type::Enum(a), Type::Enum(b)) => Arc::ptr_eq(a, b) || a.full_name() == b.full_name(),
            (Type::Function(a), Type::Function(b)) => a == b,
            (Type::GenericParameter(a), Type::GenericParameter(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name().hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p.keyword()),
            Type::String => write!(f, "string"),
            Type::Object => write!(f, "object"),
            Type::Void => write!(f, "void"),
            Type::DateTime => write!(f, "DateTime"),
            Type::TimeSpan => write!(f, "TimeSpan"),
            Type::MetaType => write!(f, "Type"),
            Type::Nullable(t) => write!(f, "{}?", t),
            Type::Array(t) => write!(f, "{}[]", t),
            Type::Class(c) => write!(f, "{}", c.display_name()),
            Type::Enum(e) => write!(f, "{}", e.name()),
            Type::Function(func) => {
                let mut parts: Vec<String> = func.parameters.iter().map(|p| p.to_string()).collect();
                if func.return_type.is_void() {
                    if parts.is_empty() {
                        return write!(f, "Action");
                    }
                    write!(f, "Action<{}>", parts.join(", "))
                } else {
                    parts.push(func.return_type.to_string());
                    write!(f, "Func<{}>", parts.join(", "))
                }
            }
            Type::Null => write!(f, "<null>"),
            Type::GenericParameter(i) => write!(f, "T{}", i),
        }
    }
}
