use alloc::sync::Arc;
use core::fmt;
use core::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use ecow::EcoString;

use crate::types::{EnumInfo, PrimitiveType, Type};
use crate::values::decimal::Decimal;
use crate::values::format::format_value;
use crate::values::host::{Callable, HostObject};

/// A runtime value.
///
/// Value types are stored inline; a `Nullable<T>` holding a value is the
/// plain `T`, and an empty one is `Null`, matching CLR boxing.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// UTF-16 code unit.
    Char(u16),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    String(EcoString),
    DateTime(NaiveDateTime),
    TimeSpan(TimeDelta),
    Enum(Arc<EnumInfo>, i64),
    Array(Arc<ArrayValue>),
    Object(Arc<dyn HostObject>),
    Delegate(Arc<dyn Callable>),
    Type(Type),
}

/// Single-dimensional array contents.
pub struct ArrayValue {
    pub element: Type,
    pub items: Vec<Value>,
}

impl ArrayValue {
    pub fn new(element: Type, items: Vec<Value>) -> Self {
        ArrayValue { element, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Value {
    pub fn string(s: impl Into<EcoString>) -> Value {
        Value::String(s.into())
    }

    pub fn array(element: Type, items: Vec<Value>) -> Value {
        Value::Array(Arc::new(ArrayValue::new(element, items)))
    }

    pub fn char(c: char) -> Value {
        let mut buf = [0u16; 2];
        Value::Char(c.encode_utf16(&mut buf)[0])
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The default value of `ty` (`default(T)`).
    pub fn default_for(ty: &Type) -> Value {
        match ty {
            Type::Primitive(p) => Self::zero(*p),
            Type::DateTime => Value::DateTime(min_date_time()),
            Type::TimeSpan => Value::TimeSpan(TimeDelta::zero()),
            Type::Enum(info) => Value::Enum(info.clone(), 0),
            _ => Value::Null,
        }
    }

    pub fn zero(p: PrimitiveType) -> Value {
        match p {
            PrimitiveType::Bool => Value::Bool(false),
            PrimitiveType::Char => Value::Char(0),
            PrimitiveType::SByte => Value::SByte(0),
            PrimitiveType::Byte => Value::Byte(0),
            PrimitiveType::Int16 => Value::Int16(0),
            PrimitiveType::UInt16 => Value::UInt16(0),
            PrimitiveType::Int32 => Value::Int32(0),
            PrimitiveType::UInt32 => Value::UInt32(0),
            PrimitiveType::Int64 => Value::Int64(0),
            PrimitiveType::UInt64 => Value::UInt64(0),
            PrimitiveType::Single => Value::Single(0.0),
            PrimitiveType::Double => Value::Double(0.0),
            PrimitiveType::Decimal => Value::Decimal(Decimal::ZERO),
        }
    }

    /// An integral (or char) value of kind `p`; `None` when `v` is out of
    /// range or `p` is not integral.
    pub fn from_integral(p: PrimitiveType, v: i128) -> Option<Value> {
        let (min, max) = p.integral_range()?;
        if v < min || v > max {
            return None;
        }
        Some(match p {
            PrimitiveType::Char => Value::Char(v as u16),
            PrimitiveType::SByte => Value::SByte(v as i8),
            PrimitiveType::Byte => Value::Byte(v as u8),
            PrimitiveType::Int16 => Value::Int16(v as i16),
            PrimitiveType::UInt16 => Value::UInt16(v as u16),
            PrimitiveType::Int32 => Value::Int32(v as i32),
            PrimitiveType::UInt32 => Value::UInt32(v as u32),
            PrimitiveType::Int64 => Value::Int64(v as i64),
            PrimitiveType::UInt64 => Value::UInt64(v as u64),
            _ => return None,
        })
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveType> {
        Some(match self {
            Value::Bool(_) => PrimitiveType::Bool,
            Value::Char(_) => PrimitiveType::Char,
            Value::SByte(_) => PrimitiveType::SByte,
            Value::Byte(_) => PrimitiveType::Byte,
            Value::Int16(_) => PrimitiveType::Int16,
            Value::UInt16(_) => PrimitiveType::UInt16,
            Value::Int32(_) => PrimitiveType::Int32,
            Value::UInt32(_) => PrimitiveType::UInt32,
            Value::Int64(_) => PrimitiveType::Int64,
            Value::UInt64(_) => PrimitiveType::UInt64,
            Value::Single(_) => PrimitiveType::Single,
            Value::Double(_) => PrimitiveType::Double,
            Value::Decimal(_) => PrimitiveType::Decimal,
            _ => return None,
        })
    }

    /// Exact runtime type; `Type::Null` for null.
    pub fn runtime_type(&self) -> Type {
        if let Some(p) = self.primitive_kind() {
            return Type::Primitive(p);
        }
        match self {
            Value::Null => Type::Null,
            Value::String(_) => Type::String,
            Value::DateTime(_) => Type::DateTime,
            Value::TimeSpan(_) => Type::TimeSpan,
            Value::Enum(info, _) => Type::Enum(info.clone()),
            Value::Array(a) => Type::array(a.element.clone()),
            Value::Object(o) => Type::Class(o.class().clone()),
            Value::Delegate(d) => d.function_type(),
            Value::Type(_) => Type::MetaType,
            _ => Type::Object,
        }
    }

    /// Whether this value is an instance of `ty` (the `is` operator).
    pub fn is_instance_of(&self, ty: &Type) -> bool {
        if self.is_null() {
            return false;
        }
        let target = ty.non_nullable();
        let actual = self.runtime_type();
        match target {
            Type::Object => true,
            _ => actual == *target || target.is_reference_assignable_from(&actual),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Arc<ArrayValue>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn HostObject>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Downcasts a host object to its concrete type.
    pub fn downcast<T: HostObject + 'static>(&self) -> Option<&T> {
        self.as_object()?.as_any().downcast_ref::<T>()
    }

    /// Integral value widened to `i128`; chars and enums included.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match self {
            Value::Char(v) => *v as i128,
            Value::SByte(v) => *v as i128,
            Value::Byte(v) => *v as i128,
            Value::Int16(v) => *v as i128,
            Value::UInt16(v) => *v as i128,
            Value::Int32(v) => *v as i128,
            Value::UInt32(v) => *v as i128,
            Value::Int64(v) => *v as i128,
            Value::UInt64(v) => *v as i128,
            Value::Enum(_, v) => *v as i128,
            _ => return None,
        })
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            other => other.as_i128().and_then(|v| i32::try_from(v).ok()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// Any numeric value as a double.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Single(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Decimal(d) => Some(d.to_f64()),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// `Object.Equals` semantics: same runtime type and equal value;
    /// reference identity for arrays and delegates.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::SByte(a), Value::SByte(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::UInt16(a), Value::UInt16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::UInt32(a), Value::UInt32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::UInt64(a), Value::UInt64(b)) => a == b,
            (Value::Single(a), Value::Single(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Double(a), Value::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::TimeSpan(a), Value::TimeSpan(b)) => a == b,
            (Value::Enum(ia, a), Value::Enum(ib, b)) => ia.full_name() == ib.full_name() && a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.equals(b.as_ref()),
            (Value::Delegate(a), Value::Delegate(b)) => {
                core::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }

    /// `GetHashCode()`; consistent with [`Value::equals`].
    pub fn hash_code(&self) -> i32 {
        match self {
            Value::Null => 0,
            Value::Bool(b) => *b as i32,
            Value::Int32(v) => *v,
            Value::Char(v) => *v as i32 | ((*v as i32) << 16),
            other => {
                let mut hasher = std::collections::hash_map::DefaultHasher::new();
                other.hash(&mut hasher);
                hasher.finish() as i32
            }
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Single(v) => {
                if v.is_nan() {
                    f32::NAN.to_bits().hash(state)
                } else {
                    (v + 0.0).to_bits().hash(state)
                }
            }
            Value::Double(v) => {
                if v.is_nan() {
                    f64::NAN.to_bits().hash(state)
                } else {
                    (v + 0.0).to_bits().hash(state)
                }
            }
            Value::Decimal(d) => d.to_f64().to_bits().hash(state),
            Value::Array(a) => Arc::as_ptr(a).hash(state),
            Value::Object(o) => Arc::as_ptr(o).cast::<()>().hash(state),
            Value::Delegate(d) => Arc::as_ptr(d).cast::<()>().hash(state),
            Value::Type(t) => t.hash(state),
            Value::Enum(info, raw) => {
                info.full_name().hash(state);
                raw.hash(state);
            }
            other => format_value(other).hash(state),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_value(self))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{:?}", s.as_str()),
            Value::Char(_) => write!(f, "'{}'", format_value(self)),
            Value::Decimal(d) => write!(f, "{:?}", d),
            Value::Array(a) => {
                write!(f, "{}[", a.element)?;
                for (i, item) in a.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(o) => write!(f, "{}({})", o.class().display_name(), o.to_display()),
            Value::Type(t) => write!(f, "typeof({})", t),
            other => write!(f, "{}({})", other.runtime_type(), format_value(other)),
        }
    }
}

/// `DateTime.MinValue`.
pub fn min_date_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::default())
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from!(
    bool => Bool,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Single,
    f64 => Double,
    Decimal => Decimal,
    NaiveDateTime => DateTime,
    TimeDelta => TimeSpan,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v.into())
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::char(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
