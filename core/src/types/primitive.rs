use core::fmt;

use serde::{Deserialize, Serialize};

/// The built-in value types with intrinsic operators and conversions.
///
/// The discriminant doubles as the row/column index of the intrinsic
/// operator and conversion tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum PrimitiveType {
    Bool = 0,
    Char = 1,
    SByte = 2,
    Byte = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Single = 10,
    Double = 11,
    Decimal = 12,
}

impl PrimitiveType {
    pub const COUNT: usize = 13;

    pub const ALL: [PrimitiveType; Self::COUNT] = [
        PrimitiveType::Bool,
        PrimitiveType::Char,
        PrimitiveType::SByte,
        PrimitiveType::Byte,
        PrimitiveType::Int16,
        PrimitiveType::UInt16,
        PrimitiveType::Int32,
        PrimitiveType::UInt32,
        PrimitiveType::Int64,
        PrimitiveType::UInt64,
        PrimitiveType::Single,
        PrimitiveType::Double,
        PrimitiveType::Decimal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "Boolean",
            PrimitiveType::Char => "Char",
            PrimitiveType::SByte => "SByte",
            PrimitiveType::Byte => "Byte",
            PrimitiveType::Int16 => "Int16",
            PrimitiveType::UInt16 => "UInt16",
            PrimitiveType::Int32 => "Int32",
            PrimitiveType::UInt32 => "UInt32",
            PrimitiveType::Int64 => "Int64",
            PrimitiveType::UInt64 => "UInt64",
            PrimitiveType::Single => "Single",
            PrimitiveType::Double => "Double",
            PrimitiveType::Decimal => "Decimal",
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "System.Boolean",
            PrimitiveType::Char => "System.Char",
            PrimitiveType::SByte => "System.SByte",
            PrimitiveType::Byte => "System.Byte",
            PrimitiveType::Int16 => "System.Int16",
            PrimitiveType::UInt16 => "System.UInt16",
            PrimitiveType::Int32 => "System.Int32",
            PrimitiveType::UInt32 => "System.UInt32",
            PrimitiveType::Int64 => "System.Int64",
            PrimitiveType::UInt64 => "System.UInt64",
            PrimitiveType::Single => "System.Single",
            PrimitiveType::Double => "System.Double",
            PrimitiveType::Decimal => "System.Decimal",
        }
    }

    /// The C# keyword naming this type.
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Char => "char",
            PrimitiveType::SByte => "sbyte",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Int16 => "short",
            PrimitiveType::UInt16 => "ushort",
            PrimitiveType::Int32 => "int",
            PrimitiveType::UInt32 => "uint",
            PrimitiveType::Int64 => "long",
            PrimitiveType::UInt64 => "ulong",
            PrimitiveType::Single => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Decimal => "decimal",
        }
    }

    pub fn from_full_name(name: &str) -> Option<PrimitiveType> {
        Self::ALL.iter().copied().find(|p| p.full_name() == name)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveType::SByte
                | PrimitiveType::Byte
                | PrimitiveType::Int16
                | PrimitiveType::UInt16
                | PrimitiveType::Int32
                | PrimitiveType::UInt32
                | PrimitiveType::Int64
                | PrimitiveType::UInt64
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveType::Single | PrimitiveType::Double)
    }

    /// Integral, floating point or decimal; `char` and `bool` excluded.
    pub fn is_numeric(self) -> bool {
        self.is_integral() || self.is_floating() || self == PrimitiveType::Decimal
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveType::SByte
                | PrimitiveType::Int16
                | PrimitiveType::Int32
                | PrimitiveType::Int64
                | PrimitiveType::Single
                | PrimitiveType::Double
                | PrimitiveType::Decimal
        )
    }

    pub fn is_unsigned_integral(self) -> bool {
        matches!(
            self,
            PrimitiveType::Byte
                | PrimitiveType::UInt16
                | PrimitiveType::UInt32
                | PrimitiveType::UInt64
        )
    }

    /// Whether an implicit numeric conversion exists from `self` to `target`
    /// (identity included).
    pub fn implicitly_converts_to(self, target: PrimitiveType) -> bool {
        use PrimitiveType::*;
        if self == target {
            return true;
        }
        match self {
            SByte => matches!(target, Int16 | Int32 | Int64 | Single | Double | Decimal),
            Byte => matches!(
                target,
                Int16 | UInt16 | Int32 | UInt32 | Int64 | UInt64 | Single | Double | Decimal
            ),
            Int16 => matches!(target, Int32 | Int64 | Single | Double | Decimal),
            UInt16 | Char => matches!(
                target,
                UInt16 | Int32 | UInt32 | Int64 | UInt64 | Single | Double | Decimal
            ),
            Int32 => matches!(target, Int64 | Single | Double | Decimal),
            UInt32 => matches!(target, Int64 | UInt64 | Single | Double | Decimal),
            Int64 | UInt64 => matches!(target, Single | Double | Decimal),
            Single => target == Double,
            Bool | Double | Decimal => false,
        }
    }

    /// Whether an explicit numeric conversion exists from `self` to `target`.
    pub fn explicitly_converts_to(self, target: PrimitiveType) -> bool {
        (self == PrimitiveType::Bool) == (target == PrimitiveType::Bool)
    }

    /// C# "better conversion target": `self` is a better target than `other`.
    pub fn is_better_target_than(self, other: PrimitiveType) -> bool {
        use PrimitiveType::*;
        if self == other {
            return false;
        }
        if self.implicitly_converts_to(other) && !other.implicitly_converts_to(self) {
            return true;
        }
        match self {
            SByte => matches!(other, Byte | UInt16 | UInt32 | UInt64),
            Int16 => matches!(other, UInt16 | UInt32 | UInt64),
            Int32 => matches!(other, UInt32 | UInt64),
            Int64 => other == UInt64,
            _ => false,
        }
    }

    /// Range of an integral type as `i128` bounds.
    pub fn integral_range(self) -> Option<(i128, i128)> {
        Some(match self {
            PrimitiveType::SByte => (i8::MIN as i128, i8::MAX as i128),
            PrimitiveType::Byte => (0, u8::MAX as i128),
            PrimitiveType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            PrimitiveType::UInt16 | PrimitiveType::Char => (0, u16::MAX as i128),
            PrimitiveType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            PrimitiveType::UInt32 => (0, u32::MAX as i128),
            PrimitiveType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            PrimitiveType::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implicit_table_is_not_symmetric() {
        use PrimitiveType::*;
        assert!(Int32.implicitly_converts_to(Int64));
        assert!(!Int64.implicitly_converts_to(Int32));
        assert!(Char.implicitly_converts_to(Int32));
        assert!(!Int32.implicitly_converts_to(Char));
        assert!(UInt64.implicitly_converts_to(Single));
        assert!(!Double.implicitly_converts_to(Decimal));
        assert!(!Bool.implicitly_converts_to(Int32));
    }

    #[test]
    fn test_better_conversion_target() {
        use PrimitiveType::*;
        assert!(Int32.is_better_target_than(Int64));
        assert!(Int32.is_better_target_than(UInt32));
        assert!(!UInt32.is_better_target_than(Int32));
        assert!(Int64.is_better_target_than(UInt64));
        assert!(Single.is_better_target_than(Double));
    }

    #[test]
    fn test_indices_follow_all() {
        for (i, p) in PrimitiveType::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
            assert_eq!(PrimitiveType::from_full_name(p.full_name()), Some(*p));
        }
    }
}
