pub mod catalog;
pub mod class;
mod primitive;
mod types;

pub use catalog::{GenericDefinition, SYSTEM_CATALOG, TypeCatalog, TypeResolver};
pub use class::{
    ClassBuilder, ClassInfo, EnumInfo, Getter, Indexer, MemberTable, Method, MethodId, NativeFn,
    Parameter, Property, Setter, getter, native, setter,
};
pub use primitive::PrimitiveType;
pub use types::{FunctionType, Type};
