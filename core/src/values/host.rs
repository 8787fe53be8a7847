//! Host objects and delegates.

use alloc::sync::Arc;
use core::any::Any;
use core::fmt;

use parking_lot::RwLock;

use crate::evaluator::Fault;
use crate::types::{ClassInfo, FunctionType, Getter, NativeFn, Setter, Type};
use crate::values::Value;

/// An instance of a host class.
pub trait HostObject: Send + Sync {
    fn class(&self) -> &Arc<ClassInfo>;

    fn as_any(&self) -> &dyn Any;

    /// Result of `ToString()`; the class name unless overridden.
    fn to_display(&self) -> String {
        self.class().full_name().to_string()
    }

    /// `Equals(object)`; reference identity unless overridden.
    fn equals(&self, other: &dyn HostObject) -> bool {
        core::ptr::addr_eq(self as *const Self, other as *const dyn HostObject)
    }
}

/// A callable delegate value.
pub trait Callable: Send + Sync {
    /// The delegate's `Type::Function`.
    fn function_type(&self) -> Type;

    fn invoke(&self, args: &[Value]) -> Result<Value, Fault>;
}

/// A host object whose state is a vector of slots; fields defined with
/// [`DynamicObject::slot_getter`] read slot `i`.
pub struct DynamicObject {
    class: Arc<ClassInfo>,
    slots: RwLock<Vec<Value>>,
}

impl DynamicObject {
    pub fn new(class: Arc<ClassInfo>, slots: Vec<Value>) -> Self {
        DynamicObject {
            class,
            slots: RwLock::new(slots),
        }
    }

    /// Allocates an object and wraps it as a value.
    pub fn value(class: Arc<ClassInfo>, slots: Vec<Value>) -> Value {
        Value::Object(Arc::new(Self::new(class, slots)))
    }

    pub fn get(&self, slot: usize) -> Value {
        self.slots.read().get(slot).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&self, slot: usize, value: Value) {
        let mut slots = self.slots.write();
        if slots.len() <= slot {
            slots.resize(slot + 1, Value::Null);
        }
        slots[slot] = value;
    }

    fn of(receiver: &Value) -> Result<&DynamicObject, Fault> {
        match receiver {
            Value::Null => Err(Fault::NullReference),
            other => other.downcast::<DynamicObject>().ok_or_else(|| Fault::InvalidCast {
                from: other.runtime_type().to_string(),
                to: "DynamicObject".to_string(),
            }),
        }
    }

    pub fn slot_getter(slot: usize) -> Getter {
        Arc::new(move |receiver: &Value| Ok(DynamicObject::of(receiver)?.get(slot)))
    }

    pub fn slot_setter(slot: usize) -> Setter {
        Arc::new(move |receiver: &Value, value: Value| {
            DynamicObject::of(receiver)?.set(slot, value);
            Ok(())
        })
    }
}

impl HostObject for DynamicObject {
    fn class(&self) -> &Arc<ClassInfo> {
        &self.class
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for DynamicObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicObject")
            .field("class", &self.class.full_name())
            .field("slots", &*self.slots.read())
            .finish()
    }
}

/// A delegate backed by a host function.
pub struct NativeDelegate {
    ty: Type,
    body: NativeFn,
}

impl NativeDelegate {
    pub fn new(parameters: Vec<Type>, return_type: Type, body: NativeFn) -> Self {
        NativeDelegate {
            ty: Type::Function(Arc::new(FunctionType::new(parameters, return_type))),
            body,
        }
    }

    pub fn value(parameters: Vec<Type>, return_type: Type, body: NativeFn) -> Value {
        Value::Delegate(Arc::new(Self::new(parameters, return_type, body)))
    }
}

impl Callable for NativeDelegate {
    fn function_type(&self) -> Type {
        self.ty.clone()
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, Fault> {
        (self.body)(&Value::Null, args)
    }
}
