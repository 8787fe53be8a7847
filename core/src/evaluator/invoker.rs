//! Method invocation and the process-wide invoker cache.
//!
//! Methods whose signature stays within a small set of shapes get a direct
//! invoker that hands the arguments straight to the native body. Everything
//! else goes through the reflective path, which validates arity, fills
//! optional defaults and checks argument runtime types.

use alloc::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::debug;

use crate::evaluator::Fault;
use crate::types::{Method, MethodId, NativeFn, PrimitiveType, Type};
use crate::values::Value;

/// Parameter and return shapes eligible for direct invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Primitive(PrimitiveType),
    Object,
    String,
    DateTime,
    TimeSpan,
    Void,
}

impl Shape {
    fn of(ty: &Type) -> Option<Shape> {
        Some(match ty {
            Type::Primitive(p) => Shape::Primitive(*p),
            Type::Object => Shape::Object,
            Type::String => Shape::String,
            Type::DateTime => Shape::DateTime,
            Type::TimeSpan => Shape::TimeSpan,
            Type::Void => Shape::Void,
            _ => return None,
        })
    }
}

const MAX_DIRECT_ARITY: usize = 4;

/// The shape of a method eligible for direct invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Signature {
    parameters: SmallVec<[Shape; MAX_DIRECT_ARITY]>,
}

impl Signature {
    /// `None` for generic methods, optional parameters, arity above four,
    /// or any type outside the shape set.
    pub(crate) fn of(method: &Method) -> Option<Signature> {
        if method.generic_arity > 0 || method.parameters.len() > MAX_DIRECT_ARITY {
            return None;
        }
        let mut parameters = SmallVec::new();
        for parameter in &method.parameters {
            if parameter.is_optional() {
                return None;
            }
            parameters.push(Shape::of(&parameter.ty)?);
        }
        Shape::of(&method.return_type)?;
        Some(Signature { parameters })
    }

    pub(crate) fn arity(&self) -> usize {
        self.parameters.len()
    }
}

type DirectCall = Box<dyn Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync>;
type DirectFactory = fn(NativeFn) -> DirectCall;

macro_rules! direct {
    ($name:ident, $arity:literal) => {
        fn $name(body: NativeFn) -> DirectCall {
            Box::new(move |receiver, args| {
                if args.len() != $arity {
                    return Err(arity_mismatch($arity, args.len()));
                }
                body(receiver, args)
            })
        }
    };
}

direct!(direct0, 0);
direct!(direct1, 1);
direct!(direct2, 2);
direct!(direct3, 3);
direct!(direct4, 4);

/// Direct invoker factories, indexed by arity.
const DIRECT_FACTORIES: [DirectFactory; MAX_DIRECT_ARITY + 1] = [direct0, direct1, direct2, direct3, direct4];

fn arity_mismatch(expected: usize, actual: usize) -> Fault {
    Fault::Argument(format!("expected {} arguments, got {}", expected, actual))
}

enum Strategy {
    Direct(DirectCall),
    Reflective,
}

/// A ready-to-call method.
pub(crate) struct Invoker {
    method: Arc<Method>,
    strategy: Strategy,
}

impl Invoker {
    pub(crate) fn new(method: Arc<Method>) -> Invoker {
        let strategy = match Signature::of(&method) {
            Some(signature) => Strategy::Direct(DIRECT_FACTORIES[signature.arity()](method.body.clone())),
            None => Strategy::Reflective,
        };
        Invoker { method, strategy }
    }

    pub(crate) fn method(&self) -> &Arc<Method> {
        &self.method
    }

    pub(crate) fn is_direct(&self) -> bool {
        matches!(self.strategy, Strategy::Direct(_))
    }

    /// Calls the method. An argument is `None` when the parameter was
    /// omitted; trailing parameters may also be left out entirely.
    pub(crate) fn call(&self, receiver: &Value, args: Vec<Option<Value>>) -> Result<Value, Fault> {
        let result = match &self.strategy {
            Strategy::Direct(call) => {
                let args: SmallVec<[Value; MAX_DIRECT_ARITY]> = args.into_iter().flatten().collect();
                call(receiver, &args)
            }
            Strategy::Reflective => {
                let args = self.prepare(args)?;
                (self.method.body)(receiver, &args)
            }
        };
        result.map_err(|e| Fault::invocation(&self.method.name, e))
    }

    fn prepare(&self, args: Vec<Option<Value>>) -> Result<Vec<Value>, Fault> {
        let parameters = &self.method.parameters;
        if args.len() > parameters.len() {
            return Err(arity_mismatch(parameters.len(), args.len()));
        }
        let mut prepared = Vec::with_capacity(parameters.len());
        let mut supplied = args.into_iter();
        for parameter in parameters {
            let value = match supplied.next().flatten() {
                Some(value) => value,
                None => parameter.default.clone().ok_or_else(|| {
                    Fault::Argument(format!("missing argument for parameter '{}'", parameter.name))
                })?,
            };
            if !accepts(&parameter.ty, &value) {
                return Err(Fault::invalid_cast(value.runtime_type(), &parameter.ty));
            }
            prepared.push(value);
        }
        Ok(prepared)
    }
}

fn accepts(ty: &Type, value: &Value) -> bool {
    if value.is_null() {
        return ty.can_be_null();
    }
    match ty {
        Type::Object | Type::GenericParameter(_) => true,
        _ => value.is_instance_of(ty),
    }
}

type CacheKey = (MethodId, Vec<Type>);

/// Invokers keyed by method identity and type arguments. Populated lazily,
/// never evicted; readers never block each other.
#[derive(Default)]
pub(crate) struct InvokerCache {
    entries: RwLock<HashMap<CacheKey, Arc<Invoker>>>,
}

impl InvokerCache {
    pub(crate) fn get(&self, method: &Arc<Method>) -> Arc<Invoker> {
        let key = (method.id, method.type_arguments.clone());
        if let Some(invoker) = self.entries.read().get(&key) {
            return invoker.clone();
        }
        let mut entries = self.entries.write();
        if let Some(invoker) = entries.get(&key) {
            return invoker.clone();
        }
        let invoker = Arc::new(Invoker::new(method.clone()));
        debug!(
            method = %method.name,
            direct = invoker.is_direct(),
            "Invoker cached"
        );
        entries.insert(key, invoker.clone());
        invoker
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

lazy_static::lazy_static! {
    pub(crate) static ref INVOKER_CACHE: InvokerCache = InvokerCache::default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Parameter, native};

    fn add() -> Arc<Method> {
        Arc::new(Method::new(
            "Add",
            vec![Parameter::new("a", Type::INT32), Parameter::new("b", Type::INT32)],
            Type::INT32,
            native(|_, args| match (&args[0], &args[1]) {
                (Value::Int32(a), Value::Int32(b)) => Ok(Value::Int32(a + b)),
                _ => Err(Fault::Argument("expected ints".to_string())),
            }),
        ))
    }

    #[test]
    fn test_shape_signature() {
        assert!(Signature::of(&add()).is_some());
        let optional = Method::new(
            "F",
            vec![Parameter::new("a", Type::INT32).with_default(Value::Int32(1))],
            Type::Void,
            native(|_, _| Ok(Value::Null)),
        );
        assert!(Signature::of(&optional).is_none());
        let array = Method::new(
            "G",
            vec![Parameter::new("a", Type::array(Type::INT32))],
            Type::Void,
            native(|_, _| Ok(Value::Null)),
        );
        assert!(Signature::of(&array).is_none());
    }

    #[test]
    fn test_direct_invocation() {
        let invoker = Invoker::new(add());
        assert!(invoker.is_direct());
        let result = invoker.call(&Value::Null, vec![Some(Value::Int32(2)), Some(Value::Int32(3))]);
        assert_eq!(result, Ok(Value::Int32(5)));
    }

    #[test]
    fn test_reflective_fills_defaults_and_checks_types() {
        let method = Arc::new(Method::new(
            "Pad",
            vec![
                Parameter::new("s", Type::String),
                Parameter::new("n", Type::INT32).with_default(Value::Int32(2)),
            ],
            Type::String,
            native(|_, args| {
                let s = args[0].as_str().unwrap_or_default();
                let n = args[1].as_i32().unwrap_or_default() as usize;
                Ok(Value::string(format!("{}{}", s, "_".repeat(n))))
            }),
        ));
        let invoker = Invoker::new(method);
        assert!(!invoker.is_direct());
        assert_eq!(
            invoker.call(&Value::Null, vec![Some(Value::string("a"))]),
            Ok(Value::string("a__"))
        );
        assert!(matches!(
            invoker.call(&Value::Null, vec![Some(Value::Int32(1))]),
            Err(Fault::InvalidCast { .. })
        ));
    }

    #[test]
    fn test_host_errors_are_wrapped() {
        let method = Arc::new(Method::new(
            "Fail",
            vec![],
            Type::INT32,
            native(|_, _| Err(Fault::Argument("bad input".to_string()))),
        ));
        let result = Invoker::new(method).call(&Value::Null, vec![]);
        assert_eq!(
            result,
            Err(Fault::Invocation {
                method: "Fail".to_string(),
                message: "bad input".to_string()
            })
        );
    }

    #[test]
    fn test_cache_reuses_invokers() {
        let cache = InvokerCache::default();
        let method = add();
        let first = cache.get(&method);
        let second = cache.get(&method);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }
}
