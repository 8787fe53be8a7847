//! Core evaluation logic.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::node::{Binding, BinaryOperator, ElementCall, LambdaBody, Node, UnaryOperator};
use crate::evaluator::Fault;
use crate::stack::ensure_sufficient_stack;
use crate::syntax::BinaryOp;
use crate::types::Type;
use crate::values::{Callable, Value};

/// Number of lambda invocations in progress, shared by a run and every
/// delegate it creates. Tree depth is not counted here; deep trees grow the
/// stack instead.
pub(crate) struct Depth {
    current: AtomicUsize,
    max: usize,
}

impl Depth {
    pub(crate) fn new(max: usize) -> Arc<Depth> {
        Arc::new(Depth {
            current: AtomicUsize::new(0),
            max,
        })
    }

    fn enter(&self) -> Result<DepthGuard<'_>, Fault> {
        let depth = self.current.fetch_add(1, Ordering::Relaxed);
        if depth >= self.max {
            self.current.fetch_sub(1, Ordering::Relaxed);
            return Err(Fault::StackOverflow { max_depth: self.max });
        }
        Ok(DepthGuard(self))
    }
}

struct DepthGuard<'a>(&'a Depth);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Slots of one run (or one delegate invocation): temporaries first, then
/// parameters.
pub(crate) struct Frame<'a> {
    pub locals: Vec<Value>,
    pub depth: &'a Arc<Depth>,
}

impl Node {
    pub(crate) fn eval(&self, frame: &mut Frame<'_>) -> Result<Value, Fault> {
        ensure_sufficient_stack(|| self.eval_inner(frame))
    }

    fn eval_inner(&self, frame: &mut Frame<'_>) -> Result<Value, Fault> {
        match self {
            Node::Constant(value) => Ok(value.clone()),
            Node::Local(slot) => Ok(frame.locals[*slot].clone()),

            Node::Field {
                target,
                getter,
                null_check,
            } => {
                let receiver = receiver(target.as_deref(), *null_check, frame)?;
                getter(&receiver)
            }
            Node::ArrayIndex { array, index } => {
                let array = array.eval(frame)?;
                let index = index.eval(frame)?;
                let items = array_of(&array)?;
                let i = index
                    .as_i128()
                    .ok_or_else(|| Fault::invalid_cast(index.runtime_type(), "int"))?;
                usize::try_from(i)
                    .ok()
                    .and_then(|i| items.items.get(i))
                    .cloned()
                    .ok_or(Fault::IndexOutOfRange)
            }
            Node::ArrayLength(array) => {
                let array = array.eval(frame)?;
                Ok(Value::Int32(array_of(&array)?.len() as i32))
            }
            Node::Indexer {
                target,
                getter,
                arguments,
                null_check,
            } => {
                let receiver = receiver(Some(target.as_ref()), *null_check, frame)?;
                let arguments = eval_all(arguments, frame)?;
                getter(&receiver, &arguments).map_err(|e| Fault::invocation("this[]", e))
            }
            Node::Call {
                target,
                invoker,
                arguments,
                null_check,
            } => {
                let receiver = receiver(target.as_deref(), *null_check, frame)?;
                let arguments = eval_optional(arguments, frame)?;
                invoker.call(&receiver, arguments)
            }
            Node::Invoke {
                delegate,
                arguments,
            } => {
                let delegate = delegate.eval(frame)?;
                let arguments = eval_all(arguments, frame)?;
                match delegate {
                    Value::Delegate(callable) => callable.invoke(&arguments),
                    Value::Null => Err(Fault::NullReference),
                    other => Err(Fault::invalid_cast(other.runtime_type(), "Delegate")),
                }
            }

            Node::Binary {
                op,
                operator,
                left,
                right,
                lifted,
            } => {
                let left = left.eval(frame)?;
                let right = right.eval(frame)?;
                if *lifted {
                    if let Some(result) = lifted_binary(*op, &left, &right) {
                        return Ok(result);
                    }
                }
                match operator {
                    BinaryOperator::Intrinsic(f) => f(&left, &right),
                    BinaryOperator::StringEquality => Ok(equality(*op, left == right)),
                    BinaryOperator::ReferenceEquality => Ok(equality(*op, same_reference(&left, &right))),
                    BinaryOperator::User(invoker) => invoker.call(&Value::Null, vec![Some(left), Some(right)]),
                }
            }
            Node::AndAlso(left, right) => {
                if truth(&left.eval(frame)?)? {
                    Ok(Value::Bool(truth(&right.eval(frame)?)?))
                } else {
                    Ok(Value::Bool(false))
                }
            }
            Node::OrElse(left, right) => {
                if truth(&left.eval(frame)?)? {
                    Ok(Value::Bool(true))
                } else {
                    Ok(Value::Bool(truth(&right.eval(frame)?)?))
                }
            }
            Node::Unary {
                operator,
                operand,
                lifted,
            } => {
                let operand = operand.eval(frame)?;
                if *lifted && operand.is_null() {
                    return Ok(Value::Null);
                }
                match operator {
                    UnaryOperator::Intrinsic(f) => f(&operand),
                    UnaryOperator::User(invoker) => invoker.call(&Value::Null, vec![Some(operand)]),
                }
            }
            Node::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                if truth(&condition.eval(frame)?)? {
                    when_true.eval(frame)
                } else {
                    when_false.eval(frame)
                }
            }
            Node::Coalesce { left, right } => match left.eval(frame)? {
                Value::Null => right.eval(frame),
                value => Ok(value),
            },
            Node::Convert { operand, plan } => plan.apply(operand.eval(frame)?),
            Node::TypeIs { operand, target } => Ok(Value::Bool(operand.eval(frame)?.is_instance_of(target))),
            Node::TypeAs { operand, target } => {
                let value = operand.eval(frame)?;
                Ok(if value.is_instance_of(target) { value } else { Value::Null })
            }

            Node::New { invoker, arguments } => {
                let arguments = eval_optional(arguments, frame)?;
                invoker.call(&Value::Null, arguments)
            }
            Node::NewArrayBounds { element, length } => {
                let length = length.eval(frame)?;
                let n = length
                    .as_i128()
                    .ok_or_else(|| Fault::invalid_cast(length.runtime_type(), "int"))?;
                let n = usize::try_from(n).map_err(|_| Fault::Overflow)?;
                Ok(Value::array(element.clone(), vec![Value::default_for(element); n]))
            }
            Node::NewArrayInit { element, elements } => {
                let items = eval_all(elements, frame)?;
                Ok(Value::array(element.clone(), items))
            }
            Node::ListInit { new, elements } => {
                let collection = new.eval(frame)?;
                add_elements(&collection, elements, frame)?;
                Ok(collection)
            }
            Node::MemberInit { new, bindings } => {
                let object = new.eval(frame)?;
                apply_bindings(&object, bindings, frame)?;
                Ok(object)
            }
            Node::Lambda(lambda) => Ok(Value::Delegate(Arc::new(LambdaDelegate {
                lambda: lambda.clone(),
                captured: frame.locals.clone(),
                depth: frame.depth.clone(),
            }))),
            Node::NullGuard {
                receiver,
                slot,
                body,
            } => {
                let value = receiver.eval(frame)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                frame.locals[*slot] = value;
                body.eval(frame)
            }
        }
    }
}

fn receiver(target: Option<&Node>, null_check: bool, frame: &mut Frame<'_>) -> Result<Value, Fault> {
    let Some(target) = target else {
        return Ok(Value::Null);
    };
    let value = target.eval(frame)?;
    if null_check && value.is_null() {
        return Err(Fault::NullReference);
    }
    Ok(value)
}

fn array_of(value: &Value) -> Result<&crate::values::ArrayValue, Fault> {
    match value {
        Value::Array(array) => Ok(array.as_ref()),
        Value::Null => Err(Fault::NullReference),
        other => Err(Fault::invalid_cast(other.runtime_type(), "Array")),
    }
}

fn eval_all(nodes: &[Node], frame: &mut Frame<'_>) -> Result<Vec<Value>, Fault> {
    nodes.iter().map(|n| n.eval(frame)).collect()
}

fn eval_optional(nodes: &[Option<Node>], frame: &mut Frame<'_>) -> Result<Vec<Option<Value>>, Fault> {
    nodes
        .iter()
        .map(|n| n.as_ref().map(|n| n.eval(frame)).transpose())
        .collect()
}

fn truth(value: &Value) -> Result<bool, Fault> {
    value
        .as_bool()
        .ok_or_else(|| Fault::invalid_cast(value.runtime_type(), "bool"))
}

fn equality(op: BinaryOp, equal: bool) -> Value {
    Value::Bool(if op == BinaryOp::NotEqual { !equal } else { equal })
}

/// Result of a lifted operator when an operand is `null`; `None` when both
/// operands have values.
///
/// `bool?` `&` and `|` follow three-valued logic. Otherwise `==` is true only
/// when both are null, `!=` is its negation, the relational operators are
/// false and everything else is null.
fn lifted_binary(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    let false_value = Value::Bool(false);
    let true_value = Value::Bool(true);
    match op {
        BinaryOp::And if *left == false_value || *right == false_value => return Some(false_value),
        BinaryOp::Or if *left == true_value || *right == true_value => return Some(true_value),
        _ => {}
    }
    if !left.is_null() && !right.is_null() {
        return None;
    }
    let both = left.is_null() && right.is_null();
    Some(match op {
        BinaryOp::Equal => Value::Bool(both),
        BinaryOp::NotEqual => Value::Bool(!both),
        BinaryOp::LessThan | BinaryOp::LessThanOrEqual | BinaryOp::GreaterThan | BinaryOp::GreaterThanOrEqual => {
            false_value
        }
        _ => Value::Null,
    })
}

/// `object.ReferenceEquals` for values with identity (host objects, arrays,
/// delegates).
///
/// Boxed primitives, strings and enums are plain values here and have no
/// identity to compare, so they compare by value: `(object)1 == (object)1`
/// is `true`, where the CLR would compare two distinct boxes.
fn same_reference(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Object(a), Value::Object(b)) => core::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
        (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
        (Value::Delegate(a), Value::Delegate(b)) => core::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
        _ => left.equals(right),
    }
}

fn add_elements(collection: &Value, elements: &[ElementCall], frame: &mut Frame<'_>) -> Result<(), Fault> {
    if collection.is_null() {
        return Err(Fault::NullReference);
    }
    for element in elements {
        let arguments = element
            .arguments
            .iter()
            .map(|a| a.eval(frame).map(Some))
            .collect::<Result<Vec<_>, _>>()?;
        element.invoker.call(collection, arguments)?;
    }
    Ok(())
}

fn apply_bindings(object: &Value, bindings: &[Binding], frame: &mut Frame<'_>) -> Result<(), Fault> {
    if object.is_null() {
        return Err(Fault::NullReference);
    }
    for binding in bindings {
        match binding {
            Binding::Assign { member, setter, value } => {
                let value = value.eval(frame)?;
                let Some(setter) = setter else {
                    return Err(Fault::InvalidOperation(format!("'{}' cannot be assigned", member)));
                };
                setter(object, value)?;
            }
            Binding::List { getter, elements } => add_elements(&getter(object)?, elements, frame)?,
            Binding::Member { getter, bindings } => apply_bindings(&getter(object)?, bindings, frame)?,
        }
    }
    Ok(())
}

/// Delegate created by evaluating a lambda. It captures the slots of the
/// frame it was created in; each call runs on a private copy.
struct LambdaDelegate {
    lambda: Arc<LambdaBody>,
    captured: Vec<Value>,
    depth: Arc<Depth>,
}

impl Callable for LambdaDelegate {
    fn function_type(&self) -> Type {
        self.lambda.ty.clone()
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, Fault> {
        if args.len() != self.lambda.parameters.len() {
            return Err(Fault::Argument(format!(
                "delegate expects {} arguments, got {}",
                self.lambda.parameters.len(),
                args.len()
            )));
        }
        let _guard = self.depth.enter()?;
        let mut locals = self.captured.clone();
        for (slot, arg) in self.lambda.parameters.iter().zip(args) {
            locals[*slot] = arg.clone();
        }
        let mut frame = Frame {
            locals,
            depth: &self.depth,
        };
        self.lambda.body.eval(&mut frame)
    }
}
