//! Overload resolution and method type inference.

use alloc::sync::Arc;

use super::binder::{Argument, ArgumentValue, Binder};
use super::conversions;
use super::error::{BindError, BindErrorKind};
use super::typed_expr::TypedExpr;
use crate::syntax::Span;
use crate::types::{Method, Type};

/// The chosen method with its converted arguments, in parameter order.
pub(super) struct Resolution {
    pub method: Arc<Method>,
    pub arguments: Vec<Option<TypedExpr>>,
}

struct Candidate {
    method: Arc<Method>,
    /// Argument index for each parameter; `None` when defaulted.
    mapping: Vec<Option<usize>>,
    generic: bool,
}

impl Candidate {
    fn defaulted(&self) -> usize {
        self.mapping.iter().filter(|m| m.is_none()).count()
    }

    fn parameter_for(&self, argument: usize) -> Option<&Type> {
        let k = self.mapping.iter().position(|m| *m == Some(argument))?;
        Some(&self.method.parameters[k].ty)
    }
}

impl Binder<'_> {
    /// Resolves a call level by level: the first level with an applicable
    /// candidate wins, so derived members hide base members.
    pub(super) fn resolve_in_levels(
        &mut self,
        levels: &[&[Arc<Method>]],
        args: &[Argument<'_>],
        type_arguments: &[Type],
        name: &str,
        span: &Span,
    ) -> Result<Resolution, BindError> {
        let mut inference_failed = false;
        for level in levels {
            let (resolution, failed) = self.resolve_overload(level, args, type_arguments, name, span)?;
            if let Some(resolution) = resolution {
                return Ok(resolution);
            }
            inference_failed |= failed;
        }
        let kind = if inference_failed {
            BindErrorKind::CannotInferTypeArguments(name.to_string())
        } else {
            BindErrorKind::NoOverload {
                name: name.to_string(),
                arguments: describe_arguments(args),
            }
        };
        Err(BindError::new(kind, span.clone()))
    }

    /// Picks the best applicable candidate. Returns `None` when nothing
    /// applies, along with whether a generic candidate failed inference.
    fn resolve_overload(
        &mut self,
        candidates: &[Arc<Method>],
        args: &[Argument<'_>],
        type_arguments: &[Type],
        name: &str,
        span: &Span,
    ) -> Result<(Option<Resolution>, bool), BindError> {
        let mut applicable: Vec<Candidate> = Vec::new();
        let mut inference_failed = false;
        for method in candidates {
            let Some(mapping) = map_arguments(method, args) else {
                continue;
            };
            let generic = method.generic_arity > 0;
            let method = if !generic {
                if !type_arguments.is_empty() {
                    continue;
                }
                method.clone()
            } else if !type_arguments.is_empty() {
                if type_arguments.len() != method.generic_arity as usize {
                    continue;
                }
                Arc::new(method.instantiate(type_arguments))
            } else {
                match self.infer(method, &mapping, args) {
                    Some(inferred) => Arc::new(method.instantiate(&inferred)),
                    None => {
                        inference_failed = true;
                        continue;
                    }
                }
            };
            if self.is_applicable(&method, &mapping, args) {
                applicable.push(Candidate {
                    method,
                    mapping,
                    generic,
                });
            }
        }

        if applicable.is_empty() {
            return Ok((None, inference_failed));
        }
        let best = (0..applicable.len()).find(|&i| {
            (0..applicable.len()).all(|j| i == j || is_better(&applicable[i], &applicable[j], args))
        });
        let Some(best) = best else {
            let candidates: Vec<String> = applicable.iter().map(|c| format!("'{:?}'", c.method)).collect();
            return Err(BindError::new(
                BindErrorKind::Ambiguous {
                    name: name.to_string(),
                    candidates: candidates.join(" and "),
                },
                span.clone(),
            ));
        };
        let chosen = applicable.swap_remove(best);
        tracing::trace!(method = ?chosen.method, "Overload resolved");

        let mut arguments = Vec::with_capacity(chosen.mapping.len());
        for (parameter, slot) in chosen.method.parameters.iter().zip(&chosen.mapping) {
            let argument = match slot.map(|i| &args[i].value) {
                None => None,
                Some(ArgumentValue::Bound(expr)) => Some(self.convert_implicit(expr.clone(), &parameter.ty)?),
                Some(ArgumentValue::Lambda(node)) => match &parameter.ty {
                    Type::Function(signature) => Some(self.bind_lambda(node, signature)?),
                    _ => return Err(BindError::new(BindErrorKind::LambdaWithoutTarget, node.span.clone())),
                },
            };
            arguments.push(argument);
        }
        Ok((
            Some(Resolution {
                method: chosen.method,
                arguments,
            }),
            inference_failed,
        ))
    }

    fn is_applicable(&mut self, method: &Method, mapping: &[Option<usize>], args: &[Argument<'_>]) -> bool {
        for (parameter, slot) in method.parameters.iter().zip(mapping) {
            let Some(i) = slot else { continue };
            let ok = match &args[*i].value {
                ArgumentValue::Bound(expr) => conversions::implicit(expr, &parameter.ty).is_some(),
                ArgumentValue::Lambda(node) => match &parameter.ty {
                    Type::Function(signature) => self.trial(|b| b.bind_lambda(node, signature)).is_ok(),
                    _ => false,
                },
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Infers method type arguments from the bound arguments first, then
    /// from lambda bodies once their parameter types are known.
    fn infer(&mut self, method: &Method, mapping: &[Option<usize>], args: &[Argument<'_>]) -> Option<Vec<Type>> {
        let mut inferred: Vec<Option<Type>> = vec![None; method.generic_arity as usize];
        let mut lambdas = Vec::new();
        for (parameter, slot) in method.parameters.iter().zip(mapping) {
            let Some(i) = slot else { continue };
            match &args[*i].value {
                ArgumentValue::Bound(expr) => unify(&parameter.ty, &expr.ty, &mut inferred),
                ArgumentValue::Lambda(node) => lambdas.push((&parameter.ty, *node)),
            }
        }

        loop {
            let mut progressed = false;
            let mut pending = Vec::new();
            for (parameter, node) in lambdas {
                let Type::Function(signature) = parameter else {
                    return None;
                };
                let known = substitute_known(&inferred);
                let parameter_types: Vec<Type> = signature.parameters.iter().map(|p| p.substitute(&known)).collect();
                if parameter_types.iter().any(Type::contains_generic_parameter) {
                    pending.push((parameter, node));
                    continue;
                }
                let body = self.trial(|b| b.lambda_body_type(node, &parameter_types)).ok()?;
                unify(&signature.return_type, &body, &mut inferred);
                progressed = true;
            }
            lambdas = pending;
            if lambdas.is_empty() || !progressed {
                break;
            }
        }
        inferred.into_iter().collect()
    }
}

/// Maps arguments to parameters: positional ones by position, named ones
/// by name. Each unmapped parameter must have a default.
fn map_arguments(method: &Method, args: &[Argument<'_>]) -> Option<Vec<Option<usize>>> {
    let mut mapping = vec![None; method.parameters.len()];
    for (i, arg) in args.iter().enumerate() {
        let k = match arg.name {
            None => i,
            Some(name) => method.parameters.iter().position(|p| p.name.as_str() == name)?,
        };
        if k >= mapping.len() || mapping[k].is_some() {
            return None;
        }
        mapping[k] = Some(i);
    }
    let complete = method
        .parameters
        .iter()
        .zip(&mapping)
        .all(|(p, m)| m.is_some() || p.is_optional());
    complete.then_some(mapping)
}

/// Whether `a` is a better function member than `b` for these arguments.
fn is_better(a: &Candidate, b: &Candidate, args: &[Argument<'_>]) -> bool {
    let mut better_somewhere = false;
    for (i, arg) in args.iter().enumerate() {
        let (Some(pa), Some(pb)) = (a.parameter_for(i), b.parameter_for(i)) else {
            continue;
        };
        if conversions::better_conversion(arg.ty(), pb, pa) {
            return false;
        }
        if conversions::better_conversion(arg.ty(), pa, pb) {
            better_somewhere = true;
        }
    }
    if better_somewhere {
        return true;
    }
    if !a.generic && b.generic {
        return true;
    }
    a.defaulted() == 0 && b.defaulted() > 0
}

/// Records what `GenericParameter`s in `parameter` stand for, given the
/// argument type. The first binding of each parameter wins.
fn unify(parameter: &Type, argument: &Type, inferred: &mut [Option<Type>]) {
    match (parameter, argument) {
        (Type::GenericParameter(i), _) => {
            let slot = &mut inferred[*i as usize];
            if slot.is_none() && !matches!(argument, Type::Null) {
                *slot = Some(argument.clone());
            }
        }
        (Type::Nullable(p), Type::Nullable(a)) => unify(p, a, inferred),
        (Type::Nullable(p), a) if a.is_value_type() => unify(p, a, inferred),
        (Type::Array(p), Type::Array(a)) => unify(p, a, inferred),
        (Type::Function(p), Type::Function(a)) if p.parameters.len() == a.parameters.len() => {
            for (p, a) in p.parameters.iter().zip(&a.parameters) {
                unify(p, a, inferred);
            }
            unify(&p.return_type, &a.return_type, inferred);
        }
        _ => {}
    }
}

/// Known type arguments, with unknown ones left as their parameter.
fn substitute_known(inferred: &[Option<Type>]) -> Vec<Type> {
    inferred
        .iter()
        .enumerate()
        .map(|(i, t)| t.clone().unwrap_or(Type::GenericParameter(i as u8)))
        .collect()
}

fn describe_arguments(args: &[Argument<'_>]) -> String {
    let described: Vec<String> = args
        .iter()
        .map(|a| {
            let ty = match a.ty() {
                Some(t) => t.to_string(),
                None => "lambda expression".to_string(),
            };
            match a.name {
                Some(name) => format!("{}: {}", name, ty),
                None => ty,
            }
        })
        .collect();
    described.join(", ")
}
