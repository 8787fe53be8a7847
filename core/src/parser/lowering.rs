//! Lowers the arena parse tree into the owned [`SyntaxNode`] tree.
//!
//! Every parse kind has one fixed child layout; a node that does not match is
//! reported rather than guessed at. The lexical `checked`/`unchecked` scope is
//! resolved here and stamped onto every arithmetic and cast node.

use tracing::trace;

use super::error::{ParseError, ParseErrorKind};
use super::parse_tree::{ParseKind, ParseNode};
use crate::lexer::TokenKind;
use crate::stack::ensure_sufficient_stack;
use crate::syntax::{BinaryOp, UnaryOp};
use crate::syntax_tree::{
    ArgumentList, ElementInitializer, Initializer, LambdaParameter, Literal, MemberInitializer,
    MemberValue, NamedArgument, SyntaxKind, SyntaxNode, TypeRef,
};

/// Lowers `node` with `checked` as the overflow context outside any explicit
/// `checked(...)` / `unchecked(...)` scope.
pub fn lower(node: &ParseNode<'_>, checked: bool) -> Result<SyntaxNode, ParseError> {
    let syntax = Lowering.expr(node, checked)?;
    trace!(checked, "lowered parse tree");
    Ok(syntax)
}

fn malformed(node: &ParseNode<'_>, detail: String) -> ParseError {
    ParseError::new(
        ParseErrorKind::Malformed {
            kind: "parse tree",
            detail,
        },
        node.text,
        node.span.clone(),
    )
}

/// Checks the child count of `node`.
fn ensure(node: &ParseNode<'_>, count: usize) -> Result<(), ParseError> {
    if node.children.len() != count {
        return Err(malformed(
            node,
            format!(
                "{:?} expects {} children, found {}",
                node.kind,
                count,
                node.children.len()
            ),
        ));
    }
    Ok(())
}

/// Checks that `node` is one of `kinds`.
fn ensure_kind(node: &ParseNode<'_>, kinds: &[ParseKind]) -> Result<(), ParseError> {
    if !kinds.contains(&node.kind) {
        return Err(malformed(
            node,
            format!("expected one of {:?}, found {:?}", kinds, node.kind),
        ));
    }
    Ok(())
}

fn name_of(text: &str) -> String {
    text.strip_prefix('@').unwrap_or(text).to_string()
}

struct Lowering;

impl Lowering {
    fn expr(&self, node: &ParseNode<'_>, checked: bool) -> Result<SyntaxNode, ParseError> {
        ensure_sufficient_stack(|| self.expr_inner(node, checked))
    }

    fn expr_inner(&self, node: &ParseNode<'_>, checked: bool) -> Result<SyntaxNode, ParseError> {
        let span = node.span.clone();
        let kind = match node.kind {
            ParseKind::Literal => {
                ensure(node, 0)?;
                SyntaxKind::Literal(self.literal(node)?)
            }
            ParseKind::Identifier => {
                ensure(node, 0)?;
                SyntaxKind::Identifier {
                    name: name_of(node.text),
                    type_arguments: Vec::new(),
                }
            }
            ParseKind::GenericName => {
                let Some((target, args)) = node.children.split_first() else {
                    return Err(malformed(node, "generic name without target".into()));
                };
                if args.is_empty() {
                    return Err(ParseError::new(
                        ParseErrorKind::MalformedGenericArguments,
                        node.text,
                        span,
                    ));
                }
                let type_arguments = args
                    .iter()
                    .map(|a| self.type_ref(a))
                    .collect::<Result<Vec<_>, _>>()?;
                match target.kind {
                    ParseKind::Identifier => SyntaxKind::Identifier {
                        name: name_of(target.text),
                        type_arguments,
                    },
                    ParseKind::MemberAccess | ParseKind::NullMemberAccess => {
                        ensure(target, 1)?;
                        SyntaxKind::MemberAccess {
                            target: Box::new(self.expr(target.children[0], checked)?),
                            member: name_of(target.text),
                            type_arguments,
                            null_conditional: target.kind == ParseKind::NullMemberAccess,
                        }
                    }
                    _ => {
                        return Err(ParseError::new(
                            ParseErrorKind::MalformedGenericArguments,
                            target.text,
                            target.span.clone(),
                        ));
                    }
                }
            }
            ParseKind::MemberAccess | ParseKind::NullMemberAccess => {
                ensure(node, 1)?;
                SyntaxKind::MemberAccess {
                    target: Box::new(self.expr(node.children[0], checked)?),
                    member: name_of(node.text),
                    type_arguments: Vec::new(),
                    null_conditional: node.kind == ParseKind::NullMemberAccess,
                }
            }
            ParseKind::Call => {
                ensure(node, 2)?;
                ensure_kind(node.children[1], &[ParseKind::Arguments])?;
                SyntaxKind::Call {
                    target: Box::new(self.expr(node.children[0], checked)?),
                    arguments: self.arguments(node.children[1], checked)?,
                }
            }
            ParseKind::Index | ParseKind::NullIndex => {
                ensure(node, 2)?;
                ensure_kind(node.children[1], &[ParseKind::Arguments])?;
                SyntaxKind::Index {
                    target: Box::new(self.expr(node.children[0], checked)?),
                    arguments: self.arguments(node.children[1], checked)?,
                    null_conditional: node.kind == ParseKind::NullIndex,
                }
            }
            ParseKind::Binary => {
                ensure(node, 2)?;
                let op = BinaryOp::from_symbol(node.text)
                    .ok_or_else(|| malformed(node, format!("unknown operator '{}'", node.text)))?;
                SyntaxKind::Binary {
                    op,
                    left: Box::new(self.expr(node.children[0], checked)?),
                    right: Box::new(self.expr(node.children[1], checked)?),
                    checked,
                }
            }
            ParseKind::Unary => {
                ensure(node, 1)?;
                let op = UnaryOp::from_symbol(node.text)
                    .ok_or_else(|| malformed(node, format!("unknown operator '{}'", node.text)))?;
                SyntaxKind::Unary {
                    op,
                    operand: Box::new(self.expr(node.children[0], checked)?),
                    checked,
                }
            }
            ParseKind::Conditional => {
                ensure(node, 3)?;
                SyntaxKind::Conditional {
                    condition: Box::new(self.expr(node.children[0], checked)?),
                    when_true: Box::new(self.expr(node.children[1], checked)?),
                    when_false: Box::new(self.expr(node.children[2], checked)?),
                }
            }
            ParseKind::Group => {
                ensure(node, 1)?;
                return self.expr(node.children[0], checked);
            }
            ParseKind::Cast => {
                ensure(node, 2)?;
                SyntaxKind::Cast {
                    ty: self.type_ref(node.children[0])?,
                    operand: Box::new(self.expr(node.children[1], checked)?),
                    checked,
                }
            }
            ParseKind::Is | ParseKind::As => {
                ensure(node, 2)?;
                let operand = Box::new(self.expr(node.children[0], checked)?);
                let ty = self.type_ref(node.children[1])?;
                if node.kind == ParseKind::Is {
                    SyntaxKind::Is { operand, ty }
                } else {
                    SyntaxKind::As { operand, ty }
                }
            }
            ParseKind::TypeOf => {
                ensure(node, 1)?;
                SyntaxKind::TypeOf(self.type_ref(node.children[0])?)
            }
            ParseKind::Default => {
                ensure(node, 1)?;
                SyntaxKind::Default(self.type_ref(node.children[0])?)
            }
            ParseKind::Checked | ParseKind::Unchecked => {
                ensure(node, 1)?;
                let scope = node.kind == ParseKind::Checked;
                SyntaxKind::OverflowScope {
                    checked: scope,
                    operand: Box::new(self.expr(node.children[0], scope)?),
                }
            }
            ParseKind::Lambda => {
                ensure(node, 2)?;
                ensure_kind(node.children[0], &[ParseKind::Arguments])?;
                let parameters = node.children[0]
                    .children
                    .iter()
                    .map(|p| self.lambda_parameter(p))
                    .collect::<Result<Vec<_>, _>>()?;
                SyntaxKind::Lambda {
                    parameters,
                    body: Box::new(self.expr(node.children[1], checked)?),
                }
            }
            ParseKind::New => {
                if !(2..=3).contains(&node.children.len()) {
                    ensure(node, 3)?;
                }
                ensure_kind(node.children[1], &[ParseKind::Arguments])?;
                let initializer = match node.children.get(2) {
                    Some(init) => Some(self.initializer(init, checked)?),
                    None => None,
                };
                SyntaxKind::New {
                    ty: self.type_ref(node.children[0])?,
                    arguments: self.arguments(node.children[1], checked)?,
                    initializer,
                }
            }
            ParseKind::NewArray => {
                ensure(node, 2)?;
                ensure_kind(node.children[1], &[ParseKind::Arguments])?;
                let args = self.arguments(node.children[1], checked)?;
                if !args.named.is_empty() {
                    return Err(malformed(node, "array bounds cannot be named".into()));
                }
                SyntaxKind::NewArrayBounds {
                    element: self.type_ref(node.children[0])?,
                    bounds: args.positional,
                }
            }
            ParseKind::NewArrayInit => {
                ensure(node, 2)?;
                ensure_kind(node.children[1], &[ParseKind::Initializer])?;
                let element = match node.children[0].kind {
                    ParseKind::Empty => None,
                    ParseKind::ArrayType => match self.type_ref(node.children[0])? {
                        TypeRef::Array { element, rank: 1 } => Some(*element),
                        _ => {
                            return Err(ParseError::new(
                                ParseErrorKind::Unsupported(
                                    "multi-dimensional array initializer".into(),
                                ),
                                node.text,
                                span,
                            ));
                        }
                    },
                    _ => return Err(malformed(node, "array initializer without array type".into())),
                };
                let elements = node.children[1]
                    .children
                    .iter()
                    .map(|e| {
                        if matches!(e.kind, ParseKind::Assign | ParseKind::Initializer) {
                            Err(ParseError::new(
                                ParseErrorKind::Unsupported("nested initializer in array".into()),
                                e.text,
                                e.span.clone(),
                            ))
                        } else {
                            self.expr(e, checked)
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                SyntaxKind::NewArrayInit { element, elements }
            }
            ParseKind::NullableType | ParseKind::ArrayType => {
                return Err(ParseError::new(
                    ParseErrorKind::Unsupported("a type in expression position".into()),
                    node.text,
                    span,
                ));
            }
            ParseKind::Arguments
            | ParseKind::NamedArgument
            | ParseKind::LambdaParameter
            | ParseKind::Initializer
            | ParseKind::Assign
            | ParseKind::Empty => {
                return Err(malformed(
                    node,
                    format!("{:?} is not an expression", node.kind),
                ));
            }
        };
        Ok(SyntaxNode::new(span, kind))
    }

    fn literal(&self, node: &ParseNode<'_>) -> Result<Literal, ParseError> {
        match node.token {
            TokenKind::Number => Ok(Literal::Number(node.text.to_string())),
            TokenKind::String => Ok(Literal::String(node.value.unwrap_or_default().to_string())),
            TokenKind::Char => node
                .value
                .and_then(|v| v.chars().next())
                .map(Literal::Char)
                .ok_or_else(|| malformed(node, "empty character literal".into())),
            other => Err(malformed(node, format!("{} is not a literal", other))),
        }
    }

    fn arguments(&self, node: &ParseNode<'_>, checked: bool) -> Result<ArgumentList, ParseError> {
        let mut list = ArgumentList::default();
        for arg in node.children {
            if arg.kind == ParseKind::NamedArgument {
                ensure(arg, 1)?;
                list.named.push(NamedArgument {
                    name: name_of(arg.text),
                    value: self.expr(arg.children[0], checked)?,
                    span: arg.span.clone(),
                });
            } else if !list.named.is_empty() {
                return Err(ParseError::new(
                    ParseErrorKind::PositionalAfterNamed,
                    arg.text,
                    arg.span.clone(),
                ));
            } else {
                list.positional.push(self.expr(arg, checked)?);
            }
        }
        Ok(list)
    }

    fn lambda_parameter(&self, node: &ParseNode<'_>) -> Result<LambdaParameter, ParseError> {
        ensure_kind(node, &[ParseKind::LambdaParameter])?;
        let ty = match node.children {
            [] => None,
            [ty] => Some(self.type_ref(ty)?),
            _ => return Err(malformed(node, "lambda parameter with several types".into())),
        };
        Ok(LambdaParameter {
            name: name_of(node.text),
            ty,
            span: node.span.clone(),
        })
    }

    fn initializer(&self, node: &ParseNode<'_>, checked: bool) -> Result<Initializer, ParseError> {
        ensure_kind(node, &[ParseKind::Initializer])?;
        let assigns = node
            .children
            .iter()
            .filter(|c| c.kind == ParseKind::Assign)
            .count();
        if assigns == node.children.len() {
            let members = node
                .children
                .iter()
                .map(|m| {
                    ensure(m, 1)?;
                    let value = match m.children[0].kind {
                        ParseKind::Initializer => {
                            MemberValue::Initializer(self.initializer(m.children[0], checked)?)
                        }
                        _ => MemberValue::Expression(self.expr(m.children[0], checked)?),
                    };
                    Ok(MemberInitializer {
                        member: name_of(m.text),
                        value,
                        span: m.span.clone(),
                    })
                })
                .collect::<Result<Vec<_>, ParseError>>()?;
            return Ok(Initializer::Object(members));
        }
        if assigns > 0 {
            return Err(ParseError::new(
                ParseErrorKind::MixedInitializer,
                "{",
                node.span.clone(),
            ));
        }
        let elements = node
            .children
            .iter()
            .map(|e| {
                let arguments = if e.kind == ParseKind::Initializer {
                    e.children
                        .iter()
                        .map(|a| self.expr(a, checked))
                        .collect::<Result<Vec<_>, _>>()?
                } else {
                    vec![self.expr(e, checked)?]
                };
                Ok(ElementInitializer {
                    arguments,
                    span: e.span.clone(),
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;
        Ok(Initializer::Collection(elements))
    }

    /// Reads a type-like subtree as a type reference.
    fn type_ref(&self, node: &ParseNode<'_>) -> Result<TypeRef, ParseError> {
        let expected_type = || ParseError::new(ParseErrorKind::ExpectedType, node.text, node.span.clone());
        match node.kind {
            ParseKind::Identifier | ParseKind::MemberAccess => Ok(TypeRef::Named {
                path: self.type_path(node)?,
                type_arguments: Vec::new(),
            }),
            ParseKind::GenericName => {
                let Some((target, args)) = node.children.split_first() else {
                    return Err(expected_type());
                };
                let type_arguments = args
                    .iter()
                    .map(|a| self.type_ref(a))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypeRef::Named {
                    path: self.type_path(target)?,
                    type_arguments,
                })
            }
            ParseKind::NullableType => {
                ensure(node, 1)?;
                Ok(TypeRef::Nullable(Box::new(self.type_ref(node.children[0])?)))
            }
            ParseKind::ArrayType => {
                ensure(node, 1)?;
                let rank = u8::try_from(node.text.len() + 1).map_err(|_| expected_type())?;
                Ok(TypeRef::Array {
                    element: Box::new(self.type_ref(node.children[0])?),
                    rank,
                })
            }
            _ => Err(expected_type()),
        }
    }

    fn type_path(&self, node: &ParseNode<'_>) -> Result<Vec<String>, ParseError> {
        let mut path = Vec::new();
        let mut current = node;
        loop {
            match current.kind {
                ParseKind::Identifier => {
                    path.push(name_of(current.text));
                    break;
                }
                ParseKind::MemberAccess => {
                    ensure(current, 1)?;
                    path.push(name_of(current.text));
                    current = current.children[0];
                }
                ParseKind::GenericName => {
                    return Err(ParseError::new(
                        ParseErrorKind::Unsupported("type arguments on an enclosing type".into()),
                        current.text,
                        current.span.clone(),
                    ));
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedType,
                        current.text,
                        current.span.clone(),
                    ));
                }
            }
        }
        path.reverse();
        Ok(path)
    }
}
