//! Parse tree built by the shunting-yard parser.
//!
//! Nodes live in a per-parse bump arena and reference their children by
//! slice. Each kind has a fixed child layout, checked when the tree is
//! lowered to the syntax tree:
//!
//! | kind            | text            | children                              |
//! |-----------------|-----------------|---------------------------------------|
//! | Literal         | literal text    | -                                     |
//! | Identifier      | name            | -                                     |
//! | GenericName     | -               | target, type args...                  |
//! | MemberAccess    | member name     | target                                |
//! | NullMemberAccess| member name     | target                                |
//! | Call            | -               | callee, Arguments                     |
//! | Index           | -               | target, Arguments                     |
//! | NullIndex       | -               | target, Arguments                     |
//! | Arguments       | -               | args (NamedArgument allowed)          |
//! | NamedArgument   | name            | value                                 |
//! | Binary          | operator        | left, right                           |
//! | Unary           | operator        | operand                               |
//! | Conditional     | -               | condition, when true, when false      |
//! | Group           | -               | inner                                 |
//! | Cast            | -               | type, operand                         |
//! | Is / As         | -               | operand, type                         |
//! | TypeOf/Default  | -               | type                                  |
//! | Checked/Unchecked | -             | operand                               |
//! | Lambda          | -               | Arguments (params), body              |
//! | LambdaParameter | name            | [type]                                |
//! | NullableType    | -               | type                                  |
//! | ArrayType       | rank commas     | element type                          |
//! | New             | -               | type, Arguments, [Initializer]        |
//! | NewArray        | -               | element type, Arguments (bounds)      |
//! | NewArrayInit    | -               | element type or Empty, Initializer    |
//! | Initializer     | -               | elements (Assign / expr / Initializer)|
//! | Assign          | member name     | value or Initializer                  |
//! | Empty           | -               | -                                     |

use core::fmt;

use crate::lexer::TokenKind;
use crate::syntax::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseKind {
    Literal,
    Identifier,
    GenericName,
    MemberAccess,
    NullMemberAccess,
    Call,
    Index,
    NullIndex,
    Arguments,
    NamedArgument,
    Binary,
    Unary,
    Conditional,
    Group,
    Cast,
    Is,
    As,
    TypeOf,
    Default,
    Checked,
    Unchecked,
    Lambda,
    LambdaParameter,
    NullableType,
    ArrayType,
    New,
    NewArray,
    NewArrayInit,
    Initializer,
    Assign,
    Empty,
}

#[derive(Debug)]
pub struct ParseNode<'a> {
    pub kind: ParseKind,
    /// Kind of the token this node was built from; distinguishes number,
    /// string and char literals.
    pub token: TokenKind,
    /// Source text of the token (operator symbol, name, literal text).
    pub text: &'a str,
    /// Unescaped literal value for strings and chars.
    pub value: Option<&'a str>,
    pub span: Span,
    pub children: &'a [&'a ParseNode<'a>],
}

impl<'a> ParseNode<'a> {
    /// Whether this node could also be read as a type name.
    pub fn is_type_like(&self) -> bool {
        match self.kind {
            ParseKind::Identifier => true,
            ParseKind::MemberAccess | ParseKind::GenericName => {
                self.children.first().is_some_and(|c| c.is_type_like())
            }
            ParseKind::NullableType | ParseKind::ArrayType => true,
            _ => false,
        }
    }

    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.iter().copied());
        }
        count
    }
}

impl fmt::Display for ParseNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}", self.kind)?;
        if !self.text.is_empty() {
            write!(f, " {}", self.text)?;
        }
        for child in self.children {
            write!(f, " {}", child)?;
        }
        write!(f, ")")
    }
}
