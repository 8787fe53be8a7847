// These are common syntax structures used by the lexer, the parser, the
// syntax tree and the typed expression tree.

pub mod number_literal;
pub mod string_literal;

use core::fmt;
use core::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self(start..end)
    }
    pub fn combine(a: &Span, b: &Span) -> Span {
        Span::new(a.0.start.min(b.0.start), a.0.end.max(b.0.end))
    }
    pub fn start(&self) -> usize {
        self.0.start
    }
    pub fn end(&self) -> usize {
        self.0.end
    }
    pub fn str_of<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.0.start..self.0.end).unwrap_or("")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    LeftShift,
    RightShift,
    And,
    Or,
    ExclusiveOr,
    AndAlso,
    OrElse,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Coalesce,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 20] = [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::Multiply,
        BinaryOp::Divide,
        BinaryOp::Modulo,
        BinaryOp::Power,
        BinaryOp::LeftShift,
        BinaryOp::RightShift,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::ExclusiveOr,
        BinaryOp::AndAlso,
        BinaryOp::OrElse,
        BinaryOp::Equal,
        BinaryOp::NotEqual,
        BinaryOp::LessThan,
        BinaryOp::LessThanOrEqual,
        BinaryOp::GreaterThan,
        BinaryOp::GreaterThanOrEqual,
        BinaryOp::Coalesce,
    ];

    pub fn from_symbol(symbol: &str) -> Option<BinaryOp> {
        Self::ALL.iter().copied().find(|op| op.symbol() == symbol)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::ExclusiveOr => "^",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::Coalesce => "??",
        }
    }

    /// Binding strength; higher binds tighter. Shared by the parser and the
    /// renderer so both agree on parenthesization.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Coalesce => 4,
            BinaryOp::OrElse => 5,
            BinaryOp::AndAlso => 6,
            BinaryOp::Or => 7,
            BinaryOp::ExclusiveOr => 8,
            BinaryOp::And => 9,
            BinaryOp::Equal | BinaryOp::NotEqual => 10,
            BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual => 11,
            BinaryOp::LeftShift | BinaryOp::RightShift => 12,
            BinaryOp::Add | BinaryOp::Subtract => 13,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo | BinaryOp::Power => 14,
        }
    }

    pub fn is_right_associative(self) -> bool {
        matches!(self, BinaryOp::Coalesce)
    }

    /// Name of the static method implementing a user-defined operator.
    pub fn operator_method_name(self) -> Option<&'static str> {
        Some(match self {
            BinaryOp::Add => "op_Addition",
            BinaryOp::Subtract => "op_Subtraction",
            BinaryOp::Multiply => "op_Multiply",
            BinaryOp::Divide => "op_Division",
            BinaryOp::Modulo => "op_Modulus",
            BinaryOp::LeftShift => "op_LeftShift",
            BinaryOp::RightShift => "op_RightShift",
            BinaryOp::And => "op_BitwiseAnd",
            BinaryOp::Or => "op_BitwiseOr",
            BinaryOp::ExclusiveOr => "op_ExclusiveOr",
            BinaryOp::Equal => "op_Equality",
            BinaryOp::NotEqual => "op_Inequality",
            BinaryOp::LessThan => "op_LessThan",
            BinaryOp::LessThanOrEqual => "op_LessThanOrEqual",
            BinaryOp::GreaterThan => "op_GreaterThan",
            BinaryOp::GreaterThanOrEqual => "op_GreaterThanOrEqual",
            BinaryOp::Power | BinaryOp::AndAlso | BinaryOp::OrElse | BinaryOp::Coalesce => {
                return None;
            }
        })
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo
                | BinaryOp::Power
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::LeftShift | BinaryOp::RightShift)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::ExclusiveOr)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual)
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
        )
    }

    pub fn is_comparison(self) -> bool {
        self.is_equality() || self.is_relational()
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Negate,
    Not,
    Complement,
}

impl UnaryOp {
    pub fn from_symbol(symbol: &str) -> Option<UnaryOp> {
        match symbol {
            "+" => Some(UnaryOp::Plus),
            "-" => Some(UnaryOp::Negate),
            "!" => Some(UnaryOp::Not),
            "~" => Some(UnaryOp::Complement),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
            UnaryOp::Complement => "~",
        }
    }

    pub fn operator_method_name(self) -> &'static str {
        match self {
            UnaryOp::Plus => "op_UnaryPlus",
            UnaryOp::Negate => "op_UnaryNegation",
            UnaryOp::Not => "op_LogicalNot",
            UnaryOp::Complement => "op_OnesComplement",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Precedence levels that are not binary operators.
pub mod precedence {
    pub const LAMBDA: u8 = 1;
    pub const ASSIGNMENT: u8 = 2;
    pub const CONDITIONAL: u8 = 3;
    pub const RELATIONAL: u8 = 11;
    pub const UNARY: u8 = 15;
    pub const PRIMARY: u8 = 16;
}
