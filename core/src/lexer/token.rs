use core::fmt;

use ecow::EcoString;

use crate::syntax::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Char,

    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Tilde,
    Bang,
    Assign,
    EqEq,
    BangEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LtLt,
    GtGt,
    Question,
    QuestionQuestion,
    QuestionDot,
    QuestionBracket,
    Colon,
    Dot,
    Comma,
    Arrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    End,
}

impl TokenKind {
    /// Punctuators ordered longest first, so the tokenizer can match greedily.
    pub(crate) const PUNCTUATORS: &'static [(&'static str, TokenKind)] = &[
        ("?.", TokenKind::QuestionDot),
        ("?[", TokenKind::QuestionBracket),
        ("??", TokenKind::QuestionQuestion),
        ("=>", TokenKind::Arrow),
        ("==", TokenKind::EqEq),
        ("!=", TokenKind::BangEq),
        ("<=", TokenKind::LtEq),
        (">=", TokenKind::GtEq),
        ("<<", TokenKind::LtLt),
        (">>", TokenKind::GtGt),
        ("&&", TokenKind::AmpAmp),
        ("||", TokenKind::PipePipe),
        ("**", TokenKind::StarStar),
        ("+", TokenKind::Plus),
        ("-", TokenKind::Minus),
        ("*", TokenKind::Star),
        ("/", TokenKind::Slash),
        ("%", TokenKind::Percent),
        ("&", TokenKind::Amp),
        ("|", TokenKind::Pipe),
        ("^", TokenKind::Caret),
        ("~", TokenKind::Tilde),
        ("!", TokenKind::Bang),
        ("=", TokenKind::Assign),
        ("<", TokenKind::Lt),
        (">", TokenKind::Gt),
        ("?", TokenKind::Question),
        (":", TokenKind::Colon),
        (".", TokenKind::Dot),
        (",", TokenKind::Comma),
        ("(", TokenKind::LParen),
        (")", TokenKind::RParen),
        ("[", TokenKind::LBracket),
        ("]", TokenKind::RBracket),
        ("{", TokenKind::LBrace),
        ("}", TokenKind::RBrace),
    ];

    pub fn is_literal(self) -> bool {
        matches!(self, TokenKind::Number | TokenKind::String | TokenKind::Char)
    }

    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string literal",
            TokenKind::Char => "character literal",
            TokenKind::End => "end of expression",
            other => TokenKind::PUNCTUATORS
                .iter()
                .find(|(_, kind)| *kind == other)
                .map(|(text, _)| *text)
                .unwrap_or("token"),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A position-tagged token. `text` is the exact source slice; `value` holds
/// the unescaped contents of string and char literals and the bare name of
/// verbatim identifiers (`@class` → `class`).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: EcoString,
    pub value: Option<EcoString>,
    pub verbatim: bool,
    pub line: u32,
    pub column: u32,
    pub offset: usize,
    pub length: usize,
}

/// Words that are never identifiers unless written verbatim (`@new`).
pub const KEYWORDS: &[&str] = &[
    "as", "checked", "default", "false", "is", "new", "null", "true", "typeof", "unchecked",
];

/// Built-in type keywords and the CLR names they alias.
pub const TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("bool", "System.Boolean"),
    ("byte", "System.Byte"),
    ("sbyte", "System.SByte"),
    ("short", "System.Int16"),
    ("ushort", "System.UInt16"),
    ("int", "System.Int32"),
    ("uint", "System.UInt32"),
    ("long", "System.Int64"),
    ("ulong", "System.UInt64"),
    ("float", "System.Single"),
    ("double", "System.Double"),
    ("decimal", "System.Decimal"),
    ("char", "System.Char"),
    ("string", "System.String"),
    ("object", "System.Object"),
];

impl Token {
    pub fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.length)
    }

    /// Identifier name, with the `@` of verbatim identifiers removed.
    pub fn name(&self) -> &str {
        match (&self.value, self.kind) {
            (Some(v), TokenKind::Identifier) => v.as_str(),
            _ => self.text.as_str(),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && !self.verbatim && self.text == word
    }

    pub fn is_any_keyword(&self) -> bool {
        self.kind == TokenKind::Identifier && !self.verbatim && KEYWORDS.contains(&self.text.as_str())
    }

    pub fn is_type_keyword(&self) -> bool {
        self.kind == TokenKind::Identifier
            && !self.verbatim
            && TYPE_KEYWORDS.iter().any(|(k, _)| *k == self.text.as_str())
    }
}

/// Maps `int` to `System.Int32` and so on.
pub fn type_keyword_alias(name: &str) -> Option<&'static str> {
    TYPE_KEYWORDS
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, full)| *full)
}
