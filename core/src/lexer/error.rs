use thiserror::Error;

use crate::api::{Diagnostic, Severity};
use crate::syntax::Span;
use crate::syntax::string_literal::UnescapeError;

/// A malformed token. Always fatal to the parse.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated character literal")]
    UnterminatedChar,
    #[error("empty character literal")]
    EmptyChar,
    #[error("too many characters in character literal")]
    TooManyChars,
    #[error("{0}")]
    InvalidEscape(UnescapeError),
    #[error("{0}")]
    MalformedNumber(String),
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

impl LexError {
    pub fn position(&self) -> usize {
        self.span.start()
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, help) = match &self.kind {
            LexErrorKind::UnterminatedString => ("L001", Some("add a closing '\"'")),
            LexErrorKind::UnterminatedChar => ("L002", Some("add a closing '''")),
            LexErrorKind::EmptyChar => ("L003", None),
            LexErrorKind::TooManyChars => ("L004", Some("use a string literal for text")),
            LexErrorKind::InvalidEscape(_) => ("L005", None),
            LexErrorKind::MalformedNumber(_) => (
                "L006",
                Some("valid suffixes are u, l, ul, f, d and m"),
            ),
            LexErrorKind::UnexpectedCharacter(_) => ("L007", None),
        };
        Diagnostic {
            severity: Severity::Error,
            message: self.kind.to_string(),
            span: self.span.clone(),
            related: Vec::new(),
            help: help.map(|h| h.to_string()),
            code: Some(code.to_string()),
        }
    }
}
