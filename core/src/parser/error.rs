use thiserror::Error;

use crate::api::{Diagnostic, Severity};
use crate::syntax::Span;

/// Parser error carrying the offending token's text and position.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} (found '{token}')")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub token: String,
    pub span: Span,
}

/// Specific kinds of parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("expression is empty")]
    EmptyExpression,
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("expected an operand")]
    MissingOperand,
    #[error("unclosed '{0}'")]
    UnclosedBracket(char),
    #[error("'{found}' does not match the open '{open}'")]
    MismatchedBracket { open: char, found: char },
    #[error("missing ':' in conditional expression")]
    MissingColon,
    #[error("':' without a matching '?'")]
    UnmatchedColon,
    #[error("malformed generic argument list")]
    MalformedGenericArguments,
    #[error("expected a type")]
    ExpectedType,
    #[error("expected an identifier")]
    ExpectedIdentifier,
    #[error("positional argument after named argument")]
    PositionalAfterNamed,
    #[error("initializer mixes member assignments and collection elements")]
    MixedInitializer,
    #[error("malformed {kind}: {detail}")]
    Malformed { kind: &'static str, detail: String },
    #[error("{0} is not supported")]
    Unsupported(String),
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, token: impl Into<String>, span: Span) -> Self {
        ParseError {
            kind,
            token: token.into(),
            span,
        }
    }

    /// Convert to a Diagnostic for API boundary
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, help) = match &self.kind {
            ParseErrorKind::EmptyExpression => ("P001", None),
            ParseErrorKind::UnexpectedToken(_) => ("P002", None),
            ParseErrorKind::MissingOperand => ("P003", None),
            ParseErrorKind::UnclosedBracket(_) => ("P004", Some("add the missing closing delimiter")),
            ParseErrorKind::MismatchedBracket { .. } => ("P005", None),
            ParseErrorKind::MissingColon => ("P006", Some("a conditional needs both branches: c ? a : b")),
            ParseErrorKind::UnmatchedColon => ("P007", None),
            ParseErrorKind::MalformedGenericArguments => ("P008", None),
            ParseErrorKind::ExpectedType => ("P009", None),
            ParseErrorKind::ExpectedIdentifier => ("P010", None),
            ParseErrorKind::PositionalAfterNamed => (
                "P011",
                Some("named arguments must follow all positional arguments"),
            ),
            ParseErrorKind::MixedInitializer => ("P012", None),
            ParseErrorKind::Malformed { .. } => ("P013", None),
            ParseErrorKind::Unsupported(_) => ("P014", None),
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
