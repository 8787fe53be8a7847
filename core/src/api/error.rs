//! Public error types for the engine API.
//!
//! Stage errors (lexing, parsing, binding, evaluation) are converted to
//! these types at API boundaries.

use core::fmt;

use crate::binder::BindError;
use crate::evaluator::Fault;
use crate::parser::SyntaxError;
use crate::syntax::Span;

/// Public error type for all engine operations.
#[derive(Debug, Clone)]
pub enum Error {
    /// Invalid API usage (wrong argument count or types, unknown result type).
    Api(String),

    /// The expression failed to parse or bind.
    ///
    /// `source` is the expression text the diagnostic spans point into.
    Compilation {
        diagnostics: Vec<Diagnostic>,
        source: String,
    },

    /// Evaluation raised a fault.
    Runtime { fault: Fault },
}

impl Error {
    pub(crate) fn syntax(source: &str, err: SyntaxError) -> Self {
        Error::Compilation {
            diagnostics: vec![err.to_diagnostic()],
            source: source.to_string(),
        }
    }

    pub(crate) fn bind(source: &str, err: BindError) -> Self {
        Error::Compilation {
            diagnostics: vec![err.to_diagnostic()],
            source: source.to_string(),
        }
    }

    /// The runtime fault, if this is a runtime error.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Error::Runtime { fault } => Some(fault),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Api(msg) => write!(f, "API error: {}", msg),
            Error::Compilation { diagnostics, .. } => match diagnostics.as_slice() {
                [single] => write!(f, "Compilation failed: {}", single.message),
                _ => {
                    let error_count = diagnostics
                        .iter()
                        .filter(|d| d.severity == Severity::Error)
                        .count();
                    write!(f, "Compilation failed with {} error(s)", error_count)
                }
            },
            Error::Runtime { fault } => write!(f, "Runtime error: {}", fault),
        }
    }
}

impl std::error::Error for Error {}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Self {
        Error::Runtime { fault }
    }
}

/// A diagnostic message with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Optional help text suggesting how to fix the issue.
    pub help: Option<String>,

    /// Stable error code: `L0xx` lexing, `P0xx` parsing, `B0xx` binding.
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}
