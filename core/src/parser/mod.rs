pub mod error;
mod lowering;
mod parse_tree;
#[allow(clippy::module_inception)]
mod parser;

use bumpalo::Bump;
use thiserror::Error;

pub use error::{ParseError, ParseErrorKind};
pub use lowering::lower;
pub use parse_tree::{ParseKind, ParseNode};
pub use parser::parse;

use crate::lexer::{LexError, tokenize};
use crate::syntax_tree::SyntaxNode;

/// Failure of the source-to-syntax-tree front end.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SyntaxError {
    pub fn to_diagnostic(&self) -> crate::api::Diagnostic {
        match self {
            SyntaxError::Lex(e) => e.to_diagnostic(),
            SyntaxError::Parse(e) => e.to_diagnostic(),
        }
    }
}

/// Tokenizes, parses and lowers `source` in one step.
pub fn parse_syntax_tree(source: &str, checked_by_default: bool) -> Result<SyntaxNode, SyntaxError> {
    let tokens = tokenize(source)?;
    let arena = Bump::new();
    let tree = parse(&arena, &tokens)?;
    Ok(lower(tree, checked_by_default)?)
}

#[cfg(test)]
mod parser_test;

#[cfg(test)]
mod precedence_test;
