mod error;
mod token;
mod tokenizer;

#[cfg(test)]
mod tokenizer_test;

pub use error::{LexError, LexErrorKind};
pub use token::{KEYWORDS, TYPE_KEYWORDS, Token, TokenKind, type_keyword_alias};
pub use tokenizer::tokenize;
