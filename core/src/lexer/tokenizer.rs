use ecow::EcoString;
use tracing::trace;

use super::error::{LexError, LexErrorKind};
use super::token::{Token, TokenKind};
use crate::syntax::Span;
use crate::syntax::number_literal::validate_suffix;
use crate::syntax::string_literal::{unescape, unescape_verbatim};

/// Converts source text into tokens, ending with a single `End` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        source,
        pos: 0,
        line: 1,
        line_start: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    trace!(count = lexer.tokens.len(), "tokenized");
    Ok(lexer.tokens)
}

struct Lexer<'s> {
    source: &'s str,
    pos: usize,
    line: u32,
    line_start: usize,
    tokens: Vec<Token>,
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

impl<'s> Lexer<'s> {
    fn rest(&self) -> &'s str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
        Some(c)
    }

    fn error_at(&self, start: usize, line: u32, column: u32, kind: LexErrorKind) -> LexError {
        LexError {
            kind,
            span: Span::new(start, self.pos.max(start + 1).min(self.source.len().max(start))),
            line,
            column,
        }
    }

    fn column_of(&self, offset: usize) -> u32 {
        self.source[self.line_start..offset].chars().count() as u32 + 1
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: u32, column: u32, value: Option<EcoString>, verbatim: bool) {
        self.tokens.push(Token {
            kind,
            text: EcoString::from(&self.source[start..self.pos]),
            value,
            verbatim,
            line,
            column,
            offset: start,
            length: self.pos - start,
        });
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    let (line, column) = (self.line, self.column_of(start));
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => {
                                return Err(self.error_at(
                                    start,
                                    line,
                                    column,
                                    LexErrorKind::UnexpectedCharacter('/'),
                                ));
                            }
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn run(&mut self) -> Result<(), LexError> {
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let line = self.line;
            let column = self.column_of(start);

            let Some(c) = self.peek() else {
                self.push(TokenKind::End, start, line, column, None, false);
                return Ok(());
            };

            match c {
                '0'..='9' => self.number(start, line, column)?,
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => {
                    self.number(start, line, column)?
                }
                '"' => self.string(start, line, column)?,
                '\'' => self.char_literal(start, line, column)?,
                '@' if self.peek_at(1) == Some('"') => self.verbatim_string(start, line, column)?,
                '@' if self.peek_at(1).is_some_and(is_ident_start) => {
                    self.bump();
                    self.identifier(start, line, column, true);
                }
                c if is_ident_start(c) => self.identifier(start, line, column, false),
                _ => self.punctuator(start, line, column)?,
            }
        }
    }

    fn identifier(&mut self, start: usize, line: u32, column: u32, verbatim: bool) {
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        let value = verbatim.then(|| EcoString::from(&self.source[start + 1..self.pos]));
        self.push(TokenKind::Identifier, start, line, column, value, verbatim);
    }

    fn number(&mut self, start: usize, line: u32, column: u32) -> Result<(), LexError> {
        let hex = self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X'));
        if hex {
            self.bump();
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.bump();
            }
        } else {
            while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
                self.bump();
            }
            if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
                    self.bump();
                }
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let signed = matches!(self.peek_at(1), Some('+' | '-'));
                let digit_at = if signed { 2 } else { 1 };
                if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    for _ in 0..digit_at {
                        self.bump();
                    }
                    while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        self.bump();
                    }
                }
            }
        }
        // Suffix letters, plus anything glued to them so it can be reported.
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }

        let text = &self.source[start..self.pos];
        validate_suffix(text).map_err(|e| {
            self.error_at(start, line, column, LexErrorKind::MalformedNumber(e.to_string()))
        })?;
        self.push(TokenKind::Number, start, line, column, None, false);
        Ok(())
    }

    fn string(&mut self, start: usize, line: u32, column: u32) -> Result<(), LexError> {
        self.bump();
        let body_start = self.pos;
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(self.error_at(start, line, column, LexErrorKind::UnterminatedString));
                }
                Some('\\') => {
                    self.bump();
                    if self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('"') => break,
                Some(_) => {
                    self.bump();
                }
            }
        }
        let body = &self.source[body_start..self.pos];
        self.bump();
        let value = unescape(body).map_err(|e| LexError {
            span: Span::new(body_start + e.pos(), body_start + e.pos() + 2),
            line,
            column: column + 1 + body[..e.pos()].chars().count() as u32,
            kind: LexErrorKind::InvalidEscape(e),
        })?;
        let value = EcoString::from(value.as_ref());
        self.push(TokenKind::String, start, line, column, Some(value), false);
        Ok(())
    }

    fn verbatim_string(&mut self, start: usize, line: u32, column: u32) -> Result<(), LexError> {
        self.bump();
        self.bump();
        let body_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    return Err(self.error_at(start, line, column, LexErrorKind::UnterminatedString));
                }
                Some('"') if self.peek_at(1) == Some('"') => {
                    self.bump();
                    self.bump();
                }
                Some('"') => break,
                Some(_) => {
                    self.bump();
                }
            }
        }
        let body = &self.source[body_start..self.pos];
        self.bump();
        let value = EcoString::from(unescape_verbatim(body).as_ref());
        self.push(TokenKind::String, start, line, column, Some(value), true);
        Ok(())
    }

    fn char_literal(&mut self, start: usize, line: u32, column: u32) -> Result<(), LexError> {
        self.bump();
        let body_start = self.pos;
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(self.error_at(start, line, column, LexErrorKind::UnterminatedChar));
                }
                Some('\\') => {
                    self.bump();
                    if self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('\'') => break,
                Some(_) => {
                    self.bump();
                }
            }
        }
        let body = &self.source[body_start..self.pos];
        self.bump();
        let value = unescape(body).map_err(|e| LexError {
            span: Span::new(body_start + e.pos(), body_start + e.pos() + 2),
            line,
            column: column + 1 + body[..e.pos()].chars().count() as u32,
            kind: LexErrorKind::InvalidEscape(e),
        })?;
        match value.chars().count() {
            0 => return Err(self.error_at(start, line, column, LexErrorKind::EmptyChar)),
            1 => {}
            _ => return Err(self.error_at(start, line, column, LexErrorKind::TooManyChars)),
        }
        let value = EcoString::from(value.as_ref());
        self.push(TokenKind::Char, start, line, column, Some(value), false);
        Ok(())
    }

    fn punctuator(&mut self, start: usize, line: u32, column: u32) -> Result<(), LexError> {
        let rest = self.rest();
        let Some((text, kind)) = TokenKind::PUNCTUATORS
            .iter()
            .find(|(text, _)| rest.starts_with(text))
        else {
            let c = self.peek().unwrap_or('\0');
            self.bump();
            return Err(self.error_at(start, line, column, LexErrorKind::UnexpectedCharacter(c)));
        };
        self.pos += text.len();
        self.push(*kind, start, line, column, None, false);
        Ok(())
    }
}
