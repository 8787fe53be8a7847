//! Operator-precedence parser.
//!
//! A single pass over the token stream with an explicit operand stack and an
//! explicit operator ("frame") stack; there is no recursion, so arbitrarily
//! long token streams parse in constant native stack. Postfix operators
//! (member access, calls, indexers) apply directly to the top operand.
//! Brackets push an `Open` frame that acts as a reduction barrier and
//! remembers the operand stack height at which its contents start.
//!
//! Type names (casts, `is`/`as`, `typeof`, `new`, generic arguments) are read
//! by a separate loop with its own explicit stack of generic argument lists.

use bumpalo::Bump;
use tracing::trace;

use super::error::{ParseError, ParseErrorKind};
use super::parse_tree::{ParseKind, ParseNode};
use crate::lexer::{Token, TokenKind};
use crate::syntax::{BinaryOp, Span, precedence};

/// Parses a token stream (ending with `End`) into a parse tree allocated in
/// `arena`.
pub fn parse<'a>(arena: &'a Bump, tokens: &[Token]) -> Result<&'a ParseNode<'a>, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::EmptyExpression,
            "",
            Span::default(),
        ));
    }
    let mut parser = Parser {
        arena,
        tokens,
        pos: 0,
        half_gt: false,
        operands: Vec::new(),
        frames: Vec::new(),
        expect_operand: true,
    };
    let root = parser.run()?;
    trace!(nodes = root.count(), "parsed");
    Ok(root)
}

enum Frame<'a> {
    Binary { op: BinaryOp, span: Span },
    Unary { symbol: &'a str, span: Span },
    Cast { ty: &'a ParseNode<'a>, span: Span },
    Lambda { params: &'a ParseNode<'a>, span: Span },
    Question { span: Span },
    Colon { span: Span },
    NamedArg { name: &'a str, span: Span },
    Assign { name: &'a str, span: Span },
    Open(Open<'a>),
}

struct Open<'a> {
    kind: OpenKind<'a>,
    base: usize,
    span: Span,
}

enum OpenKind<'a> {
    Group,
    Call,
    Index,
    NullIndex,
    NewArgs(&'a ParseNode<'a>),
    NewBounds(&'a ParseNode<'a>),
    Initializer(InitOwner<'a>),
}

enum InitOwner<'a> {
    /// Object or collection initializer; the `New` node sits just below.
    Object,
    /// Array initializer with its array type, or none for `new[]`.
    Array(Option<&'a ParseNode<'a>>),
    /// `{ ... }` inside another initializer.
    Nested,
}

impl OpenKind<'_> {
    fn opener(&self) -> char {
        match self {
            OpenKind::Group | OpenKind::Call | OpenKind::NewArgs(_) => '(',
            OpenKind::Index | OpenKind::NullIndex | OpenKind::NewBounds(_) => '[',
            OpenKind::Initializer(_) => '{',
        }
    }

    fn closer(&self) -> TokenKind {
        match self.opener() {
            '(' => TokenKind::RParen,
            '[' => TokenKind::RBracket,
            _ => TokenKind::RBrace,
        }
    }

    fn takes_arguments(&self) -> bool {
        matches!(
            self,
            OpenKind::Call | OpenKind::Index | OpenKind::NullIndex | OpenKind::NewArgs(_)
        )
    }

    fn allows_empty(&self) -> bool {
        matches!(
            self,
            OpenKind::Call | OpenKind::NewArgs(_) | OpenKind::Initializer(_)
        )
    }
}

impl Frame<'_> {
    /// Precedence and right-associativity; `None` for reduction barriers.
    fn precedence(&self) -> Option<(u8, bool)> {
        match self {
            Frame::Binary { op, .. } => Some((op.precedence(), op.is_right_associative())),
            Frame::Unary { .. } | Frame::Cast { .. } => Some((precedence::UNARY, true)),
            Frame::Lambda { .. } => Some((precedence::LAMBDA, true)),
            Frame::Question { .. } | Frame::Colon { .. } => Some((precedence::CONDITIONAL, true)),
            Frame::Assign { .. } => Some((precedence::ASSIGNMENT, true)),
            Frame::NamedArg { .. } => Some((0, true)),
            Frame::Open(_) => None,
        }
    }
}

struct Parser<'a, 't> {
    arena: &'a Bump,
    tokens: &'t [Token],
    pos: usize,
    /// The first `>` of a `>>` token has been consumed by a generic list.
    half_gt: bool,
    operands: Vec<&'a ParseNode<'a>>,
    frames: Vec<Frame<'a>>,
    expect_operand: bool,
}

const TYPE_FOLLOWERS_FOR_NULLABLE: &[TokenKind] = &[
    TokenKind::RParen,
    TokenKind::Gt,
    TokenKind::GtGt,
    TokenKind::Comma,
    TokenKind::RBracket,
    TokenKind::LBracket,
    TokenKind::RBrace,
    TokenKind::End,
    TokenKind::QuestionQuestion,
    TokenKind::EqEq,
    TokenKind::BangEq,
    TokenKind::AmpAmp,
    TokenKind::PipePipe,
];

const GENERIC_FOLLOWERS: &[TokenKind] = &[
    TokenKind::LParen,
    TokenKind::RParen,
    TokenKind::RBracket,
    TokenKind::RBrace,
    TokenKind::Colon,
    TokenKind::Comma,
    TokenKind::Dot,
    TokenKind::QuestionDot,
    TokenKind::QuestionBracket,
    TokenKind::Question,
    TokenKind::QuestionQuestion,
    TokenKind::EqEq,
    TokenKind::BangEq,
    TokenKind::Pipe,
    TokenKind::Caret,
    TokenKind::Amp,
    TokenKind::AmpAmp,
    TokenKind::PipePipe,
    TokenKind::LBracket,
    TokenKind::End,
];

impl<'a, 't> Parser<'a, 't> {
    // ------------------------------------------------------------------
    // Token access
    // ------------------------------------------------------------------

    fn token_at(&self, index: usize) -> &'t Token {
        let tokens: &'t [Token] = self.tokens;
        &tokens[index.min(tokens.len().saturating_sub(1))]
    }

    fn tok(&self) -> &'t Token {
        self.token_at(self.pos)
    }

    fn kind(&self) -> TokenKind {
        if self.half_gt {
            TokenKind::Gt
        } else {
            self.tok().kind
        }
    }

    fn kind_at(&self, offset: usize) -> TokenKind {
        if offset == 0 {
            self.kind()
        } else {
            self.token_at(self.pos + offset).kind
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn advance(&mut self) {
        self.half_gt = false;
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes one `>`, splitting a `>>` token in two.
    fn eat_close_angle(&mut self) -> bool {
        match self.tok().kind {
            TokenKind::Gt if !self.half_gt => {
                self.advance();
                true
            }
            TokenKind::GtGt if self.half_gt => {
                self.advance();
                true
            }
            TokenKind::GtGt => {
                self.half_gt = true;
                true
            }
            _ => false,
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        let tok = self.tok();
        ParseError::new(kind, tok.text.as_str(), tok.span())
    }

    fn unexpected(&self) -> ParseError {
        let tok = self.tok();
        let found = match tok.kind {
            TokenKind::Identifier => format!("'{}'", tok.text),
            kind => format!("{}", kind),
        };
        self.error(ParseErrorKind::UnexpectedToken(found))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(ParseErrorKind::UnexpectedToken(format!(
                "{}, expected '{}'",
                self.kind(),
                kind
            ))))
        }
    }

    // ------------------------------------------------------------------
    // Node construction
    // ------------------------------------------------------------------

    fn node(
        &self,
        kind: ParseKind,
        token: TokenKind,
        text: &str,
        value: Option<&str>,
        span: Span,
        children: &[&'a ParseNode<'a>],
    ) -> &'a ParseNode<'a> {
        self.arena.alloc(ParseNode {
            kind,
            token,
            text: self.arena.alloc_str(text),
            value: value.map(|v| &*self.arena.alloc_str(v)),
            span,
            children: self.arena.alloc_slice_copy(children),
        })
    }

    fn inner(&self, kind: ParseKind, span: Span, children: &[&'a ParseNode<'a>]) -> &'a ParseNode<'a> {
        self.node(kind, TokenKind::End, "", None, span, children)
    }

    fn leaf(&self, kind: ParseKind, tok: &Token) -> &'a ParseNode<'a> {
        self.node(kind, tok.kind, &tok.text, tok.value.as_deref(), tok.span(), &[])
    }

    fn pop_operand(&mut self) -> Result<&'a ParseNode<'a>, ParseError> {
        self.operands
            .pop()
            .ok_or_else(|| self.error(ParseErrorKind::MissingOperand))
    }

    // ------------------------------------------------------------------
    // Main loop
    // ------------------------------------------------------------------

    fn run(&mut self) -> Result<&'a ParseNode<'a>, ParseError> {
        if self.at(TokenKind::End) {
            return Err(self.error(ParseErrorKind::EmptyExpression));
        }
        loop {
            if self.expect_operand {
                self.operand()?;
            } else if !self.operator()? {
                break;
            }
        }
        while let Some(frame) = self.frames.last() {
            if let Frame::Open(open) = frame {
                return Err(ParseError::new(
                    ParseErrorKind::UnclosedBracket(open.kind.opener()),
                    open.kind.opener().to_string(),
                    open.span.clone(),
                ));
            }
            self.reduce_top()?;
        }
        match self.operands.as_slice() {
            [root] => Ok(root),
            _ => Err(self.error(ParseErrorKind::Malformed {
                kind: "expression",
                detail: format!("{} operands left after parsing", self.operands.len()),
            })),
        }
    }

    /// Handles a token where an operand is expected.
    fn operand(&mut self) -> Result<(), ParseError> {
        let tok = self.tok();
        match self.kind() {
            TokenKind::Number | TokenKind::String | TokenKind::Char => {
                let node = self.leaf(ParseKind::Literal, tok);
                self.operands.push(node);
                self.advance();
                self.expect_operand = false;
            }
            TokenKind::Identifier if tok.is_keyword("new") => self.new_expression()?,
            TokenKind::Identifier
                if (tok.is_keyword("typeof") || tok.is_keyword("default"))
                    && self.kind_at(1) == TokenKind::LParen =>
            {
                let kind = if tok.is_keyword("typeof") {
                    ParseKind::TypeOf
                } else {
                    ParseKind::Default
                };
                let start = tok.span();
                self.advance();
                self.advance();
                let ty = self.parse_type()?;
                let end = self.tok().span();
                self.expect(TokenKind::RParen)?;
                let node = self.inner(kind, Span::combine(&start, &end), &[ty]);
                self.operands.push(node);
                self.expect_operand = false;
            }
            TokenKind::Identifier
                if tok.is_any_keyword()
                    && !["true", "false", "null", "checked", "unchecked"]
                        .contains(&tok.text.as_str()) =>
            {
                return Err(self.unexpected());
            }
            TokenKind::Identifier => self.identifier_operand()?,
            TokenKind::LParen => self.open_paren()?,
            TokenKind::Minus | TokenKind::Plus | TokenKind::Bang | TokenKind::Tilde => {
                let symbol = self.arena.alloc_str(&tok.text);
                self.frames.push(Frame::Unary {
                    symbol,
                    span: tok.span(),
                });
                self.advance();
            }
            TokenKind::LBrace
                if matches!(
                    self.frames.last(),
                    Some(Frame::Open(Open {
                        kind: OpenKind::Initializer(_),
                        ..
                    })) | Some(Frame::Assign { .. })
                ) =>
            {
                let span = tok.span();
                self.advance();
                self.frames.push(Frame::Open(Open {
                    kind: OpenKind::Initializer(InitOwner::Nested),
                    base: self.operands.len(),
                    span,
                }));
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                let empty_list = match self.frames.last() {
                    Some(Frame::Open(open)) => {
                        open.base == self.operands.len() && open.kind.allows_empty()
                    }
                    _ => false,
                };
                if !empty_list {
                    return Err(self.error(ParseErrorKind::MissingOperand));
                }
                self.close()?;
            }
            TokenKind::End => return Err(self.error(ParseErrorKind::MissingOperand)),
            _ => return Err(self.unexpected()),
        }
        Ok(())
    }

    fn identifier_operand(&mut self) -> Result<(), ParseError> {
        let tok = self.tok();
        let next = self.kind_at(1);

        if next == TokenKind::Arrow && !tok.is_any_keyword() {
            let param = self.leaf(ParseKind::LambdaParameter, tok);
            let params = self.inner(ParseKind::Arguments, tok.span(), &[param]);
            self.frames.push(Frame::Lambda {
                params,
                span: tok.span(),
            });
            self.advance();
            self.advance();
            return Ok(());
        }

        if let Some(Frame::Open(open)) = self.frames.last() {
            if next == TokenKind::Colon && open.kind.takes_arguments() {
                let name = self.arena.alloc_str(tok.name());
                self.frames.push(Frame::NamedArg {
                    name,
                    span: tok.span(),
                });
                self.advance();
                self.advance();
                return Ok(());
            }
            if next == TokenKind::Assign
                && matches!(
                    open.kind,
                    OpenKind::Initializer(InitOwner::Object | InitOwner::Nested)
                )
            {
                let name = self.arena.alloc_str(tok.name());
                self.frames.push(Frame::Assign {
                    name,
                    span: tok.span(),
                });
                self.advance();
                self.advance();
                return Ok(());
            }
        }

        let node = self.leaf(ParseKind::Identifier, tok);
        self.advance();
        let node = self.generic_suffix(node)?;
        self.operands.push(node);
        self.expect_operand = false;
        Ok(())
    }

    /// Handles a token after a complete operand. Returns `false` at the end.
    fn operator(&mut self) -> Result<bool, ParseError> {
        let tok = self.tok();
        let kind = self.kind();
        match kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::StarStar
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::Amp
            | TokenKind::AmpAmp
            | TokenKind::Pipe
            | TokenKind::PipePipe
            | TokenKind::Caret
            | TokenKind::EqEq
            | TokenKind::BangEq
            | TokenKind::Lt
            | TokenKind::LtEq
            | TokenKind::Gt
            | TokenKind::GtEq
            | TokenKind::LtLt
            | TokenKind::GtGt
            | TokenKind::QuestionQuestion => {
                let symbol = if self.half_gt { ">" } else { tok.text.as_str() };
                let op = BinaryOp::from_symbol(symbol).ok_or_else(|| self.unexpected())?;
                let span = tok.span();
                self.reduce_for(op.precedence(), op.is_right_associative())?;
                self.frames.push(Frame::Binary { op, span });
                self.advance();
                self.expect_operand = true;
            }
            TokenKind::Identifier if tok.is_keyword("is") || tok.is_keyword("as") => {
                let node_kind = if tok.is_keyword("is") {
                    ParseKind::Is
                } else {
                    ParseKind::As
                };
                self.reduce_for(precedence::RELATIONAL, false)?;
                self.advance();
                let ty = self.parse_type()?;
                let operand = self.pop_operand()?;
                let span = Span::combine(&operand.span, &ty.span);
                let node = self.inner(node_kind, span, &[operand, ty]);
                self.operands.push(node);
            }
            TokenKind::Question => {
                let sugar = self.operands.last().is_some_and(|top| top.is_type_like())
                    && matches!(
                        self.kind_at(1),
                        TokenKind::RParen | TokenKind::Gt | TokenKind::Comma
                    );
                if sugar {
                    let target = self.pop_operand()?;
                    let span = Span::combine(&target.span, &tok.span());
                    let node = self.inner(ParseKind::NullableType, span, &[target]);
                    self.operands.push(node);
                    self.advance();
                } else {
                    let span = tok.span();
                    self.reduce_for(precedence::CONDITIONAL, true)?;
                    self.frames.push(Frame::Question { span });
                    self.advance();
                    self.expect_operand = true;
                }
            }
            TokenKind::Colon => {
                loop {
                    match self.frames.last() {
                        Some(Frame::Question { .. }) => break,
                        None | Some(Frame::Open(_)) => {
                            return Err(self.error(ParseErrorKind::UnmatchedColon));
                        }
                        Some(_) => self.reduce_top()?,
                    }
                }
                self.frames.pop();
                self.frames.push(Frame::Colon { span: tok.span() });
                self.advance();
                self.expect_operand = true;
            }
            TokenKind::Dot | TokenKind::QuestionDot => {
                let node_kind = if kind == TokenKind::Dot {
                    ParseKind::MemberAccess
                } else {
                    ParseKind::NullMemberAccess
                };
                self.advance();
                let name = self.tok();
                if name.kind != TokenKind::Identifier || name.is_any_keyword() {
                    return Err(self.error(ParseErrorKind::ExpectedIdentifier));
                }
                let target = self.pop_operand()?;
                let span = Span::combine(&target.span, &name.span());
                let node = self.node(node_kind, name.kind, &name.text, None, span, &[target]);
                self.advance();
                let node = self.generic_suffix(node)?;
                self.operands.push(node);
            }
            TokenKind::LParen | TokenKind::LBracket | TokenKind::QuestionBracket => {
                let open_kind = match kind {
                    TokenKind::LParen => OpenKind::Call,
                    TokenKind::LBracket => OpenKind::Index,
                    _ => OpenKind::NullIndex,
                };
                self.frames.push(Frame::Open(Open {
                    kind: open_kind,
                    base: self.operands.len(),
                    span: tok.span(),
                }));
                self.advance();
                self.expect_operand = true;
            }
            TokenKind::Comma => self.comma()?,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => self.close()?,
            TokenKind::End => return Ok(false),
            _ => return Err(self.unexpected()),
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Reduction
    // ------------------------------------------------------------------

    /// Reduces frames that bind at least as tightly as an incoming operator.
    fn reduce_for(&mut self, prec: u8, right_assoc: bool) -> Result<(), ParseError> {
        while let Some((top, _)) = self.frames.last().and_then(|f| f.precedence()) {
            if top > prec || (top == prec && !right_assoc) {
                self.reduce_top()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn reduce_top(&mut self) -> Result<(), ParseError> {
        let Some(frame) = self.frames.pop() else {
            return Ok(());
        };
        let node = match frame {
            Frame::Binary { op, span } => {
                let right = self.pop_operand()?;
                let left = self.pop_operand()?;
                let span = Span::combine(&Span::combine(&left.span, &span), &right.span);
                self.node(
                    ParseKind::Binary,
                    TokenKind::End,
                    op.symbol(),
                    None,
                    span,
                    &[left, right],
                )
            }
            Frame::Unary { symbol, span } => {
                let operand = self.pop_operand()?;
                let full = Span::combine(&span, &operand.span);
                self.node(ParseKind::Unary, TokenKind::End, symbol, None, full, &[operand])
            }
            Frame::Cast { ty, span } => {
                let operand = self.pop_operand()?;
                let full = Span::combine(&span, &operand.span);
                self.inner(ParseKind::Cast, full, &[ty, operand])
            }
            Frame::Lambda { params, span } => {
                let body = self.pop_operand()?;
                let full = Span::combine(&span, &body.span);
                self.inner(ParseKind::Lambda, full, &[params, body])
            }
            Frame::Question { span } => {
                return Err(ParseError::new(ParseErrorKind::MissingColon, "?", span));
            }
            Frame::Colon { .. } => {
                let when_false = self.pop_operand()?;
                let when_true = self.pop_operand()?;
                let condition = self.pop_operand()?;
                let span = Span::combine(&condition.span, &when_false.span);
                self.inner(ParseKind::Conditional, span, &[condition, when_true, when_false])
            }
            Frame::NamedArg { name, span } => {
                let value = self.pop_operand()?;
                let full = Span::combine(&span, &value.span);
                self.node(
                    ParseKind::NamedArgument,
                    TokenKind::Identifier,
                    name,
                    None,
                    full,
                    &[value],
                )
            }
            Frame::Assign { name, span } => {
                let value = self.pop_operand()?;
                let full = Span::combine(&span, &value.span);
                self.node(ParseKind::Assign, TokenKind::Identifier, name, None, full, &[value])
            }
            Frame::Open(open) => {
                return Err(ParseError::new(
                    ParseErrorKind::UnclosedBracket(open.kind.opener()),
                    open.kind.opener().to_string(),
                    open.span,
                ));
            }
        };
        self.operands.push(node);
        Ok(())
    }

    /// Reduces everything down to the innermost open bracket.
    fn reduce_to_open(&mut self) -> Result<(), ParseError> {
        loop {
            match self.frames.last() {
                None => return Err(self.unexpected()),
                Some(Frame::Open(_)) => return Ok(()),
                Some(_) => self.reduce_top()?,
            }
        }
    }

    fn comma(&mut self) -> Result<(), ParseError> {
        self.reduce_to_open()?;
        if let Some(Frame::Open(Open {
            kind: OpenKind::Group,
            ..
        })) = self.frames.last()
        {
            return Err(self.error(ParseErrorKind::Unsupported("tuple expression".into())));
        }
        self.advance();
        self.expect_operand = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ParseError> {
        let tok = self.tok();
        self.reduce_to_open()?;
        let Some(Frame::Open(open)) = self.frames.pop() else {
            return Err(self.unexpected());
        };
        if open.kind.closer() != tok.kind {
            return Err(ParseError::new(
                ParseErrorKind::MismatchedBracket {
                    open: open.kind.opener(),
                    found: tok.text.chars().next().unwrap_or('?'),
                },
                tok.text.as_str(),
                tok.span(),
            ));
        }
        let items = self.operands.split_off(open.base);
        let end = tok.span();
        self.advance();
        self.expect_operand = false;

        let node = match open.kind {
            OpenKind::Group => {
                let [inner] = items.as_slice() else {
                    return Err(ParseError::new(
                        ParseErrorKind::MissingOperand,
                        ")",
                        Span::combine(&open.span, &end),
                    ));
                };
                self.inner(ParseKind::Group, Span::combine(&open.span, &end), &[inner])
            }
            OpenKind::Call => {
                let callee = self.pop_operand()?;
                let span = Span::combine(&callee.span, &end);
                let scope = match callee.kind {
                    ParseKind::Identifier if callee.text == "checked" => Some(ParseKind::Checked),
                    ParseKind::Identifier if callee.text == "unchecked" => Some(ParseKind::Unchecked),
                    _ => None,
                };
                match (scope, items.as_slice()) {
                    (Some(kind), [arg]) if arg.kind != ParseKind::NamedArgument => {
                        self.inner(kind, span, &[arg])
                    }
                    _ => {
                        let args = self.inner(
                            ParseKind::Arguments,
                            Span::combine(&open.span, &end),
                            &items,
                        );
                        self.inner(ParseKind::Call, span, &[callee, args])
                    }
                }
            }
            OpenKind::Index | OpenKind::NullIndex => {
                if items.is_empty() {
                    return Err(ParseError::new(ParseErrorKind::MissingOperand, "]", end));
                }
                let target = self.pop_operand()?;
                let kind = if matches!(open.kind, OpenKind::Index) {
                    ParseKind::Index
                } else {
                    ParseKind::NullIndex
                };
                let args = self.inner(ParseKind::Arguments, Span::combine(&open.span, &end), &items);
                self.inner(kind, Span::combine(&target.span, &end), &[target, args])
            }
            OpenKind::NewArgs(ty) => {
                let args = self.inner(ParseKind::Arguments, Span::combine(&open.span, &end), &items);
                let start = self.new_keyword_span(&ty.span);
                let node = self.inner(ParseKind::New, Span::combine(&start, &end), &[ty, args]);
                if self.at(TokenKind::LBrace) {
                    self.operands.push(node);
                    self.open_initializer(InitOwner::Object);
                    return Ok(());
                }
                node
            }
            OpenKind::NewBounds(ty) => {
                let args = self.inner(ParseKind::Arguments, Span::combine(&open.span, &end), &items);
                let start = self.new_keyword_span(&ty.span);
                self.inner(ParseKind::NewArray, Span::combine(&start, &end), &[ty, args])
            }
            OpenKind::Initializer(owner) => {
                let init = self.inner(ParseKind::Initializer, Span::combine(&open.span, &end), &items);
                match owner {
                    InitOwner::Nested => init,
                    InitOwner::Object => {
                        let new = self.pop_operand()?;
                        let span = Span::combine(&new.span, &end);
                        let mut children: Vec<&'a ParseNode<'a>> = new.children.to_vec();
                        children.push(init);
                        self.inner(ParseKind::New, span, &children)
                    }
                    InitOwner::Array(element) => {
                        let element = match element {
                            Some(e) => e,
                            None => self.inner(ParseKind::Empty, open.span.clone(), &[]),
                        };
                        let start = self.new_keyword_span(&open.span);
                        self.inner(ParseKind::NewArrayInit, Span::combine(&start, &end), &[element, init])
                    }
                }
            }
        };
        self.operands.push(node);
        Ok(())
    }

    /// Span of the `new` keyword preceding `span`.
    fn new_keyword_span(&self, span: &Span) -> Span {
        self.tokens
            .iter()
            .rev()
            .find(|t| t.offset < span.start() && t.is_keyword("new"))
            .map(|t| t.span())
            .unwrap_or_else(|| span.clone())
    }

    fn open_initializer(&mut self, owner: InitOwner<'a>) {
        let span = self.tok().span();
        self.advance();
        self.frames.push(Frame::Open(Open {
            kind: OpenKind::Initializer(owner),
            base: self.operands.len(),
            span,
        }));
        self.expect_operand = true;
    }

    // ------------------------------------------------------------------
    // Parentheses: lambda parameters, casts and groups
    // ------------------------------------------------------------------

    fn matching_close(&self, open_index: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(open_index) {
            match tok.kind {
                TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::QuestionBracket
                | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return (tok.kind == TokenKind::RParen).then_some(i);
                    }
                }
                TokenKind::End => return None,
                _ => {}
            }
        }
        None
    }

    fn open_paren(&mut self) -> Result<(), ParseError> {
        let open = self.tok();
        if let Some(close) = self.matching_close(self.pos) {
            if self.token_at(close + 1).kind == TokenKind::Arrow {
                let params = self.lambda_parameters(close)?;
                self.frames.push(Frame::Lambda {
                    params,
                    span: open.span(),
                });
                self.pos = close + 2;
                self.half_gt = false;
                return Ok(());
            }
        }

        if let Some(ty) = self.try_cast()? {
            self.frames.push(Frame::Cast {
                ty,
                span: open.span(),
            });
            return Ok(());
        }

        self.frames.push(Frame::Open(Open {
            kind: OpenKind::Group,
            base: self.operands.len(),
            span: open.span(),
        }));
        self.advance();
        Ok(())
    }

    /// `(a, b)`, `()`, `(int a, string b)` before `=>`.
    fn lambda_parameters(&mut self, close: usize) -> Result<&'a ParseNode<'a>, ParseError> {
        let open_span = self.tok().span();
        self.advance();
        let mut params = Vec::new();
        while self.pos < close {
            let tok = self.tok();
            let explicit = !(tok.kind == TokenKind::Identifier
                && matches!(self.kind_at(1), TokenKind::Comma | TokenKind::RParen));
            let param = if explicit {
                let ty = self.parse_type()?;
                let name = self.tok();
                if name.kind != TokenKind::Identifier || name.is_any_keyword() {
                    return Err(self.error(ParseErrorKind::ExpectedIdentifier));
                }
                self.advance();
                self.node(
                    ParseKind::LambdaParameter,
                    name.kind,
                    &name.text,
                    name.value.as_deref(),
                    Span::combine(&ty.span, &name.span()),
                    &[ty],
                )
            } else {
                if tok.is_any_keyword() {
                    return Err(self.error(ParseErrorKind::ExpectedIdentifier));
                }
                self.advance();
                self.leaf(ParseKind::LambdaParameter, tok)
            };
            params.push(param);
            if self.pos < close {
                self.expect(TokenKind::Comma)?;
            }
        }
        let end = self.token_at(close).span();
        Ok(self.inner(ParseKind::Arguments, Span::combine(&open_span, &end), &params))
    }

    /// Reads `(Type)` followed by an operand as a cast. Restores the position
    /// and returns `None` when the parenthesized tokens are not a cast.
    fn try_cast(&mut self) -> Result<Option<&'a ParseNode<'a>>, ParseError> {
        let saved = (self.pos, self.half_gt);
        self.advance();
        let first = self.tok();
        let is_type_start = first.kind == TokenKind::Identifier
            && (!first.is_any_keyword() || first.is_type_keyword());
        if !is_type_start {
            (self.pos, self.half_gt) = saved;
            return Ok(None);
        }
        let ty = match self.parse_type() {
            Ok(ty) if self.at(TokenKind::RParen) => ty,
            _ => {
                (self.pos, self.half_gt) = saved;
                return Ok(None);
            }
        };
        let follower = self.token_at(self.pos + 1);
        let builtin = ty.kind == ParseKind::Identifier && first.is_type_keyword();
        let builtin = builtin
            || (matches!(ty.kind, ParseKind::NullableType | ParseKind::ArrayType) && first.is_type_keyword());
        let is_cast = match follower.kind {
            TokenKind::Identifier => !follower.is_keyword("is") && !follower.is_keyword("as"),
            TokenKind::Number
            | TokenKind::String
            | TokenKind::Char
            | TokenKind::LParen
            | TokenKind::Bang
            | TokenKind::Tilde => true,
            TokenKind::Plus | TokenKind::Minus => builtin,
            _ => false,
        };
        if !is_cast {
            (self.pos, self.half_gt) = saved;
            return Ok(None);
        }
        self.advance();
        Ok(Some(ty))
    }

    // ------------------------------------------------------------------
    // `new`
    // ------------------------------------------------------------------

    fn new_expression(&mut self) -> Result<(), ParseError> {
        self.advance();
        if self.at(TokenKind::LBracket) && self.kind_at(1) == TokenKind::RBracket {
            self.advance();
            self.advance();
            if !self.at(TokenKind::LBrace) {
                return Err(self.error(ParseErrorKind::UnexpectedToken(format!(
                    "{}, expected '{{'",
                    self.kind()
                ))));
            }
            self.open_initializer(InitOwner::Array(None));
            return Ok(());
        }

        let ty = self.parse_type()?;
        let open = self.tok().span();
        let kind = match self.kind() {
            TokenKind::LBrace if ty.kind == ParseKind::ArrayType => {
                self.open_initializer(InitOwner::Array(Some(ty)));
                return Ok(());
            }
            TokenKind::LBrace => {
                let args = self.inner(ParseKind::Arguments, open.clone(), &[]);
                let start = self.new_keyword_span(&ty.span);
                let node = self.inner(ParseKind::New, Span::combine(&start, &ty.span), &[ty, args]);
                self.operands.push(node);
                self.open_initializer(InitOwner::Object);
                return Ok(());
            }
            TokenKind::LBracket => OpenKind::NewBounds(ty),
            TokenKind::LParen => OpenKind::NewArgs(ty),
            _ => {
                return Err(self.error(ParseErrorKind::UnexpectedToken(format!(
                    "{}, expected '(', '[' or '{{' after the type",
                    self.kind()
                ))));
            }
        };
        self.frames.push(Frame::Open(Open {
            kind,
            base: self.operands.len(),
            span: open,
        }));
        self.advance();
        self.expect_operand = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Generic argument lists and type names
    // ------------------------------------------------------------------

    /// Whether the `<` at the current position opens a generic argument list:
    /// a balanced `>` is reached through type-name tokens only, and is
    /// followed by a token that cannot continue a relational expression.
    fn looks_like_generic_arguments(&self) -> bool {
        if self.kind() != TokenKind::Lt {
            return false;
        }
        let mut depth: i32 = 0;
        let mut i = self.pos;
        loop {
            let tok = self.token_at(i);
            match tok.kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt | TokenKind::GtGt => {
                    depth -= if tok.kind == TokenKind::Gt { 1 } else { 2 };
                    if depth == 0 {
                        return GENERIC_FOLLOWERS.contains(&self.token_at(i + 1).kind);
                    }
                    if depth < 0 {
                        return false;
                    }
                }
                TokenKind::Identifier => {
                    if tok.is_any_keyword() {
                        return false;
                    }
                }
                TokenKind::Dot
                | TokenKind::Comma
                | TokenKind::Question
                | TokenKind::LBracket
                | TokenKind::RBracket => {}
                _ => return false,
            }
            i += 1;
        }
    }

    fn generic_suffix(&mut self, target: &'a ParseNode<'a>) -> Result<&'a ParseNode<'a>, ParseError> {
        if !self.looks_like_generic_arguments() {
            return Ok(target);
        }
        self.advance();
        self.type_loop(Some(target))
    }

    pub(super) fn parse_type(&mut self) -> Result<&'a ParseNode<'a>, ParseError> {
        self.type_loop(None)
    }

    /// Reads a type. With `open_target`, a `<` after that name has already
    /// been consumed and the loop ends when its argument list closes.
    fn type_loop(&mut self, open_target: Option<&'a ParseNode<'a>>) -> Result<&'a ParseNode<'a>, ParseError> {
        struct GenericList<'a> {
            target: &'a ParseNode<'a>,
            args: Vec<&'a ParseNode<'a>>,
        }
        let mut stack: Vec<GenericList<'a>> = Vec::new();
        if let Some(target) = open_target {
            stack.push(GenericList {
                target,
                args: Vec::new(),
            });
        }

        'outer: loop {
            let mut node = self.type_name()?;
            if self.at(TokenKind::Lt) {
                self.advance();
                stack.push(GenericList {
                    target: node,
                    args: Vec::new(),
                });
                continue 'outer;
            }
            node = self.type_suffixes(node)?;

            loop {
                let Some(list) = stack.last_mut() else {
                    return Ok(node);
                };
                list.args.push(node);
                if self.eat(TokenKind::Comma) {
                    continue 'outer;
                }
                let end = self.tok().span();
                if !self.eat_close_angle() {
                    return Err(self.error(ParseErrorKind::MalformedGenericArguments));
                }
                let Some(list) = stack.pop() else {
                    return Err(self.error(ParseErrorKind::MalformedGenericArguments));
                };
                let mut children = Vec::with_capacity(list.args.len() + 1);
                children.push(list.target);
                children.extend(list.args);
                node = self.inner(
                    ParseKind::GenericName,
                    Span::combine(&list.target.span, &end),
                    &children,
                );
                if stack.is_empty() && open_target.is_some() {
                    return Ok(node);
                }
                while self.at(TokenKind::Dot) && self.kind_at(1) == TokenKind::Identifier {
                    self.advance();
                    let name = self.tok();
                    let span = Span::combine(&node.span, &name.span());
                    node = self.node(ParseKind::MemberAccess, name.kind, &name.text, None, span, &[node]);
                    self.advance();
                }
                node = self.type_suffixes(node)?;
            }
        }
    }

    /// `Name` or `A.B.C`, stopping before any `<`.
    fn type_name(&mut self) -> Result<&'a ParseNode<'a>, ParseError> {
        let tok = self.tok();
        if self.kind() != TokenKind::Identifier || (tok.is_any_keyword() && !tok.is_type_keyword()) {
            return Err(self.error(ParseErrorKind::ExpectedType));
        }
        let mut node = self.leaf(ParseKind::Identifier, tok);
        self.advance();
        while self.at(TokenKind::Dot) && self.kind_at(1) == TokenKind::Identifier {
            self.advance();
            let name = self.tok();
            let span = Span::combine(&node.span, &name.span());
            node = self.node(ParseKind::MemberAccess, name.kind, &name.text, None, span, &[node]);
            self.advance();
        }
        Ok(node)
    }

    /// Nullable `?` and array rank specifiers after a type name.
    fn type_suffixes(&mut self, mut node: &'a ParseNode<'a>) -> Result<&'a ParseNode<'a>, ParseError> {
        if self.at(TokenKind::Question) && TYPE_FOLLOWERS_FOR_NULLABLE.contains(&self.kind_at(1)) {
            let span = Span::combine(&node.span, &self.tok().span());
            node = self.inner(ParseKind::NullableType, span, &[node]);
            self.advance();
        }
        while self.at(TokenKind::LBracket)
            && matches!(self.kind_at(1), TokenKind::RBracket | TokenKind::Comma)
        {
            self.advance();
            let mut commas = String::new();
            while self.eat(TokenKind::Comma) {
                commas.push(',');
            }
            let end = self.tok().span();
            self.expect(TokenKind::RBracket)?;
            node = self.node(
                ParseKind::ArrayType,
                TokenKind::LBracket,
                &commas,
                None,
                Span::combine(&node.span, &end),
                &[node],
            );
        }
        Ok(node)
    }
}
