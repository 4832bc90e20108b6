use error::ParserError;
use generational_arena::{Arena, Index};
use node::{Node, NodeKind};

use super::{
    Interner,
    tokens::{Keyword, Punctuation, Span, Token, TokenKind},
};

mod assignment;
mod binary_ops;
mod block;
mod control_flow;
mod definitions;
mod desugar;
pub mod error;
mod expr;
mod identifier;
mod literal;
pub mod node;
mod precedence;
mod statements;
mod unary_ops;

pub struct Parser<'a> {
    pub tree: Arena<Node>,
    pub parse_errors: Vec<ParserError>,
    interner: &'a Interner,
    tokens: Vec<Token>,
    current_idx: usize,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with `Eof`, as produced by the lexer.
    pub fn new(tokens: Vec<Token>, interner: &'a Interner) -> Self {
        Self {
            tree: Arena::new(),
            parse_errors: Vec::new(),
            interner,
            tokens,
            current_idx: 0,
        }
    }

    /// Parses the whole token stream and returns the root node's index.
    pub fn parse(&mut self) -> Index {
        let mut span = self.current().span;
        let mut stmts = Vec::new();

        loop {
            self.skip_semicolons();
            if self.current().kind == TokenKind::Eof {
                break;
            }
            match self.parse_stmt() {
                Ok(idx) => stmts.push(idx),
                Err(e) => self.recover(e),
            }
        }

        if let Some(last) = stmts.last().and_then(|idx| self.node(idx)) {
            span.connect_mut(&last.span);
        }
        self.push(Node::new(NodeKind::Root { stmts }, span))
    }

    /// records the error and skips ahead, always making progress
    fn recover(&mut self, error: ParserError) {
        self.parse_errors.push(error);
        let before = self.current_idx;
        self.synchronize();
        if self.current_idx == before {
            self.advance();
        }
    }

    /// skips to the next statement boundary after an error
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.current().kind {
                TokenKind::Eof => return,
                TokenKind::Punctuation(Punctuation::Semicolon) if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Punctuation(Punctuation::OpenBrace) => depth += 1,
                TokenKind::Punctuation(Punctuation::CloseBrace) => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    pub fn advance(&mut self) {
        if self.current_idx + 1 < self.tokens.len() {
            self.current_idx += 1;
        }
    }

    pub fn peek_offset(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current_idx + offset)
    }

    /// looks at current token
    pub fn current(&self) -> &Token {
        &self.tokens[self.current_idx]
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.current_idx.saturating_sub(1)].span
    }

    pub fn node(&self, idx: &Index) -> Option<&Node> {
        self.tree.get(*idx)
    }

    pub fn push(&mut self, node: Node) -> Index {
        self.tree.insert(node)
    }

    fn check(&self, punct: Punctuation) -> bool {
        self.current().kind == TokenKind::Punctuation(punct)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().kind == TokenKind::Keyword(keyword)
    }

    /// consumes `punct` if it is the current token
    fn eat(&mut self, punct: Punctuation) -> bool {
        if self.check(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: Punctuation, what: &str) -> Result<Token, ParserError> {
        let token = *self.current();
        if token.kind == TokenKind::Punctuation(punct) {
            self.advance();
            Ok(token)
        } else {
            Err(self.expected(what, &token))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<(string_interner::symbol::SymbolUsize, Span), ParserError> {
        let token = *self.current();
        match token.kind {
            TokenKind::Identifier(sym) => {
                self.advance();
                Ok((sym, token.span))
            }
            _ => Err(self.expected(what, &token)),
        }
    }

    fn skip_semicolons(&mut self) {
        while self.eat(Punctuation::Semicolon) {}
    }

    /// a statement ends at `;`, or right before `}` / end of input
    fn end_statement(&mut self) -> Result<(), ParserError> {
        match self.current().kind {
            TokenKind::Punctuation(Punctuation::Semicolon) => {
                self.advance();
                Ok(())
            }
            TokenKind::Punctuation(Punctuation::CloseBrace) | TokenKind::Eof => Ok(()),
            _ => {
                let token = *self.current();
                Err(self.expected("end of statement", &token))
            }
        }
    }

    fn expected(&self, what: &str, got: &Token) -> ParserError {
        ParserError::Expected {
            what: what.to_string(),
            got: self.describe(got),
            span: got.span.to_display(self.interner),
        }
    }

    fn describe(&self, token: &Token) -> String {
        match token.kind {
            TokenKind::Identifier(sym) => format!("identifier `{}`", self.interner.resolve(sym).unwrap_or("?")),
            TokenKind::IntLiteral(n) => format!("integer `{n}`"),
            TokenKind::FloatLiteral(n) => format!("float `{n}`"),
            TokenKind::BoolLiteral(b) => format!("`{b}`"),
            TokenKind::StringLiteral(_) => "string literal".to_string(),
            TokenKind::CharLiteral(c) => format!("rune {c:?}"),
            TokenKind::Keyword(kw) => format!("keyword {kw:?}"),
            TokenKind::Punctuation(p) => format!("{p:?}"),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}
