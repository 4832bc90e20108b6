use string_interner::symbol::SymbolUsize;

use super::Interner;
use super::tokens::{Punctuation, Span, Token, TokenKind};

pub mod error;
mod keywords;
mod numbers;
mod punctuation;
mod strings;

pub use error::LexError;

/// Position of the next character to be consumed. Both fields are 1-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

pub trait IdentChar {
    fn is_valid_ident_start(&self) -> bool;
    fn is_valid_ident_char(&self) -> bool;
}

impl IdentChar for char {
    fn is_valid_ident_start(&self) -> bool {
        self.is_alphabetic() || *self == '_'
    }

    fn is_valid_ident_char(&self) -> bool {
        self.is_alphanumeric() || *self == '_'
    }
}

pub struct Lexer<'a> {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
    pub cursor: Position,
    pub interner: &'a mut Interner,
    file: SymbolUsize,
    chars: Vec<char>,
    idx: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(interner: &'a mut Interner, file: SymbolUsize) -> Self {
        Self {
            tokens: Vec::new(),
            errors: Vec::new(),
            cursor: Position { line: 1, col: 1 },
            interner,
            file,
            chars: Vec::new(),
            idx: 0,
        }
    }

    /// Lexes the whole input. The token stream always ends with `Eof`.
    pub fn tokenize(&mut self, chars: Vec<char>) {
        self.chars = chars;
        self.idx = 0;
        self.tokens.reserve(self.chars.len() / 4);

        while let Some(c) = self.peek(0) {
            match c {
                '\n' => {
                    self.insert_semicolon();
                    self.bump();
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.peek(1) == Some('/') => {
                    while self.peek(0).is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                '/' if self.peek(1) == Some('*') => self.skip_block_comment(),
                c if c.is_ascii_digit() => self.lex_number(),
                '"' => self.lex_string(),
                '\'' => self.lex_char(),
                c if c.is_valid_ident_start() => self.lex_word(),
                c => {
                    if !self.lex_punctuation() {
                        let start = self.cursor;
                        self.bump();
                        let span = self.span_from(start);
                        self.errors.push(LexError::UnexpectedCharacter {
                            character: c,
                            span: span.to_display(self.interner),
                        });
                    }
                }
            }
        }

        self.insert_semicolon();
        let at = self.cursor;
        self.tokens
            .push(Token::new(TokenKind::Eof, Span::new(self.file, at.line, at.col, at.line, at.col)));
    }

    fn skip_block_comment(&mut self) {
        let start = self.cursor;
        self.bump();
        self.bump();
        let mut saw_newline = false;
        loop {
            match self.peek(0) {
                Some('*') if self.peek(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(c) => {
                    saw_newline |= c == '\n';
                    self.bump();
                }
                None => {
                    let span = self.span_from(start);
                    self.errors.push(LexError::UnterminatedComment {
                        span: span.to_display(self.interner),
                    });
                    break;
                }
            }
        }
        // a comment spanning lines acts like a newline
        if saw_newline {
            self.insert_semicolon();
        }
    }

    /// automatic semicolon insertion at a line break
    fn insert_semicolon(&mut self) {
        let Some(last) = self.tokens.last() else { return };
        if !last.kind.ends_statement() {
            return;
        }
        let at = self.cursor;
        self.tokens.push(Token::new(
            TokenKind::Punctuation(Punctuation::Semicolon),
            Span::new(self.file, at.line, at.col, at.line, at.col),
        ));
    }

    pub(crate) fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).copied()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.idx += 1;
        if c == '\n' {
            self.cursor.line += 1;
            self.cursor.col = 1;
        } else {
            self.cursor.col += 1;
        }
        Some(c)
    }

    /// span from `start` up to and including the last consumed character
    pub(crate) fn span_from(&self, start: Position) -> Span {
        let end_col = if self.cursor.line == start.line {
            self.cursor.col.saturating_sub(1).max(start.col)
        } else {
            self.cursor.col
        };
        Span::new(self.file, start.line, start.col, self.cursor.line, end_col)
    }

    pub(crate) fn push_token(&mut self, kind: TokenKind, start: Position) {
        let span = self.span_from(start);
        self.tokens.push(Token::new(kind, span));
    }
}
