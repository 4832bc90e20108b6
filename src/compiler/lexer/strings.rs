use crate::compiler::tokens::TokenKind;

use super::{LexError, Lexer, Position};

impl Lexer<'_> {
    pub(super) fn lex_string(&mut self) {
        let start = self.cursor;
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek(0) {
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    if let Some(c) = self.escape(start) {
                        value.push(c);
                    }
                }
                Some('\n') | None => {
                    let span = self.span_from(start);
                    self.errors.push(LexError::UnterminatedString {
                        span: span.to_display(self.interner),
                    });
                    return;
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        let sym = self.interner.get_or_intern(&value);
        self.push_token(TokenKind::StringLiteral(sym), start);
    }

    pub(super) fn lex_char(&mut self) {
        let start = self.cursor;
        self.bump(); // opening quote
        let c = match self.peek(0) {
            Some('\\') => self.escape(start),
            Some('\'') | Some('\n') | None => None,
            Some(c) => {
                self.bump();
                Some(c)
            }
        };
        match (c, self.peek(0)) {
            (Some(c), Some('\'')) => {
                self.bump();
                self.push_token(TokenKind::CharLiteral(c), start);
            }
            _ => {
                let span = self.span_from(start);
                self.errors.push(LexError::InvalidCharLiteral {
                    span: span.to_display(self.interner),
                });
            }
        }
    }

    /// consumes a backslash escape, returns the character it denotes
    fn escape(&mut self, literal_start: Position) -> Option<char> {
        self.bump(); // backslash
        let c = match self.peek(0)? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            other => {
                self.bump();
                let span = self.span_from(literal_start);
                self.errors.push(LexError::InvalidEscape {
                    escape: other,
                    span: span.to_display(self.interner),
                });
                return None;
            }
        };
        self.bump();
        Some(c)
    }
}
