use crate::compiler::tokens::TokenKind;

use super::{LexError, Lexer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberBase {
    Decimal,
    Hex,
    Binary,
    Octal,
}

impl NumberBase {
    fn radix(self) -> u32 {
        match self {
            NumberBase::Decimal => 10,
            NumberBase::Hex => 16,
            NumberBase::Binary => 2,
            NumberBase::Octal => 8,
        }
    }
}

impl std::fmt::Display for NumberBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NumberBase::Decimal => "decimal",
            NumberBase::Hex => "hexadecimal",
            NumberBase::Binary => "binary",
            NumberBase::Octal => "octal",
        };
        write!(f, "{name}")
    }
}

impl Lexer<'_> {
    pub(super) fn lex_number(&mut self) {
        let start = self.cursor;
        let mut base = NumberBase::Decimal;

        if self.peek(0) == Some('0') {
            let prefixed = match self.peek(1) {
                Some('x' | 'X') => Some(NumberBase::Hex),
                Some('b' | 'B') => Some(NumberBase::Binary),
                Some('o' | 'O') => Some(NumberBase::Octal),
                _ => None,
            };
            if let Some(b) = prefixed {
                base = b;
                self.bump();
                self.bump();
            }
        }

        let mut text = String::new();
        let mut float = false;
        while let Some(c) = self.peek(0) {
            if c == '_' {
                self.bump();
            } else if c.is_digit(base.radix()) {
                text.push(c);
                self.bump();
            } else if c == '.' && !float && self.peek(1).is_some_and(|n| n.is_ascii_digit()) {
                float = true;
                text.push(c);
                self.bump();
            } else if (c == 'e' || c == 'E') && base == NumberBase::Decimal && !text.is_empty() {
                float = true;
                text.push(c);
                self.bump();
                if let Some(sign @ ('+' | '-')) = self.peek(0) {
                    text.push(sign);
                    self.bump();
                }
            } else {
                break;
            }
        }

        let span = self.span_from(start);
        if float {
            if base != NumberBase::Decimal {
                self.errors.push(LexError::NonDecimalFloat {
                    base,
                    span: span.to_display(self.interner),
                });
                return;
            }
            match text.parse::<f64>() {
                Ok(n) => self.push_token(TokenKind::FloatLiteral(n), start),
                Err(source) => self.errors.push(LexError::InvalidFloat {
                    value: text,
                    span: span.to_display(self.interner),
                    source,
                }),
            }
        } else {
            match i64::from_str_radix(&text, base.radix()) {
                Ok(n) => self.push_token(TokenKind::IntLiteral(n), start),
                Err(source) => self.errors.push(LexError::InvalidInteger {
                    value: text,
                    span: span.to_display(self.interner),
                    source,
                }),
            }
        }
    }
}
