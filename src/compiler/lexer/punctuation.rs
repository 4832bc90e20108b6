use crate::compiler::tokens::{Punctuation, TokenKind};

use super::Lexer;

impl Lexer<'_> {
    /// longest match first; returns false when nothing matched
    pub(super) fn lex_punctuation(&mut self) -> bool {
        use Punctuation::*;

        let start = self.cursor;
        let (Some(first), second) = (self.peek(0), self.peek(1)) else {
            return false;
        };

        let double = match (first, second) {
            (':', Some('=')) => Some(ColonEq),
            ('=', Some('=')) => Some(EqEq),
            ('!', Some('=')) => Some(NotEq),
            ('<', Some('=')) => Some(LessThanOrEq),
            ('>', Some('=')) => Some(GreaterThanOrEq),
            ('&', Some('&')) => Some(AmpAmp),
            ('|', Some('|')) => Some(PipePipe),
            ('+', Some('+')) => Some(PlusPlus),
            ('-', Some('-')) => Some(MinusMinus),
            ('+', Some('=')) => Some(PlusEq),
            ('-', Some('=')) => Some(MinusEq),
            ('*', Some('=')) => Some(StarEq),
            ('/', Some('=')) => Some(SlashEq),
            _ => None,
        };
        if let Some(p) = double {
            self.bump();
            self.bump();
            self.push_token(TokenKind::Punctuation(p), start);
            return true;
        }

        let single = match first {
            '(' => OpenParen,
            ')' => CloseParen,
            '{' => OpenBrace,
            '}' => CloseBrace,
            '[' => OpenBracket,
            ']' => CloseBracket,
            ',' => Comma,
            '.' => Dot,
            ':' => Colon,
            ';' => Semicolon,
            '!' => Bang,
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => Slash,
            '%' => Percent,
            '=' => Eq,
            '<' => LessThan,
            '>' => GreaterThan,
            _ => return false,
        };
        self.bump();
        self.push_token(TokenKind::Punctuation(single), start);
        true
    }
}
