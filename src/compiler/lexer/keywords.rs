use crate::compiler::tokens::{Keyword, TokenKind};

use super::{IdentChar, Lexer};

impl Lexer<'_> {
    /// identifiers, keywords and boolean literals
    pub(super) fn lex_word(&mut self) {
        let start = self.cursor;
        let mut word = String::new();
        while let Some(c) = self.peek(0) {
            if !c.is_valid_ident_char() {
                break;
            }
            word.push(c);
            self.bump();
        }

        let kind = match word.as_str() {
            "true" => TokenKind::BoolLiteral(true),
            "false" => TokenKind::BoolLiteral(false),
            other => match Keyword::from_ident(other) {
                Some(kw) => TokenKind::Keyword(kw),
                None => TokenKind::Identifier(self.interner.get_or_intern(other)),
            },
        };
        self.push_token(kind, start);
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::{Interner, tokens::Keyword};

    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        let mut interner = Interner::new();
        let file = interner.get_or_intern("test.sb");
        let mut lexer = Lexer::new(&mut interner, file);
        lexer.tokenize(src.chars().collect());
        assert!(lexer.errors.is_empty(), "{:?}", lexer.errors);
        lexer.tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_need_a_word_boundary() {
        let kinds = lex("for format");
        assert_eq!(kinds[0], TokenKind::Keyword(Keyword::For));
        assert!(matches!(kinds[1], TokenKind::Identifier(_)));
    }

    #[test]
    fn booleans_are_literals() {
        let kinds = lex("true false");
        assert_eq!(kinds[0], TokenKind::BoolLiteral(true));
        assert_eq!(kinds[1], TokenKind::BoolLiteral(false));
    }
}
