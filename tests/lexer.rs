use proptest::prelude::*;
use sable::compiler::{
    Interner,
    lexer::{LexError, Lexer},
    tokens::{Keyword, Punctuation, TokenKind},
};

const CONTENTS: &str = r#"package main

import "fmt"

func add(a, b int) int {
    return a + b
}

/* counts
   down */
func main() {
    n := 0x10
    for i := 0; i < n; i++ {
        fmt.Println("tick\n", i)
    }
}
"#;

fn lex(source: &str) -> (Vec<TokenKind>, Vec<LexError>, Interner) {
    let mut interner = Interner::new();
    let file_name = interner.get_or_intern("test.sb");
    let mut lexer = Lexer::new(&mut interner, file_name);
    lexer.tokenize(source.chars().collect());
    let kinds = lexer.tokens.iter().map(|t| t.kind).collect();
    let errors = lexer.errors;
    (kinds, errors, interner)
}

fn semicolon() -> TokenKind {
    TokenKind::Punctuation(Punctuation::Semicolon)
}

#[test]
fn test_lexer() {
    let (tokens, errors, _) = lex(CONTENTS);
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(tokens.last(), Some(&TokenKind::Eof));
    assert_eq!(tokens[0], TokenKind::Keyword(Keyword::Package));
    assert!(tokens.contains(&TokenKind::IntLiteral(16)));
    assert!(tokens.contains(&TokenKind::Punctuation(Punctuation::PlusPlus)));
    assert!(tokens.contains(&TokenKind::Punctuation(Punctuation::ColonEq)));
}

#[test]
fn semicolons_are_inserted_at_line_ends() {
    let (tokens, _, _) = lex("x := 1\nreturn\n");
    assert_eq!(tokens.len(), 7);
    assert_eq!(tokens[3], semicolon());
    assert_eq!(tokens[4], TokenKind::Keyword(Keyword::Return));
    assert_eq!(tokens[5], semicolon());
    assert_eq!(tokens[6], TokenKind::Eof);
}

#[test]
fn no_semicolon_after_operators_or_open_braces() {
    let (tokens, _, _) = lex("a +\nb {\n}");
    let count = tokens.iter().filter(|t| **t == semicolon()).count();
    // only after the closing brace at end of input
    assert_eq!(count, 1);
    assert_eq!(tokens[tokens.len() - 2], semicolon());
}

#[test]
fn multi_line_block_comment_ends_a_statement() {
    let (tokens, _, _) = lex("x /* one\ntwo */ y");
    assert_eq!(tokens[1], semicolon());
}

#[test]
fn integer_bases_and_separators() {
    let (tokens, errors, _) = lex("0xff 0b101 0o17 1_000_000");
    assert!(errors.is_empty());
    assert_eq!(
        &tokens[..4],
        &[
            TokenKind::IntLiteral(255),
            TokenKind::IntLiteral(5),
            TokenKind::IntLiteral(15),
            TokenKind::IntLiteral(1_000_000),
        ]
    );
}

#[test]
fn floats_and_member_access_on_ints() {
    let (tokens, _, _) = lex("3.25 1e3 2.x");
    assert_eq!(tokens[0], TokenKind::FloatLiteral(3.25));
    assert_eq!(tokens[1], TokenKind::FloatLiteral(1000.0));
    assert_eq!(tokens[2], TokenKind::IntLiteral(2));
    assert_eq!(tokens[3], TokenKind::Punctuation(Punctuation::Dot));
}

#[test]
fn string_escapes_are_decoded() {
    let (tokens, errors, interner) = lex(r#""a\tb\n\"q\"""#);
    assert!(errors.is_empty());
    let TokenKind::StringLiteral(sym) = tokens[0] else {
        panic!("expected a string, got {:?}", tokens[0]);
    };
    assert_eq!(interner.resolve(sym), Some("a\tb\n\"q\""));
}

#[test]
fn runes_and_booleans() {
    let (tokens, errors, _) = lex(r"'a' '\n' true false");
    assert!(errors.is_empty());
    assert_eq!(
        &tokens[..4],
        &[
            TokenKind::CharLiteral('a'),
            TokenKind::CharLiteral('\n'),
            TokenKind::BoolLiteral(true),
            TokenKind::BoolLiteral(false),
        ]
    );
}

#[test]
fn keywords_are_not_identifiers() {
    let (tokens, _, interner) = lex("template class classy");
    assert_eq!(tokens[0], TokenKind::Keyword(Keyword::Template));
    assert_eq!(tokens[1], TokenKind::Keyword(Keyword::Class));
    let TokenKind::Identifier(sym) = tokens[2] else {
        panic!("expected an identifier");
    };
    assert_eq!(interner.resolve(sym), Some("classy"));
}

#[test]
fn spans_are_one_based_and_inclusive() {
    let mut interner = Interner::new();
    let file_name = interner.get_or_intern("test.sb");
    let mut lexer = Lexer::new(&mut interner, file_name);
    lexer.tokenize("  foo\n12".chars().collect());

    let foo = lexer.tokens[0].span;
    assert_eq!(foo.start, (1, 3));
    assert_eq!(foo.end, (1, 5));
    let twelve = lexer.tokens[2].span;
    assert_eq!(twelve.start, (2, 1));
    assert_eq!(twelve.end, (2, 2));
}

#[test]
fn unterminated_string_is_reported() {
    let (_, errors, _) = lex("x := \"open\ny := 1");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], LexError::UnterminatedString { .. }));
}

#[test]
fn hexadecimal_float_is_rejected() {
    let (_, errors, _) = lex("0x1.8");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], LexError::NonDecimalFloat { .. }));
}

#[test]
fn lexing_continues_after_errors() {
    let (tokens, errors, _) = lex(r#"a # b "\q" c"#);
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], LexError::UnexpectedCharacter { character: '#', .. }));
    assert!(matches!(errors[1], LexError::InvalidEscape { escape: 'q', .. }));
    let identifiers = tokens.iter().filter(|t| matches!(t, TokenKind::Identifier(_))).count();
    assert_eq!(identifiers, 3);
}

#[test]
fn unterminated_comment_is_reported() {
    let (_, errors, _) = lex("x /* never closed");
    assert!(matches!(errors.as_slice(), [LexError::UnterminatedComment { .. }]));
}

proptest! {
    #[test]
    fn decimal_literals_keep_their_value(n in any::<u32>()) {
        let (tokens, errors, _) = lex(&n.to_string());
        prop_assert!(errors.is_empty());
        prop_assert_eq!(tokens[0], TokenKind::IntLiteral(n as i64));
    }

    #[test]
    fn identifiers_resolve_to_their_text(name in "[a-z_][a-z0-9_]{0,12}") {
        prop_assume!(Keyword::from_ident(&name).is_none());
        prop_assume!(name != "true" && name != "false");
        let (tokens, errors, interner) = lex(&name);
        prop_assert!(errors.is_empty());
        let TokenKind::Identifier(sym) = tokens[0] else {
            return Err(TestCaseError::fail(format!("not an identifier: {:?}", tokens[0])));
        };
        prop_assert_eq!(interner.resolve(sym), Some(name.as_str()));
    }
}
