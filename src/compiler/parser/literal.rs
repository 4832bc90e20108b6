use generational_arena::Index;

use crate::compiler::tokens::{Token, TokenKind};

use super::{
    Parser,
    error::ParserError,
    node::{ExprKind, Literal, Node, NodeKind},
};

impl Parser<'_> {
    pub fn parse_literal_nud(&mut self, literal_token: Token) -> Result<Index, ParserError> {
        let literal_kind = match literal_token.kind {
            TokenKind::IntLiteral(i) => Literal::Int(i),
            TokenKind::FloatLiteral(f) => Literal::Float(f),
            TokenKind::BoolLiteral(b) => Literal::Bool(b),
            TokenKind::StringLiteral(s) => Literal::Str(s),
            TokenKind::CharLiteral(c) => Literal::Char(c),
            _ => {
                return Err(ParserError::Expected {
                    what: "literal".to_string(),
                    got: self.describe(&literal_token),
                    span: literal_token.span.to_display(self.interner),
                });
            }
        };

        self.advance(); // consume the literal token

        Ok(self.push(Node::new(NodeKind::Expr(ExprKind::Literal(literal_kind)), literal_token.span)))
    }
}
