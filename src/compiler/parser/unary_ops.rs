use generational_arena::Index;

use crate::compiler::tokens::{Punctuation, Token, TokenKind};

use super::{
    Parser,
    error::ParserError,
    node::{ExprKind, Node, NodeKind, UnaryOpKind},
    precedence::BindingPower,
};

impl Parser<'_> {
    pub fn parse_unary_nud(&mut self, op_token: Token) -> Result<Index, ParserError> {
        let op = match op_token.kind {
            TokenKind::Punctuation(Punctuation::Bang) => UnaryOpKind::Not,
            TokenKind::Punctuation(Punctuation::Minus) => UnaryOpKind::Neg,
            _ => {
                return Err(ParserError::Invalid {
                    what: "unary operator".to_string(),
                    reason: format!("{} is not a prefix operator", self.describe(&op_token)),
                    span: op_token.span.to_display(self.interner),
                });
            }
        };

        self.advance(); // consume the operator

        let operand = self.pratt_parse_expression(BindingPower::Unary)?;
        let span = op_token.span.connect_new(&self.span_of(operand));

        Ok(self.push(Node::new(NodeKind::Expr(ExprKind::Unary { op, operand }), span)))
    }
}
