use generational_arena::Index;

use crate::compiler::tokens::{Punctuation, Token, TokenKind};

use super::{
    Parser,
    error::ParserError,
    expr::binop_for,
    node::{ExprKind, Node, NodeKind},
    precedence::BindingPower,
};

impl Parser<'_> {
    /// `=`, `:=` and the compound forms; the operator has already been consumed
    pub fn parse_assignment_led(&mut self, op_token: Token, target: Index) -> Result<Index, ParserError> {
        let value = self.pratt_parse_expression(BindingPower::Assignment)?;
        let span = self.span_of(target).connect_new(&self.span_of(value));

        let TokenKind::Punctuation(p) = op_token.kind else {
            return Err(self.expected("assignment operator", &op_token));
        };

        let kind = match p {
            Punctuation::Eq => ExprKind::Assign { target, value },
            Punctuation::ColonEq => {
                if !matches!(self.node(&target).map(|n| &n.kind), Some(NodeKind::Expr(ExprKind::Identifier(_)))) {
                    return Err(ParserError::Invalid {
                        what: "declaration".to_string(),
                        reason: "the left side of `:=` must be a name".to_string(),
                        span: span.to_display(self.interner),
                    });
                }
                ExprKind::Declare { target, value }
            }
            compound => match binop_for(compound) {
                Some(op) => return Ok(self.desugar_compound_assign(target, value, op, span)),
                None => return Err(self.expected("assignment operator", &op_token)),
            },
        };

        Ok(self.push(Node::new(NodeKind::Expr(kind), span)))
    }
}
