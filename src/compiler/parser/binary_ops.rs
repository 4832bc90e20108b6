use generational_arena::Index;

use super::{
    Parser,
    error::ParserError,
    node::{BinOpKind, ExprKind, Node, NodeKind},
    precedence::BindingPower,
};

impl Parser<'_> {
    /// the operator token has already been consumed
    pub fn parse_binary_infix_op_led(
        &mut self,
        op: BinOpKind,
        left: Index,
        right_bp: BindingPower,
    ) -> Result<Index, ParserError> {
        let right = self.pratt_parse_expression(right_bp)?;
        let span = self.span_of(left).connect_new(&self.span_of(right));

        Ok(self.push(Node::new(NodeKind::Expr(ExprKind::BinOp { op, left, right }), span)))
    }
}
