use generational_arena::Index;

use super::{
    Parser,
    node::{BinOpKind, ExprKind, Node, NodeKind},
};
use crate::{SafeConvert, compiler::tokens::Span};

impl Parser<'_> {
    /// Desugars compound assignments into regular assignments with binary operations.
    /// `x += 1` becomes `x = x + 1`. The target is evaluated twice.
    pub(super) fn desugar_compound_assign(&mut self, target: Index, value: Index, op: BinOpKind, span: Span) -> Index {
        // copy the target node for the BinOp's left operand; children stay shared
        let target_copy = self.node(&target).safe().clone();
        let left = self.push(target_copy);

        let binop = self.push(Node::new(NodeKind::Expr(ExprKind::BinOp { op, left, right: value }), span));
        self.push(Node::new(NodeKind::Expr(ExprKind::Assign { target, value: binop }), span))
    }
}
