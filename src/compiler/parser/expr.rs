use generational_arena::Index;

use super::{
    Parser,
    error::ParserError,
    node::{BinOpKind, ExprKind, Node, NodeKind, PostfixOpKind},
    precedence::{BindingPower, infix_binding_power},
};
use crate::compiler::tokens::{Keyword, Punctuation, TokenKind};

impl Parser<'_> {
    pub fn parse_expr(&mut self) -> Result<Index, ParserError> {
        self.pratt_parse_expression(BindingPower::None)
    }

    /// the core pratt parsing loop.
    /// parses an expression whose components have at least `min_bp` binding power.
    pub(super) fn pratt_parse_expression(&mut self, min_bp: BindingPower) -> Result<Index, ParserError> {
        // 1. nud (null denotation) for the current token
        let token = *self.current();
        let mut left = match token.kind {
            TokenKind::IntLiteral(_)
            | TokenKind::FloatLiteral(_)
            | TokenKind::BoolLiteral(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::CharLiteral(_) => self.parse_literal_nud(token)?,
            TokenKind::Identifier(_) => self.parse_identifier_nud(token)?,
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                self.push(Node::new(NodeKind::Expr(ExprKind::This), token.span))
            }
            TokenKind::Keyword(Keyword::Func) => self.parse_func_literal_nud(token)?,
            TokenKind::Keyword(Keyword::If) => self.parse_if_expr_nud(token)?,
            TokenKind::Keyword(Keyword::New) => self.parse_new_nud(token)?,
            TokenKind::Punctuation(Punctuation::Minus) | TokenKind::Punctuation(Punctuation::Bang) => {
                self.parse_unary_nud(token)?
            }
            TokenKind::Punctuation(Punctuation::OpenParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Punctuation::CloseParen, "`)`")?;
                inner
            }
            TokenKind::Punctuation(Punctuation::OpenBracket) => self.parse_bracket_nud(token)?,
            _ => {
                return Err(ParserError::Unexpected {
                    what: self.describe(&token),
                    context: "expression".to_string(),
                    span: token.span.to_display(self.interner),
                });
            }
        };

        // 2. led (left denotation) for infix/postfix tokens
        loop {
            let next = *self.current();
            let (left_bp, right_assoc) = infix_binding_power(next.kind);
            if left_bp == BindingPower::None || left_bp < min_bp {
                break;
            }
            // assignment only binds at the top of an expression
            if left_bp == BindingPower::Assignment && min_bp > BindingPower::Assignment {
                break;
            }

            self.advance();
            let TokenKind::Punctuation(p) = next.kind else {
                unreachable!("only punctuation has an infix binding power")
            };

            left = match p {
                Punctuation::Eq
                | Punctuation::ColonEq
                | Punctuation::PlusEq
                | Punctuation::MinusEq
                | Punctuation::StarEq
                | Punctuation::SlashEq => self.parse_assignment_led(next, left)?,
                Punctuation::OpenParen => self.parse_call_led(left)?,
                Punctuation::OpenBracket => self.parse_index_led(left)?,
                Punctuation::Dot => self.parse_member_led(left)?,
                Punctuation::PlusPlus | Punctuation::MinusMinus => {
                    let op = if p == Punctuation::PlusPlus {
                        PostfixOpKind::Inc
                    } else {
                        PostfixOpKind::Dec
                    };
                    let span = self.span_of(left).connect_new(&next.span);
                    self.push(Node::new(NodeKind::Expr(ExprKind::Postfix { op, operand: left }), span))
                }
                _ => {
                    let op = binop_for(p).ok_or_else(|| ParserError::Unexpected {
                        what: format!("{p:?}"),
                        context: "infix position".to_string(),
                        span: next.span.to_display(self.interner),
                    })?;
                    let right_bp = if right_assoc { left_bp } else { left_bp.next() };
                    self.parse_binary_infix_op_led(op, left, right_bp)?
                }
            };
        }
        Ok(left)
    }

    pub(super) fn span_of(&self, idx: Index) -> crate::compiler::tokens::Span {
        self.node(&idx).map(|n| n.span).unwrap_or_else(|| self.current().span)
    }
}

pub(super) fn binop_for(p: Punctuation) -> Option<BinOpKind> {
    Some(match p {
        Punctuation::Plus | Punctuation::PlusEq => BinOpKind::Add,
        Punctuation::Minus | Punctuation::MinusEq => BinOpKind::Sub,
        Punctuation::Star | Punctuation::StarEq => BinOpKind::Mul,
        Punctuation::Slash | Punctuation::SlashEq => BinOpKind::Div,
        Punctuation::Percent => BinOpKind::Mod,
        Punctuation::EqEq => BinOpKind::Eq,
        Punctuation::NotEq => BinOpKind::NotEq,
        Punctuation::LessThan => BinOpKind::LessThan,
        Punctuation::LessThanOrEq => BinOpKind::LessThanOrEq,
        Punctuation::GreaterThan => BinOpKind::GreaterThan,
        Punctuation::GreaterThanOrEq => BinOpKind::GreaterThanOrEq,
        Punctuation::AmpAmp => BinOpKind::And,
        Punctuation::PipePipe => BinOpKind::Or,
        _ => return None,
    })
}
