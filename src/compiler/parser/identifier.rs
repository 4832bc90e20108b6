use generational_arena::Index;

use crate::compiler::tokens::{Punctuation, Token, TokenKind};

use super::{
    Parser,
    error::ParserError,
    node::{ExprKind, Node, NodeKind, TypeExpr},
};

impl Parser<'_> {
    pub fn parse_identifier_nud(&mut self, ident_token: Token) -> Result<Index, ParserError> {
        let TokenKind::Identifier(name) = ident_token.kind else {
            return Err(self.expected("identifier", &ident_token));
        };
        self.advance(); // consume the identifier token

        Ok(self.push(Node::new(NodeKind::Expr(ExprKind::Identifier(name)), ident_token.span)))
    }

    /// `(` has been consumed
    pub fn parse_call_led(&mut self, callee: Index) -> Result<Index, ParserError> {
        let args = self.parse_expr_list(Punctuation::CloseParen)?;
        let span = self.span_of(callee).connect_new(&self.previous_span());
        Ok(self.push(Node::new(NodeKind::Expr(ExprKind::Call { callee, args }), span)))
    }

    /// `[` has been consumed
    pub fn parse_index_led(&mut self, target: Index) -> Result<Index, ParserError> {
        let index = self.parse_expr()?;
        let close = self.expect(Punctuation::CloseBracket, "`]`")?;
        let span = self.span_of(target).connect_new(&close.span);
        Ok(self.push(Node::new(NodeKind::Expr(ExprKind::Index { target, index }), span)))
    }

    /// `.` has been consumed
    pub fn parse_member_led(&mut self, object: Index) -> Result<Index, ParserError> {
        let (member, member_span) = self.expect_identifier("member name after `.`")?;
        let span = self.span_of(object).connect_new(&member_span);
        Ok(self.push(Node::new(NodeKind::Expr(ExprKind::Member { object, member }), span)))
    }

    /// `new Name(args)`
    pub fn parse_new_nud(&mut self, new_token: Token) -> Result<Index, ParserError> {
        self.advance(); // consume 'new'
        let (class, _) = self.expect_identifier("class name after `new`")?;
        self.expect(Punctuation::OpenParen, "`(`")?;
        let args = self.parse_expr_list(Punctuation::CloseParen)?;
        let span = new_token.span.connect_new(&self.previous_span());
        Ok(self.push(Node::new(NodeKind::Expr(ExprKind::New { class, args }), span)))
    }

    /// `[a, b]` array literal, or a `[]T` / `[N]T` type in expression position
    pub fn parse_bracket_nud(&mut self, open: Token) -> Result<Index, ParserError> {
        let is_slice_type = matches!(self.peek_offset(1).map(|t| t.kind), Some(TokenKind::Punctuation(Punctuation::CloseBracket)))
            && matches!(
                self.peek_offset(2).map(|t| t.kind),
                Some(TokenKind::Identifier(_) | TokenKind::Punctuation(Punctuation::OpenBracket))
            );
        let is_array_type = matches!(self.peek_offset(1).map(|t| t.kind), Some(TokenKind::IntLiteral(_)))
            && matches!(self.peek_offset(2).map(|t| t.kind), Some(TokenKind::Punctuation(Punctuation::CloseBracket)))
            && matches!(
                self.peek_offset(3).map(|t| t.kind),
                Some(TokenKind::Identifier(_) | TokenKind::Punctuation(Punctuation::OpenBracket))
            );

        if is_slice_type || is_array_type {
            let ty = self.parse_type()?;
            let span = open.span.connect_new(&self.previous_span());
            return Ok(self.push(Node::new(NodeKind::Expr(ExprKind::Type(ty)), span)));
        }

        self.advance(); // consume '['
        let elements = self.parse_expr_list(Punctuation::CloseBracket)?;
        let span = open.span.connect_new(&self.previous_span());
        Ok(self.push(Node::new(NodeKind::Expr(ExprKind::ArrayLit { elements }), span)))
    }

    /// comma separated expressions up to and including `close`; a trailing comma is allowed
    pub(super) fn parse_expr_list(&mut self, close: Punctuation) -> Result<Vec<Index>, ParserError> {
        let mut items = Vec::new();
        loop {
            self.skip_semicolons();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.parse_expr()?);
            self.skip_semicolons();
            if !self.eat(Punctuation::Comma) {
                self.expect(close, &format!("`,` or {close:?}"))?;
                return Ok(items);
            }
        }
    }

    /// `int`, `Point`, `[]T`, `[N]T`
    pub fn parse_type(&mut self) -> Result<TypeExpr, ParserError> {
        let token = *self.current();
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(TypeExpr::Named(name))
            }
            TokenKind::Punctuation(Punctuation::OpenBracket) => {
                self.advance();
                if self.eat(Punctuation::CloseBracket) {
                    return Ok(TypeExpr::Slice(Box::new(self.parse_type()?)));
                }
                let size_token = *self.current();
                let TokenKind::IntLiteral(size) = size_token.kind else {
                    return Err(self.expected("array length", &size_token));
                };
                let size = u32::try_from(size).map_err(|_| ParserError::Invalid {
                    what: "array length".to_string(),
                    reason: format!("{size} does not fit in 32 bits"),
                    span: size_token.span.to_display(self.interner),
                })?;
                self.advance();
                self.expect(Punctuation::CloseBracket, "`]`")?;
                Ok(TypeExpr::Array(size, Box::new(self.parse_type()?)))
            }
            _ => Err(self.expected("type", &token)),
        }
    }
}
