use generational_arena::Index;

use crate::compiler::tokens::{Keyword, Punctuation, Token, TokenKind};

use super::{
    Parser,
    error::ParserError,
    node::{CaseClause, CatchClause, ExprKind, Node, NodeKind, StmtKind},
};

impl Parser<'_> {
    /// `if cond { } [else { } | else if ...]`, usable as a statement or an expression
    pub fn parse_if_expr_nud(&mut self, if_token: Token) -> Result<Index, ParserError> {
        self.advance(); // consume 'if'

        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;

        let else_block = if self.check_keyword(Keyword::Else) {
            self.advance(); // consume 'else'
            if self.check_keyword(Keyword::If) {
                let nested = *self.current();
                Some(self.parse_if_expr_nud(nested)?)
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        let end = self.span_of(else_block.unwrap_or(then_block));
        Ok(self.push(Node::new(
            NodeKind::Expr(ExprKind::If {
                cond,
                then_block,
                else_block,
            }),
            if_token.span.connect_new(&end),
        )))
    }

    pub(super) fn parse_while(&mut self) -> Result<Index, ParserError> {
        let keyword = *self.current();
        self.advance(); // consume 'while'

        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        let span = keyword.span.connect_new(&self.span_of(body));
        self.end_statement()?;
        Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::While { cond, body }), span)))
    }

    /// `for { }`, `for cond { }` and `for init; cond; post { }`
    pub(super) fn parse_for(&mut self) -> Result<Index, ParserError> {
        let keyword = *self.current();
        self.advance(); // consume 'for'

        let (mut init, mut cond, mut post) = (None, None, None);

        if !self.check(Punctuation::OpenBrace) {
            let first = if self.check(Punctuation::Semicolon) {
                None
            } else {
                Some(self.parse_simple_stmt()?)
            };

            if self.check(Punctuation::OpenBrace) {
                // `for cond { }`
                cond = first.map(|stmt| self.unwrap_expr_stmt(stmt));
            } else {
                init = first;
                self.expect(Punctuation::Semicolon, "`;` after loop initializer")?;
                if !self.check(Punctuation::Semicolon) {
                    cond = Some(self.parse_expr()?);
                }
                self.expect(Punctuation::Semicolon, "`;` after loop condition")?;
                if !self.check(Punctuation::OpenBrace) {
                    post = Some(self.parse_simple_stmt()?);
                }
            }
        }

        let body = self.parse_block()?;
        let span = keyword.span.connect_new(&self.span_of(body));
        self.end_statement()?;
        Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::For { init, cond, post, body }), span)))
    }

    /// an expression or `var` declaration inside a `for` header, not terminated
    fn parse_simple_stmt(&mut self) -> Result<Index, ParserError> {
        let expr = self.parse_expr()?;
        let span = self.span_of(expr);
        Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::Expr { expr }), span)))
    }

    fn unwrap_expr_stmt(&self, stmt: Index) -> Index {
        match self.node(&stmt).map(|n| &n.kind) {
            Some(NodeKind::Stmt(StmtKind::Expr { expr })) => *expr,
            _ => stmt,
        }
    }

    /// `switch [tag] { case a, b: ... default: ... }`
    pub(super) fn parse_switch(&mut self) -> Result<Index, ParserError> {
        let keyword = *self.current();
        self.advance(); // consume 'switch'

        let tag = if self.check(Punctuation::OpenBrace) { None } else { Some(self.parse_expr()?) };
        self.expect(Punctuation::OpenBrace, "`{` after switch")?;

        let mut cases = Vec::new();
        loop {
            self.skip_semicolons();
            let token = *self.current();
            let is_default = match token.kind {
                TokenKind::Punctuation(Punctuation::CloseBrace) => break,
                TokenKind::Keyword(Keyword::Case) => false,
                TokenKind::Keyword(Keyword::Default) => true,
                _ => return Err(self.expected("`case` or `default`", &token)),
            };
            self.advance();

            let mut values = Vec::new();
            if !is_default {
                loop {
                    values.push(self.parse_expr()?);
                    if !self.eat(Punctuation::Comma) {
                        break;
                    }
                }
            }
            self.expect(Punctuation::Colon, "`:` after case")?;

            let mut body = Vec::new();
            loop {
                self.skip_semicolons();
                match self.current().kind {
                    TokenKind::Keyword(Keyword::Case | Keyword::Default)
                    | TokenKind::Punctuation(Punctuation::CloseBrace)
                    | TokenKind::Eof => break,
                    _ => match self.parse_stmt() {
                        Ok(idx) => body.push(idx),
                        Err(e) => self.recover(e),
                    },
                }
            }

            cases.push(CaseClause {
                values,
                body,
                is_default,
                span: token.span.connect_new(&self.previous_span()),
            });
        }

        let close = self.expect(Punctuation::CloseBrace, "`}`")?;
        self.end_statement()?;
        Ok(self.push(Node::new(
            NodeKind::Stmt(StmtKind::Switch { tag, cases }),
            keyword.span.connect_new(&close.span),
        )))
    }

    /// `try { } catch (e T) { } catch { } finally { }`
    pub(super) fn parse_try(&mut self) -> Result<Index, ParserError> {
        let keyword = *self.current();
        self.advance(); // consume 'try'

        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.check_keyword(Keyword::Catch) {
            let catch_token = *self.current();
            self.advance();

            let (mut binding, mut ty) = (None, None);
            if self.eat(Punctuation::OpenParen) {
                binding = Some(self.expect_identifier("exception binding")?.0);
                if !self.check(Punctuation::CloseParen) {
                    ty = Some(self.parse_type()?);
                }
                self.expect(Punctuation::CloseParen, "`)`")?;
            }
            let handler = self.parse_block()?;
            catches.push(CatchClause {
                binding,
                ty,
                body: handler,
                span: catch_token.span.connect_new(&self.span_of(handler)),
            });
        }

        let finally = if self.check_keyword(Keyword::Finally) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        if catches.is_empty() && finally.is_none() {
            let token = *self.current();
            return Err(self.expected("`catch` or `finally` after try block", &token));
        }

        let span = keyword.span.connect_new(&self.previous_span());
        self.end_statement()?;
        Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::TryCatch { body, catches, finally }), span)))
    }
}
