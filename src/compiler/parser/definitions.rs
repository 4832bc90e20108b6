use generational_arena::Index;

use crate::compiler::tokens::{Keyword, Punctuation, Token, TokenKind};

use super::{
    Parser,
    error::ParserError,
    node::{ExprKind, FieldDecl, FnDecl, Node, NodeKind, Param, StmtKind, TypeExpr},
};

impl Parser<'_> {
    /// `func name(params) [type] { body }`
    pub(super) fn parse_function(&mut self) -> Result<Index, ParserError> {
        let keyword = *self.current();
        self.advance(); // consume 'func'

        let (name, _) = self.expect_identifier("function name")?;
        let (params, return_type) = self.parse_signature()?;
        let body = self.parse_block()?;

        let span = keyword.span.connect_new(&self.span_of(body));
        self.end_statement()?;
        Ok(self.push(Node::new(
            NodeKind::Stmt(StmtKind::Function(FnDecl {
                name,
                params,
                return_type,
                body,
            })),
            span,
        )))
    }

    /// `func(params) [type] { body }` in expression position
    pub fn parse_func_literal_nud(&mut self, func_token: Token) -> Result<Index, ParserError> {
        self.advance(); // consume 'func'

        let (params, return_type) = self.parse_signature()?;
        let body = self.parse_block()?;
        let span = func_token.span.connect_new(&self.span_of(body));
        Ok(self.push(Node::new(
            NodeKind::Expr(ExprKind::FuncLit {
                params,
                return_type,
                body,
            }),
            span,
        )))
    }

    fn parse_signature(&mut self) -> Result<(Vec<Param>, Option<TypeExpr>), ParserError> {
        self.expect(Punctuation::OpenParen, "`(` to start parameters")?;
        let params = self.parse_params()?;
        let return_type = if self.check(Punctuation::OpenBrace) { None } else { Some(self.parse_type()?) };
        Ok((params, return_type))
    }

    /// parameters up to and including `)`.
    /// `a, b int` gives both `a` and `b` the type `int`
    fn parse_params(&mut self) -> Result<Vec<Param>, ParserError> {
        let mut params: Vec<Param> = Vec::new();
        loop {
            if self.eat(Punctuation::CloseParen) {
                break;
            }
            let (name, span) = self.expect_identifier("parameter name")?;
            let ty = match self.current().kind {
                TokenKind::Punctuation(Punctuation::Comma | Punctuation::CloseParen) => None,
                _ => Some(self.parse_type()?),
            };
            params.push(Param { name, ty, span });

            if !self.eat(Punctuation::Comma) {
                self.expect(Punctuation::CloseParen, "`,` or `)`")?;
                break;
            }
        }

        // back-fill grouped parameters from the next typed one
        let mut pending: Option<TypeExpr> = None;
        for param in params.iter_mut().rev() {
            match &param.ty {
                Some(ty) => pending = Some(ty.clone()),
                None => param.ty = pending.clone(),
            }
        }
        Ok(params)
    }

    /// `class Name { var field T; field T; func method() { } }`
    pub(super) fn parse_class(&mut self) -> Result<Index, ParserError> {
        let keyword = *self.current();
        self.advance(); // consume 'class'

        let (name, _) = self.expect_identifier("class name")?;
        self.expect(Punctuation::OpenBrace, "`{` after class name")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        loop {
            self.skip_semicolons();
            let token = *self.current();
            match token.kind {
                TokenKind::Punctuation(Punctuation::CloseBrace) => break,
                TokenKind::Eof => return Err(self.expected("`}` to close class", &token)),
                TokenKind::Keyword(Keyword::Func) => methods.push(self.parse_function()?),
                TokenKind::Keyword(Keyword::Var) | TokenKind::Identifier(_) => {
                    if token.kind == TokenKind::Keyword(Keyword::Var) {
                        self.advance();
                    }
                    let (field, field_span) = self.expect_identifier("field name")?;
                    let ty = self.parse_type()?;
                    fields.push(FieldDecl {
                        name: field,
                        ty,
                        span: field_span.connect_new(&self.previous_span()),
                    });
                    self.end_statement()?;
                }
                _ => return Err(self.expected("field or method", &token)),
            }
        }

        let close = self.expect(Punctuation::CloseBrace, "`}`")?;
        self.end_statement()?;
        Ok(self.push(Node::new(
            NodeKind::Stmt(StmtKind::Class { name, fields, methods }),
            keyword.span.connect_new(&close.span),
        )))
    }

    /// `template <T, U> func name(...) { }`
    pub(super) fn parse_template(&mut self) -> Result<Index, ParserError> {
        let keyword = *self.current();
        self.advance(); // consume 'template'

        self.expect(Punctuation::LessThan, "`<` after template")?;
        let mut params = Vec::new();
        loop {
            let (param, _) = self.expect_identifier("type parameter")?;
            params.push(param);
            if !self.eat(Punctuation::Comma) {
                break;
            }
        }
        self.expect(Punctuation::GreaterThan, "`>` after type parameters")?;

        if !self.check_keyword(Keyword::Func) {
            let token = *self.current();
            return Err(self.expected("function after template parameters", &token));
        }
        let func = self.parse_function()?;
        let span = keyword.span.connect_new(&self.span_of(func));
        Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::Template { params, func }), span)))
    }
}
