use generational_arena::Index;

use super::{
    Parser,
    error::ParserError,
    node::{Node, NodeKind, StmtKind},
};
use crate::compiler::tokens::{Keyword, Punctuation, TokenKind};

impl Parser<'_> {
    pub fn parse_stmt(&mut self) -> Result<Index, ParserError> {
        let token = *self.current();
        match token.kind {
            TokenKind::Keyword(Keyword::Package) => {
                self.advance();
                let (name, name_span) = self.expect_identifier("package name")?;
                self.end_statement()?;
                Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::Package { name }), token.span.connect_new(&name_span))))
            }
            TokenKind::Keyword(Keyword::Import) => self.parse_import(),
            TokenKind::Keyword(Keyword::Var) | TokenKind::Keyword(Keyword::Const) => self.parse_var(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Break) => self.parse_bare(StmtKind::Break),
            TokenKind::Keyword(Keyword::Continue) => self.parse_bare(StmtKind::Continue),
            TokenKind::Keyword(Keyword::Fallthrough) => self.parse_bare(StmtKind::Fallthrough),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Throw) => {
                self.advance();
                let value = self.parse_expr()?;
                let span = token.span.connect_new(&self.span_of(value));
                self.end_statement()?;
                Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::Throw { value }), span)))
            }
            TokenKind::Keyword(Keyword::Class) => self.parse_class(),
            TokenKind::Keyword(Keyword::Template) => self.parse_template(),
            // `func name(` is a declaration, `func(` a literal in expression position
            TokenKind::Keyword(Keyword::Func)
                if matches!(self.peek_offset(1).map(|t| t.kind), Some(TokenKind::Identifier(_))) =>
            {
                self.parse_function()
            }
            TokenKind::Punctuation(Punctuation::OpenBrace) => self.parse_block(),
            _ => {
                let expr = self.parse_expr()?;
                let span = self.span_of(expr);
                self.end_statement()?;
                Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::Expr { expr }), span)))
            }
        }
    }

    /// a keyword statement without operands
    fn parse_bare(&mut self, kind: StmtKind) -> Result<Index, ParserError> {
        let span = self.current().span;
        self.advance();
        self.end_statement()?;
        Ok(self.push(Node::new(NodeKind::Stmt(kind), span)))
    }

    /// `import "fmt"` or `import ( "fmt" "os" )`
    fn parse_import(&mut self) -> Result<Index, ParserError> {
        let start = self.current().span;
        self.advance(); // consume 'import'

        let grouped = self.eat(Punctuation::OpenParen);
        let mut paths = Vec::new();
        loop {
            if grouped {
                self.skip_semicolons();
                if self.eat(Punctuation::CloseParen) {
                    break;
                }
            }
            let token = *self.current();
            let TokenKind::StringLiteral(path) = token.kind else {
                return Err(self.expected("import path", &token));
            };
            self.advance();
            paths.push(path);
            if !grouped {
                break;
            }
        }

        let span = start.connect_new(&self.previous_span());
        self.end_statement()?;
        Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::Import { paths }), span)))
    }

    /// `var name [type] [= value]`, also `const`
    fn parse_var(&mut self) -> Result<Index, ParserError> {
        let keyword = *self.current();
        self.advance(); // consume 'var' / 'const'

        let (name, _) = self.expect_identifier("variable name")?;
        let ty = if self.check(Punctuation::Eq) { None } else { Some(self.parse_type()?) };
        let value = if self.eat(Punctuation::Eq) { Some(self.parse_expr()?) } else { None };

        if ty.is_none() && value.is_none() {
            return Err(ParserError::Invalid {
                what: "variable declaration".to_string(),
                reason: "needs a type or an initializer".to_string(),
                span: keyword.span.to_display(self.interner),
            });
        }

        let span = keyword.span.connect_new(&self.previous_span());
        self.end_statement()?;
        Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::Var { name, ty, value }), span)))
    }

    fn parse_return(&mut self) -> Result<Index, ParserError> {
        let keyword = *self.current();
        self.advance(); // consume 'return'

        let value = match self.current().kind {
            TokenKind::Punctuation(Punctuation::Semicolon | Punctuation::CloseBrace) | TokenKind::Eof => None,
            _ => Some(self.parse_expr()?),
        };

        let span = keyword.span.connect_new(&self.previous_span());
        self.end_statement()?;
        Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::Return { value }), span)))
    }
}
