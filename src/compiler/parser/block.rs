use generational_arena::Index;

use crate::compiler::tokens::{Punctuation, TokenKind};

use super::{
    Parser,
    error::ParserError,
    node::{Node, NodeKind, StmtKind},
};

impl Parser<'_> {
    /// `{ stmt* }` as a `Block` statement. Statement errors inside are recorded and skipped.
    pub fn parse_block(&mut self) -> Result<Index, ParserError> {
        let open = self.expect(Punctuation::OpenBrace, "`{`")?;

        let mut stmts = Vec::new();
        loop {
            self.skip_semicolons();
            match self.current().kind {
                TokenKind::Punctuation(Punctuation::CloseBrace) => break,
                TokenKind::Eof => {
                    let token = *self.current();
                    return Err(self.expected("closing brace `}`", &token));
                }
                _ => match self.parse_stmt() {
                    Ok(idx) => stmts.push(idx),
                    Err(e) => self.recover(e),
                },
            }
        }

        let close = *self.current();
        self.advance(); // consume '}'

        Ok(self.push(Node::new(NodeKind::Stmt(StmtKind::Block { stmts }), open.span.connect_new(&close.span))))
    }
}
