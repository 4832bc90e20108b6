use generational_arena::Index;
use string_interner::symbol::SymbolUsize;

use crate::compiler::tokens::Span;

/// A type as written in source. Names are resolved by the code generator.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(SymbolUsize),
    Slice(Box<TypeExpr>),
    Array(u32, Box<TypeExpr>),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { span, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
    And,
    Or,
}

impl BinOpKind {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Mod => "%",
            BinOpKind::Eq => "==",
            BinOpKind::NotEq => "!=",
            BinOpKind::LessThan => "<",
            BinOpKind::LessThanOrEq => "<=",
            BinOpKind::GreaterThan => ">",
            BinOpKind::GreaterThanOrEq => ">=",
            BinOpKind::And => "&&",
            BinOpKind::Or => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOpKind::Eq
                | BinOpKind::NotEq
                | BinOpKind::LessThan
                | BinOpKind::LessThanOrEq
                | BinOpKind::GreaterThan
                | BinOpKind::GreaterThanOrEq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOpKind {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PostfixOpKind {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(SymbolUsize),
    Char(char),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: SymbolUsize,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: SymbolUsize,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    /// a `Block` statement
    pub body: Index,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: SymbolUsize,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CaseClause {
    /// empty for `default`
    pub values: Vec<Index>,
    pub body: Vec<Index>,
    pub is_default: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub binding: Option<SymbolUsize>,
    pub ty: Option<TypeExpr>,
    pub body: Index,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Package {
        name: SymbolUsize,
    },
    Import {
        paths: Vec<SymbolUsize>,
    },
    Expr {
        expr: Index,
    },
    Var {
        name: SymbolUsize,
        ty: Option<TypeExpr>,
        value: Option<Index>,
    },
    Return {
        value: Option<Index>,
    },
    Block {
        stmts: Vec<Index>,
    },
    While {
        cond: Index,
        body: Index,
    },
    For {
        init: Option<Index>,
        cond: Option<Index>,
        post: Option<Index>,
        body: Index,
    },
    Switch {
        tag: Option<Index>,
        cases: Vec<CaseClause>,
    },
    Break,
    Continue,
    Fallthrough,
    Function(FnDecl),
    Class {
        name: SymbolUsize,
        fields: Vec<FieldDecl>,
        /// `Function` statements
        methods: Vec<Index>,
    },
    Template {
        params: Vec<SymbolUsize>,
        /// a `Function` statement
        func: Index,
    },
    TryCatch {
        body: Index,
        catches: Vec<CatchClause>,
        finally: Option<Index>,
    },
    Throw {
        value: Index,
    },
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Identifier(SymbolUsize),
    Literal(Literal),
    This,
    Unary {
        op: UnaryOpKind,
        operand: Index,
    },
    BinOp {
        op: BinOpKind,
        left: Index,
        right: Index,
    },
    Postfix {
        op: PostfixOpKind,
        operand: Index,
    },
    Assign {
        target: Index,
        value: Index,
    },
    /// `target := value`
    Declare {
        target: Index,
        value: Index,
    },
    Call {
        callee: Index,
        args: Vec<Index>,
    },
    Member {
        object: Index,
        member: SymbolUsize,
    },
    Index {
        target: Index,
        index: Index,
    },
    FuncLit {
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        body: Index,
    },
    If {
        cond: Index,
        /// a `Block` statement
        then_block: Index,
        /// a `Block` statement or another `If` expression
        else_block: Option<Index>,
    },
    ArrayLit {
        elements: Vec<Index>,
    },
    Type(TypeExpr),
    New {
        class: SymbolUsize,
        args: Vec<Index>,
    },
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root { stmts: Vec<Index> },
    Stmt(StmtKind),
    Expr(ExprKind),
}
