use string_interner::symbol::SymbolUsize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Keyword {
    Package,
    Import,
    Func,
    Var,
    Const,
    Return,
    If,
    Else,
    For,
    While,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Fallthrough,
    Class,
    Template,
    Try,
    Catch,
    Finally,
    Throw,
    New,
    This,
}

impl Keyword {
    pub fn from_ident(s: &str) -> Option<Self> {
        use Keyword::*;
        Some(match s {
            "package" => Package,
            "import" => Import,
            "func" => Func,
            "var" => Var,
            "const" => Const,
            "return" => Return,
            "if" => If,
            "else" => Else,
            "for" => For,
            "while" => While,
            "switch" => Switch,
            "case" => Case,
            "default" => Default,
            "break" => Break,
            "continue" => Continue,
            "fallthrough" => Fallthrough,
            "class" => Class,
            "template" => Template,
            "try" => Try,
            "catch" => Catch,
            "finally" => Finally,
            "throw" => Throw,
            "new" => New,
            "this" => This,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Punctuation {
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Comma,
    Dot,
    Colon,
    ColonEq,
    Semicolon,
    Bang,
    AmpAmp,
    PipePipe,

    Plus,
    Minus, // Binop and Unary
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    Eq,
    EqEq,
    NotEq,
    LessThan, // also opens template parameter lists
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    IntLiteral(i64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    StringLiteral(SymbolUsize),
    CharLiteral(char),
    Keyword(Keyword),
    Punctuation(Punctuation),
    Identifier(SymbolUsize),
    Eof,
}

impl TokenKind {
    /// whether a newline after this token ends the statement
    pub fn ends_statement(&self) -> bool {
        match self {
            TokenKind::IntLiteral(_)
            | TokenKind::FloatLiteral(_)
            | TokenKind::BoolLiteral(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::CharLiteral(_)
            | TokenKind::Identifier(_) => true,
            TokenKind::Keyword(kw) => matches!(
                kw,
                Keyword::Return | Keyword::Break | Keyword::Continue | Keyword::Fallthrough | Keyword::This
            ),
            TokenKind::Punctuation(p) => matches!(
                p,
                Punctuation::CloseParen
                    | Punctuation::CloseBracket
                    | Punctuation::CloseBrace
                    | Punctuation::PlusPlus
                    | Punctuation::MinusMinus
            ),
            TokenKind::Eof => false,
        }
    }
}

/// A span of text in a file. Start and end are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct Span {
    pub file: SymbolUsize,
    pub start: (usize, usize),
    pub end: (usize, usize),
}

#[derive(Debug, Clone, PartialEq, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl Span {
    pub fn new(file: SymbolUsize, start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            file,
            start: (start_line, start_col),
            end: (end_line, end_col),
        }
    }

    fn connect(&self, other: &Self) -> ((usize, usize), (usize, usize)) {
        let start = self.start.min(other.start);
        let end = self.end.max(other.end);
        (start, end)
    }

    pub fn connect_mut(&mut self, other: &Self) -> &mut Self {
        let (start, end) = self.connect(other);
        self.start = start;
        self.end = end;
        self
    }

    pub fn connect_new(&self, other: &Self) -> Self {
        let (start, end) = self.connect(other);
        Self {
            file: self.file,
            start,
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySpan {
    pub file: String,
    pub start: (usize, usize),
    pub end: (usize, usize),
}
