use crate::compiler::tokens::{Punctuation, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BindingPower {
    None,
    Assignment,   // = := += -= *= /= (right-associative)
    LogicalOr,    // ||
    LogicalAnd,   // &&
    Equality,     // == !=
    Comparison,   // < > <= >=
    Term,         // + -
    Factor,       // * / %
    Unary,        // Prefix - !
    Call,         // () [] ++ --
    MemberAccess, // .
    Primary,      // Literals, identifiers
}

impl BindingPower {
    /// one step tighter, used for the right operand of left-associative operators
    pub fn next(self) -> Self {
        use BindingPower::*;
        match self {
            None => Assignment,
            Assignment => LogicalOr,
            LogicalOr => LogicalAnd,
            LogicalAnd => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => MemberAccess,
            MemberAccess | Primary => Primary,
        }
    }
}

/// left binding power of a token in infix/postfix position, and whether it is right-associative
pub fn infix_binding_power(kind: TokenKind) -> (BindingPower, bool) {
    use Punctuation::*;
    let TokenKind::Punctuation(p) = kind else {
        return (BindingPower::None, false);
    };
    match p {
        Eq | ColonEq | PlusEq | MinusEq | StarEq | SlashEq => (BindingPower::Assignment, true),
        PipePipe => (BindingPower::LogicalOr, false),
        AmpAmp => (BindingPower::LogicalAnd, false),
        EqEq | NotEq => (BindingPower::Equality, false),
        LessThan | LessThanOrEq | GreaterThan | GreaterThanOrEq => (BindingPower::Comparison, false),
        Plus | Minus => (BindingPower::Term, false),
        Star | Slash | Percent => (BindingPower::Factor, false),
        OpenParen | OpenBracket | PlusPlus | MinusMinus => (BindingPower::Call, false),
        Dot => (BindingPower::MemberAccess, false),
        _ => (BindingPower::None, false),
    }
}
