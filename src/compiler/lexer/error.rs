use std::fmt::{self, Display};

use thiserror::Error;

use super::numbers::NumberBase;
use crate::compiler::{
    Interner,
    error::{CompilerPhase, Diagnostic},
    tokens::{DisplaySpan, Span},
};

#[derive(Error, Debug, Clone)]
pub enum LexError {
    #[error("Unexpected character '{character}'")]
    UnexpectedCharacter { character: char, span: DisplaySpan },

    #[error("Unterminated string literal")]
    UnterminatedString { span: DisplaySpan },

    #[error("Unterminated block comment")]
    UnterminatedComment { span: DisplaySpan },

    #[error("Invalid character literal")]
    InvalidCharLiteral { span: DisplaySpan },

    #[error("Unknown escape sequence '\\{escape}'")]
    InvalidEscape { escape: char, span: DisplaySpan },

    #[error("Invalid float '{value}'")]
    InvalidFloat {
        value: String,
        span: DisplaySpan,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("Invalid integer '{value}'")]
    InvalidInteger {
        value: String,
        span: DisplaySpan,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("Float literal written in {base}")]
    NonDecimalFloat { base: NumberBase, span: DisplaySpan },
}

impl Span {
    pub fn to_display(&self, interner: &Interner) -> DisplaySpan {
        DisplaySpan {
            file: interner.resolve(self.file).unwrap_or("<unknown>").to_string(),
            start: self.start,
            end: self.end,
        }
    }
}

impl Display for DisplaySpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}-{}", self.file, self.start.0, self.start.1, self.end.1)
    }
}

impl LexError {
    pub fn span(&self) -> &DisplaySpan {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedComment { span }
            | LexError::InvalidCharLiteral { span }
            | LexError::InvalidEscape { span, .. }
            | LexError::InvalidFloat { span, .. }
            | LexError::InvalidInteger { span, .. }
            | LexError::NonDecimalFloat { span, .. } => span,
        }
    }
}

impl From<LexError> for Diagnostic {
    fn from(err: LexError) -> Self {
        let diagnostic = Diagnostic::error(err.to_string(), CompilerPhase::Lexing).with_span(err.span().clone());
        match err {
            LexError::NonDecimalFloat { .. } => diagnostic.with_help("floats can only be written in decimal"),
            LexError::InvalidEscape { .. } => diagnostic.with_help("supported escapes are \\n \\t \\r \\0 \\\\ \\\" \\'"),
            _ => diagnostic,
        }
    }
}
