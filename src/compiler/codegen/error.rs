use cranelift::codegen::CodegenError;
use cranelift::module::ModuleError;
use thiserror::Error;

use crate::compiler::{
    error::{CompilerPhase, Diagnostic},
    tokens::DisplaySpan,
};

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Cranelift Codegen Error: {0}")]
    CodegenError(#[from] CodegenError),

    #[error("Cranelift Module Error: {0}")]
    ModuleError(#[from] ModuleError),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Unresolved identifier `{name}`")]
    UnresolvedIdentifier {
        name: String,
        note: Option<String>,
        span: DisplaySpan,
    },

    #[error("Unknown type `{name}`")]
    UnknownType { name: String, span: DisplaySpan },

    #[error("Unsupported {what}")]
    UnsupportedNode { what: String, span: DisplaySpan },

    #[error("Operator `{op}` is not supported for {ty}")]
    UnsupportedOperator { op: String, ty: String, span: DisplaySpan },

    #[error("`{name}` expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: String,
        got: usize,
        span: DisplaySpan,
    },

    #[error("`{what}` used outside of {context}")]
    MissingContext {
        what: String,
        context: String,
        span: DisplaySpan,
    },

    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
        span: DisplaySpan,
    },

    #[error("`{name}` is already declared in this scope")]
    Redeclared { name: String, span: DisplaySpan },

    #[error("Invalid {what}: {reason}")]
    Invalid {
        what: String,
        reason: String,
        span: DisplaySpan,
    },

    #[error("`{name}` has no value because its declaration failed")]
    Poisoned { name: String, span: DisplaySpan },
}

impl TranslateError {
    pub fn span(&self) -> Option<&DisplaySpan> {
        match self {
            TranslateError::CodegenError(_) | TranslateError::ModuleError(_) | TranslateError::Backend(_) => None,
            TranslateError::UnresolvedIdentifier { span, .. }
            | TranslateError::UnknownType { span, .. }
            | TranslateError::UnsupportedNode { span, .. }
            | TranslateError::UnsupportedOperator { span, .. }
            | TranslateError::ArityMismatch { span, .. }
            | TranslateError::MissingContext { span, .. }
            | TranslateError::TypeMismatch { span, .. }
            | TranslateError::Redeclared { span, .. }
            | TranslateError::Invalid { span, .. }
            | TranslateError::Poisoned { span, .. } => Some(span),
        }
    }
}

impl From<TranslateError> for Diagnostic {
    fn from(err: TranslateError) -> Self {
        let mut diagnostic = Diagnostic::error(err.to_string(), CompilerPhase::Codegen);
        if let Some(span) = err.span() {
            diagnostic = diagnostic.with_span(span.clone());
        }
        match err {
            TranslateError::UnresolvedIdentifier { note: Some(note), .. } => diagnostic.with_note(note),
            TranslateError::Redeclared { .. } => diagnostic.with_help("use `=` to assign to an existing variable"),
            TranslateError::ArityMismatch { .. } => diagnostic.with_help("check the number of arguments passed"),
            _ => diagnostic,
        }
    }
}
