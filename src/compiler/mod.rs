use string_interner::{StringInterner, backend::BucketBackend, symbol::SymbolUsize};

pub mod codegen;
mod diagnostic_macros;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod tokens;

use codegen::{CodegenOptions, GeneratedModule};
use error::Diagnostic;
use lexer::Lexer;
use parser::Parser;

pub type Interner = StringInterner<BucketBackend<SymbolUsize>>;

/// Runs every phase over `source`. Each phase reports all of its errors, and
/// the pipeline stops after the first phase that produced any.
pub fn compile_source(
    source: &str,
    file_name: &str,
    options: &CodegenOptions,
) -> Result<GeneratedModule, Vec<Diagnostic>> {
    let mut interner = Interner::new();
    let file = interner.get_or_intern(file_name);

    let mut lexer = Lexer::new(&mut interner, file);
    lexer.tokenize(source.chars().collect());
    if !lexer.errors.is_empty() {
        return Err(lexer.errors.into_iter().map(Diagnostic::from).collect());
    }
    let tokens = lexer.tokens;

    let (root, tree) = {
        let mut parser = Parser::new(tokens, &interner);
        let root = parser.parse();
        if !parser.parse_errors.is_empty() {
            return Err(parser.parse_errors.into_iter().map(Diagnostic::from).collect());
        }
        (root, parser.tree)
    };

    codegen::codegen(root, &tree, &interner, options)
        .map_err(|failure| failure.into_diagnostics().into_iter().map(Diagnostic::from).collect())
}
