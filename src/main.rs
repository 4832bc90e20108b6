use clap::{Parser, Subcommand};
use sable::compiler::{
    codegen::{CodegenOptions, GeneratedModule, OptLevel},
    compile_source,
    error::{CompilerPhase, Diagnostic, print_reports},
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sable")]
#[command(about = "The sable toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "build", about = "build <file> | Compile a sable program into an object file")]
    Build {
        file: PathBuf,
        /// defaults to the input name with an `.o` extension
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// also write the IR text to this path
        #[arg(long = "emit-ir")]
        emit_ir: Option<PathBuf>,
        #[arg(short = 'g', long = "debug")]
        debug: bool,
        #[arg(short = 'O', long = "optimize")]
        optimize: bool,
    },
    #[command(name = "ir", about = "ir <file> | Print the generated IR")]
    Ir {
        file: PathBuf,
        #[arg(short = 'g', long = "debug")]
        debug: bool,
    },
}

fn driver_error(message: String) -> Vec<Diagnostic> {
    vec![Diagnostic::error(message, CompilerPhase::Driver)]
}

fn options_for(file: &Path, debug: bool, optimize: bool) -> CodegenOptions {
    let module_name = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    let source_dir = file
        .parent()
        .map(|p| p.display().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ".".to_string());

    CodegenOptions {
        module_name,
        source_file: file.display().to_string(),
        source_dir,
        debug_info: debug,
        opt_level: if optimize { OptLevel::Speed } else { OptLevel::None },
        ..CodegenOptions::default()
    }
}

fn compile(file: &Path, options: &CodegenOptions) -> Result<GeneratedModule, Vec<Diagnostic>> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| driver_error(format!("cannot read {}: {e}", file.display())))?;
    compile_source(&source, &file.display().to_string(), options)
}

fn build(file: &Path, output: Option<PathBuf>, emit_ir: Option<PathBuf>, options: &CodegenOptions) -> Result<(), Vec<Diagnostic>> {
    let module = compile(file, options)?;

    if let Some(ir_path) = emit_ir {
        std::fs::write(&ir_path, module.to_string())
            .map_err(|e| driver_error(format!("cannot write {}: {e}", ir_path.display())))?;
    }

    let output = output.unwrap_or_else(|| file.with_extension("o"));
    let bytes = module
        .emit_object()
        .map_err(|e| vec![Diagnostic::from(e)])?;
    std::fs::write(&output, bytes).map_err(|e| driver_error(format!("cannot write {}: {e}", output.display())))
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            file,
            output,
            emit_ir,
            debug,
            optimize,
        } => build(&file, output, emit_ir, &options_for(&file, debug, optimize)),
        Commands::Ir { file, debug } => compile(&file, &options_for(&file, debug, false)).map(|module| print!("{module}")),
    };

    if let Err(reports) = result {
        print_reports(&reports);
        std::process::exit(1);
    }
}
