use std::fs;
use std::path::Path;

use sable::compiler::{
    codegen::{CodegenOptions, GeneratedModule, OptLevel},
    compile_source,
    error::{CompilerPhase, Diagnostic},
};

fn options(path: &Path, debug_info: bool, opt_level: OptLevel) -> CodegenOptions {
    CodegenOptions {
        module_name: path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
        source_file: path.display().to_string(),
        source_dir: "tests/fixtures".to_string(),
        debug_info,
        opt_level,
        ..CodegenOptions::default()
    }
}

fn compile_fixture(name: &str, debug_info: bool, opt_level: OptLevel) -> Result<GeneratedModule, Vec<Diagnostic>> {
    let path = Path::new("tests/fixtures").join(name);
    let source = fs::read_to_string(&path).unwrap();
    compile_source(&source, &path.display().to_string(), &options(&path, debug_info, opt_level))
}

fn compile_valid(name: &str) -> GeneratedModule {
    compile_fixture(name, false, OptLevel::None).unwrap_or_else(|errors| {
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        panic!("{name} failed: {messages:#?}")
    })
}

#[test]
fn test_end_to_end_fib() {
    let module = compile_valid("valid/fib.sb");
    assert_eq!(module.name(), "fib");
    assert_eq!(module.imports(), ["printf"]);

    let fib = module.function("fib").unwrap();
    assert_eq!(module.callees(&fib.func), ["fib"]);

    let bytes = module.emit_object().unwrap();
    assert!(!bytes.is_empty());
}

#[test]
fn test_end_to_end_shapes() {
    let module = compile_valid("valid/shapes.sb");
    for name in ["Rect_init", "Rect_area", "larger__int", "main"] {
        assert!(module.function(name).is_some(), "missing {name}");
    }
    let imports = module.imports();
    for name in ["malloc", "realloc", "printf"] {
        assert!(imports.iter().any(|i| i == name), "missing import {name} in {imports:?}");
    }
    assert!(!module.emit_object().unwrap().is_empty());
}

#[test]
fn test_end_to_end_exceptions() {
    let module = compile_valid("valid/exceptions.sb");

    // only `check` throws without a handler
    let panicking: Vec<&str> = module
        .functions()
        .iter()
        .filter(|f| module.callees(&f.func).contains(&"sable_panic"))
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(panicking, ["check"]);

    let safe_div = module.function("safeDiv").unwrap();
    let catches = safe_div.labels.values().filter(|l| l.starts_with("try.catch.")).count();
    assert_eq!(catches, 2);
    assert!(!module.emit_object().unwrap().is_empty());
}

#[test]
fn test_optimized_build() {
    let module = compile_fixture("valid/fib.sb", false, OptLevel::Speed).unwrap();
    assert!(!module.emit_object().unwrap().is_empty());
}

#[test]
fn test_invalid_program_reports_all_errors() {
    let Err(errors) = compile_fixture("invalid/undefined.sb", false, OptLevel::None) else {
        panic!("undefined.sb should not compile");
    };
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.phase == CompilerPhase::Codegen));
    let spans: Vec<String> = errors.iter().filter_map(|e| e.span.as_ref()).map(|s| s.file.clone()).collect();
    assert_eq!(spans, ["tests/fixtures/invalid/undefined.sb"; 2]);
}

#[test]
fn test_text_form() {
    let module = compile_valid("valid/fib.sb");
    let text = module.to_string();

    assert!(text.starts_with("; module fib\n"));
    assert!(text.contains("; import printf"));
    assert!(text.contains("; const .str.0"));
    assert!(text.contains("function %fib("), "{text}");
    assert!(text.contains("  ; entry"));
    assert!(text.contains("  ; for.cond."));
    // the call to `fib` names its target
    assert!(text.lines().any(|l| l.trim_start().starts_with("fn") && l.ends_with("; fib")), "{text}");
    assert!(!text.contains("; compile unit"));
}

#[test]
fn test_debug_info() {
    let module = compile_fixture("valid/fib.sb", true, OptLevel::None).unwrap();
    let debug = module.debug_info().unwrap();

    let unit = debug.compile_unit().unwrap();
    assert_eq!(unit.file, "tests/fixtures/valid/fib.sb");
    assert!(!unit.optimized);

    let fib = debug.functions().iter().find(|f| f.name == "fib").unwrap();
    assert_eq!(fib.line, 5);
    assert!(debug.functions().iter().any(|f| f.name == "main"));

    assert!(module.to_string().contains("; compile unit: file=\"tests/fixtures/valid/fib.sb\""));
}
