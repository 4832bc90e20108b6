use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, OnceLock},
};

use cranelift::{
    codegen::{Context, ir::Function, verifier::verify_function},
    module::{DataDescription, DataId, FuncId, Linkage, Module, default_libcall_names},
    object::{ObjectBuilder, ObjectModule},
    prelude::{
        Block, Configurable,
        isa::{self, CallConv, TargetIsa},
        settings::{self, Flags},
        types::{I32, I64},
    },
};
use generational_arena::{Arena, Index};
use string_interner::symbol::SymbolUsize;
use target_lexicon::{PointerWidth as TargetPointerWidth, Triple};
use thiserror::Error;
use tracing::debug;

use crate::{
    SafeConvert,
    compiler::{
        Interner,
        parser::node::{Node, NodeKind, StmtKind},
        tokens::{DisplaySpan, Span},
    },
};

use self::{
    class::ClassInfo,
    cursor::Cursor,
    debug::DebugInfo,
    env::Env,
    error::TranslateError,
    exception::ExceptionFrame,
    runtime::RuntimeFn,
    template::TemplateInfo,
    types::{FuncSig, VType},
};

mod binary_ops;
mod block;
mod cast;
mod class;
mod control_flow;
mod cursor;
pub mod debug;
mod env;
pub mod error;
mod exception;
mod expr;
mod function;
mod function_call;
mod index;
mod infer;
mod literal;
mod printer;
mod runtime;
mod slice;
mod string;
mod switch;
mod template;
pub mod types;
mod unary_ops;
mod variable;
mod r#while;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PtrWidth {
    X32,
    X64,
}

impl PtrWidth {
    pub fn to_clif(self) -> cranelift::prelude::Type {
        match self {
            PtrWidth::X32 => I32,
            PtrWidth::X64 => I64,
        }
    }

    pub fn bytes(self) -> u32 {
        match self {
            PtrWidth::X32 => 4,
            PtrWidth::X64 => 8,
        }
    }
}

static PTR_WIDTH: OnceLock<PtrWidth> = OnceLock::new();

pub fn ptr_width() -> PtrWidth {
    *PTR_WIDTH.get_or_init(|| {
        let triple = Triple::host();
        match triple.pointer_width() {
            Ok(TargetPointerWidth::U16) => PtrWidth::X32,
            Ok(TargetPointerWidth::U32) => PtrWidth::X32,
            Ok(TargetPointerWidth::U64) => PtrWidth::X64,
            Err(_) => PtrWidth::X64,
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildConfig {
    pub call_conv: CallConv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    #[default]
    None,
    Speed,
}

impl OptLevel {
    fn as_setting(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CodegenOptions {
    pub module_name: String,
    pub source_file: String,
    pub source_dir: String,
    pub debug_info: bool,
    pub opt_level: OptLevel,
    pub producer: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            module_name: "main".to_string(),
            source_file: "<input>".to_string(),
            source_dir: ".".to_string(),
            debug_info: false,
            opt_level: OptLevel::None,
            producer: format!("sable {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A function that was lowered and defined in the module.
#[derive(Debug, Clone)]
pub struct LoweredFunction {
    pub name: String,
    pub func: Function,
    pub labels: HashMap<Block, String>,
    pub linkage: Linkage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataObject {
    pub name: String,
    pub size: usize,
    /// `None` when zero-initialised
    pub contents: Option<Vec<u8>>,
    /// the data object whose address is stored at offset 0
    pub points_to: Option<String>,
    pub writable: bool,
}

/// The result of a successful generation run.
pub struct GeneratedModule {
    module: ObjectModule,
    name: String,
    functions: Vec<LoweredFunction>,
    data_objects: Vec<DataObject>,
    imports: Vec<String>,
    func_names: HashMap<u32, String>,
    debug: Option<DebugInfo>,
}

impl GeneratedModule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &[LoweredFunction] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&LoweredFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn data_objects(&self) -> &[DataObject] {
        &self.data_objects
    }

    /// externally declared functions, in order of first use
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn debug_info(&self) -> Option<&DebugInfo> {
        self.debug.as_ref()
    }

    /// names of the functions `func` calls or takes the address of
    pub fn callees(&self, func: &Function) -> Vec<&str> {
        printer::referenced_functions(func)
            .into_iter()
            .filter_map(|id| self.func_names.get(&id).map(String::as_str))
            .collect()
    }

    pub fn emit_object(self) -> Result<Vec<u8>, TranslateError> {
        let product = self.module.finish();
        product.emit().map_err(|e| TranslateError::Backend(e.to_string()))
    }
}

/// Every diagnostic collected by a failed generation run.
#[derive(Error, Debug)]
#[error("code generation failed with {} error(s)", .diagnostics.len())]
pub struct CodegenFailure {
    diagnostics: Vec<TranslateError>,
}

impl CodegenFailure {
    pub fn diagnostics(&self) -> &[TranslateError] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<TranslateError> {
        self.diagnostics
    }
}

/// State shared by every lowering call of one generation run.
pub struct Info<'a> {
    pub module: ObjectModule,
    pub build_config: BuildConfig,
    pub nodes: &'a Arena<Node>,
    pub interner: &'a Interner,
    pub options: &'a CodegenOptions,
    pub env: Env,
    pub diagnostics: Vec<TranslateError>,
    pub exceptions: Vec<ExceptionFrame>,
    pub classes: HashMap<SymbolUsize, ClassInfo>,
    pub class_names: HashSet<SymbolUsize>,
    pub templates: HashMap<SymbolUsize, TemplateInfo>,
    pub type_params: Vec<HashMap<SymbolUsize, VType>>,
    /// top-level functions, declared before any body is lowered
    pub declared: HashMap<SymbolUsize, (FuncId, FuncSig)>,
    pub runtime: HashMap<RuntimeFn, FuncId>,
    /// functions declared on first call, keyed by symbol name
    pub externs: HashMap<String, (FuncId, FuncSig)>,
    pub debug: Option<DebugInfo>,
    pub module_name: String,
    label_counter: u32,
    owner_counter: u32,
    strings: HashMap<String, DataId>,
    data_names: HashMap<DataId, String>,
    functions: Vec<LoweredFunction>,
    data_objects: Vec<DataObject>,
    imports: Vec<String>,
    func_names: HashMap<u32, String>,
}

impl<'a> Info<'a> {
    pub fn report(&mut self, error: TranslateError) {
        // the failed declaration behind it is already in the sink
        if matches!(error, TranslateError::Poisoned { .. }) {
            return;
        }
        self.diagnostics.push(error);
    }

    /// a fresh number for block labels, unique across the whole run
    pub fn next_label(&mut self) -> u32 {
        self.label_counter += 1;
        self.label_counter
    }

    pub fn next_owner(&mut self) -> u32 {
        self.owner_counter += 1;
        self.owner_counter
    }

    pub fn node(&self, idx: Index) -> &'a Node {
        self.nodes.get(idx).safe()
    }

    pub fn span(&self, idx: Index) -> DisplaySpan {
        self.node(idx).span.to_display(self.interner)
    }

    pub fn resolve(&self, sym: SymbolUsize) -> &'a str {
        self.interner.resolve(sym).unwrap_or("<unknown>")
    }

    pub fn describe(&self, ty: &VType) -> String {
        let interner = self.interner;
        ty.describe(&|sym| interner.resolve(sym).unwrap_or("<unknown>").to_string())
    }

    /// records `span` as the current source location when debug info is on
    pub fn locate(&mut self, cursor: &mut Cursor, span: Span) {
        if let Some(debug) = self.debug.as_mut() {
            debug.set_location(span.start.0, span.start.1);
            cursor.set_line(span.start.0);
        }
    }

    pub fn record_function_name(&mut self, id: FuncId, name: &str) {
        self.func_names.insert(id.as_u32(), name.to_string());
    }

    pub fn record_import(&mut self, name: &str) {
        if !self.imports.iter().any(|i| i == name) {
            self.imports.push(name.to_string());
        }
    }

    pub fn define_data(
        &mut self,
        name: &str,
        desc: &DataDescription,
        object: DataObject,
        linkage: Linkage,
    ) -> Result<DataId, TranslateError> {
        let id = self.module.declare_data(name, linkage, object.writable, false)?;
        self.module.define_data(id, desc)?;
        self.data_objects.push(object);
        self.data_names.insert(id, name.to_string());
        Ok(id)
    }

    pub fn data_name(&self, id: DataId) -> Option<&str> {
        self.data_names.get(&id).map(String::as_str)
    }

    /// verifies `func` and defines it in the module under `id`
    pub fn define_function(
        &mut self,
        id: FuncId,
        name: &str,
        func: Function,
        labels: HashMap<Block, String>,
        linkage: Linkage,
    ) -> Result<(), TranslateError> {
        verify_function(&func, self.module.isa()).map_err(cranelift::codegen::CodegenError::Verifier)?;

        let mut ctx = Context::for_function(func.clone());
        self.module.define_function(id, &mut ctx)?;
        debug!(name, blocks = func.layout.blocks().count(), "defined function");

        self.functions.push(LoweredFunction {
            name: name.to_string(),
            func,
            labels,
            linkage,
        });
        Ok(())
    }
}

pub fn codegen(
    root: Index,
    nodes: &Arena<Node>,
    interner: &Interner,
    options: &CodegenOptions,
) -> Result<GeneratedModule, CodegenFailure> {
    let fail = |e: TranslateError| CodegenFailure { diagnostics: vec![e] };

    let (target_isa, call_conv) = isa(options.opt_level).map_err(fail)?;
    let builder = ObjectBuilder::new(target_isa, options.module_name.as_str(), default_libcall_names())
        .map_err(|e| fail(e.into()))?;
    let module = ObjectModule::new(builder);

    let debug = options.debug_info.then(|| {
        let mut debug = DebugInfo::new();
        debug.init_compile_unit(
            &options.source_file,
            &options.source_dir,
            &options.producer,
            options.opt_level != OptLevel::None,
        );
        debug
    });

    let mut info = Info {
        module,
        build_config: BuildConfig { call_conv },
        nodes,
        interner,
        options,
        env: Env::new(),
        diagnostics: Vec::new(),
        exceptions: Vec::new(),
        classes: HashMap::new(),
        class_names: HashSet::new(),
        templates: HashMap::new(),
        type_params: Vec::new(),
        declared: HashMap::new(),
        runtime: HashMap::new(),
        externs: HashMap::new(),
        debug,
        module_name: options.module_name.clone(),
        label_counter: 0,
        owner_counter: 0,
        strings: HashMap::new(),
        data_names: HashMap::new(),
        functions: Vec::new(),
        data_objects: Vec::new(),
        imports: Vec::new(),
        func_names: HashMap::new(),
    };

    let root_node = nodes.get(root).safe();
    match &root_node.kind {
        NodeKind::Root { stmts } => lower_program(stmts, &mut info),
        _ => info.report(TranslateError::Invalid {
            what: "program".to_string(),
            reason: "expected the root node".to_string(),
            span: root_node.span.to_display(interner),
        }),
    }

    if !info.diagnostics.is_empty() {
        return Err(CodegenFailure {
            diagnostics: info.diagnostics,
        });
    }

    Ok(GeneratedModule {
        module: info.module,
        name: info.module_name,
        functions: info.functions,
        data_objects: info.data_objects,
        imports: info.imports,
        func_names: info.func_names,
        debug: info.debug,
    })
}

fn lower_program(stmts: &[Index], info: &mut Info) {
    let nodes = info.nodes;

    // class names first, so signatures can mention any class
    for stmt in stmts {
        if let NodeKind::Stmt(StmtKind::Class { name, .. }) = &nodes.get(*stmt).safe().kind {
            info.class_names.insert(*name);
        }
    }

    // declare all functions first
    for stmt in stmts {
        let node = nodes.get(*stmt).safe();
        let declared = match &node.kind {
            NodeKind::Stmt(StmtKind::Package { name }) => {
                info.module_name = info.resolve(*name).to_string();
                Ok(())
            }
            NodeKind::Stmt(StmtKind::Function(decl)) => function::declare_top_level(decl, node, info),
            NodeKind::Stmt(StmtKind::Class { name, fields, methods }) => {
                class::register_class(*name, fields, methods, node, info)
            }
            NodeKind::Stmt(StmtKind::Template { params, func }) => template::register_template(params, *func, node, info),
            _ => Ok(()),
        };
        if let Err(e) = declared {
            info.report(e);
        }
    }

    for stmt in stmts {
        if let Err(e) = lower_top_level(*stmt, info) {
            info.report(e);
        }
    }

    if info.module.get_name("main").is_none() {
        if let Err(e) = function::synthesize_main(info) {
            info.report(e);
        }
    }
}

fn lower_top_level(idx: Index, info: &mut Info) -> Result<(), TranslateError> {
    let node = info.node(idx);
    let NodeKind::Stmt(stmt) = &node.kind else {
        return Err(TranslateError::Invalid {
            what: "top-level node".to_string(),
            reason: "expected a statement".to_string(),
            span: node.span.to_display(info.interner),
        });
    };

    match stmt {
        StmtKind::Package { .. } | StmtKind::Import { .. } | StmtKind::Template { .. } => Ok(()),
        StmtKind::Function(decl) => function::define_top_level(decl, node, info),
        StmtKind::Class { name, .. } => class::lower_methods(*name, info),
        StmtKind::Var { name, ty, value } => variable::lower_global(*name, ty.as_ref(), *value, node, info),
        other => Err(TranslateError::MissingContext {
            what: statement_name(other).to_string(),
            context: "a function body".to_string(),
            span: node.span.to_display(info.interner),
        }),
    }
}

fn statement_name(stmt: &StmtKind) -> &'static str {
    match stmt {
        StmtKind::Package { .. } => "package",
        StmtKind::Import { .. } => "import",
        StmtKind::Expr { .. } => "expression statement",
        StmtKind::Var { .. } => "var",
        StmtKind::Return { .. } => "return",
        StmtKind::Block { .. } => "block",
        StmtKind::While { .. } => "while",
        StmtKind::For { .. } => "for",
        StmtKind::Switch { .. } => "switch",
        StmtKind::Break => "break",
        StmtKind::Continue => "continue",
        StmtKind::Fallthrough => "fallthrough",
        StmtKind::Function(_) => "func",
        StmtKind::Class { .. } => "class",
        StmtKind::Template { .. } => "template",
        StmtKind::TryCatch { .. } => "try",
        StmtKind::Throw { .. } => "throw",
    }
}

fn isa(opt_level: OptLevel) -> Result<(Arc<dyn TargetIsa + 'static>, CallConv), TranslateError> {
    let triple = Triple::host();

    let mut flag_builder = settings::builder();
    flag_builder
        .set("opt_level", opt_level.as_setting())
        .map_err(|e| TranslateError::Backend(e.to_string()))?;
    flag_builder
        .set("is_pic", "true")
        .map_err(|e| TranslateError::Backend(e.to_string()))?;
    let flags = Flags::new(flag_builder);

    let isa_builder =
        isa::lookup(triple.clone()).map_err(|e| TranslateError::Backend(format!("target {triple} is not supported: {e}")))?;
    let isa = isa_builder.finish(flags)?;
    let call_conv = isa.default_call_conv();
    Ok((isa, call_conv))
}
