use cranelift::{
    codegen::ir::{Function, UserFuncName},
    module::{FuncId, Linkage, Module},
    prelude::{AbiParam, FunctionBuilder, FunctionBuilderContext, InstBuilder, Signature, Value, isa::CallConv, types},
};
use generational_arena::Index;
use string_interner::symbol::SymbolUsize;
use tracing::debug;

use crate::compiler::parser::node::{FnDecl, Node, Param, TypeExpr};

use super::{
    Info,
    block::{lower_block, scoped},
    control_flow::default_return,
    cursor::Cursor,
    env::Binding,
    error::TranslateError,
    ptr_width,
    types::{FuncSig, VType},
    variable::bind_local,
};

pub fn clif_signature(sig: &FuncSig, call_conv: CallConv, receiver: bool) -> Signature {
    let mut clif = Signature::new(call_conv);
    if receiver {
        clif.params.push(AbiParam::new(ptr_width().to_clif()));
    }
    clif.params
        .extend(sig.params.iter().map(|p| AbiParam::new(p.to_clif(ptr_width()))));
    if !sig.ret.is_unit() {
        clif.returns.push(AbiParam::new(sig.ret.to_clif(ptr_width())));
    }
    clif
}

/// Everything needed to lower one function body into its own `Function`.
pub struct FnLowering<'n> {
    pub id: FuncId,
    pub name: String,
    pub sig: FuncSig,
    pub params: &'n [Param],
    /// a `Block` statement
    pub body: Index,
    /// the class of the receiver, for methods
    pub receiver: Option<SymbolUsize>,
    pub linkage: Linkage,
    pub line: usize,
}

/// Lowers a function body through a fresh cursor. Errors inside the body are
/// reported and the function is only defined in the module when lowering it
/// added no diagnostics.
pub fn lower_fn(f: FnLowering, info: &mut Info) -> Result<(), TranslateError> {
    let clif_sig = clif_signature(&f.sig, info.build_config.call_conv, f.receiver.is_some());
    let mut func = Function::with_name_signature(UserFuncName::testcase(&f.name), clif_sig);
    let mut builder_ctx = FunctionBuilderContext::new();
    let builder = FunctionBuilder::new(&mut func, &mut builder_ctx);
    let owner = info.next_owner();
    let mut cursor = Cursor::new(builder, f.sig.ret.clone(), owner);

    let entry = cursor.labeled_block("entry".to_string());
    cursor.builder.append_block_params_for_function_params(entry);
    cursor.switch_to(entry);

    if let Some(debug) = info.debug.as_mut() {
        debug.register_function(&f.name, f.line, f.linkage == Linkage::Local, true);
    }

    let errors_before = info.diagnostics.len();
    let result = scoped(&mut cursor, info, |cursor, info| {
        let mut incoming = cursor.builder.block_params(entry).to_vec().into_iter();

        if let Some(class) = f.receiver {
            if let Some(this) = incoming.next() {
                let slot = cursor.slot_for(&VType::Class(class));
                cursor.builder.ins().stack_store(this, slot, 0);
                cursor.receiver = Some((slot, class));
            }
        }

        for ((param, ty), value) in f.params.iter().zip(&f.sig.params).zip(incoming) {
            if info.env.bound_in_current(param.name) {
                info.report(TranslateError::Redeclared {
                    name: info.resolve(param.name).to_string(),
                    span: param.span.to_display(info.interner),
                });
                continue;
            }
            bind_local(param.name, value, ty.clone(), cursor, info);
        }

        lower_block(f.body, cursor, info)
    });
    if let Err(e) = result {
        info.report(e);
    }
    if !cursor.is_terminated() {
        default_return(&mut cursor);
    }
    let labels = cursor.finish();

    if info.diagnostics.len() > errors_before {
        return Ok(());
    }
    info.define_function(f.id, &f.name, func, labels, f.linkage)
}

/// declares a top-level function so that any body can call it
pub fn declare_top_level(decl: &FnDecl, node: &Node, info: &mut Info) -> Result<(), TranslateError> {
    let span = node.span.to_display(info.interner);
    let name = info.resolve(decl.name);
    if info.declared.contains_key(&decl.name) {
        return Err(TranslateError::Redeclared {
            name: name.to_string(),
            span,
        });
    }

    let sig = info.signature_of(&decl.params, decl.return_type.as_ref(), &span)?;
    let clif_sig = clif_signature(&sig, info.build_config.call_conv, false);
    let id = info.module.declare_function(name, Linkage::Export, &clif_sig)?;
    info.record_function_name(id, name);
    info.declared.insert(decl.name, (id, sig.clone()));
    info.env.declare_global(decl.name, Binding::Function { id, sig });
    Ok(())
}

pub fn define_top_level(decl: &FnDecl, node: &Node, info: &mut Info) -> Result<(), TranslateError> {
    let Some((id, sig)) = info.declared.get(&decl.name).cloned() else {
        // the declaration already failed and was reported
        return Ok(());
    };
    let name = info.resolve(decl.name);
    if info.functions.iter().any(|f| f.name == name) {
        return Ok(());
    }

    lower_fn(
        FnLowering {
            id,
            name: name.to_string(),
            sig,
            params: &decl.params,
            body: decl.body,
            receiver: None,
            linkage: Linkage::Export,
            line: node.span.start.0,
        },
        info,
    )
}

/// `func(a T) R { ... }` as a value: a local function and its address
pub fn expr_func_literal(
    params: &[Param],
    return_type: Option<&TypeExpr>,
    body: Index,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let span = info.span(node_idx);
    let sig = info.signature_of(params, return_type, &span)?;

    let name = format!("__sable_lit_{}", info.next_label());
    let clif_sig = clif_signature(&sig, info.build_config.call_conv, false);
    let id = info.module.declare_function(&name, Linkage::Local, &clif_sig)?;
    info.record_function_name(id, &name);

    lower_fn(
        FnLowering {
            id,
            name,
            sig: sig.clone(),
            params,
            body,
            receiver: None,
            linkage: Linkage::Local,
            line: info.node(node_idx).span.start.0,
        },
        info,
    )?;

    let func_ref = cursor.func_ref(&mut info.module, id);
    let addr = cursor.builder.ins().func_addr(ptr_width().to_clif(), func_ref);
    Ok((Some(addr), VType::Func(Box::new(sig))))
}

/// `func main() int { return 0 }` for programs that do not define one
pub fn synthesize_main(info: &mut Info) -> Result<(), TranslateError> {
    let sig = FuncSig {
        params: Vec::new(),
        ret: VType::INT,
    };
    let clif_sig = clif_signature(&sig, info.build_config.call_conv, false);
    let id = info.module.declare_function("main", Linkage::Export, &clif_sig)?;
    info.record_function_name(id, "main");

    let mut func = Function::with_name_signature(UserFuncName::testcase("main"), clif_sig);
    let mut builder_ctx = FunctionBuilderContext::new();
    let mut cursor = Cursor::new(FunctionBuilder::new(&mut func, &mut builder_ctx), VType::INT, info.next_owner());
    let entry = cursor.labeled_block("entry".to_string());
    cursor.switch_to(entry);
    let zero = cursor.builder.ins().iconst(types::I32, 0);
    cursor.builder.ins().return_(&[zero]);
    let labels = cursor.finish();

    if let Some(debug) = info.debug.as_mut() {
        debug.register_function("main", 0, false, true);
    }
    debug!("synthesized main");
    info.define_function(id, "main", func, labels, Linkage::Export)
}
