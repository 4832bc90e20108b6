use std::collections::HashMap;

use cranelift::{
    module::{FuncId, Linkage, Module},
    prelude::Value,
};
use generational_arena::Index;
use string_interner::symbol::SymbolUsize;
use tracing::debug;

use crate::compiler::{
    parser::node::{FnDecl, Node, NodeKind, StmtKind, TypeExpr},
    tokens::DisplaySpan,
};

use super::{
    Info,
    cast::cast_value,
    cursor::Cursor,
    error::TranslateError,
    expr::expr_value,
    function::{FnLowering, clif_signature, lower_fn},
    function_call::direct_call,
    types::{FuncSig, VType},
};

#[derive(Debug, Clone)]
pub struct TemplateInfo {
    pub params: Vec<SymbolUsize>,
    /// the `Function` statement
    pub func: Index,
    /// instances by type arguments, in parameter order
    pub instances: HashMap<Vec<VType>, (FuncId, FuncSig)>,
}

pub fn register_template(params: &[SymbolUsize], func: Index, node: &Node, info: &mut Info) -> Result<(), TranslateError> {
    let NodeKind::Stmt(StmtKind::Function(decl)) = &info.node(func).kind else {
        return Err(TranslateError::Invalid {
            what: "template".to_string(),
            reason: "expected a function".to_string(),
            span: node.span.to_display(info.interner),
        });
    };
    if info.templates.contains_key(&decl.name) || info.declared.contains_key(&decl.name) {
        return Err(TranslateError::Redeclared {
            name: info.resolve(decl.name).to_string(),
            span: node.span.to_display(info.interner),
        });
    }

    info.templates.insert(
        decl.name,
        TemplateInfo {
            params: params.to_vec(),
            func,
            instances: HashMap::new(),
        },
    );
    Ok(())
}

/// Binds template parameters appearing in `written` to the matching parts of
/// `actual`. Concrete parts bind nothing; a mismatch there surfaces when the
/// argument is converted.
fn unify(
    written: &TypeExpr,
    actual: &VType,
    params: &[SymbolUsize],
    bindings: &mut HashMap<SymbolUsize, VType>,
    info: &Info,
    span: &DisplaySpan,
) -> Result<(), TranslateError> {
    match (written, actual) {
        (TypeExpr::Named(name), _) if params.contains(name) => match bindings.get(name) {
            Some(bound) if bound != actual => Err(TranslateError::TypeMismatch {
                context: format!("template parameter `{}`", info.resolve(*name)),
                expected: info.describe(bound),
                found: info.describe(actual),
                span: span.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                bindings.insert(*name, actual.clone());
                Ok(())
            }
        },
        (TypeExpr::Slice(inner), VType::Slice(elem)) => unify(inner, elem, params, bindings, info, span),
        (TypeExpr::Array(n, inner), VType::Array(elem, m)) if n == m => unify(inner, elem, params, bindings, info, span),
        _ => Ok(()),
    }
}

/// `f(args)` where `f` is a template: infers the type arguments, instantiates
/// `f__<types>` once per distinct set and calls it
pub fn call_template(
    sym: SymbolUsize,
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let Some(template) = info.templates.get(&sym).cloned() else {
        return Err(TranslateError::UnresolvedIdentifier {
            name: info.resolve(sym).to_string(),
            note: None,
            span: info.span(node_idx),
        });
    };
    let func_node = info.node(template.func);
    let NodeKind::Stmt(StmtKind::Function(decl)) = &func_node.kind else {
        return Err(TranslateError::Invalid {
            what: "template".to_string(),
            reason: "expected a function".to_string(),
            span: info.span(node_idx),
        });
    };
    let name = info.resolve(sym);
    if args.len() != decl.params.len() {
        return Err(TranslateError::ArityMismatch {
            name: name.to_string(),
            expected: decl.params.len().to_string(),
            got: args.len(),
            span: info.span(node_idx),
        });
    }

    let mut lowered = Vec::with_capacity(args.len());
    let mut bindings = HashMap::new();
    for (arg, param) in args.iter().zip(&decl.params) {
        let (value, ty) = expr_value(*arg, cursor, info)?;
        if let Some(written) = &param.ty {
            unify(written, &ty, &template.params, &mut bindings, info, &info.span(*arg))?;
        }
        lowered.push((value, ty, *arg));
    }

    let mut type_args = Vec::with_capacity(template.params.len());
    for param in &template.params {
        let Some(bound) = bindings.get(param) else {
            return Err(TranslateError::UnknownType {
                name: info.resolve(*param).to_string(),
                span: info.span(node_idx),
            });
        };
        type_args.push(bound.clone());
    }

    let (id, sig) = match template.instances.get(&type_args) {
        Some(instance) => instance.clone(),
        None => instantiate(sym, decl, func_node, &template.params, type_args, info)?,
    };

    let mut values = Vec::with_capacity(lowered.len());
    for ((value, ty, arg), param) in lowered.into_iter().zip(&sig.params) {
        values.push(cast_value(value, &ty, param, cursor, info, &info.span(arg))?);
    }
    Ok(direct_call(id, &sig, &values, cursor, info))
}

fn instantiate(
    sym: SymbolUsize,
    decl: &FnDecl,
    func_node: &Node,
    params: &[SymbolUsize],
    type_args: Vec<VType>,
    info: &mut Info,
) -> Result<(FuncId, FuncSig), TranslateError> {
    let frame: HashMap<SymbolUsize, VType> = params.iter().copied().zip(type_args.iter().cloned()).collect();
    let interner = info.interner;
    let resolve = |s: SymbolUsize| interner.resolve(s).unwrap_or("<unknown>").to_string();
    let mangled: Vec<String> = type_args.iter().map(|t| t.mangle(&resolve)).collect();
    let name = format!("{}__{}", info.resolve(sym), mangled.join("_"));
    let span = func_node.span.to_display(info.interner);

    info.type_params.push(frame.clone());
    let sig = info.signature_of(&decl.params, decl.return_type.as_ref(), &span);
    info.type_params.pop();
    let sig = sig?;

    let clif_sig = clif_signature(&sig, info.build_config.call_conv, false);
    let id = info.module.declare_function(&name, Linkage::Local, &clif_sig)?;
    info.record_function_name(id, &name);
    debug!(template = info.resolve(sym), instance = name.as_str(), "instantiating template");

    // cached before the body is lowered so recursive calls reuse it
    if let Some(template) = info.templates.get_mut(&sym) {
        template.instances.insert(type_args, (id, sig.clone()));
    }

    let detached = info.env.detached();
    let caller_env = std::mem::replace(&mut info.env, detached);
    info.type_params.push(frame);
    let result = lower_fn(
        FnLowering {
            id,
            name,
            sig: sig.clone(),
            params: &decl.params,
            body: decl.body,
            receiver: None,
            linkage: Linkage::Local,
            line: func_node.span.start.0,
        },
        info,
    );
    info.type_params.pop();
    let instance_env = std::mem::replace(&mut info.env, caller_env);
    info.env.merge_globals(instance_env);

    result.map(|()| (id, sig))
}
