use cranelift::{
    module::FuncId,
    prelude::{AbiParam, InstBuilder, Signature, Value, types},
};
use generational_arena::Index;
use string_interner::symbol::SymbolUsize;
use tracing::debug;

use crate::compiler::parser::node::{ExprKind, NodeKind};

use super::{
    Info,
    cast::expr_cast,
    class::call_method,
    cursor::Cursor,
    env::Binding,
    error::TranslateError,
    expr::expr_value,
    function::clif_signature,
    ptr_width,
    runtime::{RuntimeFn, call_runtime, declare_import, runtime_ref, string_addr},
    slice::{builtin_append, builtin_cap, builtin_len, builtin_make},
    template::call_template,
    types::{FuncSig, PrimitiveTypes, VType},
};

pub fn expr_call(
    callee: Index,
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    match &info.node(callee).kind {
        NodeKind::Expr(ExprKind::Identifier(sym)) => call_named(*sym, callee, args, node_idx, cursor, info),
        NodeKind::Expr(ExprKind::Member { object, member }) => call_member(*object, *member, args, node_idx, cursor, info),
        _ => {
            let (target, ty) = expr_value(callee, cursor, info)?;
            let VType::Func(sig) = ty else {
                return Err(not_callable(&ty, callee, info));
            };
            let values = lower_args("function value", args, &sig.params, node_idx, cursor, info)?;
            Ok(indirect_call(target, &sig, &values, cursor, info))
        }
    }
}

fn not_callable(ty: &VType, callee: Index, info: &Info) -> TranslateError {
    TranslateError::TypeMismatch {
        context: "call".to_string(),
        expected: "a function".to_string(),
        found: info.describe(ty),
        span: info.span(callee),
    }
}

/// checks the argument count and converts every argument to its parameter type
pub fn lower_args(
    name: &str,
    args: &[Index],
    params: &[VType],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<Vec<Value>, TranslateError> {
    if args.len() != params.len() {
        return Err(TranslateError::ArityMismatch {
            name: name.to_string(),
            expected: params.len().to_string(),
            got: args.len(),
            span: info.span(node_idx),
        });
    }
    args.iter()
        .zip(params)
        .map(|(arg, ty)| expr_cast(*arg, ty, cursor, info))
        .collect()
}

fn call_result(call: cranelift::codegen::ir::Inst, sig: &FuncSig, cursor: &Cursor) -> (Option<Value>, VType) {
    if sig.ret.is_unit() {
        return (None, VType::UNIT);
    }
    (cursor.builder.inst_results(call).first().copied(), sig.ret.clone())
}

pub fn direct_call(id: FuncId, sig: &FuncSig, values: &[Value], cursor: &mut Cursor, info: &mut Info) -> (Option<Value>, VType) {
    let func_ref = cursor.func_ref(&mut info.module, id);
    let call = cursor.builder.ins().call(func_ref, values);
    call_result(call, sig, cursor)
}

pub fn indirect_call(target: Value, sig: &FuncSig, values: &[Value], cursor: &mut Cursor, info: &Info) -> (Option<Value>, VType) {
    let sig_ref = cursor
        .builder
        .import_signature(clif_signature(sig, info.build_config.call_conv, false));
    let call = cursor.builder.ins().call_indirect(sig_ref, target, values);
    call_result(call, sig, cursor)
}

fn call_named(
    sym: SymbolUsize,
    callee: Index,
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let name = info.resolve(sym);
    let binding = info.env.lookup(sym).cloned();

    if binding.is_none() {
        match name {
            "len" => return builtin_len(args, node_idx, cursor, info),
            "cap" => return builtin_cap(args, node_idx, cursor, info),
            "append" => return builtin_append(args, node_idx, cursor, info),
            "make" => return builtin_make(args, node_idx, cursor, info),
            _ => {}
        }
        if let Some(prim) = PrimitiveTypes::from_name(name) {
            let [arg] = args else {
                return Err(TranslateError::ArityMismatch {
                    name: name.to_string(),
                    expected: "1".to_string(),
                    got: args.len(),
                    span: info.span(node_idx),
                });
            };
            let value = expr_cast(*arg, &VType::Primitive(prim), cursor, info)?;
            return Ok((Some(value), VType::Primitive(prim)));
        }
    }

    match binding {
        Some(Binding::Function { id, sig }) => {
            let values = lower_args(name, args, &sig.params, node_idx, cursor, info)?;
            Ok(direct_call(id, &sig, &values, cursor, info))
        }
        Some(_) => {
            let (target, ty) = expr_value(callee, cursor, info)?;
            let VType::Func(sig) = ty else {
                return Err(not_callable(&ty, callee, info));
            };
            let values = lower_args(name, args, &sig.params, node_idx, cursor, info)?;
            Ok(indirect_call(target, &sig, &values, cursor, info))
        }
        None if info.templates.contains_key(&sym) => call_template(sym, args, node_idx, cursor, info),
        None => match info.declared.get(&sym).cloned() {
            Some((id, sig)) => {
                let values = lower_args(name, args, &sig.params, node_idx, cursor, info)?;
                Ok(direct_call(id, &sig, &values, cursor, info))
            }
            None => {
                let (id, sig, values) = call_extern(name, args, node_idx, cursor, info)?;
                info.env.declare_global(sym, Binding::Function { id, sig: sig.clone() });
                Ok(direct_call(id, &sig, &values, cursor, info))
            }
        },
    }
}

/// Calls a function nothing in the program defines. It is declared as an
/// import on first use, with the argument types as parameters and an `int` result.
fn call_extern(
    name: &str,
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(FuncId, FuncSig, Vec<Value>), TranslateError> {
    if let Some((id, sig)) = info.externs.get(name).cloned() {
        let values = lower_args(name, args, &sig.params, node_idx, cursor, info)?;
        return Ok((id, sig, values));
    }

    let mut values = Vec::with_capacity(args.len());
    let mut params = Vec::with_capacity(args.len());
    for arg in args {
        let (value, ty) = expr_value(*arg, cursor, info)?;
        values.push(value);
        params.push(ty);
    }
    let sig = FuncSig { params, ret: VType::INT };
    let clif_sig = clif_signature(&sig, info.build_config.call_conv, false);
    let id = declare_import(info, name, &clif_sig)?;
    debug!(name, params = sig.params.len(), "declared external on first call");
    info.externs.insert(name.to_string(), (id, sig.clone()));
    Ok((id, sig, values))
}

fn call_member(
    object: Index,
    member: SymbolUsize,
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    if let NodeKind::Expr(ExprKind::Identifier(sym)) = info.node(object).kind {
        if info.env.lookup(sym).is_none() && !info.declared.contains_key(&sym) {
            let package = info.resolve(sym);
            return match package {
                "fmt" | "os" => package_call(package, info.resolve(member), args, node_idx, cursor, info),
                _ => {
                    let name = format!("{package}_{}", info.resolve(member));
                    let (id, sig, values) = call_extern(&name, args, node_idx, cursor, info)?;
                    Ok(direct_call(id, &sig, &values, cursor, info))
                }
            };
        }
    }

    let (receiver, ty) = expr_value(object, cursor, info)?;
    match ty {
        VType::Class(class) => call_method(receiver, class, member, args, node_idx, cursor, info),
        other => Err(TranslateError::UnsupportedOperator {
            op: format!(".{}()", info.resolve(member)),
            ty: info.describe(&other),
            span: info.span(node_idx),
        }),
    }
}

fn package_call(
    package: &str,
    member: &str,
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    match (package, member) {
        ("fmt", "Println") if args.is_empty() => {
            let empty = string_addr(cursor, info, "")?;
            call_runtime(cursor, info, RuntimeFn::Puts, &[empty])?;
        }
        ("fmt", "Println" | "Print") => {
            let mut format = Vec::with_capacity(args.len());
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                let (value, ty) = expr_value(*arg, cursor, info)?;
                let (spec, value) = printf_arg(value, &ty, *arg, cursor, info)?;
                format.push(spec);
                values.push(value);
            }
            let mut format = format.join(" ");
            if member == "Println" {
                format.push('\n');
            }
            let format = string_addr(cursor, info, &format)?;
            call_printf(format, &values, cursor, info)?;
        }
        ("fmt", "Printf") => {
            let Some((first, rest)) = args.split_first() else {
                return Err(TranslateError::ArityMismatch {
                    name: "fmt.Printf".to_string(),
                    expected: "at least 1".to_string(),
                    got: 0,
                    span: info.span(node_idx),
                });
            };
            let format = expr_cast(*first, &VType::STR, cursor, info)?;
            let mut values = Vec::with_capacity(rest.len());
            for arg in rest {
                let (value, ty) = expr_value(*arg, cursor, info)?;
                values.push(printf_arg(value, &ty, *arg, cursor, info)?.1);
            }
            call_printf(format, &values, cursor, info)?;
        }
        ("os", "Exit") => {
            let [code] = args else {
                return Err(TranslateError::ArityMismatch {
                    name: "os.Exit".to_string(),
                    expected: "1".to_string(),
                    got: args.len(),
                    span: info.span(node_idx),
                });
            };
            let code = expr_cast(*code, &VType::INT, cursor, info)?;
            call_runtime(cursor, info, RuntimeFn::Exit, &[code])?;
        }
        _ => {
            return Err(TranslateError::UnsupportedNode {
                what: format!("{package}.{member}"),
                span: info.span(node_idx),
            });
        }
    }
    Ok((None, VType::UNIT))
}

/// the conversion for one printf argument and the value after C's default promotions
fn printf_arg(
    value: Value,
    ty: &VType,
    arg: Index,
    cursor: &mut Cursor,
    info: &Info,
) -> Result<(&'static str, Value), TranslateError> {
    let ins = cursor.builder.ins();
    Ok(match ty {
        VType::Primitive(PrimitiveTypes::I8 | PrimitiveTypes::I16) => ("%d", ins.sextend(types::I32, value)),
        VType::Primitive(PrimitiveTypes::I32) => ("%d", value),
        VType::Primitive(PrimitiveTypes::U8 | PrimitiveTypes::U16) => ("%u", ins.uextend(types::I32, value)),
        VType::Primitive(PrimitiveTypes::U32) => ("%u", value),
        VType::Primitive(PrimitiveTypes::I64) => ("%lld", value),
        VType::Primitive(PrimitiveTypes::U64) => ("%llu", value),
        VType::Primitive(PrimitiveTypes::F32) => ("%f", ins.fpromote(types::F64, value)),
        VType::Primitive(PrimitiveTypes::F64) => ("%f", value),
        VType::Primitive(PrimitiveTypes::Bool) => ("%d", ins.uextend(types::I32, value)),
        VType::Primitive(PrimitiveTypes::Str) => ("%s", value),
        VType::Array(..) | VType::Slice(_) | VType::Pointer(_) | VType::Func(_) | VType::Class(_) => ("%p", value),
        VType::Primitive(PrimitiveTypes::Unit) => {
            return Err(TranslateError::TypeMismatch {
                context: "print argument".to_string(),
                expected: "a value".to_string(),
                found: info.describe(ty),
                span: info.span(arg),
            });
        }
    })
}

/// printf is variadic: each call site imports a signature matching its arguments
fn call_printf(format: Value, values: &[Value], cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    let printf = runtime_ref(cursor, info, RuntimeFn::Printf)?;
    let target = cursor.builder.ins().func_addr(ptr_width().to_clif(), printf);

    let mut sig = Signature::new(info.build_config.call_conv);
    sig.params.push(AbiParam::new(ptr_width().to_clif()));
    for value in values {
        let ty = cursor.builder.func.dfg.value_type(*value);
        sig.params.push(AbiParam::new(ty));
    }
    sig.returns.push(AbiParam::new(types::I32));
    let sig_ref = cursor.builder.import_signature(sig);

    let mut operands = Vec::with_capacity(values.len() + 1);
    operands.push(format);
    operands.extend_from_slice(values);
    cursor.builder.ins().call_indirect(sig_ref, target, &operands);
    Ok(())
}
