use cranelift::{
    codegen::ir::FuncRef,
    module::{DataDescription, DataId, FuncId, FuncOrDataId, Linkage, Module},
    prelude::{AbiParam, InstBuilder, Signature, TrapCode, Type, Value, types::I32},
};
use tracing::debug;

use super::{DataObject, Info, cursor::Cursor, error::TranslateError, ptr_width};

/// trap code placed after every call to the panic helper
pub const PANIC_TRAP: TrapCode = TrapCode::unwrap_user(1);

/// External functions the generated code relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    Malloc,
    Realloc,
    Strlen,
    Strcpy,
    Strcat,
    Strcmp,
    Printf,
    Puts,
    Exit,
    Panic,
}

impl RuntimeFn {
    pub fn symbol(self) -> &'static str {
        match self {
            RuntimeFn::Malloc => "malloc",
            RuntimeFn::Realloc => "realloc",
            RuntimeFn::Strlen => "strlen",
            RuntimeFn::Strcpy => "strcpy",
            RuntimeFn::Strcat => "strcat",
            RuntimeFn::Strcmp => "strcmp",
            RuntimeFn::Printf => "printf",
            RuntimeFn::Puts => "puts",
            RuntimeFn::Exit => "exit",
            RuntimeFn::Panic => "sable_panic",
        }
    }

    fn signature(self, info: &Info) -> Signature {
        let ptr = ptr_width().to_clif();
        let mut sig = Signature::new(info.build_config.call_conv);
        let (params, ret): (Vec<Type>, Option<Type>) = match self {
            RuntimeFn::Malloc => (vec![ptr], Some(ptr)),
            RuntimeFn::Realloc => (vec![ptr, ptr], Some(ptr)),
            RuntimeFn::Strlen => (vec![ptr], Some(ptr)),
            RuntimeFn::Strcpy | RuntimeFn::Strcat => (vec![ptr, ptr], Some(ptr)),
            RuntimeFn::Strcmp => (vec![ptr, ptr], Some(I32)),
            // variadic, every call site imports its own signature
            RuntimeFn::Printf => (vec![ptr], Some(I32)),
            RuntimeFn::Puts => (vec![ptr], Some(I32)),
            RuntimeFn::Exit => (vec![I32], None),
            RuntimeFn::Panic => (vec![ptr], None),
        };
        sig.params.extend(params.into_iter().map(AbiParam::new));
        sig.returns.extend(ret.map(AbiParam::new));
        sig
    }
}

/// declares `name` as an imported function unless the module already knows it
pub fn declare_import(info: &mut Info, name: &str, sig: &Signature) -> Result<FuncId, TranslateError> {
    if let Some(FuncOrDataId::Func(id)) = info.module.get_name(name) {
        return Ok(id);
    }
    let id = info.module.declare_function(name, Linkage::Import, sig)?;
    debug!(name, "declared external function");
    info.record_function_name(id, name);
    info.record_import(name);
    Ok(id)
}

pub fn runtime_id(info: &mut Info, func: RuntimeFn) -> Result<FuncId, TranslateError> {
    if let Some(id) = info.runtime.get(&func) {
        return Ok(*id);
    }
    let sig = func.signature(info);
    let id = declare_import(info, func.symbol(), &sig)?;
    info.runtime.insert(func, id);
    Ok(id)
}

pub fn runtime_ref(cursor: &mut Cursor, info: &mut Info, func: RuntimeFn) -> Result<FuncRef, TranslateError> {
    let id = runtime_id(info, func)?;
    Ok(cursor.func_ref(&mut info.module, id))
}

/// calls a runtime helper and returns its result, if it has one
pub fn call_runtime(
    cursor: &mut Cursor,
    info: &mut Info,
    func: RuntimeFn,
    args: &[Value],
) -> Result<Option<Value>, TranslateError> {
    let func_ref = runtime_ref(cursor, info, func)?;
    let call = cursor.builder.ins().call(func_ref, args);
    Ok(cursor.builder.inst_results(call).first().copied())
}

/// a read-only, null-terminated copy of `text`, shared between identical literals
pub fn string_data(info: &mut Info, text: &str) -> Result<DataId, TranslateError> {
    if let Some(id) = info.strings.get(text) {
        return Ok(*id);
    }

    let name = format!(".str.{}", info.strings.len());
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);

    let mut desc = DataDescription::new();
    desc.define(bytes.clone().into_boxed_slice());
    let object = DataObject {
        name: name.clone(),
        size: bytes.len(),
        contents: Some(bytes),
        points_to: None,
        writable: false,
    };
    let id = info.define_data(&name, &desc, object, Linkage::Local)?;
    info.strings.insert(text.to_string(), id);
    Ok(id)
}

pub fn string_addr(cursor: &mut Cursor, info: &mut Info, text: &str) -> Result<Value, TranslateError> {
    let id = string_data(info, text)?;
    Ok(cursor.data_addr(&mut info.module, id))
}

/// calls the panic helper with `message` and terminates the block
pub fn emit_panic(cursor: &mut Cursor, info: &mut Info, message: Value) -> Result<(), TranslateError> {
    call_runtime(cursor, info, RuntimeFn::Panic, &[message])?;
    cursor.builder.ins().trap(PANIC_TRAP);
    Ok(())
}

/// `malloc(size)` with `size` given in bytes as a pointer-sized value
pub fn malloc(cursor: &mut Cursor, info: &mut Info, size: Value) -> Result<Value, TranslateError> {
    let ptr = call_runtime(cursor, info, RuntimeFn::Malloc, &[size])?;
    Ok(ptr.unwrap_or_else(|| cursor.builder.ins().iconst(ptr_width().to_clif(), 0)))
}
