use cranelift::prelude::{InstBuilder, IntCC, Value};

use super::{
    Info,
    cursor::Cursor,
    error::TranslateError,
    runtime::{RuntimeFn, call_runtime, malloc},
};

fn returned(value: Option<Value>, func: RuntimeFn) -> Result<Value, TranslateError> {
    value.ok_or_else(|| TranslateError::Backend(format!("`{}` returned no value", func.symbol())))
}

/// length of a null-terminated string, as a pointer-sized value
pub fn strlen(s: Value, cursor: &mut Cursor, info: &mut Info) -> Result<Value, TranslateError> {
    returned(call_runtime(cursor, info, RuntimeFn::Strlen, &[s])?, RuntimeFn::Strlen)
}

/// `a + b`: a fresh heap buffer holding both strings
pub fn concat(a: Value, b: Value, cursor: &mut Cursor, info: &mut Info) -> Result<Value, TranslateError> {
    let len_a = strlen(a, cursor, info)?;
    let len_b = strlen(b, cursor, info)?;
    let total = cursor.builder.ins().iadd(len_a, len_b);
    let size = cursor.builder.ins().iadd_imm(total, 1);

    let buffer = malloc(cursor, info, size)?;
    call_runtime(cursor, info, RuntimeFn::Strcpy, &[buffer, a])?;
    call_runtime(cursor, info, RuntimeFn::Strcat, &[buffer, b])?;
    Ok(buffer)
}

/// `strcmp(a, b) == 0` as a bool
pub fn strings_equal(a: Value, b: Value, cursor: &mut Cursor, info: &mut Info) -> Result<Value, TranslateError> {
    let cmp = returned(call_runtime(cursor, info, RuntimeFn::Strcmp, &[a, b])?, RuntimeFn::Strcmp)?;
    Ok(cursor.builder.ins().icmp_imm(IntCC::Equal, cmp, 0))
}
