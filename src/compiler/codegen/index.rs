use cranelift::{
    module::Module,
    prelude::{InstBuilder, IntCC, MemFlags, Value, types},
};
use generational_arena::Index;

use crate::{
    compiler::tokens::DisplaySpan,
    is_int,
};

use super::{
    Info,
    cast::{cast_value, expr_cast},
    cursor::Cursor,
    error::TranslateError,
    expr::expr_value,
    ptr_width,
    runtime::{PANIC_TRAP, RuntimeFn, runtime_ref, string_addr},
    string::strlen,
    types::{PrimitiveTypes, VType},
};

pub const OUT_OF_RANGE: &str = "runtime error: index out of range";

/// Branches to a panic block when `idx < 0 || idx >= len`, and leaves the
/// cursor in the block where the access is safe. Both values are `i32`.
pub fn bounds_check(idx: Value, len: Value, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    // everything fallible happens before the branch
    let message = string_addr(cursor, info, OUT_OF_RANGE)?;
    let panic = runtime_ref(cursor, info, RuntimeFn::Panic)?;

    let negative = cursor.builder.ins().icmp_imm(IntCC::SignedLessThan, idx, 0);
    let past_end = cursor.builder.ins().icmp(IntCC::SignedGreaterThanOrEqual, idx, len);
    let bad = cursor.builder.ins().bor(negative, past_end);

    let n = info.next_label();
    let panic_block = cursor.labeled_block(format!("bounds.panic.{n}"));
    let ok_block = cursor.labeled_block(format!("bounds.ok.{n}"));
    cursor.builder.ins().brif(bad, panic_block, &[], ok_block, &[]);

    cursor.switch_to(panic_block);
    cursor.builder.ins().call(panic, &[message]);
    cursor.builder.ins().trap(PANIC_TRAP);

    cursor.switch_to(ok_block);
    Ok(())
}

/// address of element `idx` of `base`, bounds-checked unless `base` is a raw pointer
pub fn element_addr(
    base: Value,
    base_type: &VType,
    idx: Value,
    idx_type: &VType,
    cursor: &mut Cursor,
    info: &mut Info,
    span: &DisplaySpan,
) -> Result<(Value, VType), TranslateError> {
    if !matches!(idx_type, VType::Primitive(is_int!())) {
        return Err(TranslateError::TypeMismatch {
            context: "index".to_string(),
            expected: "an integer".to_string(),
            found: info.describe(idx_type),
            span: span.clone(),
        });
    }
    let idx = cast_value(idx, idx_type, &VType::INT, cursor, info, span)?;
    let ptr = ptr_width().to_clif();

    let (data, elem) = match base_type {
        VType::Array(elem, n) => {
            let len = cursor.builder.ins().iconst(types::I32, i64::from(*n));
            bounds_check(idx, len, cursor, info)?;
            (base, (**elem).clone())
        }
        VType::Slice(elem) => {
            let len = cursor
                .builder
                .ins()
                .load(types::I32, MemFlags::trusted(), base, ptr_width().bytes() as i32);
            bounds_check(idx, len, cursor, info)?;
            let data = cursor.builder.ins().load(ptr, MemFlags::trusted(), base, 0);
            (data, (**elem).clone())
        }
        VType::Primitive(PrimitiveTypes::Str) => {
            let len = strlen(base, cursor, info)?;
            let len = if ptr == types::I32 { len } else { cursor.builder.ins().ireduce(types::I32, len) };
            bounds_check(idx, len, cursor, info)?;
            (base, VType::Primitive(PrimitiveTypes::U8))
        }
        VType::Pointer(elem) => (base, (**elem).clone()),
        _ => {
            return Err(TranslateError::UnsupportedOperator {
                op: "[]".to_string(),
                ty: info.describe(base_type),
                span: span.clone(),
            });
        }
    };

    let wide = if ptr == types::I32 { idx } else { cursor.builder.ins().sextend(ptr, idx) };
    let offset = cursor.builder.ins().imul_imm(wide, i64::from(elem.size()));
    Ok((cursor.builder.ins().iadd(data, offset), elem))
}

/// `target[index]`
pub fn expr_index(
    target: Index,
    index: Index,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let (base, base_type) = expr_value(target, cursor, info)?;
    let (idx, idx_type) = expr_value(index, cursor, info)?;
    let span = info.span(node_idx);

    let (addr, elem) = element_addr(base, &base_type, idx, &idx_type, cursor, info, &span)?;
    let value = cursor
        .builder
        .ins()
        .load(elem.to_clif(ptr_width()), MemFlags::trusted(), addr, 0);
    Ok((Some(value), elem))
}

/// `target[index] = value`
pub fn store_index(
    target: Index,
    index: Index,
    value: Index,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(), TranslateError> {
    let (base, base_type) = expr_value(target, cursor, info)?;
    if base_type == VType::STR {
        return Err(TranslateError::Invalid {
            what: "assignment".to_string(),
            reason: "strings cannot be modified in place".to_string(),
            span: info.span(node_idx),
        });
    }
    let (idx, idx_type) = expr_value(index, cursor, info)?;
    let span = info.span(node_idx);

    let (addr, elem) = element_addr(base, &base_type, idx, &idx_type, cursor, info, &span)?;
    let value = expr_cast(value, &elem, cursor, info)?;
    cursor.builder.ins().store(MemFlags::trusted(), value, addr, 0);
    Ok(())
}

/// zero-filled stack storage for `n` elements, returning its address
pub fn zeroed_array(elem: &VType, n: u32, cursor: &mut Cursor, info: &Info) -> Value {
    let size = elem.size() * n;
    let slot = cursor.stack_slot(size, elem.size());
    let addr = cursor.builder.ins().stack_addr(ptr_width().to_clif(), slot, 0);
    cursor
        .builder
        .emit_small_memset(info.module.target_config(), addr, 0, u64::from(size), 1, MemFlags::trusted());
    addr
}

/// `[a, b, c]`: stack storage holding the elements, all of the same type
pub fn expr_array_literal(
    elements: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    if elements.is_empty() {
        let null = cursor.builder.ins().iconst(ptr_width().to_clif(), 0);
        return Ok((Some(null), VType::Array(Box::new(VType::INT), 0)));
    }

    let mut values = Vec::with_capacity(elements.len());
    let mut elem_type: Option<VType> = None;
    for element in elements {
        let (value, ty) = expr_value(*element, cursor, info)?;
        match &elem_type {
            None => elem_type = Some(ty),
            Some(expected) if *expected != ty => {
                return Err(TranslateError::TypeMismatch {
                    context: "array literal".to_string(),
                    expected: info.describe(expected),
                    found: info.describe(&ty),
                    span: info.span(*element),
                });
            }
            Some(_) => {}
        }
        values.push(value);
    }
    let Some(elem) = elem_type else {
        return Err(TranslateError::Invalid {
            what: "array literal".to_string(),
            reason: "no elements".to_string(),
            span: info.span(node_idx),
        });
    };

    let size = elem.size();
    let slot = cursor.stack_slot(size * values.len() as u32, size);
    for (i, value) in values.iter().enumerate() {
        cursor.builder.ins().stack_store(*value, slot, (i as u32 * size) as i32);
    }
    let addr = cursor.builder.ins().stack_addr(ptr_width().to_clif(), slot, 0);
    Ok((Some(addr), VType::Array(Box::new(elem), values.len() as u32)))
}
