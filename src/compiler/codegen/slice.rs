use cranelift::prelude::{InstBuilder, IntCC, MemFlags, Value, types};
use generational_arena::Index;

use crate::compiler::parser::node::{ExprKind, NodeKind, TypeExpr};

use super::{
    Info,
    cast::expr_cast,
    cursor::Cursor,
    error::TranslateError,
    expr::expr_value,
    ptr_width,
    runtime::{RuntimeFn, malloc, runtime_ref},
    string::strlen,
    types::{PrimitiveTypes, VType},
};

// header layout: {data: ptr @0, len: i32 @ptr_bytes, cap: i32 @ptr_bytes + 4}
fn len_offset() -> i32 {
    ptr_width().bytes() as i32
}

fn cap_offset() -> i32 {
    len_offset() + 4
}

/// mallocs a `{data, len, cap}` header and fills it in
pub fn new_header(data: Value, len: Value, cap: Value, cursor: &mut Cursor, info: &mut Info) -> Result<Value, TranslateError> {
    let size = cursor
        .builder
        .ins()
        .iconst(ptr_width().to_clif(), i64::from(ptr_width().bytes() + 8));
    let header = malloc(cursor, info, size)?;
    let flags = MemFlags::trusted();
    cursor.builder.ins().store(flags, data, header, 0);
    cursor.builder.ins().store(flags, len, header, len_offset());
    cursor.builder.ins().store(flags, cap, header, cap_offset());
    Ok(header)
}

/// an `i32` element count as a pointer-sized byte count
fn byte_count(count: Value, elem: &VType, cursor: &mut Cursor) -> Value {
    let ptr = ptr_width().to_clif();
    let wide = if ptr == types::I32 { count } else { cursor.builder.ins().sextend(ptr, count) };
    cursor.builder.ins().imul_imm(wide, i64::from(elem.size()))
}

fn expect_arity(name: &str, args: &[Index], allowed: &[usize], expected: &str, node_idx: Index, info: &Info) -> Result<(), TranslateError> {
    if allowed.contains(&args.len()) {
        return Ok(());
    }
    Err(TranslateError::ArityMismatch {
        name: name.to_string(),
        expected: expected.to_string(),
        got: args.len(),
        span: info.span(node_idx),
    })
}

pub fn builtin_len(
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    expect_arity("len", args, &[1], "1", node_idx, info)?;
    let (value, ty) = expr_value(args[0], cursor, info)?;
    let len = match &ty {
        VType::Array(_, n) => cursor.builder.ins().iconst(types::I32, i64::from(*n)),
        VType::Slice(_) => cursor
            .builder
            .ins()
            .load(types::I32, MemFlags::trusted(), value, len_offset()),
        VType::Primitive(PrimitiveTypes::Str) => {
            let len = strlen(value, cursor, info)?;
            if ptr_width().to_clif() == types::I32 {
                len
            } else {
                cursor.builder.ins().ireduce(types::I32, len)
            }
        }
        _ => {
            return Err(TranslateError::UnsupportedOperator {
                op: "len".to_string(),
                ty: info.describe(&ty),
                span: info.span(args[0]),
            });
        }
    };
    Ok((Some(len), VType::INT))
}

pub fn builtin_cap(
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    expect_arity("cap", args, &[1], "1", node_idx, info)?;
    let (value, ty) = expr_value(args[0], cursor, info)?;
    let cap = match &ty {
        VType::Array(_, n) => cursor.builder.ins().iconst(types::I32, i64::from(*n)),
        VType::Slice(_) => cursor
            .builder
            .ins()
            .load(types::I32, MemFlags::trusted(), value, cap_offset()),
        _ => {
            return Err(TranslateError::UnsupportedOperator {
                op: "cap".to_string(),
                ty: info.describe(&ty),
                span: info.span(args[0]),
            });
        }
    };
    Ok((Some(cap), VType::INT))
}

/// `make([]T, len[, cap])`
pub fn builtin_make(
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    expect_arity("make", args, &[2, 3], "2 or 3", node_idx, info)?;

    let type_node = info.node(args[0]);
    let NodeKind::Expr(ExprKind::Type(ty @ TypeExpr::Slice(_))) = &type_node.kind else {
        return Err(TranslateError::TypeMismatch {
            context: "first argument of `make`".to_string(),
            expected: "a slice type such as `[]int`".to_string(),
            found: "an expression".to_string(),
            span: info.span(args[0]),
        });
    };
    let slice_type = info.resolve_type(ty, &info.span(args[0]))?;
    let VType::Slice(elem) = &slice_type else {
        return Err(TranslateError::Invalid {
            what: "make".to_string(),
            reason: "expected a slice type".to_string(),
            span: info.span(args[0]),
        });
    };

    let len = expr_cast(args[1], &VType::INT, cursor, info)?;
    let cap = match args.get(2) {
        Some(cap) => expr_cast(*cap, &VType::INT, cursor, info)?,
        None => len,
    };

    let bytes = byte_count(cap, elem, cursor);
    let data = malloc(cursor, info, bytes)?;
    let header = new_header(data, len, cap, cursor, info)?;
    Ok((Some(header), slice_type))
}

/// `append(s, v...)`: grows the backing storage with `realloc` when full,
/// writes the values after the current length and returns the same header
pub fn builtin_append(
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(TranslateError::ArityMismatch {
            name: "append".to_string(),
            expected: "at least 1".to_string(),
            got: 0,
            span: info.span(node_idx),
        });
    };

    let (header, slice_type) = expr_value(*first, cursor, info)?;
    let VType::Slice(elem) = &slice_type else {
        return Err(TranslateError::TypeMismatch {
            context: "first argument of `append`".to_string(),
            expected: "a slice".to_string(),
            found: info.describe(&slice_type),
            span: info.span(*first),
        });
    };
    let elem = (**elem).clone();

    let values = rest
        .iter()
        .map(|arg| expr_cast(*arg, &elem, cursor, info))
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Ok((Some(header), slice_type));
    }
    let realloc = runtime_ref(cursor, info, RuntimeFn::Realloc)?;

    let ptr = ptr_width().to_clif();
    let flags = MemFlags::trusted();
    let len = cursor.builder.ins().load(types::I32, flags, header, len_offset());
    let cap = cursor.builder.ins().load(types::I32, flags, header, cap_offset());
    let new_len = cursor.builder.ins().iadd_imm(len, values.len() as i64);
    let full = cursor.builder.ins().icmp(IntCC::SignedGreaterThan, new_len, cap);

    let n = info.next_label();
    let grow_block = cursor.labeled_block(format!("append.grow.{n}"));
    let store_block = cursor.labeled_block(format!("append.store.{n}"));
    cursor.builder.ins().brif(full, grow_block, &[], store_block, &[]);

    cursor.switch_to(grow_block);
    let doubled = cursor.builder.ins().imul_imm(cap, 2);
    let new_cap = cursor.builder.ins().smax(new_len, doubled);
    let bytes = byte_count(new_cap, &elem, cursor);
    let old_data = cursor.builder.ins().load(ptr, flags, header, 0);
    let call = cursor.builder.ins().call(realloc, &[old_data, bytes]);
    let new_data = cursor.builder.inst_results(call)[0];
    cursor.builder.ins().store(flags, new_data, header, 0);
    cursor.builder.ins().store(flags, new_cap, header, cap_offset());
    cursor.builder.ins().jump(store_block, &[]);

    cursor.switch_to(store_block);
    let data = cursor.builder.ins().load(ptr, flags, header, 0);
    for (i, value) in values.into_iter().enumerate() {
        let position = cursor.builder.ins().iadd_imm(len, i as i64);
        let offset = byte_count(position, &elem, cursor);
        let addr = cursor.builder.ins().iadd(data, offset);
        cursor.builder.ins().store(flags, value, addr, 0);
    }
    cursor.builder.ins().store(flags, new_len, header, len_offset());
    Ok((Some(header), slice_type))
}
