use cranelift::{
    codegen::ir::condcodes::{FloatCC, IntCC},
    prelude::{InstBuilder, Value, types},
};
use generational_arena::Index;

use crate::{
    compiler::{parser::node::BinOpKind, tokens::DisplaySpan},
    is_float, is_int,
};

use super::{
    Info,
    cast::{cast_value, promote},
    cursor::Cursor,
    error::TranslateError,
    expr::expr_value,
    string::{concat, strings_equal},
    types::{PrimitiveTypes, VType},
};

pub fn expr_binop(
    op: BinOpKind,
    left: Index,
    right: Index,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    if matches!(op, BinOpKind::And | BinOpKind::Or) {
        return short_circuit(op, left, right, cursor, info);
    }

    let (left_value, left_type) = expr_value(left, cursor, info)?;
    let (right_value, right_type) = expr_value(right, cursor, info)?;
    let span = info.span(node_idx);

    let unsupported = |info: &Info, ty: &VType| TranslateError::UnsupportedOperator {
        op: op.symbol().to_string(),
        ty: info.describe(ty),
        span: span.clone(),
    };

    match (&left_type, &right_type) {
        (VType::Primitive(PrimitiveTypes::Str), VType::Primitive(PrimitiveTypes::Str)) => match op {
            BinOpKind::Add => Ok((Some(concat(left_value, right_value, cursor, info)?), VType::STR)),
            BinOpKind::Eq | BinOpKind::NotEq => {
                let eq = strings_equal(left_value, right_value, cursor, info)?;
                let value = if op == BinOpKind::Eq { eq } else { cursor.builder.ins().bxor_imm(eq, 1) };
                Ok((Some(value), VType::BOOL))
            }
            _ => Err(unsupported(info, &left_type)),
        },

        (VType::Primitive(PrimitiveTypes::Bool), VType::Primitive(PrimitiveTypes::Bool)) => match op {
            BinOpKind::Eq => Ok((Some(cursor.builder.ins().icmp(IntCC::Equal, left_value, right_value)), VType::BOOL)),
            BinOpKind::NotEq => Ok((
                Some(cursor.builder.ins().icmp(IntCC::NotEqual, left_value, right_value)),
                VType::BOOL,
            )),
            _ => Err(unsupported(info, &left_type)),
        },

        (VType::Primitive(l), VType::Primitive(r)) if (l.is_int() || l.is_float()) && (r.is_int() || r.is_float()) => {
            let Some(common) = promote(&left_type, &right_type) else {
                return Err(mismatch(info, &left_type, &right_type, &span));
            };
            let left_value = cast_value(left_value, &left_type, &common, cursor, info, &span)?;
            let right_value = cast_value(right_value, &right_type, &common, cursor, info, &span)?;
            numeric(op, left_value, right_value, &common, cursor, info, &span)
        }

        // reference types only compare by identity
        (
            VType::Class(_) | VType::Pointer(_) | VType::Slice(_) | VType::Array(..) | VType::Func(_),
            VType::Class(_) | VType::Pointer(_) | VType::Slice(_) | VType::Array(..) | VType::Func(_),
        ) if left_type == right_type => match op {
            BinOpKind::Eq => Ok((Some(cursor.builder.ins().icmp(IntCC::Equal, left_value, right_value)), VType::BOOL)),
            BinOpKind::NotEq => Ok((
                Some(cursor.builder.ins().icmp(IntCC::NotEqual, left_value, right_value)),
                VType::BOOL,
            )),
            _ => Err(unsupported(info, &left_type)),
        },

        _ => Err(mismatch(info, &left_type, &right_type, &span)),
    }
}

fn mismatch(info: &Info, left: &VType, right: &VType, span: &DisplaySpan) -> TranslateError {
    TranslateError::TypeMismatch {
        context: "binary operation".to_string(),
        expected: info.describe(left),
        found: info.describe(right),
        span: span.clone(),
    }
}

fn numeric(
    op: BinOpKind,
    l: Value,
    r: Value,
    ty: &VType,
    cursor: &mut Cursor,
    info: &Info,
    span: &DisplaySpan,
) -> Result<(Option<Value>, VType), TranslateError> {
    let ins = cursor.builder.ins();
    let (value, result_type) = match ty {
        VType::Primitive(is_float!()) => match op {
            BinOpKind::Add => (ins.fadd(l, r), ty.clone()),
            BinOpKind::Sub => (ins.fsub(l, r), ty.clone()),
            BinOpKind::Mul => (ins.fmul(l, r), ty.clone()),
            BinOpKind::Div => (ins.fdiv(l, r), ty.clone()),
            BinOpKind::Eq => (ins.fcmp(FloatCC::Equal, l, r), VType::BOOL),
            BinOpKind::NotEq => (ins.fcmp(FloatCC::NotEqual, l, r), VType::BOOL),
            BinOpKind::LessThan => (ins.fcmp(FloatCC::LessThan, l, r), VType::BOOL),
            BinOpKind::LessThanOrEq => (ins.fcmp(FloatCC::LessThanOrEqual, l, r), VType::BOOL),
            BinOpKind::GreaterThan => (ins.fcmp(FloatCC::GreaterThan, l, r), VType::BOOL),
            BinOpKind::GreaterThanOrEq => (ins.fcmp(FloatCC::GreaterThanOrEqual, l, r), VType::BOOL),
            BinOpKind::Mod | BinOpKind::And | BinOpKind::Or => {
                return Err(TranslateError::UnsupportedOperator {
                    op: op.symbol().to_string(),
                    ty: info.describe(ty),
                    span: span.clone(),
                });
            }
        },
        VType::Primitive(p @ is_int!()) => {
            let signed = p.is_signed();
            match op {
                BinOpKind::Add => (ins.iadd(l, r), ty.clone()),
                BinOpKind::Sub => (ins.isub(l, r), ty.clone()),
                BinOpKind::Mul => (ins.imul(l, r), ty.clone()),
                BinOpKind::Div if signed => (ins.sdiv(l, r), ty.clone()),
                BinOpKind::Div => (ins.udiv(l, r), ty.clone()),
                BinOpKind::Mod if signed => (ins.srem(l, r), ty.clone()),
                BinOpKind::Mod => (ins.urem(l, r), ty.clone()),
                // ordered comparisons are signed regardless of the operand type
                BinOpKind::Eq => (ins.icmp(IntCC::Equal, l, r), VType::BOOL),
                BinOpKind::NotEq => (ins.icmp(IntCC::NotEqual, l, r), VType::BOOL),
                BinOpKind::LessThan => (ins.icmp(IntCC::SignedLessThan, l, r), VType::BOOL),
                BinOpKind::LessThanOrEq => (ins.icmp(IntCC::SignedLessThanOrEqual, l, r), VType::BOOL),
                BinOpKind::GreaterThan => (ins.icmp(IntCC::SignedGreaterThan, l, r), VType::BOOL),
                BinOpKind::GreaterThanOrEq => (ins.icmp(IntCC::SignedGreaterThanOrEqual, l, r), VType::BOOL),
                BinOpKind::And | BinOpKind::Or => {
                    return Err(TranslateError::UnsupportedOperator {
                        op: op.symbol().to_string(),
                        ty: info.describe(ty),
                        span: span.clone(),
                    });
                }
            }
        }
        _ => {
            return Err(TranslateError::UnsupportedOperator {
                op: op.symbol().to_string(),
                ty: info.describe(ty),
                span: span.clone(),
            });
        }
    };
    Ok((Some(value), result_type))
}

/// `&&` and `||`: the right operand gets its own block, reachable only when
/// the left operand does not decide the result. The merge block takes the
/// result as a parameter.
fn short_circuit(
    op: BinOpKind,
    left: Index,
    right: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let (left_value, left_type) = expr_value(left, cursor, info)?;
    expect_bool(&left_type, op, left, info)?;

    let n = info.next_label();
    let prefix = if op == BinOpKind::And { "and" } else { "or" };
    let rhs_block = cursor.labeled_block(format!("{prefix}.rhs.{n}"));
    let end_block = cursor.labeled_block(format!("{prefix}.end.{n}"));
    cursor.builder.append_block_param(end_block, types::I8);

    match op {
        BinOpKind::And => cursor.builder.ins().brif(left_value, rhs_block, &[], end_block, &[left_value]),
        _ => cursor.builder.ins().brif(left_value, end_block, &[left_value], rhs_block, &[]),
    };

    cursor.switch_to(rhs_block);
    let (right_value, right_type) = expr_value(right, cursor, info)?;
    expect_bool(&right_type, op, right, info)?;
    cursor.jump_if_open(end_block, &[right_value]);

    cursor.switch_to(end_block);
    let merged = cursor.builder.block_params(end_block)[0];
    Ok((Some(merged), VType::BOOL))
}

fn expect_bool(ty: &VType, op: BinOpKind, operand: Index, info: &Info) -> Result<(), TranslateError> {
    if *ty == VType::BOOL {
        return Ok(());
    }
    Err(TranslateError::TypeMismatch {
        context: format!("operand of `{}`", op.symbol()),
        expected: "bool".to_string(),
        found: info.describe(ty),
        span: info.span(operand),
    })
}

/// equality used by tagged `switch` cases
pub fn compare_eq(
    left: Value,
    left_type: &VType,
    right: Value,
    right_type: &VType,
    cursor: &mut Cursor,
    info: &mut Info,
    span: &DisplaySpan,
) -> Result<Value, TranslateError> {
    if *left_type == VType::STR && *right_type == VType::STR {
        return strings_equal(left, right, cursor, info);
    }
    let common = match (left_type, right_type) {
        (VType::Primitive(l), VType::Primitive(r)) if (l.is_int() || l.is_float()) && (r.is_int() || r.is_float()) => {
            promote(left_type, right_type).ok_or_else(|| mismatch(info, left_type, right_type, span))?
        }
        _ if left_type == right_type => left_type.clone(),
        _ => return Err(mismatch(info, left_type, right_type, span)),
    };
    let left = cast_value(left, left_type, &common, cursor, info, span)?;
    let right = cast_value(right, right_type, &common, cursor, info, span)?;
    Ok(match common {
        VType::Primitive(is_float!()) => cursor.builder.ins().fcmp(FloatCC::Equal, left, right),
        _ => cursor.builder.ins().icmp(IntCC::Equal, left, right),
    })
}
