use cranelift::prelude::{InstBuilder, MemFlags, Value};
use generational_arena::Index;

use crate::{
    compiler::parser::node::{ExprKind, NodeKind, PostfixOpKind, UnaryOpKind},
    is_float, is_int,
};

use super::{
    Info,
    cursor::Cursor,
    env::Binding,
    error::TranslateError,
    expr::expr_value,
    types::{PrimitiveTypes, VType},
    variable::unresolved,
};

pub fn expr_unaryop(
    op: UnaryOpKind,
    operand: Index,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let (item, item_type) = expr_value(operand, cursor, info)?;
    let value = match (op, &item_type) {
        (UnaryOpKind::Neg, VType::Primitive(p @ is_int!())) => {
            let zero = cursor.builder.ins().iconst(p.to_clif(super::ptr_width()), 0);
            cursor.builder.ins().isub(zero, item)
        }
        (UnaryOpKind::Neg, VType::Primitive(is_float!())) => cursor.builder.ins().fneg(item),
        (UnaryOpKind::Not, VType::Primitive(PrimitiveTypes::Bool)) => cursor.builder.ins().bxor_imm(item, 1),
        _ => {
            return Err(TranslateError::UnsupportedOperator {
                op: match op {
                    UnaryOpKind::Neg => "-",
                    UnaryOpKind::Not => "!",
                }
                .to_string(),
                ty: info.describe(&item_type),
                span: info.span(node_idx),
            });
        }
    };
    Ok((Some(value), item_type))
}

/// `x++` / `x--`: stores the updated value and yields the old one
pub fn expr_postfix(
    op: PostfixOpKind,
    operand: Index,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let op_symbol = match op {
        PostfixOpKind::Inc => "++",
        PostfixOpKind::Dec => "--",
    };
    let NodeKind::Expr(ExprKind::Identifier(sym)) = info.node(operand).kind else {
        return Err(TranslateError::Invalid {
            what: format!("operand of `{op_symbol}`"),
            reason: "expected a variable".to_string(),
            span: info.span(operand),
        });
    };

    let delta = match op {
        PostfixOpKind::Inc => 1,
        PostfixOpKind::Dec => -1,
    };

    match info.env.lookup(sym).cloned() {
        Some(Binding::Local { slot, ty, owner }) if owner == cursor.owner => {
            let VType::Primitive(is_int!()) = ty else {
                return Err(unsupported_postfix(op_symbol, &ty, node_idx, info));
            };
            let old = cursor.builder.ins().stack_load(ty.to_clif(super::ptr_width()), slot, 0);
            let new = cursor.builder.ins().iadd_imm(old, delta);
            cursor.builder.ins().stack_store(new, slot, 0);
            Ok((Some(old), ty))
        }
        Some(Binding::Global { data, ty }) => {
            let VType::Primitive(is_int!()) = ty else {
                return Err(unsupported_postfix(op_symbol, &ty, node_idx, info));
            };
            let addr = cursor.data_addr(&mut info.module, data);
            let clif = ty.to_clif(super::ptr_width());
            let old = cursor.builder.ins().load(clif, MemFlags::trusted(), addr, 0);
            let new = cursor.builder.ins().iadd_imm(old, delta);
            cursor.builder.ins().store(MemFlags::trusted(), new, addr, 0);
            Ok((Some(old), ty))
        }
        Some(Binding::Function { .. }) => Err(TranslateError::Invalid {
            what: format!("operand of `{op_symbol}`"),
            reason: "a function cannot be modified".to_string(),
            span: info.span(operand),
        }),
        other => Err(unresolved(sym, other.as_ref(), operand, info)),
    }
}

fn unsupported_postfix(op: &str, ty: &VType, node_idx: Index, info: &Info) -> TranslateError {
    TranslateError::UnsupportedOperator {
        op: op.to_string(),
        ty: info.describe(ty),
        span: info.span(node_idx),
    }
}
