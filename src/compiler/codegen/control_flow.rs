use cranelift::prelude::{InstBuilder, Value};
use generational_arena::Index;

use crate::compiler::parser::node::{ExprKind, NodeKind, StmtKind};

use super::{
    Info,
    block::{lower_stmt, lower_stmts, scoped},
    cast::{cast_value, expr_cast},
    cursor::Cursor,
    error::TranslateError,
    expr::{expr_to_val, expr_value},
    infer::arm_type,
    ptr_width,
    types::{PrimitiveTypes, VType},
};

/// `if cond { } else { }`. When both arms end in an expression of the same
/// type the `if` yields that value through a parameter of the end block.
pub fn expr_if(
    cond: Index,
    then_block: Index,
    else_block: Option<Index>,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let want = else_block.and_then(|else_block| {
        let then_type = arm_type(then_block, cursor, info)?;
        let else_type = arm_type(else_block, cursor, info)?;
        (then_type == else_type && !then_type.is_unit()).then_some(then_type)
    });

    let (cond_value, cond_type) = expr_value(cond, cursor, info)?;
    if cond_type != VType::BOOL {
        return Err(TranslateError::TypeMismatch {
            context: "if condition".to_string(),
            expected: "bool".to_string(),
            found: info.describe(&cond_type),
            span: info.span(cond),
        });
    }

    let n = info.next_label();
    let then_b = cursor.labeled_block(format!("if.then.{n}"));
    let else_b = else_block.map(|_| cursor.labeled_block(format!("if.else.{n}")));
    let end_b = cursor.labeled_block(format!("if.end.{n}"));
    if let Some(ty) = &want {
        cursor.builder.append_block_param(end_b, ty.to_clif(ptr_width()));
    }

    cursor.builder.ins().brif(cond_value, then_b, &[], else_b.unwrap_or(end_b), &[]);

    cursor.switch_to(then_b);
    let value = lower_arm(then_block, want.as_ref(), cursor, info)?;
    close_arm(value, end_b, node_idx, cursor, info)?;

    if let (Some(else_block), Some(else_b)) = (else_block, else_b) {
        cursor.switch_to(else_b);
        let value = lower_arm(else_block, want.as_ref(), cursor, info)?;
        close_arm(value, end_b, node_idx, cursor, info)?;
    }

    cursor.switch_to(end_b);
    Ok(match want {
        Some(ty) => (Some(cursor.builder.block_params(end_b)[0]), ty),
        None => (None, VType::UNIT),
    })
}

fn close_arm(
    value: Option<Value>,
    end_b: cranelift::prelude::Block,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &Info,
) -> Result<(), TranslateError> {
    if cursor.is_terminated() {
        return Ok(());
    }
    let has_param = !cursor.builder.block_params(end_b).is_empty();
    match (value, has_param) {
        (Some(value), true) => cursor.builder.ins().jump(end_b, &[value]),
        (_, false) => cursor.builder.ins().jump(end_b, &[]),
        (None, true) => {
            return Err(TranslateError::Invalid {
                what: "if expression".to_string(),
                reason: "an arm did not produce a value".to_string(),
                span: info.span(node_idx),
            });
        }
    };
    Ok(())
}

/// lowers one arm in its own scope and, when `want` is set, returns its trailing value
fn lower_arm(arm: Index, want: Option<&VType>, cursor: &mut Cursor, info: &mut Info) -> Result<Option<Value>, TranslateError> {
    match &info.node(arm).kind {
        NodeKind::Stmt(StmtKind::Block { stmts }) => scoped(cursor, info, |cursor, info| {
            let Some((last, init)) = stmts.split_last() else {
                return Ok(None);
            };
            lower_stmts(init, cursor, info);
            if cursor.is_terminated() {
                return Ok(None);
            }
            match (want, &info.node(*last).kind) {
                (Some(want), NodeKind::Stmt(StmtKind::Expr { expr })) => {
                    info.locate(cursor, info.node(*last).span);
                    Ok(Some(expr_cast(*expr, want, cursor, info)?))
                }
                _ => {
                    lower_stmt(*last, cursor, info)?;
                    Ok(None)
                }
            }
        }),
        NodeKind::Expr(ExprKind::If { .. }) => {
            let (value, ty) = expr_to_val(arm, cursor, info)?;
            match (value, want) {
                (Some(value), Some(want)) => Ok(Some(cast_value(value, &ty, want, cursor, info, &info.span(arm))?)),
                _ => Ok(None),
            }
        }
        _ => scoped(cursor, info, |cursor, info| lower_stmt(arm, cursor, info).map(|_| None)),
    }
}

/// `return [value]`, converting the value to the function's return type
pub fn lower_return(value: Option<Index>, node_idx: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    let ret_type = cursor.ret_type.clone();
    match value {
        Some(_) if ret_type.is_unit() => Err(TranslateError::TypeMismatch {
            context: "return".to_string(),
            expected: "no value".to_string(),
            found: "a value".to_string(),
            span: info.span(node_idx),
        }),
        Some(value) => {
            let value = expr_cast(value, &ret_type, cursor, info)?;
            cursor.builder.ins().return_(&[value]);
            Ok(())
        }
        None => {
            default_return(cursor);
            Ok(())
        }
    }
}

/// returns the zero value of the function's return type
pub fn default_return(cursor: &mut Cursor) {
    let ins = cursor.builder.ins();
    let zero = match &cursor.ret_type {
        VType::Primitive(PrimitiveTypes::Unit) => {
            ins.return_(&[]);
            return;
        }
        VType::Primitive(PrimitiveTypes::F32) => ins.f32const(0.0),
        VType::Primitive(PrimitiveTypes::F64) => ins.f64const(0.0),
        other => ins.iconst(other.to_clif(ptr_width()), 0),
    };
    cursor.builder.ins().return_(&[zero]);
}
