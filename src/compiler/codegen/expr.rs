use cranelift::prelude::Value;
use generational_arena::Index;

use crate::compiler::parser::node::{ExprKind, NodeKind};

use super::{
    Info,
    binary_ops::expr_binop,
    class::{expr_member, expr_new, expr_this},
    control_flow::expr_if,
    cursor::Cursor,
    error::TranslateError,
    function::expr_func_literal,
    function_call::expr_call,
    index::{expr_array_literal, expr_index},
    literal::match_literal,
    types::VType,
    unary_ops::{expr_postfix, expr_unaryop},
    variable::{expr_assign, expr_declare, expr_identifier},
};

/// Lowers an expression. The value is `None` for expressions that produce nothing (type `unit`).
pub fn expr_to_val(node: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(Option<Value>, VType), TranslateError> {
    let node_idx = node;
    let node = info.node(node);
    info.locate(cursor, node.span);

    let NodeKind::Expr(kind) = &node.kind else {
        return Err(TranslateError::Invalid {
            what: "node".to_string(),
            reason: "expected an expression".to_string(),
            span: node.span.to_display(info.interner),
        });
    };

    match kind {
        ExprKind::Literal(literal) => match_literal(*literal, cursor, info),
        ExprKind::Identifier(sym) => expr_identifier(*sym, node_idx, cursor, info),
        ExprKind::This => expr_this(node_idx, cursor, info),
        ExprKind::Unary { op, operand } => expr_unaryop(*op, *operand, node_idx, cursor, info),
        ExprKind::BinOp { op, left, right } => expr_binop(*op, *left, *right, node_idx, cursor, info),
        ExprKind::Postfix { op, operand } => expr_postfix(*op, *operand, node_idx, cursor, info),
        ExprKind::Assign { target, value } => expr_assign(*target, *value, cursor, info),
        ExprKind::Declare { target, value } => expr_declare(*target, *value, cursor, info),
        ExprKind::Call { callee, args } => expr_call(*callee, args, node_idx, cursor, info),
        ExprKind::Member { object, member } => expr_member(*object, *member, node_idx, cursor, info),
        ExprKind::Index { target, index } => expr_index(*target, *index, node_idx, cursor, info),
        ExprKind::FuncLit {
            params,
            return_type,
            body,
        } => expr_func_literal(params, return_type.as_ref(), *body, node_idx, cursor, info),
        ExprKind::If {
            cond,
            then_block,
            else_block,
        } => expr_if(*cond, *then_block, *else_block, node_idx, cursor, info),
        ExprKind::ArrayLit { elements } => expr_array_literal(elements, node_idx, cursor, info),
        ExprKind::New { class, args } => expr_new(*class, args, node_idx, cursor, info),
        ExprKind::Type(_) => Err(TranslateError::Invalid {
            what: "expression".to_string(),
            reason: "a type cannot be used as a value".to_string(),
            span: node.span.to_display(info.interner),
        }),
    }
}

/// lowers an expression that must produce a value
pub fn expr_value(node: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(Value, VType), TranslateError> {
    match expr_to_val(node, cursor, info)? {
        (Some(value), ty) => Ok((value, ty)),
        (None, ty) => Err(TranslateError::TypeMismatch {
            context: "expression".to_string(),
            expected: "a value".to_string(),
            found: info.describe(&ty),
            span: info.span(node),
        }),
    }
}
