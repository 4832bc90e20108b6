use generational_arena::Index;

use crate::compiler::parser::node::{NodeKind, StmtKind};

use super::{
    Info,
    control_flow::lower_return,
    cursor::Cursor,
    error::TranslateError,
    exception::{lower_throw, lower_try},
    expr::expr_to_val,
    statement_name,
    switch::lower_switch,
    variable::lower_local_var,
    r#while::{lower_break, lower_continue, lower_fallthrough, lower_for, lower_while},
};

/// Lowers statements in order. A failing statement is reported and the next one
/// is lowered; once the current block ends in a terminator the rest is dead code.
pub fn lower_stmts(stmts: &[Index], cursor: &mut Cursor, info: &mut Info) {
    for stmt in stmts {
        if cursor.is_terminated() {
            break;
        }
        if let Err(e) = lower_stmt(*stmt, cursor, info) {
            info.report(e);
        }
    }
}

/// runs `f` inside a fresh scope, popping it on every exit path
pub fn scoped<T>(
    cursor: &mut Cursor,
    info: &mut Info,
    f: impl FnOnce(&mut Cursor, &mut Info) -> Result<T, TranslateError>,
) -> Result<T, TranslateError> {
    info.env.push();
    let result = f(cursor, info);
    info.env.pop();
    result
}

/// a `{ ... }` statement or any other statement used as a body
pub fn lower_block(idx: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    match &info.node(idx).kind {
        NodeKind::Stmt(StmtKind::Block { stmts }) => scoped(cursor, info, |cursor, info| {
            lower_stmts(stmts, cursor, info);
            Ok(())
        }),
        _ => scoped(cursor, info, |cursor, info| lower_stmt(idx, cursor, info)),
    }
}

pub fn lower_stmt(idx: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    let node = info.node(idx);
    info.locate(cursor, node.span);

    let NodeKind::Stmt(stmt) = &node.kind else {
        return Err(TranslateError::Invalid {
            what: "node".to_string(),
            reason: "expected a statement".to_string(),
            span: node.span.to_display(info.interner),
        });
    };

    match stmt {
        StmtKind::Expr { expr } => expr_to_val(*expr, cursor, info).map(|_| ()),
        StmtKind::Var { name, ty, value } => lower_local_var(*name, ty.as_ref(), *value, idx, cursor, info),
        StmtKind::Return { value } => lower_return(*value, idx, cursor, info),
        StmtKind::Block { .. } => lower_block(idx, cursor, info),
        StmtKind::While { cond, body } => lower_while(*cond, *body, cursor, info),
        StmtKind::For { init, cond, post, body } => lower_for(*init, *cond, *post, *body, cursor, info),
        StmtKind::Switch { tag, cases } => lower_switch(*tag, cases, idx, cursor, info),
        StmtKind::Break => lower_break(idx, cursor, info),
        StmtKind::Continue => lower_continue(idx, cursor, info),
        StmtKind::Fallthrough => lower_fallthrough(idx, cursor, info),
        StmtKind::TryCatch { body, catches, finally } => lower_try(*body, catches, *finally, cursor, info),
        StmtKind::Throw { value } => lower_throw(*value, idx, cursor, info),
        other @ (StmtKind::Function(_)
        | StmtKind::Class { .. }
        | StmtKind::Template { .. }
        | StmtKind::Package { .. }
        | StmtKind::Import { .. }) => Err(TranslateError::UnsupportedNode {
            what: format!("nested {}", statement_name(other)),
            span: node.span.to_display(info.interner),
        }),
    }
}
