use cranelift::prelude::{Block, InstBuilder};
use generational_arena::Index;

use super::{
    Info,
    block::{lower_block, lower_stmt, scoped},
    cursor::{Cursor, JumpTargets},
    error::TranslateError,
    expr::expr_value,
    types::VType,
};

/// lowers `body` with `targets` on the jump-target stack, popping it on every exit path
pub fn with_targets(targets: JumpTargets, body: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    cursor.targets.push(targets);
    let result = lower_block(body, cursor, info);
    cursor.targets.pop();
    result
}

/// evaluates a loop condition and branches on it
fn branch_on(cond: Index, body: Block, exit: Block, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    let (value, ty) = expr_value(cond, cursor, info)?;
    if ty != VType::BOOL {
        return Err(TranslateError::TypeMismatch {
            context: "loop condition".to_string(),
            expected: "bool".to_string(),
            found: info.describe(&ty),
            span: info.span(cond),
        });
    }
    cursor.builder.ins().brif(value, body, &[], exit, &[]);
    Ok(())
}

pub fn lower_while(cond: Index, body: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    let n = info.next_label();
    let cond_b = cursor.labeled_block(format!("while.cond.{n}"));
    let body_b = cursor.labeled_block(format!("while.body.{n}"));
    let end_b = cursor.labeled_block(format!("while.end.{n}"));

    cursor.builder.ins().jump(cond_b, &[]);
    cursor.switch_to(cond_b);
    branch_on(cond, body_b, end_b, cursor, info)?;

    cursor.switch_to(body_b);
    let targets = JumpTargets {
        break_to: end_b,
        continue_to: Some(cond_b),
        fallthrough_to: None,
    };
    with_targets(targets, body, cursor, info)?;
    cursor.jump_if_open(cond_b, &[]);

    cursor.switch_to(end_b);
    Ok(())
}

/// `for init; cond; post { body }`. The header gets its own scope.
pub fn lower_for(
    init: Option<Index>,
    cond: Option<Index>,
    post: Option<Index>,
    body: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(), TranslateError> {
    scoped(cursor, info, |cursor, info| {
        let n = info.next_label();
        let init_b = cursor.labeled_block(format!("for.init.{n}"));
        let cond_b = cursor.labeled_block(format!("for.cond.{n}"));
        let body_b = cursor.labeled_block(format!("for.body.{n}"));
        let post_b = cursor.labeled_block(format!("for.post.{n}"));
        let end_b = cursor.labeled_block(format!("for.end.{n}"));

        cursor.builder.ins().jump(init_b, &[]);
        cursor.switch_to(init_b);
        if let Some(init) = init {
            lower_stmt(init, cursor, info)?;
        }
        cursor.builder.ins().jump(cond_b, &[]);

        cursor.switch_to(cond_b);
        match cond {
            Some(cond) => branch_on(cond, body_b, end_b, cursor, info)?,
            None => {
                cursor.builder.ins().jump(body_b, &[]);
            }
        }

        cursor.switch_to(body_b);
        let targets = JumpTargets {
            break_to: end_b,
            continue_to: Some(post_b),
            fallthrough_to: None,
        };
        with_targets(targets, body, cursor, info)?;
        cursor.jump_if_open(post_b, &[]);

        cursor.switch_to(post_b);
        if let Some(post) = post {
            lower_stmt(post, cursor, info)?;
        }
        cursor.builder.ins().jump(cond_b, &[]);

        cursor.switch_to(end_b);
        Ok(())
    })
}

pub fn lower_break(node_idx: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    let Some(targets) = cursor.targets.last() else {
        return Err(TranslateError::MissingContext {
            what: "break".to_string(),
            context: "a loop or switch".to_string(),
            span: info.span(node_idx),
        });
    };
    let break_to = targets.break_to;
    cursor.builder.ins().jump(break_to, &[]);
    Ok(())
}

pub fn lower_continue(node_idx: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    // a switch inside a loop continues the loop
    let Some(continue_to) = cursor.targets.iter().rev().find_map(|t| t.continue_to) else {
        return Err(TranslateError::MissingContext {
            what: "continue".to_string(),
            context: "a loop".to_string(),
            span: info.span(node_idx),
        });
    };
    cursor.builder.ins().jump(continue_to, &[]);
    Ok(())
}

pub fn lower_fallthrough(node_idx: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    let Some(next) = cursor.targets.last().and_then(|t| t.fallthrough_to) else {
        return Err(TranslateError::MissingContext {
            what: "fallthrough".to_string(),
            context: "a switch case followed by another case".to_string(),
            span: info.span(node_idx),
        });
    };
    cursor.builder.ins().jump(next, &[]);
    Ok(())
}
