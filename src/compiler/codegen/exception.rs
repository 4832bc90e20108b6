use cranelift::{
    codegen::ir::StackSlot,
    prelude::{Block, InstBuilder},
};
use generational_arena::Index;
use tracing::debug;

use crate::compiler::parser::node::CatchClause;

use super::{
    Info,
    block::{lower_block, scoped},
    cursor::Cursor,
    env::Binding,
    error::TranslateError,
    expr::expr_value,
    runtime::{emit_panic, string_addr},
    types::VType,
};

pub const UNCAUGHT: &str = "uncaught exception";

#[derive(Debug, Clone)]
pub struct Handler {
    /// `None` catches everything
    pub ty: Option<VType>,
    pub block: Block,
    /// where the thrown value is stored for the handler's binding
    pub slot: Option<StackSlot>,
}

/// The handlers of one `try` statement, visible to `throw`s of the function that owns it.
#[derive(Debug, Clone)]
pub struct ExceptionFrame {
    pub owner: u32,
    pub handlers: Vec<Handler>,
}

/// the type a catch clause matches: `catch (e T)`, `catch (e)` as string, or everything
fn handler_type(clause: &CatchClause, info: &Info) -> Result<Option<VType>, TranslateError> {
    match (&clause.binding, &clause.ty) {
        (_, Some(ty)) => Ok(Some(info.resolve_type(ty, &clause.span.to_display(info.interner))?)),
        (Some(_), None) => Ok(Some(VType::STR)),
        (None, None) => Ok(None),
    }
}

fn lower_finally(finally: Option<Index>, end: Block, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    if cursor.is_terminated() {
        return Ok(());
    }
    if let Some(finally) = finally {
        lower_block(finally, cursor, info)?;
    }
    cursor.jump_if_open(end, &[]);
    Ok(())
}

pub fn lower_try(
    body: Index,
    catches: &[CatchClause],
    finally: Option<Index>,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(), TranslateError> {
    let n = info.next_label();

    let mut handlers = Vec::with_capacity(catches.len());
    for (i, clause) in catches.iter().enumerate() {
        let ty = handler_type(clause, info)?;
        let slot = match (&clause.binding, &ty) {
            (Some(_), Some(ty)) => Some(cursor.slot_for(ty)),
            _ => None,
        };
        let block = cursor.labeled_block(format!("try.catch.{n}.{i}"));
        handlers.push(Handler { ty, block, slot });
    }
    let end_b = cursor.labeled_block(format!("try.end.{n}"));

    info.exceptions.push(ExceptionFrame {
        owner: cursor.owner,
        handlers: handlers.clone(),
    });
    let result = lower_block(body, cursor, info);
    info.exceptions.pop();
    result?;
    lower_finally(finally, end_b, cursor, info)?;

    for (clause, handler) in catches.iter().zip(handlers) {
        cursor.switch_to(handler.block);
        scoped(cursor, info, |cursor, info| {
            if let (Some(binding), Some(slot), Some(ty)) = (clause.binding, handler.slot, handler.ty) {
                info.env.declare(
                    binding,
                    Binding::Local {
                        slot,
                        ty,
                        owner: cursor.owner,
                    },
                );
            }
            lower_block(clause.body, cursor, info)
        })?;
        lower_finally(finally, end_b, cursor, info)?;
    }

    cursor.switch_to(end_b);
    Ok(())
}

/// Jumps to the innermost matching handler of the current function, storing
/// the value for its binding. Without one the program panics.
pub fn lower_throw(value: Index, node_idx: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(), TranslateError> {
    let (thrown, ty) = expr_value(value, cursor, info)?;

    let handler = info
        .exceptions
        .iter()
        .rev()
        .filter(|frame| frame.owner == cursor.owner)
        .flat_map(|frame| frame.handlers.iter())
        .find(|h| h.ty.as_ref().is_none_or(|t| *t == ty))
        .cloned();

    match handler {
        Some(handler) => {
            if let Some(slot) = handler.slot {
                cursor.builder.ins().stack_store(thrown, slot, 0);
            }
            cursor.builder.ins().jump(handler.block, &[]);
        }
        None => {
            let message = if ty == VType::STR {
                thrown
            } else {
                string_addr(cursor, info, UNCAUGHT)?
            };
            debug!(line = info.node(node_idx).span.start.0, "throw without a handler");
            emit_panic(cursor, info, message)?;
        }
    }
    Ok(())
}
