use cranelift::prelude::{InstBuilder, Value};
use generational_arena::Index;

use crate::compiler::parser::node::CaseClause;

use super::{
    Info,
    binary_ops::compare_eq,
    block::{lower_stmts, scoped},
    cursor::{Cursor, JumpTargets},
    error::TranslateError,
    expr::expr_value,
    types::VType,
};

/// Lowers `switch`. Cases are tested in source order and the first match wins.
/// A case body leaves the switch unless it ends in `fallthrough`.
pub fn lower_switch(
    tag: Option<Index>,
    cases: &[CaseClause],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(), TranslateError> {
    if cases.iter().filter(|c| c.is_default).count() > 1 {
        return Err(TranslateError::Invalid {
            what: "switch".to_string(),
            reason: "multiple default cases".to_string(),
            span: info.span(node_idx),
        });
    }

    let tag = match tag {
        Some(tag) => Some(expr_value(tag, cursor, info)?),
        None => None,
    };

    let n = info.next_label();
    let end_b = cursor.labeled_block(format!("switch.end.{n}"));
    let bodies: Vec<_> = (0..cases.len())
        .map(|i| cursor.labeled_block(format!("switch.case.{i}.{n}")))
        .collect();

    // dispatch chain
    let mut default_body = None;
    for (i, case) in cases.iter().enumerate() {
        if case.is_default {
            default_body = Some(bodies[i]);
            continue;
        }
        let matched = case_condition(case, tag.as_ref(), cursor, info)?;
        let next = cursor.labeled_block(format!("switch.next.{i}.{n}"));
        cursor.builder.ins().brif(matched, bodies[i], &[], next, &[]);
        cursor.switch_to(next);
    }
    cursor.builder.ins().jump(default_body.unwrap_or(end_b), &[]);

    for (i, case) in cases.iter().enumerate() {
        cursor.switch_to(bodies[i]);
        let targets = JumpTargets {
            break_to: end_b,
            continue_to: None,
            fallthrough_to: bodies.get(i + 1).copied(),
        };
        cursor.targets.push(targets);
        let result = scoped(cursor, info, |cursor, info| {
            lower_stmts(&case.body, cursor, info);
            Ok(())
        });
        cursor.targets.pop();
        result?;
        cursor.jump_if_open(end_b, &[]);
    }

    cursor.switch_to(end_b);
    Ok(())
}

/// whether any of the case's values matches: equality with the tag, or the value itself without one
fn case_condition(
    case: &CaseClause,
    tag: Option<&(Value, VType)>,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<Value, TranslateError> {
    let mut matched: Option<Value> = None;
    for value in &case.values {
        let (v, ty) = expr_value(*value, cursor, info)?;
        let span = info.span(*value);
        let hit = match tag {
            Some((tag_value, tag_type)) => compare_eq(*tag_value, tag_type, v, &ty, cursor, info, &span)?,
            None if ty == VType::BOOL => v,
            None => {
                return Err(TranslateError::TypeMismatch {
                    context: "switch case".to_string(),
                    expected: "bool".to_string(),
                    found: info.describe(&ty),
                    span,
                });
            }
        };
        matched = Some(match matched {
            Some(acc) => cursor.builder.ins().bor(acc, hit),
            None => hit,
        });
    }
    matched.ok_or_else(|| TranslateError::Invalid {
        what: "case".to_string(),
        reason: "a case needs at least one value".to_string(),
        span: case.span.to_display(info.interner),
    })
}
