use std::cmp::Ordering;

use cranelift::prelude::{InstBuilder, IntCC, Value, types};
use generational_arena::Index;

use crate::{
    compiler::{codegen::ptr_width, tokens::DisplaySpan},
    is_float, is_int,
};

use super::{
    Info,
    cursor::Cursor,
    error::TranslateError,
    expr::expr_to_val,
    types::{PrimitiveTypes, VType},
};

/// the common type of a numeric binary operation: floats win over ints, wider ints over narrower
pub fn promote(left: &VType, right: &VType) -> Option<VType> {
    if left == right {
        return Some(left.clone());
    }
    let (VType::Primitive(l), VType::Primitive(r)) = (left, right) else {
        return None;
    };
    let width = |p: PrimitiveTypes| p.to_clif(ptr_width()).bits();
    match (l, r) {
        (is_float!(), is_float!()) => Some(VType::Primitive(if width(*l) >= width(*r) { *l } else { *r })),
        (is_float!(), is_int!()) => Some(left.clone()),
        (is_int!(), is_float!()) => Some(right.clone()),
        (is_int!(), is_int!()) => match width(*l).cmp(&width(*r)) {
            Ordering::Greater => Some(left.clone()),
            Ordering::Less => Some(right.clone()),
            // same width, mixed signedness: stay signed
            Ordering::Equal => Some(if l.is_signed() { left.clone() } else { right.clone() }),
        },
        _ => None,
    }
}

/// converts an already lowered value between types
pub fn cast_value(
    value: Value,
    from: &VType,
    to: &VType,
    cursor: &mut Cursor,
    info: &Info,
    span: &DisplaySpan,
) -> Result<Value, TranslateError> {
    if from == to {
        return Ok(value);
    }

    let target_clif = to.to_clif(ptr_width());
    let source_clif = from.to_clif(ptr_width());

    let result = match (from, to) {
        // int to int
        (VType::Primitive(from @ is_int!()), VType::Primitive(is_int!())) => match target_clif.bits().cmp(&source_clif.bits()) {
            Ordering::Less => cursor.builder.ins().ireduce(target_clif, value),
            Ordering::Greater => {
                if from.is_signed() {
                    cursor.builder.ins().sextend(target_clif, value)
                } else {
                    cursor.builder.ins().uextend(target_clif, value)
                }
            }
            Ordering::Equal => value,
        },

        // float to float
        (VType::Primitive(is_float!()), VType::Primitive(is_float!())) => {
            if target_clif.bits() < source_clif.bits() {
                cursor.builder.ins().fdemote(types::F32, value)
            } else {
                cursor.builder.ins().fpromote(types::F64, value)
            }
        }

        // int to float
        (VType::Primitive(from @ is_int!()), VType::Primitive(is_float!())) => {
            if from.is_signed() {
                cursor.builder.ins().fcvt_from_sint(target_clif, value)
            } else {
                cursor.builder.ins().fcvt_from_uint(target_clif, value)
            }
        }

        // float to int
        (VType::Primitive(is_float!()), VType::Primitive(to @ is_int!())) => {
            if to.is_signed() {
                cursor.builder.ins().fcvt_to_sint_sat(target_clif, value)
            } else {
                cursor.builder.ins().fcvt_to_uint_sat(target_clif, value)
            }
        }

        // bools widen as 0 / 1
        (VType::Primitive(PrimitiveTypes::Bool), VType::Primitive(is_int!())) => {
            if target_clif == types::I8 {
                value
            } else {
                cursor.builder.ins().uextend(target_clif, value)
            }
        }
        (VType::Primitive(is_int!()), VType::Primitive(PrimitiveTypes::Bool)) => {
            cursor.builder.ins().icmp_imm(IntCC::NotEqual, value, 0)
        }

        // a function literal assigned to a slot declared with the same shape
        (VType::Func(a), VType::Func(b)) if a.params == b.params && a.ret == b.ret => value,

        _ => {
            return Err(TranslateError::TypeMismatch {
                context: "conversion".to_string(),
                expected: info.describe(to),
                found: info.describe(from),
                span: span.clone(),
            });
        }
    };

    Ok(result)
}

/// lowers `expr` and converts the result to `target_type`
pub fn expr_cast(
    expr: Index,
    target_type: &VType,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<Value, TranslateError> {
    let (value, expr_type) = expr_to_val(expr, cursor, info)?;
    let span = info.span(expr);
    let Some(value) = value else {
        return Err(TranslateError::TypeMismatch {
            context: "expression".to_string(),
            expected: info.describe(target_type),
            found: info.describe(&expr_type),
            span,
        });
    };
    cast_value(value, &expr_type, target_type, cursor, info, &span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prim(p: PrimitiveTypes) -> VType {
        VType::Primitive(p)
    }

    #[test]
    fn float_wins_over_int() {
        assert_eq!(
            promote(&prim(PrimitiveTypes::I32), &prim(PrimitiveTypes::F64)),
            Some(prim(PrimitiveTypes::F64))
        );
        assert_eq!(
            promote(&prim(PrimitiveTypes::F32), &prim(PrimitiveTypes::I64)),
            Some(prim(PrimitiveTypes::F32))
        );
    }

    #[test]
    fn wider_int_wins() {
        assert_eq!(
            promote(&prim(PrimitiveTypes::I8), &prim(PrimitiveTypes::I64)),
            Some(prim(PrimitiveTypes::I64))
        );
        assert_eq!(
            promote(&prim(PrimitiveTypes::U32), &prim(PrimitiveTypes::I32)),
            Some(prim(PrimitiveTypes::I32))
        );
    }

    #[test]
    fn bools_and_strings_do_not_promote() {
        assert_eq!(promote(&VType::BOOL, &VType::INT), None);
        assert_eq!(promote(&VType::STR, &VType::INT), None);
        assert_eq!(promote(&VType::STR, &VType::STR), Some(VType::STR));
    }
}
