use cranelift::{
    codegen::ir::Endianness,
    module::Module,
    prelude::{InstBuilder, Value, types},
};

use crate::compiler::{parser::node::Literal, tokens::DisplaySpan};

use super::{
    Info,
    cursor::Cursor,
    error::TranslateError,
    runtime::string_addr,
    types::{PrimitiveTypes, VType},
};

pub fn match_literal(literal: Literal, cursor: &mut Cursor, info: &mut Info) -> Result<(Option<Value>, VType), TranslateError> {
    let lowered = match literal {
        Literal::Int(n) => match i32::try_from(n) {
            Ok(small) => (cursor.builder.ins().iconst(types::I32, i64::from(small)), VType::INT),
            Err(_) => (
                cursor.builder.ins().iconst(types::I64, n),
                VType::Primitive(PrimitiveTypes::I64),
            ),
        },
        Literal::Float(f) => (cursor.builder.ins().f64const(f), VType::Primitive(PrimitiveTypes::F64)),
        Literal::Bool(b) => (cursor.builder.ins().iconst(types::I8, i64::from(b)), VType::BOOL),
        Literal::Char(c) => (cursor.builder.ins().iconst(types::I32, i64::from(u32::from(c))), VType::INT),
        Literal::Str(sym) => {
            let text = info.resolve(sym);
            (string_addr(cursor, info, text)?, VType::STR)
        }
    };
    Ok((Some(lowered.0), lowered.1))
}

/// the in-memory image of a numeric or boolean literal stored as `ty`, for global initialisers
pub fn constant_bytes(
    literal: Literal,
    negate: bool,
    ty: &VType,
    info: &Info,
    span: &DisplaySpan,
) -> Result<Vec<u8>, TranslateError> {
    let little = info.module.isa().endianness() == Endianness::Little;
    let mismatch = |found: &str| TranslateError::TypeMismatch {
        context: "global initializer".to_string(),
        expected: info.describe(ty),
        found: found.to_string(),
        span: span.clone(),
    };
    let prim = ty.primitive().ok_or_else(|| mismatch("a literal"))?;

    macro_rules! encode {
        ($v:expr) => {
            if little { ($v).to_le_bytes().to_vec() } else { ($v).to_be_bytes().to_vec() }
        };
    }

    let integer = match literal {
        Literal::Int(n) => Some(n),
        Literal::Char(c) => Some(i64::from(u32::from(c))),
        _ => None,
    };
    if let Some(n) = integer {
        if !(prim.is_int() || prim.is_float()) {
            return Err(mismatch("int"));
        }
        let n = if negate { n.wrapping_neg() } else { n };
        return Ok(match prim {
            PrimitiveTypes::I8 | PrimitiveTypes::U8 => encode!(n as i8),
            PrimitiveTypes::I16 | PrimitiveTypes::U16 => encode!(n as i16),
            PrimitiveTypes::I32 | PrimitiveTypes::U32 => encode!(n as i32),
            PrimitiveTypes::F32 => encode!(n as f32),
            PrimitiveTypes::F64 => encode!(n as f64),
            _ => encode!(n),
        });
    }

    match (literal, prim) {
        (Literal::Float(f), PrimitiveTypes::F32) => Ok(encode!((if negate { -f } else { f }) as f32)),
        (Literal::Float(f), PrimitiveTypes::F64) => Ok(encode!(if negate { -f } else { f })),
        (Literal::Float(_), _) => Err(mismatch("float64")),
        (Literal::Bool(b), PrimitiveTypes::Bool) if !negate => Ok(vec![u8::from(b)]),
        (Literal::Bool(_), _) => Err(mismatch("bool")),
        _ => Err(mismatch("string")),
    }
}
