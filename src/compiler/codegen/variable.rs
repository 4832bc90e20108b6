use cranelift::{
    codegen::ir::StackSlot,
    module::{DataDescription, Linkage, Module},
    prelude::{InstBuilder, MemFlags, Value},
};
use generational_arena::Index;
use string_interner::symbol::SymbolUsize;

use crate::compiler::{
    parser::node::{ExprKind, Literal, Node, NodeKind, TypeExpr, UnaryOpKind},
    tokens::DisplaySpan,
};

use super::{
    DataObject, Info,
    cast::expr_cast,
    class::store_member,
    cursor::Cursor,
    env::Binding,
    error::TranslateError,
    expr::expr_value,
    index::{store_index, zeroed_array},
    literal::constant_bytes,
    ptr_width,
    runtime::{string_addr, string_data},
    slice::new_header,
    types::{PrimitiveTypes, VType},
};

/// the error for a name that has no usable binding from the current function
pub fn unresolved(sym: SymbolUsize, binding: Option<&Binding>, node_idx: Index, info: &Info) -> TranslateError {
    if let Some(Binding::Poisoned) = binding {
        return TranslateError::Poisoned {
            name: info.resolve(sym).to_string(),
            span: info.span(node_idx),
        };
    }
    let note = match binding {
        Some(Binding::Local { .. }) => Some("function literals cannot capture variables of the enclosing function".to_string()),
        _ => None,
    };
    TranslateError::UnresolvedIdentifier {
        name: info.resolve(sym).to_string(),
        note,
        span: info.span(node_idx),
    }
}

pub fn expr_identifier(
    sym: SymbolUsize,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    match info.env.lookup(sym).cloned() {
        Some(Binding::Local { slot, ty, owner }) if owner == cursor.owner => {
            let value = cursor.builder.ins().stack_load(ty.to_clif(ptr_width()), slot, 0);
            Ok((Some(value), ty))
        }
        Some(Binding::Global { data, ty }) => {
            let addr = cursor.data_addr(&mut info.module, data);
            let value = cursor.builder.ins().load(ty.to_clif(ptr_width()), MemFlags::trusted(), addr, 0);
            Ok((Some(value), ty))
        }
        Some(Binding::Function { id, sig }) => {
            let func_ref = cursor.func_ref(&mut info.module, id);
            let value = cursor.builder.ins().func_addr(ptr_width().to_clif(), func_ref);
            Ok((Some(value), VType::Func(Box::new(sig))))
        }
        None if info.declared.contains_key(&sym) => {
            let (id, sig) = info.declared[&sym].clone();
            let func_ref = cursor.func_ref(&mut info.module, id);
            let value = cursor.builder.ins().func_addr(ptr_width().to_clif(), func_ref);
            Ok((Some(value), VType::Func(Box::new(sig))))
        }
        other => Err(unresolved(sym, other.as_ref(), node_idx, info)),
    }
}

/// allocates a slot in the current function, stores `value` and binds `name` in the innermost scope
pub fn bind_local(name: SymbolUsize, value: Value, ty: VType, cursor: &mut Cursor, info: &mut Info) -> StackSlot {
    let slot = cursor.slot_for(&ty);
    cursor.builder.ins().stack_store(value, slot, 0);
    info.env.declare(
        name,
        Binding::Local {
            slot,
            ty,
            owner: cursor.owner,
        },
    );
    slot
}

/// Binds `name` as poisoned when its declaration failed, so later uses stay quiet.
fn poison_on_error<T>(name: SymbolUsize, result: Result<T, TranslateError>, info: &mut Info) -> Result<T, TranslateError> {
    if result.is_err() {
        info.env.declare(name, Binding::Poisoned);
    }
    result
}

fn check_redeclared(name: SymbolUsize, node_idx: Index, info: &Info) -> Result<(), TranslateError> {
    if info.env.bound_in_current(name) {
        return Err(TranslateError::Redeclared {
            name: info.resolve(name).to_string(),
            span: info.span(node_idx),
        });
    }
    Ok(())
}

/// `name := value`
pub fn expr_declare(
    target: Index,
    value: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let NodeKind::Expr(ExprKind::Identifier(name)) = info.node(target).kind else {
        return Err(TranslateError::Invalid {
            what: "declaration".to_string(),
            reason: "the left-hand side of `:=` must be a name".to_string(),
            span: info.span(target),
        });
    };
    check_redeclared(name, target, info)?;

    let (value, ty) = poison_on_error(name, expr_value(value, cursor, info), info)?;
    bind_local(name, value, ty, cursor, info);
    Ok((None, VType::UNIT))
}

/// `target = value` for names, indexed elements and class fields
pub fn expr_assign(
    target: Index,
    value: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    match info.node(target).kind {
        NodeKind::Expr(ExprKind::Identifier(sym)) => match info.env.lookup(sym).cloned() {
            Some(Binding::Local { slot, ty, owner }) if owner == cursor.owner => {
                let value = expr_cast(value, &ty, cursor, info)?;
                cursor.builder.ins().stack_store(value, slot, 0);
            }
            Some(Binding::Global { data, ty }) => {
                let value = expr_cast(value, &ty, cursor, info)?;
                let addr = cursor.data_addr(&mut info.module, data);
                cursor.builder.ins().store(MemFlags::trusted(), value, addr, 0);
            }
            Some(Binding::Function { .. }) => {
                return Err(TranslateError::Invalid {
                    what: "assignment".to_string(),
                    reason: format!("`{}` is a function", info.resolve(sym)),
                    span: info.span(target),
                });
            }
            other => return Err(unresolved(sym, other.as_ref(), target, info)),
        },
        NodeKind::Expr(ExprKind::Index { target: base, index }) => store_index(base, index, value, target, cursor, info)?,
        NodeKind::Expr(ExprKind::Member { object, member }) => store_member(object, member, value, target, cursor, info)?,
        _ => {
            return Err(TranslateError::Invalid {
                what: "assignment".to_string(),
                reason: "the left-hand side must be a variable, an index or a field".to_string(),
                span: info.span(target),
            });
        }
    }
    Ok((None, VType::UNIT))
}

/// the value a variable declared without an initializer starts with
pub fn zero_value(ty: &VType, node_idx: Index, cursor: &mut Cursor, info: &mut Info) -> Result<Value, TranslateError> {
    let ptr = ptr_width().to_clif();
    Ok(match ty {
        VType::Primitive(PrimitiveTypes::F32) => cursor.builder.ins().f32const(0.0),
        VType::Primitive(PrimitiveTypes::F64) => cursor.builder.ins().f64const(0.0),
        VType::Primitive(PrimitiveTypes::Str) => string_addr(cursor, info, "")?,
        VType::Primitive(PrimitiveTypes::Unit) => {
            return Err(TranslateError::Invalid {
                what: "variable".to_string(),
                reason: "a variable cannot have type unit".to_string(),
                span: info.span(node_idx),
            });
        }
        VType::Primitive(p) => cursor.builder.ins().iconst(p.to_clif(ptr_width()), 0),
        VType::Slice(_) => {
            let null = cursor.builder.ins().iconst(ptr, 0);
            let zero = cursor.builder.ins().iconst(cranelift::prelude::types::I32, 0);
            new_header(null, zero, zero, cursor, info)?
        }
        VType::Array(elem, n) => zeroed_array(elem, *n, cursor, info),
        VType::Pointer(_) | VType::Func(_) | VType::Class(_) => cursor.builder.ins().iconst(ptr, 0),
    })
}

/// `var name T = value` inside a function body
pub fn lower_local_var(
    name: SymbolUsize,
    ty: Option<&TypeExpr>,
    value: Option<Index>,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(), TranslateError> {
    check_redeclared(name, node_idx, info)?;
    let result = local_initial_value(ty, value, node_idx, cursor, info);
    let (value, ty) = poison_on_error(name, result, info)?;
    bind_local(name, value, ty, cursor, info);
    Ok(())
}

fn local_initial_value(
    ty: Option<&TypeExpr>,
    value: Option<Index>,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Value, VType), TranslateError> {
    let span = info.span(node_idx);
    let (value, ty) = match (ty, value) {
        (Some(ty), Some(value)) => {
            let ty = info.resolve_type(ty, &span)?;
            (expr_cast(value, &ty, cursor, info)?, ty)
        }
        (Some(ty), None) => {
            let ty = info.resolve_type(ty, &span)?;
            (zero_value(&ty, node_idx, cursor, info)?, ty)
        }
        (None, Some(value)) => expr_value(value, cursor, info)?,
        (None, None) => {
            return Err(TranslateError::Invalid {
                what: "variable declaration".to_string(),
                reason: "a type or an initializer is required".to_string(),
                span,
            });
        }
    };
    if ty.is_unit() {
        return Err(TranslateError::Invalid {
            what: "variable".to_string(),
            reason: "a variable cannot have type unit".to_string(),
            span,
        });
    }
    Ok((value, ty))
}

/// the literal a global is initialised with, and whether it is negated
fn global_initializer(value: Index, info: &Info) -> Result<(Literal, bool), TranslateError> {
    match &info.node(value).kind {
        NodeKind::Expr(ExprKind::Literal(lit)) => Ok((*lit, false)),
        NodeKind::Expr(ExprKind::Unary {
            op: UnaryOpKind::Neg,
            operand,
        }) => match &info.node(*operand).kind {
            NodeKind::Expr(ExprKind::Literal(lit @ (Literal::Int(_) | Literal::Float(_)))) => Ok((*lit, true)),
            _ => Err(non_constant(value, info)),
        },
        _ => Err(non_constant(value, info)),
    }
}

fn non_constant(value: Index, info: &Info) -> TranslateError {
    TranslateError::UnsupportedNode {
        what: "global initializer (only literals are allowed)".to_string(),
        span: info.span(value),
    }
}

/// `var name T = literal` at the top level: a writable data object
pub fn lower_global(
    name: SymbolUsize,
    ty: Option<&TypeExpr>,
    value: Option<Index>,
    node: &Node,
    info: &mut Info,
) -> Result<(), TranslateError> {
    let span = node.span.to_display(info.interner);
    let text = info.resolve(name);
    if info.env.lookup(name).is_some() || info.declared.contains_key(&name) {
        return Err(TranslateError::Redeclared {
            name: text.to_string(),
            span,
        });
    }

    let result = define_global(name, ty, value, span, info);
    if result.is_err() {
        info.env.declare_global(name, Binding::Poisoned);
    }
    result
}

fn define_global(
    name: SymbolUsize,
    ty: Option<&TypeExpr>,
    value: Option<Index>,
    span: DisplaySpan,
    info: &mut Info,
) -> Result<(), TranslateError> {
    let text = info.resolve(name);
    let init = value.map(|v| global_initializer(v, info)).transpose()?;
    let ty = match (ty, init) {
        (Some(ty), _) => info.resolve_type(ty, &span)?,
        (None, Some((lit, _))) => match lit {
            Literal::Int(n) if i32::try_from(n).is_err() => VType::Primitive(PrimitiveTypes::I64),
            Literal::Int(_) | Literal::Char(_) => VType::INT,
            Literal::Float(_) => VType::Primitive(PrimitiveTypes::F64),
            Literal::Bool(_) => VType::BOOL,
            Literal::Str(_) => VType::STR,
        },
        (None, None) => {
            return Err(TranslateError::Invalid {
                what: "variable declaration".to_string(),
                reason: "a type or an initializer is required".to_string(),
                span,
            });
        }
    };

    let size = ty.size() as usize;
    let mut desc = DataDescription::new();
    let mut points_to = None;
    let contents = match (&ty, init) {
        (VType::Primitive(PrimitiveTypes::Str), init) => {
            let literal = match init {
                Some((Literal::Str(sym), false)) => info.resolve(sym),
                None => "",
                Some(_) => {
                    return Err(TranslateError::TypeMismatch {
                        context: "global initializer".to_string(),
                        expected: "string".to_string(),
                        found: "a non-string literal".to_string(),
                        span,
                    });
                }
            };
            let target = string_data(info, literal)?;
            points_to = info.data_name(target).map(str::to_string);
            // explicit zeroes keep the object out of .bss, which cannot carry the relocation
            let bytes = vec![0; size];
            desc.define(bytes.clone().into_boxed_slice());
            let gv = info.module.declare_data_in_data(target, &mut desc);
            desc.write_data_addr(0, gv, 0);
            Some(bytes)
        }
        (VType::Primitive(PrimitiveTypes::Unit) | VType::Array(..) | VType::Slice(_) | VType::Pointer(_) | VType::Func(_) | VType::Class(_), _) => {
            return Err(TranslateError::UnsupportedNode {
                what: format!("global of type {}", info.describe(&ty)),
                span,
            });
        }
        (_, Some((lit, negate))) => {
            let bytes = constant_bytes(lit, negate, &ty, info, &span)?;
            desc.define(bytes.clone().into_boxed_slice());
            Some(bytes)
        }
        (_, None) => {
            desc.define_zeroinit(size);
            None
        }
    };

    let object = DataObject {
        name: text.to_string(),
        size,
        contents,
        points_to,
        writable: true,
    };
    let data = info.define_data(text, &desc, object, Linkage::Local)?;
    info.env.declare_global(name, Binding::Global { data, ty });
    Ok(())
}
