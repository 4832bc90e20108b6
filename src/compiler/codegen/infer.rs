use generational_arena::Index;

use crate::compiler::{
    parser::node::{BinOpKind, ExprKind, Literal, NodeKind, Param, StmtKind, TypeExpr, UnaryOpKind},
    tokens::DisplaySpan,
};

use super::{
    Info,
    cast::promote,
    cursor::Cursor,
    env::Binding,
    error::TranslateError,
    types::{FuncSig, PrimitiveTypes, VType},
};

impl Info<'_> {
    /// resolves a written type against template parameters, the Type Table and declared classes
    pub fn resolve_type(&self, ty: &TypeExpr, span: &DisplaySpan) -> Result<VType, TranslateError> {
        match ty {
            TypeExpr::Named(sym) => {
                if let Some(bound) = self.type_params.iter().rev().find_map(|frame| frame.get(sym)) {
                    return Ok(bound.clone());
                }
                let name = self.resolve(*sym);
                if let Some(prim) = PrimitiveTypes::from_name(name) {
                    return Ok(VType::Primitive(prim));
                }
                if self.class_names.contains(sym) {
                    return Ok(VType::Class(*sym));
                }
                Err(TranslateError::UnknownType {
                    name: name.to_string(),
                    span: span.clone(),
                })
            }
            TypeExpr::Slice(inner) => Ok(VType::Slice(Box::new(self.resolve_type(inner, span)?))),
            TypeExpr::Array(n, inner) => Ok(VType::Array(Box::new(self.resolve_type(inner, span)?), *n)),
        }
    }

    /// parameter and return types, `int` where none is written
    pub fn signature_of(
        &self,
        params: &[Param],
        return_type: Option<&TypeExpr>,
        span: &DisplaySpan,
    ) -> Result<FuncSig, TranslateError> {
        let params = params
            .iter()
            .map(|p| match &p.ty {
                Some(ty) => self.resolve_type(ty, &p.span.to_display(self.interner)),
                None => Ok(VType::INT),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ret = match return_type {
            Some(ty) => self.resolve_type(ty, span)?,
            None => VType::INT,
        };
        Ok(FuncSig { params, ret })
    }
}

/// The static type an expression would produce, without emitting anything.
/// `None` when it cannot be told ahead of lowering.
pub fn expr_type(idx: Index, cursor: &Cursor, info: &Info) -> Option<VType> {
    let node = info.node(idx);
    let NodeKind::Expr(kind) = &node.kind else {
        return None;
    };

    match kind {
        ExprKind::Literal(lit) => Some(match lit {
            Literal::Int(n) if i32::try_from(*n).is_err() => VType::Primitive(PrimitiveTypes::I64),
            Literal::Int(_) | Literal::Char(_) => VType::INT,
            Literal::Float(_) => VType::Primitive(PrimitiveTypes::F64),
            Literal::Bool(_) => VType::BOOL,
            Literal::Str(_) => VType::STR,
        }),
        ExprKind::Identifier(sym) => match info.env.lookup(*sym) {
            Some(Binding::Local { ty, .. } | Binding::Global { ty, .. }) => Some(ty.clone()),
            Some(Binding::Function { sig, .. }) => Some(VType::Func(Box::new(sig.clone()))),
            Some(Binding::Poisoned) => None,
            None => info.declared.get(sym).map(|(_, sig)| VType::Func(Box::new(sig.clone()))),
        },
        ExprKind::This => cursor.receiver.map(|(_, class)| VType::Class(class)),
        ExprKind::Unary { op, operand } => match op {
            UnaryOpKind::Not => Some(VType::BOOL),
            UnaryOpKind::Neg => expr_type(*operand, cursor, info),
        },
        ExprKind::BinOp { op, left, right } => {
            if op.is_comparison() || matches!(op, BinOpKind::And | BinOpKind::Or) {
                return Some(VType::BOOL);
            }
            let lt = expr_type(*left, cursor, info)?;
            let rt = expr_type(*right, cursor, info)?;
            if lt == VType::STR && rt == VType::STR {
                return Some(VType::STR);
            }
            promote(&lt, &rt)
        }
        ExprKind::Postfix { operand, .. } => expr_type(*operand, cursor, info),
        ExprKind::Assign { .. } | ExprKind::Declare { .. } => Some(VType::UNIT),
        ExprKind::Call { callee, args } => call_type(*callee, args, cursor, info),
        ExprKind::Member { object, member } => match expr_type(*object, cursor, info)? {
            VType::Class(class) => info.classes.get(&class)?.field(*member).map(|f| f.ty.clone()),
            _ => None,
        },
        ExprKind::Index { target, .. } => match expr_type(*target, cursor, info)? {
            VType::Array(elem, _) | VType::Slice(elem) | VType::Pointer(elem) => Some(*elem),
            VType::Primitive(PrimitiveTypes::Str) => Some(VType::Primitive(PrimitiveTypes::U8)),
            _ => None,
        },
        ExprKind::FuncLit {
            params, return_type, ..
        } => info
            .signature_of(params, return_type.as_ref(), &node.span.to_display(info.interner))
            .ok()
            .map(|sig| VType::Func(Box::new(sig))),
        ExprKind::If {
            then_block, else_block, ..
        } => {
            let then_ty = arm_type(*then_block, cursor, info)?;
            let else_ty = arm_type((*else_block)?, cursor, info)?;
            (then_ty == else_ty && !then_ty.is_unit()).then_some(then_ty)
        }
        ExprKind::ArrayLit { elements } => match elements.first() {
            Some(first) => Some(VType::Array(Box::new(expr_type(*first, cursor, info)?), elements.len() as u32)),
            None => Some(VType::Array(Box::new(VType::INT), 0)),
        },
        ExprKind::Type(_) => None,
        ExprKind::New { class, .. } => Some(VType::Class(*class)),
    }
}

/// the type an `if` arm yields: its trailing expression statement, or a nested `if`
pub fn arm_type(idx: Index, cursor: &Cursor, info: &Info) -> Option<VType> {
    match &info.node(idx).kind {
        NodeKind::Stmt(StmtKind::Block { stmts }) => match &info.node(*stmts.last()?).kind {
            NodeKind::Stmt(StmtKind::Expr { expr }) => expr_type(*expr, cursor, info),
            _ => None,
        },
        NodeKind::Expr(ExprKind::If { .. }) => expr_type(idx, cursor, info),
        _ => None,
    }
}

fn call_type(callee: Index, args: &[Index], cursor: &Cursor, info: &Info) -> Option<VType> {
    match &info.node(callee).kind {
        NodeKind::Expr(ExprKind::Identifier(sym)) => {
            let name = info.resolve(*sym);
            match name {
                "len" | "cap" => return Some(VType::INT),
                "append" => return expr_type(*args.first()?, cursor, info),
                "make" => {
                    return match &info.node(*args.first()?).kind {
                        NodeKind::Expr(ExprKind::Type(ty)) => {
                            info.resolve_type(ty, &info.node(callee).span.to_display(info.interner)).ok()
                        }
                        _ => None,
                    };
                }
                _ => {}
            }
            if let Some(prim) = PrimitiveTypes::from_name(name) {
                return Some(VType::Primitive(prim));
            }
            match info.env.lookup(*sym) {
                Some(Binding::Function { sig, .. }) => Some(sig.ret.clone()),
                Some(Binding::Local { ty: VType::Func(sig), .. } | Binding::Global { ty: VType::Func(sig), .. }) => {
                    Some(sig.ret.clone())
                }
                Some(_) => None,
                None => match info.declared.get(sym) {
                    Some((_, sig)) => Some(sig.ret.clone()),
                    // templates and lazily declared externals are only known once lowered
                    None => None,
                },
            }
        }
        NodeKind::Expr(ExprKind::Member { object, member }) => {
            if let NodeKind::Expr(ExprKind::Identifier(pkg)) = &info.node(*object).kind {
                if info.env.lookup(*pkg).is_none() && matches!(info.resolve(*pkg), "fmt" | "os") {
                    return Some(VType::UNIT);
                }
            }
            match expr_type(*object, cursor, info)? {
                VType::Class(class) => info.classes.get(&class)?.methods.get(member).map(|m| m.sig.ret.clone()),
                _ => None,
            }
        }
        _ => match expr_type(callee, cursor, info)? {
            VType::Func(sig) => Some(sig.ret),
            _ => None,
        },
    }
}
