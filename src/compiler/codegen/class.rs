use std::collections::HashMap;

use cranelift::{
    module::{FuncId, Linkage, Module},
    prelude::{InstBuilder, MemFlags, Value},
};
use generational_arena::Index;
use string_interner::symbol::SymbolUsize;

use crate::compiler::parser::node::{FieldDecl, Node, NodeKind, StmtKind};

use super::{
    Info,
    cast::expr_cast,
    cursor::Cursor,
    error::TranslateError,
    expr::expr_value,
    function::{FnLowering, clif_signature, lower_fn},
    function_call::{direct_call, indirect_call, lower_args},
    ptr_width,
    runtime::malloc,
    types::{FuncSig, VType},
};

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: SymbolUsize,
    pub ty: VType,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub id: FuncId,
    /// without the receiver
    pub sig: FuncSig,
    /// the mangled symbol, `Class_method`
    pub name: String,
    /// the `Function` statement
    pub decl: Index,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub fields: Vec<FieldInfo>,
    /// instance size, rounded up to the widest field
    pub size: u32,
    pub methods: HashMap<SymbolUsize, MethodInfo>,
    method_order: Vec<SymbolUsize>,
}

impl ClassInfo {
    pub fn field(&self, name: SymbolUsize) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn align_to(offset: u32, align: u32) -> u32 {
    offset.div_ceil(align) * align
}

/// computes the field layout and declares every method, before any body is lowered
pub fn register_class(
    name: SymbolUsize,
    fields: &[FieldDecl],
    methods: &[Index],
    node: &Node,
    info: &mut Info,
) -> Result<(), TranslateError> {
    let class_name = info.resolve(name);
    if info.classes.contains_key(&name) {
        return Err(TranslateError::Redeclared {
            name: class_name.to_string(),
            span: node.span.to_display(info.interner),
        });
    }

    let mut layout = Vec::with_capacity(fields.len());
    let (mut offset, mut align) = (0, 1);
    for field in fields {
        let span = field.span.to_display(info.interner);
        if layout.iter().any(|f: &FieldInfo| f.name == field.name) {
            return Err(TranslateError::Redeclared {
                name: info.resolve(field.name).to_string(),
                span,
            });
        }
        let ty = info.resolve_type(&field.ty, &span)?;
        let size = ty.size().max(1);
        offset = align_to(offset, size);
        layout.push(FieldInfo {
            name: field.name,
            ty,
            offset,
        });
        offset += size;
        align = align.max(size);
    }

    let mut class = ClassInfo {
        fields: layout,
        size: align_to(offset, align).max(1),
        methods: HashMap::new(),
        method_order: Vec::new(),
    };

    for method in methods {
        let method_node = info.node(*method);
        let NodeKind::Stmt(StmtKind::Function(decl)) = &method_node.kind else {
            continue;
        };
        let span = method_node.span.to_display(info.interner);
        if class.methods.contains_key(&decl.name) {
            return Err(TranslateError::Redeclared {
                name: info.resolve(decl.name).to_string(),
                span,
            });
        }
        let sig = info.signature_of(&decl.params, decl.return_type.as_ref(), &span)?;
        let symbol = format!("{class_name}_{}", info.resolve(decl.name));
        let clif_sig = clif_signature(&sig, info.build_config.call_conv, true);
        let id = info.module.declare_function(&symbol, Linkage::Export, &clif_sig)?;
        info.record_function_name(id, &symbol);

        class.method_order.push(decl.name);
        class.methods.insert(
            decl.name,
            MethodInfo {
                id,
                sig,
                name: symbol,
                decl: *method,
            },
        );
    }

    info.classes.insert(name, class);
    Ok(())
}

/// lowers the bodies of a registered class's methods
pub fn lower_methods(name: SymbolUsize, info: &mut Info) -> Result<(), TranslateError> {
    let Some(class) = info.classes.get(&name).cloned() else {
        // registration failed and was reported
        return Ok(());
    };

    for method in class.method_order.iter().filter_map(|m| class.methods.get(m)) {
        let node = info.node(method.decl);
        let NodeKind::Stmt(StmtKind::Function(decl)) = &node.kind else {
            continue;
        };
        let lowered = lower_fn(
            FnLowering {
                id: method.id,
                name: method.name.clone(),
                sig: method.sig.clone(),
                params: &decl.params,
                body: decl.body,
                receiver: Some(name),
                linkage: Linkage::Export,
                line: node.span.start.0,
            },
            info,
        );
        if let Err(e) = lowered {
            info.report(e);
        }
    }
    Ok(())
}

fn class_info(class: SymbolUsize, node_idx: Index, info: &Info) -> Result<ClassInfo, TranslateError> {
    info.classes.get(&class).cloned().ok_or_else(|| TranslateError::UnknownType {
        name: info.resolve(class).to_string(),
        span: info.span(node_idx),
    })
}

pub fn expr_this(node_idx: Index, cursor: &mut Cursor, info: &mut Info) -> Result<(Option<Value>, VType), TranslateError> {
    let Some((slot, class)) = cursor.receiver else {
        return Err(TranslateError::MissingContext {
            what: "this".to_string(),
            context: "a method".to_string(),
            span: info.span(node_idx),
        });
    };
    let value = cursor.builder.ins().stack_load(ptr_width().to_clif(), slot, 0);
    Ok((Some(value), VType::Class(class)))
}

/// `new C(args)`: a zeroed heap instance, passed to `C_init` when the class has one
pub fn expr_new(
    class: SymbolUsize,
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let class_info = class_info(class, node_idx, info)?;
    let init = info
        .interner
        .get("init")
        .and_then(|init| class_info.methods.get(&init))
        .cloned();

    let init_args = match &init {
        Some(method) => lower_args(&method.name, args, &method.sig.params, node_idx, cursor, info)?,
        None if args.is_empty() => Vec::new(),
        None => {
            return Err(TranslateError::ArityMismatch {
                name: format!("new {}", info.resolve(class)),
                expected: "0".to_string(),
                got: args.len(),
                span: info.span(node_idx),
            });
        }
    };

    let size = cursor
        .builder
        .ins()
        .iconst(ptr_width().to_clif(), i64::from(class_info.size));
    let object = malloc(cursor, info, size)?;
    cursor.builder.emit_small_memset(
        info.module.target_config(),
        object,
        0,
        u64::from(class_info.size),
        1,
        MemFlags::trusted(),
    );

    if let Some(method) = init {
        let mut values = Vec::with_capacity(init_args.len() + 1);
        values.push(object);
        values.extend(init_args);
        direct_call(method.id, &method.sig, &values, cursor, info);
    }
    Ok((Some(object), VType::Class(class)))
}

fn field_of(
    class: SymbolUsize,
    member: SymbolUsize,
    node_idx: Index,
    info: &Info,
) -> Result<FieldInfo, TranslateError> {
    let class_info = class_info(class, node_idx, info)?;
    class_info
        .field(member)
        .cloned()
        .ok_or_else(|| TranslateError::UnresolvedIdentifier {
            name: format!("{}.{}", info.resolve(class), info.resolve(member)),
            note: class_info
                .methods
                .contains_key(&member)
                .then(|| "methods can only be called".to_string()),
            span: info.span(node_idx),
        })
}

/// `object.member` as a field load
pub fn expr_member(
    object: Index,
    member: SymbolUsize,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let (value, ty) = expr_value(object, cursor, info)?;
    let VType::Class(class) = ty else {
        return Err(TranslateError::UnsupportedOperator {
            op: format!(".{}", info.resolve(member)),
            ty: info.describe(&ty),
            span: info.span(node_idx),
        });
    };
    let field = field_of(class, member, node_idx, info)?;
    let loaded = cursor.builder.ins().load(
        field.ty.to_clif(ptr_width()),
        MemFlags::trusted(),
        value,
        field.offset as i32,
    );
    Ok((Some(loaded), field.ty))
}

/// `object.member = value`
pub fn store_member(
    object: Index,
    member: SymbolUsize,
    value: Index,
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(), TranslateError> {
    let (target, ty) = expr_value(object, cursor, info)?;
    let VType::Class(class) = ty else {
        return Err(TranslateError::UnsupportedOperator {
            op: format!(".{}", info.resolve(member)),
            ty: info.describe(&ty),
            span: info.span(node_idx),
        });
    };
    let field = field_of(class, member, node_idx, info)?;
    let value = expr_cast(value, &field.ty, cursor, info)?;
    cursor
        .builder
        .ins()
        .store(MemFlags::trusted(), value, target, field.offset as i32);
    Ok(())
}

/// `receiver.member(args)`: a method call, or a call through a function-typed field
pub fn call_method(
    receiver: Value,
    class: SymbolUsize,
    member: SymbolUsize,
    args: &[Index],
    node_idx: Index,
    cursor: &mut Cursor,
    info: &mut Info,
) -> Result<(Option<Value>, VType), TranslateError> {
    let class_info = class_info(class, node_idx, info)?;
    if let Some(method) = class_info.methods.get(&member) {
        let mut values = vec![receiver];
        values.extend(lower_args(&method.name, args, &method.sig.params, node_idx, cursor, info)?);
        return Ok(direct_call(method.id, &method.sig, &values, cursor, info));
    }

    let field = field_of(class, member, node_idx, info)?;
    let VType::Func(sig) = &field.ty else {
        return Err(TranslateError::TypeMismatch {
            context: "call".to_string(),
            expected: "a function".to_string(),
            found: info.describe(&field.ty),
            span: info.span(node_idx),
        });
    };
    let target = cursor.builder.ins().load(
        ptr_width().to_clif(),
        MemFlags::trusted(),
        receiver,
        field.offset as i32,
    );
    let values = lower_args(info.resolve(member), args, &sig.params, node_idx, cursor, info)?;
    Ok(indirect_call(target, sig, &values, cursor, info))
}
