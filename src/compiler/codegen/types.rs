use std::fmt;

use cranelift::prelude::{Type, types};
use string_interner::symbol::SymbolUsize;

use super::{PtrWidth, ptr_width};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTypes {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    /// pointer to a null-terminated byte sequence
    Str,
    Unit,
}

#[macro_export]
macro_rules! is_int {
    () => {
        $crate::compiler::codegen::types::PrimitiveTypes::I8
            | $crate::compiler::codegen::types::PrimitiveTypes::I16
            | $crate::compiler::codegen::types::PrimitiveTypes::I32
            | $crate::compiler::codegen::types::PrimitiveTypes::I64
            | $crate::compiler::codegen::types::PrimitiveTypes::U8
            | $crate::compiler::codegen::types::PrimitiveTypes::U16
            | $crate::compiler::codegen::types::PrimitiveTypes::U32
            | $crate::compiler::codegen::types::PrimitiveTypes::U64
    };
}

#[macro_export]
macro_rules! is_float {
    () => {
        $crate::compiler::codegen::types::PrimitiveTypes::F32 | $crate::compiler::codegen::types::PrimitiveTypes::F64
    };
}

impl PrimitiveTypes {
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveTypes::I8 | PrimitiveTypes::I16 | PrimitiveTypes::I32 | PrimitiveTypes::I64
        )
    }

    pub fn is_int(self) -> bool {
        matches!(self, crate::is_int!())
    }

    pub fn is_float(self) -> bool {
        matches!(self, crate::is_float!())
    }

    pub fn to_clif(self, width: PtrWidth) -> Type {
        match self {
            PrimitiveTypes::I8 | PrimitiveTypes::U8 | PrimitiveTypes::Bool => types::I8,
            PrimitiveTypes::I16 | PrimitiveTypes::U16 => types::I16,
            PrimitiveTypes::I32 | PrimitiveTypes::U32 => types::I32,
            PrimitiveTypes::I64 | PrimitiveTypes::U64 => types::I64,
            PrimitiveTypes::F32 => types::F32,
            PrimitiveTypes::F64 => types::F64,
            PrimitiveTypes::Str => width.to_clif(),
            PrimitiveTypes::Unit => types::INVALID,
        }
    }

    /// the Type Table: surface type names to primitive types
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int" | "int32" | "rune" => PrimitiveTypes::I32,
            "int8" => PrimitiveTypes::I8,
            "int16" => PrimitiveTypes::I16,
            "int64" => PrimitiveTypes::I64,
            "uint" | "uint32" => PrimitiveTypes::U32,
            "uint8" | "byte" => PrimitiveTypes::U8,
            "uint16" => PrimitiveTypes::U16,
            "uint64" => PrimitiveTypes::U64,
            "float" | "float64" => PrimitiveTypes::F64,
            "float32" => PrimitiveTypes::F32,
            "bool" => PrimitiveTypes::Bool,
            "string" => PrimitiveTypes::Str,
            _ => return None,
        })
    }
}

impl fmt::Display for PrimitiveTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveTypes::I8 => "int8",
            PrimitiveTypes::I16 => "int16",
            PrimitiveTypes::I32 => "int",
            PrimitiveTypes::I64 => "int64",
            PrimitiveTypes::U8 => "uint8",
            PrimitiveTypes::U16 => "uint16",
            PrimitiveTypes::U32 => "uint",
            PrimitiveTypes::U64 => "uint64",
            PrimitiveTypes::F32 => "float32",
            PrimitiveTypes::F64 => "float64",
            PrimitiveTypes::Bool => "bool",
            PrimitiveTypes::Str => "string",
            PrimitiveTypes::Unit => "unit",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncSig {
    pub params: Vec<VType>,
    pub ret: VType,
}

/// The static type of a lowered value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VType {
    Primitive(PrimitiveTypes),
    /// stack storage of N elements, the value is its address
    Array(Box<VType>, u32),
    /// address of a heap `{data, len, cap}` header
    Slice(Box<VType>),
    Pointer(Box<VType>),
    Func(Box<FuncSig>),
    /// address of a heap instance
    Class(SymbolUsize),
}

impl VType {
    pub const UNIT: VType = VType::Primitive(PrimitiveTypes::Unit);
    pub const INT: VType = VType::Primitive(PrimitiveTypes::I32);
    pub const BOOL: VType = VType::Primitive(PrimitiveTypes::Bool);
    pub const STR: VType = VType::Primitive(PrimitiveTypes::Str);

    pub fn to_clif(&self, width: PtrWidth) -> Type {
        match self {
            VType::Primitive(p) => p.to_clif(width),
            VType::Array(..) | VType::Slice(_) | VType::Pointer(_) | VType::Func(_) | VType::Class(_) => width.to_clif(),
        }
    }

    pub fn is_unit(&self) -> bool {
        *self == VType::UNIT
    }

    pub fn primitive(&self) -> Option<PrimitiveTypes> {
        match self {
            VType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// size of one value of this type in memory, in bytes
    pub fn size(&self) -> u32 {
        match self {
            VType::Primitive(PrimitiveTypes::Unit) => 0,
            other => other.to_clif(ptr_width()).bytes(),
        }
    }

    pub fn describe(&self, resolve: &dyn Fn(SymbolUsize) -> String) -> String {
        match self {
            VType::Primitive(p) => p.to_string(),
            VType::Array(elem, n) => format!("[{n}]{}", elem.describe(resolve)),
            VType::Slice(elem) => format!("[]{}", elem.describe(resolve)),
            VType::Pointer(elem) => format!("*{}", elem.describe(resolve)),
            VType::Func(sig) => {
                let params: Vec<String> = sig.params.iter().map(|p| p.describe(resolve)).collect();
                format!("func({}) {}", params.join(", "), sig.ret.describe(resolve))
            }
            VType::Class(name) => resolve(*name),
        }
    }

    /// a name fragment for template instance mangling
    pub fn mangle(&self, resolve: &dyn Fn(SymbolUsize) -> String) -> String {
        match self {
            VType::Primitive(p) => p.to_string(),
            VType::Array(elem, n) => format!("arr{n}_{}", elem.mangle(resolve)),
            VType::Slice(elem) => format!("slice_{}", elem.mangle(resolve)),
            VType::Pointer(elem) => format!("ptr_{}", elem.mangle(resolve)),
            VType::Func(_) => "func".to_string(),
            VType::Class(name) => resolve(*name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_table_maps_surface_names() {
        assert_eq!(PrimitiveTypes::from_name("int"), Some(PrimitiveTypes::I32));
        assert_eq!(PrimitiveTypes::from_name("byte"), Some(PrimitiveTypes::U8));
        assert_eq!(PrimitiveTypes::from_name("rune"), Some(PrimitiveTypes::I32));
        assert_eq!(PrimitiveTypes::from_name("float"), Some(PrimitiveTypes::F64));
        assert_eq!(PrimitiveTypes::from_name("string"), Some(PrimitiveTypes::Str));
        assert_eq!(PrimitiveTypes::from_name("Point"), None);
    }

    #[test]
    fn bool_is_a_byte_and_strings_are_pointers() {
        assert_eq!(PrimitiveTypes::Bool.to_clif(PtrWidth::X64), types::I8);
        assert_eq!(PrimitiveTypes::Str.to_clif(PtrWidth::X64), types::I64);
        assert_eq!(PrimitiveTypes::Str.to_clif(PtrWidth::X32), types::I32);
        assert_eq!(VType::Slice(Box::new(VType::INT)).to_clif(PtrWidth::X64), types::I64);
    }

    #[test]
    fn int_and_float_classes() {
        assert!(PrimitiveTypes::U16.is_int());
        assert!(!PrimitiveTypes::U16.is_signed());
        assert!(PrimitiveTypes::F32.is_float());
        assert!(!PrimitiveTypes::Bool.is_int());
        assert!(!PrimitiveTypes::Str.is_float());
    }
}
