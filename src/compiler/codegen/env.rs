use std::collections::HashMap;

use cranelift::{
    codegen::ir::StackSlot,
    module::{DataId, FuncId},
};
use string_interner::symbol::SymbolUsize;

use super::types::{FuncSig, VType};

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// a stack slot in the function identified by `owner`
    Local { slot: StackSlot, ty: VType, owner: u32 },
    Global { data: DataId, ty: VType },
    Function { id: FuncId, sig: FuncSig },
    /// a name whose declaration failed; uses of it are not reported again
    Poisoned,
}

/// Scope chain for name resolution. Scope 0 holds globals and functions.
#[derive(Debug, Clone)]
pub struct Env {
    scopes: Vec<HashMap<SymbolUsize, Binding>>,
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Env {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// a chain holding only the global scope, for lowering code that must not see the caller's locals
    pub fn detached(&self) -> Self {
        Self {
            scopes: vec![self.scopes[0].clone()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// innermost binding first
    pub fn lookup(&self, name: SymbolUsize) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    pub fn bound_in_current(&self, name: SymbolUsize) -> bool {
        self.scopes.last().is_some_and(|scope| scope.contains_key(&name))
    }

    pub fn declare(&mut self, name: SymbolUsize, binding: Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, binding);
        }
    }

    pub fn declare_global(&mut self, name: SymbolUsize, binding: Binding) {
        self.scopes[0].insert(name, binding);
    }

    /// global scope entries that a detached chain picked up, merged back after lowering against it
    pub fn merge_globals(&mut self, other: Env) {
        if let Some(globals) = other.scopes.into_iter().next() {
            for (name, binding) in globals {
                self.scopes[0].entry(name).or_insert(binding);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cranelift::prelude::EntityRef;
    use string_interner::{StringInterner, backend::BucketBackend};

    use super::*;

    fn local(n: usize) -> Binding {
        Binding::Local {
            slot: StackSlot::new(n),
            ty: VType::INT,
            owner: 0,
        }
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut interner = StringInterner::<BucketBackend<SymbolUsize>>::new();
        let x = interner.get_or_intern("x");
        let mut env = Env::new();
        env.push();
        env.declare(x, local(0));
        env.push();
        assert!(!env.bound_in_current(x));
        env.declare(x, local(1));
        assert_eq!(env.lookup(x), Some(&local(1)));
        env.pop();
        assert_eq!(env.lookup(x), Some(&local(0)));
        env.pop();
        assert_eq!(env.lookup(x), None);
    }

    #[test]
    fn global_scope_is_never_popped() {
        let mut interner = StringInterner::<BucketBackend<SymbolUsize>>::new();
        let f = interner.get_or_intern("f");
        let mut env = Env::new();
        env.declare_global(
            f,
            Binding::Function {
                id: FuncId::from_u32(0),
                sig: FuncSig {
                    params: vec![],
                    ret: VType::INT,
                },
            },
        );
        env.pop();
        env.pop();
        assert_eq!(env.depth(), 1);
        assert!(env.lookup(f).is_some());
    }

    #[test]
    fn detached_chain_sees_only_globals() {
        let mut interner = StringInterner::<BucketBackend<SymbolUsize>>::new();
        let g = interner.get_or_intern("g");
        let x = interner.get_or_intern("x");
        let mut env = Env::new();
        env.declare_global(
            g,
            Binding::Global {
                data: DataId::from_u32(0),
                ty: VType::INT,
            },
        );
        env.push();
        env.declare(x, local(0));

        let detached = env.detached();
        assert!(detached.lookup(g).is_some());
        assert!(detached.lookup(x).is_none());
    }
}
