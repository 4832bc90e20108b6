use std::collections::HashMap;

use cranelift::{
    codegen::ir::{FuncRef, GlobalValue, SourceLoc, StackSlot},
    module::{DataId, FuncId, Module},
    object::ObjectModule,
    prelude::{Block, FunctionBuilder, InstBuilder, StackSlotData, StackSlotKind, Value},
};
use string_interner::symbol::SymbolUsize;

use super::{ptr_width, types::VType};

/// Where `break`, `continue` and `fallthrough` jump to from inside a loop or switch.
#[derive(Debug, Clone, Copy)]
pub struct JumpTargets {
    pub break_to: Block,
    /// `None` inside a switch
    pub continue_to: Option<Block>,
    /// the next case body, set while lowering a case that has one
    pub fallthrough_to: Option<Block>,
}

/// The insertion point for one function being lowered, plus its per-function state.
pub struct Cursor<'f> {
    pub builder: FunctionBuilder<'f>,
    pub ret_type: VType,
    /// identifies the function that owns locals declared through this cursor
    pub owner: u32,
    pub labels: HashMap<Block, String>,
    pub targets: Vec<JumpTargets>,
    /// `this` inside a method: the slot holding the receiver and its class
    pub receiver: Option<(StackSlot, SymbolUsize)>,
    func_refs: HashMap<FuncId, FuncRef>,
    data_refs: HashMap<DataId, GlobalValue>,
}

impl<'f> Cursor<'f> {
    pub fn new(builder: FunctionBuilder<'f>, ret_type: VType, owner: u32) -> Self {
        Self {
            builder,
            ret_type,
            owner,
            labels: HashMap::new(),
            targets: Vec::new(),
            receiver: None,
            func_refs: HashMap::new(),
            data_refs: HashMap::new(),
        }
    }

    pub fn labeled_block(&mut self, label: String) -> Block {
        let block = self.builder.create_block();
        self.labels.insert(block, label);
        block
    }

    /// whether the current block already ends in a terminator
    pub fn is_terminated(&self) -> bool {
        let Some(block) = self.builder.current_block() else {
            return true;
        };
        let func = &self.builder.func;
        func.layout
            .last_inst(block)
            .is_some_and(|inst| func.dfg.insts[inst].opcode().is_terminator())
    }

    /// moves the cursor to `block`; the current block must already be terminated
    pub fn switch_to(&mut self, block: Block) {
        self.builder.switch_to_block(block);
    }

    /// jumps to `block` unless the current block is already terminated
    pub fn jump_if_open(&mut self, block: Block, args: &[Value]) {
        if !self.is_terminated() {
            self.builder.ins().jump(block, args);
        }
    }

    pub fn func_ref(&mut self, module: &mut ObjectModule, id: FuncId) -> FuncRef {
        if let Some(func_ref) = self.func_refs.get(&id) {
            return *func_ref;
        }
        let func_ref = module.declare_func_in_func(id, self.builder.func);
        self.func_refs.insert(id, func_ref);
        func_ref
    }

    /// address of a module data object
    pub fn data_addr(&mut self, module: &mut ObjectModule, id: DataId) -> Value {
        let gv = match self.data_refs.get(&id) {
            Some(gv) => *gv,
            None => {
                let gv = module.declare_data_in_func(id, self.builder.func);
                self.data_refs.insert(id, gv);
                gv
            }
        };
        self.builder.ins().global_value(ptr_width().to_clif(), gv)
    }

    /// a naturally aligned stack slot of `size` bytes
    pub fn stack_slot(&mut self, size: u32, align: u32) -> StackSlot {
        let align_shift = align.max(1).trailing_zeros() as u8;
        self.builder
            .create_sized_stack_slot(StackSlotData::new(StackSlotKind::ExplicitSlot, size.max(1), align_shift))
    }

    /// a slot able to hold one value of `ty`
    pub fn slot_for(&mut self, ty: &VType) -> StackSlot {
        let size = ty.size();
        self.stack_slot(size, size)
    }

    pub fn set_line(&mut self, line: usize) {
        self.builder.set_srcloc(SourceLoc::new(line as u32));
    }

    /// seals every block and hands back the block labels
    pub fn finish(mut self) -> HashMap<Block, String> {
        self.builder.seal_all_blocks();
        self.builder.finalize();
        self.labels
    }
}
