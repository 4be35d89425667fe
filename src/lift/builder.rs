//! Per-function lifting state.
//!
//! The builder owns the function under construction plus the maps the
//! lifter needs: slot name to its entry-block alloca, local label to block,
//! and the counter used to give each synthesized fallthrough block a unique
//! name.

use crate::ir::{BlockId, Function, InstId, InstKind, Type, Value};
use std::collections::HashMap;

pub struct FunctionBuilder {
    func: Function,
    current: BlockId,
    slots: HashMap<String, InstId>,
    blocks: HashMap<String, BlockId>,
    fallthrough_counter: u32,
}

impl FunctionBuilder {
    /// Open a function with an entry block of the given name.
    pub fn new(func_name: &str, entry_name: &str) -> Self {
        let mut func = Function::new(func_name, Type::I32);
        let entry = func.add_block(entry_name);
        Self {
            func,
            current: entry,
            slots: HashMap::new(),
            blocks: HashMap::new(),
            fallthrough_counter: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.func.name()
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn set_current(&mut self, block: BlockId) {
        self.current = block;
    }

    /// Append an instruction to the current block.
    pub fn emit(&mut self, kind: InstKind) -> InstId {
        self.func.push_inst(self.current, kind)
    }

    /// The alloca for a named slot, creating it on first reference. New
    /// allocas are inserted in the entry block before any existing
    /// instruction, so every later use is dominated by the definition.
    pub fn get_or_create_slot(&mut self, name: &str) -> InstId {
        if let Some(&alloca) = self.slots.get(name) {
            return alloca;
        }

        let slot = self.func.add_slot(name, Type::I32);
        let alloca = self.func.new_inst(InstKind::Alloca { slot });
        let entry = self.func.entry();
        self.func.block_mut(entry).push_front(alloca);
        self.slots.insert(name.to_string(), alloca);
        alloca
    }

    /// Load the current value of a named slot.
    pub fn load_slot(&mut self, name: &str) -> InstId {
        let alloca = self.get_or_create_slot(name);
        self.emit(InstKind::Load {
            ptr: Value::Inst(alloca),
        })
    }

    /// Store a value into a named slot.
    pub fn store_slot(&mut self, name: &str, value: Value) -> InstId {
        let alloca = self.get_or_create_slot(name);
        self.emit(InstKind::Store {
            ptr: Value::Inst(alloca),
            value,
        })
    }

    /// The block for a local label, creating it on first reference.
    pub fn get_or_create_block(&mut self, label: &str) -> BlockId {
        if let Some(&block) = self.blocks.get(label) {
            return block;
        }
        let block = self.func.add_block(label);
        self.blocks.insert(label.to_string(), block);
        block
    }

    /// A fresh, uniquely named block for the not-taken path of a
    /// conditional jump.
    pub fn new_fallthrough_block(&mut self) -> BlockId {
        let name = format!("fallthrough_{}", self.fallthrough_counter);
        self.fallthrough_counter += 1;
        self.func.add_block(name)
    }

    /// A fresh continuation block after an unconditional jump. Nothing
    /// branches here; close-out prunes it.
    pub fn new_cont_block(&mut self) -> BlockId {
        self.func.add_block("cont")
    }

    /// Terminate dangling blocks and prune the unreachable ones, then hand
    /// the finished function back. An unterminated entry block returns the
    /// current `%eax`; any other unterminated block returns 0.
    pub fn finish(mut self) -> Function {
        let entry = self.func.entry();
        for idx in 0..self.func.blocks().len() {
            let block = BlockId(idx as u32);
            if self.func.block_terminated(block) {
                continue;
            }
            if block == entry {
                let alloca = self.get_or_create_slot("%eax");
                let value = self.func.push_inst(
                    block,
                    InstKind::Load {
                        ptr: Value::Inst(alloca),
                    },
                );
                self.func.push_inst(
                    block,
                    InstKind::Ret {
                        value: Some(Value::Inst(value)),
                    },
                );
            } else {
                self.func.push_inst(
                    block,
                    InstKind::Ret {
                        value: Some(Value::Const(0)),
                    },
                );
            }
        }

        self.func.prune_unreachable();
        self.func
    }
}
