//! Function representation

use super::{Block, BlockId, Inst, InstId, InstKind, SlotId, Type, Value};
use std::fmt;

/// A named, function-scoped memory cell. Each slot is materialized exactly
/// once as an alloca in the entry block; all other references go through
/// load/store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub ty: Type,
}

/// A function: result type, basic blocks in emission order, and the
/// instruction arena the blocks index into. A function with no blocks is a
/// declaration.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    ret_ty: Type,
    blocks: Vec<Block>,
    insts: Vec<Inst>,
    slots: Vec<Slot>,
}

impl Function {
    pub fn new(name: impl Into<String>, ret_ty: Type) -> Self {
        Self {
            name: name.into(),
            ret_ty,
            blocks: Vec::new(),
            insts: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ret_ty(&self) -> Type {
        self.ret_ty
    }

    /// Check if the function is a declaration (no body).
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    /// Append a new empty block and return its id.
    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(name));
        id
    }

    /// The entry block is always block 0.
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.index()]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Inst {
        &mut self.insts[id.index()]
    }

    pub fn insts(&self) -> &[Inst] {
        &self.insts
    }

    /// Add an instruction to the arena without placing it in a block.
    pub fn new_inst(&mut self, kind: InstKind) -> InstId {
        let id = InstId(self.insts.len() as u32);
        self.insts.push(Inst::new(kind));
        id
    }

    /// Add an instruction and append it to the given block.
    pub fn push_inst(&mut self, block: BlockId, kind: InstKind) -> InstId {
        let id = self.new_inst(kind);
        self.blocks[block.index()].push(id);
        id
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id.index()]
    }

    /// Register a new slot in the slot table.
    pub fn add_slot(&mut self, name: impl Into<String>, ty: Type) -> SlotId {
        let id = SlotId(self.slots.len() as u32);
        self.slots.push(Slot {
            name: name.into(),
            ty,
        });
        id
    }

    /// The type of a value in this function.
    pub fn value_ty(&self, value: Value) -> Option<Type> {
        match value {
            Value::Const(_) => Some(Type::I32),
            Value::Inst(id) => self.insts.get(id.index()).and_then(|i| i.result_ty()),
        }
    }

    /// Does the given block end in a terminator?
    pub fn block_terminated(&self, id: BlockId) -> bool {
        self.blocks[id.index()]
            .last()
            .map(|i| self.inst(i).is_terminator())
            .unwrap_or(false)
    }

    /// Successor blocks of the given block, read off its terminator.
    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        match self.blocks[id.index()].last() {
            Some(term) => match &self.inst(term).kind {
                InstKind::Br { target } => vec![*target],
                InstKind::CondBr {
                    then_dest,
                    else_dest,
                    ..
                } => vec![*then_dest, *else_dest],
                _ => Vec::new(),
            },
            None => Vec::new(),
        }
    }

    /// Drop blocks unreachable from the entry, preserving the relative order
    /// of the survivors, and remap branch targets accordingly.
    pub fn prune_unreachable(&mut self) {
        if self.blocks.is_empty() {
            return;
        }

        let mut reachable = vec![false; self.blocks.len()];
        let mut worklist = vec![self.entry()];
        while let Some(id) = worklist.pop() {
            if reachable[id.index()] {
                continue;
            }
            reachable[id.index()] = true;
            worklist.extend(self.successors(id));
        }

        if reachable.iter().all(|&r| r) {
            return;
        }

        let mut remap = vec![None; self.blocks.len()];
        let mut kept = Vec::new();
        for (old_idx, block) in std::mem::take(&mut self.blocks).into_iter().enumerate() {
            if reachable[old_idx] {
                remap[old_idx] = Some(BlockId(kept.len() as u32));
                kept.push(block);
            }
        }
        self.blocks = kept;

        // Branches in surviving blocks only ever target surviving blocks
        // (reachability is closed over successors). Orphaned instructions
        // left in the arena may target pruned blocks; point them at the
        // entry so every stored id stays in range.
        let remap_id = |id: BlockId| remap[id.index()].unwrap_or(BlockId(0));
        for inst in &mut self.insts {
            match &mut inst.kind {
                InstKind::Br { target } => {
                    *target = remap_id(*target);
                }
                InstKind::CondBr {
                    then_dest,
                    else_dest,
                    ..
                } => {
                    *then_dest = remap_id(*then_dest);
                    *else_dest = remap_id(*else_dest);
                }
                _ => {}
            }
        }
    }
}

impl Function {
    fn fmt_inst(&self, f: &mut fmt::Formatter<'_>, id: InstId) -> fmt::Result {
        let inst = self.inst(id);
        match &inst.kind {
            InstKind::Alloca { slot } => {
                write!(f, "{} = alloca {}", id, self.slot(*slot).name)
            }
            InstKind::Load { ptr } => write!(f, "{} = load {}", id, ptr),
            InstKind::Store { ptr, value } => write!(f, "store {}, {}", ptr, value),
            InstKind::Binary { op, lhs, rhs } => {
                write!(f, "{} = {} {}, {}", id, op, lhs, rhs)
            }
            InstKind::ICmp { pred, lhs, rhs } => {
                write!(f, "{} = icmp_{} {}, {}", id, pred, lhs, rhs)
            }
            InstKind::Zext { value } => write!(f, "{} = zext {}", id, value),
            InstKind::IntToPtr { value } => write!(f, "{} = itp {}", id, value),
            InstKind::PtrToInt { value } => write!(f, "{} = pti {}", id, value),
            InstKind::Call { callee } => write!(f, "{} = call @{}", id, callee),
            InstKind::Ret { value: Some(v) } => write!(f, "ret {}", v),
            InstKind::Ret { value: None } => write!(f, "ret"),
            InstKind::Br { target } => {
                write!(f, "br {}", self.block(*target).name())
            }
            InstKind::CondBr {
                cond,
                then_dest,
                else_dest,
            } => write!(
                f,
                "cond_br {}, {}, {}",
                cond,
                self.block(*then_dest).name(),
                self.block(*else_dest).name()
            ),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "func @{} -> {} {{", self.name, self.ret_ty)?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.name())?;
            for &id in block.insts() {
                write!(f, "    ")?;
                self.fmt_inst(f, id)?;
                writeln!(f)?;
            }
        }
        writeln!(f, "}}")
    }
}
