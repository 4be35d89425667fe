//! Dead-code elimination.
//!
//! Pure computations whose results nothing reads are dropped from their
//! blocks. Memory operations, calls, allocas, and terminators always stay.

use crate::ir::{BlockId, Function, InstId, InstKind, Value};
use std::collections::HashSet;

/// Remove unused pure instructions. Returns true if anything changed.
pub fn eliminate_dead_code(func: &mut Function) -> bool {
    let mut changed = false;

    // Removing one dead op can orphan its operands; iterate until quiet.
    loop {
        let mut used: HashSet<InstId> = HashSet::new();
        for block in func.blocks() {
            for &id in block.insts() {
                for value in func.inst(id).operands() {
                    if let Value::Inst(src) = value {
                        used.insert(src);
                    }
                }
            }
        }

        let mut removed = false;
        for idx in 0..func.blocks().len() {
            let block = BlockId(idx as u32);
            let before = func.block(block).len();

            let dead: Vec<InstId> = func
                .block(block)
                .insts()
                .iter()
                .copied()
                .filter(|&id| is_removable(&func.inst(id).kind) && !used.contains(&id))
                .collect();

            if !dead.is_empty() {
                func.block_mut(block)
                    .insts_mut()
                    .retain(|id| !dead.contains(id));
                removed = removed || func.block(block).len() != before;
            }
        }

        if !removed {
            return changed;
        }
        changed = true;
    }
}

fn is_removable(kind: &InstKind) -> bool {
    matches!(
        kind,
        InstKind::Binary { .. }
            | InstKind::ICmp { .. }
            | InstKind::Zext { .. }
            | InstKind::IntToPtr { .. }
            | InstKind::PtrToInt { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, CmpPred, Type};

    #[test]
    fn test_unused_chain_removed() {
        let mut func = Function::new("f", Type::I32);
        let entry = func.add_block("entry");
        let cmp = func.push_inst(
            entry,
            InstKind::ICmp {
                pred: CmpPred::Eq,
                lhs: Value::Const(1),
                rhs: Value::Const(1),
            },
        );
        func.push_inst(
            entry,
            InstKind::Zext {
                value: Value::Inst(cmp),
            },
        );
        func.push_inst(
            entry,
            InstKind::Ret {
                value: Some(Value::Const(0)),
            },
        );

        assert!(eliminate_dead_code(&mut func));
        // Both the zext and the comparison it kept alive are gone.
        assert_eq!(func.block(entry).len(), 1);
    }

    #[test]
    fn test_used_op_kept() {
        let mut func = Function::new("f", Type::I32);
        let entry = func.add_block("entry");
        let add = func.push_inst(
            entry,
            InstKind::Binary {
                op: BinaryOp::Add,
                lhs: Value::Const(1),
                rhs: Value::Const(2),
            },
        );
        func.push_inst(
            entry,
            InstKind::Ret {
                value: Some(Value::Inst(add)),
            },
        );

        assert!(!eliminate_dead_code(&mut func));
        assert_eq!(func.block(entry).len(), 2);
    }

    #[test]
    fn test_stores_never_removed() {
        let mut func = Function::new("f", Type::I32);
        let entry = func.add_block("entry");
        let slot = func.add_slot("%eax", Type::I32);
        let alloca = func.push_inst(entry, InstKind::Alloca { slot });
        func.push_inst(
            entry,
            InstKind::Store {
                ptr: Value::Inst(alloca),
                value: Value::Const(7),
            },
        );
        func.push_inst(
            entry,
            InstKind::Ret {
                value: Some(Value::Const(0)),
            },
        );

        assert!(!eliminate_dead_code(&mut func));
        assert_eq!(func.block(entry).len(), 3);
    }
}
