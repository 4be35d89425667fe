//! Control-flow cleanup.
//!
//! Branches through a block containing nothing but an unconditional branch
//! are threaded to the final destination, and blocks that fall unreachable
//! are pruned.

use crate::ir::{BlockId, Function, InstKind};

/// Thread trivial branch chains and prune unreachable blocks. Returns true
/// if anything changed.
pub fn simplify_cfg(func: &mut Function) -> bool {
    let before = func.blocks().len();
    let threaded = thread_branches(func);
    func.prune_unreachable();
    threaded || func.blocks().len() != before
}

/// Retarget branches whose destination is a block holding only `br X`.
fn thread_branches(func: &mut Function) -> bool {
    let mut forward: Vec<Option<BlockId>> = Vec::with_capacity(func.blocks().len());
    for block in func.blocks() {
        let target = match block.insts() {
            [only] => match func.inst(*only).kind {
                InstKind::Br { target } => Some(target),
                _ => None,
            },
            _ => None,
        };
        forward.push(target);
    }

    let resolve = |mut id: BlockId| {
        // Chains are short; guard against a pathological br cycle.
        for _ in 0..forward.len() {
            match forward[id.index()] {
                Some(next) if next != id => id = next,
                _ => break,
            }
        }
        id
    };

    let mut changed = false;
    for idx in 0..func.insts().len() {
        let inst = func.inst_mut(crate::ir::InstId(idx as u32));
        match &mut inst.kind {
            InstKind::Br { target } => {
                let resolved = resolve(*target);
                if resolved != *target {
                    *target = resolved;
                    changed = true;
                }
            }
            InstKind::CondBr {
                then_dest,
                else_dest,
                ..
            } => {
                let new_then = resolve(*then_dest);
                let new_else = resolve(*else_dest);
                if new_then != *then_dest || new_else != *else_dest {
                    *then_dest = new_then;
                    *else_dest = new_else;
                    changed = true;
                }
            }
            _ => {}
        }
    }

    changed
}
