//! Local common-subexpression elimination.
//!
//! Within a single block, a pure computation repeating an earlier one with
//! identical operands is dropped and its uses redirected to the first
//! occurrence. Loads and anything with side effects are left alone.

use crate::ir::{BlockId, Function, InstId, InstKind, Value};
use std::collections::HashMap;

/// Eliminate repeated pure computations per block. Returns true if
/// anything changed.
pub fn eliminate_common_subexpressions(func: &mut Function) -> bool {
    let mut replaced: HashMap<InstId, InstId> = HashMap::new();

    for idx in 0..func.blocks().len() {
        let block = BlockId(idx as u32);
        let mut available: HashMap<InstKind, InstId> = HashMap::new();
        let ids = func.block(block).insts().to_vec();
        let mut kept = Vec::with_capacity(ids.len());

        for id in ids {
            // Resolve operands through earlier replacements in this walk so
            // syntactically different repeats still match.
            let mut inst = func.inst(id).clone();
            inst.map_operands(|v| resolve(&replaced, v));

            if is_pure_candidate(&inst.kind) {
                if let Some(&first) = available.get(&inst.kind) {
                    replaced.insert(id, first);
                    continue;
                }
                available.insert(inst.kind.clone(), id);
            }

            *func.inst_mut(id) = inst;
            kept.push(id);
        }

        *func.block_mut(block).insts_mut() = kept;
    }

    if replaced.is_empty() {
        return false;
    }

    for idx in 0..func.insts().len() {
        func.inst_mut(InstId(idx as u32))
            .map_operands(|v| resolve(&replaced, v));
    }

    true
}

fn resolve(replaced: &HashMap<InstId, InstId>, value: Value) -> Value {
    match value {
        Value::Inst(mut id) => {
            while let Some(&first) = replaced.get(&id) {
                id = first;
            }
            Value::Inst(id)
        }
        other => other,
    }
}

fn is_pure_candidate(kind: &InstKind) -> bool {
    matches!(
        kind,
        InstKind::Binary { .. }
            | InstKind::ICmp { .. }
            | InstKind::Zext { .. }
            | InstKind::IntToPtr { .. }
            | InstKind::PtrToInt { .. }
    )
}
