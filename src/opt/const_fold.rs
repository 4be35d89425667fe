//! Constant folding.
//!
//! Binary operations over two constants are evaluated at compile time and
//! their uses rewritten to the constant. The folded instruction itself is
//! dropped from its block; anything it fed sees the constant directly.

use crate::ir::{BinaryOp, Function, InstId, InstKind, Value};
use std::collections::HashMap;

/// Fold constant binary operations. Returns true if anything changed.
pub fn fold_constants(func: &mut Function) -> bool {
    let mut changed = false;

    // Folding one op can expose another; iterate until quiet.
    loop {
        let mut folded: HashMap<InstId, i32> = HashMap::new();

        for block in func.blocks() {
            for &id in block.insts() {
                if let InstKind::Binary {
                    op,
                    lhs: Value::Const(a),
                    rhs: Value::Const(b),
                } = func.inst(id).kind
                {
                    if let Some(value) = eval(op, a, b) {
                        folded.insert(id, value);
                    }
                }
            }
        }

        if folded.is_empty() {
            return changed;
        }
        changed = true;

        for idx in 0..func.insts().len() {
            func.inst_mut(InstId(idx as u32)).map_operands(|v| match v {
                Value::Inst(id) => match folded.get(&id) {
                    Some(&c) => Value::Const(c),
                    None => v,
                },
                other => other,
            });
        }

        for idx in 0..func.blocks().len() {
            let block = crate::ir::BlockId(idx as u32);
            func.block_mut(block)
                .insts_mut()
                .retain(|id| !folded.contains_key(id));
        }
    }
}

/// Evaluate a binary op over constants. Division folds only when it cannot
/// trap.
fn eval(op: BinaryOp, a: i32, b: i32) -> Option<i32> {
    match op {
        BinaryOp::Add => Some(a.wrapping_add(b)),
        BinaryOp::Sub => Some(a.wrapping_sub(b)),
        BinaryOp::Mul => Some(a.wrapping_mul(b)),
        BinaryOp::SDiv => a.checked_div(b),
    }
}
