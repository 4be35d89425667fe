//! Jump lowering.
//!
//! Unconditional jumps branch and park the insertion point on a fresh
//! unreachable `cont` block so the following instructions stay valid; the
//! close-out prunes those blocks. Conditional jumps read the flag slot the
//! earlier `CMP` populated, test it against zero, and branch to the target
//! versus a uniquely numbered fallthrough block.

use super::{FunctionBuilder, LiftError, LiftResult};
use crate::ir::{CmpPred, InstKind, Value};
use crate::parser::{Instruction, Opcode, OperandKind};
use std::collections::HashMap;

/// Flag slot and taken-polarity for each conditional jump. `true` means the
/// jump is taken when the flag is non-zero.
fn flag_condition(opcode: Opcode) -> (&'static str, bool) {
    match opcode {
        Opcode::Je => ("FLAG_ZF", true),
        Opcode::Jne => ("FLAG_ZF", false),
        Opcode::Jl => ("FLAG_LT", true),
        Opcode::Jg => ("FLAG_GT", true),
        Opcode::Jle => ("FLAG_LE", true),
        Opcode::Jge => ("FLAG_GE", true),
        _ => unreachable!("not a conditional jump"),
    }
}

pub fn lift_jump(
    builder: &mut FunctionBuilder,
    labels: &HashMap<String, usize>,
    inst: &Instruction,
) -> LiftResult<()> {
    if inst.operands.len() != 1 {
        return Err(LiftError::arity("jump", 1, inst.operands.len()));
    }

    let target_op = &inst.operands[0];
    if target_op.kind != OperandKind::Label {
        return Err(LiftError::shape(format!(
            "jump target '{}' is not a label",
            target_op.text
        )));
    }
    if !labels.contains_key(&target_op.text) {
        return Err(LiftError::UnresolvedTarget {
            name: target_op.text.clone(),
        });
    }

    let target = builder.get_or_create_block(&target_op.text);

    match inst.opcode {
        Opcode::Jmp => {
            builder.emit(InstKind::Br { target });
            let cont = builder.new_cont_block();
            builder.set_current(cont);
        }
        opcode => {
            let (flag, taken_when_nonzero) = flag_condition(opcode);

            let flag_value = builder.load_slot(flag);
            let pred = if taken_when_nonzero {
                CmpPred::Ne
            } else {
                CmpPred::Eq
            };
            let cond = builder.emit(InstKind::ICmp {
                pred,
                lhs: Value::Inst(flag_value),
                rhs: Value::Const(0),
            });

            let fallthrough = builder.new_fallthrough_block();
            builder.emit(InstKind::CondBr {
                cond: Value::Inst(cond),
                then_dest: target,
                else_dest: fallthrough,
            });
            builder.set_current(fallthrough);
        }
    }

    Ok(())
}
