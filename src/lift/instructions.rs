//! Straight-line instruction lowering: arithmetic, moves, compares, calls,
//! returns, and the synthetic stack.

use super::{memory, op_value, FunctionBuilder, LiftError, LiftResult};
use crate::ir::{BinaryOp, CmpPred, Function, InstKind, Module, Type, Value};
use crate::parser::{Instruction, Opcode, OperandKind};

/// `ADD`/`SUB`/`MUL`/`DIV`: evaluate both operands, apply the operation,
/// and store back into the destination when it is a register. A
/// non-register destination is accepted and the result discarded.
pub fn lift_arithmetic(builder: &mut FunctionBuilder, inst: &Instruction) -> LiftResult<()> {
    let (mnemonic, op) = match inst.opcode {
        Opcode::Add => ("ADD", BinaryOp::Add),
        Opcode::Sub => ("SUB", BinaryOp::Sub),
        Opcode::Mul => ("MUL", BinaryOp::Mul),
        Opcode::Div => ("DIV", BinaryOp::SDiv),
        _ => unreachable!("non-arithmetic opcode"),
    };

    if inst.operands.len() != 2 {
        return Err(LiftError::arity(mnemonic, 2, inst.operands.len()));
    }

    let lhs = op_value(builder, &inst.operands[0])?;
    let rhs = op_value(builder, &inst.operands[1])?;
    let result = builder.emit(InstKind::Binary { op, lhs, rhs });

    if inst.operands[0].kind == OperandKind::Register {
        builder.store_slot(&inst.operands[0].text, Value::Inst(result));
    }

    Ok(())
}

/// `MOV` with the five legal shapes: reg←reg, reg←imm, reg←mem, mem←reg,
/// mem←imm. Memory-to-memory moves and label operands are rejected.
pub fn lift_mov(builder: &mut FunctionBuilder, inst: &Instruction) -> LiftResult<()> {
    if inst.operands.len() != 2 {
        return Err(LiftError::arity("MOV", 2, inst.operands.len()));
    }

    let dst = &inst.operands[0];
    let src = &inst.operands[1];

    match (dst.kind, src.kind) {
        (OperandKind::Register, OperandKind::Register)
        | (OperandKind::Register, OperandKind::Immediate) => {
            let value = op_value(builder, src)?;
            builder.store_slot(&dst.text, value);
        }
        (OperandKind::Register, OperandKind::Memory) => {
            let addr = memory::lower_address(builder, &src.text)?;
            let ptr = builder.emit(InstKind::IntToPtr { value: addr });
            let value = builder.emit(InstKind::Load {
                ptr: Value::Inst(ptr),
            });
            builder.store_slot(&dst.text, Value::Inst(value));
        }
        (OperandKind::Memory, OperandKind::Register) => {
            let addr = memory::lower_address(builder, &dst.text)?;
            let ptr = builder.emit(InstKind::IntToPtr { value: addr });
            let value = builder.load_slot(&src.text);
            builder.emit(InstKind::Store {
                ptr: Value::Inst(ptr),
                value: Value::Inst(value),
            });
        }
        (OperandKind::Memory, OperandKind::Immediate) => {
            let addr = memory::lower_address(builder, &dst.text)?;
            let ptr = builder.emit(InstKind::IntToPtr { value: addr });
            let value = op_value(builder, src)?;
            builder.emit(InstKind::Store {
                ptr: Value::Inst(ptr),
                value,
            });
        }
        (OperandKind::Memory, OperandKind::Memory) => {
            return Err(LiftError::shape("MOV from memory to memory"));
        }
        _ => {
            return Err(LiftError::shape(format!(
                "MOV with operand kinds {:?} <- {:?}",
                dst.kind, src.kind
            )));
        }
    }

    Ok(())
}

/// The five flag slots written by `CMP`, with the predicate each one holds.
const CMP_FLAGS: [(CmpPred, &str); 5] = [
    (CmpPred::Eq, "FLAG_ZF"),
    (CmpPred::Slt, "FLAG_LT"),
    (CmpPred::Sgt, "FLAG_GT"),
    (CmpPred::Sle, "FLAG_LE"),
    (CmpPred::Sge, "FLAG_GE"),
];

/// `CMP`: evaluate all five predicates over the operand pair, zero-extend
/// each to 32 bits, and store them into the flag slots. Denormalizing the
/// comparison here means conditional jumps never need to remember the
/// comparison subject.
pub fn lift_cmp(builder: &mut FunctionBuilder, inst: &Instruction) -> LiftResult<()> {
    if inst.operands.len() != 2 {
        return Err(LiftError::arity("CMP", 2, inst.operands.len()));
    }

    let lhs = op_value(builder, &inst.operands[0])?;
    let rhs = op_value(builder, &inst.operands[1])?;

    for (pred, flag) in CMP_FLAGS {
        let cmp = builder.emit(InstKind::ICmp { pred, lhs, rhs });
        let wide = builder.emit(InstKind::Zext {
            value: Value::Inst(cmp),
        });
        builder.store_slot(flag, Value::Inst(wide));
    }

    Ok(())
}

/// `CALL`: resolve or create a zero-argument `i32` function and store the
/// result into `%eax`, the return-value convention shared with the lowerer.
pub fn lift_call(
    builder: &mut FunctionBuilder,
    module: &mut Module,
    inst: &Instruction,
) -> LiftResult<()> {
    if inst.operands.len() != 1 {
        return Err(LiftError::arity("CALL", 1, inst.operands.len()));
    }

    let target = &inst.operands[0];
    if target.kind != OperandKind::Label {
        return Err(LiftError::shape(format!(
            "CALL target '{}' is not a label",
            target.text
        )));
    }

    if !module.contains_function(&target.text) && builder.name() != target.text {
        module.add_function(Function::new(&target.text, Type::I32));
    }

    let result = builder.emit(InstKind::Call {
        callee: target.text.clone(),
    });
    builder.store_slot("%eax", Value::Inst(result));

    Ok(())
}

/// `RET`: no operand returns the current `%eax`; one operand returns its
/// value directly.
pub fn lift_ret(builder: &mut FunctionBuilder, inst: &Instruction) -> LiftResult<()> {
    match inst.operands.len() {
        0 => {
            let value = builder.load_slot("%eax");
            builder.emit(InstKind::Ret {
                value: Some(Value::Inst(value)),
            });
        }
        1 => {
            let value = op_value(builder, &inst.operands[0])?;
            builder.emit(InstKind::Ret { value: Some(value) });
        }
        n => return Err(LiftError::arity("RET", 1, n)),
    }
    Ok(())
}

/// `PUSH`/`POP` against the synthetic `STACK_PTR` slot. This is not the
/// target machine's stack: the pointer moves by 4 and the value goes
/// through an int-to-ptr cast into linear memory.
pub fn lift_stack(builder: &mut FunctionBuilder, inst: &Instruction) -> LiftResult<()> {
    match inst.opcode {
        Opcode::Push => {
            if inst.operands.len() != 1 {
                return Err(LiftError::arity("PUSH", 1, inst.operands.len()));
            }

            let value = op_value(builder, &inst.operands[0])?;

            let sp = builder.load_slot("STACK_PTR");
            let new_sp = builder.emit(InstKind::Binary {
                op: BinaryOp::Sub,
                lhs: Value::Inst(sp),
                rhs: Value::Const(4),
            });
            builder.store_slot("STACK_PTR", Value::Inst(new_sp));

            let addr = builder.emit(InstKind::IntToPtr {
                value: Value::Inst(new_sp),
            });
            builder.emit(InstKind::Store {
                ptr: Value::Inst(addr),
                value,
            });
        }
        Opcode::Pop => {
            if inst.operands.len() != 1 {
                return Err(LiftError::arity("POP", 1, inst.operands.len()));
            }

            let sp = builder.load_slot("STACK_PTR");
            let addr = builder.emit(InstKind::IntToPtr {
                value: Value::Inst(sp),
            });
            let value = builder.emit(InstKind::Load {
                ptr: Value::Inst(addr),
            });

            let new_sp = builder.emit(InstKind::Binary {
                op: BinaryOp::Add,
                lhs: Value::Inst(sp),
                rhs: Value::Const(4),
            });
            builder.store_slot("STACK_PTR", Value::Inst(new_sp));

            if inst.operands[0].kind == OperandKind::Register {
                builder.store_slot(&inst.operands[0].text, Value::Inst(value));
            }
        }
        _ => unreachable!("non-stack opcode"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir;
    use crate::lift::lift;
    use crate::parser::parse;

    fn lift_source(source: &str) -> ir::Module {
        lift(&parse(source).unwrap()).unwrap()
    }

    fn count_kind(func: &ir::Function, pred: impl Fn(&InstKind) -> bool) -> usize {
        func.blocks()
            .iter()
            .flat_map(|b| b.insts())
            .filter(|&&id| pred(&func.inst(id).kind))
            .count()
    }

    #[test]
    fn test_cmp_writes_five_flags() {
        let module = lift_source("main:\n  CMP %eax, 1\n  RET\n");
        let main = module.get_function("main").unwrap();

        assert_eq!(count_kind(main, |k| matches!(k, InstKind::ICmp { .. })), 5);
        assert_eq!(count_kind(main, |k| matches!(k, InstKind::Zext { .. })), 5);

        let flags: Vec<&str> = main
            .slots()
            .iter()
            .map(|s| s.name.as_str())
            .filter(|n| n.starts_with("FLAG_"))
            .collect();
        assert_eq!(
            flags,
            vec!["FLAG_ZF", "FLAG_LT", "FLAG_GT", "FLAG_LE", "FLAG_GE"]
        );
    }

    #[test]
    fn test_mov_mem_to_mem_rejected() {
        let program = parse("main:\n  MOV (%eax), (%ebx)\n").unwrap();
        let err = lift(&program).unwrap_err();
        assert!(err.to_string().contains("BadOperandShape"));
    }

    #[test]
    fn test_mov_label_rejected() {
        let program = parse("main:\n  MOV %eax, someplace\n").unwrap();
        let err = lift(&program).unwrap_err();
        assert!(err.to_string().contains("BadOperandShape"));
    }

    #[test]
    fn test_push_pop_move_stack_ptr() {
        let module = lift_source("main:\n  PUSH 7\n  POP %eax\n  RET\n");
        let main = module.get_function("main").unwrap();

        assert!(main.slots().iter().any(|s| s.name == "STACK_PTR"));

        let subs = count_kind(
            main,
            |k| matches!(k, InstKind::Binary { op: BinaryOp::Sub, rhs: Value::Const(4), .. }),
        );
        let adds = count_kind(
            main,
            |k| matches!(k, InstKind::Binary { op: BinaryOp::Add, rhs: Value::Const(4), .. }),
        );
        assert_eq!(subs, 1);
        assert_eq!(adds, 1);
    }

    #[test]
    fn test_call_stores_into_eax() {
        let module = lift_source("main:\n  CALL foo\n  RET\nfoo:\n  MOV %eax, 9\n  RET\n");
        let main = module.get_function("main").unwrap();
        assert_eq!(
            count_kind(main, |k| matches!(k, InstKind::Call { callee } if callee == "foo")),
            1
        );
        assert!(main.slots().iter().any(|s| s.name == "%eax"));
    }

    #[test]
    fn test_arith_discards_non_register_destination() {
        // Destination is a memory operand: accepted, result discarded.
        let module = lift_source("main:\n  MOV %ebx, 8\n  ADD (%ebx), 1\n  RET\n");
        let main = module.get_function("main").unwrap();
        assert_eq!(
            count_kind(main, |k| matches!(k, InstKind::Binary { op: BinaryOp::Add, .. })),
            1
        );
    }

    #[test]
    fn test_ret_with_operand() {
        let module = lift_source("main:\n  RET 5\n");
        let main = module.get_function("main").unwrap();
        let entry = main.entry();
        let last = main.block(entry).last().unwrap();
        assert_eq!(
            main.inst(last).kind,
            InstKind::Ret {
                value: Some(Value::Const(5))
            }
        );
    }
}
