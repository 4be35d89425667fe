//! Per-instruction stack-machine conversion.
//!
//! The general shape: push operands, emit the opcode, then `local.set` for
//! ops whose results are reused by name. Comparison results stay on the
//! stack for the `br_if` that consumes them.

use super::{FunctionLowering, LowerError, LowerResult};
use crate::ir::{BinaryOp, BlockId, CmpPred, InstId, InstKind, Value};
use crate::wasm::{WasmInstruction, WasmOpcode};

fn binary_opcode(op: BinaryOp) -> WasmOpcode {
    match op {
        BinaryOp::Add => WasmOpcode::I32Add,
        BinaryOp::Sub => WasmOpcode::I32Sub,
        BinaryOp::Mul => WasmOpcode::I32Mul,
        BinaryOp::SDiv => WasmOpcode::I32DivS,
    }
}

fn cmp_opcode(pred: CmpPred) -> WasmOpcode {
    match pred {
        CmpPred::Eq => WasmOpcode::I32Eq,
        CmpPred::Ne => WasmOpcode::I32Ne,
        CmpPred::Slt => WasmOpcode::I32LtS,
        CmpPred::Sgt => WasmOpcode::I32GtS,
        CmpPred::Sle => WasmOpcode::I32LeS,
        CmpPred::Sge => WasmOpcode::I32GeS,
    }
}

impl<'a> FunctionLowering<'a> {
    fn push(&mut self, opcode: WasmOpcode) {
        self.wasm.push(WasmInstruction::new(opcode));
    }

    fn push_op(&mut self, opcode: WasmOpcode, operand: i64) {
        self.wasm.push(WasmInstruction::with_operand(opcode, operand));
    }

    pub(super) fn convert_inst(&mut self, pos: usize, id: InstId) -> LowerResult<()> {
        match &self.func.inst(id).kind {
            // Slot only; nothing on the stack.
            InstKind::Alloca { .. } => {}

            InstKind::Load { ptr } => {
                self.push_pointer(*ptr)?;
                self.push(WasmOpcode::I32Load);
            }

            InstKind::Store { ptr, value } => {
                self.push_pointer(*ptr)?;
                self.push_value(*value)?;
                self.push(WasmOpcode::I32Store);
            }

            InstKind::Binary { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                self.push_value(lhs)?;
                self.push_value(rhs)?;
                self.push(binary_opcode(op));
                let local = self.local_of(id).expect("binary op has a local");
                self.push_op(WasmOpcode::SetLocal, local as i64);
            }

            InstKind::ICmp { .. } => {
                // Result stays on the stack for the consuming br_if.
                self.convert_compare(id)?;
            }

            InstKind::Zext { value } => {
                self.materialize_zext_source(*value)?;
                let local = self.local_of(id).expect("zext has a local");
                self.push_op(WasmOpcode::SetLocal, local as i64);
            }

            // Nominal casts pass their operand through.
            InstKind::IntToPtr { value } | InstKind::PtrToInt { value } => {
                self.push_value(*value)?;
            }

            InstKind::Call { callee } => {
                let index = self.indices.get(callee).copied().ok_or_else(|| {
                    LowerError::UnresolvedTarget {
                        name: callee.clone(),
                    }
                })?;
                self.push_op(WasmOpcode::Call, index as i64);
                // The result must survive until the store into %eax, which
                // pushes its own address operand first.
                let local = self.local_of(id).expect("call has a local");
                self.push_op(WasmOpcode::SetLocal, local as i64);
            }

            InstKind::Ret { value } => {
                if let Some(value) = value {
                    match value {
                        Value::Const(n) => self.push_op(WasmOpcode::I32Const, *n as i64),
                        Value::Inst(src) => {
                            // Locals are read back; a local-less producer
                            // (a load) left its value on the stack just
                            // before the return.
                            if let Some(local) = self.local_of(*src) {
                                self.push_op(WasmOpcode::GetLocal, local as i64);
                            }
                        }
                    }
                }
                self.push(WasmOpcode::Return);
            }

            InstKind::Br { target } => {
                if let Some(depth) = Self::branch_depth(pos, target.index()) {
                    self.push_op(WasmOpcode::Br, depth as i64);
                }
                // Physical successor: plain fallthrough.
            }

            InstKind::CondBr {
                cond,
                then_dest,
                else_dest,
            } => {
                let (cond, then_dest, else_dest) = (*cond, *then_dest, *else_dest);
                self.convert_cond_br(pos, cond, then_dest, else_dest)?;
            }
        }

        Ok(())
    }

    /// Emit a conditional branch with fallthrough-sensitive polarity.
    fn convert_cond_br(
        &mut self,
        pos: usize,
        cond: Value,
        then_dest: BlockId,
        else_dest: BlockId,
    ) -> LowerResult<()> {
        let true_pos = then_dest.index();
        let false_pos = else_dest.index();

        self.emit_condition(cond)?;

        if false_pos == pos + 1 {
            // False target is the fallthrough: branch on the condition.
            let depth = Self::branch_depth(pos, true_pos).unwrap_or(0);
            self.push_op(WasmOpcode::BrIf, depth as i64);
        } else if true_pos == pos + 1 {
            // True target is the fallthrough: invert and branch to false.
            self.push_op(WasmOpcode::I32Const, 0);
            self.push(WasmOpcode::I32Eq);
            let depth = Self::branch_depth(pos, false_pos).unwrap_or(0);
            self.push_op(WasmOpcode::BrIf, depth as i64);
        } else {
            // Neither target adjacent. Known incomplete.
            self.push_op(WasmOpcode::BrIf, 0);
        }

        Ok(())
    }

    /// Push the boolean for a conditional branch: comparisons emit their
    /// operand/predicate sequence, anything else gets an explicit zero test.
    fn emit_condition(&mut self, cond: Value) -> LowerResult<()> {
        if let Value::Inst(id) = cond {
            if matches!(self.func.inst(id).kind, InstKind::ICmp { .. }) {
                return self.convert_compare(id);
            }
        }
        self.push_value(cond)?;
        self.push_op(WasmOpcode::I32Const, 0);
        self.push(WasmOpcode::I32Ne);
        Ok(())
    }

    /// Push a comparison's operands and predicate opcode.
    fn convert_compare(&mut self, id: InstId) -> LowerResult<()> {
        let &InstKind::ICmp { pred, lhs, rhs } = &self.func.inst(id).kind else {
            return Err(LowerError::unsupported(format!(
                "{} is not a comparison",
                id
            )));
        };
        self.push_value(lhs)?;
        self.push_value(rhs)?;
        self.push(cmp_opcode(pred));
        Ok(())
    }

    /// Materialize the source of a zero-extension: comparisons are
    /// re-emitted in place, everything else pushes like a plain operand.
    fn materialize_zext_source(&mut self, value: Value) -> LowerResult<()> {
        if let Value::Inst(id) = value {
            if matches!(self.func.inst(id).kind, InstKind::ICmp { .. }) {
                return self.convert_compare(id);
            }
        }
        self.push_value(value)
    }

    /// Push an operand value onto the stack.
    ///
    /// Constants become `i32.const`; loads read the local of their pointer
    /// (loads are transparent); instructions with an assigned local are
    /// read back with `local.get`. A local-less producer (a compare chain
    /// consumed by its adjacent branch) already left its value on the
    /// stack at its own emission point and contributes nothing here.
    fn push_value(&mut self, value: Value) -> LowerResult<()> {
        match value {
            Value::Const(n) => {
                self.push_op(WasmOpcode::I32Const, n as i64);
            }
            Value::Inst(id) => match &self.func.inst(id).kind {
                InstKind::Load { ptr } => {
                    let local = self.pointer_local(*ptr)?;
                    self.push_op(WasmOpcode::GetLocal, local as i64);
                }
                _ => {
                    if let Some(local) = self.local_of(id) {
                        self.push_op(WasmOpcode::GetLocal, local as i64);
                    }
                }
            },
        }
        Ok(())
    }

    /// Push the address a load/store goes through: slot pointers read the
    /// slot's local, cast pointers materialize the address value they wrap.
    fn push_pointer(&mut self, ptr: Value) -> LowerResult<()> {
        match ptr {
            Value::Inst(id) => match &self.func.inst(id).kind {
                InstKind::Alloca { .. } => {
                    let local = self.local_of(id).expect("alloca has a local");
                    self.push_op(WasmOpcode::GetLocal, local as i64);
                    Ok(())
                }
                InstKind::IntToPtr { value } => self.push_value(*value),
                _ => Err(LowerError::unsupported(format!(
                    "memory access through non-pointer {}",
                    id
                ))),
            },
            Value::Const(_) => Err(LowerError::unsupported(
                "memory access through constant pointer".to_string(),
            )),
        }
    }

    /// The local index behind a pointer operand, for transparent loads.
    fn pointer_local(&self, ptr: Value) -> LowerResult<u32> {
        match ptr {
            Value::Inst(id) => self.local_of(id).ok_or_else(|| {
                LowerError::unsupported(format!("load through local-less pointer {}", id))
            }),
            Value::Const(_) => Err(LowerError::unsupported(
                "load through constant pointer".to_string(),
            )),
        }
    }
}
