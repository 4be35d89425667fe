//! A small evaluator for the mid-IR, used to check computed values in
//! end-to-end tests.
//!
//! Slots become cells in a sparse linear memory; pointer casts are
//! identities; calls recurse. Loads from untouched addresses read 0, which
//! also gives the synthetic `STACK_PTR` its initial value.

use asm2wasm::ir::{BinaryOp, CmpPred, InstId, InstKind, Module, Value};
use std::collections::HashMap;

const MAX_STEPS: usize = 100_000;

/// Result of evaluating a function: its return value and the final
/// contents of the outermost frame's named slots.
pub struct Evaluation {
    pub ret: i32,
    pub slots: HashMap<String, i32>,
}

pub fn eval_function(module: &Module, name: &str) -> Result<Evaluation, String> {
    let mut state = State {
        module,
        memory: HashMap::new(),
        next_alloca: 1024,
        steps: 0,
    };
    state.call(name)
}

struct State<'a> {
    module: &'a Module,
    memory: HashMap<i32, i32>,
    next_alloca: i32,
    steps: usize,
}

impl<'a> State<'a> {
    fn call(&mut self, name: &str) -> Result<Evaluation, String> {
        let func = self
            .module
            .get_function(name)
            .ok_or_else(|| format!("no function '{}'", name))?;
        if func.is_declaration() {
            return Err(format!("function '{}' has no body", name));
        }

        let mut values: HashMap<InstId, i32> = HashMap::new();
        let mut slot_addrs: HashMap<String, i32> = HashMap::new();
        let mut block = func.entry();

        let ret = 'run: loop {
            for &id in func.block(block).insts() {
                self.steps += 1;
                if self.steps > MAX_STEPS {
                    return Err("step limit exceeded".to_string());
                }

                match &func.inst(id).kind {
                    InstKind::Alloca { slot } => {
                        let addr = self.next_alloca;
                        self.next_alloca += 4;
                        slot_addrs.insert(func.slot(*slot).name.clone(), addr);
                        values.insert(id, addr);
                    }
                    InstKind::Load { ptr } => {
                        let addr = self.eval(&values, *ptr)?;
                        values.insert(id, self.memory.get(&addr).copied().unwrap_or(0));
                    }
                    InstKind::Store { ptr, value } => {
                        let addr = self.eval(&values, *ptr)?;
                        let v = self.eval(&values, *value)?;
                        self.memory.insert(addr, v);
                    }
                    InstKind::Binary { op, lhs, rhs } => {
                        let a = self.eval(&values, *lhs)?;
                        let b = self.eval(&values, *rhs)?;
                        let v = match op {
                            BinaryOp::Add => a.wrapping_add(b),
                            BinaryOp::Sub => a.wrapping_sub(b),
                            BinaryOp::Mul => a.wrapping_mul(b),
                            BinaryOp::SDiv => {
                                a.checked_div(b).ok_or("division fault".to_string())?
                            }
                        };
                        values.insert(id, v);
                    }
                    InstKind::ICmp { pred, lhs, rhs } => {
                        let a = self.eval(&values, *lhs)?;
                        let b = self.eval(&values, *rhs)?;
                        let v = match pred {
                            CmpPred::Eq => a == b,
                            CmpPred::Ne => a != b,
                            CmpPred::Slt => a < b,
                            CmpPred::Sgt => a > b,
                            CmpPred::Sle => a <= b,
                            CmpPred::Sge => a >= b,
                        };
                        values.insert(id, v as i32);
                    }
                    InstKind::Zext { value }
                    | InstKind::IntToPtr { value }
                    | InstKind::PtrToInt { value } => {
                        let v = self.eval(&values, *value)?;
                        values.insert(id, v);
                    }
                    InstKind::Call { callee } => {
                        let result = self.call(callee)?;
                        values.insert(id, result.ret);
                    }
                    InstKind::Ret { value } => {
                        let v = match value {
                            Some(v) => self.eval(&values, *v)?,
                            None => 0,
                        };
                        break 'run v;
                    }
                    InstKind::Br { target } => {
                        block = *target;
                        continue 'run;
                    }
                    InstKind::CondBr {
                        cond,
                        then_dest,
                        else_dest,
                    } => {
                        let c = self.eval(&values, *cond)?;
                        block = if c != 0 { *then_dest } else { *else_dest };
                        continue 'run;
                    }
                }
            }
            return Err(format!(
                "block '{}' fell off the end",
                func.block(block).name()
            ));
        };

        let slots = slot_addrs
            .into_iter()
            .map(|(name, addr)| (name, self.memory.get(&addr).copied().unwrap_or(0)))
            .collect();

        Ok(Evaluation { ret, slots })
    }

    fn eval(&self, values: &HashMap<InstId, i32>, value: Value) -> Result<i32, String> {
        match value {
            Value::Const(n) => Ok(n),
            Value::Inst(id) => values
                .get(&id)
                .copied()
                .ok_or_else(|| format!("use of unevaluated {}", id)),
        }
    }
}

// Referenced from multiple integration test binaries; not every binary
// uses every helper.
#[allow(dead_code)]
pub fn eval_main(module: &Module) -> Evaluation {
    eval_function(module, "main").expect("evaluation failed")
}
