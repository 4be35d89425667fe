//! Mid-IR verification
//!
//! Checks the structural invariants the lowerer relies on:
//!
//! 1. every basic block ends with exactly one terminator and no instruction
//!    follows it;
//! 2. every alloca lives in the function's entry block;
//! 3. every referenced block or function name is defined;
//! 4. every returned value's type equals the declared result type.

use super::{Function, InstKind, Module, Value};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("function '{function}': {reason}")]
pub struct VerifyError {
    pub function: String,
    pub reason: String,
}

impl VerifyError {
    fn new(function: &str, reason: impl Into<String>) -> Self {
        Self {
            function: function.to_string(),
            reason: reason.into(),
        }
    }
}

/// Verify every function body in the module.
pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    for func in module.iter_functions() {
        if func.is_declaration() {
            continue;
        }
        verify_function(module, func)?;
    }
    Ok(())
}

fn verify_function(module: &Module, func: &Function) -> Result<(), VerifyError> {
    let name = func.name();

    for (block_idx, block) in func.blocks().iter().enumerate() {
        if block.is_empty() {
            return Err(VerifyError::new(
                name,
                format!("block '{}' is empty", block.name()),
            ));
        }

        for (pos, &inst_id) in block.insts().iter().enumerate() {
            if inst_id.index() >= func.insts().len() {
                return Err(VerifyError::new(
                    name,
                    format!("block '{}' references instruction out of range", block.name()),
                ));
            }

            let inst = func.inst(inst_id);
            let is_last = pos + 1 == block.len();

            if inst.is_terminator() != is_last {
                let what = if inst.is_terminator() {
                    "terminator before end of block"
                } else {
                    "block does not end with a terminator"
                };
                return Err(VerifyError::new(
                    name,
                    format!("block '{}': {}", block.name(), what),
                ));
            }

            verify_inst(module, func, block_idx, inst_id)?;
        }
    }

    Ok(())
}

fn verify_inst(
    module: &Module,
    func: &Function,
    block_idx: usize,
    inst_id: super::InstId,
) -> Result<(), VerifyError> {
    let name = func.name();
    let inst = func.inst(inst_id);

    for value in inst.operands() {
        if let Value::Inst(id) = value {
            if id.index() >= func.insts().len() {
                return Err(VerifyError::new(
                    name,
                    format!("operand {} of {} is undefined", id, inst_id),
                ));
            }
        }
    }

    match &inst.kind {
        InstKind::Alloca { slot } => {
            if slot.index() >= func.slots().len() {
                return Err(VerifyError::new(name, "alloca references unknown slot"));
            }
            if block_idx != 0 {
                return Err(VerifyError::new(
                    name,
                    format!(
                        "alloca for slot '{}' outside the entry block",
                        func.slot(*slot).name
                    ),
                ));
            }
        }
        InstKind::Br { target } => {
            if target.index() >= func.blocks().len() {
                return Err(VerifyError::new(name, "branch to undefined block"));
            }
        }
        InstKind::CondBr {
            then_dest,
            else_dest,
            ..
        } => {
            if then_dest.index() >= func.blocks().len()
                || else_dest.index() >= func.blocks().len()
            {
                return Err(VerifyError::new(
                    name,
                    "conditional branch to undefined block",
                ));
            }
        }
        InstKind::Call { callee } => {
            if !module.contains_function(callee) {
                return Err(VerifyError::new(
                    name,
                    format!("call to undefined function '{}'", callee),
                ));
            }
        }
        InstKind::Ret { value } => {
            let ret_ty = func.ret_ty();
            match value {
                Some(v) => {
                    let ty = func.value_ty(*v);
                    if ty != Some(ret_ty) {
                        return Err(VerifyError::new(
                            name,
                            format!(
                                "returned value has type {:?}, function declares {}",
                                ty, ret_ty
                            ),
                        ));
                    }
                }
                None => {
                    return Err(VerifyError::new(
                        name,
                        format!("bare return in function declaring {}", ret_ty),
                    ));
                }
            }
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, Type};

    fn module_with(func: Function) -> Module {
        let mut module = Module::new();
        module.add_function(func);
        module
    }

    #[test]
    fn test_valid_function_passes() {
        let mut func = Function::new("main", Type::I32);
        let entry = func.add_block("entry");
        func.push_inst(
            entry,
            InstKind::Ret {
                value: Some(Value::Const(0)),
            },
        );
        assert!(verify_module(&module_with(func)).is_ok());
    }

    #[test]
    fn test_missing_terminator_rejected() {
        let mut func = Function::new("main", Type::I32);
        let entry = func.add_block("entry");
        func.push_inst(
            entry,
            InstKind::Binary {
                op: BinaryOp::Add,
                lhs: Value::Const(1),
                rhs: Value::Const(2),
            },
        );
        let err = verify_module(&module_with(func)).unwrap_err();
        assert!(err.to_string().contains("terminator"));
    }

    #[test]
    fn test_instruction_after_terminator_rejected() {
        let mut func = Function::new("main", Type::I32);
        let entry = func.add_block("entry");
        func.push_inst(
            entry,
            InstKind::Ret {
                value: Some(Value::Const(0)),
            },
        );
        func.push_inst(
            entry,
            InstKind::Ret {
                value: Some(Value::Const(1)),
            },
        );
        assert!(verify_module(&module_with(func)).is_err());
    }

    #[test]
    fn test_alloca_outside_entry_rejected() {
        let mut func = Function::new("main", Type::I32);
        let entry = func.add_block("entry");
        let other = func.add_block("other");
        let slot = func.add_slot("%eax", Type::I32);

        func.push_inst(entry, InstKind::Br { target: other });
        func.push_inst(other, InstKind::Alloca { slot });
        func.push_inst(
            other,
            InstKind::Ret {
                value: Some(Value::Const(0)),
            },
        );

        let err = verify_module(&module_with(func)).unwrap_err();
        assert!(err.to_string().contains("entry block"));
    }

    #[test]
    fn test_call_to_undefined_function_rejected() {
        let mut func = Function::new("main", Type::I32);
        let entry = func.add_block("entry");
        func.push_inst(
            entry,
            InstKind::Call {
                callee: "missing".to_string(),
            },
        );
        func.push_inst(
            entry,
            InstKind::Ret {
                value: Some(Value::Const(0)),
            },
        );
        assert!(verify_module(&module_with(func)).is_err());
    }

    #[test]
    fn test_wrong_return_type_rejected() {
        let mut func = Function::new("main", Type::I32);
        let entry = func.add_block("entry");
        let cmp = func.push_inst(
            entry,
            InstKind::ICmp {
                pred: crate::ir::CmpPred::Eq,
                lhs: Value::Const(1),
                rhs: Value::Const(1),
            },
        );
        func.push_inst(
            entry,
            InstKind::Ret {
                value: Some(Value::Inst(cmp)),
            },
        );
        assert!(verify_module(&module_with(func)).is_err());
    }
}
