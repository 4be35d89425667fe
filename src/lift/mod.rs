//! Lifter: raises the flat instruction stream into the mid-level IR.
//!
//! Function discovery works from one observation: labels that are ever
//! called become functions; every other label is a local branch target. A
//! label therefore starts a new function when it is `main` or `start`, when
//! it appears as the operand of some `CALL` (a call sink), or when it is the
//! first label in the stream. If the first real instruction carries no label
//! at all, the lifter implicitly opens `main` with an entry block named
//! `entry`.
//!
//! Registers and flags are not SSA values but named slots: each is
//! materialized once as an alloca in the entry block and accessed through
//! load/store. This keeps the later stack-machine lowering trivial and
//! avoids phi placement entirely.

pub mod builder;
mod control;
mod instructions;
mod memory;

pub use builder::FunctionBuilder;

use crate::ir::{self, Function, Module, Type, VerifyError};
use crate::parser::{Instruction, Opcode, OperandKind, Program};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LiftError {
    #[error("BadOperandCount: {opcode} expects {expected} operand(s), found {found}")]
    BadOperandCount {
        opcode: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("BadOperandShape: {detail}")]
    BadOperandShape { detail: String },

    #[error("BadAddressExpression: cannot parse address expression '{expr}'")]
    BadAddressExpression { expr: String },

    #[error("UnresolvedTarget: jump target '{name}' is not defined")]
    UnresolvedTarget { name: String },

    #[error("IrVerificationFailed: {0}")]
    IrVerificationFailed(#[from] VerifyError),
}

impl LiftError {
    fn arity(opcode: &'static str, expected: usize, found: usize) -> Self {
        LiftError::BadOperandCount {
            opcode,
            expected,
            found,
        }
    }

    fn shape(detail: impl Into<String>) -> Self {
        LiftError::BadOperandShape {
            detail: detail.into(),
        }
    }
}

pub type LiftResult<T> = Result<T, LiftError>;

/// Lift a parsed program into a verified mid-IR module.
pub fn lift(program: &Program) -> LiftResult<Module> {
    let mut lifter = Lifter::new(program);
    lifter.run()?;

    let module = lifter.into_module();
    ir::verify_module(&module)?;
    Ok(module)
}

/// Scan the stream once for `CALL` targets. Labels in this set start
/// functions instead of blocks.
fn collect_call_sinks(program: &Program) -> HashSet<String> {
    let mut sinks = HashSet::new();
    for inst in &program.instructions {
        if inst.opcode == Opcode::Call
            && inst.operands.len() == 1
            && inst.operands[0].kind == OperandKind::Label
        {
            sinks.insert(inst.operands[0].text.clone());
        }
    }
    sinks
}

struct Lifter<'a> {
    program: &'a Program,
    module: Module,
    call_sinks: HashSet<String>,
    builder: Option<FunctionBuilder>,
    /// Set once the first function has been opened; after that, plain labels
    /// stay local blocks.
    opened: bool,
}

impl<'a> Lifter<'a> {
    fn new(program: &'a Program) -> Self {
        let call_sinks = collect_call_sinks(program);
        Self {
            program,
            module: Module::new(),
            call_sinks,
            builder: None,
            opened: false,
        }
    }

    fn run(&mut self) -> LiftResult<()> {
        let program = self.program;
        for inst in &program.instructions {
            if let Some(label) = &inst.label {
                if self.starts_function(label) {
                    self.start_function(label, label);
                } else {
                    let builder = self
                        .builder
                        .as_mut()
                        .expect("local label before any function");
                    let block = builder.get_or_create_block(label);
                    builder.set_current(block);
                }
            } else if self.builder.is_none() {
                // Unlabelled prologue: open main implicitly.
                self.start_function("main", "entry");
            }

            self.lift_instruction(inst)?;
        }

        self.finish_current();
        Ok(())
    }

    fn starts_function(&self, label: &str) -> bool {
        label == "main" || label == "start" || self.call_sinks.contains(label) || !self.opened
    }

    fn start_function(&mut self, name: &str, entry_name: &str) {
        self.finish_current();

        // Reserve the function's position in module order now; the body
        // replaces the declaration when the builder finishes.
        if !self.module.contains_function(name) {
            self.module.add_function(Function::new(name, Type::I32));
        }

        log::debug!("lifting function '{}'", name);
        self.builder = Some(FunctionBuilder::new(name, entry_name));
        self.opened = true;
    }

    fn finish_current(&mut self) {
        if let Some(builder) = self.builder.take() {
            self.module.add_function(builder.finish());
        }
    }

    fn into_module(self) -> Module {
        self.module
    }

    fn lift_instruction(&mut self, inst: &Instruction) -> LiftResult<()> {
        let builder = self.builder.as_mut().expect("instruction outside function");

        match inst.opcode {
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                instructions::lift_arithmetic(builder, inst)
            }
            Opcode::Mov => instructions::lift_mov(builder, inst),
            Opcode::Cmp => instructions::lift_cmp(builder, inst),
            Opcode::Jmp
            | Opcode::Je
            | Opcode::Jne
            | Opcode::Jl
            | Opcode::Jg
            | Opcode::Jle
            | Opcode::Jge => control::lift_jump(builder, &self.program.labels, inst),
            Opcode::Call => instructions::lift_call(builder, &mut self.module, inst),
            Opcode::Ret => instructions::lift_ret(builder, inst),
            Opcode::Push | Opcode::Pop => instructions::lift_stack(builder, inst),
            Opcode::Label => Ok(()),
        }
    }
}

/// Evaluate an operand to a mid-IR value: registers load their slot,
/// immediates become constants, memory operands compute their address.
/// Labels are not values.
fn op_value(
    builder: &mut FunctionBuilder,
    operand: &crate::parser::Operand,
) -> LiftResult<ir::Value> {
    match operand.kind {
        OperandKind::Register => {
            let load = builder.load_slot(&operand.text);
            Ok(ir::Value::Inst(load))
        }
        OperandKind::Immediate => {
            let value: i32 = operand
                .text
                .parse()
                .map_err(|_| LiftError::shape(format!("immediate '{}' out of range", operand.text)))?;
            Ok(ir::Value::Const(value))
        }
        OperandKind::Memory => memory::lower_address(builder, &operand.text),
        OperandKind::Label => Err(LiftError::shape(format!(
            "label operand '{}' used as a value",
            operand.text
        ))),
    }
}
