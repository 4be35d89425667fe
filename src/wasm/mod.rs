//! Target module model: a structured, stack-based WebAssembly module.
//!
//! These are the structures the lowerer fills in and the emitters walk.
//! The type table carries `i64`/`f32`/`f64`/`void` for the emitters even
//! though the lifter only ever produces `i32` values.

use indexmap::IndexMap;
use std::fmt;

/// WebAssembly value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WasmType {
    I32,
    I64,
    F32,
    F64,
    Void,
}

impl WasmType {
    pub fn as_str(self) -> &'static str {
        match self {
            WasmType::I32 => "i32",
            WasmType::I64 => "i64",
            WasmType::F32 => "f32",
            WasmType::F64 => "f64",
            WasmType::Void => "void",
        }
    }
}

impl fmt::Display for WasmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stack-machine opcodes used by the lowerer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WasmOpcode {
    I32Const,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,
    GetLocal,
    SetLocal,
    Call,
    Return,
    Br,
    BrIf,
    I32Load,
    I32Store,
}

impl WasmOpcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            WasmOpcode::I32Const => "i32.const",
            WasmOpcode::I32Add => "i32.add",
            WasmOpcode::I32Sub => "i32.sub",
            WasmOpcode::I32Mul => "i32.mul",
            WasmOpcode::I32DivS => "i32.div_s",
            WasmOpcode::I32DivU => "i32.div_u",
            WasmOpcode::I32Eq => "i32.eq",
            WasmOpcode::I32Ne => "i32.ne",
            WasmOpcode::I32LtS => "i32.lt_s",
            WasmOpcode::I32LtU => "i32.lt_u",
            WasmOpcode::I32GtS => "i32.gt_s",
            WasmOpcode::I32GtU => "i32.gt_u",
            WasmOpcode::I32LeS => "i32.le_s",
            WasmOpcode::I32LeU => "i32.le_u",
            WasmOpcode::I32GeS => "i32.ge_s",
            WasmOpcode::I32GeU => "i32.ge_u",
            WasmOpcode::GetLocal => "local.get",
            WasmOpcode::SetLocal => "local.set",
            WasmOpcode::Call => "call",
            WasmOpcode::Return => "return",
            WasmOpcode::Br => "br",
            WasmOpcode::BrIf => "br_if",
            WasmOpcode::I32Load => "i32.load",
            WasmOpcode::I32Store => "i32.store",
        }
    }
}

impl fmt::Display for WasmOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// A single stack-machine instruction with its immediate operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmInstruction {
    pub opcode: WasmOpcode,
    pub operands: Vec<i64>,
}

impl WasmInstruction {
    pub fn new(opcode: WasmOpcode) -> Self {
        Self {
            opcode,
            operands: Vec::new(),
        }
    }

    pub fn with_operand(opcode: WasmOpcode, operand: i64) -> Self {
        Self {
            opcode,
            operands: vec![operand],
        }
    }
}

impl fmt::Display for WasmInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

/// A lowered function: flat instruction list plus its local table.
#[derive(Debug, Clone)]
pub struct WasmFunction {
    pub name: String,
    pub params: Vec<WasmType>,
    pub return_type: WasmType,
    pub locals: Vec<WasmType>,
    pub instructions: Vec<WasmInstruction>,
}

impl WasmFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: WasmType::Void,
            locals: Vec::new(),
            instructions: Vec::new(),
        }
    }

    pub fn push(&mut self, inst: WasmInstruction) {
        self.instructions.push(inst);
    }
}

/// A lowered module.
#[derive(Debug, Clone)]
pub struct WasmModule {
    /// Initial memory size in 64 KiB pages
    pub memory_pages: u32,
    /// Optional maximum memory size in pages
    pub memory_max: Option<u32>,
    pub functions: Vec<WasmFunction>,
    /// Function name to index, in emission order
    pub function_indices: IndexMap<String, u32>,
}

impl WasmModule {
    pub fn new() -> Self {
        Self {
            memory_pages: 1,
            memory_max: None,
            functions: Vec::new(),
            function_indices: IndexMap::new(),
        }
    }

    pub fn add_function(&mut self, func: WasmFunction) {
        self.function_indices
            .insert(func.name.clone(), self.functions.len() as u32);
        self.functions.push(func);
    }

    pub fn function_index(&self, name: &str) -> Option<u32> {
        self.function_indices.get(name).copied()
    }
}

impl Default for WasmModule {
    fn default() -> Self {
        Self::new()
    }
}
