//! Assembly surface parser
//!
//! Turns AT&T-style assembly text into a flat instruction stream with an
//! attached label table. The lifter consumes this output; see [`crate::lift`].

pub mod parser;

pub use parser::parse;

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("UnknownInstruction: unknown mnemonic '{mnemonic}' at line {line}")]
    UnknownInstruction { line: usize, mnemonic: String },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Instruction opcodes recognized by the parser.
///
/// `Label` is a pseudo-opcode for label-only lines. `JZ`/`JNZ` are folded
/// into `Je`/`Jne` during mnemonic lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Mov,
    Cmp,
    Jmp,
    Je,
    Jne,
    Jl,
    Jg,
    Jle,
    Jge,
    Call,
    Ret,
    Push,
    Pop,
    Label,
}

impl Opcode {
    /// Look up a mnemonic, case-insensitively. Returns `None` for unknown
    /// mnemonics; `Label` is never produced by lookup.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let upper = mnemonic.to_ascii_uppercase();
        let op = match upper.as_str() {
            "ADD" => Opcode::Add,
            "SUB" => Opcode::Sub,
            "MUL" => Opcode::Mul,
            "DIV" => Opcode::Div,
            "MOV" => Opcode::Mov,
            "CMP" => Opcode::Cmp,
            "JMP" => Opcode::Jmp,
            "JE" | "JZ" => Opcode::Je,
            "JNE" | "JNZ" => Opcode::Jne,
            "JL" => Opcode::Jl,
            "JG" => Opcode::Jg,
            "JLE" => Opcode::Jle,
            "JGE" => Opcode::Jge,
            "CALL" => Opcode::Call,
            "RET" => Opcode::Ret,
            "PUSH" => Opcode::Push,
            "POP" => Opcode::Pop,
            _ => return None,
        };
        Some(op)
    }

    /// Is this one of the conditional jump opcodes?
    pub fn is_conditional_jump(self) -> bool {
        matches!(
            self,
            Opcode::Je | Opcode::Jne | Opcode::Jl | Opcode::Jg | Opcode::Jle | Opcode::Jge
        )
    }
}

/// Operand classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Named virtual register, leading `%`
    Register,
    /// Signed decimal literal
    Immediate,
    /// Parenthesized address expression
    Memory,
    /// Symbolic target
    Label,
}

/// A classified operand. Registers keep their leading `%`; memory operands
/// keep their enclosing parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub kind: OperandKind,
    pub text: String,
}

impl Operand {
    pub fn new(kind: OperandKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// A parsed instruction. `label` is set only on the instruction that carries
/// a label definition (same-line label) or on label-only pseudo-instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub label: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            operands: Vec::new(),
            label: None,
        }
    }
}

/// Parser output: instructions in source order plus the label table mapping
/// each label name to the index of the instruction that carries it.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub labels: HashMap<String, usize>,
}
