//! asm2wasm
//!
//! Translates a small AT&T-syntax assembly dialect into a linear,
//! stack-based WebAssembly module.
//!
//! # Architecture
//!
//! The compiler is a three-stage pipeline:
//!
//! ```text
//! Assembly text
//!        │
//!        ▼ (parser)
//! ┌──────────────┐
//! │ Instruction  │  flat stream + label table
//! │   stream     │
//! └──────┬───────┘
//!        │ (lift)
//!        ▼
//! ┌──────────────┐
//! │   Mid-IR     │  functions of basic blocks, slot-based registers
//! └──────┬───────┘
//!        │ (opt, optional)
//!        ▼
//! ┌──────────────┐
//! │   Lowered    │  locals assigned, branch depths computed
//! │   module     │
//! └──────┬───────┘
//!        │ (emit)
//!        ▼
//! .wat text + .wasm envelope
//! ```
//!
//! The lifter recovers functions from the featureless label stream (labels
//! that are ever called become functions; all others stay local branch
//! targets), models registers and comparison flags as entry-block stack
//! slots, and verifies the result. The lowerer re-synthesizes structured
//! control flow from the block order and assigns a local index to every
//! value that must survive a definition/use gap.
//!
//! # Example
//!
//! ```
//! let artifacts = asm2wasm::compile("main:\n  MOV %eax, 42\n  RET\n").unwrap();
//! assert!(artifacts.wat.contains("(func $main"));
//! assert!(artifacts.wasm.starts_with(&[0x00, 0x61, 0x73, 0x6D]));
//! ```

pub mod emit;
pub mod ir;
pub mod lift;
pub mod lower;
pub mod opt;
pub mod parser;
pub mod stats;
pub mod wasm;

pub use opt::OptLevel;
pub use stats::CompileStats;

use anyhow::Result;
use stats::Timer;

/// Compiled output artifacts.
#[derive(Debug)]
pub struct Artifacts {
    /// Textual module (canonical output)
    pub wat: String,
    /// Binary envelope (placeholder; header bytes only)
    pub wasm: Vec<u8>,
    /// Per-phase timings and counts gathered during compilation
    pub stats: CompileStats,
}

/// Compile assembly source with optimizations off.
pub fn compile(source: &str) -> Result<Artifacts> {
    compile_with_opt(source, OptLevel::default())
}

/// Compile assembly source at a specific optimization level.
pub fn compile_with_opt(source: &str, opt: OptLevel) -> Result<Artifacts> {
    let mut stats = CompileStats::new();
    let total_timer = Timer::start();

    let parse_timer = Timer::start();
    let program = parser::parse(source)?;
    stats.parse_time = parse_timer.stop();
    stats.num_source_insts = program.instructions.len();

    let lift_timer = Timer::start();
    let mut module = lift::lift(&program)?;
    stats.lift_time = lift_timer.stop();

    let opt_timer = Timer::start();
    opt::optimize_with_level(&mut module, opt);
    stats.opt_time = opt_timer.stop();

    stats.num_functions = module.len();
    stats.num_blocks = stats::count_blocks(&module);
    stats.num_insts = stats::count_instructions(&module);
    stats.num_slots = stats::count_slots(&module);

    let lower_timer = Timer::start();
    let wasm_module = lower::lower_module(&module)?;
    stats.lower_time = lower_timer.stop();

    let emit_timer = Timer::start();
    let wat = emit::to_wat(&wasm_module);
    let wasm = emit::to_binary(&wasm_module);
    stats.emit_time = emit_timer.stop();

    stats.wat_size = wat.len();
    stats.wasm_size = wasm.len();
    stats.total_time = total_timer.stop();

    Ok(Artifacts { wat, wasm, stats })
}

/// Parse and lift only, returning the verified mid-IR for inspection.
pub fn compile_to_ir(source: &str) -> Result<ir::Module> {
    let program = parser::parse(source)?;
    let module = lift::lift(&program)?;
    Ok(module)
}
