//! Compilation statistics.
//!
//! Tracks metrics during compilation for verbose output.

use std::time::{Duration, Instant};

/// Compilation statistics.
#[derive(Debug, Default)]
pub struct CompileStats {
    /// Total compilation time
    pub total_time: Duration,
    /// Time spent parsing
    pub parse_time: Duration,
    /// Time spent lifting
    pub lift_time: Duration,
    /// Time spent in optimization
    pub opt_time: Duration,
    /// Time spent lowering
    pub lower_time: Duration,
    /// Time spent emitting output
    pub emit_time: Duration,

    /// Number of parsed instructions
    pub num_source_insts: usize,
    /// Number of functions in the lifted module
    pub num_functions: usize,
    /// Number of basic blocks
    pub num_blocks: usize,
    /// Number of mid-IR instructions placed in blocks
    pub num_insts: usize,
    /// Number of named slots
    pub num_slots: usize,
    /// Textual output size in bytes
    pub wat_size: usize,
    /// Binary output size in bytes
    pub wasm_size: usize,
}

impl CompileStats {
    /// Create a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Display statistics on stderr.
    pub fn display(&self) {
        eprintln!("\n=== Compilation Statistics ===");
        eprintln!("Source insts: {}", self.num_source_insts);
        eprintln!("Functions:    {}", self.num_functions);
        eprintln!("Blocks:       {}", self.num_blocks);
        eprintln!("Instructions: {}", self.num_insts);
        eprintln!("Slots:        {}", self.num_slots);
        eprintln!("Text size:    {} bytes", self.wat_size);
        eprintln!("Binary size:  {} bytes", self.wasm_size);
        eprintln!();
        eprintln!("=== Timing ===");
        eprintln!("Parsing:      {:?}", self.parse_time);
        eprintln!("Lifting:      {:?}", self.lift_time);
        eprintln!("Optimization: {:?}", self.opt_time);
        eprintln!("Lowering:     {:?}", self.lower_time);
        eprintln!("Emission:     {:?}", self.emit_time);
        eprintln!("Total:        {:?}", self.total_time);
    }
}

/// Timer helper for measuring phase durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return elapsed duration.
    pub fn stop(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Count instructions placed in blocks across a module.
pub fn count_instructions(module: &crate::ir::Module) -> usize {
    module
        .iter_functions()
        .map(|f| f.blocks().iter().map(|b| b.len()).sum::<usize>())
        .sum()
}

/// Count blocks in a module.
pub fn count_blocks(module: &crate::ir::Module) -> usize {
    module.iter_functions().map(|f| f.blocks().len()).sum()
}

/// Count named slots in a module.
pub fn count_slots(module: &crate::ir::Module) -> usize {
    module.iter_functions().map(|f| f.slots().len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lift::lift;
    use crate::parser::parse;

    #[test]
    fn test_compile_stats_default() {
        let stats = CompileStats::new();
        assert_eq!(stats.num_functions, 0);
        assert_eq!(stats.num_blocks, 0);
        assert_eq!(stats.num_insts, 0);
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.stop() >= Duration::from_millis(10));
    }

    #[test]
    fn test_counts() {
        let module = lift(&parse("main:\n  MOV %eax, 1\n  RET\n").unwrap()).unwrap();
        assert_eq!(count_blocks(&module), 1);
        assert_eq!(count_slots(&module), 1);
        // alloca, store const, load for ret, ret
        assert!(count_instructions(&module) >= 4);
    }
}
