//! Optional optimization passes over the mid-IR.
//!
//! Everything here is behavior-preserving: folding constants, removing
//! locally repeated pure computations, dropping unused results, and
//! threading trivial branch chains. The pipeline must produce working
//! output whether these run or not.

mod const_fold;
mod cse;
mod dce;
mod simplify_cfg;

pub use const_fold::fold_constants;
pub use cse::eliminate_common_subexpressions;
pub use dce::eliminate_dead_code;
pub use simplify_cfg::simplify_cfg;

use crate::ir::{Function, Module};

/// Optimization level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OptLevel {
    /// No optimizations; emission mirrors the lifted IR.
    #[default]
    O0,
    /// Constant folding, local CSE, dead-code elimination, CFG cleanup.
    O1,
}

impl OptLevel {
    /// Parse from a string like "0" or "1".
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "0" => Some(OptLevel::O0),
            "1" => Some(OptLevel::O1),
            _ => None,
        }
    }

    /// Whether any passes run at this level.
    pub fn enabled(self) -> bool {
        !matches!(self, OptLevel::O0)
    }
}

impl std::fmt::Display for OptLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptLevel::O0 => write!(f, "-O0"),
            OptLevel::O1 => write!(f, "-O1"),
        }
    }
}

/// A single function-level pass.
pub trait Pass {
    /// Name of the pass for debugging.
    fn name(&self) -> &'static str;

    /// Run the pass. Returns true if the function was modified.
    fn run(&mut self, func: &mut Function) -> bool;
}

struct FnPass {
    name: &'static str,
    run: fn(&mut Function) -> bool,
}

impl Pass for FnPass {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&mut self, func: &mut Function) -> bool {
        (self.run)(func)
    }
}

fn default_passes() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(FnPass {
            name: "const-fold",
            run: fold_constants,
        }),
        Box::new(FnPass {
            name: "local-cse",
            run: eliminate_common_subexpressions,
        }),
        Box::new(FnPass {
            name: "dce",
            run: eliminate_dead_code,
        }),
        Box::new(FnPass {
            name: "simplify-cfg",
            run: simplify_cfg,
        }),
    ]
}

/// Run the passes selected by `opt` on every function body in the module.
pub fn optimize_with_level(module: &mut Module, opt: OptLevel) {
    if !opt.enabled() {
        return;
    }

    let mut passes = default_passes();
    for func in module.iter_functions_mut() {
        if func.is_declaration() {
            continue;
        }
        for pass in &mut passes {
            let modified = pass.run(func);
            if modified {
                log::debug!("pass '{}' modified function '{}'", pass.name(), func.name());
            }
        }
    }
}
