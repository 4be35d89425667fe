//! Lowerer: converts the verified mid-IR into the stack-machine module.
//!
//! Every value that must survive a definition/use gap is given a local
//! index: each alloca maps to a slot-typed local, and every value produced
//! by an arithmetic, comparison, extension, cast, or call instruction gets
//! one assigned up front. Loads are transparent: a use of a load reads the
//! local of the load's pointer, so loads themselves need no slot.
//!
//! The IR's block order is the emission order. Branch depths count the
//! blocks strictly between the branching block and its target, matching a
//! block-nesting interpretation of that order.

mod convert;

use crate::ir::{self, InstId, InstKind};
use crate::wasm::{WasmFunction, WasmModule, WasmType};
use indexmap::IndexMap;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LowerError {
    #[error("UnresolvedTarget: call target '{name}' has no definition")]
    UnresolvedTarget { name: String },

    #[error("UnsupportedLowering: {detail}")]
    UnsupportedLowering { detail: String },
}

impl LowerError {
    fn unsupported(detail: impl Into<String>) -> Self {
        LowerError::UnsupportedLowering {
            detail: detail.into(),
        }
    }
}

pub type LowerResult<T> = Result<T, LowerError>;

/// Lower a verified module to its stack-machine form. Declarations are
/// skipped; calling one is an error surfaced here rather than at lift time
/// because `CALL` is allowed to create forward declarations.
pub fn lower_module(module: &ir::Module) -> LowerResult<WasmModule> {
    let mut indices: IndexMap<String, u32> = IndexMap::new();
    for func in module.iter_functions() {
        if !func.is_declaration() {
            let next = indices.len() as u32;
            indices.insert(func.name().to_string(), next);
        }
    }

    let mut wasm_module = WasmModule::new();
    for func in module.iter_functions() {
        if func.is_declaration() {
            continue;
        }
        log::debug!("lowering function '{}'", func.name());
        let lowered = FunctionLowering::new(func, &indices).run()?;
        wasm_module.add_function(lowered);
    }

    Ok(wasm_module)
}

fn wasm_type(ty: ir::Type) -> WasmType {
    // Pointers and single-bit comparison results both widen to i32.
    match ty {
        ir::Type::I1 | ir::Type::I32 | ir::Type::Ptr => WasmType::I32,
    }
}

/// Per-function lowering state.
struct FunctionLowering<'a> {
    func: &'a ir::Function,
    indices: &'a IndexMap<String, u32>,
    wasm: WasmFunction,
    locals: HashMap<InstId, u32>,
}

impl<'a> FunctionLowering<'a> {
    fn new(func: &'a ir::Function, indices: &'a IndexMap<String, u32>) -> Self {
        let mut wasm = WasmFunction::new(func.name());
        wasm.return_type = wasm_type(func.ret_ty());
        Self {
            func,
            indices,
            wasm,
            locals: HashMap::new(),
        }
    }

    fn run(mut self) -> LowerResult<WasmFunction> {
        self.assign_locals();

        for (pos, block) in self.func.blocks().iter().enumerate() {
            for &id in block.insts() {
                self.convert_inst(pos, id)?;
            }
        }

        Ok(self.wasm)
    }

    /// One walk in block order: record a local index for every defining
    /// operation that needs one.
    fn assign_locals(&mut self) {
        for block in self.func.blocks() {
            for &id in block.insts() {
                match &self.func.inst(id).kind {
                    InstKind::Alloca { slot } => {
                        let ty = wasm_type(self.func.slot(*slot).ty);
                        self.assign_local(id, ty);
                    }
                    InstKind::Binary { .. }
                    | InstKind::ICmp { .. }
                    | InstKind::Zext { .. }
                    | InstKind::IntToPtr { .. }
                    | InstKind::PtrToInt { .. }
                    | InstKind::Call { .. } => {
                        self.assign_local(id, WasmType::I32);
                    }
                    _ => {}
                }
            }
        }
    }

    fn assign_local(&mut self, id: InstId, ty: WasmType) -> u32 {
        if let Some(&index) = self.locals.get(&id) {
            return index;
        }
        let index = (self.wasm.params.len() + self.wasm.locals.len()) as u32;
        self.wasm.locals.push(ty);
        self.locals.insert(id, index);
        index
    }

    fn local_of(&self, id: InstId) -> Option<u32> {
        self.locals.get(&id).copied()
    }

    /// Count of blocks strictly between two positions in emission order;
    /// `None` when the target is the physical successor (fallthrough).
    fn branch_depth(from: usize, to: usize) -> Option<u32> {
        if to == from + 1 {
            None
        } else if to > from {
            Some((to - from - 1) as u32)
        } else {
            Some((from - to).saturating_sub(1) as u32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lift::lift;
    use crate::parser::parse;
    use crate::wasm::WasmOpcode;

    fn lower_source(source: &str) -> WasmModule {
        let module = lift(&parse(source).unwrap()).unwrap();
        lower_module(&module).unwrap()
    }

    #[test]
    fn test_branch_depth() {
        assert_eq!(FunctionLowering::branch_depth(0, 1), None);
        assert_eq!(FunctionLowering::branch_depth(0, 2), Some(1));
        assert_eq!(FunctionLowering::branch_depth(0, 4), Some(3));
        assert_eq!(FunctionLowering::branch_depth(3, 3), Some(0));
        assert_eq!(FunctionLowering::branch_depth(3, 0), Some(2));
        assert_eq!(FunctionLowering::branch_depth(3, 2), Some(0));
    }

    #[test]
    fn test_slot_locals_allocated() {
        let wasm = lower_source("main:\n  MOV %eax, 3\n  MOV %ebx, 4\n  ADD %eax, %ebx\n  RET\n");
        let main = &wasm.functions[0];
        // Two register slots plus locals for the add and the loads' users.
        assert!(main.locals.len() >= 3);
        assert_eq!(main.return_type, WasmType::I32);
    }

    #[test]
    fn test_function_indices_follow_module_order() {
        let wasm = lower_source("main:\n  CALL foo\n  RET\nfoo:\n  MOV %eax, 9\n  RET\n");
        assert_eq!(wasm.function_index("main"), Some(0));
        assert_eq!(wasm.function_index("foo"), Some(1));

        let main = &wasm.functions[0];
        let call = main
            .instructions
            .iter()
            .find(|i| i.opcode == WasmOpcode::Call)
            .expect("call emitted");
        assert_eq!(call.operands, vec![1]);
    }

    #[test]
    fn test_call_to_declaration_is_unresolved() {
        let module = lift(&parse("main:\n  CALL ghost\n  RET\n").unwrap()).unwrap();
        let err = lower_module(&module).unwrap_err();
        assert!(err.to_string().contains("UnresolvedTarget"));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_declarations_are_skipped() {
        use crate::ir::{Function, Module, Type, Value};

        // An uncalled declaration gets no body and no function index.
        let mut module = Module::new();
        module.add_function(Function::new("extern_thing", Type::I32));

        let mut main = Function::new("main", Type::I32);
        let entry = main.add_block("entry");
        main.push_inst(
            entry,
            InstKind::Ret {
                value: Some(Value::Const(0)),
            },
        );
        module.add_function(main);

        let wasm = lower_module(&module).unwrap();
        assert_eq!(wasm.functions.len(), 1);
        assert_eq!(wasm.function_index("main"), Some(0));
        assert_eq!(wasm.function_index("extern_thing"), None);
    }
}
