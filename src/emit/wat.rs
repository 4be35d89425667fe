//! Textual module writer.

use crate::wasm::{WasmFunction, WasmModule, WasmType};
use std::fmt::Write;

/// Render a module as WebAssembly text.
pub fn to_wat(module: &WasmModule) -> String {
    let mut out = String::new();

    writeln!(out, "(module").unwrap();

    write!(out, "  (memory {}", module.memory_pages).unwrap();
    if let Some(max) = module.memory_max {
        write!(out, " {}", max).unwrap();
    }
    writeln!(out, ")").unwrap();

    for func in &module.functions {
        write_function(&mut out, func);
    }

    writeln!(out, ")").unwrap();

    out
}

fn write_function(out: &mut String, func: &WasmFunction) {
    write!(out, "  (func ${}", func.name).unwrap();

    for (i, param) in func.params.iter().enumerate() {
        write!(out, " (param ${} {})", i, param).unwrap();
    }

    if func.return_type != WasmType::Void {
        write!(out, " (result {})", func.return_type).unwrap();
    }

    for (i, local) in func.locals.iter().enumerate() {
        write!(out, " (local ${} {})", func.params.len() + i, local).unwrap();
    }

    writeln!(out).unwrap();

    for inst in &func.instructions {
        writeln!(out, "    {}", inst).unwrap();
    }

    writeln!(out, "  )").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wasm::{WasmInstruction, WasmOpcode};

    #[test]
    fn test_empty_module() {
        let module = WasmModule::new();
        let wat = to_wat(&module);
        assert_eq!(wat, "(module\n  (memory 1)\n)\n");
    }

    #[test]
    fn test_memory_max_rendered() {
        let mut module = WasmModule::new();
        module.memory_max = Some(4);
        assert!(to_wat(&module).contains("(memory 1 4)"));
    }

    #[test]
    fn test_function_rendering() {
        let mut module = WasmModule::new();
        let mut func = WasmFunction::new("main");
        func.return_type = WasmType::I32;
        func.locals.push(WasmType::I32);
        func.locals.push(WasmType::I32);
        func.push(WasmInstruction::with_operand(WasmOpcode::I32Const, 42));
        func.push(WasmInstruction::new(WasmOpcode::Return));
        module.add_function(func);

        let wat = to_wat(&module);
        assert!(wat.contains("(func $main (result i32) (local $0 i32) (local $1 i32)"));
        assert!(wat.contains("    i32.const 42\n"));
        assert!(wat.contains("    return\n"));
    }
}
