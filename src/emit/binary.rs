//! Binary envelope writer.
//!
//! Emits the wasm magic and version, a function-count section, and an
//! empty body per function. The textual output is the faithful one; this
//! exists so the `.wasm` artifact has the expected header bytes.

use crate::wasm::WasmModule;

/// Magic bytes every wasm binary starts with.
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];
/// Binary format version 1.
pub const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Produce the placeholder binary for a module.
pub fn to_binary(module: &WasmModule) -> Vec<u8> {
    let mut binary = Vec::new();

    binary.extend_from_slice(&WASM_MAGIC);
    binary.extend_from_slice(&WASM_VERSION);

    let count = module.functions.len() as u8;

    // Function section: count only.
    binary.push(0x03);
    binary.push(0x01);
    binary.push(count);

    // Code section: one empty body per function.
    binary.push(0x0A);
    binary.push(0x01);
    binary.push(count);
    for _ in &module.functions {
        binary.push(0x01);
        binary.push(0x00);
    }

    binary
}
