//! asm2wasm CLI
//!
//! Compiles assembly source to a WebAssembly text module and a binary
//! envelope.
//!
//! # Usage
//!
//! ```bash
//! # Outputs default to the input basename plus .wasm/.wat
//! asm2wasm program.s
//!
//! # Explicit output paths
//! asm2wasm --wasm out.wasm --wast out.wat program.s
//! ```

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "asm2wasm",
    version,
    about = "Translates AT&T-style assembly into WebAssembly",
    long_about = r#"
asm2wasm

Translates a small AT&T-syntax assembly dialect (MOV/ADD/CMP/Jcc/CALL/...)
into a WebAssembly text module plus a minimal binary envelope.

If neither --wasm nor --wast is given, both outputs default to the input
file's basename with .wasm and .wat extensions. The textual module is also
printed to standard output.
"#
)]
struct Args {
    /// Input assembly file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WebAssembly binary
    #[arg(long, value_name = "FILE")]
    wasm: Option<PathBuf>,

    /// Output WebAssembly text
    #[arg(long, value_name = "FILE")]
    wast: Option<PathBuf>,

    /// Optimization level (0 or 1)
    #[arg(short = 'O', long = "opt-level", default_value = "0")]
    opt_level: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    // clap exits 2 on usage errors; the contract here is 0 for help and
    // version, 1 for everything else.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = err.print();
            return code;
        }
    };

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let opt_level = asm2wasm::OptLevel::from_str(&args.opt_level).ok_or_else(|| {
        anyhow::anyhow!("invalid optimization level '{}'; use 0 or 1", args.opt_level)
    })?;

    // Neither output requested: derive both from the input name.
    let (wasm_file, wast_file) = match (args.wasm, args.wast) {
        (None, None) => {
            let wasm = args.input.with_extension("wasm");
            let wast = args.input.with_extension("wat");
            println!(
                "Output files are not specified, using {} and {}",
                wasm.display(),
                wast.display()
            );
            (Some(wasm), Some(wast))
        }
        (wasm, wast) => (wasm, wast),
    };

    let source = std::fs::read_to_string(&args.input).map_err(|err| {
        anyhow::anyhow!("IoOpen: failed to open {}: {}", args.input.display(), err)
    })?;

    let artifacts = asm2wasm::compile_with_opt(&source, opt_level)?;

    if let Some(path) = &wasm_file {
        write_output(path, &artifacts.wasm)?;
    }
    if let Some(path) = &wast_file {
        write_output(path, artifacts.wat.as_bytes())?;
    }

    println!("Generated WebAssembly text:");
    println!("----------------------------------------");
    print!("{}", artifacts.wat);
    println!("----------------------------------------");

    if args.verbose {
        artifacts.stats.display();
    }

    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .map_err(|err| anyhow::anyhow!("IoOpen: failed to write {}: {}", path.display(), err))
}
