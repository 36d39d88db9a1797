//! MPCIR inspection CLI.
//!
//! Provides the `mpcir` binary with subcommands for working with serialized
//! circuit (`.fs`) and module (`.mfs`) files: structural info, operation
//! statistics, call-stack histograms, validation, JSON dumps, and canonical
//! repacking. The file kind is detected from the buffer magic, never from
//! the extension.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use mpcir_core::{CircuitContext, IrError, ModuleContext};
use mpcir_passes::{
    circuit_call_frequencies, circuit_operation_histogram, module_call_frequencies,
    module_operation_histogram, node_depths,
};

/// MPCIR circuit and module tools.
#[derive(Parser)]
#[command(name = "mpcir", about = "MPCIR circuit and module tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print structural information about a circuit or module file.
    Info {
        /// Path to a .fs or .mfs file.
        file: PathBuf,
    },

    /// Print operation histograms (and a depth summary for circuits).
    Stats {
        /// Path to a .fs or .mfs file.
        file: PathBuf,
    },

    /// Print per-circuit call-stack histograms of a module file.
    Calls {
        /// Path to a .mfs file.
        file: PathBuf,
    },

    /// Check structural invariants and call-graph acyclicity.
    Validate {
        /// Path to a .fs or .mfs file.
        file: PathBuf,
    },

    /// Dump the unpacked object tree as JSON.
    Dump {
        /// Path to a .fs or .mfs file.
        file: PathBuf,
    },

    /// Read, unpack, repack, and write canonical bytes.
    Repack {
        /// Input file.
        input: PathBuf,

        /// Output file.
        output: PathBuf,
    },
}

/// A loaded container of either kind.
enum Loaded {
    Circuit(CircuitContext),
    Module(ModuleContext),
}

fn load(path: &PathBuf) -> Result<Loaded, IrError> {
    let mut circuit = CircuitContext::new();
    match circuit.read_from_file(path) {
        Ok(()) => return Ok(Loaded::Circuit(circuit)),
        Err(IrError::Decode(_)) => {}
        Err(e) => return Err(e),
    }
    let mut module = ModuleContext::new();
    module.read_from_file(path)?;
    Ok(Loaded::Module(module))
}

fn main() {
    tracing_subscriber::fmt().init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Stats { file } => run_stats(&file),
        Commands::Calls { file } => run_calls(&file),
        Commands::Validate { file } => run_validate(&file),
        Commands::Dump { file } => run_dump(&file),
        Commands::Repack { input, output } => run_repack(&input, &output),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run_info(file: &PathBuf) -> Result<(), IrError> {
    match load(file)? {
        Loaded::Circuit(ctx) => {
            let view = ctx.read_only()?;
            println!("kind: circuit");
            println!("name: {}", view.name()?);
            println!("nodes: {}", view.num_nodes()?);
            println!("inputs: {}", view.num_inputs()?);
            println!("outputs: {}", view.num_outputs()?);
            let annotations = view.annotations()?;
            if !annotations.is_empty() {
                println!("annotations: {annotations}");
            }
        }
        Loaded::Module(ctx) => {
            let view = ctx.read_only()?;
            println!("kind: module");
            println!("entry: {}", view.entry_name()?);
            let names = view.circuit_names()?;
            println!("circuits: {}", names.len());
            for name in names {
                let circuit = view.circuit_with_name(&name)?;
                println!(
                    "  {name}: {} nodes, {} in, {} out",
                    circuit.num_nodes()?,
                    circuit.num_inputs()?,
                    circuit.num_outputs()?
                );
            }
        }
    }
    Ok(())
}

fn run_stats(file: &PathBuf) -> Result<(), IrError> {
    match load(file)? {
        Loaded::Circuit(ctx) => {
            let view = ctx.read_only()?;
            println!("operations ({}):", view.name()?);
            for (name, count) in circuit_operation_histogram(&view)? {
                println!("  {name}: {count}");
            }

            let depths = node_depths(&view)?;
            if let Some(max) = depths.values().max() {
                println!("depth: {max}");
            }
        }
        Loaded::Module(ctx) => {
            let view = ctx.read_only()?;
            for (circuit, histogram) in module_operation_histogram(&view)? {
                println!("operations ({circuit}):");
                for (name, count) in histogram {
                    println!("  {name}: {count}");
                }
            }
        }
    }
    Ok(())
}

fn run_calls(file: &PathBuf) -> Result<(), IrError> {
    match load(file)? {
        Loaded::Circuit(ctx) => {
            let view = ctx.read_only()?;
            println!("calls ({}):", view.name()?);
            for (callee, count) in circuit_call_frequencies(&view)? {
                println!("  {callee}: {count}");
            }
        }
        Loaded::Module(ctx) => {
            let view = ctx.read_only()?;
            for (circuit, frequencies) in module_call_frequencies(&view)? {
                println!("calls ({circuit}):");
                for (callee, count) in frequencies {
                    println!("  {callee}: {count}");
                }
            }
        }
    }
    Ok(())
}

fn run_validate(file: &PathBuf) -> Result<(), IrError> {
    match load(file)? {
        Loaded::Circuit(mut ctx) => {
            ctx.mutable()?.validate()?;
            println!("ok: circuit is structurally valid");
        }
        Loaded::Module(mut ctx) => {
            let module = ctx.mutable()?;
            module.validate()?;
            for name in module.circuit_names() {
                module.circuit_mut(&name)?.validate()?;
            }
            println!("ok: module is structurally valid");
        }
    }
    Ok(())
}

fn run_dump(file: &PathBuf) -> Result<(), IrError> {
    let json = match load(file)? {
        Loaded::Circuit(mut ctx) => serde_json::to_string_pretty(ctx.mutable()?),
        Loaded::Module(mut ctx) => serde_json::to_string_pretty(ctx.mutable()?),
    }
    .map_err(|e| IrError::TypeMismatch {
        reason: format!("JSON serialization failed: {e}"),
    })?;
    println!("{json}");
    Ok(())
}

fn run_repack(input: &PathBuf, output: &PathBuf) -> Result<(), IrError> {
    match load(input)? {
        Loaded::Circuit(mut ctx) => {
            ctx.mutable()?;
            ctx.pack()?;
            ctx.write_to_file(output)?;
        }
        Loaded::Module(mut ctx) => {
            ctx.mutable()?;
            ctx.pack()?;
            ctx.write_to_file(output)?;
        }
    }
    println!("repacked {} -> {}", input.display(), output.display());
    Ok(())
}
