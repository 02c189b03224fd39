//! Execute a serialized remote program against a simulated tree.
//!
//! Reads a tree description and a compiled program from JSON files, runs
//! the program as one atomic batch, and prints the raw result values as
//! JSON.

use clap::Parser;

use uiaops_core::program::RemoteProgram;
use uiaops_core::provider::AutomationProvider;
use uiaops_core::simtree::SimulatedProvider;

#[derive(Parser)]
#[command(
    name = "uiaops-batch",
    about = "Run a serialized uiaops program against a simulated tree"
)]
struct Args {
    /// JSON file describing the tree
    #[arg(long)]
    tree: String,

    /// JSON file containing the compiled program
    #[arg(long)]
    program: String,

    /// Compact JSON output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

fn main() {
    let args = Args::parse();

    let tree_json = match std::fs::read_to_string(&args.tree) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read tree file {}: {e}", args.tree);
            std::process::exit(1);
        }
    };
    let provider = match SimulatedProvider::from_json(&tree_json) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid tree JSON: {e}");
            std::process::exit(1);
        }
    };

    let program_json = match std::fs::read_to_string(&args.program) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read program file {}: {e}", args.program);
            std::process::exit(1);
        }
    };
    let program = match RemoteProgram::from_json(&program_json) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid program JSON: {e}");
            std::process::exit(1);
        }
    };

    let results = match provider.execute_batch(&program) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Batch failed: {e}");
            std::process::exit(1);
        }
    };

    let json = if args.compact {
        serde_json::to_string(&results).unwrap()
    } else {
        serde_json::to_string_pretty(&results).unwrap()
    };

    println!("{json}");
}
