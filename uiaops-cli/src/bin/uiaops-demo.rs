//! Drive the operation abstraction end-to-end against a tree file.
//!
//! Walks the same sequence in whichever mode is selected: take a starting
//! element, fetch its name, navigate to its parent with a cache request,
//! and read the cached data back after resolution.  The printed summary is
//! identical for `--remote` and local runs -- that equivalence is the
//! abstraction's core law.

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use uiaops_core::cache::CacheRequest;
use uiaops_core::context;
use uiaops_core::errors::OperationError;
use uiaops_core::ids::{PatternId, PropertyId};
use uiaops_core::scope::OperationScope;
use uiaops_core::simtree::SimulatedProvider;
use uiaops_core::value::ElementHandle;
use uiaops_core::wrapper::UiaElement;

#[derive(Parser)]
#[command(
    name = "uiaops-demo",
    about = "Run a scope end-to-end against a simulated tree"
)]
struct Args {
    /// JSON file describing the tree
    #[arg(long)]
    tree: String,

    /// Name of the starting element. Defaults to the root.
    #[arg(long)]
    start: Option<String>,

    /// Execute as one batched call instead of one call per operation
    #[arg(long)]
    remote: bool,

    /// Compact JSON output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

#[derive(Serialize)]
struct Summary {
    name: Option<String>,
    parent_name: Option<String>,
    parent_supports_text: bool,
    single_calls: u64,
    batch_calls: u64,
}

fn run(
    provider: &Arc<SimulatedProvider>,
    start: ElementHandle,
) -> Result<Summary, OperationError> {
    let scope = OperationScope::start_new()?;

    let element = UiaElement::from_handle(start);
    let name = element.get_name(false /*use_cached_api*/)?;

    let mut cache_request = CacheRequest::new();
    cache_request.add_property(PropertyId::Name);
    cache_request.add_pattern(PatternId::Text);
    let parent = element.get_parent_element(Some(&cache_request))?;

    scope.bind_result(&name)?;
    scope.bind_result(&parent)?;
    scope.resolve()?;

    let (parent_name, parent_supports_text) = if parent.is_null()? {
        (None, false)
    } else {
        (
            parent.get_name(true /*use_cached_api*/)?.get()?,
            !parent.get_text_pattern(true /*use_cached_api*/)?.is_null()?,
        )
    };

    Ok(Summary {
        name: name.get()?,
        parent_name,
        parent_supports_text,
        single_calls: provider.single_calls(),
        batch_calls: provider.batch_calls(),
    })
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
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("Invalid tree JSON: {e}");
            std::process::exit(1);
        }
    };

    let start = match &args.start {
        Some(name) => match provider.find_by_name(name) {
            Some(handle) => handle,
            None => {
                eprintln!("No element named '{name}' in the tree");
                std::process::exit(1);
            }
        },
        None => provider.root(),
    };

    if let Err(e) = context::initialize(args.remote, provider.clone()) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let outcome = run(&provider, start);
    let _ = context::cleanup();

    match outcome {
        Ok(summary) => {
            let json = if args.compact {
                serde_json::to_string(&summary).unwrap()
            } else {
                serde_json::to_string_pretty(&summary).unwrap()
            };
            println!("{json}");
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
