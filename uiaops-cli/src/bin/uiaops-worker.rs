//! JSON-RPC IPC worker hosting a simulated automation tree.
//!
//! Reads line-delimited JSON requests from stdin, dispatches to
//! `uiaops_core`, writes JSON responses to stdout.  A client process can
//! load a tree once and then drive it with single operations or whole
//! batched programs, which is exactly the provider side of the abstraction's
//! cross-process story.

use std::io::{self, BufRead, Write};

use clap::Parser;
use serde::{Deserialize, Serialize};

use uiaops_core::program::{Operation, RemoteProgram};
use uiaops_core::provider::AutomationProvider;
use uiaops_core::simtree::{SimNode, SimulatedProvider};
use uiaops_core::value::AutomationValue;

#[derive(Parser)]
#[command(name = "uiaops-worker", about = "uiaops IPC worker process")]
struct Args {
    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
struct Request {
    id: u64,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Serialize)]
struct Response {
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn dispatch(
    provider: &mut Option<SimulatedProvider>,
    method: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, String> {
    match method {
        "load_tree" => {
            let tree: SimNode =
                serde_json::from_value(params.clone()).map_err(|e| e.to_string())?;
            let loaded = SimulatedProvider::new(tree);
            let root = loaded.root();
            *provider = Some(loaded);
            serde_json::to_value(root).map_err(|e| e.to_string())
        }
        "root" => {
            let provider = provider.as_ref().ok_or("no tree loaded")?;
            serde_json::to_value(provider.root()).map_err(|e| e.to_string())
        }
        "find" => {
            let provider = provider.as_ref().ok_or("no tree loaded")?;
            let name = params
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or("missing 'name' parameter")?;
            serde_json::to_value(provider.find_by_name(name)).map_err(|e| e.to_string())
        }
        "apply" => {
            let provider = provider.as_ref().ok_or("no tree loaded")?;
            let operation: Operation<AutomationValue> =
                serde_json::from_value(params.clone()).map_err(|e| e.to_string())?;
            let value = provider.apply(&operation).map_err(|e| e.to_string())?;
            serde_json::to_value(value).map_err(|e| e.to_string())
        }
        "execute_program" => {
            let provider = provider.as_ref().ok_or("no tree loaded")?;
            let program: RemoteProgram =
                serde_json::from_value(params.clone()).map_err(|e| e.to_string())?;
            let results = provider.execute_batch(&program).map_err(|e| e.to_string())?;
            serde_json::to_value(results).map_err(|e| e.to_string())
        }
        "stats" => {
            let provider = provider.as_ref().ok_or("no tree loaded")?;
            Ok(serde_json::json!({
                "single_calls": provider.single_calls(),
                "batch_calls": provider.batch_calls(),
            }))
        }
        "ping" => Ok(serde_json::Value::String("pong".to_owned())),
        _ => Err(format!("unknown method: {method}")),
    }
}

fn main() {
    let args = Args::parse();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let mut provider: Option<SimulatedProvider> = None;

    if args.verbose {
        eprintln!("uiaops-worker: ready");
    }

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                if args.verbose {
                    eprintln!("uiaops-worker: stdin read error: {e}");
                }
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let req: Request = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                // Parse error -- use id=0 since we can't extract it.
                let resp = Response {
                    id: 0,
                    result: None,
                    error: Some(format!("invalid JSON: {e}")),
                };
                if let Ok(json) = serde_json::to_string(&resp) {
                    let _ = writeln!(stdout, "{json}");
                    let _ = stdout.flush();
                }
                continue;
            }
        };

        let resp = match dispatch(&mut provider, &req.method, &req.params) {
            Ok(result) => Response {
                id: req.id,
                result: Some(result),
                error: None,
            },
            Err(error) => Response {
                id: req.id,
                result: None,
                error: Some(error),
            },
        };

        if let Ok(json) = serde_json::to_string(&resp) {
            let _ = writeln!(stdout, "{json}");
        } else {
            // Serialization failed -- send minimal error response.
            let _ = writeln!(
                stdout,
                r#"{{"id":{},"error":"response serialization failed"}}"#,
                req.id
            );
        }
        let _ = stdout.flush();
    }
}
