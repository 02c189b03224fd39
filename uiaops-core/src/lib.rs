//! `uiaops_core` -- dual local/remote execution abstraction for UI-tree
//! operations.
//!
//! A client describes a sequence of UI-tree queries and pattern invocations
//! once; the abstraction executes the sequence either as individual
//! synchronous cross-process calls (local mode) or as a single batched
//! cross-process call with identical effect (remote mode).  The mode is
//! chosen at [`initialize`](context::initialize) time and is transparent to
//! the code issuing operations.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`errors`] | `OperationError` enum via `thiserror` |
//! | [`ids`] | Property/pattern/navigation identifier vocabularies |
//! | [`value`] | Raw wire values, handles, cached element data |
//! | [`cache`] | `CacheRequest` prefetch descriptor |
//! | [`program`] | Operation vocabulary, compiled programs, replay executor |
//! | [`provider`] | `AutomationProvider` collaborator boundary |
//! | [`context`] | Process-wide initialize/cleanup and execution mode |
//! | [`scope`] | `OperationScope` recording/binding/resolution |
//! | [`wrapper`] | Typed wrapper values and the returnability trait |
//! | [`simtree`] | In-process simulated provider for tests and tooling |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use uiaops_core::scope::OperationScope;
//! use uiaops_core::simtree::{SimNode, SimulatedProvider};
//! use uiaops_core::wrapper::UiaElement;
//!
//! let provider = Arc::new(SimulatedProvider::new(
//!     SimNode::named("Root").with_child(SimNode::named("Greeting")),
//! ));
//! let child = provider.find_by_name("Greeting").unwrap();
//!
//! uiaops_core::context::initialize(false /*use_remote_operations*/, provider)?;
//!
//! let scope = OperationScope::start_new()?;
//! let element = UiaElement::from_handle(child);
//! let name = element.get_name(false /*use_cached_api*/)?;
//! scope.bind_result(&name)?;
//! scope.resolve()?;
//!
//! assert_eq!(name.get()?, Some("Greeting".to_owned()));
//!
//! uiaops_core::context::cleanup()?;
//! # Ok::<(), uiaops_core::errors::OperationError>(())
//! ```

pub mod cache;
pub mod context;
pub mod errors;
pub mod ids;
pub mod program;
pub mod provider;
pub mod scope;
pub mod simtree;
pub mod value;
pub mod wrapper;
