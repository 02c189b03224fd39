//! Process-wide abstraction state.
//!
//! The execution mode and the provider handle are global to the process
//! between [`initialize`] and [`cleanup`].  The pair must bracket all use of
//! the abstraction; anything outside the bracket fails with an
//! initialization error.
//!
//! # Thread safety
//!
//! State lives behind a `parking_lot::RwLock`.  Concurrent readers are fine;
//! `initialize`/`cleanup` are single-writer, and a second `initialize`
//! without an intervening `cleanup` is an error rather than a silent
//! reconfiguration.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::OperationError;
use crate::provider::AutomationProvider;

/// How issued operations reach the provider.  Fixed from `initialize` until
/// `cleanup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One synchronous cross-process call per operation, in program order.
    Local,
    /// Operations are recorded and submitted as a single batched call at
    /// scope resolution.
    Remote,
}

struct AbstractionContext {
    mode: ExecutionMode,
    provider: Arc<dyn AutomationProvider>,
}

static CONTEXT: RwLock<Option<AbstractionContext>> = RwLock::new(None);

/// Establish the process-wide mode and provider.
///
/// `use_remote_operations = false` selects [`ExecutionMode::Local`], `true`
/// selects [`ExecutionMode::Remote`].  Fails if already initialized.
pub fn initialize(
    use_remote_operations: bool,
    provider: Arc<dyn AutomationProvider>,
) -> Result<(), OperationError> {
    let mode = if use_remote_operations {
        ExecutionMode::Remote
    } else {
        ExecutionMode::Local
    };

    let mut guard = CONTEXT.write();
    if guard.is_some() {
        return Err(OperationError::Initialization(
            "already initialized; call cleanup() before re-initializing".into(),
        ));
    }
    *guard = Some(AbstractionContext { mode, provider });
    log::debug!("operation abstraction initialized in {mode:?} mode");
    Ok(())
}

/// Release the process-wide state.  Fails if not initialized.
pub fn cleanup() -> Result<(), OperationError> {
    let mut guard = CONTEXT.write();
    match guard.take() {
        Some(context) => {
            log::debug!("operation abstraction cleaned up ({:?} mode)", context.mode);
            Ok(())
        }
        None => Err(OperationError::Initialization(
            "cleanup() called without a matching initialize()".into(),
        )),
    }
}

/// The currently configured execution mode.
pub fn execution_mode() -> Result<ExecutionMode, OperationError> {
    CONTEXT
        .read()
        .as_ref()
        .map(|context| context.mode)
        .ok_or_else(not_initialized)
}

/// Run `f` against the configured provider.
pub(crate) fn with_provider<R>(
    f: impl FnOnce(&dyn AutomationProvider) -> R,
) -> Result<R, OperationError> {
    let guard = CONTEXT.read();
    let context = guard.as_ref().ok_or_else(not_initialized)?;
    Ok(f(context.provider.as_ref()))
}

fn not_initialized() -> OperationError {
    OperationError::Initialization(
        "operation abstraction is not initialized; call initialize() first".into(),
    )
}
