//! The collaborator boundary: an externally supplied automation service.
//!
//! The abstraction never talks to a UI tree directly.  It hands every
//! request to an [`AutomationProvider`]: one [`apply`] call per operation in
//! local mode, or one [`execute_batch`] call for a whole compiled program in
//! remote mode.  Both are opaque request/response operations that can fail.
//!
//! [`apply`]: AutomationProvider::apply
//! [`execute_batch`]: AutomationProvider::execute_batch

use thiserror::Error;

use crate::program::{replay, Operation, RemoteProgram};
use crate::value::AutomationValue;

/// Provider-side failure.  Crossing back into the abstraction these become
/// [`OperationError::Transport`](crate::errors::OperationError::Transport).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// An operand referenced an element/pattern/range the provider does not
    /// know (stale handle, wrong provider).
    #[error("unknown handle: {0}")]
    UnknownHandle(String),

    /// An operand had the wrong kind for the operation, or was null where a
    /// live target is required.
    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    /// A batched program failed shape validation (non-dense outputs,
    /// forward references).
    #[error("malformed program: {0}")]
    MalformedProgram(String),

    /// The underlying transport failed.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// An automation service the abstraction can execute against.
///
/// `apply` is the single synchronous cross-process call of local mode.
/// `execute_batch` is the single atomic call of remote mode: either every
/// instruction runs and every output is produced, or the call fails as a
/// whole and no output is returned.  The default implementation replays the
/// program in recorded order against `apply`, which gives any provider
/// correct atomic-failure semantics; a wire-backed provider overrides it to
/// submit the serialized program in one round trip.
pub trait AutomationProvider: Send + Sync {
    /// Execute one operation with fully resolved operands.
    fn apply(&self, operation: &Operation<AutomationValue>)
        -> Result<AutomationValue, ProviderError>;

    /// Execute a compiled program atomically, returning one raw value per
    /// instruction slot.
    fn execute_batch(
        &self,
        program: &RemoteProgram,
    ) -> Result<Vec<AutomationValue>, ProviderError> {
        replay(self, program)
    }
}
