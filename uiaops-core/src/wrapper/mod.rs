//! Wrapper value model: typed handles over the dual eager/deferred core.
//!
//! Every wrapper type ([`UiaElement`], [`UiaTextPattern`], [`UiaTextRange`],
//! [`UiaString`], [`UiaBool`], [`UiaInt`]) holds a shared cell that is either
//! *concrete* (backed by a resolved native value, usable immediately) or
//! *pending* (an opaque placeholder tied to an operation scope, unreadable
//! until that scope resolves).  Local mode only ever produces concrete
//! values; remote mode produces pending values that the scope's resolution
//! fulfills in place.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`element`] | [`UiaElement`]: properties, navigation, pattern retrieval |
//! | [`text`] | [`UiaTextPattern`] and [`UiaTextRange`] |

pub mod element;
pub mod text;

pub use element::UiaElement;
pub use text::{UiaTextPattern, UiaTextRange};

use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::ExecutionMode;
use crate::errors::OperationError;
use crate::program::{OperandId, Operation};
use crate::scope::{current_recording, RecordingHandle, ScopeId};
use crate::value::AutomationValue;

// ---------------------------------------------------------------------------
// Shared cell machinery
// ---------------------------------------------------------------------------

/// The tagged eager/deferred state behind every wrapper value.
pub(crate) enum ValueState<N> {
    /// Backed by a resolved native value.
    Concrete(N),
    /// Output placeholder of a recorded instruction; invalid to dereference
    /// until the owning scope resolves it.
    Pending { scope: ScopeId, slot: OperandId },
    /// The owning scope failed or exited without resolving.  Reads fail
    /// loudly instead of observing stale data.
    Poisoned,
}

/// Shared, interiorly mutable cell.  Cloning a wrapper clones the handle,
/// not the state, so the scope's resolution is visible through every copy.
pub(crate) struct OperandCell<N> {
    state: Arc<RwLock<ValueState<N>>>,
}

impl<N> Clone for OperandCell<N> {
    fn clone(&self) -> Self {
        OperandCell {
            state: Arc::clone(&self.state),
        }
    }
}

impl<N> std::fmt::Debug for OperandCell<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match &*self.state.read() {
            ValueState::Concrete(_) => "Concrete",
            ValueState::Pending { .. } => "Pending",
            ValueState::Poisoned => "Poisoned",
        };
        f.debug_struct("OperandCell").field("state", &tag).finish()
    }
}

impl<N> OperandCell<N> {
    pub(crate) fn concrete(native: N) -> Self {
        OperandCell {
            state: Arc::new(RwLock::new(ValueState::Concrete(native))),
        }
    }

    pub(crate) fn pending(scope: ScopeId, slot: OperandId) -> Self {
        OperandCell {
            state: Arc::new(RwLock::new(ValueState::Pending { scope, slot })),
        }
    }

    /// Identity of the shared state, used for idempotent binding.
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.state) as *const () as usize
    }

    /// Read the concrete native value, or fail loudly for deferred and
    /// poisoned states.
    pub(crate) fn with_concrete<R>(
        &self,
        f: impl FnOnce(&N) -> R,
    ) -> Result<R, OperationError> {
        match &*self.state.read() {
            ValueState::Concrete(native) => Ok(f(native)),
            ValueState::Pending { .. } => Err(OperationError::ScopeState(
                "deferred result has not been materialized; resolve its owning scope first"
                    .into(),
            )),
            ValueState::Poisoned => Err(OperationError::ScopeState(
                "owning scope failed or exited without resolving; result is unavailable".into(),
            )),
        }
    }

    /// The `(scope, slot)` pair if this value is still a placeholder.
    pub(crate) fn pending_owner(&self) -> Option<(ScopeId, OperandId)> {
        match &*self.state.read() {
            ValueState::Pending { scope, slot } => Some((*scope, *slot)),
            _ => None,
        }
    }

    /// The operand id this value contributes to a recording owned by
    /// `recording`'s scope.  Concrete values yield `None` (the caller
    /// decides whether the kind can be imported); placeholders from a
    /// different scope are rejected.
    pub(crate) fn recorded_slot(
        &self,
        recording: &RecordingHandle,
    ) -> Result<Option<OperandId>, OperationError> {
        match &*self.state.read() {
            ValueState::Concrete(_) => Ok(None),
            ValueState::Pending { scope, slot } => {
                if *scope != recording.scope_id() {
                    return Err(OperationError::ScopeState(
                        "value belongs to a different operation scope".into(),
                    ));
                }
                Ok(Some(*slot))
            }
            ValueState::Poisoned => Err(OperationError::ScopeState(
                "owning scope failed or exited without resolving; result is unavailable".into(),
            )),
        }
    }
}

/// How a raw batch result becomes a native payload.
pub(crate) trait RemotePayload: Sized + Send + Sync + 'static {
    fn from_raw(raw: AutomationValue) -> Result<Self, OperationError>;
}

/// Internal face shared by all wrapper types: payload type, cell plumbing.
pub(crate) trait WrapperValue: Sized {
    type Payload: RemotePayload;

    fn from_cell(cell: OperandCell<Self::Payload>) -> Self;
    fn cell(&self) -> &OperandCell<Self::Payload>;
}

// ---------------------------------------------------------------------------
// Returnability
// ---------------------------------------------------------------------------

/// In-place materialization target held by a scope's binding table.
pub(crate) trait ResolveTarget: Send + Sync {
    /// Overwrite the cell with the converted raw result.
    fn fulfill(&self, raw: AutomationValue) -> Result<(), OperationError>;

    /// Overwrite the cell with the poisoned state.
    fn poison(&self);
}

impl<N: RemotePayload> ResolveTarget for OperandCell<N> {
    fn fulfill(&self, raw: AutomationValue) -> Result<(), OperationError> {
        let native = N::from_raw(raw)?;
        *self.state.write() = ValueState::Concrete(native);
        Ok(())
    }

    fn poison(&self) {
        *self.state.write() = ValueState::Poisoned;
    }
}

/// A wrapper value registered as a scope result.
///
/// Constructed only by this crate, which is what keeps
/// [`FromRemoteResult`] limited to the wrapper types: a foreign type has no
/// way to produce one.
pub struct BoundValue {
    pub(crate) key: usize,
    pub(crate) owner: Option<(ScopeId, OperandId)>,
    pub(crate) target: Box<dyn ResolveTarget>,
}

/// Capability of being produced as the output of a remote batch.
///
/// Implementing this trait is exactly what makes a type legal to pass to
/// [`bind_result`](crate::scope::OperationScope::bind_result); the check
/// happens at compile time, long before any cross-process call is attempted.
/// [`CacheRequest`](crate::cache::CacheRequest) deliberately does not
/// implement it: a cache request configures how a request is made, it is not
/// itself a result.
pub trait FromRemoteResult: Sized {
    /// Convert a raw batch result into a concrete wrapper value.
    fn from_remote_result(raw: AutomationValue) -> Result<Self, OperationError>;

    #[doc(hidden)]
    fn bind_target(&self) -> BoundValue;
}

impl<T: WrapperValue> FromRemoteResult for T {
    fn from_remote_result(raw: AutomationValue) -> Result<Self, OperationError> {
        let native = T::Payload::from_raw(raw)?;
        Ok(T::from_cell(OperandCell::concrete(native)))
    }

    fn bind_target(&self) -> BoundValue {
        let cell = self.cell();
        BoundValue {
            key: cell.key(),
            owner: cell.pending_owner(),
            target: Box::new(cell.clone()),
        }
    }
}

/// Compile-time returnability probe.
///
/// Instantiating this for a type asserts, at compile time, that the type can
/// be returned from a remote batch:
///
/// ```
/// uiaops_core::wrapper::can_be_returned::<uiaops_core::wrapper::UiaElement>();
/// ```
///
/// A cache request is an input descriptor rather than a result, so it is
/// statically rejected:
///
/// ```compile_fail
/// uiaops_core::wrapper::can_be_returned::<uiaops_core::cache::CacheRequest>();
/// ```
pub const fn can_be_returned<T: FromRemoteResult>() {}

// ---------------------------------------------------------------------------
// Mode dispatch
// ---------------------------------------------------------------------------

/// Outcome of issuing one operation: executed now (local) or recorded for
/// later (remote).
pub(crate) enum Issued {
    Value(AutomationValue),
    Pending { scope: ScopeId, slot: OperandId },
}

/// Issue one operation through the configured execution mode.
///
/// `local` builds the operation with operands resolved inline; `remote`
/// builds it with operand ids against the current recording.  Both closures
/// describe the same operation -- only the operand representation differs,
/// which is what keeps the two modes behaviorally identical.
pub(crate) fn issue(
    local: impl FnOnce() -> Result<Operation<AutomationValue>, OperationError>,
    remote: impl FnOnce(&RecordingHandle) -> Result<Operation<OperandId>, OperationError>,
) -> Result<Issued, OperationError> {
    match crate::context::execution_mode()? {
        ExecutionMode::Local => {
            let operation = local()?;
            let raw = crate::context::with_provider(|provider| provider.apply(&operation))??;
            Ok(Issued::Value(raw))
        }
        ExecutionMode::Remote => {
            let recording = current_recording()?;
            let operation = remote(&recording)?;
            let slot = recording.record(operation)?;
            Ok(Issued::Pending {
                scope: recording.scope_id(),
                slot,
            })
        }
    }
}

/// Wrap an issued outcome into a wrapper value of type `T`.
pub(crate) fn wrap<T: WrapperValue>(issued: Issued) -> Result<T, OperationError> {
    match issued {
        Issued::Value(raw) => T::from_remote_result(raw),
        Issued::Pending { scope, slot } => Ok(T::from_cell(OperandCell::pending(scope, slot))),
    }
}

// ---------------------------------------------------------------------------
// Primitive wrappers
// ---------------------------------------------------------------------------

impl RemotePayload for Option<String> {
    fn from_raw(raw: AutomationValue) -> Result<Self, OperationError> {
        raw.into_string()
    }
}

impl RemotePayload for bool {
    fn from_raw(raw: AutomationValue) -> Result<Self, OperationError> {
        raw.into_bool()
    }
}

impl RemotePayload for i32 {
    fn from_raw(raw: AutomationValue) -> Result<Self, OperationError> {
        raw.into_int()
    }
}

/// A string result.  `None` mirrors a null provider-side string.
#[derive(Clone, Debug)]
pub struct UiaString {
    cell: OperandCell<Option<String>>,
}

impl UiaString {
    /// The resolved string.  Fails for deferred and poisoned values.
    pub fn get(&self) -> Result<Option<String>, OperationError> {
        self.cell.with_concrete(Clone::clone)
    }
}

impl WrapperValue for UiaString {
    type Payload = Option<String>;

    fn from_cell(cell: OperandCell<Option<String>>) -> Self {
        UiaString { cell }
    }

    fn cell(&self) -> &OperandCell<Option<String>> {
        &self.cell
    }
}

impl From<Option<String>> for UiaString {
    fn from(value: Option<String>) -> Self {
        UiaString {
            cell: OperandCell::concrete(value),
        }
    }
}

/// A boolean result.
#[derive(Clone, Debug)]
pub struct UiaBool {
    cell: OperandCell<bool>,
}

impl UiaBool {
    /// The resolved boolean.  Fails for deferred and poisoned values.
    pub fn get(&self) -> Result<bool, OperationError> {
        self.cell.with_concrete(|value| *value)
    }
}

impl WrapperValue for UiaBool {
    type Payload = bool;

    fn from_cell(cell: OperandCell<bool>) -> Self {
        UiaBool { cell }
    }

    fn cell(&self) -> &OperandCell<bool> {
        &self.cell
    }
}

impl From<bool> for UiaBool {
    fn from(value: bool) -> Self {
        UiaBool {
            cell: OperandCell::concrete(value),
        }
    }
}

/// An integer result.
#[derive(Clone, Debug)]
pub struct UiaInt {
    cell: OperandCell<i32>,
}

impl UiaInt {
    /// The resolved integer.  Fails for deferred and poisoned values.
    pub fn get(&self) -> Result<i32, OperationError> {
        self.cell.with_concrete(|value| *value)
    }
}

impl WrapperValue for UiaInt {
    type Payload = i32;

    fn from_cell(cell: OperandCell<i32>) -> Self {
        UiaInt { cell }
    }

    fn cell(&self) -> &OperandCell<i32> {
        &self.cell
    }
}

impl From<i32> for UiaInt {
    fn from(value: i32) -> Self {
        UiaInt {
            cell: OperandCell::concrete(value),
        }
    }
}
