//! Operation scope: the recording/execution context.
//!
//! A scope groups operations that resolve together.  In local mode the
//! operations have already executed eagerly by the time `resolve` runs, so
//! resolution is a pass-through.  In remote mode the scope owns the ordered
//! recording; `resolve` compiles it into a [`RemoteProgram`], submits it as
//! one atomic cross-process call, and fans the raw results back out into the
//! bound wrapper values.
//!
//! # Thread confinement
//!
//! Exactly one scope is current per thread, tracked in a thread-local slot.
//! The scope itself is `!Send` (the `PhantomData<*const ()>` field), so a
//! recording can never be mutated from two threads.  Nested scope creation
//! while one is unresolved is disallowed and fails with a `ScopeState`
//! error.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::context::ExecutionMode;
use crate::errors::OperationError;
use crate::program::{Instruction, OperandId, Operation, RemoteProgram};
use crate::value::ElementHandle;
use crate::wrapper::{BoundValue, FromRemoteResult};

/// Identity of a scope, embedded in every placeholder it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ScopeId(u64);

impl ScopeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ScopeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Externally observable scope state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeStatus {
    /// Accepting recordings and bindings.
    Open,
    /// Resolution in progress.
    Resolving,
    /// Terminal: bound values are readable.
    Resolved,
    /// Terminal: resolution aborted or the scope exited unresolved; no
    /// bound value is safe to read.
    Failed,
}

#[derive(Default)]
struct Recording {
    instructions: Vec<Instruction>,
    /// Concrete elements already imported, deduplicated per handle.
    imports: HashMap<ElementHandle, OperandId>,
    /// Bindings in registration order (order is diagnostic only).
    bindings: Vec<BoundValue>,
    bound_keys: HashSet<usize>,
}

enum State {
    Open(Recording),
    Resolving,
    Resolved,
    Failed,
}

pub(crate) struct ScopeInner {
    id: ScopeId,
    state: Mutex<State>,
}

thread_local! {
    static CURRENT: RefCell<Option<Weak<ScopeInner>>> = const { RefCell::new(None) };
}

/// Handle through which wrapper operations append to the current recording.
pub(crate) struct RecordingHandle {
    inner: Arc<ScopeInner>,
}

impl RecordingHandle {
    pub(crate) fn scope_id(&self) -> ScopeId {
        self.inner.id
    }

    fn with_recording<R>(
        &self,
        f: impl FnOnce(&mut Recording) -> R,
    ) -> Result<R, OperationError> {
        match &mut *self.inner.state.lock() {
            State::Open(recording) => Ok(f(recording)),
            _ => Err(OperationError::ScopeState(
                "scope is no longer open for recording".into(),
            )),
        }
    }

    /// Append one instruction, returning its output placeholder.
    pub(crate) fn record(
        &self,
        operation: Operation<OperandId>,
    ) -> Result<OperandId, OperationError> {
        self.with_recording(|recording| {
            let out = OperandId(recording.instructions.len() as u32);
            recording.instructions.push(Instruction { out, operation });
            out
        })
    }

    /// Bring a concrete element into the recording, reusing the existing
    /// import when the handle was imported before.
    pub(crate) fn import_element(
        &self,
        element: ElementHandle,
    ) -> Result<OperandId, OperationError> {
        self.with_recording(|recording| {
            if let Some(&slot) = recording.imports.get(&element) {
                return slot;
            }
            let out = OperandId(recording.instructions.len() as u32);
            recording.instructions.push(Instruction {
                out,
                operation: Operation::ImportElement { element },
            });
            recording.imports.insert(element, out);
            out
        })
    }
}

/// The scope currently recording on this thread.
pub(crate) fn current_recording() -> Result<RecordingHandle, OperationError> {
    CURRENT.with(|current| {
        current
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| RecordingHandle { inner })
            .ok_or_else(|| {
                OperationError::ScopeState(
                    "no operation scope is open on this thread".into(),
                )
            })
    })
}

/// A bounded recording/execution context.  See the module docs.
pub struct OperationScope {
    inner: Arc<ScopeInner>,
    /// Thread confinement: the recording and the thread-local current-scope
    /// slot belong to the creating thread.
    _not_send: PhantomData<*const ()>,
}

impl std::fmt::Debug for OperationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationScope").finish_non_exhaustive()
    }
}

impl OperationScope {
    /// Open a new scope and make it current for this thread.
    ///
    /// Fails if the abstraction is not initialized, or if a scope is
    /// already open on this thread (nesting is disallowed).
    pub fn start_new() -> Result<OperationScope, OperationError> {
        crate::context::execution_mode()?;

        CURRENT.with(|current| {
            let mut slot = current.borrow_mut();
            if slot.as_ref().and_then(Weak::upgrade).is_some() {
                return Err(OperationError::ScopeState(
                    "an operation scope is already open on this thread; resolve it before starting another"
                        .into(),
                ));
            }
            let inner = Arc::new(ScopeInner {
                id: ScopeId::next(),
                state: Mutex::new(State::Open(Recording::default())),
            });
            *slot = Some(Arc::downgrade(&inner));
            Ok(OperationScope {
                inner,
                _not_send: PhantomData,
            })
        })
    }

    /// Externally observable state, for diagnostics.
    pub fn status(&self) -> ScopeStatus {
        match &*self.inner.state.lock() {
            State::Open(_) => ScopeStatus::Open,
            State::Resolving => ScopeStatus::Resolving,
            State::Resolved => ScopeStatus::Resolved,
            State::Failed => ScopeStatus::Failed,
        }
    }

    /// Register a wrapper value whose underlying result must be retained
    /// and readable after resolution.
    ///
    /// Only while the scope is Open.  Binding a deferred value owned by a
    /// different scope is an error.  Binding the same value twice is a
    /// no-op; registration order is preserved for diagnostics only.
    ///
    /// The `FromRemoteResult` bound is the returnability check: a type
    /// without the conversion (such as a cache request) is rejected at
    /// compile time, before any remote call could be attempted.
    pub fn bind_result<T: FromRemoteResult>(&self, value: &T) -> Result<(), OperationError> {
        let binding = value.bind_target();

        let mut state = self.inner.state.lock();
        let State::Open(recording) = &mut *state else {
            return Err(OperationError::ScopeState(
                "results can only be bound while the scope is open".into(),
            ));
        };

        if let Some((owner, _)) = binding.owner {
            if owner != self.inner.id {
                return Err(OperationError::ScopeState(
                    "value belongs to a different operation scope".into(),
                ));
            }
        }

        if !recording.bound_keys.insert(binding.key) {
            return Ok(());
        }
        log::debug!(
            "scope {:?}: bound result at position {}",
            self.inner.id,
            recording.bindings.len()
        );
        recording.bindings.push(binding);
        Ok(())
    }

    /// Execute the scope's pending work and materialize bound results.
    ///
    /// Local mode: operations already executed eagerly when issued, so this
    /// only transitions the scope to Resolved.  Remote mode: compiles the
    /// recording into a program, submits it as one atomic call, and
    /// fulfills every bound placeholder from the returned raw values.  On
    /// any failure the scope transitions to Failed, every bound placeholder
    /// is poisoned, and the single error propagates; no partial bindings
    /// survive.
    pub fn resolve(&self) -> Result<(), OperationError> {
        let mode = crate::context::execution_mode()?;

        let recording = {
            let mut state = self.inner.state.lock();
            match std::mem::replace(&mut *state, State::Resolving) {
                State::Open(recording) => recording,
                State::Resolving => {
                    return Err(OperationError::ScopeState(
                        "scope is already resolving".into(),
                    ));
                }
                State::Resolved => {
                    *state = State::Resolved;
                    return Err(OperationError::ScopeState(
                        "scope has already been resolved".into(),
                    ));
                }
                State::Failed => {
                    *state = State::Failed;
                    return Err(OperationError::ScopeState(
                        "scope has already failed".into(),
                    ));
                }
            }
        };

        // The scope stops accepting recordings either way; free the slot so
        // a follow-up scope can start.
        self.vacate_current();

        match mode {
            ExecutionMode::Local => {
                *self.inner.state.lock() = State::Resolved;
                log::debug!("scope {:?}: resolved (local pass-through)", self.inner.id);
                Ok(())
            }
            ExecutionMode::Remote => self.resolve_remote(recording),
        }
    }

    fn resolve_remote(&self, recording: Recording) -> Result<(), OperationError> {
        let program = RemoteProgram::new(recording.instructions);
        log::debug!(
            "scope {:?}: executing batch of {} instruction(s), {} binding(s)",
            self.inner.id,
            program.len(),
            recording.bindings.len()
        );

        let outcome = crate::context::with_provider(|provider| provider.execute_batch(&program))
            .and_then(|result| result.map_err(OperationError::from));

        let results = match outcome {
            Ok(results) => results,
            Err(err) => {
                self.fail(&recording.bindings);
                return Err(err);
            }
        };

        for binding in &recording.bindings {
            let Some((_, slot)) = binding.owner else {
                // Bound while already concrete; nothing to materialize.
                continue;
            };
            let Some(raw) = results.get(slot.index()).cloned() else {
                self.fail(&recording.bindings);
                return Err(OperationError::Transport(format!(
                    "batch returned {} result(s) but slot {} was bound",
                    results.len(),
                    slot.0
                )));
            };
            if let Err(err) = binding.target.fulfill(raw) {
                // Partial materialization is disallowed: one conversion
                // failure takes down the whole resolution.
                self.fail(&recording.bindings);
                return Err(err);
            }
        }

        *self.inner.state.lock() = State::Resolved;
        log::debug!("scope {:?}: resolved", self.inner.id);
        Ok(())
    }

    fn fail(&self, bindings: &[BoundValue]) {
        for binding in bindings {
            if binding.owner.is_some() {
                binding.target.poison();
            }
        }
        *self.inner.state.lock() = State::Failed;
    }

    fn vacate_current(&self) {
        CURRENT.with(|current| {
            let mut slot = current.borrow_mut();
            if let Some(weak) = slot.as_ref() {
                if weak.as_ptr() == Arc::as_ptr(&self.inner) {
                    *slot = None;
                }
            }
        });
    }
}

impl Drop for OperationScope {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock();
            if matches!(&*state, State::Open(_)) {
                if let State::Open(recording) = std::mem::replace(&mut *state, State::Failed) {
                    let pending = recording
                        .bindings
                        .iter()
                        .filter(|binding| binding.owner.is_some())
                        .count();
                    if pending > 0 {
                        log::warn!(
                            "scope {:?}: dropped unresolved; {pending} bound deferred result(s) poisoned",
                            self.inner.id
                        );
                    }
                    for binding in &recording.bindings {
                        if binding.owner.is_some() {
                            binding.target.poison();
                        }
                    }
                }
            }
        }
        self.vacate_current();
    }
}
