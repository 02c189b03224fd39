//! Error types for `uiaops_core`.
//!
//! All failures are funnelled through [`OperationError`], which uses
//! `thiserror` for `Display` and `Error` derives.  Provider-side failures
//! ([`ProviderError`](crate::provider::ProviderError)) convert into the
//! `Transport` variant at the abstraction boundary.

use thiserror::Error;

use crate::provider::ProviderError;

/// Top-level error type for the `uiaops_core` library.
///
/// Each variant corresponds to a distinct failure class.  Returnability
/// violations (binding a non-returnable type such as a cache request) have
/// no variant here: they are rejected at compile time by the
/// [`FromRemoteResult`](crate::wrapper::FromRemoteResult) bound on
/// [`bind_result`](crate::scope::OperationScope::bind_result).
#[derive(Debug, Error)]
pub enum OperationError {
    /// The abstraction was used before `initialize` or after `cleanup`,
    /// or the initialize/cleanup pairing was violated.
    #[error("InitializationError: {0}")]
    Initialization(String),

    /// A scope was used in a state that does not permit the operation:
    /// binding into a non-Open scope, resolving twice, nesting scopes,
    /// binding a value owned by a different scope, or reading a value whose
    /// scope never resolved.
    #[error("ScopeStateError: {0}")]
    ScopeState(String),

    /// A cached-style read (`use_cached_api = true`) hit a property or
    /// pattern that was not part of the cache request used to materialize
    /// the element.  A logic error in the caller's cache planning, never a
    /// transient fault, so no fresh fetch is attempted.
    #[error("UncachedAccessError: {0}")]
    UncachedAccess(String),

    /// The underlying cross-process call failed.  In remote mode this
    /// aborts the entire batch.
    #[error("TransportError: {0}")]
    Transport(String),

    /// A raw result could not be converted into the bound wrapper type.
    #[error("ConversionError: {0}")]
    Conversion(String),
}

/// Provider failures surface to callers as transport errors: from the
/// abstraction's point of view the request/response operation failed,
/// whatever the provider-side cause.
impl From<ProviderError> for OperationError {
    fn from(err: ProviderError) -> Self {
        OperationError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let cases = [
            (
                OperationError::Initialization("x".into()),
                "InitializationError",
            ),
            (OperationError::ScopeState("x".into()), "ScopeStateError"),
            (
                OperationError::UncachedAccess("x".into()),
                "UncachedAccessError",
            ),
            (OperationError::Transport("x".into()), "TransportError"),
            (OperationError::Conversion("x".into()), "ConversionError"),
        ];
        for (err, prefix) in cases {
            assert!(
                err.to_string().starts_with(prefix),
                "{err} should start with {prefix}"
            );
        }
    }

    #[test]
    fn test_provider_error_maps_to_transport() {
        let err: OperationError = ProviderError::Transport("pipe closed".into()).into();
        assert!(matches!(err, OperationError::Transport(_)));
        assert!(err.to_string().contains("pipe closed"));
    }
}
