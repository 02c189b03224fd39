//! Operation vocabulary, compiled programs, and the replay executor.
//!
//! One [`Operation`] enum serves both execution modes through its operand
//! type parameter: local mode applies `Operation<AutomationValue>` (operands
//! resolved inline) immediately, remote mode records
//! `Operation<OperandId>` (operands reference earlier outputs by placeholder
//! id).  The replay executor bridges the two by substituting ids with the
//! values already produced, so both paths run identical provider logic.

use serde::{Deserialize, Serialize};

use crate::cache::CacheRequest;
use crate::ids::{NavigationDirection, PatternId, PropertyId};
use crate::provider::{AutomationProvider, ProviderError};
use crate::value::{AutomationValue, ElementHandle};

/// Placeholder id: the output slot of one instruction, referenced as an
/// operand by later instructions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OperandId(pub u32);

impl OperandId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One UI-tree operation, generic over how operands are represented.
///
/// Cache requests are serialized inline: they are input descriptors, not
/// operands, and can never appear as an output slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation<R> {
    /// Bring a concrete element into a recording.  The provider re-resolves
    /// the handle and yields it as an element value.
    ImportElement { element: ElementHandle },
    /// Fresh (non-cached) property fetch.
    GetProperty { target: R, property: PropertyId },
    /// Tree navigation, optionally materializing the result through a cache
    /// request.
    Navigate {
        target: R,
        direction: NavigationDirection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache: Option<CacheRequest>,
    },
    /// Fresh (non-cached) pattern retrieval.  Yields a null pattern when the
    /// element does not support it.
    GetPattern { target: R, pattern: PatternId },
    /// Text pattern: the range spanning the whole document.
    DocumentRange { pattern: R },
    /// Text pattern: selection capability as its integer encoding.
    SupportedTextSelection { pattern: R },
    /// Text range: the innermost element enclosing the range, optionally
    /// materialized through a cache request.
    EnclosingElement {
        range: R,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache: Option<CacheRequest>,
    },
    /// Text range: the range's text, truncated to `max_length` characters.
    /// A negative `max_length` means no limit.
    RangeText { range: R, max_length: i32 },
}

impl<R> Operation<R> {
    /// Rewrite operands through `f`, keeping everything else intact.
    pub fn map_operands<R2, E>(
        &self,
        mut f: impl FnMut(&R) -> Result<R2, E>,
    ) -> Result<Operation<R2>, E> {
        Ok(match self {
            Operation::ImportElement { element } => Operation::ImportElement { element: *element },
            Operation::GetProperty { target, property } => Operation::GetProperty {
                target: f(target)?,
                property: *property,
            },
            Operation::Navigate {
                target,
                direction,
                cache,
            } => Operation::Navigate {
                target: f(target)?,
                direction: *direction,
                cache: cache.clone(),
            },
            Operation::GetPattern { target, pattern } => Operation::GetPattern {
                target: f(target)?,
                pattern: *pattern,
            },
            Operation::DocumentRange { pattern } => Operation::DocumentRange {
                pattern: f(pattern)?,
            },
            Operation::SupportedTextSelection { pattern } => Operation::SupportedTextSelection {
                pattern: f(pattern)?,
            },
            Operation::EnclosingElement { range, cache } => Operation::EnclosingElement {
                range: f(range)?,
                cache: cache.clone(),
            },
            Operation::RangeText { range, max_length } => Operation::RangeText {
                range: f(range)?,
                max_length: *max_length,
            },
        })
    }
}

/// One compiled operation record: callee + arguments + output placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub out: OperandId,
    pub operation: Operation<OperandId>,
}

/// An ordered operation list compiled from a scope's recording, transmitted
/// once and executed atomically on the provider side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteProgram {
    pub instructions: Vec<Instruction>,
}

impl RemoteProgram {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        RemoteProgram { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize from the JSON wire format.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Replay a program in recorded order against a provider's `apply`.
///
/// Output slots must be dense and in order, and operands may only reference
/// instructions that already ran -- dependencies replay in exactly the order
/// they were recorded, never re-derived.  The first failure aborts the whole
/// replay, which is what makes the default batch atomic: no partial result
/// vector ever escapes.
pub fn replay<P: AutomationProvider + ?Sized>(
    provider: &P,
    program: &RemoteProgram,
) -> Result<Vec<AutomationValue>, ProviderError> {
    let mut results: Vec<AutomationValue> = Vec::with_capacity(program.len());

    for (index, instruction) in program.instructions.iter().enumerate() {
        if instruction.out.index() != index {
            return Err(ProviderError::MalformedProgram(format!(
                "instruction {index} declares output slot {}",
                instruction.out.0
            )));
        }

        let resolved = instruction.operation.map_operands(|operand| {
            results
                .get(operand.index())
                .cloned()
                .ok_or_else(|| {
                    ProviderError::MalformedProgram(format!(
                        "instruction {index} references slot {} before it is produced",
                        operand.0
                    ))
                })
        })?;

        results.push(provider.apply(&resolved)?);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    impl AutomationProvider for EchoProvider {
        fn apply(
            &self,
            operation: &Operation<AutomationValue>,
        ) -> Result<AutomationValue, ProviderError> {
            // Enough behavior to exercise replay plumbing.
            match operation {
                Operation::ImportElement { element } => Ok(AutomationValue::Int(element.0 as i32)),
                Operation::GetProperty { target, .. } => Ok(target.clone()),
                _ => Err(ProviderError::InvalidOperand("unsupported".into())),
            }
        }
    }

    fn import(out: u32, handle: u64) -> Instruction {
        Instruction {
            out: OperandId(out),
            operation: Operation::ImportElement {
                element: ElementHandle(handle),
            },
        }
    }

    #[test]
    fn test_replay_in_order() {
        let program = RemoteProgram::new(vec![
            import(0, 41),
            Instruction {
                out: OperandId(1),
                operation: Operation::GetProperty {
                    target: OperandId(0),
                    property: PropertyId::Name,
                },
            },
        ]);

        let results = replay(&EchoProvider, &program).unwrap();
        assert_eq!(results, vec![AutomationValue::Int(41), AutomationValue::Int(41)]);
    }

    #[test]
    fn test_replay_rejects_sparse_outputs() {
        let program = RemoteProgram::new(vec![import(1, 5)]);
        let err = replay(&EchoProvider, &program).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedProgram(_)));
    }

    #[test]
    fn test_replay_rejects_forward_references() {
        let program = RemoteProgram::new(vec![Instruction {
            out: OperandId(0),
            operation: Operation::GetProperty {
                target: OperandId(3),
                property: PropertyId::Name,
            },
        }]);
        let err = replay(&EchoProvider, &program).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedProgram(_)));
    }

    #[test]
    fn test_program_json_round_trip() {
        let mut cache = CacheRequest::new();
        cache.add_property(PropertyId::Name);
        cache.add_pattern(PatternId::Text);

        let program = RemoteProgram::new(vec![
            import(0, 7),
            Instruction {
                out: OperandId(1),
                operation: Operation::Navigate {
                    target: OperandId(0),
                    direction: NavigationDirection::Parent,
                    cache: Some(cache),
                },
            },
        ]);

        let json = program.to_json().unwrap();
        let back = RemoteProgram::from_json(&json).unwrap();
        assert_eq!(back, program);
    }

    #[test]
    fn test_cache_request_is_inline_not_an_operand() {
        let program = RemoteProgram::new(vec![Instruction {
            out: OperandId(0),
            operation: Operation::Navigate {
                target: OperandId(0),
                direction: NavigationDirection::Parent,
                cache: None,
            },
        }]);
        let json = program.to_json().unwrap();
        // The cache field is omitted entirely when absent; it never occupies
        // an output slot.
        assert!(!json.contains("cache"));
    }
}
