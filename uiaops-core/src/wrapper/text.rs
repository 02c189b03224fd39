//! Text pattern and text range wrappers.

use crate::cache::CacheRequest;
use crate::errors::OperationError;
use crate::program::{OperandId, Operation};
use crate::scope::RecordingHandle;
use crate::value::{AutomationValue, PatternHandle, TextRangeHandle};
use crate::wrapper::element::UiaElement;
use crate::wrapper::{issue, wrap, OperandCell, RemotePayload, UiaInt, UiaString, WrapperValue};

/// Native payload of a retrieved text pattern.  `None` when the element
/// does not support the pattern.
pub(crate) struct PatternData {
    handle: Option<PatternHandle>,
}

impl RemotePayload for PatternData {
    fn from_raw(raw: AutomationValue) -> Result<Self, OperationError> {
        Ok(PatternData {
            handle: raw.into_pattern()?,
        })
    }
}

/// Native payload of a text range.
pub(crate) struct RangeData {
    handle: TextRangeHandle,
}

impl RemotePayload for RangeData {
    fn from_raw(raw: AutomationValue) -> Result<Self, OperationError> {
        Ok(RangeData {
            handle: raw.into_text_range()?,
        })
    }
}

/// The text pattern of an element.
///
/// Null when the element does not support text -- calling range operations
/// on a null pattern is a provider error, so callers that can receive
/// unsupporting elements check [`is_null`](UiaTextPattern::is_null) first.
#[derive(Clone, Debug)]
pub struct UiaTextPattern {
    cell: OperandCell<PatternData>,
}

impl WrapperValue for UiaTextPattern {
    type Payload = PatternData;

    fn from_cell(cell: OperandCell<PatternData>) -> Self {
        UiaTextPattern { cell }
    }

    fn cell(&self) -> &OperandCell<PatternData> {
        &self.cell
    }
}

impl UiaTextPattern {
    /// Whether the pattern is null (element does not support text).
    /// Fails for deferred values.
    pub fn is_null(&self) -> Result<bool, OperationError> {
        self.cell.with_concrete(|data| data.handle.is_none())
    }

    /// The range spanning the pattern's whole document.
    pub fn get_document_range(&self) -> Result<UiaTextRange, OperationError> {
        wrap(issue(
            || {
                Ok(Operation::DocumentRange {
                    pattern: self.operand_value()?,
                })
            },
            |recording| {
                Ok(Operation::DocumentRange {
                    pattern: self.operand_id(recording)?,
                })
            },
        )?)
    }

    /// The pattern's selection capability, in its provider-side integer
    /// encoding (decode with
    /// [`SupportedTextSelection::from_i32`](crate::ids::SupportedTextSelection::from_i32)).
    pub fn get_supported_text_selection(&self) -> Result<UiaInt, OperationError> {
        wrap(issue(
            || {
                Ok(Operation::SupportedTextSelection {
                    pattern: self.operand_value()?,
                })
            },
            |recording| {
                Ok(Operation::SupportedTextSelection {
                    pattern: self.operand_id(recording)?,
                })
            },
        )?)
    }

    fn operand_value(&self) -> Result<AutomationValue, OperationError> {
        self.cell
            .with_concrete(|data| AutomationValue::Pattern(data.handle))
    }

    fn operand_id(&self, recording: &RecordingHandle) -> Result<OperandId, OperationError> {
        self.cell.recorded_slot(recording)?.ok_or_else(|| {
            OperationError::Conversion(
                "a resolved pattern cannot re-enter a later recording; re-fetch it from its element"
                    .into(),
            )
        })
    }
}

/// A contiguous span of text inside a text pattern's document.
#[derive(Clone, Debug)]
pub struct UiaTextRange {
    cell: OperandCell<RangeData>,
}

impl WrapperValue for UiaTextRange {
    type Payload = RangeData;

    fn from_cell(cell: OperandCell<RangeData>) -> Self {
        UiaTextRange { cell }
    }

    fn cell(&self) -> &OperandCell<RangeData> {
        &self.cell
    }
}

impl UiaTextRange {
    /// The innermost element enclosing this range, optionally materialized
    /// through a cache request.
    pub fn get_enclosing_element(
        &self,
        cache: Option<&CacheRequest>,
    ) -> Result<UiaElement, OperationError> {
        wrap(issue(
            || {
                Ok(Operation::EnclosingElement {
                    range: self.operand_value()?,
                    cache: cache.cloned(),
                })
            },
            |recording| {
                Ok(Operation::EnclosingElement {
                    range: self.operand_id(recording)?,
                    cache: cache.cloned(),
                })
            },
        )?)
    }

    /// The range's text, truncated to `max_length` characters.  A negative
    /// `max_length` means no limit.
    pub fn get_text(&self, max_length: i32) -> Result<UiaString, OperationError> {
        wrap(issue(
            || {
                Ok(Operation::RangeText {
                    range: self.operand_value()?,
                    max_length,
                })
            },
            |recording| {
                Ok(Operation::RangeText {
                    range: self.operand_id(recording)?,
                    max_length,
                })
            },
        )?)
    }

    fn operand_value(&self) -> Result<AutomationValue, OperationError> {
        self.cell
            .with_concrete(|data| AutomationValue::TextRange(data.handle))
    }

    fn operand_id(&self, recording: &RecordingHandle) -> Result<OperandId, OperationError> {
        self.cell.recorded_slot(recording)?.ok_or_else(|| {
            OperationError::Conversion(
                "a resolved text range cannot re-enter a later recording; re-fetch it from its pattern"
                    .into(),
            )
        })
    }
}
