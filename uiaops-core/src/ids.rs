//! Identifier vocabularies shared by both execution modes.
//!
//! Property and pattern ids are closed enums rather than raw integers: they
//! travel inside serialized instructions, and a closed set keeps the wire
//! format self-describing.

use serde::{Deserialize, Serialize};

/// Properties an element can expose or prefetch via a cache request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PropertyId {
    Name,
    AutomationId,
    ControlType,
    LocalizedControlType,
    ClassName,
    BoundingRectangle,
    IsOffscreen,
    IsEnabled,
    IsControlElement,
    HasKeyboardFocus,
    IsKeyboardFocusable,
    AcceleratorKey,
}

/// Control patterns an element can support or prefetch via a cache request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PatternId {
    Invoke,
    Toggle,
    Value,
    ExpandCollapse,
    SelectionItem,
    Text,
}

/// Tree navigation directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationDirection {
    Parent,
    FirstChild,
    LastChild,
    NextSibling,
    PreviousSibling,
}

/// Text-selection capability reported by the text pattern.
///
/// The discriminants match the provider-side integer encoding, so the value
/// round-trips through [`AutomationValue::Int`](crate::value::AutomationValue).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum SupportedTextSelection {
    None = 0,
    #[default]
    Single = 1,
    Multiple = 2,
}

impl SupportedTextSelection {
    /// Decode the provider-side integer encoding.
    ///
    /// Returns `None` for out-of-range values.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(SupportedTextSelection::None),
            1 => Some(SupportedTextSelection::Single),
            2 => Some(SupportedTextSelection::Multiple),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_text_selection_round_trip() {
        for sts in [
            SupportedTextSelection::None,
            SupportedTextSelection::Single,
            SupportedTextSelection::Multiple,
        ] {
            assert_eq!(SupportedTextSelection::from_i32(sts as i32), Some(sts));
        }
        assert_eq!(SupportedTextSelection::from_i32(3), None);
        assert_eq!(SupportedTextSelection::from_i32(-1), None);
    }

    #[test]
    fn test_ids_serialize_as_names() {
        let json = serde_json::to_string(&PropertyId::Name).unwrap();
        assert_eq!(json, "\"Name\"");
        let json = serde_json::to_string(&PatternId::Text).unwrap();
        assert_eq!(json, "\"Text\"");
        let back: PatternId = serde_json::from_str("\"ExpandCollapse\"").unwrap();
        assert_eq!(back, PatternId::ExpandCollapse);
    }
}
