//! Raw values crossing the provider boundary.
//!
//! Everything here is owned and serializable -- no live references to
//! provider-side objects are held.  Handles are opaque tokens minted by the
//! provider; the abstraction only stores and replays them.

use serde::{Deserialize, Serialize};

use crate::errors::OperationError;
use crate::ids::{PatternId, PropertyId};

/// Opaque token identifying an element on the provider side.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ElementHandle(pub u64);

/// Opaque token identifying a resolved control pattern on the provider side.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PatternHandle(pub u64);

/// Opaque token identifying a text range on the provider side.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TextRangeHandle(pub u64);

/// A raw value produced by a provider call, local or batched.
///
/// This is the wire type: one entry per executed instruction comes back from
/// a batch, and local-mode calls return it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AutomationValue {
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
    /// `[left, top, right, bottom]` in screen coordinates.
    Rect([f64; 4]),
    Element(MaterializedElement),
    /// `None` means the element does not support the requested pattern.
    Pattern(Option<PatternHandle>),
    TextRange(TextRangeHandle),
}

impl AutomationValue {
    /// Short kind name for diagnostics and conversion errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AutomationValue::Null => "null",
            AutomationValue::Bool(_) => "bool",
            AutomationValue::Int(_) => "int",
            AutomationValue::Double(_) => "double",
            AutomationValue::String(_) => "string",
            AutomationValue::Rect(_) => "rect",
            AutomationValue::Element(_) => "element",
            AutomationValue::Pattern(_) => "pattern",
            AutomationValue::TextRange(_) => "text_range",
        }
    }

    fn conversion_error(&self, expected: &str) -> OperationError {
        OperationError::Conversion(format!(
            "expected {expected}, got {}",
            self.kind_name()
        ))
    }

    /// Interpret as an element; `Null` becomes a null element.
    pub fn into_element(self) -> Result<Option<MaterializedElement>, OperationError> {
        match self {
            AutomationValue::Element(element) => Ok(Some(element)),
            AutomationValue::Null => Ok(None),
            other => Err(other.conversion_error("element")),
        }
    }

    /// Interpret as a (possibly unsupported) pattern.
    pub fn into_pattern(self) -> Result<Option<PatternHandle>, OperationError> {
        match self {
            AutomationValue::Pattern(handle) => Ok(handle),
            AutomationValue::Null => Ok(None),
            other => Err(other.conversion_error("pattern")),
        }
    }

    /// Interpret as a text range.
    pub fn into_text_range(self) -> Result<TextRangeHandle, OperationError> {
        match self {
            AutomationValue::TextRange(handle) => Ok(handle),
            other => Err(other.conversion_error("text_range")),
        }
    }

    /// Interpret as a nullable string; `Null` becomes `None`.
    pub fn into_string(self) -> Result<Option<String>, OperationError> {
        match self {
            AutomationValue::String(s) => Ok(Some(s)),
            AutomationValue::Null => Ok(None),
            other => Err(other.conversion_error("string")),
        }
    }

    /// Interpret as a bool.
    pub fn into_bool(self) -> Result<bool, OperationError> {
        match self {
            AutomationValue::Bool(b) => Ok(b),
            other => Err(other.conversion_error("bool")),
        }
    }

    /// Interpret as an int.
    pub fn into_int(self) -> Result<i32, OperationError> {
        match self {
            AutomationValue::Int(i) => Ok(i),
            other => Err(other.conversion_error("int")),
        }
    }
}

/// An element as it crosses the process boundary: the provider-side handle
/// plus whatever data a cache request captured at materialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedElement {
    pub handle: ElementHandle,
    /// Present only when the element was materialized through a cache
    /// request; absent elements reject every cached-style read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<CachedData>,
}

impl MaterializedElement {
    /// An element handle with no cached data attached.
    pub fn bare(handle: ElementHandle) -> Self {
        MaterializedElement {
            handle,
            cached: None,
        }
    }
}

/// One prefetched property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedProperty {
    pub property: PropertyId,
    pub value: AutomationValue,
}

/// One probed pattern.  `handle` is `None` when the element does not
/// support the pattern -- the probe itself still counts as cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPattern {
    pub pattern: PatternId,
    pub handle: Option<PatternHandle>,
}

/// Data captured while materializing an element through a cache request.
///
/// Entries are stored in request order.  Lookups are linear -- cache
/// requests are a handful of ids, not a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedData {
    properties: Vec<CachedProperty>,
    patterns: Vec<CachedPattern>,
}

impl CachedData {
    pub fn new() -> Self {
        CachedData::default()
    }

    /// Record a prefetched property value (provider side).
    pub fn push_property(&mut self, property: PropertyId, value: AutomationValue) {
        self.properties.push(CachedProperty { property, value });
    }

    /// Record a pattern probe result (provider side).
    pub fn push_pattern(&mut self, pattern: PatternId, handle: Option<PatternHandle>) {
        self.patterns.push(CachedPattern { pattern, handle });
    }

    /// Look up a prefetched property.  `None` means the property was not in
    /// the materializing cache request.
    pub fn property(&self, property: PropertyId) -> Option<&AutomationValue> {
        self.properties
            .iter()
            .find(|entry| entry.property == property)
            .map(|entry| &entry.value)
    }

    /// Look up a probed pattern.  Outer `None` means the pattern was not in
    /// the materializing cache request; inner `None` means it was probed and
    /// the element does not support it.
    pub fn pattern(&self, pattern: PatternId) -> Option<Option<PatternHandle>> {
        self.patterns
            .iter()
            .find(|entry| entry.pattern == pattern)
            .map(|entry| entry.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(
            AutomationValue::String("a".into()).into_string().unwrap(),
            Some("a".into())
        );
        assert_eq!(AutomationValue::Null.into_string().unwrap(), None);
        assert_eq!(AutomationValue::Bool(true).into_bool().unwrap(), true);
        assert_eq!(AutomationValue::Int(7).into_int().unwrap(), 7);
        assert!(AutomationValue::Int(7).into_bool().is_err());

        let element = MaterializedElement::bare(ElementHandle(3));
        assert_eq!(
            AutomationValue::Element(element.clone())
                .into_element()
                .unwrap(),
            Some(element)
        );
        assert_eq!(AutomationValue::Null.into_element().unwrap(), None);
    }

    #[test]
    fn test_conversion_error_names_kinds() {
        let err = AutomationValue::Bool(false).into_text_range().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected text_range"));
        assert!(msg.contains("got bool"));
    }

    #[test]
    fn test_cached_data_lookup() {
        let mut cached = CachedData::new();
        cached.push_property(PropertyId::Name, AutomationValue::String("ok".into()));
        cached.push_pattern(PatternId::Text, None);

        assert_eq!(
            cached.property(PropertyId::Name),
            Some(&AutomationValue::String("ok".into()))
        );
        assert_eq!(cached.property(PropertyId::ClassName), None);
        assert_eq!(cached.pattern(PatternId::Text), Some(None));
        assert_eq!(cached.pattern(PatternId::Invoke), None);
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_string(&AutomationValue::Int(5)).unwrap();
        assert_eq!(json, r#"{"kind":"int","value":5}"#);

        let json = serde_json::to_string(&AutomationValue::Element(
            MaterializedElement::bare(ElementHandle(9)),
        ))
        .unwrap();
        assert_eq!(json, r#"{"kind":"element","value":{"handle":9}}"#);

        let back: AutomationValue =
            serde_json::from_str(r#"{"kind":"pattern","value":null}"#).unwrap();
        assert_eq!(back, AutomationValue::Pattern(None));
    }
}
