//! Element wrapper: property access, navigation, pattern retrieval.

use crate::cache::CacheRequest;
use crate::errors::OperationError;
use crate::ids::{NavigationDirection, PatternId, PropertyId};
use crate::program::{OperandId, Operation};
use crate::scope::RecordingHandle;
use crate::value::{AutomationValue, CachedData, ElementHandle, MaterializedElement};
use crate::wrapper::text::UiaTextPattern;
use crate::wrapper::{
    issue, wrap, Issued, OperandCell, RemotePayload, UiaBool, UiaString, WrapperValue,
};

/// Native payload of a materialized element.  `handle` is `None` for a null
/// element (navigation off the edge of the tree).
pub(crate) struct ElementData {
    handle: Option<ElementHandle>,
    cached: Option<CachedData>,
}

impl RemotePayload for ElementData {
    fn from_raw(raw: AutomationValue) -> Result<Self, OperationError> {
        let materialized = raw.into_element()?;
        Ok(match materialized {
            Some(element) => ElementData {
                handle: Some(element.handle),
                cached: element.cached,
            },
            None => ElementData {
                handle: None,
                cached: None,
            },
        })
    }
}

/// A UI-tree element.
///
/// Concrete in local mode (and after resolution in remote mode), deferred
/// while its owning scope is still recording.  Cached-style reads
/// (`use_cached_api = true`) only ever see data captured by the cache
/// request that materialized this element; they never trigger a fresh
/// cross-process fetch.
#[derive(Clone, Debug)]
pub struct UiaElement {
    cell: OperandCell<ElementData>,
}

impl WrapperValue for UiaElement {
    type Payload = ElementData;

    fn from_cell(cell: OperandCell<ElementData>) -> Self {
        UiaElement { cell }
    }

    fn cell(&self) -> &OperandCell<ElementData> {
        &self.cell
    }
}

impl From<MaterializedElement> for UiaElement {
    fn from(element: MaterializedElement) -> Self {
        UiaElement {
            cell: OperandCell::concrete(ElementData {
                handle: Some(element.handle),
                cached: element.cached,
            }),
        }
    }
}

impl UiaElement {
    /// Wrap a concrete provider-side element with no cached data.
    pub fn from_handle(handle: ElementHandle) -> Self {
        UiaElement::from(MaterializedElement::bare(handle))
    }

    /// Whether this is a null element.  Fails for deferred values.
    pub fn is_null(&self) -> Result<bool, OperationError> {
        self.cell.with_concrete(|data| data.handle.is_none())
    }

    /// The provider-side handle, `None` for a null element.  Fails for
    /// deferred values.
    pub fn handle(&self) -> Result<Option<ElementHandle>, OperationError> {
        self.cell.with_concrete(|data| data.handle)
    }

    // -- properties ---------------------------------------------------------

    /// The element's name.
    pub fn get_name(&self, use_cached_api: bool) -> Result<UiaString, OperationError> {
        wrap(self.fetch_property(PropertyId::Name, use_cached_api)?)
    }

    /// The element's automation id.
    pub fn get_automation_id(&self, use_cached_api: bool) -> Result<UiaString, OperationError> {
        wrap(self.fetch_property(PropertyId::AutomationId, use_cached_api)?)
    }

    /// Whether the element is enabled.
    pub fn get_is_enabled(&self, use_cached_api: bool) -> Result<UiaBool, OperationError> {
        wrap(self.fetch_property(PropertyId::IsEnabled, use_cached_api)?)
    }

    // -- navigation ---------------------------------------------------------

    /// The element's parent, optionally materialized through a cache
    /// request.
    pub fn get_parent_element(
        &self,
        cache: Option<&CacheRequest>,
    ) -> Result<UiaElement, OperationError> {
        self.navigate(NavigationDirection::Parent, cache)
    }

    /// The element's first child.
    pub fn get_first_child_element(
        &self,
        cache: Option<&CacheRequest>,
    ) -> Result<UiaElement, OperationError> {
        self.navigate(NavigationDirection::FirstChild, cache)
    }

    /// The element's last child.
    pub fn get_last_child_element(
        &self,
        cache: Option<&CacheRequest>,
    ) -> Result<UiaElement, OperationError> {
        self.navigate(NavigationDirection::LastChild, cache)
    }

    /// The element's next sibling.
    pub fn get_next_sibling_element(
        &self,
        cache: Option<&CacheRequest>,
    ) -> Result<UiaElement, OperationError> {
        self.navigate(NavigationDirection::NextSibling, cache)
    }

    /// The element's previous sibling.
    pub fn get_previous_sibling_element(
        &self,
        cache: Option<&CacheRequest>,
    ) -> Result<UiaElement, OperationError> {
        self.navigate(NavigationDirection::PreviousSibling, cache)
    }

    // -- patterns -----------------------------------------------------------

    /// The element's text pattern.  The returned pattern is null when the
    /// element does not support it.
    pub fn get_text_pattern(
        &self,
        use_cached_api: bool,
    ) -> Result<UiaTextPattern, OperationError> {
        wrap(self.fetch_pattern(PatternId::Text, use_cached_api)?)
    }

    // -- internals ----------------------------------------------------------

    fn navigate(
        &self,
        direction: NavigationDirection,
        cache: Option<&CacheRequest>,
    ) -> Result<UiaElement, OperationError> {
        wrap(issue(
            || {
                Ok(Operation::Navigate {
                    target: self.operand_value()?,
                    direction,
                    cache: cache.cloned(),
                })
            },
            |recording| {
                Ok(Operation::Navigate {
                    target: self.operand_id(recording)?,
                    direction,
                    cache: cache.cloned(),
                })
            },
        )?)
    }

    fn fetch_property(
        &self,
        property: PropertyId,
        use_cached_api: bool,
    ) -> Result<Issued, OperationError> {
        if use_cached_api {
            let raw = self.cached_with(|cached| {
                cached.property(property).cloned().ok_or_else(|| {
                    OperationError::UncachedAccess(format!(
                        "property {property:?} was not part of the materializing cache request"
                    ))
                })
            })?;
            return Ok(Issued::Value(raw));
        }

        issue(
            || {
                Ok(Operation::GetProperty {
                    target: self.operand_value()?,
                    property,
                })
            },
            |recording| {
                Ok(Operation::GetProperty {
                    target: self.operand_id(recording)?,
                    property,
                })
            },
        )
    }

    fn fetch_pattern(
        &self,
        pattern: PatternId,
        use_cached_api: bool,
    ) -> Result<Issued, OperationError> {
        if use_cached_api {
            let handle = self.cached_with(|cached| {
                cached.pattern(pattern).ok_or_else(|| {
                    OperationError::UncachedAccess(format!(
                        "pattern {pattern:?} was not part of the materializing cache request"
                    ))
                })
            })?;
            return Ok(Issued::Value(AutomationValue::Pattern(handle)));
        }

        issue(
            || {
                Ok(Operation::GetPattern {
                    target: self.operand_value()?,
                    pattern,
                })
            },
            |recording| {
                Ok(Operation::GetPattern {
                    target: self.operand_id(recording)?,
                    pattern,
                })
            },
        )
    }

    /// Read through the cached data captured at materialization time.
    fn cached_with<R>(
        &self,
        f: impl FnOnce(&CachedData) -> Result<R, OperationError>,
    ) -> Result<R, OperationError> {
        self.cell.with_concrete(|data| match &data.cached {
            Some(cached) => f(cached),
            None => Err(OperationError::UncachedAccess(
                "element was materialized without a cache request".into(),
            )),
        })?
    }

    /// Operand for local-mode execution: the element value itself.
    fn operand_value(&self) -> Result<AutomationValue, OperationError> {
        self.cell.with_concrete(|data| match data.handle {
            Some(handle) => AutomationValue::Element(MaterializedElement::bare(handle)),
            None => AutomationValue::Null,
        })
    }

    /// Operand for a recording: the placeholder slot, or an import of a
    /// concrete element (deduplicated per handle by the scope).
    fn operand_id(&self, recording: &RecordingHandle) -> Result<OperandId, OperationError> {
        if let Some(slot) = self.cell.recorded_slot(recording)? {
            return Ok(slot);
        }
        let handle = self
            .cell
            .with_concrete(|data| data.handle)?
            .ok_or_else(|| {
                OperationError::Conversion(
                    "cannot record an operation against a null element".into(),
                )
            })?;
        recording.import_element(handle)
    }
}
