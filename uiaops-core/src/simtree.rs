//! In-process simulated automation provider.
//!
//! [`SimulatedProvider`] hosts an owned accessibility-tree description
//! ([`SimNode`]) and answers the full operation vocabulary against it:
//! navigation, property reads, pattern probing, text ranges, and element
//! materialization with cache requests.  Trees are plain serde values, so
//! they can be written inline in tests or loaded from JSON files by the CLI
//! tools.
//!
//! The provider also carries the affordances a live accessibility stack
//! cannot offer deterministically: per-call and per-batch round-trip
//! counters, and transport fault injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cache::CacheRequest;
use crate::ids::{NavigationDirection, PatternId, PropertyId, SupportedTextSelection};
use crate::program::{replay, Operation, RemoteProgram};
use crate::provider::{AutomationProvider, ProviderError};
use crate::value::{
    AutomationValue, CachedData, ElementHandle, MaterializedElement, PatternHandle,
    TextRangeHandle,
};

fn default_true() -> bool {
    true
}

fn default_selection() -> SupportedTextSelection {
    SupportedTextSelection::Single
}

/// One element of a simulated tree.
///
/// Field layout follows the owned element snapshot shape; every field has a
/// serde default so JSON trees only spell out what they care about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub automation_id: Option<String>,
    #[serde(default)]
    pub control_type: Option<String>,
    #[serde(default)]
    pub localized_control_type: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    /// `[left, top, right, bottom]` in screen coordinates.
    #[serde(default)]
    pub bounding_rect: [f64; 4],
    #[serde(default)]
    pub is_offscreen: bool,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default = "default_true")]
    pub is_control_element: bool,
    #[serde(default)]
    pub has_keyboard_focus: bool,
    #[serde(default)]
    pub is_keyboard_focusable: bool,
    #[serde(default)]
    pub accelerator_key: Option<String>,
    /// Patterns this element supports.
    #[serde(default)]
    pub patterns: Vec<PatternId>,
    /// Document text, when the element supports the text pattern.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "default_selection")]
    pub supported_text_selection: SupportedTextSelection,
    #[serde(default)]
    pub children: Vec<SimNode>,
}

impl SimNode {
    /// A named element with defaults everywhere else.
    pub fn named(name: impl Into<String>) -> Self {
        SimNode {
            name: Some(name.into()),
            is_enabled: true,
            is_control_element: true,
            supported_text_selection: SupportedTextSelection::Single,
            ..SimNode::default()
        }
    }

    pub fn with_automation_id(mut self, automation_id: impl Into<String>) -> Self {
        self.automation_id = Some(automation_id.into());
        self
    }

    pub fn with_control_type(mut self, control_type: impl Into<String>) -> Self {
        self.control_type = Some(control_type.into());
        self
    }

    pub fn with_pattern(mut self, pattern: PatternId) -> Self {
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
        self
    }

    /// Attach document text and mark the text pattern supported.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self.with_pattern(PatternId::Text)
    }

    pub fn with_child(mut self, child: SimNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Flattened element: node data plus tree links.
struct StoredElement {
    node: SimNode,
    parent: Option<u64>,
    children: Vec<u64>,
}

struct PatternEntry {
    element: u64,
    pattern: PatternId,
}

struct TreeState {
    elements: HashMap<u64, StoredElement>,
    patterns: HashMap<u64, PatternEntry>,
    /// Range handle -> owning element.
    ranges: HashMap<u64, u64>,
    root: u64,
    next_handle: u64,
}

/// An in-process [`AutomationProvider`] backed by a [`SimNode`] tree.
pub struct SimulatedProvider {
    state: Mutex<TreeState>,
    single_calls: AtomicU64,
    batch_calls: AtomicU64,
    fail_next: AtomicBool,
}

impl SimulatedProvider {
    pub fn new(root: SimNode) -> Self {
        let mut elements = HashMap::new();
        let mut next_handle = 1;
        let root_id = flatten(root, None, &mut elements, &mut next_handle);

        SimulatedProvider {
            state: Mutex::new(TreeState {
                elements,
                patterns: HashMap::new(),
                ranges: HashMap::new(),
                root: root_id,
                next_handle,
            }),
            single_calls: AtomicU64::new(0),
            batch_calls: AtomicU64::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Build a provider from a JSON tree description.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(SimulatedProvider::new(serde_json::from_str(json)?))
    }

    /// The tree's root element.
    pub fn root(&self) -> ElementHandle {
        ElementHandle(self.state.lock().root)
    }

    /// Depth-first search for the first element with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<ElementHandle> {
        let state = self.state.lock();
        let mut stack = vec![state.root];
        while let Some(id) = stack.pop() {
            let element = state.elements.get(&id)?;
            if element.node.name.as_deref() == Some(name) {
                return Some(ElementHandle(id));
            }
            // Reverse-push so children visit in document order.
            for &child in element.children.iter().rev() {
                stack.push(child);
            }
        }
        None
    }

    /// Number of single synchronous calls answered so far.  Batch execution
    /// replays through the same entry point, so this also advances during a
    /// batch; cross-process round trips are counted by
    /// [`batch_calls`](SimulatedProvider::batch_calls) in that mode.
    pub fn single_calls(&self) -> u64 {
        self.single_calls.load(Ordering::Relaxed)
    }

    /// Number of batched program submissions so far.
    pub fn batch_calls(&self) -> u64 {
        self.batch_calls.load(Ordering::Relaxed)
    }

    /// Make the next call (single or the first replayed instruction of a
    /// batch, aborting it) fail with a transport error.
    pub fn fail_next_call(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }

    fn dispatch(
        &self,
        operation: &Operation<AutomationValue>,
    ) -> Result<AutomationValue, ProviderError> {
        let mut state = self.state.lock();
        match operation {
            Operation::ImportElement { element } => {
                if !state.elements.contains_key(&element.0) {
                    return Err(ProviderError::UnknownHandle(format!(
                        "element {}",
                        element.0
                    )));
                }
                Ok(AutomationValue::Element(MaterializedElement::bare(*element)))
            }
            Operation::GetProperty { target, property } => {
                let id = element_operand(&state, target)?;
                Ok(property_value(&state.elements[&id].node, *property))
            }
            Operation::Navigate {
                target,
                direction,
                cache,
            } => {
                let id = element_operand(&state, target)?;
                match neighbor(&state, id, *direction) {
                    Some(neighbor_id) => Ok(AutomationValue::Element(materialize(
                        &mut state,
                        neighbor_id,
                        cache.as_ref(),
                    ))),
                    None => Ok(AutomationValue::Null),
                }
            }
            Operation::GetPattern { target, pattern } => {
                let id = element_operand(&state, target)?;
                Ok(AutomationValue::Pattern(probe_pattern(
                    &mut state, id, *pattern,
                )))
            }
            Operation::DocumentRange { pattern } => {
                let entry = pattern_operand(&state, pattern)?;
                if entry.pattern != PatternId::Text {
                    return Err(ProviderError::InvalidOperand(format!(
                        "{:?} pattern has no document range",
                        entry.pattern
                    )));
                }
                let element = entry.element;
                let handle = state.next_handle;
                state.next_handle += 1;
                state.ranges.insert(handle, element);
                Ok(AutomationValue::TextRange(TextRangeHandle(handle)))
            }
            Operation::SupportedTextSelection { pattern } => {
                let entry = pattern_operand(&state, pattern)?;
                let node = &state.elements[&entry.element].node;
                Ok(AutomationValue::Int(node.supported_text_selection as i32))
            }
            Operation::EnclosingElement { range, cache } => {
                let element = range_operand(&state, range)?;
                Ok(AutomationValue::Element(materialize(
                    &mut state,
                    element,
                    cache.as_ref(),
                )))
            }
            Operation::RangeText { range, max_length } => {
                let element = range_operand(&state, range)?;
                let text = state.elements[&element]
                    .node
                    .text
                    .clone()
                    .unwrap_or_default();
                let text = if *max_length < 0 {
                    text
                } else {
                    text.chars().take(*max_length as usize).collect()
                };
                Ok(AutomationValue::String(text))
            }
        }
    }
}

impl AutomationProvider for SimulatedProvider {
    fn apply(
        &self,
        operation: &Operation<AutomationValue>,
    ) -> Result<AutomationValue, ProviderError> {
        self.single_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_next.swap(false, Ordering::Relaxed) {
            return Err(ProviderError::Transport("injected transport failure".into()));
        }
        self.dispatch(operation)
    }

    fn execute_batch(
        &self,
        program: &RemoteProgram,
    ) -> Result<Vec<AutomationValue>, ProviderError> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        replay(self, program)
    }
}

fn flatten(
    mut node: SimNode,
    parent: Option<u64>,
    elements: &mut HashMap<u64, StoredElement>,
    next_handle: &mut u64,
) -> u64 {
    let id = *next_handle;
    *next_handle += 1;

    // Reserve the slot before recursing so handles come out in document
    // order (parent before children).
    let child_nodes = std::mem::take(&mut node.children);
    elements.insert(
        id,
        StoredElement {
            node,
            parent,
            children: Vec::new(),
        },
    );

    let mut children = Vec::with_capacity(child_nodes.len());
    for child in child_nodes {
        children.push(flatten(child, Some(id), elements, next_handle));
    }
    if let Some(stored) = elements.get_mut(&id) {
        stored.children = children;
    }
    id
}

fn element_operand(state: &TreeState, value: &AutomationValue) -> Result<u64, ProviderError> {
    match value {
        AutomationValue::Element(element) => {
            if !state.elements.contains_key(&element.handle.0) {
                return Err(ProviderError::UnknownHandle(format!(
                    "element {}",
                    element.handle.0
                )));
            }
            Ok(element.handle.0)
        }
        AutomationValue::Null => Err(ProviderError::InvalidOperand(
            "operation requires a non-null element".into(),
        )),
        other => Err(ProviderError::InvalidOperand(format!(
            "expected element operand, got {}",
            other.kind_name()
        ))),
    }
}

fn pattern_operand<'a>(
    state: &'a TreeState,
    value: &AutomationValue,
) -> Result<&'a PatternEntry, ProviderError> {
    match value {
        AutomationValue::Pattern(Some(handle)) => {
            state.patterns.get(&handle.0).ok_or_else(|| {
                ProviderError::UnknownHandle(format!("pattern {}", handle.0))
            })
        }
        AutomationValue::Pattern(None) | AutomationValue::Null => Err(
            ProviderError::InvalidOperand("operation requires a non-null pattern".into()),
        ),
        other => Err(ProviderError::InvalidOperand(format!(
            "expected pattern operand, got {}",
            other.kind_name()
        ))),
    }
}

fn range_operand(state: &TreeState, value: &AutomationValue) -> Result<u64, ProviderError> {
    match value {
        AutomationValue::TextRange(handle) => state
            .ranges
            .get(&handle.0)
            .copied()
            .ok_or_else(|| ProviderError::UnknownHandle(format!("text range {}", handle.0))),
        other => Err(ProviderError::InvalidOperand(format!(
            "expected text range operand, got {}",
            other.kind_name()
        ))),
    }
}

fn neighbor(state: &TreeState, id: u64, direction: NavigationDirection) -> Option<u64> {
    let element = &state.elements[&id];
    match direction {
        NavigationDirection::Parent => element.parent,
        NavigationDirection::FirstChild => element.children.first().copied(),
        NavigationDirection::LastChild => element.children.last().copied(),
        NavigationDirection::NextSibling | NavigationDirection::PreviousSibling => {
            let parent = &state.elements[&element.parent?];
            let position = parent.children.iter().position(|&child| child == id)?;
            match direction {
                NavigationDirection::NextSibling => parent.children.get(position + 1).copied(),
                _ => position.checked_sub(1).and_then(|p| parent.children.get(p).copied()),
            }
        }
    }
}

fn opt_string(value: &Option<String>) -> AutomationValue {
    match value {
        Some(s) => AutomationValue::String(s.clone()),
        None => AutomationValue::Null,
    }
}

fn property_value(node: &SimNode, property: PropertyId) -> AutomationValue {
    match property {
        PropertyId::Name => opt_string(&node.name),
        PropertyId::AutomationId => opt_string(&node.automation_id),
        PropertyId::ControlType => opt_string(&node.control_type),
        PropertyId::LocalizedControlType => opt_string(&node.localized_control_type),
        PropertyId::ClassName => opt_string(&node.class_name),
        PropertyId::BoundingRectangle => AutomationValue::Rect(node.bounding_rect),
        PropertyId::IsOffscreen => AutomationValue::Bool(node.is_offscreen),
        PropertyId::IsEnabled => AutomationValue::Bool(node.is_enabled),
        PropertyId::IsControlElement => AutomationValue::Bool(node.is_control_element),
        PropertyId::HasKeyboardFocus => AutomationValue::Bool(node.has_keyboard_focus),
        PropertyId::IsKeyboardFocusable => AutomationValue::Bool(node.is_keyboard_focusable),
        PropertyId::AcceleratorKey => opt_string(&node.accelerator_key),
    }
}

fn probe_pattern(state: &mut TreeState, id: u64, pattern: PatternId) -> Option<PatternHandle> {
    if !state.elements[&id].node.patterns.contains(&pattern) {
        return None;
    }
    let handle = state.next_handle;
    state.next_handle += 1;
    state.patterns.insert(
        handle,
        PatternEntry {
            element: id,
            pattern,
        },
    );
    Some(PatternHandle(handle))
}

/// Snapshot an element across the boundary, prefetching exactly what the
/// cache request names.
fn materialize(
    state: &mut TreeState,
    id: u64,
    cache: Option<&CacheRequest>,
) -> MaterializedElement {
    let cached = cache.map(|request| {
        let mut data = CachedData::new();
        for &property in request.properties() {
            let value = property_value(&state.elements[&id].node, property);
            data.push_property(property, value);
        }
        for &pattern in request.patterns() {
            let handle = probe_pattern(state, id, pattern);
            data.push_pattern(pattern, handle);
        }
        data
    });

    MaterializedElement {
        handle: ElementHandle(id),
        cached,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> SimNode {
        SimNode::named("Desktop").with_child(
            SimNode::named("Calculator")
                .with_control_type("Window")
                .with_child(
                    SimNode::named("Display is 0")
                        .with_automation_id("CalculatorResults")
                        .with_child(SimNode::named("0").with_text("0")),
                ),
        )
    }

    fn get(provider: &SimulatedProvider, op: Operation<AutomationValue>) -> AutomationValue {
        provider.apply(&op).unwrap()
    }

    fn element(handle: ElementHandle) -> AutomationValue {
        AutomationValue::Element(MaterializedElement::bare(handle))
    }

    #[test]
    fn test_find_by_name_document_order() {
        let provider = SimulatedProvider::new(calculator());
        assert_eq!(provider.root(), ElementHandle(1));
        let display = provider.find_by_name("Display is 0").unwrap();
        let zero = provider.find_by_name("0").unwrap();
        assert!(display.0 < zero.0);
        assert_eq!(provider.find_by_name("missing"), None);
    }

    #[test]
    fn test_navigation_and_properties() {
        let provider = SimulatedProvider::new(calculator());
        let display = provider.find_by_name("Display is 0").unwrap();

        let parent = get(
            &provider,
            Operation::Navigate {
                target: element(display),
                direction: NavigationDirection::Parent,
                cache: None,
            },
        );
        let parent = parent.into_element().unwrap().unwrap();

        let name = get(
            &provider,
            Operation::GetProperty {
                target: element(parent.handle),
                property: PropertyId::Name,
            },
        );
        assert_eq!(name, AutomationValue::String("Calculator".into()));
    }

    #[test]
    fn test_navigate_off_tree_edge_is_null() {
        let provider = SimulatedProvider::new(calculator());
        let root = provider.root();
        let value = get(
            &provider,
            Operation::Navigate {
                target: element(root),
                direction: NavigationDirection::Parent,
                cache: None,
            },
        );
        assert_eq!(value, AutomationValue::Null);
    }

    #[test]
    fn test_materialize_with_cache_request() {
        let provider = SimulatedProvider::new(calculator());
        let zero = provider.find_by_name("0").unwrap();
        let parent_of_zero = provider.find_by_name("Display is 0").unwrap();

        let mut request = CacheRequest::new();
        request.add_property(PropertyId::Name);
        request.add_pattern(PatternId::Text);

        let value = get(
            &provider,
            Operation::Navigate {
                target: element(parent_of_zero),
                direction: NavigationDirection::FirstChild,
                cache: Some(request),
            },
        );
        let materialized = value.into_element().unwrap().unwrap();
        assert_eq!(materialized.handle, zero);

        let cached = materialized.cached.unwrap();
        assert_eq!(
            cached.property(PropertyId::Name),
            Some(&AutomationValue::String("0".into()))
        );
        // Probed and supported: a live handle.
        assert!(cached.pattern(PatternId::Text).unwrap().is_some());
        // Not requested: absent entirely.
        assert_eq!(cached.property(PropertyId::ClassName), None);
    }

    #[test]
    fn test_pattern_probe_unsupported_is_null() {
        let provider = SimulatedProvider::new(calculator());
        let window = provider.find_by_name("Calculator").unwrap();
        let value = get(
            &provider,
            Operation::GetPattern {
                target: element(window),
                pattern: PatternId::Text,
            },
        );
        assert_eq!(value, AutomationValue::Pattern(None));
    }

    #[test]
    fn test_text_range_flow() {
        let provider = SimulatedProvider::new(calculator());
        let zero = provider.find_by_name("0").unwrap();

        let pattern = get(
            &provider,
            Operation::GetPattern {
                target: element(zero),
                pattern: PatternId::Text,
            },
        );
        let range = get(
            &provider,
            Operation::DocumentRange {
                pattern: pattern.clone(),
            },
        );
        let text = get(
            &provider,
            Operation::RangeText {
                range: range.clone(),
                max_length: -1,
            },
        );
        assert_eq!(text, AutomationValue::String("0".into()));

        let enclosing = get(
            &provider,
            Operation::EnclosingElement {
                range,
                cache: None,
            },
        );
        assert_eq!(enclosing.into_element().unwrap().unwrap().handle, zero);

        let selection = get(&provider, Operation::SupportedTextSelection { pattern });
        assert_eq!(
            selection,
            AutomationValue::Int(SupportedTextSelection::Single as i32)
        );
    }

    #[test]
    fn test_fail_next_call_injects_once() {
        let provider = SimulatedProvider::new(calculator());
        provider.fail_next_call();
        let err = provider
            .apply(&Operation::ImportElement {
                element: provider.root(),
            })
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));

        // Next call succeeds again.
        provider
            .apply(&Operation::ImportElement {
                element: provider.root(),
            })
            .unwrap();
    }

    #[test]
    fn test_counters() {
        let provider = SimulatedProvider::new(calculator());
        provider
            .apply(&Operation::ImportElement {
                element: provider.root(),
            })
            .unwrap();
        assert_eq!(provider.single_calls(), 1);
        assert_eq!(provider.batch_calls(), 0);

        let program = RemoteProgram::new(vec![crate::program::Instruction {
            out: crate::program::OperandId(0),
            operation: Operation::ImportElement {
                element: provider.root(),
            },
        }]);
        provider.execute_batch(&program).unwrap();
        assert_eq!(provider.batch_calls(), 1);
    }

    #[test]
    fn test_json_tree_loads() {
        let json = r#"{
            "name": "Root",
            "children": [
                { "name": "Doc", "patterns": ["Text"], "text": "hello" }
            ]
        }"#;
        let provider = SimulatedProvider::from_json(json).unwrap();
        let doc = provider.find_by_name("Doc").unwrap();
        let value = provider
            .apply(&Operation::GetPattern {
                target: AutomationValue::Element(MaterializedElement::bare(doc)),
                pattern: PatternId::Text,
            })
            .unwrap();
        assert!(matches!(value, AutomationValue::Pattern(Some(_))));
    }
}
