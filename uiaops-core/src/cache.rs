//! Cache request builder.
//!
//! A [`CacheRequest`] describes which properties and patterns to prefetch
//! when an element is materialized across the process boundary.  It is a
//! pure input descriptor: navigation and pattern-retrieval calls consume it,
//! and in remote mode it is serialized inline into the recorded instruction.
//! It is never itself a remote result, and deliberately does not implement
//! [`FromRemoteResult`](crate::wrapper::FromRemoteResult) -- binding one as
//! a scope result does not compile.

use serde::{Deserialize, Serialize};

use crate::ids::{PatternId, PropertyId};

/// An insertion-ordered, duplicate-free set of property and pattern ids to
/// prefetch during element materialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRequest {
    properties: Vec<PropertyId>,
    patterns: Vec<PatternId>,
}

impl CacheRequest {
    pub fn new() -> Self {
        CacheRequest::default()
    }

    /// Add a property to prefetch.  Re-adding is a no-op, not an error.
    pub fn add_property(&mut self, property: PropertyId) {
        if !self.properties.contains(&property) {
            self.properties.push(property);
        }
    }

    /// Add a pattern to probe.  Re-adding is a no-op, not an error.
    pub fn add_pattern(&mut self, pattern: PatternId) {
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    /// Requested properties, in insertion order.
    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    /// Requested patterns, in insertion order.
    pub fn patterns(&self) -> &[PatternId] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.patterns.is_empty()
    }
}
