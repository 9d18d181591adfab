//! Core data models for balanced resource placement

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identity of a cluster node
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Resource statistics reported for a node
///
/// Unknown values are `None`. A sample is never patched in place; a newer
/// sample replaces it as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    /// CPU usage in percent (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f32>,
    /// Memory still available to the node, in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_memory: Option<i64>,
    /// Memory in use on the node, in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_memory: Option<i64>,
    /// Total physical memory of the node, in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_memory: Option<i64>,
    /// Whether the node reports itself as overloaded
    #[serde(default)]
    pub is_overloaded: bool,
}

impl ResourceSample {
    pub fn new(
        cpu_usage: Option<f32>,
        available_memory: Option<i64>,
        used_memory: Option<i64>,
        total_memory: Option<i64>,
        is_overloaded: bool,
    ) -> Self {
        Self {
            cpu_usage,
            available_memory,
            used_memory,
            total_memory,
            is_overloaded,
        }
    }

    /// Field-by-field comparison used for change detection.
    ///
    /// The overload flag only takes part when `include_overload` is set.
    pub fn same_statistics(&self, other: &ResourceSample, include_overload: bool) -> bool {
        self.cpu_usage == other.cpu_usage
            && self.available_memory == other.available_memory
            && self.used_memory == other.used_memory
            && self.total_memory == other.total_memory
            && (!include_overload || self.is_overloaded == other.is_overloaded)
    }
}

/// A candidate paired with the score it received during one placement call
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub node: NodeId,
    pub score: f64,
}

/// Notification produced by one collection tick
#[derive(Debug, Clone, PartialEq)]
pub enum StatisticsEvent {
    /// Statistics for a node were first seen or changed
    Changed(NodeId, ResourceSample),
    /// A node disappeared from the cluster snapshot
    Removed(NodeId),
}

/// Statistics fetched from the cluster in one pass
#[derive(Debug, Clone, Default)]
pub struct ClusterSnapshot {
    /// Nodes whose statistics were fetched successfully
    pub samples: HashMap<NodeId, ResourceSample>,
    /// Nodes that are still listed but whose statistics could not be fetched
    pub unavailable: HashSet<NodeId>,
}

impl ClusterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add fetched statistics for a node
    pub fn insert(&mut self, node: NodeId, sample: ResourceSample) {
        self.unavailable.remove(&node);
        self.samples.insert(node, sample);
    }

    /// Mark a listed node whose statistics are unknown this pass
    pub fn mark_unavailable(&mut self, node: NodeId) {
        if !self.samples.contains_key(&node) {
            self.unavailable.insert(node);
        }
    }

    /// Whether the node was listed in this snapshot at all
    pub fn is_listed(&self, node: &NodeId) -> bool {
        self.samples.contains_key(node) || self.unavailable.contains(node)
    }
}

impl FromIterator<(NodeId, ResourceSample)> for ClusterSnapshot {
    fn from_iter<I: IntoIterator<Item = (NodeId, ResourceSample)>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
            unavailable: HashSet::new(),
        }
    }
}
