//! Per-node statistics store
//!
//! Holds the latest (optionally smoothed) statistics of every tracked node.
//! The collector is the only writer; placement decisions read concurrently.

use crate::filter::NodeFilters;
use crate::listener::StatisticsListener;
use crate::models::{NodeId, ResourceSample};
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::debug;

/// Stored statistics of one node
#[derive(Debug, Clone, Copy)]
struct NodeEntry {
    sample: ResourceSample,
    filters: Option<NodeFilters>,
}

/// Concurrent map from node to its latest statistics
#[derive(Debug, Default)]
pub struct StatisticsStore {
    nodes: DashMap<NodeId, NodeEntry>,
    adaptive_filtering: bool,
}

impl StatisticsStore {
    /// Create a store; with `adaptive_filtering` samples are smoothed before storing
    pub fn new(adaptive_filtering: bool) -> Self {
        Self {
            nodes: DashMap::new(),
            adaptive_filtering,
        }
    }

    pub fn adaptive_filtering(&self) -> bool {
        self.adaptive_filtering
    }

    /// Record a new raw sample for a node and return what was stored
    pub fn upsert(&self, node: &NodeId, raw: ResourceSample) -> ResourceSample {
        if !self.adaptive_filtering {
            self.nodes.insert(
                node.clone(),
                NodeEntry {
                    sample: raw,
                    filters: None,
                },
            );
            return raw;
        }

        let current = self
            .nodes
            .get(node)
            .and_then(|entry| entry.filters)
            .unwrap_or_default();

        let (filters, sample) = current.apply(&raw);
        self.nodes.insert(
            node.clone(),
            NodeEntry {
                sample,
                filters: Some(filters),
            },
        );

        sample
    }

    /// Stop tracking a node, dropping its filter state
    pub fn remove(&self, node: &NodeId) -> bool {
        self.nodes.remove(node).is_some()
    }

    pub fn get(&self, node: &NodeId) -> Option<ResourceSample> {
        self.nodes.get(node).map(|entry| entry.sample)
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Copy of all tracked statistics
    pub fn snapshot(&self) -> HashMap<NodeId, ResourceSample> {
        self.nodes
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().sample))
            .collect()
    }
}

impl StatisticsListener for StatisticsStore {
    fn on_statistics_changed(&self, node: &NodeId, sample: &ResourceSample) {
        let stored = self.upsert(node, *sample);
        debug!(
            node = %node,
            cpu_usage = ?stored.cpu_usage,
            available_memory = ?stored.available_memory,
            overloaded = stored.is_overloaded,
            "Statistics updated"
        );
    }

    fn on_node_removed(&self, node: &NodeId) {
        if self.remove(node) {
            debug!(node = %node, "Node removed from statistics store");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cpu: f32) -> ResourceSample {
        ResourceSample::new(Some(cpu), Some(4_000), Some(1_000), Some(5_000), false)
    }

    #[test]
    fn test_raw_store_keeps_samples_unchanged() {
        let store = StatisticsStore::new(false);
        let node = NodeId::from("node-1");

        store.upsert(&node, sample(90.0));
        store.upsert(&node, sample(10.0));

        assert_eq!(store.get(&node), Some(sample(10.0)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_filtered_store_smooths_drop() {
        let store = StatisticsStore::new(true);
        let node = NodeId::from("node-1");

        for _ in 0..10 {
            store.upsert(&node, sample(90.0));
        }
        let stored = store.upsert(&node, sample(10.0));

        let cpu = stored.cpu_usage.unwrap();
        assert!(cpu > 10.0 && cpu < 90.0, "cpu {cpu}");
        assert_eq!(stored.total_memory, Some(5_000));
    }

    #[test]
    fn test_filter_state_is_per_node() {
        let store = StatisticsStore::new(true);
        let busy = NodeId::from("busy");
        let idle = NodeId::from("idle");

        for _ in 0..10 {
            store.upsert(&busy, sample(90.0));
        }
        let stored = store.upsert(&idle, sample(5.0));

        assert_eq!(stored.cpu_usage, Some(5.0));
    }

    #[test]
    fn test_remove_drops_filter_state() {
        let store = StatisticsStore::new(true);
        let node = NodeId::from("node-1");

        for _ in 0..10 {
            store.upsert(&node, sample(90.0));
        }
        assert!(store.remove(&node));
        assert!(!store.remove(&node));

        // starts from scratch after re-joining
        let stored = store.upsert(&node, sample(10.0));
        assert_eq!(stored.cpu_usage, Some(10.0));
    }

    #[test]
    fn test_missing_key_is_not_an_error() {
        let store = StatisticsStore::default();
        let node = NodeId::from("ghost");

        assert!(store.get(&node).is_none());
        assert!(!store.contains(&node));
        store.on_node_removed(&node);
        assert!(store.is_empty());
    }

    #[test]
    fn test_listener_updates_store() {
        let store = StatisticsStore::new(false);
        let node = NodeId::from("node-1");

        store.on_statistics_changed(&node, &sample(33.0));
        assert_eq!(store.snapshot().get(&node), Some(&sample(33.0)));

        store.on_node_removed(&node);
        assert!(store.snapshot().is_empty());
    }
}
