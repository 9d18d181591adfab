//! Snapshot change detection

use crate::models::{ClusterSnapshot, NodeId, ResourceSample, StatisticsEvent};
use std::collections::HashMap;

/// Remembers the last raw statistics seen per node and diffs new snapshots against them
#[derive(Debug, Default)]
pub struct SnapshotTracker {
    last_seen: HashMap<NodeId, ResourceSample>,
    include_overload: bool,
}

impl SnapshotTracker {
    /// `include_overload` controls whether an overload flag flip alone counts as a change
    pub fn new(include_overload: bool) -> Self {
        Self {
            last_seen: HashMap::new(),
            include_overload,
        }
    }

    /// Compare a snapshot with the previous one and record it.
    ///
    /// Events come out ordered by node: changes first, then removals.
    pub fn diff(&mut self, snapshot: &ClusterSnapshot) -> Vec<StatisticsEvent> {
        let mut changed: Vec<(&NodeId, &ResourceSample)> = snapshot
            .samples
            .iter()
            .filter(|(node, sample)| {
                self.last_seen
                    .get(*node)
                    .map_or(true, |old| !old.same_statistics(sample, self.include_overload))
            })
            .collect();
        changed.sort_by(|a, b| a.0.cmp(b.0));

        let mut removed: Vec<NodeId> = self
            .last_seen
            .keys()
            .filter(|node| !snapshot.is_listed(node))
            .cloned()
            .collect();
        removed.sort();

        let mut events = Vec::with_capacity(changed.len() + removed.len());
        for (node, sample) in changed {
            self.last_seen.insert(node.clone(), *sample);
            events.push(StatisticsEvent::Changed(node.clone(), *sample));
        }
        for node in removed {
            self.last_seen.remove(&node);
            events.push(StatisticsEvent::Removed(node));
        }

        events
    }

    /// Number of nodes currently tracked
    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}
