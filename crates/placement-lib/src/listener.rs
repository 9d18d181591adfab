//! Statistics change notifications

use crate::models::{NodeId, ResourceSample, StatisticsEvent};

/// Receives statistics changes detected by the collector
pub trait StatisticsListener: Send + Sync {
    /// Fired at most once per collection tick for a node whose statistics changed
    fn on_statistics_changed(&self, node: &NodeId, sample: &ResourceSample);

    /// Fired once when a node disappears from the cluster snapshot
    fn on_node_removed(&self, node: &NodeId);

    /// Dispatch a single event to the matching callback
    fn on_event(&self, event: &StatisticsEvent) {
        match event {
            StatisticsEvent::Changed(node, sample) => self.on_statistics_changed(node, sample),
            StatisticsEvent::Removed(node) => self.on_node_removed(node),
        }
    }
}
