//! Telemetry collection from the cluster
//!
//! This module polls a telemetry source on a fixed period, compares each
//! snapshot with the previous one and notifies listeners about nodes whose
//! statistics changed or that left the cluster.

mod r#loop;
mod tracker;


pub use r#loop::{CollectionConfig, CollectionLoop, CollectionLoopBuilder, TickSummary};
pub use tracker::SnapshotTracker;

use crate::error::Result;
use crate::models::{ClusterSnapshot, NodeId, ResourceSample};
use futures::future::join_all;
use tracing::debug;

pub use async_trait::async_trait;

/// Source of raw per-node statistics
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// List the nodes currently active in the cluster
    async fn list_nodes(&self) -> Result<Vec<NodeId>>;

    /// Fetch the statistics of one node; `None` if it has not reported yet
    async fn fetch_statistics(&self, node: &NodeId) -> Result<Option<ResourceSample>>;

    /// Fetch statistics for every listed node.
    ///
    /// Nodes are fetched concurrently. A node whose fetch fails stays in the
    /// snapshot as unavailable, so it is neither updated nor removed.
    async fn fetch_snapshot(&self) -> Result<ClusterSnapshot> {
        let nodes = self.list_nodes().await?;

        let fetches = nodes.iter().map(|node| async move {
            let result = self.fetch_statistics(node).await;
            (node, result)
        });

        let mut snapshot = ClusterSnapshot::new();
        for (node, result) in join_all(fetches).await {
            match result {
                Ok(Some(sample)) => snapshot.insert(node.clone(), sample),
                Ok(None) => snapshot.mark_unavailable(node.clone()),
                Err(e) => {
                    debug!(node = %node, error = %e, "Failed to fetch node statistics");
                    snapshot.mark_unavailable(node.clone());
                }
            }
        }

        Ok(snapshot)
    }
}
