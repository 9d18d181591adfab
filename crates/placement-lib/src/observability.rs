//! Observability infrastructure for balanced placement
//!
//! Provides:
//! - Prometheus metrics (collection latency, tracked nodes, change counters, placement paths)
//! - Structured JSON logging with tracing

use crate::models::NodeId;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PlacementMetricsInner> = OnceLock::new();

/// How a placement decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPath {
    /// The caller pinned one of the candidates
    Hint,
    /// Only one candidate was offered
    Single,
    /// No statistics collected yet, picked at random
    Bootstrap,
    /// Every candidate was unknown or overloaded, picked at random
    Fallback,
    /// Picked the best of a scored random subset
    Scored,
}

impl DecisionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionPath::Hint => "hint",
            DecisionPath::Single => "single",
            DecisionPath::Bootstrap => "bootstrap",
            DecisionPath::Fallback => "fallback",
            DecisionPath::Scored => "scored",
        }
    }
}

struct PlacementMetricsInner {
    collection_latency_seconds: Histogram,
    collection_errors: IntCounter,
    nodes_tracked: IntGauge,
    statistics_changed: IntCounter,
    nodes_removed: IntCounter,
    placements: IntCounterVec,
    rejected_requests: IntCounter,
}

impl PlacementMetricsInner {
    fn new() -> Self {
        Self {
            collection_latency_seconds: register_histogram!(
                "balanced_placement_collection_latency_seconds",
                "Time spent fetching and diffing one cluster snapshot",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register collection_latency_seconds"),

            collection_errors: register_int_counter!(
                "balanced_placement_collection_errors_total",
                "Total number of failed telemetry collections"
            )
            .expect("Failed to register collection_errors"),

            nodes_tracked: register_int_gauge!(
                "balanced_placement_nodes_tracked",
                "Number of nodes with known statistics"
            )
            .expect("Failed to register nodes_tracked"),

            statistics_changed: register_int_counter!(
                "balanced_placement_statistics_changed_total",
                "Total number of statistics change notifications"
            )
            .expect("Failed to register statistics_changed"),

            nodes_removed: register_int_counter!(
                "balanced_placement_nodes_removed_total",
                "Total number of node removal notifications"
            )
            .expect("Failed to register nodes_removed"),

            placements: register_int_counter_vec!(
                "balanced_placement_decisions_total",
                "Total number of placement decisions by decision path",
                &["path"]
            )
            .expect("Failed to register placements"),

            rejected_requests: register_int_counter!(
                "balanced_placement_rejected_requests_total",
                "Total number of placement requests without any candidate"
            )
            .expect("Failed to register rejected_requests"),
        }
    }
}

/// Placement metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct PlacementMetrics {
    _private: (),
}

impl Default for PlacementMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PlacementMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PlacementMetricsInner {
        GLOBAL_METRICS.get_or_init(PlacementMetricsInner::new)
    }

    pub fn observe_collection_latency(&self, duration_secs: f64) {
        self.inner().collection_latency_seconds.observe(duration_secs);
    }

    pub fn inc_collection_errors(&self) {
        self.inner().collection_errors.inc();
    }

    pub fn set_nodes_tracked(&self, count: i64) {
        self.inner().nodes_tracked.set(count);
    }

    pub fn add_statistics_changed(&self, count: u64) {
        self.inner().statistics_changed.inc_by(count);
    }

    pub fn add_nodes_removed(&self, count: u64) {
        self.inner().nodes_removed.inc_by(count);
    }

    pub fn inc_placement(&self, path: DecisionPath) {
        self.inner()
            .placements
            .with_label_values(&[path.as_str()])
            .inc();
    }

    pub fn placements(&self, path: DecisionPath) -> u64 {
        self.inner()
            .placements
            .with_label_values(&[path.as_str()])
            .get()
    }

    pub fn inc_rejected_requests(&self) {
        self.inner().rejected_requests.inc();
    }

    pub fn rejected_requests(&self) -> u64 {
        self.inner().rejected_requests.get()
    }
}

/// Structured logger for placement lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, adaptive_filtering: bool, period_secs: u64) {
        info!(
            event = "placement_started",
            instance = %self.instance,
            version = %version,
            adaptive_filtering = adaptive_filtering,
            collection_period_secs = period_secs,
            "Balanced placement started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "placement_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Balanced placement shutting down"
        );
    }

    /// Log a node leaving the cluster snapshot
    pub fn log_node_removed(&self, node: &NodeId) {
        info!(
            event = "node_removed",
            instance = %self.instance,
            node = %node,
            "Node no longer reported by telemetry"
        );
    }

    /// Log a placement that found no relevant candidate
    pub fn log_placement_fallback(&self, candidates: usize) {
        warn!(
            event = "placement_fallback",
            instance = %self.instance,
            candidates = candidates,
            "No candidate with usable statistics, picking at random"
        );
    }

    /// Log a telemetry collection failure
    pub fn log_collection_failure(&self, error: &str, consecutive_failures: u32) {
        warn!(
            event = "collection_failed",
            instance = %self.instance,
            error = %error,
            consecutive_failures = consecutive_failures,
            "Telemetry collection failed, retrying next tick"
        );
    }
}
