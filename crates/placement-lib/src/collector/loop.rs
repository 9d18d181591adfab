//! Telemetry collection loop
//!
//! Periodically fetches a cluster snapshot, diffs it against the previous
//! one and delivers the resulting notifications to every listener.

use super::{SnapshotTracker, TelemetrySource};
use crate::error::Result;
use crate::health::{components, HealthRegistry};
use crate::listener::StatisticsListener;
use crate::models::StatisticsEvent;
use crate::observability::{PlacementMetrics, StructuredLogger};
use crate::options::{PlacementOptions, DEFAULT_COLLECTION_PERIOD};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Configuration for the collection loop
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Period between two collections (default: 5 seconds)
    pub period: Duration,
    /// Whether statistics are smoothed downstream; an overload flag flip
    /// alone is then not reported as a change
    pub adaptive_filtering: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_COLLECTION_PERIOD,
            adaptive_filtering: false,
        }
    }
}

impl From<&PlacementOptions> for CollectionConfig {
    fn from(options: &PlacementOptions) -> Self {
        Self {
            period: options.collection_period,
            adaptive_filtering: options.adaptive_filtering,
        }
    }
}

/// Outcome of a single collection tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub changed: usize,
    pub removed: usize,
    pub unavailable: usize,
}

/// Background loop that keeps listeners in sync with cluster telemetry
pub struct CollectionLoop {
    source: Arc<dyn TelemetrySource>,
    listeners: Vec<Arc<dyn StatisticsListener>>,
    tracker: SnapshotTracker,
    config: CollectionConfig,
    health: Option<HealthRegistry>,
    metrics: PlacementMetrics,
    logger: StructuredLogger,
    consecutive_failures: u32,
}

impl CollectionLoop {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        listeners: Vec<Arc<dyn StatisticsListener>>,
        mut config: CollectionConfig,
    ) -> Self {
        if config.period.is_zero() {
            warn!(
                default_ms = DEFAULT_COLLECTION_PERIOD.as_millis() as u64,
                "Zero collection period, using the default"
            );
            config.period = DEFAULT_COLLECTION_PERIOD;
        }

        Self {
            source,
            listeners,
            tracker: SnapshotTracker::new(!config.adaptive_filtering),
            config,
            health: None,
            metrics: PlacementMetrics::new(),
            logger: StructuredLogger::new("collector"),
            consecutive_failures: 0,
        }
    }

    /// Report collection health to the given registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Run until a shutdown signal arrives.
    ///
    /// A tick in progress always finishes before shutdown is observed.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            period_ms = self.config.period.as_millis() as u64,
            adaptive_filtering = self.config.adaptive_filtering,
            "Starting telemetry collection loop"
        );

        if let Some(health) = &self.health {
            health.set_healthy(components::COLLECTOR).await;
        }

        let mut ticker = interval(self.config.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // failures are already logged and counted
                    let _ = self.run_once().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down telemetry collection loop");
                    break;
                }
            }
        }
    }

    /// Perform a single collection tick.
    ///
    /// Notifications are delivered only after the whole snapshot was diffed.
    /// On failure nothing is delivered and the previous state is kept.
    pub async fn run_once(&mut self) -> Result<TickSummary> {
        let start = Instant::now();

        let snapshot = match self.source.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.record_failure(&e.to_string()).await;
                return Err(e);
            }
        };

        let events = self.tracker.diff(&snapshot);
        let mut summary = TickSummary {
            unavailable: snapshot.unavailable.len(),
            ..TickSummary::default()
        };

        for event in &events {
            match event {
                StatisticsEvent::Changed(..) => summary.changed += 1,
                StatisticsEvent::Removed(node) => {
                    summary.removed += 1;
                    self.logger.log_node_removed(node);
                }
            }
            for listener in &self.listeners {
                listener.on_event(event);
            }
        }

        self.record_success().await;
        self.metrics
            .observe_collection_latency(start.elapsed().as_secs_f64());
        self.metrics.set_nodes_tracked(self.tracker.len() as i64);
        self.metrics.add_statistics_changed(summary.changed as u64);
        self.metrics.add_nodes_removed(summary.removed as u64);

        debug!(
            changed = summary.changed,
            removed = summary.removed,
            unavailable = summary.unavailable,
            tracked = self.tracker.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Collection tick complete"
        );

        Ok(summary)
    }

    /// Number of consecutive failed ticks
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    async fn record_failure(&mut self, error: &str) {
        self.consecutive_failures += 1;
        self.metrics.inc_collection_errors();
        self.logger
            .log_collection_failure(error, self.consecutive_failures);

        if let Some(health) = &self.health {
            health
                .set_degraded(components::TELEMETRY_SOURCE, error.to_string())
                .await;
        }
    }

    async fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            info!(
                failures = self.consecutive_failures,
                "Telemetry collection recovered"
            );
            if let Some(health) = &self.health {
                health.set_healthy(components::TELEMETRY_SOURCE).await;
            }
        }
        self.consecutive_failures = 0;
    }
}

/// Builder for creating the collection loop
pub struct CollectionLoopBuilder {
    source: Option<Arc<dyn TelemetrySource>>,
    listeners: Vec<Arc<dyn StatisticsListener>>,
    health: Option<HealthRegistry>,
    config: CollectionConfig,
}

impl CollectionLoopBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            listeners: Vec::new(),
            health: None,
            config: CollectionConfig::default(),
        }
    }

    /// Set the telemetry source
    pub fn source(mut self, source: Arc<dyn TelemetrySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Add a listener for statistics notifications
    pub fn listener(mut self, listener: Arc<dyn StatisticsListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Take period and filtering mode from placement options
    pub fn options(mut self, options: &PlacementOptions) -> Self {
        self.config = CollectionConfig::from(options);
        self
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.config.period = period;
        self
    }

    pub fn adaptive_filtering(mut self, enabled: bool) -> Self {
        self.config.adaptive_filtering = enabled;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn build(self) -> anyhow::Result<CollectionLoop> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Telemetry source is required"))?;
        if self.listeners.is_empty() {
            anyhow::bail!("At least one statistics listener is required");
        }
        if self.config.period.is_zero() {
            anyhow::bail!("Collection period must be greater than zero");
        }

        let collection_loop = CollectionLoop::new(source, self.listeners, self.config);
        Ok(match self.health {
            Some(health) => collection_loop.with_health(health),
            None => collection_loop,
        })
    }
}

impl Default for CollectionLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
