//! Agent configuration

use anyhow::{Context, Result};
use placement_lib::{PlacementOptions, PlacementWeights};
use serde::Deserialize;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name of this placement instance, used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for placement/health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Base URL of the cluster telemetry endpoint
    #[serde(default = "default_telemetry_endpoint")]
    pub telemetry_endpoint: String,

    /// Telemetry collection period in seconds
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,

    /// Smooth statistics through the adaptive filter
    #[serde(default)]
    pub adaptive_filtering: bool,

    #[serde(default = "default_cpu_weight")]
    pub cpu_weight: f32,

    #[serde(default = "default_available_memory_weight")]
    pub available_memory_weight: f32,

    #[serde(default = "default_used_memory_weight")]
    pub used_memory_weight: f32,

    #[serde(default = "default_total_memory_weight")]
    pub total_memory_weight: f32,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "placement".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_telemetry_endpoint() -> String {
    "http://cluster-telemetry:9090".to_string()
}

fn default_collection_interval() -> u64 {
    5
}

fn default_cpu_weight() -> f32 {
    PlacementWeights::default().cpu
}

fn default_available_memory_weight() -> f32 {
    PlacementWeights::default().available_memory
}

fn default_used_memory_weight() -> f32 {
    PlacementWeights::default().used_memory
}

fn default_total_memory_weight() -> f32 {
    PlacementWeights::default().total_memory
}

impl AgentConfig {
    /// Load configuration from `PLACEMENT_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("PLACEMENT").try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid placement configuration")
    }

    /// Build validated placement options; invalid weights abort startup
    pub fn placement_options(&self) -> Result<PlacementOptions> {
        let weights = PlacementWeights::new(
            self.cpu_weight,
            self.available_memory_weight,
            self.used_memory_weight,
            self.total_memory_weight,
        )
        .context("Invalid placement weights")?;

        if self.collection_interval_secs == 0 {
            anyhow::bail!("Collection interval must be at least one second");
        }

        Ok(PlacementOptions {
            weights,
            collection_period: Duration::from_secs(self.collection_interval_secs),
            adaptive_filtering: self.adaptive_filtering,
        })
    }
}
