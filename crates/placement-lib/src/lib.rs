//! Balanced resource placement
//!
//! This crate provides the core functionality for:
//! - Adaptive smoothing of noisy node telemetry
//! - Weighted scoring of node headroom
//! - Randomized best-of-subset node selection
//! - Periodic telemetry collection with change detection
//! - Health checks and observability

pub mod collector;
pub mod director;
pub mod error;
pub mod filter;
pub mod health;
pub mod listener;
pub mod models;
pub mod observability;
pub mod options;
pub mod scoring;
pub mod selector;
pub mod store;

pub use director::PlacementDirector;
pub use error::{PlacementError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use listener::StatisticsListener;
pub use models::*;
pub use observability::{PlacementMetrics, StructuredLogger};
pub use options::{PlacementOptions, PlacementWeights};
pub use selector::PlacementSelector;
pub use store::StatisticsStore;
