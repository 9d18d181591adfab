//! Placement options
//!
//! Weights are validated once, when options are built. Placement calls
//! never re-check them.

use crate::error::{PlacementError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Allowed distance of the weight sum from 1.0
pub const WEIGHT_SUM_EPSILON: f32 = 1e-3;

/// Default period between two telemetry collections
pub const DEFAULT_COLLECTION_PERIOD: Duration = Duration::from_secs(5);

/// Relative importance of each statistic in the node score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementWeights {
    pub cpu: f32,
    pub available_memory: f32,
    pub used_memory: f32,
    pub total_memory: f32,
}

impl Default for PlacementWeights {
    fn default() -> Self {
        Self {
            cpu: 0.3,
            available_memory: 0.4,
            used_memory: 0.2,
            total_memory: 0.1,
        }
    }
}

impl PlacementWeights {
    /// Build weights, rejecting negative values and sums other than 1.0
    pub fn new(cpu: f32, available_memory: f32, used_memory: f32, total_memory: f32) -> Result<Self> {
        let weights = Self {
            cpu,
            available_memory,
            used_memory,
            total_memory,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn sum(&self) -> f32 {
        self.cpu + self.available_memory + self.used_memory + self.total_memory
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cpu", self.cpu),
            ("available_memory", self.available_memory),
            ("used_memory", self.used_memory),
            ("total_memory", self.total_memory),
        ] {
            if value < 0.0 || value.is_nan() {
                return Err(PlacementError::NegativeWeight { name, value });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(PlacementError::InvalidWeights { sum });
        }

        Ok(())
    }
}

/// Options shared by the collector, the store and the selector
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementOptions {
    pub weights: PlacementWeights,
    /// Period between two telemetry collections
    pub collection_period: Duration,
    /// Smooth statistics through the dual-mode filter before storing them
    pub adaptive_filtering: bool,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            weights: PlacementWeights::default(),
            collection_period: DEFAULT_COLLECTION_PERIOD,
            adaptive_filtering: false,
        }
    }
}

impl PlacementOptions {
    pub fn validate(&self) -> Result<()> {
        if self.collection_period.is_zero() {
            return Err(PlacementError::InvalidCollectionPeriod);
        }
        self.weights.validate()
    }
}
