//! Adaptive smoothing of node statistics
//!
//! This module provides:
//! - A scalar Kalman estimator (`KalmanEstimator`)
//! - The dual-regime filter built from two of them (`DualModeFilter`)
//! - Per-node filter state covering the smoothed metrics (`NodeFilters`)

mod dual_mode;
mod kalman;

pub use dual_mode::{DualModeFilter, FilterState, Regime, FAST_PROCESS_NOISE, SLOW_PROCESS_NOISE};
pub use kalman::{EstimatorState, KalmanEstimator, Measurement};

use crate::models::ResourceSample;

/// Filter state of one node
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeFilters {
    pub cpu_usage: FilterState<f32>,
    pub available_memory: FilterState<i64>,
    pub used_memory: FilterState<i64>,
}

impl NodeFilters {
    /// Smooth a raw sample, returning the next state and the filtered sample.
    ///
    /// Total memory and the overload flag pass through unchanged.
    pub fn apply(self, raw: &ResourceSample) -> (NodeFilters, ResourceSample) {
        let (cpu_state, cpu) = self.cpu_usage.step(raw.cpu_usage.unwrap_or(0.0));
        let (available_state, available) =
            self.available_memory.step(raw.available_memory.unwrap_or(0));
        let (used_state, used) = self.used_memory.step(raw.used_memory.unwrap_or(0));

        let next = NodeFilters {
            cpu_usage: cpu_state,
            available_memory: available_state,
            used_memory: used_state,
        };

        let filtered = ResourceSample {
            cpu_usage: Some(cpu),
            available_memory: Some(available),
            used_memory: Some(used),
            total_memory: raw.total_memory,
            is_overloaded: raw.is_overloaded,
        };

        (next, filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_passes_through() {
        let raw = ResourceSample::new(Some(40.0), Some(8_000), Some(2_000), Some(10_000), true);
        let (state, filtered) = NodeFilters::default().apply(&raw);

        assert_eq!(filtered, raw);
        assert_eq!(state.cpu_usage.regime, Regime::Fast);
        assert_eq!(state.available_memory.regime, Regime::Fast);
    }

    #[test]
    fn test_missing_fields_become_zero() {
        let raw = ResourceSample::new(None, None, None, None, false);
        let (_, filtered) = NodeFilters::default().apply(&raw);

        assert_eq!(filtered.cpu_usage, Some(0.0));
        assert_eq!(filtered.available_memory, Some(0));
        assert_eq!(filtered.used_memory, Some(0));
        assert_eq!(filtered.total_memory, None);
    }

    #[test]
    fn test_memory_drop_is_smoothed() {
        let high = ResourceSample::new(Some(10.0), Some(9_000_000), Some(1_000_000), Some(10_000_000), false);
        let low = ResourceSample {
            available_memory: Some(1_000_000),
            ..high
        };

        let mut state = NodeFilters::default();
        for _ in 0..10 {
            state = state.apply(&high).0;
        }
        let (_, filtered) = state.apply(&low);

        let available = filtered.available_memory.unwrap();
        assert!(available > 1_000_000);
        assert!(available < 9_000_000);
    }
}
