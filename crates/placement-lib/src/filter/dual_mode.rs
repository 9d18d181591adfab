//! Dual-regime adaptive filter
//!
//! Two estimators consume the same measurements. The slow one has no process
//! noise and decays gently; the fast one has a small process noise and
//! follows the signal almost immediately. Rising measurements are served by
//! the fast estimator, everything else by the slow one, so a spike is picked
//! up at once but fades out gradually instead of dropping straight back.

use super::kalman::{EstimatorState, KalmanEstimator, Measurement};
use std::marker::PhantomData;

/// Process noise covariance of the slow estimator
pub const SLOW_PROCESS_NOISE: f64 = 0.0;

/// Process noise covariance of the fast estimator
pub const FAST_PROCESS_NOISE: f64 = 0.01;

/// Which estimator currently drives the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Regime {
    #[default]
    Slow,
    Fast,
}

/// Complete state of one filtered metric
///
/// Estimates are kept in `f64` whatever the measurement type, so integer
/// and floating-point metrics follow the same trajectory up to rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState<T> {
    pub slow: EstimatorState,
    pub fast: EstimatorState,
    pub regime: Regime,
    measurement: PhantomData<fn(T) -> T>,
}

impl<T> FilterState<T> {
    pub fn new(slow: EstimatorState, fast: EstimatorState, regime: Regime) -> Self {
        Self {
            slow,
            fast,
            regime,
            measurement: PhantomData,
        }
    }
}

impl<T> Default for FilterState<T> {
    fn default() -> Self {
        Self::new(
            EstimatorState::default(),
            EstimatorState::default(),
            Regime::Slow,
        )
    }
}

impl<T: Measurement> FilterState<T> {
    /// Advance the filter by one measurement.
    ///
    /// Returns the next state together with the smoothed output.
    pub fn step(self, measurement: T) -> (FilterState<T>, T) {
        let slow_estimator = KalmanEstimator::new(SLOW_PROCESS_NOISE);
        let fast_estimator = KalmanEstimator::new(FAST_PROCESS_NOISE);

        let z = measurement.to_estimate();
        let mut slow = slow_estimator.step(self.slow, z);
        let mut fast = fast_estimator.step(self.fast, z);
        let mut regime = self.regime;

        let output = if z > slow.estimate {
            if regime == Regime::Slow {
                // trust the triggering measurement fully
                fast = fast_estimator.step(EstimatorState::new(z, 0.0), z);
                regime = Regime::Fast;
            }
            fast.estimate
        } else {
            if regime == Regime::Fast {
                // decay from the fast peak rather than from the whole history
                slow = slow_estimator.step(fast, z);
                regime = Regime::Slow;
            }
            slow.estimate
        };

        (FilterState::new(slow, fast, regime), T::from_estimate(output))
    }
}

/// Stateful wrapper around [`FilterState::step`]
#[derive(Debug, Clone)]
pub struct DualModeFilter<T> {
    state: FilterState<T>,
}

impl<T> Default for DualModeFilter<T> {
    fn default() -> Self {
        Self {
            state: FilterState::default(),
        }
    }
}

impl<T: Measurement> DualModeFilter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: FilterState<T>) -> Self {
        Self { state }
    }

    /// Filter one measurement; a missing value is treated as zero
    pub fn filter(&mut self, measurement: Option<T>) -> T {
        let measurement = measurement.unwrap_or_else(|| T::from_estimate(0.0));
        let (state, output) = self.state.step(measurement);
        self.state = state;
        output
    }

    pub fn state(&self) -> &FilterState<T> {
        &self.state
    }

    pub fn regime(&self) -> Regime {
        self.state.regime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_constant_sequence_trajectory() {
        let mut filter = DualModeFilter::<f64>::new();

        // the first measurement exceeds the slow estimate (25), so the fast
        // estimator is reset onto it and the output is exact from the start
        assert_eq!(filter.filter(Some(50.0)), 50.0);
        assert_eq!(filter.regime(), Regime::Fast);
        assert_close(filter.state().slow.estimate, 25.0);
        assert_close(filter.state().slow.error_covariance, 0.5);

        assert_eq!(filter.filter(Some(50.0)), 50.0);
        assert_close(filter.state().slow.estimate, 100.0 / 3.0);
        assert_close(filter.state().slow.error_covariance, 1.0 / 3.0);

        assert_eq!(filter.filter(Some(50.0)), 50.0);
        assert_close(filter.state().slow.estimate, 37.5);
        assert_close(filter.state().slow.error_covariance, 0.25);

        assert_eq!(filter.filter(Some(50.0)), 50.0);
        assert_eq!(filter.filter(Some(50.0)), 50.0);
        assert_eq!(filter.regime(), Regime::Fast);
    }

    #[test]
    fn test_constant_input_converges_in_slow_regime() {
        let mut filter = DualModeFilter::<f64>::from_state(FilterState::new(
            EstimatorState::new(80.0, 1.0),
            EstimatorState::new(80.0, 1.0),
            Regime::Slow,
        ));

        let mut output = 0.0;
        for _ in 0..5000 {
            output = filter.filter(Some(30.0));
        }

        assert_eq!(filter.regime(), Regime::Slow);
        assert!((output - 30.0).abs() < 0.05, "output {output}");
    }

    #[test]
    fn test_regime_switches_on_peak() {
        let mut filter = DualModeFilter::<f32>::new();
        let mut switches_to_slow = 0;
        let mut previous = filter.regime();

        // rising ramp
        for i in 1..=50 {
            filter.filter(Some(i as f32));
            if i > 1 {
                assert_eq!(filter.regime(), Regime::Fast, "step {i}");
            }
        }

        // falling ramp
        for i in (0..50).rev() {
            filter.filter(Some(i as f32));
            if previous == Regime::Fast && filter.regime() == Regime::Slow {
                switches_to_slow += 1;
            }
            previous = filter.regime();
        }

        assert_eq!(switches_to_slow, 1);
        assert_eq!(filter.regime(), Regime::Slow);
    }

    #[test]
    fn test_decay_starts_from_peak() {
        let mut filter = DualModeFilter::<f64>::new();
        for _ in 0..20 {
            filter.filter(Some(90.0));
        }
        assert_eq!(filter.regime(), Regime::Fast);

        // a sharp drop must not snap the output down to the new value
        let after_drop = filter.filter(Some(10.0));
        assert_eq!(filter.regime(), Regime::Slow);
        assert!(after_drop > 50.0, "output {after_drop}");
        assert!(after_drop < 90.0);

        let next = filter.filter(Some(10.0));
        assert!(next < after_drop);
    }

    #[test]
    fn test_missing_measurement_is_zero() {
        let mut filter = DualModeFilter::<f32>::new();
        assert_eq!(filter.filter(None), 0.0);
        assert_eq!(filter.regime(), Regime::Slow);
    }

    #[test]
    fn test_step_is_pure() {
        let state = FilterState::<f64>::default();
        let (a, out_a) = state.step(12.0);
        let (b, out_b) = state.step(12.0);

        assert_eq!(a, b);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_integer_filter_tracks_float_filter() {
        let mut integer = DualModeFilter::<i64>::new();
        let mut float = DualModeFilter::<f64>::new();

        for z in [10, 20, 30, 40, 50, 40, 30, 20, 10] {
            let smoothed = integer.filter(Some(z));
            let reference = float.filter(Some(z as f64));

            assert!(
                (smoothed as f64 - reference).abs() <= 0.5,
                "z {z}: integer {smoothed}, float {reference}"
            );
            assert_eq!(integer.regime(), float.regime(), "z {z}");
        }

        // the smoothed value moves after the first sample and decays back
        assert_eq!(integer.regime(), Regime::Slow);
        assert!(integer.state().slow.estimate > 10.0);
    }

    #[test]
    fn test_integer_filter_smooths_drop() {
        let mut filter = DualModeFilter::<i64>::new();
        for _ in 0..20 {
            filter.filter(Some(8_000_000));
        }

        let after_drop = filter.filter(Some(1_000_000));
        assert!(after_drop > 1_000_000 && after_drop < 8_000_000, "output {after_drop}");
        assert!(filter.filter(Some(1_000_000)) < after_drop);
    }
}
