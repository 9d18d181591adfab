//! Scalar Kalman estimator
//!
//! Unit-matrix specialization of the linear Kalman filter: state transition,
//! observation and measurement matrices are all identity, there is no control
//! input and the measurement noise covariance is fixed at one.
//!
//! The recursion always runs in `f64`. [`Measurement`] converts values in and
//! out, so integer metrics are rounded once on output instead of truncating
//! the gain at every step.

use num_traits::{Bounded, NumCast};

/// A value that can be fed to the estimators
pub trait Measurement: Copy + PartialOrd {
    fn to_estimate(self) -> f64;

    /// Convert a filtered value back, rounding for integer types
    fn from_estimate(value: f64) -> Self;
}

macro_rules! float_measurement {
    ($($t:ty),*) => {
        $(
            impl Measurement for $t {
                fn to_estimate(self) -> f64 {
                    <f64 as From<$t>>::from(self)
                }

                fn from_estimate(value: f64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

macro_rules! integer_measurement {
    ($($t:ty),*) => {
        $(
            impl Measurement for $t {
                fn to_estimate(self) -> f64 {
                    self as f64
                }

                fn from_estimate(value: f64) -> Self {
                    <$t as NumCast>::from(value.round()).unwrap_or_else(|| {
                        if value.is_sign_negative() {
                            <$t as Bounded>::min_value()
                        } else {
                            <$t as Bounded>::max_value()
                        }
                    })
                }
            }
        )*
    };
}

float_measurement!(f32, f64);
integer_measurement!(i32, i64, u32, u64, usize);

/// Prior estimate and error covariance of one estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorState {
    pub estimate: f64,
    pub error_covariance: f64,
}

impl EstimatorState {
    pub fn new(estimate: f64, error_covariance: f64) -> Self {
        Self {
            estimate,
            error_covariance,
        }
    }
}

impl Default for EstimatorState {
    /// Estimate starts at zero with unit uncertainty
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

/// One-dimensional recursive estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanEstimator {
    process_noise_covariance: f64,
}

impl KalmanEstimator {
    pub fn new(process_noise_covariance: f64) -> Self {
        Self {
            process_noise_covariance,
        }
    }

    pub fn process_noise_covariance(&self) -> f64 {
        self.process_noise_covariance
    }

    /// Feed one measurement and return the posterior state
    pub fn step(&self, prior: EstimatorState, measurement: f64) -> EstimatorState {
        // predict
        let estimate = prior.estimate;
        let error_covariance = prior.error_covariance + self.process_noise_covariance;

        // correct
        let gain = error_covariance / (error_covariance + 1.0);

        EstimatorState {
            estimate: estimate + gain * (measurement - estimate),
            error_covariance: (1.0 - gain) * error_covariance,
        }
    }
}
