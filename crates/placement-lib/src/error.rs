use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementError {
    #[error("Invalid placement weights: sum is {sum}, expected 1.0")]
    InvalidWeights { sum: f32 },

    #[error("Invalid placement weights: {name} weight is negative ({value})")]
    NegativeWeight { name: &'static str, value: f32 },

    #[error("Invalid collection period: must be greater than zero")]
    InvalidCollectionPeriod,

    #[error("No eligible node: candidate list is empty")]
    NoEligibleNode,

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

pub type Result<T> = std::result::Result<T, PlacementError>;
