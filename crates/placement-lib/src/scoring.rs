//! Node scoring
//!
//! Reduces a node's statistics to one headroom score. Higher is better:
//! idle CPU, free memory and large capacity all raise the score.

use crate::models::ResourceSample;
use crate::options::PlacementWeights;

/// Bytes in one gibibyte, the unit for the capacity term
pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Score a node's statistics with the given weights.
///
/// Unknown values count as zero. Without a known total memory only the CPU
/// term contributes.
pub fn score(sample: &ResourceSample, weights: &PlacementWeights) -> f64 {
    let cpu_headroom = 1.0 - f64::from(sample.cpu_usage.unwrap_or(0.0)) / 100.0;
    let cpu_term = f64::from(weights.cpu) * cpu_headroom;

    let Some(total) = sample.total_memory else {
        return cpu_term;
    };

    let total = total as f64;
    let ratio = |bytes: Option<i64>| {
        if total > 0.0 {
            bytes.unwrap_or(0) as f64 / total
        } else {
            0.0
        }
    };

    let available_term = f64::from(weights.available_memory) * ratio(sample.available_memory);
    let used_term = f64::from(weights.used_memory) * (1.0 - ratio(sample.used_memory));
    let capacity_term = f64::from(weights.total_memory) * (total / GIB);

    cpu_term + available_term + used_term + capacity_term
}
