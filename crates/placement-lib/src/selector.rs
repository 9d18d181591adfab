//! Placement decisions
//!
//! Picks one node out of the candidates offered by the caller. Instead of
//! always returning the global best, which would make concurrent callers
//! pile onto the same node, the selector scores a random subset of about
//! √n relevant candidates and returns the best of that subset.

use crate::error::{PlacementError, Result};
use crate::models::{NodeId, ResourceSample, ScoredCandidate};
use crate::observability::{DecisionPath, PlacementMetrics, StructuredLogger};
use crate::options::PlacementWeights;
use crate::scoring::score;
use crate::store::StatisticsStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Chooses a node for each placement request
pub struct PlacementSelector<R = StdRng> {
    store: Arc<StatisticsStore>,
    weights: PlacementWeights,
    rng: Mutex<R>,
    metrics: PlacementMetrics,
    logger: StructuredLogger,
}

impl PlacementSelector<StdRng> {
    /// Create a selector backed by an OS-seeded random source
    pub fn new(store: Arc<StatisticsStore>, weights: PlacementWeights) -> Self {
        Self::with_rng(store, weights, StdRng::from_os_rng())
    }
}

impl<R: Rng + Send> PlacementSelector<R> {
    /// Create a selector with a caller-provided random source
    pub fn with_rng(store: Arc<StatisticsStore>, weights: PlacementWeights, rng: R) -> Self {
        Self {
            store,
            weights,
            rng: Mutex::new(rng),
            metrics: PlacementMetrics::new(),
            logger: StructuredLogger::new("placement-selector"),
        }
    }

    pub fn weights(&self) -> &PlacementWeights {
        &self.weights
    }

    /// Choose one of `candidates`.
    ///
    /// Fails only when `candidates` is empty. Unknown or overloaded nodes
    /// never fail a request; if no candidate is relevant one is picked at
    /// random.
    pub fn select_node(&self, candidates: &[NodeId]) -> Result<NodeId> {
        self.select_node_with_hint(candidates, None)
    }

    /// Choose one of `candidates`, honouring a caller-pinned node.
    ///
    /// A hint that is among the candidates is returned as is, without
    /// looking at statistics. Any other hint is ignored.
    pub fn select_node_with_hint(
        &self,
        candidates: &[NodeId],
        hint: Option<&NodeId>,
    ) -> Result<NodeId> {
        let pinned = hint.filter(|node| candidates.contains(*node));

        let (node, path) = match (pinned, candidates) {
            (Some(node), _) => (node.clone(), DecisionPath::Hint),
            (None, []) => return Err(PlacementError::NoEligibleNode),
            (None, [only]) => (only.clone(), DecisionPath::Single),
            (None, _) if self.store.is_empty() => {
                (self.random_candidate(candidates), DecisionPath::Bootstrap)
            }
            (None, _) => match self.best_of_sample(candidates) {
                Some(best) => (best.node, DecisionPath::Scored),
                None => (self.random_candidate(candidates), DecisionPath::Fallback),
            },
        };

        debug!(
            node = %node,
            candidates = candidates.len(),
            path = path.as_str(),
            "Placement decision"
        );
        if path == DecisionPath::Fallback {
            self.logger.log_placement_fallback(candidates.len());
        }
        self.metrics.inc_placement(path);

        Ok(node)
    }

    /// Score a random subset of relevant candidates and return the best one
    fn best_of_sample(&self, candidates: &[NodeId]) -> Option<ScoredCandidate> {
        let mut relevant: Vec<(&NodeId, ResourceSample)> = candidates
            .iter()
            .filter_map(|node| {
                let sample = self.store.get(node)?;
                (!sample.is_overloaded).then_some((node, sample))
            })
            .collect();

        if relevant.is_empty() {
            return None;
        }

        // draw without replacement by taking entries out of the working list
        let k = sample_size(relevant.len());
        let sampled: Vec<(&NodeId, ResourceSample)> = {
            let mut rng = self.lock_rng();
            (0..k)
                .map(|_| {
                    let index = rng.random_range(0..relevant.len());
                    relevant.swap_remove(index)
                })
                .collect()
        };

        sampled
            .into_iter()
            .map(|(node, sample)| ScoredCandidate {
                node: node.clone(),
                score: score(&sample, &self.weights),
            })
            .reduce(|best, candidate| {
                if candidate.score > best.score {
                    candidate
                } else {
                    best
                }
            })
    }

    fn random_candidate(&self, candidates: &[NodeId]) -> NodeId {
        let index = self.lock_rng().random_range(0..candidates.len());
        candidates[index].clone()
    }

    fn lock_rng(&self) -> MutexGuard<'_, R> {
        // the generator holds no invariant a panicking holder could break
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Number of relevant candidates compared per decision: ⌈√n⌉
pub fn sample_size(relevant: usize) -> usize {
    (relevant as f64).sqrt().ceil() as usize
}
