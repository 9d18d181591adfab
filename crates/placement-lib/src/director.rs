//! Balanced resource placement director
//!
//! Entry point for callers: validates the options once, owns the statistics
//! store fed by the collector and answers placement requests.

use crate::error::Result;
use crate::listener::StatisticsListener;
use crate::models::{NodeId, ResourceSample};
use crate::options::PlacementOptions;
use crate::selector::PlacementSelector;
use crate::store::StatisticsStore;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

pub struct PlacementDirector<R = StdRng> {
    options: PlacementOptions,
    store: Arc<StatisticsStore>,
    selector: PlacementSelector<R>,
}

impl PlacementDirector<StdRng> {
    /// Create a director; invalid weights are rejected here, never per request
    pub fn new(options: PlacementOptions) -> Result<Self> {
        options.validate()?;
        let store = Arc::new(StatisticsStore::new(options.adaptive_filtering));
        let selector = PlacementSelector::new(Arc::clone(&store), options.weights);

        Ok(Self {
            options,
            store,
            selector,
        })
    }
}

impl<R: Rng + Send> PlacementDirector<R> {
    /// Create a director with a caller-provided random source
    pub fn with_rng(options: PlacementOptions, rng: R) -> Result<Self> {
        options.validate()?;
        let store = Arc::new(StatisticsStore::new(options.adaptive_filtering));
        let selector = PlacementSelector::with_rng(Arc::clone(&store), options.weights, rng);

        Ok(Self {
            options,
            store,
            selector,
        })
    }

    pub fn options(&self) -> &PlacementOptions {
        &self.options
    }

    /// The store to register with the collector as a statistics listener
    pub fn store(&self) -> Arc<StatisticsStore> {
        Arc::clone(&self.store)
    }

    /// Choose a node for a new unit of work
    pub fn select_node(&self, candidates: &[NodeId]) -> Result<NodeId> {
        self.selector.select_node(candidates)
    }

    /// Choose a node, returning `hint` when it is one of the candidates
    pub fn select_node_with_hint(
        &self,
        candidates: &[NodeId],
        hint: Option<&NodeId>,
    ) -> Result<NodeId> {
        self.selector.select_node_with_hint(candidates, hint)
    }

    /// Statistics currently used for placement decisions
    pub fn statistics(&self) -> HashMap<NodeId, ResourceSample> {
        self.store.snapshot()
    }
}

impl<R: Rng + Send> StatisticsListener for PlacementDirector<R> {
    fn on_statistics_changed(&self, node: &NodeId, sample: &ResourceSample) {
        self.store.on_statistics_changed(node, sample);
    }

    fn on_node_removed(&self, node: &NodeId) {
        self.store.on_node_removed(node);
    }
}
