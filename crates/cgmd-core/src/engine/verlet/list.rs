use super::grid::{CellGrid, brute_force_pairs};
use super::spec::InteractionSpec;
use super::{ListenerId, Pair};
use crate::core::models::chains::Chains;
use crate::core::models::state::State;
use crate::core::topology::Topology;
use crate::engine::config::{RebuildStrategy, VerletConfig};
use crate::engine::error::EngineError;
use nalgebra::Vector3;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
struct Snapshot {
    positions: Vec<Vector3<f64>>,
    top: Topology,
}

/// Cell/Verlet list: the canonical pair list plus the state it was built from.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    config: VerletConfig,
    chains: Arc<Chains>,
    listeners: Vec<(&'static str, InteractionSpec)>,
    merged: Option<InteractionSpec>,
    pairs: Vec<Pair>,
    snapshot: Option<Snapshot>,
    rebuilds: usize,
}

impl SpatialIndex {
    pub fn new(config: VerletConfig, chains: Arc<Chains>) -> Self {
        Self {
            config,
            chains,
            listeners: Vec::new(),
            merged: None,
            pairs: Vec::new(),
            snapshot: None,
            rebuilds: 0,
        }
    }

    /// Adds an interaction's requirements to the merged spec. Listeners are notified in
    /// the order they were registered.
    pub fn register(
        &mut self,
        name: &'static str,
        spec: InteractionSpec,
    ) -> Result<ListenerId, EngineError> {
        if self.snapshot.is_some() {
            return Err(EngineError::LateRegistration { interaction: name });
        }
        let merged = match self.merged {
            Some(current) => current.merge(spec),
            None => spec,
        };
        self.merged = Some(merged);
        self.listeners.push((name, spec));
        info!(
            interaction = name,
            cutoff = merged.cutoff(),
            min_bond_sep = merged.min_bond_sep,
            "Registered nonlocal interaction."
        );
        Ok(self.listeners.len() - 1)
    }

    pub fn merged_spec(&self) -> Option<InteractionSpec> {
        self.merged
    }

    /// Merged cutoff plus the skin.
    pub fn effective_cutoff(&self) -> f64 {
        self.merged.map_or(0.0, |spec| spec.cutoff()) + self.config.pad
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// `true` on the first call, or once the largest displacement since the last build
    /// plus twice the box-shape drift reaches half the skin.
    pub fn needs_rebuild(&self, state: &State) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return true;
        };
        if snapshot.positions.len() != state.positions.len() {
            return true;
        }
        let max_move = state
            .positions
            .par_iter()
            .zip(&snapshot.positions)
            .map(|(r, r0)| (r - r0).norm())
            .reduce(|| 0.0, f64::max);
        max_move + 2.0 * state.top.shift_since(&snapshot.top) >= self.config.pad / 2.0
    }

    /// Rebuilds the list if [`Self::needs_rebuild`] says so, then hands it to every
    /// listener in registration order. Returns whether a rebuild happened.
    pub fn ensure_valid<F>(&mut self, state: &State, notify: F) -> bool
    where
        F: FnMut(ListenerId, &mut Vec<Pair>),
    {
        if !self.needs_rebuild(state) {
            return false;
        }
        self.rebuild(state, notify);
        true
    }

    #[instrument(skip_all, name = "verlet_rebuild")]
    fn rebuild<F>(&mut self, state: &State, mut notify: F)
    where
        F: FnMut(ListenerId, &mut Vec<Pair>),
    {
        self.snapshot = Some(Snapshot {
            positions: state.positions.clone(),
            top: state.top,
        });
        self.rebuilds += 1;

        let Some(spec) = self.merged else {
            warn!("Pair list rebuilt with no registered interactions; leaving it empty.");
            self.pairs.clear();
            return;
        };
        let eff_cutoff = spec.cutoff() + self.config.pad;

        self.pairs = match self.config.strategy {
            RebuildStrategy::CellGrid => {
                let grid = CellGrid::build(&state.top, &state.positions, eff_cutoff);
                let pairs = grid.pairs(
                    &state.top,
                    &state.positions,
                    &self.chains,
                    eff_cutoff,
                    spec.min_bond_sep,
                );
                debug!(
                    pairs = pairs.len(),
                    grid = ?grid.shape().as_slice(),
                    strategy = "cell-grid",
                    "Rebuilt pair list."
                );
                pairs
            }
            RebuildStrategy::BruteForce => {
                let pairs = brute_force_pairs(
                    &state.top,
                    &state.positions,
                    &self.chains,
                    eff_cutoff,
                    spec.min_bond_sep,
                );
                debug!(pairs = pairs.len(), strategy = "brute-force", "Rebuilt pair list.");
                pairs
            }
        };

        for id in 0..self.listeners.len() {
            notify(id, &mut self.pairs);
        }
    }
}
