use super::{Force, InteractionKind, NonlocalForce, separation};
use crate::core::forcefield::dynamics::Dynamics;
use crate::core::forcefield::kernels::ShiftedTruncatedLj;
use crate::core::models::chains::Chains;
use crate::core::models::state::State;
use crate::engine::config::PauliConfig;
use crate::engine::verlet::Pair;
use crate::engine::verlet::spec::InteractionSpec;
use rayon::prelude::*;
use std::sync::Arc;

/// Short-range excluded volume between every pair of non-neighbouring particles.
#[derive(Debug, Clone)]
pub struct PauliExclusion {
    stlj: ShiftedTruncatedLj,
    min_bond_sep: usize,
    chains: Arc<Chains>,
    pairs: Vec<Pair>,
}

impl PauliExclusion {
    pub fn new(config: &PauliConfig, chains: Arc<Chains>) -> Self {
        Self {
            stlj: ShiftedTruncatedLj::new(config.r_cut, config.depth),
            min_bond_sep: config.min_bond_sep,
            chains,
            pairs: Vec::new(),
        }
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }
}

impl Force for PauliExclusion {
    const KIND: InteractionKind = InteractionKind::Pauli;

    fn compute_parallel(&mut self, state: &State, dynamics: &mut Dynamics) {
        let n = state.len();
        let stlj = self.stlj;
        let partial = self
            .pairs
            .par_iter()
            .fold(
                || Dynamics::zeros(n),
                |mut acc, &(i1, i2)| {
                    let (r12, norm) = separation(state, i1, i2);
                    if norm < stlj.cutoff() && norm > 0.0 {
                        let (v, dv) = stlj.evaluate(norm);
                        acc.add_pair(i1, i2, &(r12 / norm), v, dv);
                    }
                    acc
                },
            )
            .reduce(Dynamics::default, |a, b| a + b);
        *dynamics += partial;
    }
}

impl NonlocalForce for PauliExclusion {
    fn spec(&self) -> InteractionSpec {
        InteractionSpec::new(self.stlj.cutoff(), self.min_bond_sep)
    }

    fn on_pair_list_changed(&mut self, pairs: &mut Vec<Pair>) {
        let chains = &self.chains;
        let min_bond_sep = self.min_bond_sep;
        self.pairs.clear();
        self.pairs.extend(
            pairs
                .iter()
                .copied()
                .filter(|&(i, j)| chains.sep_by_at_least(i, j, min_bond_sep)),
        );
    }
}
