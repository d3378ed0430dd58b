use super::{Force, InteractionKind, separation};
use crate::core::forcefield::dynamics::Dynamics;
use crate::core::forcefield::kernels::Harmonic;
use crate::core::models::chains::Chains;
use crate::core::models::state::State;
use crate::engine::config::TetherConfig;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bond {
    i: usize,
    dist0: f64,
}

/// Harmonic springs between consecutive members of each chain.
#[derive(Debug, Clone)]
pub struct Tether {
    harmonic: Harmonic,
    bonds: Vec<Bond>,
}

impl Tether {
    /// Every bond gets the default equilibrium length from `config`.
    pub fn new(config: &TetherConfig, chains: &Chains) -> Self {
        Self::with_lengths(config, chains, |_| None)
    }

    /// `dist0(i)` may override the equilibrium length of bond `(i, i+1)`, e.g. with the
    /// distance observed in a reference structure.
    pub fn with_lengths<F>(config: &TetherConfig, chains: &Chains, dist0: F) -> Self
    where
        F: Fn(usize) -> Option<f64>,
    {
        let bonds = (0..chains.len())
            .filter(|&i| chains.has_bond(i))
            .map(|i| Bond {
                i,
                dist0: dist0(i).unwrap_or(config.dist0),
            })
            .collect();
        Self {
            harmonic: Harmonic::new(config.h1, config.h2),
            bonds,
        }
    }

    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }
}

impl Force for Tether {
    const KIND: InteractionKind = InteractionKind::Tether;

    fn compute_parallel(&mut self, state: &State, dynamics: &mut Dynamics) {
        let n = state.len();
        let harmonic = self.harmonic;
        let partial = self
            .bonds
            .par_iter()
            .fold(
                || Dynamics::zeros(n),
                |mut acc, bond| {
                    let (r12, norm) = separation(state, bond.i, bond.i + 1);
                    if norm > 0.0 {
                        let (v, dv) = harmonic.evaluate(norm, bond.dist0);
                        acc.add_pair(bond.i, bond.i + 1, &(r12 / norm), v, dv);
                    }
                    acc
                },
            )
            .reduce(Dynamics::default, |a, b| a + b);
        *dynamics += partial;
    }
}
