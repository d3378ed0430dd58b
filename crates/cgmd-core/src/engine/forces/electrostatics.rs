use super::{Force, InteractionKind, NonlocalForce, separation};
use crate::core::forcefield::dynamics::Dynamics;
use crate::core::forcefield::kernels::DebyeHuckel;
use crate::core::forcefield::params::Polarization;
use crate::core::models::chains::Chains;
use crate::core::models::state::State;
use crate::engine::config::{DebyeHuckelConfig, Permittivity};
use crate::engine::error::EngineError;
use crate::engine::services::Services;
use crate::engine::verlet::Pair;
use crate::engine::verlet::spec::InteractionSpec;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// A pair of charged particles with the product of their charges, in units of `e^2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargedPair {
    pub i1: usize,
    pub i2: usize,
    pub q1_q2: f64,
}

/// Screened electrostatics between charged residues.
///
/// Positive and negative residues carry `+1` and `-1`; every other residue is neutral. On
/// rebuild only pairs with two charged members are kept, which is usually a small share
/// of the list.
#[derive(Debug, Clone)]
pub struct Electrostatics {
    kernel: DebyeHuckel,
    min_bond_sep: usize,
    chains: Arc<Chains>,
    charges: Vec<i8>,
    pairs: Vec<ChargedPair>,
}

impl Electrostatics {
    pub fn new(config: &DebyeHuckelConfig, services: &Services) -> Result<Self, EngineError> {
        let kernel = match config.permittivity {
            Permittivity::Constant => DebyeHuckel::constant(
                config.coulomb,
                config.relative_permittivity,
                config.screening_dist,
            ),
            Permittivity::Relative => {
                DebyeHuckel::relative(config.coulomb, config.r0, config.screening_dist)
            }
        };

        let charges = services
            .types()
            .iter()
            .map(|&acid| {
                let spec = services.parameters().specificity(acid).ok_or(
                    EngineError::MissingParameter {
                        interaction: InteractionKind::DebyeHuckel.name(),
                        residue: acid,
                        parameter: "specificity",
                    },
                )?;
                Ok(match spec.polarization {
                    Polarization::PolarPos => 1,
                    Polarization::PolarNeg => -1,
                    _ => 0,
                })
            })
            .collect::<Result<Vec<i8>, EngineError>>()?;

        Ok(Self {
            kernel,
            min_bond_sep: config.min_bond_sep,
            chains: Arc::clone(services.chains()),
            charges,
            pairs: Vec::new(),
        })
    }

    pub fn charges(&self) -> &[i8] {
        &self.charges
    }

    pub fn pairs(&self) -> &[ChargedPair] {
        &self.pairs
    }
}

impl Force for Electrostatics {
    const KIND: InteractionKind = InteractionKind::DebyeHuckel;

    fn compute_parallel(&mut self, state: &State, dynamics: &mut Dynamics) {
        let n = state.len();
        let kernel = self.kernel;
        let cutoff = kernel.cutoff();
        let partial = self
            .pairs
            .par_iter()
            .fold(
                || Dynamics::zeros(n),
                |mut acc, pair| {
                    let (r12, norm) = separation(state, pair.i1, pair.i2);
                    if norm <= cutoff && norm > 0.0 {
                        let (v, dv) = kernel.evaluate(norm);
                        acc.add_pair(pair.i1, pair.i2, &(r12 / norm), pair.q1_q2 * v, pair.q1_q2 * dv);
                    }
                    acc
                },
            )
            .reduce(Dynamics::default, |a, b| a + b);
        *dynamics += partial;
    }
}

impl NonlocalForce for Electrostatics {
    fn spec(&self) -> InteractionSpec {
        InteractionSpec::new(self.kernel.cutoff(), self.min_bond_sep)
    }

    fn on_pair_list_changed(&mut self, pairs: &mut Vec<Pair>) {
        let chains = &self.chains;
        let charges = &self.charges;
        let min_bond_sep = self.min_bond_sep;
        self.pairs.clear();
        self.pairs.extend(pairs.iter().filter_map(|&(i1, i2)| {
            let q1_q2 = charges[i1] * charges[i2];
            (q1_q2 != 0 && chains.sep_by_at_least(i1, i2, min_bond_sep)).then_some(ChargedPair {
                i1,
                i2,
                q1_q2: f64::from(q1_q2),
            })
        }));
        debug!(charged = self.pairs.len(), "Debye-Hückel pairs refreshed.");
    }
}
