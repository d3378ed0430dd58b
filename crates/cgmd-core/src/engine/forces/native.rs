use super::{Force, InteractionKind, NonlocalForce, separation};
use crate::core::forcefield::dynamics::Dynamics;
use crate::core::forcefield::kernels::LennardJones;
use crate::core::models::state::State;
use crate::engine::config::NativeContactsConfig;
use crate::engine::verlet::Pair;
use crate::engine::verlet::spec::InteractionSpec;
use itertools::{EitherOrBoth, Itertools};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::debug;

/// A contact present in the reference (native) structure.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct NativeContact {
    pub i: usize,
    pub j: usize,
    /// Separation at which the attraction is strongest, usually the native distance.
    pub r_min: f64,
}

impl NativeContact {
    fn key(&self) -> Pair {
        (self.i, self.j)
    }
}

/// Go-model attraction restricted to native pairs.
///
/// Native pairs found in the shared list are moved into a private list and removed from
/// the shared one, so no other interaction sees them.
#[derive(Debug, Clone)]
pub struct NativeContacts {
    depth: f64,
    cutoff: f64,
    min_bond_sep: usize,
    all: Vec<NativeContact>,
    current: Vec<NativeContact>,
}

impl NativeContacts {
    /// Contacts are normalised to `i < j`, sorted, and deduplicated (the first occurrence wins).
    pub fn new(config: &NativeContactsConfig, contacts: impl IntoIterator<Item = NativeContact>) -> Self {
        let mut all: Vec<NativeContact> = contacts
            .into_iter()
            .filter(|c| c.i != c.j)
            .map(|c| NativeContact {
                i: c.i.min(c.j),
                j: c.i.max(c.j),
                r_min: c.r_min,
            })
            .collect();
        all.sort_by_key(NativeContact::key);
        all.dedup_by_key(|c| c.key());

        Self {
            depth: config.depth,
            cutoff: config.cutoff,
            min_bond_sep: config.min_bond_sep,
            all,
            current: Vec::new(),
        }
    }

    pub fn contacts(&self) -> &[NativeContact] {
        &self.all
    }

    /// Native contacts currently within the pair list.
    pub fn active(&self) -> &[NativeContact] {
        &self.current
    }
}

impl Force for NativeContacts {
    const KIND: InteractionKind = InteractionKind::NativeContacts;

    fn compute_parallel(&mut self, state: &State, dynamics: &mut Dynamics) {
        let n = state.len();
        let (depth, cutoff) = (self.depth, self.cutoff);
        let partial = self
            .current
            .par_iter()
            .fold(
                || Dynamics::zeros(n),
                |mut acc, contact| {
                    let (r12, norm) = separation(state, contact.i, contact.j);
                    if norm <= cutoff && norm > 0.0 {
                        let (v, dv) = LennardJones::new(contact.r_min, depth).evaluate(norm);
                        acc.add_pair(contact.i, contact.j, &(r12 / norm), v, dv);
                    }
                    acc
                },
            )
            .reduce(Dynamics::default, |a, b| a + b);
        *dynamics += partial;
    }
}

impl NonlocalForce for NativeContacts {
    fn spec(&self) -> InteractionSpec {
        InteractionSpec::new(self.cutoff, self.min_bond_sep)
    }

    fn on_pair_list_changed(&mut self, pairs: &mut Vec<Pair>) {
        self.current.clear();
        let mut remaining = Vec::with_capacity(pairs.len());
        for entry in pairs
            .iter()
            .merge_join_by(&self.all, |pair, contact| (*pair).cmp(&contact.key()))
        {
            match entry {
                EitherOrBoth::Both(_, contact) => self.current.push(*contact),
                EitherOrBoth::Left(pair) => remaining.push(*pair),
                EitherOrBoth::Right(_) => {}
            }
        }
        debug!(
            claimed = self.current.len(),
            remaining = remaining.len(),
            "Native contacts claimed from the pair list."
        );
        *pairs = remaining;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::amino_acid::AminoAcid;
    use crate::core::topology::Topology;
    use nalgebra::Vector3;

    fn contact(i: usize, j: usize, r_min: f64) -> NativeContact {
        NativeContact { i, j, r_min }
    }

    #[test]
    fn contacts_are_normalised_sorted_and_deduplicated() {
        let native = NativeContacts::new(
            &NativeContactsConfig::default(),
            vec![contact(5, 1, 6.0), contact(0, 4, 5.0), contact(1, 5, 7.0), contact(2, 2, 1.0)],
        );
        assert_eq!(native.contacts(), &[contact(0, 4, 5.0), contact(1, 5, 6.0)]);
    }

    #[test]
    fn claims_native_pairs_and_leaves_the_rest_sorted() {
        let mut native = NativeContacts::new(
            &NativeContactsConfig::default(),
            vec![contact(0, 4, 5.0), contact(2, 7, 6.0), contact(3, 9, 6.0)],
        );
        let mut shared = vec![(0, 3), (0, 4), (1, 5), (2, 7), (4, 8)];
        native.on_pair_list_changed(&mut shared);

        assert_eq!(shared, vec![(0, 3), (1, 5), (4, 8)]);
        assert_eq!(native.active(), &[contact(0, 4, 5.0), contact(2, 7, 6.0)]);
    }

    #[test]
    fn attracts_at_the_native_minimum_only_through_lj() {
        let mut native =
            NativeContacts::new(&NativeContactsConfig::default(), vec![contact(0, 1, 5.0)]);
        let mut shared = vec![(0, 1)];
        native.on_pair_list_changed(&mut shared);
        let state = State::new(
            vec![Vector3::zeros(), Vector3::new(6.0, 0.0, 0.0)],
            vec![AminoAcid::Alanine; 2],
            Topology::open(),
        );
        let mut dynamics = Dynamics::zeros(2);
        native.compute_parallel(&state, &mut dynamics);
        assert!(dynamics.energy < 0.0);
        assert!(dynamics.forces[0].x > 0.0);
        assert!(dynamics.forces[1].x < 0.0);
    }
}
