//! Quasi-adiabatic contacts: dynamically formed and broken attractive contacts whose
//! strength is ramped in and out over time.
//!
//! Candidate contacts are found during the parallel phase from the free pairs of the
//! pair list, using the local chain geometry and the remaining valence of both
//! particles. They are committed in the sequential phase in ascending pair order, so the
//! set of contacts formed in a step does not depend on the number of worker threads.

pub mod commit;
pub mod contact;
pub mod geometry;
pub mod valence;

use super::{Force, InteractionKind, NonlocalForce, separation};
use crate::core::forcefield::dynamics::Dynamics;
use crate::core::forcefield::kernels::{LennardJones, SidechainLj};
use crate::core::models::amino_acid::AminoAcid;
use crate::core::models::chains::Chains;
use crate::core::models::state::State;
use crate::engine::config::QuasiAdiabaticConfig;
use crate::engine::error::EngineError;
use crate::engine::services::Services;
use crate::engine::verlet::Pair;
use crate::engine::verlet::spec::InteractionSpec;
use commit::FormationCandidate;
use contact::{Contact, ContactKind, ContactStatus, FreePair};
use geometry::Thresholds;
use itertools::{EitherOrBoth, Itertools};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, trace};
use valence::ValenceTable;

#[derive(Debug, Clone)]
struct Potentials {
    bb: LennardJones,
    bs: LennardJones,
    /// Sidechain potentials indexed by `a.index() * COUNT + b.index()`; only residue pairs
    /// present in the system are filled.
    ss: Vec<Option<SidechainLj>>,
}

impl Potentials {
    fn new(
        config: &QuasiAdiabaticConfig,
        services: &Services,
    ) -> Result<Self, EngineError> {
        let present: Vec<AminoAcid> = services.types().iter().copied().sorted().dedup().collect();
        let mut ss = vec![None; AminoAcid::COUNT * AminoAcid::COUNT];
        for (&a, &b) in present.iter().cartesian_product(&present) {
            let sink_max = services.parameters().pairwise_min_dist(a, b).ok_or(
                EngineError::MissingParameter {
                    interaction: InteractionKind::QuasiAdiabatic.name(),
                    residue: a,
                    parameter: "pairwise-min-dist",
                },
            )?;
            ss[Self::ss_index(a, b)] = Some(SidechainLj::new(sink_max, config.depth));
        }
        Ok(Self {
            bb: LennardJones::new(config.bb_r_min, config.depth),
            bs: LennardJones::new(config.bs_r_min, config.depth),
            ss,
        })
    }

    #[inline]
    fn ss_index(a: AminoAcid, b: AminoAcid) -> usize {
        a.index() * AminoAcid::COUNT + b.index()
    }

    #[inline]
    fn ss(&self, a: AminoAcid, b: AminoAcid) -> Option<&SidechainLj> {
        self.ss[Self::ss_index(a, b)].as_ref()
    }

    fn max_cutoff(&self) -> f64 {
        self.ss
            .iter()
            .flatten()
            .map(SidechainLj::cutoff)
            .fold(self.bb.cutoff().max(self.bs.cutoff()), f64::max)
    }

    /// Largest sidechain well, or zero if no sidechain potential is defined.
    fn max_sink(&self) -> f64 {
        self.ss.iter().flatten().map(|lj| lj.sink_max).fold(0.0, f64::max)
    }

    /// Distance at which a contact of `kind` is at full strength.
    fn r_min(&self, kind: ContactKind, a1: AminoAcid, a2: AminoAcid) -> Option<f64> {
        match kind {
            ContactKind::BackboneBackbone => Some(self.bb.r_min),
            ContactKind::BackboneSidechain | ContactKind::SidechainBackbone => Some(self.bs.r_min),
            ContactKind::SidechainSidechain => self.ss(a1, a2).map(|lj| lj.sink_max),
        }
    }

    fn evaluate(&self, kind: ContactKind, a1: AminoAcid, a2: AminoAcid, r: f64) -> Option<(f64, f64)> {
        match kind {
            ContactKind::BackboneBackbone => Some(self.bb.evaluate(r)),
            ContactKind::BackboneSidechain | ContactKind::SidechainBackbone => Some(self.bs.evaluate(r)),
            ContactKind::SidechainSidechain => self.ss(a1, a2).map(|lj| lj.evaluate(r)),
        }
    }
}

/// The quasi-adiabatic contact interaction.
///
/// Valence counters change only in [`Force::compute_sequential`]: slots of removed or
/// dropped contacts are returned first, then new contacts are charged. Candidates found
/// in the parallel phase are screened against the counters as they stood before those
/// returns, so a contact that needs freshly released slots forms one step later.
#[derive(Debug, Clone)]
pub struct QuasiAdiabatic {
    config: QuasiAdiabaticConfig,
    limits: Thresholds,
    chains: Arc<Chains>,
    types: Vec<AminoAcid>,
    potentials: Potentials,
    formation_max_dist: f64,
    valence: ValenceTable,
    contacts: Vec<Contact>,
    free_pairs: Vec<FreePair>,
    candidates: Vec<FormationCandidate>,
    pending_releases: Vec<Contact>,
}

impl QuasiAdiabatic {
    pub fn new(config: &QuasiAdiabaticConfig, services: &Services) -> Result<Self, EngineError> {
        let potentials = Potentials::new(config, services)?;
        let valence = ValenceTable::new(services.types(), services.parameters())?;
        let limits = Thresholds::from(config);
        let formation_max_dist = limits
            .bb_max_dist
            .max(limits.bs_max_dist)
            .max(potentials.max_sink() * config.formation_tolerance);

        Ok(Self {
            config: *config,
            limits,
            chains: Arc::clone(services.chains()),
            types: services.types().to_vec(),
            potentials,
            formation_max_dist,
            valence,
            contacts: Vec::new(),
            free_pairs: Vec::new(),
            candidates: Vec::new(),
            pending_releases: Vec::new(),
        })
    }

    /// Live contacts, plus contacts removed since the last commit.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn free_pairs(&self) -> &[FreePair] {
        &self.free_pairs
    }

    pub fn valence(&self) -> &ValenceTable {
        &self.valence
    }

    pub fn valence_mut(&mut self) -> &mut ValenceTable {
        &mut self.valence
    }

    /// Pairs farther apart than this never become candidates.
    pub fn formation_max_dist(&self) -> f64 {
        self.formation_max_dist
    }

    /// Removes the live contact between `i` and `j`, if any. The pair becomes free again
    /// and its slots are returned at the next commit.
    pub fn remove_contact(&mut self, i: usize, j: usize) -> bool {
        let key = (i.min(j), i.max(j));
        let Some(contact) = self
            .contacts
            .iter_mut()
            .find(|c| c.key() == key && c.is_active())
        else {
            return false;
        };
        contact.status = ContactStatus::Removed;
        self.free_pairs.push(FreePair::new(key.0, key.1));
        self.pending_releases.push(*contact);
        true
    }

    fn is_eligible(&self, (i1, i2): Pair) -> bool {
        !self.chains.is_terminal(i1)
            && !self.chains.is_terminal(i2)
            && self.chains.sep_by_at_least(i1, i2, self.config.min_bond_sep)
    }

    /// Applies live contacts and advances their status. Returns the indices of contacts
    /// whose breaking ramp finished.
    fn evaluate_contacts(&mut self, state: &State, dynamics: &mut Dynamics) -> Vec<usize> {
        let n = state.len();
        let t = state.t;
        let QuasiAdiabaticConfig {
            formation_time,
            breaking_time,
            breaking_tolerance,
            ..
        } = self.config;
        let potentials = &self.potentials;
        let types = &self.types;

        let (partial, mut finished) = self
            .contacts
            .par_iter_mut()
            .enumerate()
            .fold(
                || (Dynamics::zeros(n), Vec::new()),
                |(mut acc, mut finished), (idx, contact)| {
                    let (a1, a2) = (types[contact.i1], types[contact.i2]);
                    let stage = contact.stage(t, formation_time, breaking_time);
                    let (r12, norm) = separation(state, contact.i1, contact.i2);

                    if stage > 0.0 && norm > 0.0 {
                        if let Some((v, dv)) = potentials.evaluate(contact.kind, a1, a2, norm) {
                            acc.add_pair(contact.i1, contact.i2, &(r12 / norm), stage * v, stage * dv);
                        }
                    }

                    match contact.status {
                        ContactStatus::Forming => {
                            let r_min = potentials.r_min(contact.kind, a1, a2).unwrap_or(0.0);
                            if norm > breaking_tolerance * r_min {
                                contact.begin_breaking(t, stage, breaking_time);
                            }
                        }
                        ContactStatus::Breaking if stage <= 0.0 => {
                            contact.status = ContactStatus::Removed;
                            finished.push(idx);
                        }
                        _ => {}
                    }
                    (acc, finished)
                },
            )
            .reduce(
                || (Dynamics::default(), Vec::new()),
                |(a, mut fa), (b, fb)| {
                    fa.extend(fb);
                    (a + b, fa)
                },
            );
        *dynamics += partial;
        finished.sort_unstable();
        finished
    }

    fn find_candidates(&self, state: &State) -> Vec<FormationCandidate> {
        let frames = geometry::frames(state, &self.chains);
        let max_dist_sq = self.formation_max_dist * self.formation_max_dist;
        let t = state.t;

        self.free_pairs
            .par_iter()
            .enumerate()
            .filter(|(_, free)| !free.taken)
            .filter_map(|(idx, free)| {
                let (i1, i2) = (free.i1, free.i2);
                let (r12, norm) = separation(state, i1, i2);
                if norm * norm >= max_dist_sq || norm == 0.0 {
                    return None;
                }
                let f1 = frames[i1].as_ref()?;
                let f2 = frames[i2].as_ref()?;
                let sink_max = self
                    .potentials
                    .ss(self.types[i1], self.types[i2])
                    .map_or(0.0, |lj| lj.sink_max);
                let kind = geometry::classify(&self.limits, f1, f2, &(r12 / norm), norm, sink_max)?;
                let deltas = self.valence.creation_deltas(i1, i2, kind);
                self.valence
                    .admits(i1, i2, &deltas)
                    .then(|| FormationCandidate {
                        contact: Contact::forming(i1, i2, kind, t),
                        free_pair: idx,
                        deltas,
                    })
            })
            .collect()
    }
}

impl Force for QuasiAdiabatic {
    const KIND: InteractionKind = InteractionKind::QuasiAdiabatic;

    fn compute_parallel(&mut self, state: &State, dynamics: &mut Dynamics) {
        let finished = self.evaluate_contacts(state, dynamics);
        for idx in finished {
            let contact = self.contacts[idx];
            self.free_pairs.push(FreePair::new(contact.i1, contact.i2));
            self.pending_releases.push(contact);
        }
        self.candidates = self.find_candidates(state);
        trace!(
            contacts = self.contacts.len(),
            candidates = self.candidates.len(),
            "Quasi-adiabatic parallel phase done."
        );
    }

    fn compute_sequential(&mut self, _state: &State, _dynamics: &mut Dynamics) {
        for contact in self.pending_releases.drain(..) {
            self.valence.release(contact.i1, contact.i2, contact.kind);
        }

        let candidates = std::mem::take(&mut self.candidates);
        let produced = candidates.len();
        let committed = commit::commit(candidates, &mut self.valence, &mut self.free_pairs);
        if produced > 0 {
            trace!(
                produced,
                committed = committed.len(),
                rejected = produced - committed.len(),
                "Committed quasi-adiabatic contacts."
            );
        }

        self.contacts.retain(Contact::is_active);
        self.contacts.extend(committed);
    }
}

impl NonlocalForce for QuasiAdiabatic {
    fn spec(&self) -> InteractionSpec {
        InteractionSpec::new(self.potentials.max_cutoff(), self.config.min_bond_sep)
    }

    fn on_pair_list_changed(&mut self, pairs: &mut Vec<Pair>) {
        let mut previous = std::mem::take(&mut self.contacts);
        previous.retain(Contact::is_active);
        previous.sort_unstable_by_key(Contact::key);
        self.free_pairs.clear();

        let eligible: Vec<Pair> = pairs.iter().copied().filter(|&p| self.is_eligible(p)).collect();
        for entry in eligible
            .into_iter()
            .merge_join_by(previous, |pair, contact| pair.cmp(&contact.key()))
        {
            match entry {
                EitherOrBoth::Both(_, contact) => self.contacts.push(contact),
                EitherOrBoth::Left((i1, i2)) => self.free_pairs.push(FreePair::new(i1, i2)),
                EitherOrBoth::Right(contact) => self.pending_releases.push(contact),
            }
        }
        debug!(
            kept = self.contacts.len(),
            free = self.free_pairs.len(),
            dropped = self.pending_releases.len(),
            "Quasi-adiabatic pairs refreshed."
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::{Parameters, Polarization, Specificity};
    use crate::core::topology::Topology;
    use nalgebra::Vector3;
    use proptest::prelude::*;
    use valence::Valence;

    fn params() -> Parameters {
        let mut params = Parameters::default();
        params.set_specificity(
            AminoAcid::Alanine,
            Specificity {
                polarization: Polarization::Hydrophobic,
                max_sidechain: 2,
                max_hydrophobic_ss: 2,
                max_polar_ss: 0,
            },
        );
        params.set_pairwise_min_dist(AminoAcid::Alanine, AminoAcid::Alanine, 6.0);
        params
    }

    fn config() -> QuasiAdiabaticConfig {
        QuasiAdiabaticConfig {
            bb_r_min: 5.6,
            ..Default::default()
        }
    }

    /// Bent three-particle chains centred at `(x, 0, z)`, all in planes normal to z.
    fn stacked_chains(centres: &[(f64, f64)]) -> (State, Services) {
        let mut positions = Vec::new();
        for &(x, z) in centres {
            positions.push(Vector3::new(x - 3.0, -2.0, z));
            positions.push(Vector3::new(x, 0.0, z));
            positions.push(Vector3::new(x + 3.0, -2.0, z));
        }
        let n = positions.len();
        let ranges = (0..centres.len()).map(|c| 3 * c..3 * c + 3).collect();
        let types = vec![AminoAcid::Alanine; n];
        let services = Services::new(Chains::new(n, ranges).unwrap(), params(), types.clone()).unwrap();
        (State::new(positions, types, Topology::open()), services)
    }

    fn all_pairs(n: usize) -> Vec<Pair> {
        (0..n).tuple_combinations().collect()
    }

    fn step(qa: &mut QuasiAdiabatic, state: &State) -> Dynamics {
        let mut dynamics = Dynamics::zeros(state.len());
        qa.compute_parallel(state, &mut dynamics);
        qa.compute_sequential(state, &mut dynamics);
        dynamics
    }

    #[test]
    fn only_interior_particles_become_free_pairs() {
        let (state, services) = stacked_chains(&[(0.0, 0.0), (0.0, 5.5)]);
        let mut qa = QuasiAdiabatic::new(&config(), &services).unwrap();
        let mut pairs = all_pairs(state.len());
        qa.on_pair_list_changed(&mut pairs);
        assert_eq!(qa.free_pairs(), &[FreePair::new(1, 4)]);
        assert_eq!(pairs.len(), 15);
    }

    #[test]
    fn spec_covers_the_widest_potential() {
        let (_, services) = stacked_chains(&[(0.0, 0.0)]);
        let qa = QuasiAdiabatic::new(&config(), &services).unwrap();
        let spec = qa.spec();
        assert_eq!(spec.min_bond_sep, 3);
        assert!((spec.cutoff() - LennardJones::new(6.8, 1.0).cutoff()).abs() < 1e-9);
        assert_eq!(qa.formation_max_dist(), 6.8);
    }

    #[test]
    fn missing_sidechain_distance_is_a_setup_error() {
        let mut params = params();
        let alanine = *params.specificity(AminoAcid::Alanine).unwrap();
        params.set_specificity(AminoAcid::Glycine, alanine);
        let services = Services::new(
            Chains::single(2),
            params,
            vec![AminoAcid::Alanine, AminoAcid::Glycine],
        )
        .unwrap();
        let result = QuasiAdiabatic::new(&config(), &services);
        assert!(matches!(
            result,
            Err(EngineError::MissingParameter {
                parameter: "pairwise-min-dist",
                ..
            })
        ));
    }

    #[test]
    fn stacked_backbones_form_and_ramp_up_a_contact() {
        let (mut state, services) = stacked_chains(&[(0.0, 0.0), (0.0, 5.5)]);
        let mut qa = QuasiAdiabatic::new(&config(), &services).unwrap();
        qa.on_pair_list_changed(&mut all_pairs(state.len()));

        let dynamics = step(&mut qa, &state);
        assert_eq!(dynamics.energy, 0.0);
        assert_eq!(
            qa.contacts(),
            &[Contact::forming(1, 4, ContactKind::BackboneBackbone, 0.0)]
        );
        assert!(qa.free_pairs()[0].taken);
        assert_eq!(qa.valence().get(1).backbone, 1);
        assert_eq!(qa.valence().get(4).backbone, 1);

        state.t = 5.0;
        let half = step(&mut qa, &state);
        state.t = 10.0;
        let full = step(&mut qa, &state);
        let (v, _) = LennardJones::new(5.6, 1.0).evaluate(5.5);
        assert!((half.energy - 0.5 * v).abs() < 1e-9);
        assert!((full.energy - v).abs() < 1e-9);
        assert_eq!(qa.contacts()[0].status, ContactStatus::Forming);
        assert_eq!(qa.contacts().len(), 1);
    }

    #[test]
    fn exhausted_valence_blocks_formation() {
        let (state, services) = stacked_chains(&[(0.0, 0.0), (0.0, 5.5)]);
        let mut qa = QuasiAdiabatic::new(&config(), &services).unwrap();
        qa.valence_mut().set(4, Valence::new(0, 2, 2, 0));
        qa.on_pair_list_changed(&mut all_pairs(state.len()));

        step(&mut qa, &state);
        assert!(qa.contacts().is_empty());
        assert!(!qa.free_pairs()[0].taken);
        assert_eq!(qa.valence().get(1), Valence::new(2, 2, 2, 0));
        assert_eq!(qa.valence().get(4), Valence::new(0, 2, 2, 0));
    }

    #[test]
    fn blocked_pair_forms_a_mixed_contact_once_the_geometry_changes() {
        let (mut state, services) = stacked_chains(&[(0.0, 0.0), (0.0, 5.5)]);
        let mut qa = QuasiAdiabatic::new(&config(), &services).unwrap();
        qa.valence_mut().set(4, Valence::new(0, 2, 2, 0));
        qa.on_pair_list_changed(&mut all_pairs(state.len()));
        step(&mut qa, &state);
        assert!(qa.contacts().is_empty());

        // Past the backbone distance the pair only passes the backbone-sidechain test,
        // which charges particle 4 a sidechain slot instead.
        for p in &mut state.positions[3..6] {
            p.z = 5.7;
        }
        state.t = 1.0;
        step(&mut qa, &state);
        assert_eq!(
            qa.contacts(),
            &[Contact::forming(1, 4, ContactKind::BackboneSidechain, 1.0)]
        );
        assert!(qa.free_pairs()[0].taken);
        assert_eq!(qa.valence().get(1), Valence::new(1, 2, 2, 0));
        assert_eq!(qa.valence().get(4), Valence::new(0, 1, 2, 0));
    }

    #[test]
    fn breaking_starts_just_past_the_tolerance_distance() {
        let (mut state, services) = stacked_chains(&[(0.0, 0.0), (0.0, 5.5)]);
        let mut qa = QuasiAdiabatic::new(&config(), &services).unwrap();
        qa.on_pair_list_changed(&mut all_pairs(state.len()));
        step(&mut qa, &state);

        for p in &mut state.positions[3..6] {
            p.z = 5.6 - 1e-9;
        }
        step(&mut qa, &state);
        assert_eq!(qa.contacts()[0].status, ContactStatus::Forming);

        for p in &mut state.positions[3..6] {
            p.z = 5.6 + 1e-6;
        }
        step(&mut qa, &state);
        assert_eq!(qa.contacts()[0].status, ContactStatus::Breaking);
    }

    #[test]
    fn stretched_contacts_break_and_return_their_slots() {
        let (mut state, services) = stacked_chains(&[(0.0, 0.0), (0.0, 5.5)]);
        let mut qa = QuasiAdiabatic::new(&config(), &services).unwrap();
        let initial = qa.valence().clone();
        qa.on_pair_list_changed(&mut all_pairs(state.len()));
        step(&mut qa, &state);

        for p in &mut state.positions[3..6] {
            p.z = 8.0;
        }
        state.t = 10.0;
        step(&mut qa, &state);
        assert_eq!(qa.contacts()[0].status, ContactStatus::Breaking);

        state.t = 20.0;
        step(&mut qa, &state);
        assert!(qa.contacts().is_empty());
        assert_eq!(qa.valence(), &initial);
        assert_eq!(qa.free_pairs().iter().filter(|f| !f.taken).count(), 1);
    }

    #[test]
    fn removing_a_contact_frees_exactly_one_pair() {
        let (state, services) = stacked_chains(&[(0.0, 0.0), (0.0, 5.5)]);
        let mut qa = QuasiAdiabatic::new(&config(), &services).unwrap();
        let initial = qa.valence().clone();
        qa.on_pair_list_changed(&mut all_pairs(state.len()));
        step(&mut qa, &state);

        assert!(qa.remove_contact(4, 1));
        assert!(!qa.remove_contact(4, 1));
        let free: Vec<_> = qa.free_pairs().iter().filter(|f| !f.taken).collect();
        assert_eq!(free, vec![&FreePair::new(1, 4)]);

        let mut dynamics = Dynamics::zeros(state.len());
        qa.compute_sequential(&state, &mut dynamics);
        assert!(qa.contacts().is_empty());
        assert_eq!(qa.valence(), &initial);
    }

    #[test]
    fn dropped_pairs_release_their_contacts_at_the_next_commit() {
        let (state, services) = stacked_chains(&[(0.0, 0.0), (0.0, 5.5)]);
        let mut qa = QuasiAdiabatic::new(&config(), &services).unwrap();
        let initial = qa.valence().clone();
        qa.on_pair_list_changed(&mut all_pairs(state.len()));
        step(&mut qa, &state);

        qa.on_pair_list_changed(&mut Vec::new());
        assert!(qa.contacts().is_empty());
        assert!(qa.free_pairs().is_empty());
        assert_ne!(qa.valence(), &initial);

        step(&mut qa, &state);
        assert_eq!(qa.valence(), &initial);
    }

    #[derive(Debug, Clone)]
    enum Event {
        Shift { chain: usize, dz: f64, x: f64 },
        Advance(f64),
        Remove(usize),
        Rebuild(Vec<bool>),
    }

    const CHAINS: usize = 4;

    fn arb_event() -> impl Strategy<Value = Event> {
        let pairs = all_pairs(3 * CHAINS).len();
        prop_oneof![
            3 => (0..CHAINS, -1.5..1.5_f64, -1.0..1.0_f64)
                .prop_map(|(chain, dz, x)| Event::Shift { chain, dz, x }),
            3 => (0.5..8.0_f64).prop_map(Event::Advance),
            1 => (0..CHAINS).prop_map(Event::Remove),
            1 => prop::collection::vec(prop::bool::weighted(0.8), pairs).prop_map(Event::Rebuild),
        ]
    }

    fn arb_slots() -> impl Strategy<Value = Vec<Valence>> {
        prop::collection::vec(
            (0i8..3, 0i8..3, 0i8..3).prop_map(|(b, s, h)| Valence::new(b, s, h, 0)),
            3 * CHAINS,
        )
    }

    /// Counters equal the initial ones minus what every live contact holds.
    fn assert_slots_match_live_contacts(
        qa: &QuasiAdiabatic,
        initial: &ValenceTable,
    ) -> Result<(), TestCaseError> {
        let mut expected: Vec<Valence> = (0..initial.len()).map(|i| initial.get(i)).collect();
        for contact in qa.contacts().iter().filter(|c| c.is_active()) {
            let [d1, d2] = qa.valence().creation_deltas(contact.i1, contact.i2, contact.kind);
            expected[contact.i1] += d1;
            expected[contact.i2] += d2;
        }
        for (i, slots) in expected.iter().enumerate() {
            prop_assert_eq!(qa.valence().get(i), *slots, "particle {}", i);
        }
        prop_assert!(qa.valence().all_valid());
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn counters_track_live_contacts_across_steps(
            slots in arb_slots(),
            events in prop::collection::vec(arb_event(), 1..24),
        ) {
            let centres: Vec<(f64, f64)> = (0..CHAINS).map(|c| (0.0, 5.5 * c as f64)).collect();
            let (mut state, services) = stacked_chains(&centres);
            let mut qa = QuasiAdiabatic::new(&config(), &services).unwrap();
            for (i, &valence) in slots.iter().enumerate() {
                qa.valence_mut().set(i, valence);
            }
            let initial = qa.valence().clone();
            let pairs = all_pairs(state.len());

            qa.on_pair_list_changed(&mut pairs.clone());
            step(&mut qa, &state);
            assert_slots_match_live_contacts(&qa, &initial)?;

            for event in events {
                match event {
                    Event::Shift { chain, dz, x } => {
                        let base = state.positions[3 * chain + 1];
                        let offset = Vector3::new(x - base.x, 0.0, 5.5 * chain as f64 + dz - base.z);
                        for p in &mut state.positions[3 * chain..3 * chain + 3] {
                            *p += offset;
                        }
                    }
                    Event::Advance(dt) => state.t += dt,
                    Event::Remove(k) => {
                        let live: Vec<Pair> = qa
                            .contacts()
                            .iter()
                            .filter(|c| c.is_active())
                            .map(Contact::key)
                            .collect();
                        if !live.is_empty() {
                            let (i, j) = live[k % live.len()];
                            prop_assert!(qa.remove_contact(j, i));
                        }
                    }
                    Event::Rebuild(keep) => {
                        let mut kept: Vec<Pair> = pairs
                            .iter()
                            .zip(&keep)
                            .filter_map(|(&pair, &keep)| keep.then_some(pair))
                            .collect();
                        qa.on_pair_list_changed(&mut kept);
                    }
                }
                step(&mut qa, &state);
                assert_slots_match_live_contacts(&qa, &initial)?;
            }
        }
    }

    #[test]
    fn contested_slot_goes_to_the_lower_pair_for_any_thread_count() {
        let (state, services) = stacked_chains(&[(0.0, 0.0), (0.5, 5.5), (-0.5, -5.5)]);
        let mut outcomes = Vec::new();
        for threads in [1, 2, 4] {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            let contacts = pool.install(|| {
                let mut qa = QuasiAdiabatic::new(&config(), &services).unwrap();
                qa.valence_mut().set(1, Valence::new(1, 2, 2, 0));
                qa.on_pair_list_changed(&mut all_pairs(state.len()));
                step(&mut qa, &state);
                qa.contacts().to_vec()
            });
            outcomes.push(contacts);
        }
        assert_eq!(outcomes[0].len(), 1);
        assert_eq!(outcomes[0][0].key(), (1, 4));
        assert!(outcomes.iter().all(|c| c == &outcomes[0]));
    }
}
