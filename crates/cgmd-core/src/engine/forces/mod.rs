//! Interactions contributing energy and forces.
//!
//! The set of interactions is closed: [`Interaction`] enumerates every kind, and the
//! [`capabilities`](InteractionKind::capabilities) table tells the orchestrator which
//! phases each kind takes part in. Evaluation of one step has two phases:
//!
//! 1. **parallel**: every interaction accumulates into its own [`Dynamics`] buffer and may
//!    split its work across the worker pool. Only commutative sums leave this phase.
//! 2. **sequential**: runs once, on one thread, after all parallel work has been merged.
//!    Used for updates that must happen in a fixed order.

pub mod electrostatics;
pub mod native;
pub mod pauli;
pub mod qa;
pub mod tether;

use crate::core::forcefield::dynamics::Dynamics;
use crate::core::models::state::State;
use crate::engine::verlet::Pair;
use crate::engine::verlet::spec::InteractionSpec;
use nalgebra::Vector3;

pub use electrostatics::Electrostatics;
pub use native::NativeContacts;
pub use pauli::PauliExclusion;
pub use qa::QuasiAdiabatic;
pub use tether::Tether;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Tether,
    Pauli,
    NativeContacts,
    QuasiAdiabatic,
    DebyeHuckel,
}

/// Which parts of the step protocol an interaction kind participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Consumes the shared pair list.
    pub nonlocal: bool,
    /// Removes the pairs it owns from the shared list; such kinds are notified first.
    pub claims_pairs: bool,
    pub parallel_phase: bool,
    pub sequential_phase: bool,
}

const CAPABILITIES: [Capabilities; 5] = [
    // Tether
    Capabilities {
        nonlocal: false,
        claims_pairs: false,
        parallel_phase: true,
        sequential_phase: false,
    },
    // Pauli
    Capabilities {
        nonlocal: true,
        claims_pairs: false,
        parallel_phase: true,
        sequential_phase: false,
    },
    // NativeContacts
    Capabilities {
        nonlocal: true,
        claims_pairs: true,
        parallel_phase: true,
        sequential_phase: false,
    },
    // QuasiAdiabatic
    Capabilities {
        nonlocal: true,
        claims_pairs: false,
        parallel_phase: true,
        sequential_phase: true,
    },
    // DebyeHuckel
    Capabilities {
        nonlocal: true,
        claims_pairs: false,
        parallel_phase: true,
        sequential_phase: false,
    },
];

impl InteractionKind {
    pub const fn capabilities(self) -> Capabilities {
        CAPABILITIES[self as usize]
    }

    pub const fn name(self) -> &'static str {
        match self {
            InteractionKind::Tether => "tether",
            InteractionKind::Pauli => "pauli",
            InteractionKind::NativeContacts => "native-contacts",
            InteractionKind::QuasiAdiabatic => "quasi-adiabatic",
            InteractionKind::DebyeHuckel => "debye-huckel",
        }
    }
}

/// An energy/force contribution evaluated with the two-phase protocol.
pub trait Force {
    const KIND: InteractionKind;

    /// Must only add into `dynamics`; may mutate private state of `self`.
    fn compute_parallel(&mut self, state: &State, dynamics: &mut Dynamics);

    fn compute_sequential(&mut self, _state: &State, _dynamics: &mut Dynamics) {}
}

/// A force that draws its candidate pairs from the spatial index.
pub trait NonlocalForce: Force {
    /// Requirements on the shared list; queried once at registration.
    fn spec(&self) -> InteractionSpec;

    /// Called after every rebuild with the sorted list. Implementations may remove pairs
    /// they own exclusively, keeping the list sorted.
    fn on_pair_list_changed(&mut self, pairs: &mut Vec<Pair>);
}

pub enum Interaction {
    Tether(Tether),
    Pauli(PauliExclusion),
    NativeContacts(NativeContacts),
    QuasiAdiabatic(QuasiAdiabatic),
    DebyeHuckel(Electrostatics),
}

impl Interaction {
    pub fn kind(&self) -> InteractionKind {
        match self {
            Interaction::Tether(_) => Tether::KIND,
            Interaction::Pauli(_) => PauliExclusion::KIND,
            Interaction::NativeContacts(_) => NativeContacts::KIND,
            Interaction::QuasiAdiabatic(_) => QuasiAdiabatic::KIND,
            Interaction::DebyeHuckel(_) => Electrostatics::KIND,
        }
    }

    pub fn spec(&self) -> Option<InteractionSpec> {
        match self {
            Interaction::Tether(_) => None,
            Interaction::Pauli(f) => Some(f.spec()),
            Interaction::NativeContacts(f) => Some(f.spec()),
            Interaction::QuasiAdiabatic(f) => Some(f.spec()),
            Interaction::DebyeHuckel(f) => Some(f.spec()),
        }
    }

    pub fn on_pair_list_changed(&mut self, pairs: &mut Vec<Pair>) {
        match self {
            Interaction::Tether(_) => {}
            Interaction::Pauli(f) => f.on_pair_list_changed(pairs),
            Interaction::NativeContacts(f) => f.on_pair_list_changed(pairs),
            Interaction::QuasiAdiabatic(f) => f.on_pair_list_changed(pairs),
            Interaction::DebyeHuckel(f) => f.on_pair_list_changed(pairs),
        }
    }

    pub fn compute_parallel(&mut self, state: &State, dynamics: &mut Dynamics) {
        match self {
            Interaction::Tether(f) => f.compute_parallel(state, dynamics),
            Interaction::Pauli(f) => f.compute_parallel(state, dynamics),
            Interaction::NativeContacts(f) => f.compute_parallel(state, dynamics),
            Interaction::QuasiAdiabatic(f) => f.compute_parallel(state, dynamics),
            Interaction::DebyeHuckel(f) => f.compute_parallel(state, dynamics),
        }
    }

    pub fn compute_sequential(&mut self, state: &State, dynamics: &mut Dynamics) {
        match self {
            Interaction::Tether(f) => f.compute_sequential(state, dynamics),
            Interaction::Pauli(f) => f.compute_sequential(state, dynamics),
            Interaction::NativeContacts(f) => f.compute_sequential(state, dynamics),
            Interaction::QuasiAdiabatic(f) => f.compute_sequential(state, dynamics),
            Interaction::DebyeHuckel(f) => f.compute_sequential(state, dynamics),
        }
    }

    pub fn as_quasi_adiabatic(&self) -> Option<&QuasiAdiabatic> {
        match self {
            Interaction::QuasiAdiabatic(qa) => Some(qa),
            _ => None,
        }
    }

    pub fn as_quasi_adiabatic_mut(&mut self) -> Option<&mut QuasiAdiabatic> {
        match self {
            Interaction::QuasiAdiabatic(qa) => Some(qa),
            _ => None,
        }
    }
}

impl From<Tether> for Interaction {
    fn from(f: Tether) -> Self {
        Interaction::Tether(f)
    }
}

impl From<PauliExclusion> for Interaction {
    fn from(f: PauliExclusion) -> Self {
        Interaction::Pauli(f)
    }
}

impl From<NativeContacts> for Interaction {
    fn from(f: NativeContacts) -> Self {
        Interaction::NativeContacts(f)
    }
}

impl From<QuasiAdiabatic> for Interaction {
    fn from(f: QuasiAdiabatic) -> Self {
        Interaction::QuasiAdiabatic(f)
    }
}

impl From<Electrostatics> for Interaction {
    fn from(f: Electrostatics) -> Self {
        Interaction::DebyeHuckel(f)
    }
}

/// Minimum-image separation of a pair: `(r12, |r12|)` with `r12 = r[i1] - r[i2]`.
#[inline]
pub(crate) fn separation(state: &State, i1: usize, i2: usize) -> (Vector3<f64>, f64) {
    let r12 = state.displacement(i1, i2);
    let norm = r12.norm();
    (r12, norm)
}
