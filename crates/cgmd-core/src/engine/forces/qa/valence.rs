use super::contact::ContactKind;
use crate::core::forcefield::params::{Parameters, Polarization};
use crate::core::models::amino_acid::AminoAcid;
use crate::engine::error::EngineError;
use crate::engine::forces::InteractionKind;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Remaining contact slots of one particle, or a change to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Valence {
    pub backbone: i8,
    pub sidechain: i8,
    pub hydrophobic_ss: i8,
    pub polar_ss: i8,
}

impl Valence {
    pub fn new(backbone: i8, sidechain: i8, hydrophobic_ss: i8, polar_ss: i8) -> Self {
        Self {
            backbone,
            sidechain,
            hydrophobic_ss,
            polar_ss,
        }
    }

    /// No counter is negative.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.backbone >= 0 && self.sidechain >= 0 && self.hydrophobic_ss >= 0 && self.polar_ss >= 0
    }
}

impl Add for Valence {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            backbone: self.backbone + rhs.backbone,
            sidechain: self.sidechain + rhs.sidechain,
            hydrophobic_ss: self.hydrophobic_ss + rhs.hydrophobic_ss,
            polar_ss: self.polar_ss + rhs.polar_ss,
        }
    }
}

impl AddAssign for Valence {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for Valence {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            backbone: -self.backbone,
            sidechain: -self.sidechain,
            hydrophobic_ss: -self.hydrophobic_ss,
            polar_ss: -self.polar_ss,
        }
    }
}

impl Sub for Valence {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl SubAssign for Valence {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// Per-particle valence counters together with what is needed to price a new contact.
///
/// Counters are only changed through [`ValenceTable::try_apply`] and
/// [`ValenceTable::release`], both called from the sequential commit phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ValenceTable {
    slots: Vec<Valence>,
    polarization: Vec<Polarization>,
}

impl ValenceTable {
    /// Initial counters: the residue's backbone slots and its sidechain limits.
    pub fn new(types: &[AminoAcid], params: &Parameters) -> Result<Self, EngineError> {
        let mut slots = Vec::with_capacity(types.len());
        let mut polarization = Vec::with_capacity(types.len());
        for &acid in types {
            let spec = params
                .specificity(acid)
                .ok_or(EngineError::MissingParameter {
                    interaction: InteractionKind::QuasiAdiabatic.name(),
                    residue: acid,
                    parameter: "specificity",
                })?;
            slots.push(Valence::new(
                acid.backbone_slots(),
                spec.max_sidechain,
                spec.max_hydrophobic_ss,
                spec.max_polar_ss,
            ));
            polarization.push(spec.polarization);
        }
        Ok(Self {
            slots,
            polarization,
        })
    }

    /// Builds a table from explicit counters; every particle gets `Polarization::Missing`.
    pub fn from_slots(slots: Vec<Valence>) -> Self {
        let polarization = vec![Polarization::Missing; slots.len()];
        Self {
            slots,
            polarization,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, i: usize) -> Valence {
        self.slots[i]
    }

    pub fn set(&mut self, i: usize, valence: Valence) {
        self.slots[i] = valence;
    }

    pub fn all_valid(&self) -> bool {
        self.slots.iter().all(Valence::is_valid)
    }

    /// Changes to both particles' counters that a contact of `kind` would cause.
    pub fn creation_deltas(&self, i1: usize, i2: usize, kind: ContactKind) -> [Valence; 2] {
        let backbone = Valence::new(-1, 0, 0, 0);
        let sidechain = Valence::new(0, -1, 0, 0);
        let mut deltas = match kind {
            ContactKind::BackboneBackbone => [backbone, backbone],
            ContactKind::BackboneSidechain => [backbone, sidechain],
            ContactKind::SidechainBackbone => [sidechain, backbone],
            ContactKind::SidechainSidechain => [sidechain, sidechain],
        };
        if kind == ContactKind::SidechainSidechain {
            for (delta, partner) in deltas.iter_mut().zip([i2, i1]) {
                match self.polarization[partner] {
                    p if p.is_polar() => delta.polar_ss -= 1,
                    Polarization::Hydrophobic => delta.hydrophobic_ss -= 1,
                    _ => {}
                }
            }
        }
        deltas
    }

    /// `true` if applying `deltas` would keep both particles valid.
    #[inline]
    pub fn admits(&self, i1: usize, i2: usize, deltas: &[Valence; 2]) -> bool {
        (self.slots[i1] + deltas[0]).is_valid() && (self.slots[i2] + deltas[1]).is_valid()
    }

    /// Applies `deltas` if [`Self::admits`] allows it; otherwise leaves the table untouched.
    pub fn try_apply(&mut self, i1: usize, i2: usize, deltas: &[Valence; 2]) -> bool {
        if !self.admits(i1, i2, deltas) {
            return false;
        }
        self.slots[i1] += deltas[0];
        self.slots[i2] += deltas[1];
        true
    }

    /// Returns the slots held by a contact of `kind` between `i1` and `i2`.
    pub fn release(&mut self, i1: usize, i2: usize, kind: ContactKind) {
        let deltas = self.creation_deltas(i1, i2, kind);
        self.slots[i1] -= deltas[0];
        self.slots[i2] -= deltas[1];
    }
}
