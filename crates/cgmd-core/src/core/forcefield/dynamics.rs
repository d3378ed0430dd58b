use nalgebra::Vector3;
use std::ops::{Add, AddAssign};

/// Additive sink for potential energy and per-particle forces.
///
/// Parallel phases give every worker its own `Dynamics` and sum them once the phase
/// ends, so a single instance is never written from two threads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dynamics {
    pub energy: f64,
    pub forces: Vec<Vector3<f64>>,
}

impl Dynamics {
    pub fn zeros(n: usize) -> Self {
        Self {
            energy: 0.0,
            forces: vec![Vector3::zeros(); n],
        }
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    pub fn reset(&mut self) {
        self.energy = 0.0;
        self.forces.iter_mut().for_each(|f| *f = Vector3::zeros());
    }

    #[inline]
    pub fn add_energy(&mut self, v: f64) {
        self.energy += v;
    }

    #[inline]
    pub fn add_force(&mut self, i: usize, f: Vector3<f64>) {
        self.forces[i] += f;
    }

    /// Applies a central pair interaction: `r12 = r[i1] - r[i2]`, with `dv` the radial
    /// derivative of the potential at `|r12|`.
    #[inline]
    pub fn add_pair(&mut self, i1: usize, i2: usize, unit: &Vector3<f64>, v: f64, dv: f64) {
        self.energy += v;
        let f = dv * unit;
        self.forces[i1] -= f;
        self.forces[i2] += f;
    }
}

impl AddAssign<&Dynamics> for Dynamics {
    fn add_assign(&mut self, rhs: &Dynamics) {
        if self.forces.len() < rhs.forces.len() {
            self.forces.resize(rhs.forces.len(), Vector3::zeros());
        }
        self.energy += rhs.energy;
        for (f, g) in self.forces.iter_mut().zip(&rhs.forces) {
            *f += g;
        }
    }
}

impl AddAssign for Dynamics {
    fn add_assign(&mut self, rhs: Dynamics) {
        *self += &rhs;
    }
}

impl Add for Dynamics {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += &rhs;
        self
    }
}
