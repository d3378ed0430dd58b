use super::amino_acid::AminoAcid;
use crate::core::topology::Topology;
use nalgebra::Vector3;

/// Dynamical state of the system at time `t`.
///
/// All per-particle vectors share one length and are indexed by the same dense particle
/// index used throughout the engine.
#[derive(Debug, Clone)]
pub struct State {
    pub positions: Vec<Vector3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
    /// Accelerations from the previous force evaluation, consumed by the integrator.
    pub accelerations: Vec<Vector3<f64>>,
    pub masses: Vec<f64>,
    pub types: Vec<AminoAcid>,
    pub t: f64,
    pub top: Topology,
}

impl State {
    /// Particles at rest with unit mass.
    pub fn new(positions: Vec<Vector3<f64>>, types: Vec<AminoAcid>, top: Topology) -> Self {
        let n = positions.len();
        Self {
            positions,
            velocities: vec![Vector3::zeros(); n],
            accelerations: vec![Vector3::zeros(); n],
            masses: vec![1.0; n],
            types,
            t: 0.0,
            top,
        }
    }

    pub fn with_masses(mut self, masses: Vec<f64>) -> Self {
        self.masses = masses;
        self
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Minimum-image displacement `r[i] - r[j]`.
    #[inline]
    pub fn displacement(&self, i: usize, j: usize) -> Vector3<f64> {
        self.top.minimum_image(self.positions[i] - self.positions[j])
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.velocities
            .iter()
            .zip(&self.masses)
            .map(|(v, m)| 0.5 * m * v.norm_squared())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacement_uses_the_nearest_periodic_image() {
        let top = Topology::periodic(Vector3::new(10.0, 10.0, 10.0));
        let state = State::new(
            vec![Vector3::new(0.5, 0.0, 0.0), Vector3::new(9.5, 0.0, 0.0)],
            vec![AminoAcid::Glycine; 2],
            top,
        );
        let d = state.displacement(0, 1);
        assert!((d.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn kinetic_energy_sums_over_particles() {
        let mut state = State::new(
            vec![Vector3::zeros(); 2],
            vec![AminoAcid::Alanine; 2],
            Topology::open(),
        )
        .with_masses(vec![2.0, 1.0]);
        state.velocities[0] = Vector3::new(1.0, 0.0, 0.0);
        state.velocities[1] = Vector3::new(0.0, 2.0, 0.0);
        assert!((state.kinetic_energy() - 3.0).abs() < 1e-12);
    }
}
