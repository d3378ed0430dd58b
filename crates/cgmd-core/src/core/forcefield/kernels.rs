//! Closed-form pair potentials. Every kernel returns `(V, dV/dr)` at separation `r`.

use serde::Deserialize;

const DIST_EPSILON: f64 = 1e-6;

/// `2^(-1/6)`, the ratio between the LJ zero crossing (sigma) and its minimum.
pub const INV_SIXTH_ROOT_TWO: f64 = 0.890_898_718_140_339_3;

/// Lennard-Jones 12-6 potential in the r_min form: `V = d[(r_min/r)^12 - 2(r_min/r)^6]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LennardJones {
    pub r_min: f64,
    pub depth: f64,
}

impl LennardJones {
    pub fn new(r_min: f64, depth: f64) -> Self {
        Self { r_min, depth }
    }

    /// 2.5 sigma.
    pub fn cutoff(&self) -> f64 {
        2.5 * INV_SIXTH_ROOT_TWO * self.r_min
    }

    #[inline]
    pub fn evaluate(&self, r: f64) -> (f64, f64) {
        let r = r.max(DIST_EPSILON);
        let s6 = (self.r_min / r).powi(6);
        let s12 = s6 * s6;
        let v = self.depth * (s12 - 2.0 * s6);
        let dv = 12.0 * self.depth * (s6 - s12) / r;
        (v, dv)
    }
}

/// Purely repulsive LJ, shifted up by `depth` so it vanishes at `r_cut`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftedTruncatedLj {
    pub r_cut: f64,
    pub depth: f64,
}

impl ShiftedTruncatedLj {
    pub fn new(r_cut: f64, depth: f64) -> Self {
        Self { r_cut, depth }
    }

    pub fn cutoff(&self) -> f64 {
        self.r_cut
    }

    #[inline]
    pub fn evaluate(&self, r: f64) -> (f64, f64) {
        if r >= self.r_cut {
            return (0.0, 0.0);
        }
        let (v, dv) = LennardJones::new(self.r_cut, self.depth).evaluate(r);
        (v + self.depth, dv)
    }
}

/// Sidechain-sidechain potential: a flat well of depth `depth` up to `sink_max`,
/// continued by an LJ tail whose minimum sits at `sink_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SidechainLj {
    pub sink_max: f64,
    pub depth: f64,
}

impl SidechainLj {
    pub fn new(sink_max: f64, depth: f64) -> Self {
        Self { sink_max, depth }
    }

    fn tail(&self) -> LennardJones {
        LennardJones::new(self.sink_max, self.depth)
    }

    pub fn cutoff(&self) -> f64 {
        self.tail().cutoff()
    }

    #[inline]
    pub fn evaluate(&self, r: f64) -> (f64, f64) {
        if r <= self.sink_max {
            (-self.depth, 0.0)
        } else {
            self.tail().evaluate(r)
        }
    }
}

/// Harmonic spring with an optional quartic term: `V = dx^2 (H1 + H2 dx^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Harmonic {
    pub h1: f64,
    pub h2: f64,
}

impl Harmonic {
    pub fn new(h1: f64, h2: f64) -> Self {
        Self { h1, h2 }
    }

    #[inline]
    pub fn evaluate(&self, r: f64, r0: f64) -> (f64, f64) {
        let dx = r - r0;
        let dx2 = dx * dx;
        let v = dx2 * (self.h1 + self.h2 * dx2);
        let dv = dx * (2.0 * self.h1 + 4.0 * self.h2 * dx2);
        (v, dv)
    }
}

/// Screened Coulomb interaction of unit charges, `V = A exp(-r/λ) / r^k`.
///
/// `k = 1` for a uniform medium and `k = 2` when the permittivity grows linearly with `r`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebyeHuckel {
    pub strength: f64,
    pub screening_dist: f64,
    pub power: i32,
}

impl DebyeHuckel {
    /// Uniform medium: `A = coulomb / eps_r`.
    pub fn constant(coulomb: f64, relative_permittivity: f64, screening_dist: f64) -> Self {
        Self {
            strength: coulomb / relative_permittivity,
            screening_dist,
            power: 1,
        }
    }

    /// `eps_r = r / r0`: `A = coulomb * r0`.
    pub fn relative(coulomb: f64, r0: f64, screening_dist: f64) -> Self {
        Self {
            strength: coulomb * r0,
            screening_dist,
            power: 2,
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.screening_dist
    }

    #[inline]
    pub fn evaluate(&self, r: f64) -> (f64, f64) {
        let r = r.max(DIST_EPSILON);
        let v = self.strength * (-r / self.screening_dist).exp() / r.powi(self.power);
        let dv = -v * (self.power as f64 / r + 1.0 / self.screening_dist);
        (v, dv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn numeric_derivative(f: impl Fn(f64) -> f64, r: f64) -> f64 {
        let h = 1e-6;
        (f(r + h) - f(r - h)) / (2.0 * h)
    }

    #[test]
    fn lj_has_its_minimum_at_r_min() {
        let lj = LennardJones::new(5.0, 2.0);
        let (v, dv) = lj.evaluate(5.0);
        assert!((v - -2.0).abs() < TOLERANCE);
        assert!(dv.abs() < TOLERANCE);
    }

    #[test]
    fn lj_derivative_matches_finite_difference() {
        let lj = LennardJones::new(5.0, 1.0);
        for r in [4.0, 4.7, 5.5, 7.0, 10.0] {
            let (_, dv) = lj.evaluate(r);
            let expected = numeric_derivative(|x| lj.evaluate(x).0, r);
            assert!((dv - expected).abs() < 1e-5, "r = {r}: {dv} vs {expected}");
        }
    }

    #[test]
    fn lj_cutoff_is_two_and_a_half_sigma() {
        let lj = LennardJones::new(5.0, 1.0);
        let sigma = 5.0 * INV_SIXTH_ROOT_TWO;
        assert!((lj.cutoff() - 2.5 * sigma).abs() < TOLERANCE);
        assert!((INV_SIXTH_ROOT_TWO - 2f64.powf(-1.0 / 6.0)).abs() < 1e-15);
    }

    #[test]
    fn shifted_lj_vanishes_at_and_beyond_cutoff() {
        let stlj = ShiftedTruncatedLj::new(5.0, 1.0);
        let (v, dv) = stlj.evaluate(5.0);
        assert_eq!((v, dv), (0.0, 0.0));
        let (v, dv) = stlj.evaluate(4.0);
        assert!(v > 0.0);
        assert!(dv < 0.0);
    }

    #[test]
    fn sidechain_lj_is_flat_inside_the_sink() {
        let ss = SidechainLj::new(6.0, 1.5);
        assert_eq!(ss.evaluate(3.0), (-1.5, 0.0));
        assert_eq!(ss.evaluate(6.0), (-1.5, 0.0));
        let (v, dv) = ss.evaluate(7.0);
        assert!(v > -1.5 && v < 0.0);
        assert!(dv > 0.0);
    }

    #[test]
    fn harmonic_derivative_matches_finite_difference() {
        let h = Harmonic::new(50.0, 3.0);
        for r in [3.0, 3.8, 4.5] {
            let (_, dv) = h.evaluate(r, 3.8);
            let expected = numeric_derivative(|x| h.evaluate(x, 3.8).0, r);
            assert!((dv - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn debye_huckel_derivative_matches_finite_difference() {
        for dh in [
            DebyeHuckel::constant(221.38, 80.0, 10.0),
            DebyeHuckel::relative(221.38, 4.0, 10.0),
        ] {
            for r in [3.8, 6.0, 9.5] {
                let (_, dv) = dh.evaluate(r);
                let expected = numeric_derivative(|x| dh.evaluate(x).0, r);
                assert!((dv - expected).abs() < 1e-5, "r = {r}: {dv} vs {expected}");
            }
        }
    }

    #[test]
    fn debye_huckel_is_screened_by_one_e_fold_per_length() {
        let dh = DebyeHuckel::constant(80.0, 80.0, 10.0);
        let (v, _) = dh.evaluate(10.0);
        assert!((v - (-1.0f64).exp() / 10.0).abs() < TOLERANCE);
        assert_eq!(dh.cutoff(), 10.0);
    }
}
