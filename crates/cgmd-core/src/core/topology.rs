use nalgebra::Vector3;
use serde::Deserialize;

/// Shape of the simulation box and the axes along which it wraps.
///
/// Only the box dimensions are held; every distance or cutoff test in the engine
/// funnels its displacement vectors through [`Topology::minimum_image`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "BoxSpec")]
pub struct Topology {
    cell: Vector3<f64>,
    cell_inv: Vector3<f64>,
    periodic: [bool; 3],
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BoxSpec {
    #[serde(default)]
    cell: [f64; 3],
    #[serde(default)]
    periodic: [bool; 3],
}

impl From<BoxSpec> for Topology {
    fn from(spec: BoxSpec) -> Self {
        Self::new(Vector3::from(spec.cell), spec.periodic)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::open()
    }
}

impl Topology {
    /// A box with no periodic axes; `minimum_image` is the identity.
    pub fn open() -> Self {
        Self {
            cell: Vector3::zeros(),
            cell_inv: Vector3::zeros(),
            periodic: [false; 3],
        }
    }

    /// Creates a box of dimensions `cell`, wrapping along the axes flagged in `periodic`.
    ///
    /// An axis flagged periodic with a zero (or negative) extent is treated as open.
    pub fn new(cell: Vector3<f64>, periodic: [bool; 3]) -> Self {
        let mut top = Self::open();
        top.periodic = periodic;
        top.set_cell(cell);
        top
    }

    /// Convenience constructor for a box wrapping along all three axes.
    pub fn periodic(cell: Vector3<f64>) -> Self {
        Self::new(cell, [true; 3])
    }

    pub fn set_cell(&mut self, cell: Vector3<f64>) {
        self.cell = cell;
        for dim in 0..3 {
            if cell[dim] > 0.0 {
                self.cell_inv[dim] = 1.0 / cell[dim];
            } else {
                self.cell_inv[dim] = 0.0;
                self.periodic[dim] = false;
            }
        }
    }

    pub fn cell(&self) -> &Vector3<f64> {
        &self.cell
    }

    pub fn is_periodic(&self, dim: usize) -> bool {
        self.periodic[dim]
    }

    /// Returns the minimum-image representative of the displacement `v`.
    #[inline]
    pub fn minimum_image(&self, mut v: Vector3<f64>) -> Vector3<f64> {
        for dim in 0..3 {
            if self.periodic[dim] {
                v[dim] -= (v[dim] * self.cell_inv[dim]).round() * self.cell[dim];
            }
        }
        v
    }

    /// One-norm of the difference between two box shapes; used to bound how far
    /// periodic images may have drifted since the last pair-list build.
    pub fn shift_since(&self, earlier: &Topology) -> f64 {
        (self.cell - earlier.cell).lp_norm(1)
    }
}
