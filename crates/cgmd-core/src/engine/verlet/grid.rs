use super::Pair;
use crate::core::models::chains::Chains;
use crate::core::topology::Topology;
use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::{debug, info_span};

/// Upper bound on the number of cells per particle. A single far-away particle in an
/// open box would otherwise blow the grid up with the cube of the bounding box.
const MAX_CELLS_PER_PARTICLE: usize = 8;

/// Uniform cell decomposition of the periodic bounding box of all particles.
///
/// Each cell is at least `eff_cutoff` wide along every axis, so any pair within the
/// cutoff lies in the same or in logically adjacent cells. Adjacency wraps around the
/// grid edges, which makes pairs interacting across a periodic face visible.
#[derive(Debug, Clone)]
pub struct CellGrid {
    shape: Vector3<usize>,
    origin: Vector3<f64>,
    cell_size: Vector3<f64>,
    /// Head of each cell's intrusive list.
    first: Vec<Option<usize>>,
    /// Successor of each particle within its cell.
    next: Vec<Option<usize>>,
}

impl CellGrid {
    /// Buckets `positions` into a grid whose cells are at least `eff_cutoff` wide.
    pub fn build(top: &Topology, positions: &[Vector3<f64>], eff_cutoff: f64) -> Self {
        let _span = info_span!("CellGrid::build", n = positions.len()).entered();

        let wrapped: Vec<Vector3<f64>> = positions
            .par_iter()
            .map(|r| top.minimum_image(*r))
            .collect();

        let (lo, hi) = wrapped
            .par_iter()
            .fold(
                || (Vector3::repeat(f64::INFINITY), Vector3::repeat(f64::NEG_INFINITY)),
                |(lo, hi), r| (lo.inf(r), hi.sup(r)),
            )
            .reduce(
                || (Vector3::repeat(f64::INFINITY), Vector3::repeat(f64::NEG_INFINITY)),
                |(lo1, hi1), (lo2, hi2)| (lo1.inf(&lo2), hi1.sup(&hi2)),
            );

        let (origin, extent) = if wrapped.is_empty() {
            (Vector3::zeros(), Vector3::zeros())
        } else {
            (lo, hi - lo)
        };

        let shape = grid_shape(&extent, eff_cutoff, positions.len());
        let cell_size = extent.component_div(&shape.map(|cells| cells as f64));

        let mut grid = Self {
            shape,
            origin,
            cell_size,
            first: vec![None; shape.x * shape.y * shape.z],
            next: vec![None; positions.len()],
        };

        let cell_of: Vec<usize> = wrapped.par_iter().map(|r| grid.cell_of(r)).collect();

        // Linking back to front leaves every cell list in ascending particle order.
        for (i, &c) in cell_of.iter().enumerate().rev() {
            grid.next[i] = grid.first[c];
            grid.first[c] = Some(i);
        }

        grid
    }

    pub fn shape(&self) -> Vector3<usize> {
        self.shape
    }

    pub fn num_cells(&self) -> usize {
        self.first.len()
    }

    fn cell_of(&self, r: &Vector3<f64>) -> usize {
        let mut loc = Vector3::zeros();
        for dim in 0..3 {
            let idx = if self.cell_size[dim] > 0.0 {
                ((r[dim] - self.origin[dim]) / self.cell_size[dim]).floor()
            } else {
                0.0
            };
            loc[dim] = if idx > 0.0 {
                (idx as usize).min(self.shape[dim] - 1)
            } else {
                0
            };
        }
        self.index_of(&loc)
    }

    #[inline]
    fn index_of(&self, loc: &Vector3<usize>) -> usize {
        loc.x + self.shape.x * (loc.y + self.shape.y * loc.z)
    }

    #[inline]
    fn location_of(&self, c: usize) -> Vector3<usize> {
        Vector3::new(
            c % self.shape.x,
            (c / self.shape.x) % self.shape.y,
            c / (self.shape.x * self.shape.y),
        )
    }

    /// Particles in cell `c`, in ascending index order.
    pub fn members(&self, c: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.first[c], move |&i| self.next[i])
    }

    /// Distinct cells among the 27 wrapped neighbours of `c` (itself included).
    fn neighbours(&self, c: usize) -> Vec<usize> {
        let loc = self.location_of(c);
        let mut cells = Vec::with_capacity(27);
        for dz in [-1isize, 0, 1] {
            for dy in [-1isize, 0, 1] {
                for dx in [-1isize, 0, 1] {
                    let shifted = Vector3::new(
                        wrap(loc.x, dx, self.shape.x),
                        wrap(loc.y, dy, self.shape.y),
                        wrap(loc.z, dz, self.shape.z),
                    );
                    cells.push(self.index_of(&shifted));
                }
            }
        }
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    /// Emits every pair within `eff_cutoff` (minimum image) whose members are at least
    /// `min_bond_sep` bonds apart. The result is sorted and free of duplicates.
    pub fn pairs(
        &self,
        top: &Topology,
        positions: &[Vector3<f64>],
        chains: &Chains,
        eff_cutoff: f64,
        min_bond_sep: usize,
    ) -> Vec<Pair> {
        let _span = info_span!("CellGrid::pairs", cells = self.num_cells()).entered();
        let eff_cutoff_sq = eff_cutoff * eff_cutoff;

        let mut pairs: Vec<Pair> = (0..self.num_cells())
            .into_par_iter()
            .fold(Vec::new, |mut buf, c1| {
                for c2 in self.neighbours(c1) {
                    if c1 > c2 {
                        continue;
                    }
                    for p1 in self.members(c1) {
                        for p2 in self.members(c2) {
                            if p1 == p2 || (c1 == c2 && p1 > p2) {
                                continue;
                            }
                            let d2 = top.minimum_image(positions[p1] - positions[p2]).norm_squared();
                            if d2 <= eff_cutoff_sq && chains.sep_by_at_least(p1, p2, min_bond_sep) {
                                buf.push((p1.min(p2), p1.max(p2)));
                            }
                        }
                    }
                }
                buf
            })
            .reduce(Vec::new, |mut a, mut b| {
                a.append(&mut b);
                a
            });

        pairs.par_sort_unstable();
        pairs.dedup();
        pairs
    }
}

/// Cells per axis: as many as fit at `eff_cutoff` wide, widened uniformly until the total
/// stays within `MAX_CELLS_PER_PARTICLE * n`.
fn grid_shape(extent: &Vector3<f64>, eff_cutoff: f64, n: usize) -> Vector3<usize> {
    if eff_cutoff <= 0.0 || !extent.iter().all(|e| e.is_finite()) {
        return Vector3::repeat(1);
    }
    let max_cells = (n * MAX_CELLS_PER_PARTICLE).max(1) as f64;
    let mut width = eff_cutoff;
    loop {
        // Counted in f64 so that huge extents cannot overflow the product.
        let cells = extent.map(|e| (e / width).floor().max(1.0));
        let total = cells.x * cells.y * cells.z;
        if total <= max_cells {
            if width > eff_cutoff {
                debug!(width, eff_cutoff, total, "Cell grid widened to bound its size.");
            }
            return cells.map(|c| c as usize);
        }
        width *= (total / max_cells).cbrt() * 1.01;
    }
}

#[inline]
fn wrap(x: usize, d: isize, n: usize) -> usize {
    (x as isize + d).rem_euclid(n as isize) as usize
}

/// Reference all-pairs scan with the same filters as [`CellGrid::pairs`].
pub fn brute_force_pairs(
    top: &Topology,
    positions: &[Vector3<f64>],
    chains: &Chains,
    eff_cutoff: f64,
    min_bond_sep: usize,
) -> Vec<Pair> {
    let _span = info_span!("brute_force_pairs", n = positions.len()).entered();
    let eff_cutoff_sq = eff_cutoff * eff_cutoff;
    let n = positions.len();
    // Per-particle rows come back in order, so the concatenation is already sorted.
    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            ((i + 1)..n).filter_map(move |j| {
                let d2 = top.minimum_image(positions[i] - positions[j]).norm_squared();
                (d2 <= eff_cutoff_sq && chains.sep_by_at_least(i, j, min_bond_sep)).then_some((i, j))
            })
        })
        .collect()
}
