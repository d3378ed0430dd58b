//! Candidate-pair bookkeeping shared by all nonlocal interactions.
//!
//! The [`list::SpatialIndex`] owns a sorted list of particle pairs lying within the merged
//! cutoff plus a skin, and rebuilds it through a [`grid::CellGrid`] whenever particles
//! have drifted far enough to invalidate it.

pub mod grid;
pub mod list;
pub mod spec;

/// An unordered particle pair stored as `(i, j)` with `i < j`.
pub type Pair = (usize, usize);

/// Position of a registered interaction in the notification order.
pub type ListenerId = usize;
