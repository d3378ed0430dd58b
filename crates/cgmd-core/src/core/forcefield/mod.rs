//! # Force Field Module
//!
//! Closed-form pair potentials, per-residue-type parameters and the additive
//! force/energy accumulator that every interaction writes into.
//!
//! ## Key Components
//!
//! - [`kernels`] - Lennard-Jones, shifted-truncated LJ, sidechain LJ and harmonic kernels
//! - [`params`] - Residue specificity and sidechain well extents, loaded from TOML
//! - [`dynamics`] - The [`dynamics::Dynamics`] accumulator with commutative merging
//!
//! ## Usage
//!
//! ```ignore
//! use cgmd::core::forcefield::{dynamics::Dynamics, kernels::LennardJones};
//!
//! let lj = LennardJones::new(5.0, 1.0);
//! let (v, dv) = lj.evaluate(r);
//! dynamics.add_pair(i, j, &unit, v, dv);
//! ```

pub mod dynamics;
pub mod kernels;
pub mod params;
