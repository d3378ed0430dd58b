//! # Core Models Module
//!
//! Plain data describing the simulated system: what each particle is, how particles are
//! strung into chains, and the dynamic state that the integrator advances.
//!
//! ## Key Components
//!
//! - [`amino_acid`] - The 20 residue types and their backbone valence
//! - [`chains`] - Chain membership, termini, bonds, triples and bond separation
//! - [`state`] - Positions, velocities, masses, simulation time and box shape
//!
//! ## Usage
//!
//! ```ignore
//! use cgmd::core::models::{chains::Chains, state::State};
//!
//! let chains = Chains::new(positions.len(), vec![0..positions.len()])?;
//! let state = State::new(positions, types, Topology::open());
//! ```

pub mod amino_acid;
pub mod chains;
pub mod state;
