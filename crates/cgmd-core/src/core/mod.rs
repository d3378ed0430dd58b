//! # Core Module
//!
//! Stateless building blocks shared by every stateful component of the engine.
//!
//! - **Models** ([`models`]) - amino-acid types, chain topology and the dynamical state
//! - **Periodic boundaries** ([`topology`]) - minimum-image correction of displacements
//! - **Force field** ([`forcefield`]) - pair kernels, per-type parameters and the
//!   additive force/energy accumulator
//!
//! Nothing in this module spawns work or holds locks; all functions are pure given their
//! inputs, which is what allows the engine to call them from any worker thread.

pub mod forcefield;
pub mod models;
pub mod topology;
