//! # CGMD Core Library
//!
//! Time evolution of coarse-grained polymer models (one pseudo-atom per residue)
//! under a sum of local and nonlocal potentials.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`State`, `Chains`, amino-acid
//!   types), the periodic [`core::topology::Topology`], closed-form force kernels and the
//!   additive force/energy accumulator.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer. It owns the spatial index
//!   (cell/Verlet list), the nonlocal interaction contract and its two-phase
//!   (parallel, then sequential) evaluation protocol, the quasi-adiabatic contact
//!   lifecycle and the `Simulation` orchestrator that drives a step.
//!
//! - **[`workflows`]: The Public API.** Entry points that run a configured simulation
//!   for a requested duration while reporting progress.

pub mod core;
pub mod engine;
pub mod workflows;
