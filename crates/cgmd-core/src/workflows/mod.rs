//! # Workflows Module
//!
//! High-level entry points that take a fully described system, set up the simulation
//! and run it while reporting progress.
//!
//! ## Architecture
//!
//! - **Run Workflow** ([`run`]) - Builds a [`crate::engine::simulation::Simulation`],
//!   advances it for a requested duration and summarizes the final state.

pub mod run;
