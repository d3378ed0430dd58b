//! # Engine Module
//!
//! Stateful machinery that advances a coarse-grained system through time.
//!
//! ## Overview
//!
//! Every step follows the same protocol, driven by [`simulation::Simulation`]:
//!
//! 1. the [`verlet`] spatial index checks whether particles drifted far enough to
//!    invalidate its pair list and, if so, rebuilds it and notifies every nonlocal
//!    interaction in registration order;
//! 2. every interaction in [`forces`] runs its parallel phase, accumulating energy and
//!    forces into per-worker buffers that are then reduced;
//! 3. interactions with order-dependent updates (contact formation) run their
//!    sequential phase;
//! 4. the [`integrator`] moves the particles.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Typed per-interaction settings and their builder
//! - **Services** ([`services`]) - Read-only collaborators shared by all interactions
//! - **Spatial Index** ([`verlet`]) - Cell/Verlet pair list with skin-based rebuilds
//! - **Interactions** ([`forces`]) - Tether, Pauli exclusion, native and quasi-adiabatic contacts
//! - **Orchestration** ([`simulation`]) - Setup order and the per-step protocol
//! - **Progress Monitoring** ([`progress`]) - Progress reporting for front ends
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod config;
pub mod error;
pub mod forces;
pub mod integrator;
pub mod progress;
pub mod services;
pub mod simulation;
pub mod verlet;
