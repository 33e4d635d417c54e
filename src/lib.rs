//! CENTURY soil water, soil organic matter decomposition and nitrogen
//! allocation for forest succession models.
//!
//! The engine lives in two crates re-exported here:
//!
//! - [`core`]: parameters, climate, pools, soil state and errors
//! - [`components`]: the water balance, decomposition pipeline, nitrogen
//!   allocator and the monthly orchestrator
//!
//! Building with the `python` feature exposes the orchestrator as the
//! `rcentury._lib` extension module.

pub use rcentury_components as components;
pub use rcentury_core as core;

#[cfg(feature = "python")]
mod python;
