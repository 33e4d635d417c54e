//! Core data model for the CENTURY soil engine
//!
//! This crate holds everything the process components share: the error type,
//! physical constants, the immutable configuration (global CENTURY parameters,
//! ecoregion parameters and monthly climate tables) and the mutable per-site
//! state (carbon/nitrogen pools, soil water, mass ledger and monthly fluxes).
//!
//! # Units
//!
//! Carbon and nitrogen are in g/m², water in cm, temperatures in °C and
//! decay rates are annual rates that are scaled to a monthly step by
//! [`parameters::CenturyParameters::month_adjust`].

pub mod climate;
pub mod cohort;
pub mod constants;
pub mod context;
pub mod ecoregion;
pub mod errors;
pub mod parameters;
pub mod pool;
pub mod soil;
pub mod standard_variables;

/// Floating point type used for every physical quantity.
pub type FloatValue = f64;
