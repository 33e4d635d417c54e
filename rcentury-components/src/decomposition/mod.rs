//! Decomposition of litter, dead wood and soil organic matter, and the
//! mineral nitrogen losses that follow it.
//!
//! Every function here mutates a [`rcentury_core::soil::SoilState`] in place
//! and keeps carbon and nitrogen balanced: what leaves a pool is respired,
//! moved to another pool, mineralized or sent to the stream.

mod layer;
mod leaching;
mod litter;
mod soil_organic_matter;
mod wood;

pub use layer::{
    aboveground_ratio, belowground_ratio, decomposition_possible, monthly_outflow, respire,
    transfer,
};
pub use leaching::{leach_mineral_nitrogen, volatilize};
pub use litter::{decompose_metabolic, decompose_structural};
pub use soil_organic_matter::{
    decompose_som1_soil, decompose_som1_surface, decompose_som2, decompose_som3,
};
pub use wood::decompose_dead_wood;
