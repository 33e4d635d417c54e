//! Process components of the CENTURY soil engine
//!
//! The water balance, the decomposition cascade and nitrogen allocation are
//! written as functions over an explicit [`rcentury_core::soil::SoilState`]
//! and immutable parameters, and sequenced month by month by
//! [`orchestrator::Century`].

pub mod decay;
pub mod decomposition;
pub mod nitrogen;
pub mod orchestrator;
pub mod pipeline;
pub mod vegetation;
pub mod water;

pub use nitrogen::{CohortBiomass, NitrogenAllocator};
pub use orchestrator::{Century, CenturyBuilder, RunOutputs, Site};
pub use pipeline::{DecompositionPipeline, DecompositionStage, StageEnvironment};
pub use vegetation::{
    GrowthReport, GrowthStep, NullVegetation, PrescribedCohort, PrescribedVegetation,
    VegetationModel,
};
pub use water::{SoilWaterBalance, WaterBalanceInputs, WaterBalanceOutputs};
