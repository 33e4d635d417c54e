//! The monthly decomposition pipeline.
//!
//! Decomposition passes depend on the order they run in: wood feeds litter's
//! destinations, SOM1 surface is processed before SOM1 soil and mineral N
//! losses come last. The pipeline makes that order an explicit list of
//! stages so each one can be run and tested on its own.
//!
//! Stages are trait objects registered with `typetag`, so a pipeline can be
//! serialised alongside the rest of a run configuration.

use crate::decomposition::{
    decompose_dead_wood, decompose_metabolic, decompose_som1_soil, decompose_som1_surface,
    decompose_som2, decompose_som3, decompose_structural, leach_mineral_nitrogen, volatilize,
};
use rcentury_core::ecoregion::EcoregionParameters;
use rcentury_core::errors::CenturyResult;
use rcentury_core::parameters::CenturyParameters;
use rcentury_core::pool::Layer;
use rcentury_core::soil::SoilState;
use rcentury_core::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Read-only inputs shared by every stage of one month.
#[derive(Debug, Clone, Copy)]
pub struct StageEnvironment<'a> {
    pub parameters: &'a CenturyParameters,
    pub ecoregion: &'a EcoregionParameters,
    /// Base flow of the month from the water balance (cm)
    pub base_flow: FloatValue,
    /// Storm flow of the month from the water balance (cm)
    pub storm_flow: FloatValue,
}

impl<'a> StageEnvironment<'a> {
    pub fn new(parameters: &'a CenturyParameters, ecoregion: &'a EcoregionParameters) -> Self {
        Self {
            parameters,
            ecoregion,
            base_flow: 0.0,
            storm_flow: 0.0,
        }
    }

    pub fn with_flows(self, base_flow: FloatValue, storm_flow: FloatValue) -> Self {
        Self {
            base_flow,
            storm_flow,
            ..self
        }
    }
}

/// A step of the monthly decomposition sequence.
#[typetag::serde]
pub trait DecompositionStage: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Apply the stage to a site's soil state.
    fn apply(&self, env: &StageEnvironment, state: &mut SoilState) -> CenturyResult<()>;
}

/// Surface dead wood, then dead coarse roots.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WoodDecomposition;

#[typetag::serde]
impl DecompositionStage for WoodDecomposition {
    fn name(&self) -> &'static str {
        "wood decomposition"
    }

    fn apply(&self, env: &StageEnvironment, state: &mut SoilState) -> CenturyResult<()> {
        decompose_dead_wood(env, state, Layer::Surface)?;
        decompose_dead_wood(env, state, Layer::Soil)
    }
}

/// Structural then metabolic litter, surface layer before soil layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LitterDecomposition;

#[typetag::serde]
impl DecompositionStage for LitterDecomposition {
    fn name(&self) -> &'static str {
        "litter decomposition"
    }

    fn apply(&self, env: &StageEnvironment, state: &mut SoilState) -> CenturyResult<()> {
        for layer in [Layer::Surface, Layer::Soil] {
            decompose_structural(env, state, layer)?;
            decompose_metabolic(env, state, layer)?;
        }
        Ok(())
    }
}

/// SOM1 surface, SOM1 soil, SOM2 and SOM3, in that order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SoilOrganicMatterDecomposition;

#[typetag::serde]
impl DecompositionStage for SoilOrganicMatterDecomposition {
    fn name(&self) -> &'static str {
        "soil organic matter decomposition"
    }

    fn apply(&self, env: &StageEnvironment, state: &mut SoilState) -> CenturyResult<()> {
        decompose_som1_surface(env, state)?;
        decompose_som1_soil(env, state)?;
        decompose_som2(env, state)?;
        decompose_som3(env, state)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Volatilization;

#[typetag::serde]
impl DecompositionStage for Volatilization {
    fn name(&self) -> &'static str {
        "volatilization"
    }

    fn apply(&self, env: &StageEnvironment, state: &mut SoilState) -> CenturyResult<()> {
        volatilize(env, state).map(|_| ())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Leaching;

#[typetag::serde]
impl DecompositionStage for Leaching {
    fn name(&self) -> &'static str {
        "leaching"
    }

    fn apply(&self, env: &StageEnvironment, state: &mut SoilState) -> CenturyResult<()> {
        leach_mineral_nitrogen(env, state).map(|_| ())
    }
}

/// Ordered list of decomposition stages run once per month.
#[derive(Debug, Serialize, Deserialize)]
pub struct DecompositionPipeline {
    stages: Vec<Box<dyn DecompositionStage>>,
}

impl DecompositionPipeline {
    pub fn new(stages: Vec<Box<dyn DecompositionStage>>) -> Self {
        Self { stages }
    }

    /// Wood, litter, soil organic matter, volatilization and leaching.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(WoodDecomposition),
            Box::new(LitterDecomposition),
            Box::new(SoilOrganicMatterDecomposition),
            Box::new(Volatilization),
            Box::new(Leaching),
        ])
    }

    pub fn stages(&self) -> impl Iterator<Item = &dyn DecompositionStage> {
        self.stages.iter().map(|stage| stage.as_ref())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn apply(&self, env: &StageEnvironment, state: &mut SoilState) -> CenturyResult<()> {
        for stage in &self.stages {
            log::trace!("Applying {}", stage.name());
            stage.apply(env, state)?;
        }
        Ok(())
    }
}

impl Default for DecompositionPipeline {
    fn default() -> Self {
        Self::standard()
    }
}
