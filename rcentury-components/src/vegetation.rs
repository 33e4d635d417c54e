//! The contract between the soil engine and the vegetation model driving it.
//!
//! Cohort growth and mortality are not computed here. The orchestrator only
//! needs biomass to shade the soil and weight nitrogen allocation, and a
//! monthly `grow` call through which the vegetation returns litter and takes
//! up its granted nitrogen.

use crate::nitrogen::{calculate_resorbed_n, check_nitrogen_demand, CohortBiomass, NitrogenAllocator};
use rcentury_core::cohort::CohortHandle;
use rcentury_core::context::SimulationContext;
use rcentury_core::errors::CenturyResult;
use rcentury_core::pool::Layer;
use rcentury_core::soil::SoilState;
use rcentury_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Position of a growth call within the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GrowthStep {
    /// Last simulated year of the run
    pub is_final_timestep: bool,
    /// Last processed month of the simulated year
    pub is_last_month: bool,
}

/// What the vegetation reports back after a month of growth.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrowthReport {
    /// Gross aboveground production (g C/m²)
    pub above_npp_carbon: FloatValue,
    /// Gross belowground production (g C/m²)
    pub below_npp_carbon: FloatValue,
    /// Nitrogen demanded by each cohort (g N/m²), diagnostic only
    pub nitrogen_demand: Vec<(CohortHandle, FloatValue)>,
}

/// Vegetation growing on a site.
pub trait VegetationModel: Send + Sync {
    /// Live biomass shading the soil (g/m²).
    fn total_live_biomass(&self) -> FloatValue;

    /// Biomass of every live cohort, used to rebuild allocation weights.
    fn cohort_biomass(&self) -> Vec<CohortBiomass>;

    /// Register existing cohorts with the site's allocator before the first month.
    fn establish(&mut self, _nitrogen: &mut NitrogenAllocator) -> CenturyResult<()> {
        Ok(())
    }

    /// Grow for one month.
    ///
    /// Litterfall enters `soil` through [`SoilState::add_residue`] and
    /// [`SoilState::add_wood`]; uptake draws on the granted allocation.
    fn grow(
        &mut self,
        ctx: &SimulationContext,
        step: GrowthStep,
        soil: &mut SoilState,
        nitrogen: &mut NitrogenAllocator,
    ) -> CenturyResult<GrowthReport>;
}

/// Bare soil.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NullVegetation;

impl VegetationModel for NullVegetation {
    fn total_live_biomass(&self) -> FloatValue {
        0.0
    }

    fn cohort_biomass(&self) -> Vec<CohortBiomass> {
        vec![]
    }

    fn grow(
        &mut self,
        _ctx: &SimulationContext,
        _step: GrowthStep,
        _soil: &mut SoilState,
        _nitrogen: &mut NitrogenAllocator,
    ) -> CenturyResult<GrowthReport> {
        Ok(GrowthReport::default())
    }
}

/// A cohort with constant biomass whose production is returned as litter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescribedCohort {
    pub species_index: usize,
    /// unit: g/m²
    pub leaf_biomass: FloatValue,
    /// unit: g/m²
    pub wood_biomass: FloatValue,
    /// unit: g/m²
    pub coarse_root_biomass: FloatValue,
    /// Monthly aboveground production
    ///
    /// unit: g C/m²
    pub above_npp: FloatValue,
    /// Monthly belowground production
    ///
    /// unit: g C/m²
    pub below_npp: FloatValue,
    /// Share of production allocated to wood and coarse roots
    pub wood_fraction: FloatValue,
    pub leaf_cn: FloatValue,
    pub leaf_litter_cn: FloatValue,
    pub wood_cn: FloatValue,
    pub fine_root_cn: FloatValue,
    pub leaf_lignin: FloatValue,
    pub fine_root_lignin: FloatValue,
}

impl Default for PrescribedCohort {
    fn default() -> Self {
        Self {
            species_index: 0,
            leaf_biomass: 300.0,
            wood_biomass: 8000.0,
            coarse_root_biomass: 1500.0,
            above_npp: 25.0,
            below_npp: 15.0,
            wood_fraction: 0.3,
            leaf_cn: 40.0,
            leaf_litter_cn: 80.0,
            wood_cn: 300.0,
            fine_root_cn: 50.0,
            leaf_lignin: 0.2,
            fine_root_lignin: 0.25,
        }
    }
}

impl PrescribedCohort {
    fn nitrogen_demand(&self) -> FloatValue {
        let soft = (self.above_npp + self.below_npp) * (1.0 - self.wood_fraction);
        let woody = (self.above_npp + self.below_npp) * self.wood_fraction;
        soft / self.leaf_cn + woody / self.wood_cn
    }
}

/// Vegetation of constant composition, for demonstrations and tests.
///
/// Every month each cohort produces its prescribed NPP and drops the same
/// amount as litter, so live biomass never changes. Uptake is the lesser of
/// its demand and the mineral N granted to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescribedVegetation {
    cohorts: Vec<PrescribedCohort>,
    #[serde(skip)]
    handles: Vec<CohortHandle>,
}

impl PrescribedVegetation {
    pub fn new(cohorts: Vec<PrescribedCohort>) -> Self {
        Self {
            cohorts,
            handles: vec![],
        }
    }

    pub fn cohorts(&self) -> &[PrescribedCohort] {
        &self.cohorts
    }

    pub fn handles(&self) -> &[CohortHandle] {
        &self.handles
    }
}

impl VegetationModel for PrescribedVegetation {
    fn total_live_biomass(&self) -> FloatValue {
        self.cohorts
            .iter()
            .map(|c| c.leaf_biomass + c.wood_biomass)
            .sum()
    }

    fn cohort_biomass(&self) -> Vec<CohortBiomass> {
        self.handles
            .iter()
            .zip(&self.cohorts)
            .map(|(handle, cohort)| CohortBiomass {
                handle: *handle,
                coarse_root_biomass: cohort.coarse_root_biomass,
                wood_biomass: cohort.wood_biomass,
            })
            .collect()
    }

    fn establish(&mut self, nitrogen: &mut NitrogenAllocator) -> CenturyResult<()> {
        self.handles = self
            .cohorts
            .iter()
            .map(|cohort| nitrogen.establish(cohort.species_index, 0, 0))
            .collect();
        Ok(())
    }

    fn grow(
        &mut self,
        _ctx: &SimulationContext,
        step: GrowthStep,
        soil: &mut SoilState,
        nitrogen: &mut NitrogenAllocator,
    ) -> CenturyResult<GrowthReport> {
        let mut report = GrowthReport::default();

        for (handle, cohort) in self.handles.iter().zip(&self.cohorts) {
            let demand = cohort.nitrogen_demand();
            check_nitrogen_demand(*handle, demand)?;
            report.nitrogen_demand.push((*handle, demand));

            let uptake = demand.min(nitrogen.mineral_n_allocation(*handle)?).max(0.0);
            soil.take_up_nitrogen(uptake)?;

            let leaf_litter = cohort.above_npp * (1.0 - cohort.wood_fraction);
            let wood_litter = cohort.above_npp * cohort.wood_fraction;
            let fine_root_litter = cohort.below_npp * (1.0 - cohort.wood_fraction);
            let coarse_root_litter = cohort.below_npp * cohort.wood_fraction;

            soil.add_residue(
                Layer::Surface,
                leaf_litter,
                leaf_litter / cohort.leaf_litter_cn,
                cohort.leaf_lignin,
            )?;
            soil.add_wood(Layer::Surface, wood_litter, wood_litter / cohort.wood_cn)?;
            soil.add_residue(
                Layer::Soil,
                fine_root_litter,
                fine_root_litter / cohort.fine_root_cn,
                cohort.fine_root_lignin,
            )?;
            soil.add_wood(
                Layer::Soil,
                coarse_root_litter,
                coarse_root_litter / cohort.wood_cn,
            )?;

            if step.is_last_month {
                let resorbed =
                    calculate_resorbed_n(cohort.leaf_biomass, cohort.leaf_cn, cohort.leaf_litter_cn)?;
                nitrogen.set_resorbed_n_allocation(*handle, resorbed)?;
            }

            report.above_npp_carbon += cohort.above_npp;
            report.below_npp_carbon += cohort.below_npp;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rcentury_core::context::SiteId;
    use rcentury_core::ecoregion::EcoregionParameters;
    use rcentury_core::parameters::CenturyParameters;
    use rcentury_core::soil::InitialConditions;

    fn soil() -> SoilState {
        SoilState::new(
            &InitialConditions::default(),
            &EcoregionParameters::default(),
            &CenturyParameters::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_null_vegetation() {
        let mut soil = soil();
        let before = soil.clone();
        let mut nitrogen = NitrogenAllocator::new();
        let report = NullVegetation
            .grow(
                &SimulationContext::new(SiteId(0), 0, 6, 0, 1),
                GrowthStep::default(),
                &mut soil,
                &mut nitrogen,
            )
            .unwrap();
        assert_eq!(report, GrowthReport::default());
        assert_eq!(soil, before);
        assert!(NullVegetation.cohort_biomass().is_empty());
    }

    #[test]
    fn test_prescribed_litterfall_and_uptake() {
        let mut soil = soil();
        let mut nitrogen = NitrogenAllocator::new();
        let mut vegetation = PrescribedVegetation::new(vec![PrescribedCohort::default()]);
        vegetation.establish(&mut nitrogen).unwrap();
        nitrogen
            .calculate_mineral_n_fractions(&vegetation.cohort_biomass())
            .unwrap();
        nitrogen.set_mineral_n_allocation(soil.mineral_n);

        let carbon = soil.carbon_balance();
        let nitrogen_balance = soil.nitrogen_balance();
        let report = vegetation
            .grow(
                &SimulationContext::new(SiteId(0), 0, 5, 11, 1),
                GrowthStep {
                    is_final_timestep: true,
                    is_last_month: true,
                },
                &mut soil,
                &mut nitrogen,
            )
            .unwrap();

        assert_relative_eq!(report.above_npp_carbon, 25.0);
        assert_relative_eq!(report.below_npp_carbon, 15.0);
        assert_relative_eq!(soil.ledger.external_carbon_input, 40.0, max_relative = 1e-12);
        // Demand 40 * 0.7 / 40 + 40 * 0.3 / 300 = 0.74 is below the 2 g granted
        assert_relative_eq!(soil.ledger.plant_nitrogen_uptake, 0.74, max_relative = 1e-12);
        assert_relative_eq!(soil.carbon_balance(), carbon, max_relative = 1e-12);
        assert_relative_eq!(soil.nitrogen_balance(), nitrogen_balance, max_relative = 1e-12);

        let handle = vegetation.handles()[0];
        assert_relative_eq!(
            nitrogen.resorbed_n_allocation(handle).unwrap(),
            300.0 * 0.47 * (1.0 / 40.0 - 1.0 / 80.0)
        );
    }
}
