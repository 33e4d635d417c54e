//! Monthly orchestration of the soil engine.
//!
//! A [`Century`] holds everything that is fixed for a run (parameters,
//! ecoregions, climate and the decomposition pipeline) and is only ever
//! borrowed immutably. Each [`Site`] owns its mutable state. Months are
//! processed in a fixed sequence:
//!
//! 1. reset the month's flux record
//! 2. nitrogen deposition
//! 3. soil water balance
//! 4. rebuild allocation weights / reset resorption (on their configured months)
//! 5. monthly nitrogen grant
//! 6. vegetation growth
//! 7. decomposition pipeline (wood, litter, SOM, volatilization, leaching)
//! 8. net ecosystem exchange
//!
//! A failure anywhere aborts the run and reports the site, year and month.

use crate::nitrogen::{check_nitrogen_demand, NitrogenAllocator};
use crate::pipeline::{DecompositionPipeline, StageEnvironment};
use crate::vegetation::{GrowthStep, VegetationModel};
use crate::water::{SoilWaterBalance, WaterBalanceInputs};
use ndarray::Array2;
use rayon::prelude::*;
use rcentury_core::climate::{ClimateLibrary, ClimateTable};
use rcentury_core::constants::MONTHS_PER_YEAR;
use rcentury_core::context::{SimulationContext, SiteId};
use rcentury_core::ecoregion::EcoregionParameters;
use rcentury_core::errors::{CenturyError, CenturyResult};
use rcentury_core::parameters::{CenturyParameters, RunConfiguration};
use rcentury_core::soil::{InitialConditions, SoilState};
use rcentury_core::standard_variables::{read_variable, OutputVariable, OUTPUT_VARIABLES};
use rcentury_core::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A land unit: soil state, nitrogen allocation and the vegetation growing on it.
#[derive(Debug)]
pub struct Site<V> {
    pub id: SiteId,
    pub ecoregion: String,
    pub soil: SoilState,
    pub nitrogen: NitrogenAllocator,
    pub vegetation: V,
    /// Year offset of the next simulated year
    year: usize,
    weights_built: bool,
}

impl<V: VegetationModel> Site<V> {
    pub fn year(&self) -> usize {
        self.year
    }
}

/// Monthly values of every standard output variable over a run.
///
/// Each array is (simulated year × calendar month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutputs {
    pub site: SiteId,
    pub start_year: usize,
    values: HashMap<String, Array2<FloatValue>>,
}

impl RunOutputs {
    fn new(site: SiteId, start_year: usize, years: usize) -> Self {
        let values = OUTPUT_VARIABLES
            .iter()
            .map(|variable| {
                (
                    variable.name.to_string(),
                    Array2::from_elem((years, MONTHS_PER_YEAR), FloatValue::NAN),
                )
            })
            .collect();
        Self {
            site,
            start_year,
            values,
        }
    }

    fn record(&mut self, year: usize, month: usize, soil: &SoilState) {
        for variable in OUTPUT_VARIABLES.iter() {
            if let (Some(value), Some(series)) = (
                read_variable(soil, variable, month),
                self.values.get_mut(variable.name),
            ) {
                series[[year, month]] = value;
            }
        }
    }

    pub fn get(&self, variable: &OutputVariable) -> Option<&Array2<FloatValue>> {
        self.values.get(variable.name)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Array2<FloatValue>> {
        self.values.get(name)
    }

    /// Sum over each simulated year.
    pub fn annual_totals(&self, variable: &OutputVariable) -> Option<Vec<FloatValue>> {
        self.get(variable)
            .map(|series| series.rows().into_iter().map(|row| row.sum()).collect())
    }

    pub fn years(&self) -> usize {
        self.values
            .values()
            .next()
            .map(|series| series.nrows())
            .unwrap_or(0)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|name| name.as_str())
    }
}

/// Build a [`Century`] model, validating every input before the first month.
#[derive(Debug, Default)]
pub struct CenturyBuilder {
    configuration: RunConfiguration,
    ecoregions: Vec<EcoregionParameters>,
    climate: ClimateLibrary,
    pipeline: Option<DecompositionPipeline>,
}

impl CenturyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configuration(&mut self, configuration: RunConfiguration) -> &mut Self {
        self.configuration = configuration;
        self
    }

    pub fn with_parameters(&mut self, parameters: CenturyParameters) -> &mut Self {
        self.configuration.parameters = parameters;
        self
    }

    pub fn with_ecoregion(&mut self, ecoregion: EcoregionParameters) -> &mut Self {
        self.ecoregions.push(ecoregion);
        self
    }

    pub fn with_climate(&mut self, ecoregion: &str, table: ClimateTable) -> &mut Self {
        self.climate.insert(ecoregion, table);
        self
    }

    pub fn with_climate_library(&mut self, climate: ClimateLibrary) -> &mut Self {
        self.climate = climate;
        self
    }

    /// Replace the standard decomposition pipeline.
    pub fn with_pipeline(&mut self, pipeline: DecompositionPipeline) -> &mut Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn build(&mut self) -> CenturyResult<Century> {
        self.configuration.validate()?;

        let mut ecoregions = HashMap::new();
        for ecoregion in &self.ecoregions {
            ecoregion.validate()?;
            self.climate.table(&ecoregion.name)?;
            if ecoregions
                .insert(ecoregion.name.clone(), ecoregion.clone())
                .is_some()
            {
                return Err(CenturyError::invalid_parameter(
                    "name",
                    format!("ecoregion `{}` is defined twice", ecoregion.name),
                ));
            }
        }
        if ecoregions.is_empty() {
            return Err(CenturyError::Error(
                "A model needs at least one ecoregion".to_string(),
            ));
        }
        self.climate.validate()?;

        let pipeline = self.pipeline.take().unwrap_or_default();
        log::info!(
            "Built CENTURY model with {} ecoregions and {} decomposition stages ({:?} month order)",
            ecoregions.len(),
            pipeline.len(),
            self.configuration.month_order()
        );

        Ok(Century {
            configuration: self.configuration.clone(),
            ecoregions,
            climate: std::mem::take(&mut self.climate),
            pipeline,
        })
    }
}

/// The immutable part of a simulation, shared by every site.
#[derive(Debug)]
pub struct Century {
    configuration: RunConfiguration,
    ecoregions: HashMap<String, EcoregionParameters>,
    climate: ClimateLibrary,
    pipeline: DecompositionPipeline,
}

impl Century {
    pub fn configuration(&self) -> &RunConfiguration {
        &self.configuration
    }

    pub fn parameters(&self) -> &CenturyParameters {
        &self.configuration.parameters
    }

    pub fn pipeline(&self) -> &DecompositionPipeline {
        &self.pipeline
    }

    pub fn ecoregion(&self, name: &str) -> CenturyResult<&EcoregionParameters> {
        self.ecoregions
            .get(name)
            .ok_or_else(|| CenturyError::UnknownEcoregion(name.to_string()))
    }

    /// Names of every configured ecoregion, sorted.
    pub fn ecoregion_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.ecoregions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Initialise a site and register its cohorts.
    pub fn create_site<V: VegetationModel>(
        &self,
        id: SiteId,
        ecoregion: &str,
        initial: &InitialConditions,
        mut vegetation: V,
    ) -> CenturyResult<Site<V>> {
        let eco = self.ecoregion(ecoregion)?;
        let soil = SoilState::new(initial, eco, self.parameters())?;
        let mut nitrogen = NitrogenAllocator::new();
        vegetation.establish(&mut nitrogen)?;
        Ok(Site {
            id,
            ecoregion: ecoregion.to_string(),
            soil,
            nitrogen,
            vegetation,
            year: 0,
            weights_built: false,
        })
    }

    /// Simulate one month of a site.
    pub fn run_month<V: VegetationModel>(
        &self,
        site: &mut Site<V>,
        ctx: &SimulationContext,
    ) -> CenturyResult<()> {
        self.step_month(site, ctx).map_err(|err| ctx.fail(err))
    }

    fn step_month<V: VegetationModel>(
        &self,
        site: &mut Site<V>,
        ctx: &SimulationContext,
    ) -> CenturyResult<()> {
        let params = self.parameters();
        let eco = self.ecoregion(&site.ecoregion)?;
        let weather = self.climate.weather(&site.ecoregion, ctx.year, ctx.month)?;
        let soil = &mut site.soil;

        soil.begin_month(ctx.month);
        soil.deposit_nitrogen(weather.n_deposition)?;

        let inputs = WaterBalanceInputs {
            weather,
            live_biomass: site.vegetation.total_live_biomass(),
            litter_biomass: soil.surface_litter_biomass(),
            dead_wood_biomass: soil.dead_wood_biomass(),
        };
        let water = SoilWaterBalance::new(params, eco).solve(&mut soil.water, &inputs);
        {
            let fluxes = soil.fluxes_mut();
            fluxes.base_flow = water.base_flow;
            fluxes.storm_flow = water.storm_flow;
            fluxes.transpiration = water.transpiration;
            fluxes.evaporation = water.evaporation;
        }

        if ctx.month == self.configuration.allocation_month || !site.weights_built {
            site.nitrogen
                .calculate_mineral_n_fractions(&site.vegetation.cohort_biomass())?;
            site.weights_built = true;
        }
        if ctx.month == self.configuration.resorption_reset_month {
            site.nitrogen.reset_resorbed_n();
        }
        site.nitrogen.set_mineral_n_allocation(soil.mineral_n);

        let step = GrowthStep {
            is_final_timestep: ctx.is_final_year(),
            is_last_month: ctx.is_last_month(),
        };
        let report = site.vegetation.grow(ctx, step, soil, &mut site.nitrogen)?;
        for (handle, demand) in &report.nitrogen_demand {
            check_nitrogen_demand(*handle, *demand)?;
        }

        let env = StageEnvironment::new(params, eco).with_flows(water.base_flow, water.storm_flow);
        self.pipeline.apply(&env, soil)?;

        let fluxes = soil.fluxes_mut();
        fluxes.above_npp_carbon = report.above_npp_carbon;
        fluxes.below_npp_carbon = report.below_npp_carbon;
        fluxes.net_ecosystem_exchange = -(report.above_npp_carbon + report.below_npp_carbon)
            + fluxes.heterotrophic_respiration;

        log::debug!(
            "Site {} year {} month {}: decay factor {:.3}, mineral N {:.3}, NEE {:.3}",
            ctx.site,
            ctx.year,
            ctx.month,
            soil.water.decay_factor,
            soil.mineral_n,
            soil.fluxes().net_ecosystem_exchange
        );
        Ok(())
    }

    /// Simulate the twelve months of the site's next year.
    ///
    /// `total_years` is the last year offset (exclusive) of the run, used to
    /// flag the final timestep to the vegetation.
    pub fn run_year<V: VegetationModel>(
        &self,
        site: &mut Site<V>,
        total_years: usize,
    ) -> CenturyResult<()> {
        self.run_year_recording(site, total_years, None)
    }

    fn run_year_recording<V: VegetationModel>(
        &self,
        site: &mut Site<V>,
        total_years: usize,
        mut outputs: Option<(&mut RunOutputs, usize)>,
    ) -> CenturyResult<()> {
        let year = site.year;
        for (month_count, month) in self.configuration.month_order().months().into_iter().enumerate() {
            let ctx = SimulationContext::new(site.id, year, month, month_count, total_years);
            self.run_month(site, &ctx)?;
            if let Some((outputs, row)) = outputs.as_mut() {
                outputs.record(*row, month, &site.soil);
            }
        }
        site.soil.close_year();
        site.year += 1;
        Ok(())
    }

    /// Simulate `years` further years of a site and collect the monthly outputs.
    pub fn run<V: VegetationModel>(
        &self,
        site: &mut Site<V>,
        years: usize,
    ) -> CenturyResult<RunOutputs> {
        let start_year = site.year;
        let total_years = start_year + years;
        let mut outputs = RunOutputs::new(site.id, start_year, years);
        for row in 0..years {
            self.run_year_recording(site, total_years, Some((&mut outputs, row)))?;
        }
        Ok(outputs)
    }

    /// Simulate independent sites in parallel.
    pub fn run_sites<V: VegetationModel>(
        &self,
        sites: &mut [Site<V>],
        years: usize,
    ) -> CenturyResult<Vec<RunOutputs>> {
        log::info!("Running {} sites for {} years", sites.len(), years);
        let outputs = sites
            .par_iter_mut()
            .map(|site| self.run(site, years))
            .collect::<CenturyResult<Vec<_>>>()?;
        log::info!("Finished {} sites", outputs.len());
        Ok(outputs)
    }
}
