//! Monthly Soil Water Balance
//!
//! Moves a month of precipitation through the snowpack, the canopy and litter
//! surface and the soil profile, then derives the decomposition multipliers
//! from the resulting moisture and soil temperature.
//!
//! # Step order
//!
//! 1. Snow accumulation, melt and drainage of the snowpack
//! 2. Snow evaporation
//! 3. Interception and bare-soil evaporation (snow-free months only)
//! 4. Transpiration budget
//! 5. Top-layer potential evaporation
//! 6. Transpiration directly from incoming water
//! 7. Infiltration
//! 8. Drainage past field capacity, storm flow
//! 9. Base flow
//! 10. Transpiration from the profile
//! 11. Top-layer evaporation
//! 12. Mid-month relative water content
//! 13. Precipitation/PET ratio
//! 14. Soil temperature, decay factor and anaerobic effect
//!
//! Every step feeds the next, so the order is fixed.

use super::processes::{
    accumulate_snow, drain_snowpack, drain_to_field_capacity, evaporate_snow,
    evaporate_top_layer, melt_snow, partition_drainage, potential_transpiration,
    precipitation_pet_ratio, surface_fractions, surface_loss, top_layer_potential_evaporation,
    transpiration_budget, transpire_from_input, transpire_from_profile,
};
use super::temperature::soil_temperature;
use crate::decay::{anaerobic_effect, decay_factor};
use rcentury_core::climate::MonthlyWeather;
use rcentury_core::ecoregion::EcoregionParameters;
use rcentury_core::parameters::CenturyParameters;
use rcentury_core::soil::{relative_water_content, WaterState};
use rcentury_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Drivers of one month of the water balance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WaterBalanceInputs {
    pub weather: MonthlyWeather,
    /// Live vegetation biomass (g/m²)
    pub live_biomass: FloatValue,
    /// Surface litter biomass (g/m²)
    pub litter_biomass: FloatValue,
    /// Standing dead wood biomass (g/m²)
    pub dead_wood_biomass: FloatValue,
}

/// Water fluxes of one month (cm).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WaterBalanceOutputs {
    /// Liquid water reaching the soil surface after snow processes
    pub soil_input: FloatValue,
    pub snow_melt: FloatValue,
    /// Snow, interception, bare-soil and top-layer evaporation
    pub evaporation: FloatValue,
    pub transpiration: FloatValue,
    pub storm_flow: FloatValue,
    pub base_flow: FloatValue,
    /// Drained water leaving neither as storm nor as base flow
    pub deep_drainage: FloatValue,
}

impl WaterBalanceOutputs {
    /// Water that left the profile through drainage.
    pub fn drainage(&self) -> FloatValue {
        self.storm_flow + self.base_flow + self.deep_drainage
    }
}

/// Monthly soil water balance of a site.
///
/// Borrows the run's immutable parameters; the mutable water state is passed
/// to [`SoilWaterBalance::solve`] each month.
#[derive(Debug, Clone, Copy)]
pub struct SoilWaterBalance<'a> {
    parameters: &'a CenturyParameters,
    ecoregion: &'a EcoregionParameters,
}

impl<'a> SoilWaterBalance<'a> {
    pub fn new(parameters: &'a CenturyParameters, ecoregion: &'a EcoregionParameters) -> Self {
        Self {
            parameters,
            ecoregion,
        }
    }

    /// Advance the water state by one month.
    ///
    /// `state` holds the previous month's values on entry and this month's on
    /// return. Snow, liquid snowpack and soil water are never negative
    /// afterwards.
    pub fn solve(&self, state: &mut WaterState, inputs: &WaterBalanceInputs) -> WaterBalanceOutputs {
        let params = self.parameters;
        let eco = self.ecoregion;
        let weather = &inputs.weather;
        let water_full = eco.water_full();
        let water_empty = eco.water_empty();
        let start_water = state.soil_water_content;

        let mut outputs = WaterBalanceOutputs::default();
        let mut remaining_pet = weather.pet.max(0.0);

        // 1. Snow
        let (snow_pack, mut soil_input) =
            accumulate_snow(weather.precipitation, weather.mean_temperature, state.snow_pack);
        let (snow_pack, liquid_snowpack, melted) = melt_snow(
            weather.mean_temperature,
            params.snow_melt_threshold,
            params.snow_melt_rate,
            snow_pack,
            state.liquid_snowpack,
        );
        let (liquid_snowpack, drained) = drain_snowpack(snow_pack, liquid_snowpack);
        soil_input += drained;
        outputs.snow_melt = melted;

        // 2. Snow evaporation
        let (snow_pack, liquid_snowpack, snow_evaporation, pet_after_snow) =
            evaporate_snow(remaining_pet, snow_pack, liquid_snowpack);
        remaining_pet = pet_after_snow;
        state.snow_pack = snow_pack;
        state.liquid_snowpack = liquid_snowpack;
        outputs.soil_input = soil_input;

        // 3. Interception and bare-soil evaporation
        let standing_biomass = inputs.live_biomass + inputs.dead_wood_biomass;
        let (interception, bare_soil) = surface_fractions(
            inputs.litter_biomass,
            standing_biomass,
            params.interception_scale,
            params.bare_soil_evaporation_scale,
        );
        let surface_evaporation = if snow_pack <= 0.0 {
            surface_loss(weather.precipitation, interception, bare_soil, remaining_pet)
                .min(soil_input)
        } else {
            0.0
        };
        soil_input -= surface_evaporation;

        // 4-5. Transpiration budget and top-layer demand
        let potential =
            potential_transpiration(weather.mean_temperature, inputs.live_biomass, remaining_pet);
        let budget = transpiration_budget(potential, remaining_pet, surface_evaporation);
        let top_layer_demand =
            top_layer_potential_evaporation(remaining_pet, budget, surface_evaporation);

        // 6. Transpire incoming water first
        let (soil_input, transpired_input) = transpire_from_input(soil_input, budget);
        let budget = budget - transpired_input;

        // 7-9. Infiltration and drainage
        let (soil_water, water_movement) =
            drain_to_field_capacity(state.soil_water_content + soil_input, water_full);
        let (storm_flow, base_flow, deep_drainage) = partition_drainage(
            water_movement,
            soil_input,
            eco.storm_flow_fraction,
            eco.base_flow_fraction,
        );
        state.water_movement = water_movement;

        // 10. Transpiration from the profile
        let available_water = (soil_water - water_empty).max(0.0);
        let (soil_water, transpired_profile) =
            transpire_from_profile(soil_water, water_empty, budget);
        let rwc = relative_water_content(soil_water, eco);

        // 11. Top-layer evaporation
        let (soil_water, top_layer_evaporation) =
            evaporate_top_layer(soil_water, water_empty, rwc, top_layer_demand, bare_soil);
        state.soil_water_content = soil_water.max(0.0);

        // 12. Mid-month moisture
        let mid_month_water = (start_water + state.soil_water_content) / 2.0;
        state.relative_water_content = relative_water_content(mid_month_water, eco);

        // 13. Precipitation/PET ratio
        state.precipitation_pet_ratio =
            precipitation_pet_ratio(available_water, weather.precipitation, weather.pet);

        // 14. Decomposition multipliers
        state.soil_temperature = soil_temperature(
            weather.min_temperature,
            weather.max_temperature,
            inputs.live_biomass + inputs.litter_biomass,
        );
        state.decay_factor = decay_factor(
            params,
            state.soil_temperature,
            state.relative_water_content,
            state.precipitation_pet_ratio,
        );
        state.anaerobic_effect = anaerobic_effect(
            params,
            eco.drain,
            state.precipitation_pet_ratio,
            weather.mean_temperature,
        );

        outputs.evaporation = snow_evaporation + surface_evaporation + top_layer_evaporation;
        outputs.transpiration = transpired_input + transpired_profile;
        outputs.storm_flow = storm_flow;
        outputs.base_flow = base_flow;
        outputs.deep_drainage = deep_drainage;
        outputs
    }
}
