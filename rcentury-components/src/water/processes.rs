//! Soil water process functions.
//!
//! Pure functions for each step of the monthly water balance. Water amounts
//! are in cm, biomass in g/m² and temperatures in °C.

use rcentury_core::constants::{
    BARE_SOIL_EVAPORATION, EVAPORATION_MOISTURE_THRESHOLD, LITTER_EVAPORATION_DECAY,
    LITTER_INTERCEPTION, MAX_LITTER_BIOMASS, MAX_STANDING_BIOMASS, MIN_EVAPORATION_MOISTURE,
    MIN_PET, MIN_TRANSPIRATION, MIN_TRANSPIRATION_TEMPERATURE, SNOW_EVAPORATION_ENERGY,
    SNOW_LIQUID_HOLDING, STANDING_EVAPORATION_DECAY, STANDING_INTERCEPTION,
    SURFACE_LOSS_PET_FRACTION, TOP_LAYER_EVAPORATION_SCALE, TRANSPIRATION_BIOMASS_COEFFICIENT,
    TRANSPIRATION_PET_FRACTION,
};
use rcentury_core::FloatValue;

/// Route precipitation to the snowpack when it is below freezing.
///
/// Returns (new_snow_pack, liquid_input).
pub fn accumulate_snow(
    precipitation: FloatValue,
    mean_temperature: FloatValue,
    snow_pack: FloatValue,
) -> (FloatValue, FloatValue) {
    if mean_temperature < 0.0 {
        (snow_pack + precipitation, 0.0)
    } else {
        (snow_pack, precipitation)
    }
}

/// Melt snow in proportion to the temperature above the melt threshold.
///
/// Returns (new_snow_pack, new_liquid_snowpack, melted).
pub fn melt_snow(
    mean_temperature: FloatValue,
    melt_threshold: FloatValue,
    melt_rate: FloatValue,
    snow_pack: FloatValue,
    liquid_snowpack: FloatValue,
) -> (FloatValue, FloatValue, FloatValue) {
    if snow_pack <= 0.0 || mean_temperature <= melt_threshold {
        return (snow_pack, liquid_snowpack, 0.0);
    }
    let melted = (melt_rate * (mean_temperature - melt_threshold)).min(snow_pack);
    (snow_pack - melted, liquid_snowpack + melted, melted)
}

/// Drain liquid water the snowpack cannot hold.
///
/// Returns (new_liquid_snowpack, drained).
pub fn drain_snowpack(snow_pack: FloatValue, liquid_snowpack: FloatValue) -> (FloatValue, FloatValue) {
    let holding = SNOW_LIQUID_HOLDING * snow_pack;
    if liquid_snowpack > holding {
        (holding, liquid_snowpack - holding)
    } else {
        (liquid_snowpack, 0.0)
    }
}

/// Evaporate snow and liquid snowpack in proportion to their masses.
///
/// Returns (new_snow_pack, new_liquid_snowpack, evaporated, remaining_pet).
pub fn evaporate_snow(
    remaining_pet: FloatValue,
    snow_pack: FloatValue,
    liquid_snowpack: FloatValue,
) -> (FloatValue, FloatValue, FloatValue, FloatValue) {
    let total = snow_pack + liquid_snowpack;
    if total <= 0.0 {
        return (snow_pack, liquid_snowpack, 0.0, remaining_pet);
    }
    let evaporated = total.min(remaining_pet * SNOW_EVAPORATION_ENERGY);
    let from_snow = evaporated * snow_pack / total;
    let from_liquid = evaporated - from_snow;
    let remaining_pet = (remaining_pet - evaporated / SNOW_EVAPORATION_ENERGY).max(0.0);
    (
        (snow_pack - from_snow).max(0.0),
        (liquid_snowpack - from_liquid).max(0.0),
        evaporated,
        remaining_pet,
    )
}

/// Interception and bare-soil evaporation fractions of incoming water.
///
/// Returns (interception, bare_soil_evaporation).
pub fn surface_fractions(
    litter_biomass: FloatValue,
    standing_biomass: FloatValue,
    interception_scale: FloatValue,
    bare_soil_scale: FloatValue,
) -> (FloatValue, FloatValue) {
    let litter = litter_biomass.clamp(0.0, MAX_LITTER_BIOMASS);
    let standing = standing_biomass.clamp(0.0, MAX_STANDING_BIOMASS);
    let interception =
        (LITTER_INTERCEPTION * litter + STANDING_INTERCEPTION * standing) * interception_scale;
    let bare_soil = BARE_SOIL_EVAPORATION
        * (-LITTER_EVAPORATION_DECAY * litter - STANDING_EVAPORATION_DECAY * standing).exp()
        * bare_soil_scale;
    (interception, bare_soil)
}

/// Interception plus bare-soil evaporation of the month's precipitation.
///
/// The lesser of the combined fraction of precipitation and 40 % of the
/// remaining PET, never more than the precipitation itself.
pub fn surface_loss(
    precipitation: FloatValue,
    interception: FloatValue,
    bare_soil_evaporation: FloatValue,
    remaining_pet: FloatValue,
) -> FloatValue {
    ((interception + bare_soil_evaporation) * precipitation)
        .min(SURFACE_LOSS_PET_FRACTION * remaining_pet)
        .min(precipitation)
        .max(0.0)
}

/// Transpiration demand of the live biomass.
pub fn potential_transpiration(
    mean_temperature: FloatValue,
    live_biomass: FloatValue,
    remaining_pet: FloatValue,
) -> FloatValue {
    if mean_temperature < MIN_TRANSPIRATION_TEMPERATURE {
        return 0.0;
    }
    let saturation = 1.0 - (-TRANSPIRATION_BIOMASS_COEFFICIENT * live_biomass.max(0.0)).exp();
    saturation * remaining_pet * TRANSPIRATION_PET_FRACTION
}

/// Transpiration allowed after surface losses, never below the minimum.
pub fn transpiration_budget(
    potential: FloatValue,
    remaining_pet: FloatValue,
    surface_loss: FloatValue,
) -> FloatValue {
    potential
        .min(remaining_pet - surface_loss)
        .max(MIN_TRANSPIRATION)
}

/// PET left for evaporation from the top soil layer.
pub fn top_layer_potential_evaporation(
    remaining_pet: FloatValue,
    transpiration: FloatValue,
    surface_loss: FloatValue,
) -> FloatValue {
    (remaining_pet - transpiration - surface_loss).max(0.0)
}

/// Transpire directly from incoming water before it reaches the profile.
///
/// Returns (new_soil_input, transpired).
pub fn transpire_from_input(soil_input: FloatValue, budget: FloatValue) -> (FloatValue, FloatValue) {
    let transpired = (budget - MIN_TRANSPIRATION).min(soil_input).max(0.0);
    (soil_input - transpired, transpired)
}

/// Clamp the profile at field capacity.
///
/// Returns (new_soil_water, water_movement).
pub fn drain_to_field_capacity(
    soil_water: FloatValue,
    water_full: FloatValue,
) -> (FloatValue, FloatValue) {
    if soil_water > water_full {
        (water_full, soil_water - water_full)
    } else {
        (soil_water, 0.0)
    }
}

/// Split drained water into storm flow, base flow and deep drainage.
///
/// Storm flow is a fraction of the water drained past field capacity. Base
/// flow is a fraction of the month's input that did not leave as storm flow:
/// $$Q_{base} = (I - Q_{storm}) \cdot f_{base}$$
/// Both are taken from the drainage total, so deep drainage is negative when
/// base flow includes water that by-passed the profile.
///
/// Returns (storm_flow, base_flow, deep_drainage).
pub fn partition_drainage(
    water_movement: FloatValue,
    soil_input: FloatValue,
    storm_flow_fraction: FloatValue,
    base_flow_fraction: FloatValue,
) -> (FloatValue, FloatValue, FloatValue) {
    let storm_flow = water_movement * storm_flow_fraction;
    let drained_water = (soil_input - storm_flow).max(0.0);
    let base_flow = drained_water * base_flow_fraction;
    (storm_flow, base_flow, water_movement - storm_flow - base_flow)
}

/// Transpire from the water held above the wilting point.
///
/// Returns (new_soil_water, transpired).
pub fn transpire_from_profile(
    soil_water: FloatValue,
    water_empty: FloatValue,
    budget: FloatValue,
) -> (FloatValue, FloatValue) {
    let available = (soil_water - water_empty).max(0.0);
    let transpired = budget.min(available).max(0.0);
    (soil_water - transpired, transpired)
}

/// Moisture-gated evaporation from the top soil layer.
///
/// Returns (new_soil_water, evaporated).
pub fn evaporate_top_layer(
    soil_water: FloatValue,
    water_empty: FloatValue,
    relative_water_content: FloatValue,
    potential_evaporation: FloatValue,
    bare_soil_evaporation: FloatValue,
) -> (FloatValue, FloatValue) {
    let moisture_gate = ((relative_water_content - EVAPORATION_MOISTURE_THRESHOLD)
        / (1.0 - EVAPORATION_MOISTURE_THRESHOLD))
        .max(MIN_EVAPORATION_MOISTURE);
    let demand = moisture_gate
        * potential_evaporation
        * bare_soil_evaporation
        * TOP_LAYER_EVAPORATION_SCALE;
    let available = (soil_water - water_empty).max(0.0);
    let evaporated = demand.min(available).max(0.0);
    (soil_water - evaporated, evaporated)
}

/// (available water + precipitation) / PET.
pub fn precipitation_pet_ratio(
    available_water: FloatValue,
    precipitation: FloatValue,
    pet: FloatValue,
) -> FloatValue {
    (available_water.max(0.0) + precipitation) / pet.max(MIN_PET)
}
