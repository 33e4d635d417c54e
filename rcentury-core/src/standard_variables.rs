//! Standard output variables.
//!
//! Names follow the `|` hierarchical convention so outputs of this engine can
//! be merged with those of the succession model that drives it.
//!
//! ```rust
//! use rcentury_core::standard_variables::{OUTPUT_VARIABLES, VAR_SOIL_ORGANIC_CARBON};
//!
//! assert_eq!(VAR_SOIL_ORGANIC_CARBON.name, "Carbon Pool|Soil Organic Matter");
//! assert!(OUTPUT_VARIABLES.iter().any(|v| v.unit == "cm / month"));
//! ```

use crate::soil::SoilState;
use crate::FloatValue;

/// Name, unit and description of a reported quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputVariable {
    pub name: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
}

macro_rules! define_output_variable {
    ($ident:ident, name = $name:literal, unit = $unit:literal, description = $description:literal $(,)?) => {
        pub const $ident: OutputVariable = OutputVariable {
            name: $name,
            unit: $unit,
            description: $description,
        };
    };
}

// ============================================================================
// Pools
// ============================================================================

define_output_variable!(
    VAR_SOIL_ORGANIC_CARBON,
    name = "Carbon Pool|Soil Organic Matter",
    unit = "g C / m^2",
    description = "Carbon in SOM1 (surface and soil), SOM2 and SOM3",
);

define_output_variable!(
    VAR_LITTER_CARBON,
    name = "Carbon Pool|Litter",
    unit = "g C / m^2",
    description = "Carbon in structural and metabolic litter",
);

define_output_variable!(
    VAR_DEAD_WOOD_CARBON,
    name = "Carbon Pool|Dead Wood",
    unit = "g C / m^2",
    description = "Carbon in surface dead wood and dead coarse roots",
);

define_output_variable!(
    VAR_MINERAL_N,
    name = "Nitrogen Pool|Mineral",
    unit = "g N / m^2",
    description = "Plant-available mineral nitrogen",
);

define_output_variable!(
    VAR_SOIL_WATER,
    name = "Soil Water",
    unit = "cm",
    description = "Water held in the soil profile",
);

// ============================================================================
// Monthly fluxes
// ============================================================================

define_output_variable!(
    VAR_AG_NPP,
    name = "Carbon Flux|NPP|Aboveground",
    unit = "g C / m^2 / month",
    description = "Aboveground net primary production reported by vegetation",
);

define_output_variable!(
    VAR_BG_NPP,
    name = "Carbon Flux|NPP|Belowground",
    unit = "g C / m^2 / month",
    description = "Belowground net primary production reported by vegetation",
);

define_output_variable!(
    VAR_HETEROTROPHIC_RESPIRATION,
    name = "Carbon Flux|Heterotrophic Respiration",
    unit = "g C / m^2 / month",
    description = "CO2 released by litter, wood and SOM decomposition",
);

define_output_variable!(
    VAR_NEE,
    name = "Carbon Flux|NEE",
    unit = "g C / m^2 / month",
    description = "Net ecosystem exchange, positive is a release to the atmosphere",
);

define_output_variable!(
    VAR_N_DEPOSITION,
    name = "Nitrogen Flux|Deposition",
    unit = "g N / m^2 / month",
    description = "Atmospheric nitrogen deposition",
);

define_output_variable!(
    VAR_N_VOLATILIZATION,
    name = "Nitrogen Flux|Volatilization",
    unit = "g N / m^2 / month",
    description = "Mineral nitrogen lost to the atmosphere",
);

define_output_variable!(
    VAR_N_LEACHED,
    name = "Nitrogen Flux|Leaching|Mineral",
    unit = "g N / m^2 / month",
    description = "Nitrate leached to the stream",
);

define_output_variable!(
    VAR_ORGANIC_C_LEACHED,
    name = "Carbon Flux|Leaching|Organic",
    unit = "g C / m^2 / month",
    description = "Dissolved organic carbon leached from soil microbes",
);

define_output_variable!(
    VAR_GROSS_MINERALIZATION,
    name = "Nitrogen Flux|Gross Mineralization",
    unit = "g N / m^2 / month",
    description = "Nitrogen released to the mineral pool by decomposition",
);

define_output_variable!(
    VAR_BASE_FLOW,
    name = "Water Flux|Base Flow",
    unit = "cm / month",
    description = "Drainage leaving the profile as base flow",
);

define_output_variable!(
    VAR_STORM_FLOW,
    name = "Water Flux|Storm Flow",
    unit = "cm / month",
    description = "Drainage leaving the profile as storm flow",
);

define_output_variable!(
    VAR_TRANSPIRATION,
    name = "Water Flux|Transpiration",
    unit = "cm / month",
    description = "Water transpired by vegetation",
);

define_output_variable!(
    VAR_EVAPORATION,
    name = "Water Flux|Evaporation",
    unit = "cm / month",
    description = "Snow, interception and bare-soil evaporation",
);

/// Every variable reported by [`read_variable`], in reporting order.
pub const OUTPUT_VARIABLES: [OutputVariable; 18] = [
    VAR_SOIL_ORGANIC_CARBON,
    VAR_LITTER_CARBON,
    VAR_DEAD_WOOD_CARBON,
    VAR_MINERAL_N,
    VAR_SOIL_WATER,
    VAR_AG_NPP,
    VAR_BG_NPP,
    VAR_HETEROTROPHIC_RESPIRATION,
    VAR_NEE,
    VAR_N_DEPOSITION,
    VAR_N_VOLATILIZATION,
    VAR_N_LEACHED,
    VAR_ORGANIC_C_LEACHED,
    VAR_GROSS_MINERALIZATION,
    VAR_BASE_FLOW,
    VAR_STORM_FLOW,
    VAR_TRANSPIRATION,
    VAR_EVAPORATION,
];

/// Current value of a standard variable for a site.
///
/// Flux variables read the record of the calendar month `month`.
pub fn read_variable(state: &SoilState, variable: &OutputVariable, month: usize) -> Option<FloatValue> {
    let fluxes = state.monthly.get(month)?;
    let value = match variable.name {
        n if n == VAR_SOIL_ORGANIC_CARBON.name => state.soil_organic_carbon(),
        n if n == VAR_LITTER_CARBON.name => state.litter_carbon(),
        n if n == VAR_DEAD_WOOD_CARBON.name => state.dead_wood_carbon(),
        n if n == VAR_MINERAL_N.name => state.mineral_n,
        n if n == VAR_SOIL_WATER.name => state.water.soil_water_content,
        n if n == VAR_AG_NPP.name => fluxes.above_npp_carbon,
        n if n == VAR_BG_NPP.name => fluxes.below_npp_carbon,
        n if n == VAR_HETEROTROPHIC_RESPIRATION.name => fluxes.heterotrophic_respiration,
        n if n == VAR_NEE.name => fluxes.net_ecosystem_exchange,
        n if n == VAR_N_DEPOSITION.name => fluxes.n_deposition,
        n if n == VAR_N_VOLATILIZATION.name => fluxes.n_volatilization,
        n if n == VAR_N_LEACHED.name => fluxes.mineral_n_leached,
        n if n == VAR_ORGANIC_C_LEACHED.name => fluxes.organic_carbon_leached,
        n if n == VAR_GROSS_MINERALIZATION.name => fluxes.gross_mineralization,
        n if n == VAR_BASE_FLOW.name => fluxes.base_flow,
        n if n == VAR_STORM_FLOW.name => fluxes.storm_flow,
        n if n == VAR_TRANSPIRATION.name => fluxes.transpiration,
        n if n == VAR_EVAPORATION.name => fluxes.evaporation,
        _ => return None,
    };
    Some(value)
}
