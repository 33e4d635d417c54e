/// Fixed numerical values of the CENTURY soil engine.
///
/// Values that users may tune live in [`crate::parameters::CenturyParameters`];
/// the ones here are structural to the equations and are never configured.
use crate::FloatValue;

// -- Calendar --

/// Number of months simulated per year.
pub const MONTHS_PER_YEAR: usize = 12;

/// Month processing order for a normal run: July first, June last.
pub const SHIFTED_MONTH_ORDER: [usize; MONTHS_PER_YEAR] = [6, 7, 8, 9, 10, 11, 0, 1, 2, 3, 4, 5];

/// Month processing order in calibration mode.
pub const CALENDAR_MONTH_ORDER: [usize; MONTHS_PER_YEAR] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

// -- Unit conversions --

/// Biomass per unit of carbon used for litter and wood (g biomass / g C).
pub const BIOMASS_PER_CARBON: FloatValue = 2.0;

/// Carbon fraction of foliage used for nitrogen resorption (g C / g biomass).
pub const LEAF_CARBON_FRACTION: FloatValue = 0.47;

// -- Numerical safeguards --

/// Pools holding less carbon than this do not decompose.
pub const MIN_DECOMPOSABLE_CARBON: FloatValue = 0.0000001;

/// Mineral nitrogen at or below this is treated as exhausted.
pub const MIN_MINERAL_NITROGEN: FloatValue = 0.0000001;

/// Overshoot tolerated before a nitrogen flow is reported as exceeding its pool.
pub const NITROGEN_FLOW_TOLERANCE: FloatValue = 0.01;

/// Smallest potential evapotranspiration used as a denominator (cm).
pub const MIN_PET: FloatValue = 0.01;

// -- Snow --

/// Liquid water a snowpack holds, as a fraction of its snow mass.
pub const SNOW_LIQUID_HOLDING: FloatValue = 0.05;

/// Fraction of potential evapotranspiration energy available to sublimate snow.
pub const SNOW_EVAPORATION_ENERGY: FloatValue = 0.87;

// -- Surface losses --

/// Litter biomass ceiling for interception and bare-soil evaporation (g/m²).
pub const MAX_LITTER_BIOMASS: FloatValue = 400.0;

/// Standing biomass ceiling for interception and bare-soil evaporation (g/m²).
pub const MAX_STANDING_BIOMASS: FloatValue = 800.0;

/// Interception per g/m² of litter.
pub const LITTER_INTERCEPTION: FloatValue = 0.0003;

/// Interception per g/m² of standing biomass.
pub const STANDING_INTERCEPTION: FloatValue = 0.0006;

/// Bare-soil evaporation fraction with no cover.
pub const BARE_SOIL_EVAPORATION: FloatValue = 0.5;

/// Exponential cover effect of litter on bare-soil evaporation.
pub const LITTER_EVAPORATION_DECAY: FloatValue = 0.002;

/// Exponential cover effect of standing biomass on bare-soil evaporation.
pub const STANDING_EVAPORATION_DECAY: FloatValue = 0.004;

/// Share of remaining PET that interception and evaporation may use.
pub const SURFACE_LOSS_PET_FRACTION: FloatValue = 0.4;

// -- Transpiration --

/// Mean air temperature below which plants do not transpire (°C).
pub const MIN_TRANSPIRATION_TEMPERATURE: FloatValue = 2.0;

/// Share of remaining PET available to transpiration.
pub const TRANSPIRATION_PET_FRACTION: FloatValue = 0.65;

/// Saturation coefficient of transpiration with live biomass.
pub const TRANSPIRATION_BIOMASS_COEFFICIENT: FloatValue = 0.02;

/// Floor on the transpiration budget (cm), keeps later ratios finite.
pub const MIN_TRANSPIRATION: FloatValue = 0.01;

// -- Top-layer evaporation --

/// Relative water content at which top-layer evaporation starts.
pub const EVAPORATION_MOISTURE_THRESHOLD: FloatValue = 0.25;

/// Floor of the moisture gate on top-layer evaporation.
pub const MIN_EVAPORATION_MOISTURE: FloatValue = 0.01;

/// Share of the bare-soil fraction applied to top-layer potential evaporation.
pub const TOP_LAYER_EVAPORATION_SCALE: FloatValue = 0.10;

// -- Soil temperature --

/// Biomass ceiling for the soil temperature damping term (g/m²).
pub const MAX_SOIL_TEMPERATURE_BIOMASS: FloatValue = 600.0;

// -- Decomposition moisture curves --

/// Relative water content above which the linear moisture curve saturates.
pub const LINEAR_WATER_SATURATION: FloatValue = 13.0;

/// Precipitation/PET ratio above which the ratio moisture curve saturates.
pub const RATIO_WATER_SATURATION: FloatValue = 9.0;

/// Mean air temperature above which anaerobic conditions can develop (°C).
pub const MIN_ANAEROBIC_TEMPERATURE: FloatValue = 2.0;

// -- Nitrogen allocation --

/// Saturation coefficient of allocation weight with coarse root biomass.
pub const ALLOCATION_ROOT_COEFFICIENT: FloatValue = 0.02;

/// Share of wood biomass used as the weight of cohorts without coarse roots.
pub const MIN_ALLOCATION_WOOD_FRACTION: FloatValue = 0.01;

/// Mineral nitrogen always offered to cohorts, even from an exhausted pool (g N/m²).
pub const MIN_AVAILABLE_MINERAL_N: FloatValue = 0.01;

// -- Residue partitioning --

/// Intercept of the metabolic fraction of fresh residue.
pub const METABOLIC_FRACTION_INTERCEPT: FloatValue = 0.85;

/// Slope of the metabolic fraction against the lignin:N ratio.
pub const METABOLIC_FRACTION_SLOPE: FloatValue = 0.013;

/// Smallest metabolic fraction of fresh residue.
pub const MIN_METABOLIC_FRACTION: FloatValue = 0.20;

/// C:N of the structural share of fresh residue; remaining N goes to metabolic litter.
pub const STRUCTURAL_LITTER_CN: FloatValue = 200.0;
