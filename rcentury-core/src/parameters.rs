//! CENTURY Parameters
//!
//! Global physical constants of the soil engine and the run configuration that
//! wraps them. Defaults follow the CENTURY fixed-parameter file; every value can
//! be overridden from TOML, missing keys keep their defaults.
//!
//! # Decomposition rate modifier
//!
//! The monthly decay of every pool is scaled by
//! $$f = T(t_{soil}) \times W(\theta)$$
//! with $T(t) = a + b\,e^{c\,t}$ and $W$ one of two logistic moisture curves
//! selected by [`WaterDecayFunction`].

use crate::context::MonthOrder;
use crate::ecoregion::check_fraction;
use crate::errors::{CenturyError, CenturyResult};
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Moisture metric driving the water term of the decay factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WaterDecayFunction {
    /// Logistic curve of the relative water content of the profile
    Linear,
    /// Logistic curve of the (available water + precipitation) / PET ratio
    #[default]
    Ratio,
}

/// Limits on the C:N ratio of material entering a pool.
///
/// The target ratio moves linearly from `max_cn` (no nitrogen available) to
/// `min_cn` (nitrogen indicator at or above `n_threshold`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CnRatioBounds {
    /// C:N of new material when nitrogen is scarce
    pub max_cn: FloatValue,
    /// C:N of new material when nitrogen is plentiful
    pub min_cn: FloatValue,
    /// Nitrogen indicator above which `min_cn` applies
    pub n_threshold: FloatValue,
}

impl CnRatioBounds {
    pub const fn new(max_cn: FloatValue, min_cn: FloatValue, n_threshold: FloatValue) -> Self {
        Self {
            max_cn,
            min_cn,
            n_threshold,
        }
    }

    /// Target C:N for a given nitrogen indicator.
    pub fn ratio_for(&self, n_indicator: FloatValue) -> FloatValue {
        if n_indicator <= 0.0 {
            self.max_cn
        } else if n_indicator > self.n_threshold {
            self.min_cn
        } else {
            self.max_cn - (self.max_cn - self.min_cn) * n_indicator / self.n_threshold
        }
    }

    fn validate(&self, parameter: &str) -> CenturyResult<()> {
        if !(self.min_cn > 0.0 && self.max_cn >= self.min_cn) {
            return Err(CenturyError::invalid_parameter(
                parameter,
                format!(
                    "requires 0 < min_cn <= max_cn, got min {} max {}",
                    self.min_cn, self.max_cn
                ),
            ));
        }
        if !(self.n_threshold > 0.0 && self.n_threshold.is_finite()) {
            return Err(CenturyError::invalid_parameter(
                parameter,
                format!("n_threshold must be positive, got {}", self.n_threshold),
            ));
        }
        Ok(())
    }
}

/// Physical constants of the soil water, decomposition and leaching equations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenturyParameters {
    // -- Decay factor --
    /// Intercept of the temperature decomposition curve
    /// unit: dimensionless
    /// default: 0.0
    pub temperature_intercept: FloatValue,

    /// Multiplier of the temperature decomposition curve
    /// unit: dimensionless
    /// default: 0.125
    pub temperature_slope: FloatValue,

    /// Exponent of the temperature decomposition curve
    /// unit: °C⁻¹
    /// default: 0.07
    pub temperature_exponent: FloatValue,

    /// Moisture metric of the decay factor
    /// default: Ratio
    pub water_decay_function: WaterDecayFunction,

    /// Converts annual decay rates to a monthly step
    /// unit: yr
    /// default: 1/12
    pub month_adjust: FloatValue,

    // -- Anaerobic effect --
    /// Precipitation/PET ratio above which anaerobic conditions start
    /// default: 1.5
    pub anaerobic_ratio_threshold: FloatValue,

    /// Precipitation/PET ratio at which the anaerobic effect reaches its floor
    /// default: 3.0
    pub anaerobic_ratio_maximum: FloatValue,

    /// Smallest anaerobic multiplier
    /// default: 0.3
    pub anaerobic_floor: FloatValue,

    /// Strength of anaerobic conditions on flows to the passive pool
    /// default: 5.0
    pub anaerobic_impact_slope: FloatValue,

    // -- Litter --
    /// Decay rate of surface structural litter
    /// unit: yr⁻¹
    /// default: 3.9
    pub decay_rate_structural_surface: FloatValue,

    /// Decay rate of soil structural litter
    /// unit: yr⁻¹
    /// default: 4.9
    pub decay_rate_structural_soil: FloatValue,

    /// Decay rate of surface metabolic litter
    /// unit: yr⁻¹
    /// default: 14.8
    pub decay_rate_metabolic_surface: FloatValue,

    /// Decay rate of soil metabolic litter
    /// unit: yr⁻¹
    /// default: 18.5
    pub decay_rate_metabolic_soil: FloatValue,

    /// Structural carbon above which decay no longer scales with pool size
    /// unit: g C/m²
    /// default: 5000.0
    pub max_structural_carbon: FloatValue,

    /// Exponential suppression of structural decay by lignin
    /// default: 3.0
    pub lignin_decay_effect: FloatValue,

    /// CO2 fraction of lignin carbon moving to SOM2
    /// default: 0.3
    pub lignin_respiration_fraction: FloatValue,

    /// CO2 fraction of surface structural carbon moving to SOM1
    /// default: 0.6
    pub structural_co2_surface: FloatValue,

    /// CO2 fraction of soil structural carbon moving to SOM1
    /// default: 0.55
    pub structural_co2_soil: FloatValue,

    /// CO2 fraction of surface metabolic decomposition
    /// default: 0.55
    pub metabolic_co2_surface: FloatValue,

    /// CO2 fraction of soil metabolic decomposition
    /// default: 0.55
    pub metabolic_co2_soil: FloatValue,

    // -- Dead wood --
    /// Decay rate of surface dead wood
    /// unit: yr⁻¹
    /// default: 0.5
    pub decay_rate_surface_wood: FloatValue,

    /// Decay rate of dead coarse roots
    /// unit: yr⁻¹
    /// default: 0.6
    pub decay_rate_soil_wood: FloatValue,

    /// Lignin fraction of dead wood
    /// default: 0.25
    pub wood_lignin_fraction: FloatValue,

    /// Lignin fraction of dead coarse roots
    /// default: 0.25
    pub coarse_root_lignin_fraction: FloatValue,

    // -- Soil organic matter --
    /// CO2 fraction of surface microbe decomposition
    /// default: 0.6
    pub som1_surface_co2: FloatValue,

    /// Intercept of the soil microbe CO2 fraction against sand
    /// default: 0.17
    pub som1_soil_co2_intercept: FloatValue,

    /// Slope of the soil microbe CO2 fraction against sand
    /// default: 0.68
    pub som1_soil_co2_slope: FloatValue,

    /// Intercept of the texture effect on soil microbe turnover
    /// default: 0.25
    pub texture_effect_intercept: FloatValue,

    /// Slope of the texture effect on soil microbe turnover against sand
    /// default: 0.75
    pub texture_effect_slope: FloatValue,

    /// Intercept of the SOM1 to SOM3 flow fraction against clay
    /// default: 0.003
    pub som1_to_som3_intercept: FloatValue,

    /// Slope of the SOM1 to SOM3 flow fraction against clay
    /// default: 0.032
    pub som1_to_som3_slope: FloatValue,

    /// Intercept of the SOM2 to SOM3 flow fraction against clay
    /// default: 0.003
    pub som2_to_som3_intercept: FloatValue,

    /// Slope of the SOM2 to SOM3 flow fraction against clay
    /// default: 0.009
    pub som2_to_som3_slope: FloatValue,

    /// CO2 fraction of SOM2 decomposition
    /// default: 0.55
    pub som2_co2: FloatValue,

    /// CO2 fraction of SOM3 decomposition
    /// default: 0.55
    pub som3_co2: FloatValue,

    /// Intercept of organic leaching against sand
    /// default: 0.03
    pub organic_leach_intercept: FloatValue,

    /// Slope of organic leaching against sand
    /// default: 0.12
    pub organic_leach_slope: FloatValue,

    // -- C:N of new material --
    /// Target C:N entering surface microbes (indicator: N content of the material)
    pub surface_som1_cn: CnRatioBounds,

    /// Target C:N of surface lignin entering SOM2 (indicator: N content of the material)
    pub surface_som2_cn: CnRatioBounds,

    /// Target C:N entering soil microbes (indicator: mineral N, g N/m²)
    pub som1_entry_cn: CnRatioBounds,

    /// Target C:N entering SOM2 (indicator: mineral N, g N/m²)
    pub som2_entry_cn: CnRatioBounds,

    /// Target C:N entering SOM3 (indicator: mineral N, g N/m²)
    pub som3_entry_cn: CnRatioBounds,

    // -- Mineral leaching --
    /// Intercept of the leached fraction of mineral N against sand
    /// default: 0.2
    pub mineral_leach_intercept: FloatValue,

    /// Slope of the leached fraction of mineral N against sand
    /// default: 0.7
    pub mineral_leach_slope: FloatValue,

    /// Fraction of mineral N present as nitrate (only nitrate leaches)
    /// default: 0.5
    pub nitrate_fraction: FloatValue,

    /// Water outflow at which leaching reaches full intensity
    /// unit: cm month⁻¹
    /// default: 18.0
    pub critical_leach_flow: FloatValue,

    // -- Snow and surface water --
    /// Mean air temperature above which snow melts
    /// unit: °C
    /// default: 0.0
    pub snow_melt_threshold: FloatValue,

    /// Snow melted per degree above the threshold
    /// unit: cm °C⁻¹ month⁻¹
    /// default: 4.0
    pub snow_melt_rate: FloatValue,

    /// Scales canopy and litter interception
    /// default: 1.0
    pub interception_scale: FloatValue,

    /// Scales bare-soil evaporation
    /// default: 1.0
    pub bare_soil_evaporation_scale: FloatValue,
}

impl Default for CenturyParameters {
    fn default() -> Self {
        Self {
            temperature_intercept: 0.0,
            temperature_slope: 0.125,
            temperature_exponent: 0.07,
            water_decay_function: WaterDecayFunction::Ratio,
            month_adjust: 1.0 / 12.0,

            anaerobic_ratio_threshold: 1.5,
            anaerobic_ratio_maximum: 3.0,
            anaerobic_floor: 0.3,
            anaerobic_impact_slope: 5.0,

            decay_rate_structural_surface: 3.9,
            decay_rate_structural_soil: 4.9,
            decay_rate_metabolic_surface: 14.8,
            decay_rate_metabolic_soil: 18.5,
            max_structural_carbon: 5000.0,
            lignin_decay_effect: 3.0,
            lignin_respiration_fraction: 0.3,
            structural_co2_surface: 0.6,
            structural_co2_soil: 0.55,
            metabolic_co2_surface: 0.55,
            metabolic_co2_soil: 0.55,

            decay_rate_surface_wood: 0.5,
            decay_rate_soil_wood: 0.6,
            wood_lignin_fraction: 0.25,
            coarse_root_lignin_fraction: 0.25,

            som1_surface_co2: 0.6,
            som1_soil_co2_intercept: 0.17,
            som1_soil_co2_slope: 0.68,
            texture_effect_intercept: 0.25,
            texture_effect_slope: 0.75,
            som1_to_som3_intercept: 0.003,
            som1_to_som3_slope: 0.032,
            som2_to_som3_intercept: 0.003,
            som2_to_som3_slope: 0.009,
            som2_co2: 0.55,
            som3_co2: 0.55,
            organic_leach_intercept: 0.03,
            organic_leach_slope: 0.12,

            surface_som1_cn: CnRatioBounds::new(20.0, 10.0, 0.02),
            surface_som2_cn: CnRatioBounds::new(40.0, 15.0, 0.02),
            som1_entry_cn: CnRatioBounds::new(18.0, 8.0, 2.0),
            som2_entry_cn: CnRatioBounds::new(40.0, 12.0, 2.0),
            som3_entry_cn: CnRatioBounds::new(20.0, 6.0, 2.0),

            mineral_leach_intercept: 0.2,
            mineral_leach_slope: 0.7,
            nitrate_fraction: 0.5,
            critical_leach_flow: 18.0,

            snow_melt_threshold: 0.0,
            snow_melt_rate: 4.0,
            interception_scale: 1.0,
            bare_soil_evaporation_scale: 1.0,
        }
    }
}

impl CenturyParameters {
    /// Fraction of soil microbe turnover respired, a function of sand content.
    pub fn som1_soil_co2(&self, sand: FloatValue) -> FloatValue {
        self.som1_soil_co2_intercept + self.som1_soil_co2_slope * sand
    }

    /// Texture multiplier on soil microbe turnover.
    pub fn texture_effect(&self, sand: FloatValue) -> FloatValue {
        self.texture_effect_intercept + self.texture_effect_slope * sand
    }

    /// Share of soil microbe turnover stabilised in SOM3 before anaerobic effects.
    pub fn som1_to_som3_fraction(&self, clay: FloatValue) -> FloatValue {
        self.som1_to_som3_intercept + self.som1_to_som3_slope * clay
    }

    /// Share of SOM2 turnover stabilised in SOM3 before anaerobic effects.
    pub fn som2_to_som3_fraction(&self, clay: FloatValue) -> FloatValue {
        self.som2_to_som3_intercept + self.som2_to_som3_slope * clay
    }

    /// Multiplier of flows into SOM3 under anaerobic conditions.
    pub fn anaerobic_stabilisation(&self, anaerobic_effect: FloatValue) -> FloatValue {
        1.0 + self.anaerobic_impact_slope * (1.0 - anaerobic_effect)
    }

    /// Texture multiplier of organic leaching.
    pub fn organic_leach_effect(&self, sand: FloatValue) -> FloatValue {
        self.organic_leach_intercept + self.organic_leach_slope * sand
    }

    /// Texture multiplier of mineral N leaching.
    pub fn mineral_leach_effect(&self, sand: FloatValue) -> FloatValue {
        self.mineral_leach_intercept + self.mineral_leach_slope * sand
    }

    /// Check every constant is physically meaningful.
    pub fn validate(&self) -> CenturyResult<()> {
        if !(self.month_adjust > 0.0 && self.month_adjust <= 1.0) {
            return Err(CenturyError::invalid_parameter(
                "month_adjust",
                format!("must be within (0, 1], got {}", self.month_adjust),
            ));
        }
        if !(self.temperature_slope.is_finite()
            && self.temperature_intercept.is_finite()
            && self.temperature_exponent.is_finite())
        {
            return Err(CenturyError::invalid_parameter(
                "temperature_slope",
                "temperature decomposition curve must be finite",
            ));
        }
        if self.anaerobic_ratio_threshold >= self.anaerobic_ratio_maximum {
            return Err(CenturyError::invalid_parameter(
                "anaerobic_ratio_threshold",
                format!(
                    "must be below anaerobic_ratio_maximum ({} >= {})",
                    self.anaerobic_ratio_threshold, self.anaerobic_ratio_maximum
                ),
            ));
        }
        if !(self.anaerobic_floor > 0.0 && self.anaerobic_floor <= 1.0) {
            return Err(CenturyError::invalid_parameter(
                "anaerobic_floor",
                format!("must be within (0, 1], got {}", self.anaerobic_floor),
            ));
        }
        for (field, value) in [
            ("anaerobic_impact_slope", self.anaerobic_impact_slope),
            ("decay_rate_structural_surface", self.decay_rate_structural_surface),
            ("decay_rate_structural_soil", self.decay_rate_structural_soil),
            ("decay_rate_metabolic_surface", self.decay_rate_metabolic_surface),
            ("decay_rate_metabolic_soil", self.decay_rate_metabolic_soil),
            ("decay_rate_surface_wood", self.decay_rate_surface_wood),
            ("decay_rate_soil_wood", self.decay_rate_soil_wood),
            ("max_structural_carbon", self.max_structural_carbon),
            ("lignin_decay_effect", self.lignin_decay_effect),
            ("critical_leach_flow", self.critical_leach_flow),
            ("snow_melt_rate", self.snow_melt_rate),
            ("interception_scale", self.interception_scale),
            ("bare_soil_evaporation_scale", self.bare_soil_evaporation_scale),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CenturyError::invalid_parameter(
                    field,
                    format!("must be non-negative, got {}", value),
                ));
            }
        }
        if self.critical_leach_flow <= 0.0 {
            return Err(CenturyError::invalid_parameter(
                "critical_leach_flow",
                "must be positive",
            ));
        }
        for (field, value) in [
            ("lignin_respiration_fraction", self.lignin_respiration_fraction),
            ("structural_co2_surface", self.structural_co2_surface),
            ("structural_co2_soil", self.structural_co2_soil),
            ("metabolic_co2_surface", self.metabolic_co2_surface),
            ("metabolic_co2_soil", self.metabolic_co2_soil),
            ("wood_lignin_fraction", self.wood_lignin_fraction),
            ("coarse_root_lignin_fraction", self.coarse_root_lignin_fraction),
            ("som1_surface_co2", self.som1_surface_co2),
            ("som2_co2", self.som2_co2),
            ("som3_co2", self.som3_co2),
            ("nitrate_fraction", self.nitrate_fraction),
        ] {
            check_fraction(field, value)?;
        }
        // Texture-driven fractions must stay fractions across the full texture range.
        for (field, intercept, slope) in [
            (
                "som1_soil_co2_intercept",
                self.som1_soil_co2_intercept,
                self.som1_soil_co2_slope,
            ),
            (
                "som1_to_som3_intercept",
                self.som1_to_som3_intercept,
                self.som1_to_som3_slope,
            ),
            (
                "som2_to_som3_intercept",
                self.som2_to_som3_intercept,
                self.som2_to_som3_slope,
            ),
            (
                "organic_leach_intercept",
                self.organic_leach_intercept,
                self.organic_leach_slope,
            ),
            (
                "mineral_leach_intercept",
                self.mineral_leach_intercept,
                self.mineral_leach_slope,
            ),
        ] {
            check_fraction(field, intercept)?;
            check_fraction(field, intercept + slope)?;
        }
        if self.texture_effect_intercept < 0.0
            || self.texture_effect_intercept + self.texture_effect_slope < 0.0
        {
            return Err(CenturyError::invalid_parameter(
                "texture_effect_intercept",
                "texture effect must be non-negative for any sand content",
            ));
        }
        self.surface_som1_cn.validate("surface_som1_cn")?;
        self.surface_som2_cn.validate("surface_som2_cn")?;
        self.som1_entry_cn.validate("som1_entry_cn")?;
        self.som2_entry_cn.validate("som2_entry_cn")?;
        self.som3_entry_cn.validate("som3_entry_cn")?;
        Ok(())
    }
}

/// Parameters plus the run-control options of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    pub parameters: CenturyParameters,

    /// Process months January to December instead of July to June
    /// default: false
    pub calibrate_mode: bool,

    /// Calendar month (0 = January) at which cohort allocation weights are rebuilt
    /// default: 6 (July, the first month of a shifted year)
    pub allocation_month: usize,

    /// Calendar month (0 = January) at which resorbed nitrogen is reset
    /// default: 0 (January)
    pub resorption_reset_month: usize,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            parameters: CenturyParameters::default(),
            calibrate_mode: false,
            allocation_month: 6,
            resorption_reset_month: 0,
        }
    }
}

impl RunConfiguration {
    /// Parse a configuration from TOML text. The result is validated.
    pub fn from_toml_str(text: &str) -> CenturyResult<Self> {
        let configuration: RunConfiguration = toml::from_str(text)?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Read and parse a TOML configuration file. The result is validated.
    pub fn from_toml_file(path: impl AsRef<Path>) -> CenturyResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        log::info!("Loading CENTURY configuration from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Serialise the configuration to TOML.
    pub fn to_toml_string(&self) -> CenturyResult<String> {
        toml::to_string(self).map_err(|e| CenturyError::Error(e.to_string()))
    }

    pub fn month_order(&self) -> MonthOrder {
        MonthOrder::from_calibrate_mode(self.calibrate_mode)
    }

    pub fn validate(&self) -> CenturyResult<()> {
        self.parameters.validate()?;
        for (field, month) in [
            ("allocation_month", self.allocation_month),
            ("resorption_reset_month", self.resorption_reset_month),
        ] {
            if month >= crate::constants::MONTHS_PER_YEAR {
                return Err(CenturyError::invalid_parameter(
                    field,
                    format!("must be a calendar month index 0-11, got {}", month),
                ));
            }
        }
        Ok(())
    }
}
