//! Ecoregion Parameters
//!
//! Static soil and site properties shared by every land unit of an ecoregion.
//! They are loaded once, validated, and read concurrently by all sites.

use crate::errors::{CenturyError, CenturyResult};
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Physical properties of one ecoregion class.
///
/// Texture and hydraulic properties are fractions (0-1), soil depth is in cm
/// and decay rates are annual rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcoregionParameters {
    /// Ecoregion name, used to look up its climate table
    pub name: String,

    /// Rooting depth of the soil profile
    /// unit: cm
    /// default: 100.0
    pub soil_depth: FloatValue,

    /// Volumetric water content at field capacity
    /// unit: fraction
    /// default: 0.3
    pub field_capacity: FloatValue,

    /// Volumetric water content at the wilting point
    /// unit: fraction
    /// default: 0.1
    pub wilting_point: FloatValue,

    /// Sand content of the mineral soil
    /// unit: fraction
    /// default: 0.5
    pub percent_sand: FloatValue,

    /// Clay content of the mineral soil
    /// unit: fraction
    /// default: 0.2
    pub percent_clay: FloatValue,

    /// Fraction of water moving past field capacity that leaves as storm flow
    /// unit: fraction
    /// default: 0.4
    pub storm_flow_fraction: FloatValue,

    /// Fraction of drained water that leaves as base flow
    /// unit: fraction
    /// default: 0.4
    pub base_flow_fraction: FloatValue,

    /// Soil drainage class, 1 = free draining, 0 = poorly drained
    /// unit: fraction
    /// default: 1.0
    pub drain: FloatValue,

    /// Decay rate of surface microbes (SOM1 surface)
    /// unit: yr⁻¹
    /// default: 6.0
    pub decay_rate_surface: FloatValue,

    /// Decay rate of soil microbes (SOM1 soil)
    /// unit: yr⁻¹
    /// default: 7.3
    pub decay_rate_som1: FloatValue,

    /// Decay rate of the slow pool (SOM2)
    /// unit: yr⁻¹
    /// default: 0.2
    pub decay_rate_som2: FloatValue,

    /// Decay rate of the passive pool (SOM3)
    /// unit: yr⁻¹
    /// default: 0.0045
    pub decay_rate_som3: FloatValue,

    /// Fraction of mineral N lost to volatilization each month
    /// unit: fraction month⁻¹
    /// default: 0.001
    pub denitrification: FloatValue,

    /// Latitude, consumed by day-length routines outside this engine
    /// unit: degrees north
    /// default: 45.0
    pub latitude: FloatValue,
}

impl Default for EcoregionParameters {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            soil_depth: 100.0,
            field_capacity: 0.3,
            wilting_point: 0.1,
            percent_sand: 0.5,
            percent_clay: 0.2,
            storm_flow_fraction: 0.4,
            base_flow_fraction: 0.4,
            drain: 1.0,
            decay_rate_surface: 6.0,
            decay_rate_som1: 7.3,
            decay_rate_som2: 0.2,
            decay_rate_som3: 0.0045,
            denitrification: 0.001,
            latitude: 45.0,
        }
    }
}

impl EcoregionParameters {
    /// Water held by the profile at field capacity (cm).
    pub fn water_full(&self) -> FloatValue {
        self.soil_depth * self.field_capacity
    }

    /// Water held by the profile at the wilting point (cm).
    pub fn water_empty(&self) -> FloatValue {
        self.soil_depth * self.wilting_point
    }

    /// Check every value is physically meaningful.
    pub fn validate(&self) -> CenturyResult<()> {
        let name = |field: &str| format!("{}.{}", self.name, field);

        if self.name.is_empty() {
            return Err(CenturyError::invalid_parameter("name", "must not be empty"));
        }
        if !(self.soil_depth.is_finite() && self.soil_depth > 0.0) {
            return Err(CenturyError::invalid_parameter(
                &name("soil_depth"),
                format!("must be positive, got {}", self.soil_depth),
            ));
        }
        for (field, value) in [
            ("field_capacity", self.field_capacity),
            ("wilting_point", self.wilting_point),
            ("percent_sand", self.percent_sand),
            ("percent_clay", self.percent_clay),
            ("storm_flow_fraction", self.storm_flow_fraction),
            ("base_flow_fraction", self.base_flow_fraction),
            ("drain", self.drain),
            ("denitrification", self.denitrification),
        ] {
            check_fraction(&name(field), value)?;
        }
        if self.field_capacity <= self.wilting_point {
            return Err(CenturyError::invalid_parameter(
                &name("field_capacity"),
                format!(
                    "must exceed the wilting point ({} <= {})",
                    self.field_capacity, self.wilting_point
                ),
            ));
        }
        if self.percent_sand + self.percent_clay > 1.0 {
            return Err(CenturyError::invalid_parameter(
                &name("percent_sand"),
                "sand and clay fractions sum to more than 1",
            ));
        }
        for (field, value) in [
            ("decay_rate_surface", self.decay_rate_surface),
            ("decay_rate_som1", self.decay_rate_som1),
            ("decay_rate_som2", self.decay_rate_som2),
            ("decay_rate_som3", self.decay_rate_som3),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CenturyError::invalid_parameter(
                    &name(field),
                    format!("must be a non-negative rate, got {}", value),
                ));
            }
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CenturyError::invalid_parameter(
                &name("latitude"),
                format!("must be within [-90, 90], got {}", self.latitude),
            ));
        }
        Ok(())
    }
}

pub(crate) fn check_fraction(parameter: &str, value: FloatValue) -> CenturyResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CenturyError::invalid_parameter(
            parameter,
            format!("must be a fraction within [0, 1], got {}", value),
        ))
    }
}
