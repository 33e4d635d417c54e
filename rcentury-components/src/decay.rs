//! Decomposition Rate Modifiers
//!
//! Monthly decay of every pool is scaled by a temperature × moisture factor and,
//! for soil pools, by an anaerobic multiplier.
//!
//! # Temperature
//!
//! $$T(t) = a + b\,e^{c\,t}$$
//!
//! # Moisture
//!
//! *Linear* mode: $W = 1 / (1 + 4 e^{-6\,rwc})$, *Ratio* mode:
//! $W = 1 / (1 + 30 e^{-8.5\,r})$ with $r$ the (available water +
//! precipitation) / PET ratio. Both saturate to 1 above a fixed value.
//!
//! # Anaerobic effect
//!
//! Above a precipitation/PET threshold $t_1$ and with mean air temperature
//! above 2 °C, the effect decreases linearly from 1 towards a floor reached at
//! $t_2$. Drainage moves the effective ratio back towards $t_1$.

use rcentury_core::constants::{
    LINEAR_WATER_SATURATION, MIN_ANAEROBIC_TEMPERATURE, RATIO_WATER_SATURATION,
};
use rcentury_core::parameters::{CenturyParameters, WaterDecayFunction};
use rcentury_core::FloatValue;

/// Temperature term of the decay factor.
pub fn temperature_decomposition(
    parameters: &CenturyParameters,
    soil_temperature: FloatValue,
) -> FloatValue {
    parameters.temperature_intercept
        + parameters.temperature_slope * (parameters.temperature_exponent * soil_temperature).exp()
}

/// Moisture term of the decay factor.
///
/// `relative_water_content` is used in [`WaterDecayFunction::Linear`] mode and
/// `precipitation_pet_ratio` in [`WaterDecayFunction::Ratio`] mode.
pub fn water_decomposition(
    mode: WaterDecayFunction,
    relative_water_content: FloatValue,
    precipitation_pet_ratio: FloatValue,
) -> FloatValue {
    match mode {
        WaterDecayFunction::Linear => {
            if relative_water_content > LINEAR_WATER_SATURATION {
                1.0
            } else {
                1.0 / (1.0 + 4.0 * (-6.0 * relative_water_content).exp())
            }
        }
        WaterDecayFunction::Ratio => {
            if precipitation_pet_ratio > RATIO_WATER_SATURATION {
                1.0
            } else {
                1.0 / (1.0 + 30.0 * (-8.5 * precipitation_pet_ratio).exp())
            }
        }
    }
}

/// Combined temperature × moisture multiplier, never negative.
pub fn decay_factor(
    parameters: &CenturyParameters,
    soil_temperature: FloatValue,
    relative_water_content: FloatValue,
    precipitation_pet_ratio: FloatValue,
) -> FloatValue {
    let temperature = temperature_decomposition(parameters, soil_temperature);
    let water = water_decomposition(
        parameters.water_decay_function,
        relative_water_content,
        precipitation_pet_ratio,
    );
    (temperature * water).max(0.0)
}

/// Anaerobic multiplier, within `[anaerobic_floor, 1]`.
pub fn anaerobic_effect(
    parameters: &CenturyParameters,
    drain: FloatValue,
    precipitation_pet_ratio: FloatValue,
    mean_temperature: FloatValue,
) -> FloatValue {
    let threshold = parameters.anaerobic_ratio_threshold;
    let floor = parameters.anaerobic_floor;

    if precipitation_pet_ratio <= threshold || mean_temperature <= MIN_ANAEROBIC_TEMPERATURE {
        return 1.0;
    }

    let effective_ratio = threshold + (precipitation_pet_ratio - threshold) * (1.0 - drain);
    let slope = (1.0 - floor) / (threshold - parameters.anaerobic_ratio_maximum);
    (1.0 + slope * (effective_ratio - threshold)).clamp(floor, 1.0)
}
