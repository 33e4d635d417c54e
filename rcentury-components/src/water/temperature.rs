//! Soil surface temperature.
//!
//! Average of a maximum and a minimum surface temperature estimate, both
//! damped by the biomass shading the soil (capped at 600 g/m²):
//!
//! $$T_{max} = t_{max} + \frac{25.4}{1 + 18 e^{-0.2 t_{max}}}\left(e^{-0.0048 B} - 0.13\right)$$
//! $$T_{min} = t_{min} + 0.004 B - 1.78$$

use rcentury_core::constants::MAX_SOIL_TEMPERATURE_BIOMASS;
use rcentury_core::FloatValue;

/// Mean soil surface temperature (°C) for a month.
pub fn soil_temperature(
    min_temperature: FloatValue,
    max_temperature: FloatValue,
    shading_biomass: FloatValue,
) -> FloatValue {
    let biomass = shading_biomass.clamp(0.0, MAX_SOIL_TEMPERATURE_BIOMASS);

    let max_surface = max_temperature
        + (25.4 / (1.0 + 18.0 * (-0.2 * max_temperature).exp()))
            * ((-0.0048 * biomass).exp() - 0.13);
    let min_surface = min_temperature + 0.004 * biomass - 1.78;

    (max_surface + min_surface) / 2.0
}
