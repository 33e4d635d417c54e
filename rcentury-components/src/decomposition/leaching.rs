//! Mineral nitrogen losses: volatilization and leaching.

use crate::pipeline::StageEnvironment;
use rcentury_core::errors::{CenturyError, CenturyResult};
use rcentury_core::soil::SoilState;
use rcentury_core::FloatValue;

/// Gaseous loss of a fixed fraction of positive mineral N.
///
/// Returns the nitrogen volatilized.
pub fn volatilize(env: &StageEnvironment, state: &mut SoilState) -> CenturyResult<FloatValue> {
    if state.mineral_n <= 0.0 {
        return Ok(0.0);
    }
    let loss = state.mineral_n * env.ecoregion.denitrification;
    state.mineral_n -= loss;
    state.ledger.volatilized_nitrogen += loss;
    state.fluxes_mut().n_volatilization += loss;
    Ok(loss)
}

/// Nitrate leached with drainage water.
///
/// $$L = N_{min} \cdot (a + b\,s) \cdot f_{NO_3} \cdot \min\left(1, \frac{Q_{base} + Q_{storm}}{Q_{crit}}\right)$$
///
/// Nothing leaches in months without drainage past field capacity.
/// Returns the nitrogen leached.
pub fn leach_mineral_nitrogen(
    env: &StageEnvironment,
    state: &mut SoilState,
) -> CenturyResult<FloatValue> {
    if state.water.water_movement <= 0.0 || state.mineral_n <= 0.0 {
        return Ok(0.0);
    }
    let params = env.parameters;
    let flow = env.base_flow + env.storm_flow;
    let intensity = (flow / params.critical_leach_flow).min(1.0).max(0.0);
    let leached = state.mineral_n
        * params.mineral_leach_effect(env.ecoregion.percent_sand)
        * params.nitrate_fraction
        * intensity;

    if leached > state.mineral_n {
        return Err(CenturyError::FluxExceedsPool {
            pool: "mineral N".to_string(),
            flux: "nitrate leaching",
            requested: leached,
            available: state.mineral_n,
        });
    }
    if leached <= 0.0 {
        return Ok(0.0);
    }

    state.mineral_n -= leached;
    state.stream.nitrogen += leached;
    state.fluxes_mut().mineral_n_leached += leached;
    Ok(leached)
}
