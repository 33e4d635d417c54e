//! Litter decomposition.
//!
//! Structural litter decays at a rate suppressed by its lignin content,
//! $$F = \min(C, C_{max}) \cdot d \cdot k \cdot e^{-3 L} \cdot a \cdot \Delta t$$
//! with the lignin share flowing to SOM2 and the rest to SOM1 of the same
//! layer. Metabolic litter decays to SOM1 only. Soil pools are additionally
//! slowed by the anaerobic effect.

use super::layer::{
    aboveground_ratio, belowground_ratio, decomposition_possible, monthly_outflow, respire,
    transfer,
};
use crate::pipeline::StageEnvironment;
use rcentury_core::constants::MIN_DECOMPOSABLE_CARBON;
use rcentury_core::errors::CenturyResult;
use rcentury_core::pool::{Layer, PoolKind};
use rcentury_core::soil::SoilState;
use rcentury_core::FloatValue;

pub fn decompose_structural(
    env: &StageEnvironment,
    state: &mut SoilState,
    layer: Layer,
) -> CenturyResult<()> {
    let params = env.parameters;
    let source = PoolKind::structural(layer);
    let pool = *state.pool(source);
    if pool.carbon <= MIN_DECOMPOSABLE_CARBON {
        return Ok(());
    }

    let lignin_effect = (-params.lignin_decay_effect * pool.lignin_fraction).exp();
    let decomposable = pool.carbon.min(params.max_structural_carbon);
    let total = monthly_outflow(
        decomposable,
        state.water.decay_factor,
        pool.decay_rate,
        lignin_effect * anaerobic_modifier(state, layer),
        params.month_adjust,
    );
    decompose_lignin(env, state, source, layer, total)
}

pub fn decompose_metabolic(
    env: &StageEnvironment,
    state: &mut SoilState,
    layer: Layer,
) -> CenturyResult<()> {
    let params = env.parameters;
    let source = PoolKind::metabolic(layer);
    let pool = *state.pool(source);
    if pool.carbon <= MIN_DECOMPOSABLE_CARBON {
        return Ok(());
    }

    let total = monthly_outflow(
        pool.carbon,
        state.water.decay_factor,
        pool.decay_rate,
        anaerobic_modifier(state, layer),
        params.month_adjust,
    );
    let (target_cn, co2_fraction) = match layer {
        Layer::Surface => (
            aboveground_ratio(&pool, &params.surface_som1_cn),
            params.metabolic_co2_surface,
        ),
        Layer::Soil => (
            belowground_ratio(state.mineral_n, &params.som1_entry_cn),
            params.metabolic_co2_soil,
        ),
    };
    if total <= 0.0 || !decomposition_possible(state.mineral_n, &pool, target_cn) {
        return Ok(());
    }

    let co2 = respire(state, source, total * co2_fraction)?;
    transfer(state, source, PoolKind::som1(layer), total - co2, target_cn)?;
    Ok(())
}

/// Split lignin-bearing material between SOM2 (lignin) and SOM1 (the rest).
///
/// Used by structural litter and dead wood.
pub(crate) fn decompose_lignin(
    env: &StageEnvironment,
    state: &mut SoilState,
    source: PoolKind,
    layer: Layer,
    total: FloatValue,
) -> CenturyResult<()> {
    if total <= 0.0 {
        return Ok(());
    }
    let params = env.parameters;
    let pool = *state.pool(source);
    let to_som2 = total * pool.lignin_fraction;
    let to_som1 = total - to_som2;

    let (som1_cn, som2_cn, som1_co2) = match layer {
        Layer::Surface => (
            aboveground_ratio(&pool, &params.surface_som1_cn),
            aboveground_ratio(&pool, &params.surface_som2_cn),
            params.structural_co2_surface,
        ),
        Layer::Soil => (
            belowground_ratio(state.mineral_n, &params.som1_entry_cn),
            belowground_ratio(state.mineral_n, &params.som2_entry_cn),
            params.structural_co2_soil,
        ),
    };

    if to_som2 > 0.0 && decomposition_possible(state.mineral_n, state.pool(source), som2_cn) {
        let co2 = respire(state, source, to_som2 * params.lignin_respiration_fraction)?;
        transfer(state, source, PoolKind::Som2, to_som2 - co2, som2_cn)?;
    }
    if to_som1 > 0.0 && decomposition_possible(state.mineral_n, state.pool(source), som1_cn) {
        let co2 = respire(state, source, to_som1 * som1_co2)?;
        transfer(state, source, PoolKind::som1(layer), to_som1 - co2, som1_cn)?;
    }
    Ok(())
}

pub(crate) fn anaerobic_modifier(state: &SoilState, layer: Layer) -> FloatValue {
    match layer {
        Layer::Surface => 1.0,
        Layer::Soil => state.water.anaerobic_effect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rcentury_core::ecoregion::EcoregionParameters;
    use rcentury_core::parameters::CenturyParameters;
    use rcentury_core::pool::Pool;
    use rcentury_core::soil::InitialConditions;

    fn setup() -> (CenturyParameters, EcoregionParameters, SoilState) {
        let params = CenturyParameters::default();
        let eco = EcoregionParameters::default();
        let mut state = SoilState::new(&InitialConditions::empty(), &eco, &params).unwrap();
        state.water.decay_factor = 1.0;
        state.water.anaerobic_effect = 1.0;
        state.mineral_n = 5.0;
        (params, eco, state)
    }

    #[test]
    fn test_metabolic_litter_feeds_som1() {
        let (params, eco, mut state) = setup();
        let env = StageEnvironment::new(&params, &eco);
        state.pool_mut(PoolKind::SurfaceMetabolic).carbon = 120.0;
        state.pool_mut(PoolKind::SurfaceMetabolic).nitrogen = 6.0;

        decompose_metabolic(&env, &mut state, Layer::Surface).unwrap();

        // 120 * 14.8 / 12 exceeds the pool, so everything decomposes
        assert_relative_eq!(state.pool(PoolKind::SurfaceMetabolic).carbon, 0.0);
        assert_relative_eq!(state.ledger.respired_carbon, 120.0 * 0.55);
        assert_relative_eq!(
            state.pool(PoolKind::Som1Surface).carbon,
            120.0 * 0.45,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_lignin_goes_to_som2() {
        let (params, eco, mut state) = setup();
        let env = StageEnvironment::new(&params, &eco);
        {
            let pool = state.pool_mut(PoolKind::SoilStructural);
            pool.carbon = 600.0;
            pool.nitrogen = 3.0;
            pool.lignin_fraction = 0.25;
        }
        decompose_structural(&env, &mut state, Layer::Soil).unwrap();

        let total = 600.0 * 4.9 * (-0.75f64).exp() / 12.0;
        assert_relative_eq!(
            state.pool(PoolKind::Som2).carbon,
            total * 0.25 * 0.7,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            state.pool(PoolKind::Som1Soil).carbon,
            total * 0.75 * 0.45,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            state.pool(PoolKind::SoilStructural).carbon,
            600.0 - total,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_nothing_decomposes_without_nitrogen() {
        let (params, eco, mut state) = setup();
        let env = StageEnvironment::new(&params, &eco);
        state.mineral_n = 0.0;
        *state.pool_mut(PoolKind::SoilMetabolic) = Pool {
            carbon: 50.0,
            nitrogen: 0.0,
            decay_rate: 18.5,
            lignin_fraction: 0.0,
        };
        decompose_metabolic(&env, &mut state, Layer::Soil).unwrap();
        assert_eq!(state.pool(PoolKind::SoilMetabolic).carbon, 50.0);
    }

    #[test]
    fn test_anaerobic_conditions_slow_soil_litter() {
        let (params, eco, mut state) = setup();
        let env = StageEnvironment::new(&params, &eco);
        state.pool_mut(PoolKind::SoilStructural).carbon = 600.0;
        state.pool_mut(PoolKind::SoilStructural).nitrogen = 3.0;
        let mut wet = state.clone();
        wet.water.anaerobic_effect = 0.3;

        decompose_structural(&env, &mut state, Layer::Soil).unwrap();
        decompose_structural(&env, &mut wet, Layer::Soil).unwrap();
        assert!(
            wet.pool(PoolKind::SoilStructural).carbon > state.pool(PoolKind::SoilStructural).carbon
        );
    }
}
