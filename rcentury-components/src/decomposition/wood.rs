//! Dead wood decomposition.
//!
//! Standing/downed dead wood (surface) and dead coarse roots (soil) decay with
//! their own rates and the same lignin split as structural litter.

use super::layer::monthly_outflow;
use super::litter::{anaerobic_modifier, decompose_lignin};
use crate::pipeline::StageEnvironment;
use rcentury_core::constants::MIN_DECOMPOSABLE_CARBON;
use rcentury_core::errors::CenturyResult;
use rcentury_core::pool::{Layer, PoolKind};
use rcentury_core::soil::SoilState;

pub fn decompose_dead_wood(
    env: &StageEnvironment,
    state: &mut SoilState,
    layer: Layer,
) -> CenturyResult<()> {
    let params = env.parameters;
    let source = PoolKind::dead_wood(layer);
    let pool = *state.pool(source);
    if pool.carbon <= MIN_DECOMPOSABLE_CARBON {
        return Ok(());
    }

    let lignin_effect = (-params.lignin_decay_effect * pool.lignin_fraction).exp();
    let total = monthly_outflow(
        pool.carbon,
        state.water.decay_factor,
        pool.decay_rate,
        lignin_effect * anaerobic_modifier(state, layer),
        params.month_adjust,
    );
    decompose_lignin(env, state, source, layer, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rcentury_core::ecoregion::EcoregionParameters;
    use rcentury_core::parameters::CenturyParameters;
    use rcentury_core::soil::InitialConditions;

    #[test]
    fn test_wood_decays_slowly_and_conserves_mass() {
        let params = CenturyParameters::default();
        let eco = EcoregionParameters::default();
        let env = StageEnvironment::new(&params, &eco);
        let mut state = SoilState::new(&InitialConditions::default(), &eco, &params).unwrap();
        state.water.decay_factor = 0.8;
        state.water.anaerobic_effect = 1.0;

        let carbon = state.carbon_balance();
        let nitrogen = state.nitrogen_balance();
        let before = state.pool(PoolKind::SurfaceDeadWood).carbon;

        decompose_dead_wood(&env, &mut state, Layer::Surface).unwrap();
        decompose_dead_wood(&env, &mut state, Layer::Soil).unwrap();

        let expected = before * 0.8 * 0.5 * (-0.75f64).exp() / 12.0;
        assert_relative_eq!(
            before - state.pool(PoolKind::SurfaceDeadWood).carbon,
            expected,
            max_relative = 1e-9
        );
        assert!(state.pool(PoolKind::SoilDeadWood).carbon < 500.0);
        assert_relative_eq!(state.carbon_balance(), carbon, max_relative = 1e-12);
        assert_relative_eq!(state.nitrogen_balance(), nitrogen, max_relative = 1e-12);
    }
}
