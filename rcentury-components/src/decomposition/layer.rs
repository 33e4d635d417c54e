//! Carbon and nitrogen transfer primitives shared by every decomposition stage.
//!
//! A decomposing pool loses carbon in two ways: CO2 respiration, which
//! mineralizes nitrogen at the pool's own N:C, and transfer to a destination
//! pool. Transferred nitrogen is compared with the C:N required by the
//! destination; the surplus is mineralized and a deficit is immobilized from
//! mineral N.

use rcentury_core::constants::{
    BIOMASS_PER_CARBON, MIN_MINERAL_NITROGEN, NITROGEN_FLOW_TOLERANCE,
};
use rcentury_core::errors::{CenturyError, CenturyResult};
use rcentury_core::parameters::CnRatioBounds;
use rcentury_core::pool::{Pool, PoolKind};
use rcentury_core::soil::SoilState;
use rcentury_core::FloatValue;

/// C:N of material entering a surface pool, from the N content of the decomposing material.
pub fn aboveground_ratio(source: &Pool, bounds: &CnRatioBounds) -> FloatValue {
    let n_content = if source.carbon > 0.0 {
        source.nitrogen / (source.carbon * BIOMASS_PER_CARBON)
    } else {
        0.0
    };
    bounds.ratio_for(n_content)
}

/// C:N of material entering a soil pool, from the mineral N available.
pub fn belowground_ratio(mineral_n: FloatValue, bounds: &CnRatioBounds) -> FloatValue {
    bounds.ratio_for(mineral_n)
}

/// Whether a pool can decompose into a destination requiring `target_cn`.
///
/// Decomposition stops when it would have to immobilize nitrogen from an
/// exhausted mineral pool.
pub fn decomposition_possible(mineral_n: FloatValue, source: &Pool, target_cn: FloatValue) -> bool {
    let exhausted = mineral_n <= MIN_MINERAL_NITROGEN;
    match source.cn_ratio() {
        None => !exhausted,
        Some(cn) => !(exhausted && cn > target_cn),
    }
}

/// Release `co2` carbon from a pool and mineralize nitrogen with it.
///
/// Returns the carbon actually respired (capped at the pool content).
pub fn respire(state: &mut SoilState, source: PoolKind, co2: FloatValue) -> CenturyResult<FloatValue> {
    check_flow(source, "respiration", co2)?;
    let pool = state.pool_mut(source);
    let co2 = co2.min(pool.carbon);
    if co2 <= 0.0 {
        return Ok(0.0);
    }
    let mineralized = (co2 * pool.nitrogen / pool.carbon).min(pool.nitrogen);
    pool.carbon -= co2;
    pool.nitrogen -= mineralized;

    state.mineral_n += mineralized;
    state.record_respiration(co2);
    state.fluxes_mut().gross_mineralization += mineralized;
    Ok(co2)
}

/// Move `carbon` from `source` to `destination` with its nitrogen.
///
/// Nitrogen leaves the source at the source's N:C. The destination receives
/// `carbon / target_cn`; any surplus goes to mineral N, a deficit is drawn
/// from mineral N as far as it is positive.
///
/// Returns the carbon actually moved.
pub fn transfer(
    state: &mut SoilState,
    source: PoolKind,
    destination: PoolKind,
    carbon: FloatValue,
    target_cn: FloatValue,
) -> CenturyResult<FloatValue> {
    check_flow(source, "carbon transfer", carbon)?;
    let pool = *state.pool(source);
    if carbon <= 0.0 || pool.carbon <= 0.0 {
        return Ok(0.0);
    }

    let requested_nitrogen = pool.nitrogen * carbon / pool.carbon;
    if requested_nitrogen - pool.nitrogen > NITROGEN_FLOW_TOLERANCE {
        return Err(CenturyError::FluxExceedsPool {
            pool: source.to_string(),
            flux: "nitrogen transfer",
            requested: requested_nitrogen,
            available: pool.nitrogen,
        });
    }
    let carbon = carbon.min(pool.carbon);
    let nitrogen = requested_nitrogen.min(pool.nitrogen);

    {
        let pool = state.pool_mut(source);
        pool.carbon -= carbon;
        pool.nitrogen -= nitrogen;
    }

    let required = carbon / target_cn;
    let received = if nitrogen >= required {
        let mineralized = nitrogen - required;
        state.mineral_n += mineralized;
        state.fluxes_mut().gross_mineralization += mineralized;
        required
    } else {
        let immobilized = (required - nitrogen).min(state.mineral_n.max(0.0));
        state.mineral_n -= immobilized;
        nitrogen + immobilized
    };

    let pool = state.pool_mut(destination);
    pool.carbon += carbon;
    pool.nitrogen += received;
    Ok(carbon)
}

/// Carbon leaving a pool this month before any split.
///
/// `modifiers` is the product of the texture, lignin and anaerobic terms that
/// apply to the pool. Capped at the pool content.
pub fn monthly_outflow(
    carbon: FloatValue,
    decay_factor: FloatValue,
    decay_rate: FloatValue,
    modifiers: FloatValue,
    month_adjust: FloatValue,
) -> FloatValue {
    (carbon * decay_factor * decay_rate * modifiers * month_adjust)
        .min(carbon)
        .max(0.0)
}

fn check_flow(source: PoolKind, flux: &'static str, value: FloatValue) -> CenturyResult<()> {
    if value < 0.0 || value.is_nan() {
        return Err(CenturyError::NegativeFlux {
            pool: source.to_string(),
            flux,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rcentury_core::ecoregion::EcoregionParameters;
    use rcentury_core::parameters::CenturyParameters;
    use rcentury_core::soil::InitialConditions;

    fn empty_state() -> SoilState {
        SoilState::new(
            &InitialConditions::empty(),
            &EcoregionParameters::default(),
            &CenturyParameters::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_ratios() {
        let bounds = CnRatioBounds::new(20.0, 10.0, 0.02);
        // 1 g N per 100 g C is 0.5 % N in biomass
        let ratio = aboveground_ratio(&Pool::new(100.0, 1.0), &bounds);
        assert_relative_eq!(ratio, 20.0 - 10.0 * 0.005 / 0.02);
        assert_eq!(aboveground_ratio(&Pool::new(0.0, 0.0), &bounds), 20.0);
        assert_eq!(belowground_ratio(5.0, &CnRatioBounds::new(18.0, 8.0, 2.0)), 8.0);
    }

    #[test]
    fn test_decomposition_possible() {
        let rich = Pool::new(100.0, 10.0);
        let poor = Pool::new(100.0, 1.0);
        assert!(decomposition_possible(0.0, &rich, 15.0));
        assert!(!decomposition_possible(0.0, &poor, 15.0));
        assert!(decomposition_possible(1.0, &poor, 15.0));
        assert!(!decomposition_possible(-1.0, &Pool::new(10.0, 0.0), 15.0));
    }

    #[test]
    fn test_respiration_mineralizes_nitrogen() {
        let mut state = empty_state();
        *state.pool_mut(PoolKind::Som2) = Pool::new(100.0, 5.0);
        let respired = respire(&mut state, PoolKind::Som2, 10.0).unwrap();
        assert_eq!(respired, 10.0);
        assert_relative_eq!(state.pool(PoolKind::Som2).nitrogen, 4.5);
        assert_relative_eq!(state.mineral_n, 0.5);
        assert_relative_eq!(state.ledger.respired_carbon, 10.0);
        assert!(respire(&mut state, PoolKind::Som2, -1.0).is_err());
    }

    #[test]
    fn test_transfer_mineralizes_surplus() {
        let mut state = empty_state();
        *state.pool_mut(PoolKind::Som1Soil) = Pool::new(100.0, 10.0);
        transfer(&mut state, PoolKind::Som1Soil, PoolKind::Som2, 40.0, 20.0).unwrap();
        let som2 = state.pool(PoolKind::Som2);
        assert_relative_eq!(som2.carbon, 40.0);
        assert_relative_eq!(som2.nitrogen, 2.0);
        // 4 g N left the source, 2 g N were surplus
        assert_relative_eq!(state.mineral_n, 2.0);
        assert_relative_eq!(state.pool(PoolKind::Som1Soil).nitrogen, 6.0);
    }

    #[test]
    fn test_transfer_immobilizes_deficit() {
        let mut state = empty_state();
        state.mineral_n = 1.0;
        *state.pool_mut(PoolKind::SoilStructural) = Pool::new(100.0, 0.5);
        transfer(&mut state, PoolKind::SoilStructural, PoolKind::Som1Soil, 50.0, 10.0).unwrap();
        let som1 = state.pool(PoolKind::Som1Soil);
        // 0.25 g N came with the carbon, all 1 g of mineral N was immobilized
        assert_relative_eq!(som1.nitrogen, 1.25);
        assert_relative_eq!(state.mineral_n, 0.0);
    }

    #[test]
    fn test_transfer_conserves_mass() {
        let mut state = empty_state();
        state.mineral_n = 3.0;
        *state.pool_mut(PoolKind::Som2) = Pool::new(500.0, 20.0);
        let carbon = state.carbon_balance();
        let nitrogen = state.nitrogen_balance();
        respire(&mut state, PoolKind::Som2, 12.0).unwrap();
        transfer(&mut state, PoolKind::Som2, PoolKind::Som3, 30.0, 8.0).unwrap();
        transfer(&mut state, PoolKind::Som2, PoolKind::Som1Soil, 30.0, 40.0).unwrap();
        assert_relative_eq!(state.carbon_balance(), carbon, max_relative = 1e-12);
        assert_relative_eq!(state.nitrogen_balance(), nitrogen, max_relative = 1e-12);
    }

    #[test]
    fn test_transfer_beyond_pool_is_an_error() {
        let mut state = empty_state();
        *state.pool_mut(PoolKind::Som3) = Pool::new(10.0, 1.0);
        let err = transfer(&mut state, PoolKind::Som3, PoolKind::Som1Soil, 1000.0, 10.0).unwrap_err();
        assert!(matches!(err, CenturyError::FluxExceedsPool { .. }));
    }

    #[test]
    fn test_monthly_outflow_is_capped() {
        assert_eq!(monthly_outflow(10.0, 5.0, 100.0, 1.0, 1.0), 10.0);
        assert_relative_eq!(monthly_outflow(120.0, 0.5, 2.0, 1.0, 1.0 / 12.0), 10.0);
    }
}
