//! Per-site soil state
//!
//! Everything a site carries from one month to the next: the decomposable
//! pools, mineral nitrogen, the stream export, the soil water state and a
//! ledger of every flux that crosses the site boundary.
//!
//! # Mass balance
//!
//! With no disturbance or vegetation exchange,
//! $$\sum_i C_i + C_{stream} + C_{respired}$$
//! stays constant. [`SoilState::carbon_balance`] and
//! [`SoilState::nitrogen_balance`] fold the boundary terms in so the same
//! quantity is conserved in every run.

use crate::constants::{
    BIOMASS_PER_CARBON, METABOLIC_FRACTION_INTERCEPT, METABOLIC_FRACTION_SLOPE,
    MIN_METABOLIC_FRACTION, MONTHS_PER_YEAR, STRUCTURAL_LITTER_CN,
};
use crate::ecoregion::{check_fraction, EcoregionParameters};
use crate::errors::{CenturyError, CenturyResult};
use crate::parameters::CenturyParameters;
use crate::pool::{ElementTotals, Layer, Pool, PoolKind, SoilPools};
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Soil water and the decomposition multipliers derived from it.
///
/// Overwritten every month, never reset: each month starts from the previous
/// month's values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WaterState {
    /// Water in the profile (cm)
    pub soil_water_content: FloatValue,
    /// Snow water equivalent (cm)
    pub snow_pack: FloatValue,
    /// Liquid water held in the snowpack (cm)
    pub liquid_snowpack: FloatValue,
    /// Water drained past field capacity this month (cm)
    pub water_movement: FloatValue,
    /// Water above wilting point relative to the available capacity
    pub relative_water_content: FloatValue,
    /// (available water + precipitation) / PET
    pub precipitation_pet_ratio: FloatValue,
    /// Temperature × moisture multiplier of decay rates
    pub decay_factor: FloatValue,
    /// Anaerobic multiplier, within [floor, 1]
    pub anaerobic_effect: FloatValue,
    /// °C
    pub soil_temperature: FloatValue,
}

/// Boundary fluxes of a site since the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MassLedger {
    pub respired_carbon: FloatValue,
    pub volatilized_nitrogen: FloatValue,
    pub deposited_nitrogen: FloatValue,
    /// Mineral N taken up by vegetation
    pub plant_nitrogen_uptake: FloatValue,
    /// Litterfall and dead wood added by vegetation
    pub external_carbon_input: FloatValue,
    pub external_nitrogen_input: FloatValue,
    /// Removed by fire, harvest and other pool reductions
    pub disturbance_carbon: FloatValue,
    pub disturbance_nitrogen: FloatValue,
}

/// Fluxes of a single month (or, summed, of a year).
///
/// Carbon and nitrogen in g/m², water in cm.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthlyFluxes {
    pub above_npp_carbon: FloatValue,
    pub below_npp_carbon: FloatValue,
    pub heterotrophic_respiration: FloatValue,
    /// Positive values are a release to the atmosphere
    pub net_ecosystem_exchange: FloatValue,
    pub n_deposition: FloatValue,
    pub n_volatilization: FloatValue,
    pub mineral_n_leached: FloatValue,
    pub organic_carbon_leached: FloatValue,
    pub organic_nitrogen_leached: FloatValue,
    pub gross_mineralization: FloatValue,
    pub plant_n_uptake: FloatValue,
    pub base_flow: FloatValue,
    pub storm_flow: FloatValue,
    pub transpiration: FloatValue,
    pub evaporation: FloatValue,
}

impl MonthlyFluxes {
    pub fn accumulate(&mut self, other: &MonthlyFluxes) {
        self.above_npp_carbon += other.above_npp_carbon;
        self.below_npp_carbon += other.below_npp_carbon;
        self.heterotrophic_respiration += other.heterotrophic_respiration;
        self.net_ecosystem_exchange += other.net_ecosystem_exchange;
        self.n_deposition += other.n_deposition;
        self.n_volatilization += other.n_volatilization;
        self.mineral_n_leached += other.mineral_n_leached;
        self.organic_carbon_leached += other.organic_carbon_leached;
        self.organic_nitrogen_leached += other.organic_nitrogen_leached;
        self.gross_mineralization += other.gross_mineralization;
        self.plant_n_uptake += other.plant_n_uptake;
        self.base_flow += other.base_flow;
        self.storm_flow += other.storm_flow;
        self.transpiration += other.transpiration;
        self.evaporation += other.evaporation;
    }
}

/// Carbon and nitrogen content of a pool at the start of a run (g/m²).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoolInitialCondition {
    pub carbon: FloatValue,
    pub nitrogen: FloatValue,
}

impl PoolInitialCondition {
    pub const fn new(carbon: FloatValue, nitrogen: FloatValue) -> Self {
        Self { carbon, nitrogen }
    }
}

/// Starting content of a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConditions {
    pub surface_structural: PoolInitialCondition,
    pub surface_metabolic: PoolInitialCondition,
    pub soil_structural: PoolInitialCondition,
    pub soil_metabolic: PoolInitialCondition,
    pub surface_dead_wood: PoolInitialCondition,
    pub soil_dead_wood: PoolInitialCondition,
    pub som1_surface: PoolInitialCondition,
    pub som1_soil: PoolInitialCondition,
    pub som2: PoolInitialCondition,
    pub som3: PoolInitialCondition,

    /// Lignin fraction of surface structural litter
    /// default: 0.2
    pub surface_structural_lignin: FloatValue,

    /// Lignin fraction of soil structural litter
    /// default: 0.2
    pub soil_structural_lignin: FloatValue,

    /// unit: g N/m²
    /// default: 2.0
    pub mineral_n: FloatValue,

    /// Water in the profile, field capacity when absent
    /// unit: cm
    pub soil_water_content: Option<FloatValue>,

    /// unit: cm
    /// default: 0.0
    pub snow_pack: FloatValue,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            surface_structural: PoolInitialCondition::new(200.0, 1.5),
            surface_metabolic: PoolInitialCondition::new(40.0, 2.5),
            soil_structural: PoolInitialCondition::new(150.0, 1.0),
            soil_metabolic: PoolInitialCondition::new(30.0, 2.0),
            surface_dead_wood: PoolInitialCondition::new(1000.0, 4.0),
            soil_dead_wood: PoolInitialCondition::new(500.0, 2.0),
            som1_surface: PoolInitialCondition::new(60.0, 6.0),
            som1_soil: PoolInitialCondition::new(120.0, 12.0),
            som2: PoolInitialCondition::new(4000.0, 200.0),
            som3: PoolInitialCondition::new(3000.0, 300.0),
            surface_structural_lignin: 0.2,
            soil_structural_lignin: 0.2,
            mineral_n: 2.0,
            soil_water_content: None,
            snow_pack: 0.0,
        }
    }
}

impl InitialConditions {
    /// A site with no organic matter, no mineral N and no snow.
    pub fn empty() -> Self {
        Self {
            surface_structural: PoolInitialCondition::default(),
            surface_metabolic: PoolInitialCondition::default(),
            soil_structural: PoolInitialCondition::default(),
            soil_metabolic: PoolInitialCondition::default(),
            surface_dead_wood: PoolInitialCondition::default(),
            soil_dead_wood: PoolInitialCondition::default(),
            som1_surface: PoolInitialCondition::default(),
            som1_soil: PoolInitialCondition::default(),
            som2: PoolInitialCondition::default(),
            som3: PoolInitialCondition::default(),
            mineral_n: 0.0,
            ..Default::default()
        }
    }

    fn pool(&self, kind: PoolKind) -> PoolInitialCondition {
        match kind {
            PoolKind::SurfaceStructural => self.surface_structural,
            PoolKind::SurfaceMetabolic => self.surface_metabolic,
            PoolKind::SoilStructural => self.soil_structural,
            PoolKind::SoilMetabolic => self.soil_metabolic,
            PoolKind::SurfaceDeadWood => self.surface_dead_wood,
            PoolKind::SoilDeadWood => self.soil_dead_wood,
            PoolKind::Som1Surface => self.som1_surface,
            PoolKind::Som1Soil => self.som1_soil,
            PoolKind::Som2 => self.som2,
            PoolKind::Som3 => self.som3,
        }
    }

    pub fn validate(&self) -> CenturyResult<()> {
        for kind in PoolKind::ALL {
            let pool = self.pool(kind);
            if !(pool.carbon >= 0.0 && pool.nitrogen >= 0.0)
                || !pool.carbon.is_finite()
                || !pool.nitrogen.is_finite()
            {
                return Err(CenturyError::invalid_parameter(
                    kind.name(),
                    format!(
                        "initial carbon and nitrogen must be non-negative, got {} / {}",
                        pool.carbon, pool.nitrogen
                    ),
                ));
            }
        }
        check_fraction("surface_structural_lignin", self.surface_structural_lignin)?;
        check_fraction("soil_structural_lignin", self.soil_structural_lignin)?;
        for (field, value) in [
            ("mineral_n", self.mineral_n),
            ("snow_pack", self.snow_pack),
            ("soil_water_content", self.soil_water_content.unwrap_or(0.0)),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CenturyError::invalid_parameter(
                    field,
                    format!("must be non-negative, got {}", value),
                ));
            }
        }
        Ok(())
    }
}

/// Mutable state of one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilState {
    pub pools: SoilPools,
    /// Plant-available nitrogen (g N/m²). Plant uptake may draw it below zero.
    pub mineral_n: FloatValue,
    /// Carbon and nitrogen that left the site with drainage water
    pub stream: Pool,
    pub water: WaterState,
    pub ledger: MassLedger,
    /// Fluxes per calendar month of the current simulated year
    pub monthly: [MonthlyFluxes; MONTHS_PER_YEAR],
    /// Totals of the last completed simulated year
    pub annual: MonthlyFluxes,
    current_month: usize,
}

impl SoilState {
    pub fn new(
        initial: &InitialConditions,
        ecoregion: &EcoregionParameters,
        parameters: &CenturyParameters,
    ) -> CenturyResult<Self> {
        initial.validate()?;

        let mut pools = SoilPools::default();
        for kind in PoolKind::ALL {
            let init = initial.pool(kind);
            pools[kind] = Pool::new(init.carbon, init.nitrogen);
            pools[kind].decay_rate = match kind {
                PoolKind::SurfaceStructural => parameters.decay_rate_structural_surface,
                PoolKind::SoilStructural => parameters.decay_rate_structural_soil,
                PoolKind::SurfaceMetabolic => parameters.decay_rate_metabolic_surface,
                PoolKind::SoilMetabolic => parameters.decay_rate_metabolic_soil,
                PoolKind::SurfaceDeadWood => parameters.decay_rate_surface_wood,
                PoolKind::SoilDeadWood => parameters.decay_rate_soil_wood,
                PoolKind::Som1Surface => ecoregion.decay_rate_surface,
                PoolKind::Som1Soil => ecoregion.decay_rate_som1,
                PoolKind::Som2 => ecoregion.decay_rate_som2,
                PoolKind::Som3 => ecoregion.decay_rate_som3,
            };
        }
        pools[PoolKind::SurfaceStructural].lignin_fraction = initial.surface_structural_lignin;
        pools[PoolKind::SoilStructural].lignin_fraction = initial.soil_structural_lignin;
        pools[PoolKind::SurfaceDeadWood].lignin_fraction = parameters.wood_lignin_fraction;
        pools[PoolKind::SoilDeadWood].lignin_fraction = parameters.coarse_root_lignin_fraction;

        let soil_water_content = initial
            .soil_water_content
            .unwrap_or_else(|| ecoregion.water_full());
        let water = WaterState {
            soil_water_content,
            snow_pack: initial.snow_pack,
            relative_water_content: relative_water_content(soil_water_content, ecoregion),
            anaerobic_effect: 1.0,
            ..Default::default()
        };

        Ok(Self {
            pools,
            mineral_n: initial.mineral_n,
            stream: Pool::default(),
            water,
            ledger: MassLedger::default(),
            monthly: [MonthlyFluxes::default(); MONTHS_PER_YEAR],
            annual: MonthlyFluxes::default(),
            current_month: 0,
        })
    }

    pub fn pool(&self, kind: PoolKind) -> &Pool {
        &self.pools[kind]
    }

    pub fn pool_mut(&mut self, kind: PoolKind) -> &mut Pool {
        &mut self.pools[kind]
    }

    /// Clear the flux record of a calendar month and book subsequent fluxes to it.
    pub fn begin_month(&mut self, month: usize) {
        self.current_month = month % MONTHS_PER_YEAR;
        self.monthly[self.current_month] = MonthlyFluxes::default();
    }

    pub fn current_month(&self) -> usize {
        self.current_month
    }

    pub fn fluxes(&self) -> &MonthlyFluxes {
        &self.monthly[self.current_month]
    }

    pub fn fluxes_mut(&mut self) -> &mut MonthlyFluxes {
        &mut self.monthly[self.current_month]
    }

    /// Sum the twelve monthly records into the annual totals.
    pub fn close_year(&mut self) {
        let mut annual = MonthlyFluxes::default();
        for month in &self.monthly {
            annual.accumulate(month);
        }
        self.annual = annual;
    }

    /// Atmospheric nitrogen deposition onto the mineral pool.
    pub fn deposit_nitrogen(&mut self, amount: FloatValue) -> CenturyResult<()> {
        if amount < 0.0 {
            return Err(CenturyError::NegativeFlux {
                pool: "mineral N".to_string(),
                flux: "nitrogen deposition",
                value: amount,
            });
        }
        self.mineral_n += amount;
        self.ledger.deposited_nitrogen += amount;
        self.fluxes_mut().n_deposition += amount;
        Ok(())
    }

    /// Mineral nitrogen removed by vegetation.
    pub fn take_up_nitrogen(&mut self, amount: FloatValue) -> CenturyResult<()> {
        if amount < 0.0 {
            return Err(CenturyError::NegativeFlux {
                pool: "mineral N".to_string(),
                flux: "plant nitrogen uptake",
                value: amount,
            });
        }
        self.mineral_n -= amount;
        self.ledger.plant_nitrogen_uptake += amount;
        self.fluxes_mut().plant_n_uptake += amount;
        Ok(())
    }

    /// Book CO2 released by decomposition.
    pub fn record_respiration(&mut self, carbon: FloatValue) {
        self.ledger.respired_carbon += carbon;
        self.fluxes_mut().heterotrophic_respiration += carbon;
    }

    /// Add plant residue to a litter layer.
    ///
    /// The metabolic share is
    /// $$f_{met} = 0.85 - 0.013 \frac{L}{N_{frac}}$$
    /// clamped to [0.2, 1 − L], where L is the lignin fraction and
    /// $N_{frac}$ the nitrogen fraction of the residue biomass. All lignin
    /// enters the structural pool.
    pub fn add_residue(
        &mut self,
        layer: Layer,
        carbon: FloatValue,
        nitrogen: FloatValue,
        lignin_fraction: FloatValue,
    ) -> CenturyResult<()> {
        check_external_input("residue", carbon, nitrogen)?;
        check_fraction("lignin_fraction", lignin_fraction)?;
        if carbon == 0.0 {
            return self.add_carbon_free_nitrogen(layer, nitrogen);
        }

        let fraction = metabolic_fraction(carbon, nitrogen, lignin_fraction);
        let structural_carbon = carbon * (1.0 - fraction);
        let metabolic_carbon = carbon - structural_carbon;
        let structural_nitrogen = nitrogen.min(structural_carbon / STRUCTURAL_LITTER_CN);
        let metabolic_nitrogen = nitrogen - structural_nitrogen;

        let structural = &mut self.pools[PoolKind::structural(layer)];
        let lignin_carbon =
            structural.carbon * structural.lignin_fraction + carbon * lignin_fraction;
        structural.carbon += structural_carbon;
        structural.nitrogen += structural_nitrogen;
        if structural.carbon > 0.0 {
            structural.lignin_fraction = (lignin_carbon / structural.carbon).min(1.0);
        }

        let metabolic = &mut self.pools[PoolKind::metabolic(layer)];
        metabolic.carbon += metabolic_carbon;
        metabolic.nitrogen += metabolic_nitrogen;

        self.ledger.external_carbon_input += carbon;
        self.ledger.external_nitrogen_input += nitrogen;
        Ok(())
    }

    fn add_carbon_free_nitrogen(&mut self, layer: Layer, nitrogen: FloatValue) -> CenturyResult<()> {
        self.pools[PoolKind::metabolic(layer)].nitrogen += nitrogen;
        self.ledger.external_nitrogen_input += nitrogen;
        Ok(())
    }

    /// Add dead wood (surface) or dead coarse roots (soil).
    pub fn add_wood(
        &mut self,
        layer: Layer,
        carbon: FloatValue,
        nitrogen: FloatValue,
    ) -> CenturyResult<()> {
        check_external_input("dead wood", carbon, nitrogen)?;
        let pool = &mut self.pools[PoolKind::dead_wood(layer)];
        pool.carbon += carbon;
        pool.nitrogen += nitrogen;
        self.ledger.external_carbon_input += carbon;
        self.ledger.external_nitrogen_input += nitrogen;
        Ok(())
    }

    /// Remove a fraction of a pool, as by fire or harvest.
    ///
    /// Returns what was removed; it is booked as a disturbance loss.
    pub fn reduce_pool(
        &mut self,
        kind: PoolKind,
        fraction: FloatValue,
    ) -> CenturyResult<ElementTotals> {
        check_fraction("reduction fraction", fraction)?;
        let pool = &mut self.pools[kind];
        let removed = ElementTotals {
            carbon: pool.carbon * fraction,
            nitrogen: pool.nitrogen * fraction,
        };
        pool.carbon -= removed.carbon;
        pool.nitrogen -= removed.nitrogen;
        self.ledger.disturbance_carbon += removed.carbon;
        self.ledger.disturbance_nitrogen += removed.nitrogen;
        log::debug!(
            "Removed {:.3} g C/m² and {:.4} g N/m² from {}",
            removed.carbon,
            removed.nitrogen,
            kind
        );
        Ok(removed)
    }

    /// Carbon in pools plus every carbon flux that left or entered the site.
    ///
    /// Constant over a run; any drift is a conservation error.
    pub fn carbon_balance(&self) -> FloatValue {
        self.pools.totals().carbon
            + self.stream.carbon
            + self.ledger.respired_carbon
            + self.ledger.disturbance_carbon
            - self.ledger.external_carbon_input
    }

    /// Nitrogen equivalent of [`SoilState::carbon_balance`].
    pub fn nitrogen_balance(&self) -> FloatValue {
        self.pools.totals().nitrogen
            + self.mineral_n
            + self.stream.nitrogen
            + self.ledger.volatilized_nitrogen
            + self.ledger.disturbance_nitrogen
            + self.ledger.plant_nitrogen_uptake
            - self.ledger.deposited_nitrogen
            - self.ledger.external_nitrogen_input
    }

    /// Carbon in SOM1 (surface and soil), SOM2 and SOM3.
    pub fn soil_organic_carbon(&self) -> FloatValue {
        self.pools
            .totals_of(&[
                PoolKind::Som1Surface,
                PoolKind::Som1Soil,
                PoolKind::Som2,
                PoolKind::Som3,
            ])
            .carbon
    }

    /// Carbon in the four litter pools.
    pub fn litter_carbon(&self) -> FloatValue {
        self.pools
            .totals_of(&[
                PoolKind::SurfaceStructural,
                PoolKind::SurfaceMetabolic,
                PoolKind::SoilStructural,
                PoolKind::SoilMetabolic,
            ])
            .carbon
    }

    /// Carbon in surface dead wood and dead coarse roots.
    pub fn dead_wood_carbon(&self) -> FloatValue {
        self.pools
            .totals_of(&[PoolKind::SurfaceDeadWood, PoolKind::SoilDeadWood])
            .carbon
    }

    /// Biomass of surface litter (g/m²).
    pub fn surface_litter_biomass(&self) -> FloatValue {
        (self.pools[PoolKind::SurfaceStructural].carbon
            + self.pools[PoolKind::SurfaceMetabolic].carbon)
            * BIOMASS_PER_CARBON
    }

    /// Biomass of standing dead wood (g/m²).
    pub fn dead_wood_biomass(&self) -> FloatValue {
        self.pools[PoolKind::SurfaceDeadWood].carbon * BIOMASS_PER_CARBON
    }
}

/// Relative water content of a profile, floored at zero.
pub fn relative_water_content(
    soil_water_content: FloatValue,
    ecoregion: &EcoregionParameters,
) -> FloatValue {
    let capacity = ecoregion.field_capacity - ecoregion.wilting_point;
    ((soil_water_content / ecoregion.soil_depth - ecoregion.wilting_point) / capacity).max(0.0)
}

/// Share of fresh residue carbon entering metabolic litter.
pub fn metabolic_fraction(
    carbon: FloatValue,
    nitrogen: FloatValue,
    lignin_fraction: FloatValue,
) -> FloatValue {
    let upper = 1.0 - lignin_fraction;
    if nitrogen <= 0.0 {
        return MIN_METABOLIC_FRACTION.min(upper);
    }
    let nitrogen_fraction = nitrogen / (carbon * BIOMASS_PER_CARBON);
    let lignin_to_nitrogen = lignin_fraction / nitrogen_fraction;
    (METABOLIC_FRACTION_INTERCEPT - METABOLIC_FRACTION_SLOPE * lignin_to_nitrogen)
        .max(MIN_METABOLIC_FRACTION)
        .min(upper)
}

fn check_external_input(
    flux: &'static str,
    carbon: FloatValue,
    nitrogen: FloatValue,
) -> CenturyResult<()> {
    for value in [carbon, nitrogen] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(CenturyError::NegativeFlux {
                pool: "litter".to_string(),
                flux,
                value,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SoilState {
        SoilState::new(
            &InitialConditions::default(),
            &EcoregionParameters::default(),
            &CenturyParameters::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_assigns_decay_rates() {
        let state = state();
        let eco = EcoregionParameters::default();
        assert_eq!(state.pool(PoolKind::Som3).decay_rate, eco.decay_rate_som3);
        assert_eq!(state.pool(PoolKind::SurfaceMetabolic).decay_rate, 14.8);
        assert_eq!(state.pool(PoolKind::SurfaceDeadWood).lignin_fraction, 0.25);
    }

    #[test]
    fn test_water_starts_at_field_capacity() {
        let state = state();
        assert!((state.water.soil_water_content - 30.0).abs() < 1e-12);
        assert!((state.water.relative_water_content - 1.0).abs() < 1e-12);
        assert_eq!(state.water.anaerobic_effect, 1.0);
    }

    #[test]
    fn test_negative_initial_pool_is_rejected() {
        let initial = InitialConditions {
            som2: PoolInitialCondition::new(-1.0, 0.0),
            ..Default::default()
        };
        assert!(SoilState::new(
            &initial,
            &EcoregionParameters::default(),
            &CenturyParameters::default()
        )
        .is_err());
    }

    #[test]
    fn test_metabolic_fraction_bounds() {
        // Nitrogen-rich, lignin-poor residue is mostly metabolic
        let rich = metabolic_fraction(100.0, 5.0, 0.05);
        assert!(rich > 0.8 && rich <= 0.85);
        // Nitrogen-poor residue floors at 0.2
        assert_eq!(metabolic_fraction(100.0, 0.1, 0.3), 0.2);
        // Never more than the non-lignin share
        assert!(metabolic_fraction(100.0, 50.0, 0.9) <= 0.1 + 1e-12);
        assert_eq!(metabolic_fraction(100.0, 0.0, 0.2), 0.2);
    }

    #[test]
    fn test_add_residue_preserves_mass_balance() {
        let mut state = state();
        let carbon_before = state.carbon_balance();
        let nitrogen_before = state.nitrogen_balance();
        state.add_residue(Layer::Surface, 100.0, 1.0, 0.2).unwrap();
        assert!((state.carbon_balance() - carbon_before).abs() < 1e-9);
        assert!((state.nitrogen_balance() - nitrogen_before).abs() < 1e-9);
    }

    #[test]
    fn test_add_residue_updates_lignin() {
        let mut state = SoilState::new(
            &InitialConditions::empty(),
            &EcoregionParameters::default(),
            &CenturyParameters::default(),
        )
        .unwrap();
        state.add_residue(Layer::Soil, 100.0, 1.0, 0.2).unwrap();
        let structural = state.pool(PoolKind::SoilStructural);
        let metabolic = state.pool(PoolKind::SoilMetabolic);
        assert!((structural.carbon + metabolic.carbon - 100.0).abs() < 1e-12);
        // 20 g of lignin carbon now sits in the structural pool
        assert!((structural.lignin_fraction * structural.carbon - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_reduce_pool_books_disturbance() {
        let mut state = state();
        let before = state.carbon_balance();
        let removed = state.reduce_pool(PoolKind::SurfaceDeadWood, 0.5).unwrap();
        assert_eq!(removed.carbon, 500.0);
        assert_eq!(state.pool(PoolKind::SurfaceDeadWood).carbon, 500.0);
        assert_eq!(state.ledger.disturbance_carbon, 500.0);
        assert!((state.carbon_balance() - before).abs() < 1e-9);
        assert!(state.reduce_pool(PoolKind::Som2, 1.5).is_err());
    }

    #[test]
    fn test_deposition_and_uptake() {
        let mut state = state();
        state.begin_month(3);
        let before = state.nitrogen_balance();
        state.deposit_nitrogen(0.5).unwrap();
        state.take_up_nitrogen(3.0).unwrap();
        assert!((state.mineral_n - (-0.5)).abs() < 1e-12);
        assert!((state.nitrogen_balance() - before).abs() < 1e-12);
        assert_eq!(state.monthly[3].n_deposition, 0.5);
        assert!(state.deposit_nitrogen(-1.0).is_err());
    }

    #[test]
    fn test_close_year_sums_months() {
        let mut state = state();
        for month in 0..12 {
            state.begin_month(month);
            state.record_respiration(1.0);
        }
        state.close_year();
        assert_eq!(state.annual.heterotrophic_respiration, 12.0);
    }
}
