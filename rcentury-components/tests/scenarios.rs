//! End-to-end scenarios of the soil engine.

use approx::assert_relative_eq;
use rcentury_components::decomposition::leach_mineral_nitrogen;
use rcentury_components::nitrogen::{CohortBiomass, NitrogenAllocator};
use rcentury_components::orchestrator::{Century, CenturyBuilder};
use rcentury_components::pipeline::StageEnvironment;
use rcentury_components::vegetation::{GrowthReport, GrowthStep, NullVegetation, VegetationModel};
use rcentury_components::water::{SoilWaterBalance, WaterBalanceInputs};
use rcentury_core::climate::{ClimateTable, MonthlyWeather};
use rcentury_core::cohort::CohortHandle;
use rcentury_core::context::{SimulationContext, SiteId};
use rcentury_core::ecoregion::EcoregionParameters;
use rcentury_core::errors::{CenturyError, CenturyResult};
use rcentury_core::parameters::{CenturyParameters, RunConfiguration};
use rcentury_core::soil::{InitialConditions, SoilState, WaterState};
use rcentury_core::FloatValue;

fn uniform_climate(years: usize, weather: MonthlyWeather) -> ClimateTable {
    ClimateTable::constant(years, [weather; 12])
}

fn mild() -> MonthlyWeather {
    MonthlyWeather {
        precipitation: 6.0,
        mean_temperature: 12.0,
        min_temperature: 6.0,
        max_temperature: 18.0,
        pet: 5.0,
        n_deposition: 0.02,
    }
}

fn model(configuration: RunConfiguration, weather: MonthlyWeather) -> Century {
    CenturyBuilder::new()
        .with_configuration(configuration)
        .with_ecoregion(EcoregionParameters::default())
        .with_climate("default", uniform_climate(2, weather))
        .build()
        .unwrap()
}

/// Vegetation that records which months it was grown in.
#[derive(Debug, Default)]
struct RecordingVegetation {
    months: Vec<(usize, bool)>,
}

impl VegetationModel for RecordingVegetation {
    fn total_live_biomass(&self) -> FloatValue {
        0.0
    }

    fn cohort_biomass(&self) -> Vec<CohortBiomass> {
        vec![]
    }

    fn grow(
        &mut self,
        ctx: &SimulationContext,
        step: GrowthStep,
        _soil: &mut SoilState,
        _nitrogen: &mut NitrogenAllocator,
    ) -> CenturyResult<GrowthReport> {
        self.months.push((ctx.month, step.is_last_month));
        Ok(GrowthReport::default())
    }
}

/// Vegetation whose growth model reports a negative nitrogen demand.
#[derive(Debug, Default)]
struct BrokenVegetation {
    handle: Option<CohortHandle>,
}

impl VegetationModel for BrokenVegetation {
    fn total_live_biomass(&self) -> FloatValue {
        1000.0
    }

    fn cohort_biomass(&self) -> Vec<CohortBiomass> {
        self.handle
            .map(|handle| CohortBiomass {
                handle,
                coarse_root_biomass: 100.0,
                wood_biomass: 900.0,
            })
            .into_iter()
            .collect()
    }

    fn establish(&mut self, nitrogen: &mut NitrogenAllocator) -> CenturyResult<()> {
        self.handle = Some(nitrogen.establish(0, 0, 0));
        Ok(())
    }

    fn grow(
        &mut self,
        _ctx: &SimulationContext,
        _step: GrowthStep,
        _soil: &mut SoilState,
        _nitrogen: &mut NitrogenAllocator,
    ) -> CenturyResult<GrowthReport> {
        Ok(GrowthReport {
            nitrogen_demand: self.handle.map(|h| (h, -0.5)).into_iter().collect(),
            ..Default::default()
        })
    }
}

#[test]
fn test_february_below_freezing() {
    let params = CenturyParameters::default();
    let eco = EcoregionParameters {
        field_capacity: 0.3,
        wilting_point: 0.1,
        soil_depth: 100.0,
        ..Default::default()
    };
    let balance = SoilWaterBalance::new(&params, &eco);
    let mut state = WaterState {
        soil_water_content: 22.0,
        ..Default::default()
    };
    let february = MonthlyWeather {
        precipitation: 5.0,
        mean_temperature: -2.0,
        min_temperature: -7.0,
        max_temperature: 3.0,
        pet: 0.8,
        n_deposition: 0.0,
    };
    let out = balance.solve(
        &mut state,
        &WaterBalanceInputs {
            weather: february,
            live_biomass: 5000.0,
            ..Default::default()
        },
    );

    // Everything fell as snow
    assert_eq!(out.soil_input, 0.0);
    assert_eq!(out.snow_melt, 0.0);
    assert!(state.snow_pack > 0.0);
    assert_eq!(state.water_movement, 0.0);
    // Precipitation did not reach the profile
    assert!(state.soil_water_content <= 22.0);
}

#[test]
fn test_no_drainage_means_no_leaching() {
    let params = CenturyParameters::default();
    let eco = EcoregionParameters::default();
    let mut soil = SoilState::new(&InitialConditions::default(), &eco, &params).unwrap();
    soil.mineral_n = 3.5;
    soil.water.water_movement = 0.0;

    let env = StageEnvironment::new(&params, &eco).with_flows(4.0, 2.0);
    let leached = leach_mineral_nitrogen(&env, &mut soil).unwrap();

    assert_eq!(leached, 0.0);
    assert_eq!(soil.mineral_n, 3.5);
    assert_eq!(soil.stream.nitrogen, 0.0);
    assert_eq!(soil.fluxes().mineral_n_leached, 0.0);
}

#[test]
fn test_cohort_without_roots_gets_wood_floor_share() {
    let mut allocator = NitrogenAllocator::new();
    let seedling = allocator.establish(0, 4, 6);
    let mature = allocator.establish(1, 0, 6);
    allocator
        .calculate_mineral_n_fractions(&[
            CohortBiomass {
                handle: seedling,
                coarse_root_biomass: 0.0,
                wood_biomass: 10.0,
            },
            CohortBiomass {
                handle: mature,
                coarse_root_biomass: 150.0,
                wood_biomass: 6000.0,
            },
        ])
        .unwrap();
    allocator.set_mineral_n_allocation(10.0);

    let floor = 0.01 * 10.0;
    let total = floor + (1.0 - (-3.0f64).exp());
    let granted = allocator.mineral_n_allocation(seedling).unwrap();
    assert_relative_eq!(granted, floor / total * 10.0, max_relative = 1e-12);
    assert!(granted < 10.0);
}

#[test]
fn test_lone_cohort_receives_everything() {
    let mut allocator = NitrogenAllocator::new();
    let seedling = allocator.establish(0, 0, 6);
    allocator
        .calculate_mineral_n_fractions(&[CohortBiomass {
            handle: seedling,
            coarse_root_biomass: 0.0,
            wood_biomass: 10.0,
        }])
        .unwrap();
    allocator.set_mineral_n_allocation(10.0);
    assert_relative_eq!(allocator.mineral_n_allocation(seedling).unwrap(), 10.0);
}

#[test]
fn test_zero_inputs_stay_zero() {
    let century = model(
        RunConfiguration::default(),
        MonthlyWeather {
            precipitation: 0.0,
            n_deposition: 0.3,
            ..mild()
        },
    );
    let initial = InitialConditions {
        soil_water_content: Some(0.0),
        ..InitialConditions::empty()
    };
    let mut site = century
        .create_site(SiteId(0), "default", &initial, NullVegetation)
        .unwrap();
    let ctx = SimulationContext::new(SiteId(0), 0, 6, 0, 1);
    century.run_month(&mut site, &ctx).unwrap();

    let soil = &site.soil;
    let fluxes = soil.fluxes();
    assert!(soil.water.decay_factor > 0.0);
    assert_eq!(soil.pools.totals().carbon, 0.0);
    assert_eq!(soil.water.soil_water_content, 0.0);
    assert_eq!(fluxes.heterotrophic_respiration, 0.0);
    assert_eq!(fluxes.net_ecosystem_exchange, 0.0);
    assert_eq!(fluxes.transpiration, 0.0);
    assert_eq!(fluxes.evaporation, 0.0);
    assert_eq!(fluxes.base_flow + fluxes.storm_flow, 0.0);
    assert_eq!(fluxes.mineral_n_leached, 0.0);
    // Deposition less volatilization
    assert_relative_eq!(soil.mineral_n, 0.3 * (1.0 - 0.001), max_relative = 1e-12);
}

#[test]
fn test_negative_demand_aborts_the_run() {
    let century = model(RunConfiguration::default(), mild());
    let mut site = century
        .create_site(
            SiteId(12),
            "default",
            &InitialConditions::default(),
            BrokenVegetation::default(),
        )
        .unwrap();

    let err = century.run_year(&mut site, 1).unwrap_err();
    match err {
        CenturyError::SimulationFailure {
            site, year, month, source,
        } => {
            assert_eq!(site, SiteId(12));
            assert_eq!(year, 0);
            assert_eq!(month, 6);
            assert!(matches!(*source, CenturyError::NegativeNitrogenDemand { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_calibration_order_from_toml() {
    let configuration = RunConfiguration::from_toml_str(
        r#"
calibrate_mode = true

[parameters]
snow_melt_rate = 3.0
"#,
    )
    .unwrap();
    assert_eq!(configuration.parameters.snow_melt_rate, 3.0);
    assert_eq!(configuration.allocation_month, 6);

    let century = model(configuration, mild());
    let mut site = century
        .create_site(
            SiteId(0),
            "default",
            &InitialConditions::default(),
            RecordingVegetation::default(),
        )
        .unwrap();
    century.run_year(&mut site, 1).unwrap();

    let months: Vec<_> = site.vegetation.months.iter().map(|(m, _)| *m).collect();
    assert_eq!(months, (0..12).collect::<Vec<_>>());
    assert_eq!(site.vegetation.months.last(), Some(&(11, true)));
    assert!(site.vegetation.months[..11].iter().all(|(_, last)| !last));
}

#[test]
fn test_shifted_year_starts_in_july() {
    let century = model(RunConfiguration::default(), mild());
    let mut site = century
        .create_site(
            SiteId(0),
            "default",
            &InitialConditions::default(),
            RecordingVegetation::default(),
        )
        .unwrap();
    century.run_year(&mut site, 1).unwrap();
    assert_eq!(site.vegetation.months.first(), Some(&(6, false)));
    assert_eq!(site.vegetation.months.last(), Some(&(5, true)));
}

#[test]
fn test_invalid_configuration_is_rejected_before_running() {
    let err = RunConfiguration::from_toml_str("allocation_month = 12").unwrap_err();
    assert!(matches!(err, CenturyError::InvalidParameter { .. }));

    let err = RunConfiguration::from_toml_str("calibrate_mode = 3").unwrap_err();
    assert!(matches!(err, CenturyError::ConfigurationParse(_)));
}

/// A saturated profile under a warm rainy month with no PET and no cover.
///
/// Everything that falls infiltrates, so the drainage split and the
/// resulting nitrate leaching can be followed by hand.
#[test]
fn test_drainage_and_leaching_of_a_saturated_month() {
    let params = CenturyParameters::default();
    let eco = EcoregionParameters::default();
    let balance = SoilWaterBalance::new(&params, &eco);
    let mut water = WaterState {
        soil_water_content: eco.water_full(),
        ..Default::default()
    };
    let out = balance.solve(
        &mut water,
        &WaterBalanceInputs {
            weather: MonthlyWeather {
                precipitation: 12.0,
                mean_temperature: 15.0,
                min_temperature: 10.0,
                max_temperature: 20.0,
                pet: 0.0,
                n_deposition: 0.0,
            },
            ..Default::default()
        },
    );

    // Field capacity 0.3 * 100 cm, the 12 cm of rain all drain
    assert_relative_eq!(out.soil_input, 12.0);
    assert_relative_eq!(water.water_movement, 12.0, max_relative = 1e-12);
    // Storm flow 12 * 0.4, base flow (12 - 4.8) * 0.4
    assert_relative_eq!(out.storm_flow, 4.8, max_relative = 1e-12);
    assert_relative_eq!(out.base_flow, 2.88, max_relative = 1e-12);
    assert_relative_eq!(out.deep_drainage, 12.0 - 4.8 - 2.88, max_relative = 1e-12);
    // Only the minimum transpiration leaves the profile
    assert_relative_eq!(out.transpiration, 0.01, max_relative = 1e-12);
    assert_relative_eq!(water.soil_water_content, 29.99, max_relative = 1e-12);
    // Available water is taken before transpiration: (30 - 10 + 12) / 0.01
    assert_relative_eq!(water.precipitation_pet_ratio, 3200.0, max_relative = 1e-12);

    let mut soil = SoilState::new(&InitialConditions::default(), &eco, &params).unwrap();
    soil.mineral_n = 2.0;
    soil.water.water_movement = water.water_movement;
    let env = StageEnvironment::new(&params, &eco).with_flows(out.base_flow, out.storm_flow);
    let leached = leach_mineral_nitrogen(&env, &mut soil).unwrap();

    // (0.2 + 0.7 * 0.5) sand effect, half nitrate, flow 7.68 of the critical 18 cm
    let expected = 2.0 * 0.55 * 0.5 * (7.68 / 18.0);
    assert_relative_eq!(leached, expected, max_relative = 1e-12);
    assert_relative_eq!(soil.mineral_n, 2.0 - expected, max_relative = 1e-12);
    assert_relative_eq!(soil.stream.nitrogen, expected, max_relative = 1e-12);
}
