//! Allocation of a site's mineral nitrogen among vegetation cohorts.
//!
//! Once a year every cohort receives a weight that saturates with its coarse
//! root biomass,
//! $$w = 1 - e^{-0.02\,B_{root}}$$
//! falling back to 1 % of its wood biomass when that is not positive. Each
//! month the available mineral N, $\max(N_{min}, 0.01)$, is split in
//! proportion to the normalised weights.
//!
//! Nitrogen resorbed from senescing foliage is tracked separately per cohort.

use rcentury_core::cohort::{unknown_cohort, CohortHandle, CohortRecord};
use rcentury_core::constants::{
    ALLOCATION_ROOT_COEFFICIENT, LEAF_CARBON_FRACTION, MIN_ALLOCATION_WOOD_FRACTION,
    MIN_AVAILABLE_MINERAL_N,
};
use rcentury_core::errors::{CenturyError, CenturyResult};
use rcentury_core::FloatValue;
use std::fmt;

/// Biomass of a cohort at the time allocation weights are rebuilt (g/m²).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohortBiomass {
    pub handle: CohortHandle,
    pub coarse_root_biomass: FloatValue,
    pub wood_biomass: FloatValue,
}

/// Unnormalised allocation weight of a cohort.
pub fn allocation_weight(coarse_root_biomass: FloatValue, wood_biomass: FloatValue) -> FloatValue {
    let weight = 1.0 - (-ALLOCATION_ROOT_COEFFICIENT * coarse_root_biomass).exp();
    if weight > 0.0 {
        weight
    } else {
        MIN_ALLOCATION_WOOD_FRACTION * wood_biomass
    }
}

/// Nitrogen recovered from senescing foliage (g N/m²).
///
/// $$N_{res} = B_{leaf} \cdot 0.47 \cdot \left(\frac{1}{CN_{leaf}} - \frac{1}{CN_{litter}}\right)$$
pub fn calculate_resorbed_n(
    leaf_biomass: FloatValue,
    leaf_cn: FloatValue,
    leaf_litter_cn: FloatValue,
) -> CenturyResult<FloatValue> {
    if !(leaf_cn > 0.0 && leaf_litter_cn > 0.0) {
        return Err(CenturyError::invalid_parameter(
            "leaf_cn",
            format!(
                "leaf and leaf litter C:N must be positive, got {} and {}",
                leaf_cn, leaf_litter_cn
            ),
        ));
    }
    Ok(leaf_biomass * LEAF_CARBON_FRACTION * (1.0 / leaf_cn - 1.0 / leaf_litter_cn))
}

/// Reject a negative nitrogen demand reported by the growth model.
pub fn check_nitrogen_demand(handle: CohortHandle, demand: FloatValue) -> CenturyResult<()> {
    if demand < 0.0 || demand.is_nan() {
        return Err(CenturyError::NegativeNitrogenDemand {
            cohort: format!("{:?}", handle),
            demand,
        });
    }
    Ok(())
}

/// Per-site nitrogen allocation state.
///
/// Every live cohort is an entity of `cohorts` with a [`CohortRecord`].
#[derive(Default)]
pub struct NitrogenAllocator {
    cohorts: hecs::World,
}

impl fmt::Debug for NitrogenAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NitrogenAllocator")
            .field("cohorts", &self.cohorts.len())
            .finish()
    }
}

impl NitrogenAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly established cohort.
    pub fn establish(
        &mut self,
        species_index: usize,
        year: usize,
        month: usize,
    ) -> CohortHandle {
        let handle = self
            .cohorts
            .spawn((CohortRecord::new(species_index, year, month),));
        log::debug!(
            "Established cohort {:?} of species {} (year {}, month {})",
            handle,
            species_index,
            year,
            month
        );
        handle
    }

    /// Forget a dead cohort.
    pub fn remove(&mut self, handle: CohortHandle) -> CenturyResult<CohortRecord> {
        let record = CohortRecord::clone(&*self.record(handle)?);
        self.cohorts
            .despawn(handle)
            .map_err(|_| unknown_cohort(handle))?;
        Ok(record)
    }

    /// Copy of the record of a live cohort.
    pub fn cohort(&self, handle: CohortHandle) -> CenturyResult<CohortRecord> {
        Ok(CohortRecord::clone(&*self.record(handle)?))
    }

    /// Handles of every live cohort.
    pub fn handles(&self) -> Vec<CohortHandle> {
        self.cohorts
            .query::<&CohortRecord>()
            .iter()
            .map(|(handle, _)| handle)
            .collect()
    }

    pub fn contains(&self, handle: CohortHandle) -> bool {
        self.cohorts.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.cohorts.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.len() == 0
    }

    /// Rebuild the relative allocation of the listed cohorts.
    ///
    /// Every cohort's share is cleared first, so cohorts missing from
    /// `biomass` receive nothing until the next rebuild. A zero total weight
    /// gives every listed cohort a zero share.
    pub fn calculate_mineral_n_fractions(&mut self, biomass: &[CohortBiomass]) -> CenturyResult<()> {
        let mut weights = Vec::with_capacity(biomass.len());
        for cohort in biomass {
            if !self.cohorts.contains(cohort.handle) {
                return Err(unknown_cohort(cohort.handle));
            }
            let weight = allocation_weight(cohort.coarse_root_biomass, cohort.wood_biomass);
            if !weight.is_finite() {
                return Err(CenturyError::NonFiniteAllocationWeight {
                    cohort: format!("{:?}", cohort.handle),
                    weight,
                });
            }
            weights.push(weight);
        }

        for (_, record) in self.cohorts.query_mut::<&mut CohortRecord>() {
            record.mineral_n_fraction = 0.0;
        }
        if biomass.is_empty() {
            log::warn!("Rebuilding nitrogen allocation weights with no cohorts");
            return Ok(());
        }

        let total: FloatValue = weights.iter().sum();
        for (cohort, weight) in biomass.iter().zip(weights) {
            let record = self.record_mut(cohort.handle)?;
            record.mineral_n_fraction = if total > 0.0 { weight / total } else { 0.0 };
        }
        Ok(())
    }

    /// Grant this month's share of mineral N to every cohort.
    ///
    /// Returns the nitrogen offered in total.
    pub fn set_mineral_n_allocation(&mut self, mineral_n: FloatValue) -> FloatValue {
        let available = mineral_n.max(MIN_AVAILABLE_MINERAL_N);
        let mut granted = 0.0;
        for (_, record) in self.cohorts.query_mut::<&mut CohortRecord>() {
            record.mineral_n_allocation = record.mineral_n_fraction * available;
            granted += record.mineral_n_allocation;
        }
        granted
    }

    pub fn mineral_n_allocation(&self, handle: CohortHandle) -> CenturyResult<FloatValue> {
        Ok(self.record(handle)?.mineral_n_allocation)
    }

    pub fn mineral_n_fraction(&self, handle: CohortHandle) -> CenturyResult<FloatValue> {
        Ok(self.record(handle)?.mineral_n_fraction)
    }

    /// Store the nitrogen a cohort recovered from its foliage.
    pub fn set_resorbed_n_allocation(
        &mut self,
        handle: CohortHandle,
        resorbed: FloatValue,
    ) -> CenturyResult<()> {
        self.record_mut(handle)?.resorbed_n_allocation = resorbed;
        Ok(())
    }

    pub fn resorbed_n_allocation(&self, handle: CohortHandle) -> CenturyResult<FloatValue> {
        Ok(self.record(handle)?.resorbed_n_allocation)
    }

    /// Clear resorbed nitrogen of every cohort at the start of a foliage cycle.
    pub fn reset_resorbed_n(&mut self) {
        for (_, record) in self.cohorts.query_mut::<&mut CohortRecord>() {
            record.resorbed_n_allocation = 0.0;
        }
    }

    fn record(&self, handle: CohortHandle) -> CenturyResult<hecs::Ref<'_, CohortRecord>> {
        self.cohorts
            .get::<&CohortRecord>(handle)
            .map_err(|_| unknown_cohort(handle))
    }

    fn record_mut(&mut self, handle: CohortHandle) -> CenturyResult<&mut CohortRecord> {
        self.cohorts
            .query_one_mut::<&mut CohortRecord>(handle)
            .map_err(|_| unknown_cohort(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights() {
        assert_relative_eq!(allocation_weight(100.0, 0.0), 1.0 - (-2.0f64).exp());
        assert_relative_eq!(allocation_weight(0.0, 250.0), 2.5);
        assert_eq!(allocation_weight(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_allocation_sums_to_available() {
        let mut allocator = NitrogenAllocator::new();
        let a = allocator.establish(0, 0, 6);
        let b = allocator.establish(1, 0, 6);
        let c = allocator.establish(1, 3, 6);
        allocator
            .calculate_mineral_n_fractions(&[
                CohortBiomass {
                    handle: a,
                    coarse_root_biomass: 50.0,
                    wood_biomass: 800.0,
                },
                CohortBiomass {
                    handle: b,
                    coarse_root_biomass: 120.0,
                    wood_biomass: 2000.0,
                },
                CohortBiomass {
                    handle: c,
                    coarse_root_biomass: 0.0,
                    wood_biomass: 20.0,
                },
            ])
            .unwrap();

        let granted = allocator.set_mineral_n_allocation(4.0);
        assert_relative_eq!(granted, 4.0, epsilon = 1e-12);
        let fractions: FloatValue = [a, b, c]
            .iter()
            .map(|h| allocator.mineral_n_fraction(*h).unwrap())
            .sum();
        assert_relative_eq!(fractions, 1.0, epsilon = 1e-12);
        assert!(allocator.mineral_n_allocation(b).unwrap() > allocator.mineral_n_allocation(a).unwrap());
    }

    #[test]
    fn test_exhausted_pool_still_offers_minimum() {
        let mut allocator = NitrogenAllocator::new();
        let a = allocator.establish(0, 0, 6);
        allocator
            .calculate_mineral_n_fractions(&[CohortBiomass {
                handle: a,
                coarse_root_biomass: 10.0,
                wood_biomass: 0.0,
            }])
            .unwrap();
        allocator.set_mineral_n_allocation(-3.0);
        assert_relative_eq!(allocator.mineral_n_allocation(a).unwrap(), 0.01);
    }

    #[test]
    fn test_zero_weights_give_zero_share() {
        let mut allocator = NitrogenAllocator::new();
        let a = allocator.establish(0, 0, 6);
        allocator
            .calculate_mineral_n_fractions(&[CohortBiomass {
                handle: a,
                coarse_root_biomass: 0.0,
                wood_biomass: 0.0,
            }])
            .unwrap();
        allocator.set_mineral_n_allocation(10.0);
        assert_eq!(allocator.mineral_n_allocation(a).unwrap(), 0.0);
    }

    #[test]
    fn test_nan_weight_is_an_error() {
        let mut allocator = NitrogenAllocator::new();
        let a = allocator.establish(0, 0, 6);
        let err = allocator
            .calculate_mineral_n_fractions(&[CohortBiomass {
                handle: a,
                coarse_root_biomass: FloatValue::NAN,
                wood_biomass: 1.0,
            }])
            .unwrap_err();
        assert!(matches!(err, CenturyError::NonFiniteAllocationWeight { .. }));
    }

    #[test]
    fn test_dead_cohort_is_forgotten() {
        let mut allocator = NitrogenAllocator::new();
        let a = allocator.establish(0, 0, 6);
        allocator.remove(a).unwrap();
        let b = allocator.establish(2, 1, 6);
        assert_eq!(allocator.len(), 1);
        assert_eq!(allocator.handles(), vec![b]);
        assert!(!allocator.contains(a));
        assert!(matches!(
            allocator.mineral_n_allocation(a),
            Err(CenturyError::UnknownCohort(_))
        ));
        assert!(matches!(allocator.remove(a), Err(CenturyError::UnknownCohort(_))));
        assert_eq!(allocator.cohort(b).unwrap().species_index, 2);
    }

    #[test]
    fn test_rebuild_clears_cohorts_left_out() {
        let mut allocator = NitrogenAllocator::new();
        let a = allocator.establish(0, 0, 6);
        let b = allocator.establish(1, 0, 6);
        let both = [
            CohortBiomass {
                handle: a,
                coarse_root_biomass: 100.0,
                wood_biomass: 1000.0,
            },
            CohortBiomass {
                handle: b,
                coarse_root_biomass: 20.0,
                wood_biomass: 300.0,
            },
        ];
        allocator.calculate_mineral_n_fractions(&both).unwrap();

        allocator.calculate_mineral_n_fractions(&both[..1]).unwrap();
        let granted = allocator.set_mineral_n_allocation(10.0);
        assert_relative_eq!(granted, 10.0, epsilon = 1e-12);
        assert_relative_eq!(allocator.mineral_n_allocation(a).unwrap(), 10.0, epsilon = 1e-12);
        assert_eq!(allocator.mineral_n_fraction(b).unwrap(), 0.0);

        allocator.calculate_mineral_n_fractions(&[]).unwrap();
        assert_eq!(allocator.set_mineral_n_allocation(10.0), 0.0);
        assert_eq!(allocator.mineral_n_allocation(a).unwrap(), 0.0);
    }

    #[test]
    fn test_rebuild_with_dead_cohort_is_an_error() {
        let mut allocator = NitrogenAllocator::new();
        let a = allocator.establish(0, 0, 6);
        let b = allocator.establish(1, 0, 6);
        allocator
            .calculate_mineral_n_fractions(&[CohortBiomass {
                handle: b,
                coarse_root_biomass: 50.0,
                wood_biomass: 0.0,
            }])
            .unwrap();
        allocator.remove(a).unwrap();
        let err = allocator
            .calculate_mineral_n_fractions(&[CohortBiomass {
                handle: a,
                coarse_root_biomass: 50.0,
                wood_biomass: 0.0,
            }])
            .unwrap_err();
        assert!(matches!(err, CenturyError::UnknownCohort(_)));
        // A failed rebuild leaves the previous shares untouched
        assert_relative_eq!(allocator.mineral_n_fraction(b).unwrap(), 1.0);
    }

    #[test]
    fn test_resorption() {
        let resorbed = calculate_resorbed_n(200.0, 25.0, 50.0).unwrap();
        assert_relative_eq!(resorbed, 200.0 * 0.47 * (0.04 - 0.02));
        assert!(calculate_resorbed_n(200.0, 0.0, 50.0).is_err());

        let mut allocator = NitrogenAllocator::new();
        let a = allocator.establish(0, 0, 6);
        allocator.set_resorbed_n_allocation(a, resorbed).unwrap();
        assert_relative_eq!(allocator.resorbed_n_allocation(a).unwrap(), resorbed);
        allocator.reset_resorbed_n();
        assert_eq!(allocator.resorbed_n_allocation(a).unwrap(), 0.0);
    }

    #[test]
    fn test_negative_demand_is_fatal() {
        let mut allocator = NitrogenAllocator::new();
        let a = allocator.establish(0, 0, 6);
        assert!(check_nitrogen_demand(a, 0.3).is_ok());
        assert!(matches!(
            check_nitrogen_demand(a, -0.1),
            Err(CenturyError::NegativeNitrogenDemand { .. })
        ));
    }
}
