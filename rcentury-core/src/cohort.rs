//! Nitrogen bookkeeping of vegetation cohorts.
//!
//! Each live cohort is an entity in a [`hecs::World`] carrying one
//! [`CohortRecord`]. The entity is spawned when the cohort establishes and
//! despawned when it dies; hecs bumps the generation of a reused id so a
//! handle to a dead cohort never aliases a newer one.

use crate::errors::CenturyError;
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Stable reference to a cohort record.
pub type CohortHandle = hecs::Entity;

/// Nitrogen bookkeeping of one cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRecord {
    pub species_index: usize,
    /// Year offset at which the cohort established
    pub established_year: usize,
    /// Calendar month at which the cohort established
    pub established_month: usize,
    /// Relative share of mineral N, rebuilt once a year
    pub mineral_n_fraction: FloatValue,
    /// Mineral N granted this month (g N/m²)
    pub mineral_n_allocation: FloatValue,
    /// N recovered from senescing foliage (g N/m²)
    pub resorbed_n_allocation: FloatValue,
}

impl CohortRecord {
    pub fn new(species_index: usize, established_year: usize, established_month: usize) -> Self {
        Self {
            species_index,
            established_year,
            established_month,
            mineral_n_fraction: 0.0,
            mineral_n_allocation: 0.0,
            resorbed_n_allocation: 0.0,
        }
    }
}

/// Error for a handle whose cohort is dead or was never established.
pub fn unknown_cohort(handle: CohortHandle) -> CenturyError {
    CenturyError::UnknownCohort(format!("{:?}", handle))
}
