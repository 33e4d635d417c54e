//! Simulation date and site identity passed explicitly into every call.

use crate::constants::{CALENDAR_MONTH_ORDER, MONTHS_PER_YEAR, SHIFTED_MONTH_ORDER};
use crate::errors::CenturyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a simulated land unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(pub u32);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order in which the twelve months of a simulated year are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MonthOrder {
    /// July to June, so a simulated year spans one growing season.
    #[default]
    Shifted,
    /// January to December, used when calibrating against calendar-year data.
    Calendar,
}

impl MonthOrder {
    pub fn from_calibrate_mode(calibrate_mode: bool) -> Self {
        if calibrate_mode {
            MonthOrder::Calendar
        } else {
            MonthOrder::Shifted
        }
    }

    /// Calendar month indices (0 = January) in processing order.
    pub fn months(&self) -> [usize; MONTHS_PER_YEAR] {
        match self {
            MonthOrder::Shifted => SHIFTED_MONTH_ORDER,
            MonthOrder::Calendar => CALENDAR_MONTH_ORDER,
        }
    }
}

/// Where in the run a computation takes place.
///
/// Replaces process-wide "current year/month" state: each component receives
/// the context of the month it is solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationContext {
    pub site: SiteId,
    /// Year offset from the start of the run.
    pub year: usize,
    /// Calendar month, 0 = January.
    pub month: usize,
    /// Position of `month` in the processing order of the year (0..12).
    pub month_count: usize,
    /// Number of years in the run.
    pub total_years: usize,
}

impl SimulationContext {
    pub fn new(
        site: SiteId,
        year: usize,
        month: usize,
        month_count: usize,
        total_years: usize,
    ) -> Self {
        Self {
            site,
            year,
            month,
            month_count,
            total_years,
        }
    }

    /// Whether this month is the last one processed in its simulated year.
    pub fn is_last_month(&self) -> bool {
        self.month_count == MONTHS_PER_YEAR - 1
    }

    /// Whether this month belongs to the final simulated year of the run.
    pub fn is_final_year(&self) -> bool {
        self.year + 1 >= self.total_years
    }

    /// Wrap an error with the site and date it occurred at.
    pub fn fail(&self, source: CenturyError) -> CenturyError {
        match source {
            already @ CenturyError::SimulationFailure { .. } => already,
            other => CenturyError::SimulationFailure {
                site: self.site,
                year: self.year,
                month: self.month,
                source: Box::new(other),
            },
        }
    }
}
