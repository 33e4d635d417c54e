use crate::context::SiteId;
use crate::FloatValue;
use thiserror::Error;

/// Error type for invalid configuration and failed simulations.
///
/// Configuration variants are raised while a model is being built, before any
/// month is simulated. Invariant variants are raised at the point a bad flux is
/// detected and abort the run; the orchestrator wraps them in
/// [`CenturyError::SimulationFailure`] so the site and date are reported.
#[derive(Error, Debug)]
pub enum CenturyError {
    #[error("{0}")]
    Error(String),
    #[error("Invalid parameter `{parameter}`: {reason}")]
    InvalidParameter { parameter: String, reason: String },
    #[error("Unknown ecoregion `{0}`")]
    UnknownEcoregion(String),
    #[error("No climate for ecoregion `{ecoregion}` at year offset {year} (table holds {available} years)")]
    MissingClimate {
        ecoregion: String,
        year: usize,
        available: usize,
    },
    #[error("Invalid climate for ecoregion `{ecoregion}` at year offset {year}, month {month}: {reason}")]
    InvalidClimate {
        ecoregion: String,
        year: usize,
        month: usize,
        reason: String,
    },
    #[error("{flux} of {requested} from {pool} exceeds the available {available}")]
    FluxExceedsPool {
        pool: String,
        flux: &'static str,
        requested: FloatValue,
        available: FloatValue,
    },
    #[error("Negative {flux} of {value} requested from {pool}")]
    NegativeFlux {
        pool: String,
        flux: &'static str,
        value: FloatValue,
    },
    #[error("Negative nitrogen demand {demand} reported for cohort {cohort}")]
    NegativeNitrogenDemand { cohort: String, demand: FloatValue },
    #[error("Nitrogen allocation weight for cohort {cohort} is not finite ({weight})")]
    NonFiniteAllocationWeight { cohort: String, weight: FloatValue },
    #[error("Cohort {0} is not alive in this allocator")]
    UnknownCohort(String),
    #[error("Could not parse configuration: {0}")]
    ConfigurationParse(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Simulation failed at site {site}, year {year}, month {month}: {source}")]
    SimulationFailure {
        site: SiteId,
        year: usize,
        month: usize,
        #[source]
        source: Box<CenturyError>,
    },
}

impl CenturyError {
    /// Shorthand for an [`CenturyError::InvalidParameter`].
    pub fn invalid_parameter(parameter: &str, reason: impl Into<String>) -> Self {
        CenturyError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type for `Result<T, CenturyError>`.
pub type CenturyResult<T> = Result<T, CenturyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_failure_reports_site_and_date() {
        let err = CenturyError::SimulationFailure {
            site: SiteId(12),
            year: 3,
            month: 7,
            source: Box::new(CenturyError::NegativeNitrogenDemand {
                cohort: "#4".to_string(),
                demand: -0.5,
            }),
        };
        let message = err.to_string();
        assert!(message.contains("site 12"), "{}", message);
        assert!(message.contains("year 3"), "{}", message);
        assert!(message.contains("month 7"), "{}", message);
        assert!(message.contains("-0.5"), "{}", message);
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = CenturyError::invalid_parameter("field_capacity", "must exceed wilting point");
        assert_eq!(
            err.to_string(),
            "Invalid parameter `field_capacity`: must exceed wilting point"
        );
    }
}
