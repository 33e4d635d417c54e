//! Monthly climate tables.
//!
//! Each ecoregion owns one [`ClimateTable`]: a (year offset × month) array per
//! weather variable. Tables are filled before a run starts and are only read
//! afterwards, so every site can share them.

use crate::constants::MONTHS_PER_YEAR;
use crate::errors::{CenturyError, CenturyResult};
use crate::FloatValue;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weather of one month at one ecoregion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthlyWeather {
    /// unit: cm month⁻¹
    pub precipitation: FloatValue,
    /// unit: °C
    pub mean_temperature: FloatValue,
    /// unit: °C
    pub min_temperature: FloatValue,
    /// unit: °C
    pub max_temperature: FloatValue,
    /// Potential evapotranspiration
    /// unit: cm month⁻¹
    pub pet: FloatValue,
    /// unit: g N m⁻² month⁻¹
    pub n_deposition: FloatValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateTable {
    precipitation: Array2<FloatValue>,
    mean_temperature: Array2<FloatValue>,
    min_temperature: Array2<FloatValue>,
    max_temperature: Array2<FloatValue>,
    pet: Array2<FloatValue>,
    n_deposition: Array2<FloatValue>,
}

impl ClimateTable {
    /// Build a table from one array of twelve months per year.
    pub fn from_years(years: &[[MonthlyWeather; MONTHS_PER_YEAR]]) -> Self {
        let shape = (years.len(), MONTHS_PER_YEAR);
        let field = |get: fn(&MonthlyWeather) -> FloatValue| {
            Array2::from_shape_fn(shape, |(year, month)| get(&years[year][month]))
        };
        Self {
            precipitation: field(|w| w.precipitation),
            mean_temperature: field(|w| w.mean_temperature),
            min_temperature: field(|w| w.min_temperature),
            max_temperature: field(|w| w.max_temperature),
            pet: field(|w| w.pet),
            n_deposition: field(|w| w.n_deposition),
        }
    }

    /// The same twelve months repeated for `years` years.
    pub fn constant(years: usize, months: [MonthlyWeather; MONTHS_PER_YEAR]) -> Self {
        Self::from_years(&vec![months; years])
    }

    /// Build a table from per-variable arrays of shape (years, 12).
    pub fn from_arrays(
        precipitation: Array2<FloatValue>,
        mean_temperature: Array2<FloatValue>,
        min_temperature: Array2<FloatValue>,
        max_temperature: Array2<FloatValue>,
        pet: Array2<FloatValue>,
        n_deposition: Array2<FloatValue>,
    ) -> CenturyResult<Self> {
        let shape = precipitation.dim();
        if shape.1 != MONTHS_PER_YEAR {
            return Err(CenturyError::Error(format!(
                "Climate arrays must have {} columns, got {}",
                MONTHS_PER_YEAR, shape.1
            )));
        }
        for (name, array) in [
            ("mean_temperature", &mean_temperature),
            ("min_temperature", &min_temperature),
            ("max_temperature", &max_temperature),
            ("pet", &pet),
            ("n_deposition", &n_deposition),
        ] {
            if array.dim() != shape {
                return Err(CenturyError::Error(format!(
                    "Climate array `{}` has shape {:?}, expected {:?}",
                    name,
                    array.dim(),
                    shape
                )));
            }
        }
        Ok(Self {
            precipitation,
            mean_temperature,
            min_temperature,
            max_temperature,
            pet,
            n_deposition,
        })
    }

    /// Number of years held by the table.
    pub fn years(&self) -> usize {
        self.precipitation.nrows()
    }

    pub fn weather(&self, year: usize, month: usize) -> Option<MonthlyWeather> {
        if year >= self.years() || month >= MONTHS_PER_YEAR {
            return None;
        }
        let index = [year, month];
        Some(MonthlyWeather {
            precipitation: self.precipitation[index],
            mean_temperature: self.mean_temperature[index],
            min_temperature: self.min_temperature[index],
            max_temperature: self.max_temperature[index],
            pet: self.pet[index],
            n_deposition: self.n_deposition[index],
        })
    }

    /// Reject tables holding values no month could produce.
    pub fn validate(&self, ecoregion: &str) -> CenturyResult<()> {
        for year in 0..self.years() {
            for month in 0..MONTHS_PER_YEAR {
                let invalid = |reason: String| CenturyError::InvalidClimate {
                    ecoregion: ecoregion.to_string(),
                    year,
                    month,
                    reason,
                };
                let w = self
                    .weather(year, month)
                    .ok_or_else(|| invalid("index outside table".to_string()))?;
                let values = [
                    w.precipitation,
                    w.mean_temperature,
                    w.min_temperature,
                    w.max_temperature,
                    w.pet,
                    w.n_deposition,
                ];
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(invalid("non-finite value".to_string()));
                }
                if w.precipitation < 0.0 {
                    return Err(invalid(format!(
                        "negative precipitation {}",
                        w.precipitation
                    )));
                }
                if w.pet < 0.0 {
                    return Err(invalid(format!("negative PET {}", w.pet)));
                }
                if w.n_deposition < 0.0 {
                    return Err(invalid(format!(
                        "negative nitrogen deposition {}",
                        w.n_deposition
                    )));
                }
                if w.min_temperature > w.max_temperature {
                    return Err(invalid(format!(
                        "minimum temperature {} above maximum {}",
                        w.min_temperature, w.max_temperature
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Climate tables of every ecoregion, keyed by ecoregion name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateLibrary {
    tables: HashMap<String, ClimateTable>,
}

impl ClimateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ecoregion: impl Into<String>, table: ClimateTable) {
        self.tables.insert(ecoregion.into(), table);
    }

    pub fn with_table(mut self, ecoregion: impl Into<String>, table: ClimateTable) -> Self {
        self.insert(ecoregion, table);
        self
    }

    pub fn table(&self, ecoregion: &str) -> CenturyResult<&ClimateTable> {
        self.tables
            .get(ecoregion)
            .ok_or_else(|| CenturyError::UnknownEcoregion(ecoregion.to_string()))
    }

    pub fn contains(&self, ecoregion: &str) -> bool {
        self.tables.contains_key(ecoregion)
    }

    /// Weather of an ecoregion at a year offset and calendar month.
    pub fn weather(
        &self,
        ecoregion: &str,
        year: usize,
        month: usize,
    ) -> CenturyResult<MonthlyWeather> {
        let table = self.table(ecoregion)?;
        table
            .weather(year, month)
            .ok_or_else(|| CenturyError::MissingClimate {
                ecoregion: ecoregion.to_string(),
                year,
                available: table.years(),
            })
    }

    pub fn validate(&self) -> CenturyResult<()> {
        for (ecoregion, table) in &self.tables {
            table.validate(ecoregion)?;
        }
        Ok(())
    }
}
