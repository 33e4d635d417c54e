use numpy::{PyArray2, PyReadonlyArray2, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rcentury_components::orchestrator::{Century, CenturyBuilder};
use rcentury_components::vegetation::{PrescribedCohort, PrescribedVegetation};
use rcentury_core::climate::ClimateTable;
use rcentury_core::context::SiteId;
use rcentury_core::ecoregion::EcoregionParameters;
use rcentury_core::errors::CenturyError;
use rcentury_core::parameters::RunConfiguration;
use rcentury_core::soil::InitialConditions;
use rcentury_core::FloatValue;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

fn to_py_err(err: CenturyError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn from_python<T: DeserializeOwned>(value: Bound<PyAny>) -> PyResult<T> {
    pythonize::depythonize_bound(value).map_err(|e| PyValueError::new_err(format!("{}", e)))
}

/// Collects the inputs of a model before it is validated and built.
///
/// Example:
///     builder = CenturyBuilder()
///     builder.with_configuration({"calibrate_mode": False})
///     builder.with_ecoregion({"name": "sandy", "percent_sand": 0.8})
///     builder.with_climate("sandy", precipitation, mean_t, min_t, max_t, pet, n_deposition)
///     model = builder.build()
#[pyclass]
#[pyo3(name = "CenturyBuilder")]
#[derive(Debug, Default)]
pub struct PyCenturyBuilder(CenturyBuilder);

#[pymethods]
impl PyCenturyBuilder {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    /// Run configuration as a dictionary, missing keys take their defaults
    fn with_configuration(&mut self, configuration: Bound<PyAny>) -> PyResult<()> {
        let configuration: RunConfiguration = from_python(configuration)?;
        self.0.with_configuration(configuration);
        Ok(())
    }

    /// Run configuration as a TOML document
    fn with_configuration_toml(&mut self, text: &str) -> PyResult<()> {
        let configuration = RunConfiguration::from_toml_str(text).map_err(to_py_err)?;
        self.0.with_configuration(configuration);
        Ok(())
    }

    fn with_ecoregion(&mut self, ecoregion: Bound<PyAny>) -> PyResult<()> {
        let ecoregion: EcoregionParameters = from_python(ecoregion)?;
        self.0.with_ecoregion(ecoregion);
        Ok(())
    }

    /// Monthly weather of an ecoregion, each array shaped (years, 12)
    #[allow(clippy::too_many_arguments)]
    fn with_climate(
        &mut self,
        ecoregion: &str,
        precipitation: PyReadonlyArray2<FloatValue>,
        mean_temperature: PyReadonlyArray2<FloatValue>,
        min_temperature: PyReadonlyArray2<FloatValue>,
        max_temperature: PyReadonlyArray2<FloatValue>,
        pet: PyReadonlyArray2<FloatValue>,
        n_deposition: PyReadonlyArray2<FloatValue>,
    ) -> PyResult<()> {
        let table = ClimateTable::from_arrays(
            precipitation.as_array().to_owned(),
            mean_temperature.as_array().to_owned(),
            min_temperature.as_array().to_owned(),
            max_temperature.as_array().to_owned(),
            pet.as_array().to_owned(),
            n_deposition.as_array().to_owned(),
        )
        .map_err(to_py_err)?;
        self.0.with_climate(ecoregion, table);
        Ok(())
    }

    fn build(&mut self) -> PyResult<PyCentury> {
        Ok(PyCentury(self.0.build().map_err(to_py_err)?))
    }
}

/// A validated model, shared by every site it runs.
#[pyclass]
#[pyo3(name = "Century")]
#[derive(Debug)]
pub struct PyCentury(Century);

#[pymethods]
impl PyCentury {
    /// Run one site under prescribed vegetation.
    ///
    /// `cohorts` is a list of dictionaries describing constant cohorts and
    /// `initial_conditions` a dictionary of starting pools. Returns the
    /// monthly value of every output variable as a (years, 12) array.
    #[pyo3(signature = (ecoregion, years, cohorts=None, initial_conditions=None, site_id=0))]
    fn run_site<'py>(
        &self,
        py: Python<'py>,
        ecoregion: &str,
        years: usize,
        cohorts: Option<Bound<'py, PyAny>>,
        initial_conditions: Option<Bound<'py, PyAny>>,
        site_id: u32,
    ) -> PyResult<HashMap<String, Bound<'py, PyArray2<FloatValue>>>> {
        let cohorts: Vec<PrescribedCohort> = match cohorts {
            Some(cohorts) => from_python(cohorts)?,
            None => vec![],
        };
        let initial: InitialConditions = match initial_conditions {
            Some(initial) => from_python(initial)?,
            None => InitialConditions::default(),
        };

        let outputs = py
            .allow_threads(|| {
                let mut site = self.0.create_site(
                    SiteId(site_id),
                    ecoregion,
                    &initial,
                    PrescribedVegetation::new(cohorts),
                )?;
                self.0.run(&mut site, years)
            })
            .map_err(to_py_err)?;

        Ok(outputs
            .names()
            .filter_map(|name| {
                outputs
                    .get_by_name(name)
                    .map(|series| (name.to_string(), series.to_pyarray_bound(py)))
            })
            .collect())
    }

    fn ecoregion_names(&self) -> Vec<String> {
        self.0.ecoregion_names()
    }
}

#[pymodule]
#[pyo3(name = "_lib")]
fn rcentury(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_class::<PyCenturyBuilder>()?;
    m.add_class::<PyCentury>()?;
    Ok(())
}
