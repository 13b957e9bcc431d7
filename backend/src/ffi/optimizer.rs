//! PyO3 wrapper for TrayOptimizer
//!
//! This module provides the Python interface to the Rust optimizer.

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use super::types::{
    configuration_to_py, experiments_to_py, optimizer_error_to_py, parse_optimizer_config,
    summary_to_py,
};
use crate::models::catalog::{Catalog, ExperimentId};
use crate::models::configuration::Configuration as RustConfiguration;
use crate::optimizer::{OptimizerConfig, TrayOptimizer as RustTrayOptimizer};

/// Python handle on an optimized tray
#[pyclass(name = "Configuration")]
pub struct PyConfiguration {
    inner: RustConfiguration,
}

#[pymethods]
impl PyConfiguration {
    /// Minimum total tests across experiments (None for an empty tray)
    fn tray_life(&self) -> Option<u64> {
        self.inner.tray_life()
    }

    fn is_viable(&self) -> bool {
        self.inner.is_viable()
    }

    fn to_dict(&self, py: Python) -> PyResult<Py<PyDict>> {
        configuration_to_py(py, &self.inner)
    }

    fn summary(&self, py: Python) -> PyResult<Py<PyDict>> {
        summary_to_py(py, &self.inner.summary())
    }

    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner)
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string()))
    }

    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let inner = serde_json::from_str(json)
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;
        Ok(Self { inner })
    }
}

/// Python wrapper for Rust TrayOptimizer
///
/// # Example (from Python)
///
/// ```python
/// from reagent_tray_core_rs import TrayOptimizer
///
/// opt = TrayOptimizer()
/// config = opt.optimize([1, 16])
/// print(config.tray_life())
/// config = opt.swap(config, 0, 4)
/// layout = config.to_dict()
/// ```
#[pyclass(name = "TrayOptimizer")]
pub struct PyTrayOptimizer {
    inner: RustTrayOptimizer,
}

#[pymethods]
impl PyTrayOptimizer {
    /// Create an optimizer
    ///
    /// # Arguments
    ///
    /// * `catalog_json` - Catalog as `{"experiments": [...]}` JSON; the
    ///   built-in catalog when omitted
    /// * `config` - Optional dict with `strategy` and `max_expansions`
    ///
    /// # Errors
    ///
    /// Raises ValueError for an invalid catalog or config.
    #[new]
    #[pyo3(signature = (catalog_json=None, config=None))]
    fn new(catalog_json: Option<&str>, config: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let catalog = match catalog_json {
            Some(json) => Catalog::from_json_str(json)
                .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?,
            None => Catalog::default_catalog(),
        };
        let config = match config {
            Some(dict) => parse_optimizer_config(dict)?,
            None => OptimizerConfig::default(),
        };

        Ok(Self {
            inner: RustTrayOptimizer::new(catalog, config),
        })
    }

    /// List of `{"id", "name"}` dicts in id order
    fn available_experiments(&self, py: Python) -> PyResult<Py<PyList>> {
        experiments_to_py(py, &self.inner.available_experiments())
    }

    /// Optimize the tray for the given experiment ids
    ///
    /// Raises ValueError for unknown ids, selections over 16 chambers, or
    /// selections that cannot be seated.
    fn optimize(&self, experiment_ids: Vec<ExperimentId>) -> PyResult<PyConfiguration> {
        let inner = self
            .inner
            .optimize(&experiment_ids)
            .map_err(optimizer_error_to_py)?;
        Ok(PyConfiguration { inner })
    }

    /// Swap two locations, returning a new configuration
    fn swap(
        &self,
        configuration: PyRef<'_, PyConfiguration>,
        location_a: usize,
        location_b: usize,
    ) -> PyResult<PyConfiguration> {
        let inner = self
            .inner
            .swap(&configuration.inner, location_a, location_b)
            .map_err(optimizer_error_to_py)?;
        Ok(PyConfiguration { inner })
    }
}
