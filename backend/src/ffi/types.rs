//! Type conversion utilities for FFI boundary
//!
//! Converts between Rust types and PyO3-compatible types (PyDict, PyList)
//! using the same field names as the JSON form of a configuration.

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::allocation::search::SearchStrategy;
use crate::models::catalog::ExperimentSummary;
use crate::models::configuration::{Configuration, ReagentSet, TraySummary};
use crate::models::placement::Placement;
use crate::optimizer::{OptimizerConfig, OptimizerError};

// ========================================================================
// Error Mapping
// ========================================================================

/// Map an optimizer error onto a Python exception
///
/// Input problems (bad ids, oversized selections, bad locations) raise
/// ValueError; everything else raises RuntimeError.
pub fn optimizer_error_to_py(err: OptimizerError) -> PyErr {
    match err {
        OptimizerError::UnknownExperiment(_)
        | OptimizerError::CapacityExceeded { .. }
        | OptimizerError::NoFeasibleConfiguration { .. }
        | OptimizerError::InvalidLocation { .. } => {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(err.to_string())
        }
        other => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(other.to_string()),
    }
}

// ========================================================================
// Config Parsing
// ========================================================================

/// Parse optimizer settings from a Python dict
///
/// Recognized keys: `strategy` ("exact" or "greedy"), `max_expansions`.
/// Missing keys keep their defaults.
pub fn parse_optimizer_config(dict: &Bound<'_, PyDict>) -> PyResult<OptimizerConfig> {
    let mut config = OptimizerConfig::default();

    if let Some(value) = dict.get_item("strategy")? {
        let strategy: String = value.extract()?;
        config.strategy = match strategy.as_str() {
            "exact" => SearchStrategy::Exact,
            "greedy" => SearchStrategy::Greedy,
            other => {
                return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                    "Unknown strategy '{}': expected 'exact' or 'greedy'",
                    other
                )))
            }
        };
    }

    if let Some(value) = dict.get_item("max_expansions")? {
        config.max_expansions = value.extract()?;
    }

    Ok(config)
}

// ========================================================================
// Result Conversion
// ========================================================================

pub fn placement_to_py<'py>(py: Python<'py>, placement: &Placement) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("location", placement.location)?;
    dict.set_item("experiment_id", placement.experiment_id)?;
    dict.set_item("reagent_code", &placement.reagent_code)?;
    dict.set_item("volume_per_test_ul", placement.volume_per_test_ul)?;
    dict.set_item("capacity_ml", placement.capacity_ml)?;
    dict.set_item("tests_possible", placement.tests_possible)?;
    Ok(dict)
}

fn set_to_py<'py>(py: Python<'py>, set: &ReagentSet) -> PyResult<Bound<'py, PyDict>> {
    let placements = PyList::empty(py);
    for placement in &set.placements {
        placements.append(placement_to_py(py, placement)?)?;
    }

    let dict = PyDict::new(py);
    dict.set_item("placements", placements)?;
    dict.set_item("tests_per_set", set.tests_per_set)?;
    dict.set_item("complete", set.complete)?;
    Ok(dict)
}

/// Convert a configuration to `{"tray_locations": [...], "results": {...}}`
///
/// Empty locations become `None`; results are keyed by integer id.
pub fn configuration_to_py(py: Python, configuration: &Configuration) -> PyResult<Py<PyDict>> {
    let tray = PyList::empty(py);
    for slot in &configuration.tray_locations {
        match slot {
            Some(placement) => tray.append(placement_to_py(py, placement)?)?,
            None => tray.append(py.None())?,
        }
    }

    let results = PyDict::new(py);
    for (id, result) in &configuration.results {
        let sets = PyList::empty(py);
        for set in &result.sets {
            sets.append(set_to_py(py, set)?)?;
        }

        let entry = PyDict::new(py);
        entry.set_item("name", &result.name)?;
        entry.set_item("sets", sets)?;
        entry.set_item("total_tests", result.total_tests)?;
        results.set_item(id, entry)?;
    }

    let dict = PyDict::new(py);
    dict.set_item("tray_locations", tray)?;
    dict.set_item("results", results)?;
    Ok(dict.unbind())
}

pub fn summary_to_py(py: Python, summary: &TraySummary) -> PyResult<Py<PyDict>> {
    let experiments = PyList::empty(py);
    for total in &summary.experiments {
        let entry = PyDict::new(py);
        entry.set_item("id", total.id)?;
        entry.set_item("name", &total.name)?;
        entry.set_item("total_tests", total.total_tests)?;
        entry.set_item("complete_sets", total.complete_sets)?;
        entry.set_item("partial_sets", total.partial_sets)?;
        experiments.append(entry)?;
    }

    let dict = PyDict::new(py);
    dict.set_item("tray_life", summary.tray_life)?;
    dict.set_item("viable", summary.viable)?;
    dict.set_item("locations_used", summary.locations_used)?;
    dict.set_item("experiments", experiments)?;
    Ok(dict.unbind())
}

pub fn experiments_to_py(py: Python, listing: &[ExperimentSummary]) -> PyResult<Py<PyList>> {
    let list = PyList::empty(py);
    for experiment in listing {
        let entry = PyDict::new(py);
        entry.set_item("id", experiment.id)?;
        entry.set_item("name", &experiment.name)?;
        list.append(entry)?;
    }
    Ok(list.unbind())
}
