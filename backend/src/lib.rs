//! Reagent Tray Core - Rust Engine
//!
//! Assigns experiment reagents to the 16 reservoir locations of a reagent
//! tray so that the selected experiments can run as many times as possible
//! before the first of them runs out.
//!
//! # Architecture
//!
//! - **core**: Tray capacity model (270 mL / 140 mL chambers, test counts)
//! - **models**: Domain types (Catalog, Placement, Configuration)
//! - **allocation**: Validation, search, set composition, metrics
//! - **optimizer**: Public entry points (optimize, swap, snapshots)
//!
//! # Critical Invariants
//!
//! 1. Test counts are integers: `floor(capacity_mL * 1000 / volume_uL)`
//! 2. The optimizer is deterministic (same catalog + selection, same tray)
//! 3. Only complete sets earn tests; partial sets are reported at zero

// Module declarations
pub mod allocation;
pub mod core;
pub mod models;
pub mod optimizer;

// Re-exports for convenience
pub use allocation::{AllocationPlan, ChamberRequirement, SearchStrategy};
pub use core::capacity::{capacity_ml, tests_possible, CapacityClass, TRAY_LOCATIONS};
pub use models::{
    catalog::{Catalog, CatalogError, Experiment, ExperimentId, ExperimentSummary, Reagent},
    configuration::{Configuration, ExperimentResult, ExperimentTotal, ReagentSet, TraySummary},
    placement::Placement,
};
pub use optimizer::{
    compute_catalog_hash, validate_configuration, ConfigurationSnapshot, OptimizerConfig,
    OptimizerError, TrayOptimizer,
};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn reagent_tray_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::optimizer::PyTrayOptimizer>()?;
    m.add_class::<ffi::optimizer::PyConfiguration>()?;
    Ok(())
}
