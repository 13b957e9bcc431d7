//! Python bindings (enabled with the `pyo3` feature)

pub mod optimizer;
pub mod types;
