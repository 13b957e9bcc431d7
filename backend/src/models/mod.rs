//! Domain models for the reagent tray

pub mod catalog;
pub mod configuration;
pub mod placement;

// Re-exports
pub use catalog::{Catalog, CatalogError, Experiment, ExperimentId, ExperimentSummary, Reagent};
pub use configuration::{Configuration, ExperimentResult, ExperimentTotal, ReagentSet, TraySummary};
pub use placement::Placement;
