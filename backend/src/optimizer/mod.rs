//! Optimizer - public entry points
//!
//! See `engine.rs` for the optimize / swap pipeline and `snapshot.rs` for
//! save, restore and invariant validation.

pub mod engine;
pub mod snapshot;

// Re-export main types for convenience
pub use engine::{OptimizerConfig, OptimizerError, TrayOptimizer};
pub use snapshot::{compute_catalog_hash, validate_configuration, ConfigurationSnapshot};
