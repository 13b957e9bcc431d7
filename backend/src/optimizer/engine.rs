//! Optimizer Engine
//!
//! Entry point tying the allocation pipeline together:
//!
//! ```text
//! selection ──► validate_selection ──► allocate ──► seat_plan
//!                                                      │
//!            Configuration ◄── evaluate ◄── compose sets
//! ```
//!
//! The engine owns an immutable [`Catalog`] and an [`OptimizerConfig`]; every
//! call is a pure function of those and its arguments. `swap` derives a new
//! configuration from an existing one and re-derives all results.
//!
//! # Example
//!
//! ```rust
//! use reagent_tray_core_rs::{Catalog, OptimizerConfig, TrayOptimizer};
//!
//! let optimizer = TrayOptimizer::new(Catalog::default_catalog(), OptimizerConfig::default());
//!
//! // Total Alkalinity (LR): one 1000 uL reagent, every location is a set
//! let config = optimizer.optimize(&[11]).unwrap();
//! assert_eq!(config.tray_life(), Some(4 * 270 + 12 * 140));
//!
//! let swapped = optimizer.swap(&config, 0, 15).unwrap();
//! assert_eq!(swapped.tray_life(), config.tray_life());
//! ```

use crate::allocation::composer::{derive_configuration, Completeness};
use crate::allocation::layout::seat_plan;
use crate::allocation::metrics::bottlenecks;
use crate::allocation::search::{allocate, SearchStrategy};
use crate::allocation::validator::{describe_breakdown, validate_selection, ChamberRequirement};
use crate::core::capacity::{is_valid_location, TRAY_LOCATIONS};
use crate::models::catalog::{Catalog, ExperimentId, ExperimentSummary};
use crate::models::configuration::Configuration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Configuration Types
// ============================================================================

/// Search settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Exact search (default) or greedy only
    pub strategy: SearchStrategy,

    /// Search nodes the exact search may expand before settling for the
    /// greedy allocation
    pub max_expansions: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::Exact,
            max_expansions: 1_000_000,
        }
    }
}

impl OptimizerConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, OptimizerError> {
        serde_json::from_str(json).map_err(|e| OptimizerError::Serialization(e.to_string()))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failures of the optimizer
///
/// None of these are transient: the computation is deterministic, so the
/// caller must change its input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptimizerError {
    #[error("Unknown experiment: {0}")]
    UnknownExperiment(ExperimentId),

    #[error(
        "Capacity exceeded: selection needs {required} chambers but the tray has {limit} ({})",
        describe_breakdown(.breakdown)
    )]
    CapacityExceeded {
        required: usize,
        limit: usize,
        breakdown: Vec<ChamberRequirement>,
    },

    #[error("No feasible configuration: experiment {experiment_id} ({name}) could not be seated")]
    NoFeasibleConfiguration {
        experiment_id: ExperimentId,
        name: String,
    },

    #[error("Invalid location {location}: tray locations are 0..{limit}")]
    InvalidLocation { location: usize, limit: usize },

    #[error("Experiment {experiment_id} has {leftover} placement(s) outside a complete set")]
    IncompleteSet {
        experiment_id: ExperimentId,
        leftover: usize,
    },

    #[error("Configuration invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Catalog mismatch: snapshot was taken against catalog {expected}, current catalog is {actual}")]
    CatalogMismatch { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ============================================================================
// Optimizer
// ============================================================================

/// Reagent tray optimizer over an injected catalog
#[derive(Debug, Clone)]
pub struct TrayOptimizer {
    catalog: Catalog,
    config: OptimizerConfig,
}

impl TrayOptimizer {
    pub fn new(catalog: Catalog, config: OptimizerConfig) -> Self {
        Self { catalog, config }
    }

    /// Optimizer over the built-in catalog with default settings
    pub fn with_default_catalog() -> Self {
        Self::new(Catalog::default_catalog(), OptimizerConfig::default())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// `{id, name}` listing for selection controls
    pub fn available_experiments(&self) -> Vec<ExperimentSummary> {
        self.catalog.available_experiments()
    }

    /// Compute the configuration with the longest tray life
    ///
    /// Duplicate ids are ignored. An empty selection yields an empty
    /// configuration.
    ///
    /// # Errors
    ///
    /// `UnknownExperiment`, `CapacityExceeded` or `NoFeasibleConfiguration`.
    pub fn optimize(&self, selected: &[ExperimentId]) -> Result<Configuration, OptimizerError> {
        let selected: BTreeSet<ExperimentId> = selected.iter().copied().collect();
        let experiments = validate_selection(&self.catalog, &selected)?;

        let plan = allocate(&experiments, self.config.strategy, self.config.max_expansions)?;
        debug!(
            predicted_tray_life = plan.tray_life,
            locations = plan.locations_used,
            large = plan.large_used,
            expansions = plan.expansions,
            exhaustive = plan.exhaustive,
            "allocation plan"
        );

        let tray = seat_plan(&plan, &self.catalog)?;
        let configuration =
            derive_configuration(&self.catalog, tray, selected.iter().copied(), Completeness::Strict)?;

        for allocation in &plan.allocations {
            let actual = configuration
                .results
                .get(&allocation.experiment_id)
                .map(|r| r.total_tests);
            if actual != Some(allocation.expected_tests) {
                return Err(OptimizerError::InvariantViolation(format!(
                    "experiment {} composed to {:?} tests, plan predicted {}",
                    allocation.experiment_id, actual, allocation.expected_tests
                )));
            }
        }

        self.report(&configuration, &selected);
        Ok(configuration)
    }

    /// Exchange the contents of two locations and re-derive all results
    ///
    /// Placements keep their reagent but take the capacity and test count
    /// of their new location. Swapping a location with itself returns an
    /// equal configuration.
    ///
    /// # Errors
    ///
    /// `InvalidLocation` if either index is outside 0-15; derivation errors
    /// if `configuration` itself breaks the tray invariants.
    pub fn swap(
        &self,
        configuration: &Configuration,
        location_a: usize,
        location_b: usize,
    ) -> Result<Configuration, OptimizerError> {
        for location in [location_a, location_b] {
            if !is_valid_location(location) {
                return Err(OptimizerError::InvalidLocation {
                    location,
                    limit: TRAY_LOCATIONS,
                });
            }
        }

        let mut tray = configuration.tray_locations.clone();
        tray.swap(location_a, location_b);
        for location in [location_a, location_b] {
            if let Some(placement) = tray[location].take() {
                tray[location] = Some(placement.relocated(location));
            }
        }

        let swapped = derive_configuration(
            &self.catalog,
            tray,
            configuration.experiment_ids(),
            Completeness::Lenient,
        )?;

        info!(
            location_a,
            location_b,
            tray_life = ?swapped.tray_life(),
            "locations swapped"
        );
        Ok(swapped)
    }

    fn report(&self, configuration: &Configuration, selected: &BTreeSet<ExperimentId>) {
        match configuration.tray_life() {
            Some(0) => warn!(
                experiments = ?selected,
                "tray life is zero: at least one experiment cannot run a single test"
            ),
            Some(life) => info!(
                experiments = ?selected,
                tray_life = life,
                locations = configuration.locations_used(),
                bottlenecks = ?bottlenecks(&configuration.results),
                "tray optimized"
            ),
            None => info!("empty selection, nothing to place"),
        }
    }
}

impl Default for TrayOptimizer {
    fn default() -> Self {
        Self::with_default_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config = OptimizerConfig::from_json_str(r#"{"strategy": "greedy"}"#).unwrap();
        assert_eq!(config.strategy, SearchStrategy::Greedy);
        assert_eq!(config.max_expansions, 1_000_000);
    }

    #[test]
    fn test_config_rejects_unknown_strategy() {
        let err = OptimizerConfig::from_json_str(r#"{"strategy": "annealing"}"#).unwrap_err();
        assert!(matches!(err, OptimizerError::Serialization(_)));
    }

    #[test]
    fn test_capacity_error_message_lists_breakdown() {
        let optimizer = TrayOptimizer::default();
        let err = optimizer.optimize(&[16, 6, 10, 12, 1, 2]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("needs 17 chambers"));
        assert!(message.contains("Iron (Dissolved) (#16): 4"));
        assert!(message.contains("Copper (II) (LR) (#1): 2"));
    }

    #[test]
    fn test_duplicate_ids_ignored() {
        let optimizer = TrayOptimizer::default();
        let once = optimizer.optimize(&[1]).unwrap();
        let twice = optimizer.optimize(&[1, 1]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_selection() {
        let config = TrayOptimizer::default().optimize(&[]).unwrap();
        assert_eq!(config, Configuration::empty());
        assert_eq!(config.tray_life(), None);
    }

    #[test]
    fn test_swap_rejects_out_of_range() {
        let optimizer = TrayOptimizer::default();
        let config = optimizer.optimize(&[11]).unwrap();
        assert_eq!(
            optimizer.swap(&config, 3, 16).unwrap_err(),
            OptimizerError::InvalidLocation {
                location: 16,
                limit: 16
            }
        );
    }
}
