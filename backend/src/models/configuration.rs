//! Tray configuration: the 16 locations plus per-experiment results
//!
//! # Invariants
//!
//! 1. At most one placement per location, and `tray_locations[i].location == i`
//! 2. Every seated placement appears in exactly one set of its experiment
//! 3. `total_tests` sums `tests_per_set` over complete sets only

use crate::allocation::metrics;
use crate::core::capacity::TRAY_LOCATIONS;
use crate::models::catalog::ExperimentId;
use crate::models::placement::Placement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One round of an experiment: a placement per distinct reagent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReagentSet {
    /// Placements in the experiment's reagent order
    pub placements: Vec<Placement>,

    /// Minimum `tests_possible` over the placements; 0 for partial sets
    pub tests_per_set: u64,

    /// Whether every reagent of the experiment is present
    pub complete: bool,
}

/// Sets and totals for one experiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub name: String,
    /// Complete sets first, then any partial sets
    pub sets: Vec<ReagentSet>,
    pub total_tests: u64,
}

impl ExperimentResult {
    pub fn complete_sets(&self) -> usize {
        self.sets.iter().filter(|s| s.complete).count()
    }

    pub fn partial_sets(&self) -> usize {
        self.sets.len() - self.complete_sets()
    }
}

/// Per-experiment line of a [`TraySummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentTotal {
    pub id: ExperimentId,
    pub name: String,
    pub total_tests: u64,
    pub complete_sets: usize,
    pub partial_sets: usize,
}

/// Headline numbers for a configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraySummary {
    /// Minimum `total_tests` across experiments (None when nothing is selected)
    pub tray_life: Option<u64>,
    /// False when some experiment cannot run a single test
    pub viable: bool,
    pub locations_used: usize,
    pub experiments: Vec<ExperimentTotal>,
}

/// A complete tray layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub tray_locations: [Option<Placement>; TRAY_LOCATIONS],
    pub results: BTreeMap<ExperimentId, ExperimentResult>,
}

impl Configuration {
    /// A configuration with no placements and no experiments
    pub fn empty() -> Self {
        Self {
            tray_locations: Default::default(),
            results: BTreeMap::new(),
        }
    }

    /// Minimum `total_tests` across experiments
    ///
    /// `Some(0)` means at least one experiment cannot run; `None` means the
    /// configuration holds no experiments.
    pub fn tray_life(&self) -> Option<u64> {
        metrics::tray_life(&self.results)
    }

    /// True when every experiment can run at least one test
    pub fn is_viable(&self) -> bool {
        matches!(self.tray_life(), Some(life) if life > 0)
    }

    pub fn locations_used(&self) -> usize {
        self.tray_locations.iter().filter(|p| p.is_some()).count()
    }

    /// Seated placements in location order
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.tray_locations.iter().flatten()
    }

    /// Experiment ids present in `results`
    pub fn experiment_ids(&self) -> impl Iterator<Item = ExperimentId> + '_ {
        self.results.keys().copied()
    }

    pub fn summary(&self) -> TraySummary {
        TraySummary {
            tray_life: self.tray_life(),
            viable: self.is_viable(),
            locations_used: self.locations_used(),
            experiments: self
                .results
                .iter()
                .map(|(id, result)| ExperimentTotal {
                    id: *id,
                    name: result.name.clone(),
                    total_tests: result.total_tests,
                    complete_sets: result.complete_sets(),
                    partial_sets: result.partial_sets(),
                })
                .collect(),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::Reagent;

    fn single_set_config(total: u64) -> Configuration {
        let placement = Placement::new(4, 11, &Reagent::new("KR11E", 1000));
        let mut config = Configuration::empty();
        config.tray_locations[4] = Some(placement.clone());
        config.results.insert(
            11,
            ExperimentResult {
                name: "Total Alkalinity (LR)".to_string(),
                sets: vec![ReagentSet {
                    placements: vec![placement],
                    tests_per_set: total,
                    complete: true,
                }],
                total_tests: total,
            },
        );
        config
    }

    #[test]
    fn test_empty_configuration_has_no_tray_life() {
        let config = Configuration::empty();
        assert_eq!(config.tray_life(), None);
        assert!(!config.is_viable());
        assert_eq!(config.locations_used(), 0);
    }

    #[test]
    fn test_zero_tray_life_is_not_viable() {
        let config = single_set_config(0);
        assert_eq!(config.tray_life(), Some(0));
        assert!(!config.is_viable());
    }

    #[test]
    fn test_summary() {
        let summary = single_set_config(140).summary();
        assert_eq!(summary.tray_life, Some(140));
        assert!(summary.viable);
        assert_eq!(summary.locations_used, 1);
        assert_eq!(summary.experiments[0].complete_sets, 1);
        assert_eq!(summary.experiments[0].partial_sets, 0);
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(single_set_config(140)).unwrap();
        let tray = value["tray_locations"].as_array().unwrap();
        assert_eq!(tray.len(), TRAY_LOCATIONS);
        assert!(tray[0].is_null());
        assert_eq!(tray[4]["reagent_code"], "KR11E");
        assert_eq!(value["results"]["11"]["total_tests"], 140);
        assert_eq!(value["results"]["11"]["sets"][0]["tests_per_set"], 140);
    }
}
