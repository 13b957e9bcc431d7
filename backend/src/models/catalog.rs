//! Experiment catalog
//!
//! An immutable table of experiments and the reagents each one consumes per
//! test. The catalog is injected into the optimizer and never mutated; the
//! table used by the bench instrument is available as
//! [`Catalog::default_catalog`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Experiment identifier as listed in the catalog
pub type ExperimentId = u32;

/// Errors raised while building or loading a catalog
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("Duplicate experiment id {0}")]
    DuplicateExperiment(ExperimentId),

    #[error("Experiment {0} has an empty name")]
    EmptyName(ExperimentId),

    #[error("Experiment {experiment_id} lists reagent '{code}' more than once")]
    DuplicateReagent {
        experiment_id: ExperimentId,
        code: String,
    },

    #[error("Reagent '{code}' of experiment {experiment_id} must use a positive volume per test")]
    NonPositiveVolume {
        experiment_id: ExperimentId,
        code: String,
    },

    #[error("Catalog parse error: {0}")]
    Parse(String),
}

/// A reagent consumed by an experiment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reagent {
    /// Reagent code, unique within its experiment (e.g. "KR1E")
    pub code: String,

    /// Volume drawn per test, in microlitres
    pub volume_per_test_ul: u32,
}

impl Reagent {
    pub fn new(code: impl Into<String>, volume_per_test_ul: u32) -> Self {
        Self {
            code: code.into(),
            volume_per_test_ul,
        }
    }
}

/// An experiment and the reagents one test run draws from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: ExperimentId,
    pub name: String,
    /// Reagents in catalog order; order only breaks ties
    pub reagents: Vec<Reagent>,
}

impl Experiment {
    pub fn new(id: ExperimentId, name: impl Into<String>, reagents: Vec<Reagent>) -> Self {
        Self {
            id,
            name: name.into(),
            reagents,
        }
    }

    /// Locations one complete set of this experiment occupies
    pub fn chambers_per_set(&self) -> usize {
        self.reagents.len()
    }

    /// Largest per-test volume among the reagents (0 when there are none)
    pub fn max_volume_ul(&self) -> u32 {
        self.reagents
            .iter()
            .map(|r| r.volume_per_test_ul)
            .max()
            .unwrap_or(0)
    }
}

/// Catalog listing entry consumed by selection controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub id: ExperimentId,
    pub name: String,
}

/// On-disk catalog layout
#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    experiments: Vec<Experiment>,
}

/// Immutable experiment table keyed by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    experiments: BTreeMap<ExperimentId, Experiment>,
}

impl Catalog {
    /// Build a catalog, validating ids, names, reagent codes and volumes
    pub fn new(experiments: Vec<Experiment>) -> Result<Self, CatalogError> {
        let mut table = BTreeMap::new();

        for experiment in experiments {
            if experiment.name.trim().is_empty() {
                return Err(CatalogError::EmptyName(experiment.id));
            }

            let mut codes = HashSet::new();
            for reagent in &experiment.reagents {
                if reagent.volume_per_test_ul == 0 {
                    return Err(CatalogError::NonPositiveVolume {
                        experiment_id: experiment.id,
                        code: reagent.code.clone(),
                    });
                }
                if !codes.insert(reagent.code.as_str()) {
                    return Err(CatalogError::DuplicateReagent {
                        experiment_id: experiment.id,
                        code: reagent.code.clone(),
                    });
                }
            }

            let id = experiment.id;
            if table.insert(id, experiment).is_some() {
                return Err(CatalogError::DuplicateExperiment(id));
            }
        }

        Ok(Self { experiments: table })
    }

    /// Parse a catalog from `{"experiments": [...]}` JSON
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(file.experiments)
    }

    /// Serialize to the same layout [`Catalog::from_json_str`] reads
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        let file = CatalogFile {
            experiments: self.experiments.values().cloned().collect(),
        };
        serde_json::to_string_pretty(&file)
    }

    pub fn get(&self, id: ExperimentId) -> Option<&Experiment> {
        self.experiments.get(&id)
    }

    pub fn contains(&self, id: ExperimentId) -> bool {
        self.experiments.contains_key(&id)
    }

    /// Experiments in ascending id order
    pub fn experiments(&self) -> impl Iterator<Item = &Experiment> {
        self.experiments.values()
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// `{id, name}` listing in ascending id order
    pub fn available_experiments(&self) -> Vec<ExperimentSummary> {
        self.experiments
            .values()
            .map(|e| ExperimentSummary {
                id: e.id,
                name: e.name.clone(),
            })
            .collect()
    }

    /// The 16-experiment photometer reagent table
    pub fn default_catalog() -> Self {
        fn exp(id: ExperimentId, name: &str, reagents: &[(&str, u32)]) -> Experiment {
            Experiment::new(
                id,
                name,
                reagents
                    .iter()
                    .map(|(code, vol)| Reagent::new(*code, *vol))
                    .collect(),
            )
        }

        let experiments = vec![
            exp(1, "Copper (II) (LR)", &[("KR1E", 850), ("KR1S", 300)]),
            exp(2, "Lead (II) Cadmium (II)", &[("KR1E", 850), ("KR2S", 400)]),
            exp(3, "Arsenic (III)", &[("KR3E", 850), ("KR3S", 400)]),
            exp(4, "Nitrates-N (LR)", &[("KR4E", 850), ("KR4S", 300)]),
            exp(5, "Chromium (VI) (LR)", &[("KR5E", 500), ("KR5S", 400)]),
            exp(
                6,
                "Manganese (II) (LR)",
                &[("KR6E1", 500), ("KR6E2", 500), ("KR6E3", 300)],
            ),
            exp(7, "Boron (Dissolved)", &[("KR7E1", 1100), ("KR7E2", 1860)]),
            exp(8, "Silica (Dissolved)", &[("KR8E1", 500), ("KR8E2", 1600)]),
            exp(9, "Free Chlorine", &[("KR9E1", 1000), ("KR9E2", 1000)]),
            exp(
                10,
                "Total Hardness",
                &[("KR10E1", 1000), ("KR10E2", 1000), ("KR10E3", 1600)],
            ),
            exp(11, "Total Alkalinity (LR)", &[("KR11E", 1000)]),
            exp(
                12,
                "Orthophosphates-P (LR)",
                &[("KR12E1", 500), ("KR12E2", 500), ("KR12E3", 200)],
            ),
            exp(13, "Mercury (II)", &[("KR13E1", 850), ("KR13S", 300)]),
            exp(14, "Selenium (IV)", &[("KR14E", 500), ("KR14S", 300)]),
            exp(15, "Zinc (II) (LR)", &[("KR15E", 850), ("KR15S", 400)]),
            exp(
                16,
                "Iron (Dissolved)",
                &[
                    ("KR16E1", 1000),
                    ("KR16E2", 1000),
                    ("KR16E3", 1000),
                    ("KR16E4", 1000),
                ],
            ),
        ];

        Self {
            experiments: experiments.into_iter().map(|e| (e.id, e)).collect(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}
