//! Set composition
//!
//! Groups one experiment's placements into sets. Placements are bucketed by
//! reagent code and each bucket is ordered by descending `tests_possible`
//! (then ascending location); round `i` takes the `i`-th placement of every
//! reagent. Pairing strong chambers with strong chambers maximizes the sum
//! of set minima.
//!
//! Rounds missing a reagent are partial sets: reported with
//! `tests_per_set = 0` and `complete = false`, never counted.

use crate::allocation::layout::Tray;
use crate::allocation::metrics::{evaluate, set_yield};
use crate::core::capacity::{capacity_ml, tests_possible};
use crate::models::catalog::{Catalog, Experiment, ExperimentId};
use crate::models::configuration::{Configuration, ReagentSet};
use crate::models::placement::Placement;
use crate::optimizer::OptimizerError;
use std::collections::{BTreeMap, BTreeSet};

/// Sets built for one experiment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedSets {
    /// Complete sets, then partial sets
    pub sets: Vec<ReagentSet>,
    /// Placements that ended up in partial sets
    pub leftover: usize,
}

/// Group an experiment's placements into sets
///
/// # Errors
///
/// `InvariantViolation` if a placement belongs to another experiment or
/// names a reagent code the experiment does not use.
pub fn compose_sets(
    experiment: &Experiment,
    placements: &[&Placement],
) -> Result<ComposedSets, OptimizerError> {
    let mut buckets: Vec<Vec<&Placement>> = vec![Vec::new(); experiment.reagents.len()];

    for placement in placements {
        if placement.experiment_id != experiment.id {
            return Err(OptimizerError::InvariantViolation(format!(
                "placement at location {} belongs to experiment {}, not {}",
                placement.location, placement.experiment_id, experiment.id
            )));
        }
        let index = experiment
            .reagents
            .iter()
            .position(|r| r.code == placement.reagent_code)
            .ok_or_else(|| {
                OptimizerError::InvariantViolation(format!(
                    "reagent '{}' at location {} is not part of experiment {}",
                    placement.reagent_code, placement.location, experiment.id
                ))
            })?;
        buckets[index].push(placement);
    }

    for bucket in &mut buckets {
        bucket.sort_by(|a, b| {
            b.tests_possible
                .cmp(&a.tests_possible)
                .then(a.location.cmp(&b.location))
        });
    }

    let rounds = buckets.iter().map(Vec::len).max().unwrap_or(0);
    let mut complete = Vec::new();
    let mut partial = Vec::new();
    let mut leftover = 0;

    for round in 0..rounds {
        let members: Vec<Placement> = buckets
            .iter()
            .filter_map(|bucket| bucket.get(round).map(|p| (*p).clone()))
            .collect();

        if members.len() == experiment.reagents.len() {
            complete.push(ReagentSet {
                tests_per_set: set_yield(&members),
                placements: members,
                complete: true,
            });
        } else {
            leftover += members.len();
            partial.push(ReagentSet {
                placements: members,
                tests_per_set: 0,
                complete: false,
            });
        }
    }

    complete.extend(partial);
    Ok(ComposedSets {
        sets: complete,
        leftover,
    })
}

/// Compose sets, rejecting any placement left outside a complete set
///
/// Used on the allocation path, where every seated chamber must be
/// productive.
pub fn compose_complete_sets(
    experiment: &Experiment,
    placements: &[&Placement],
) -> Result<Vec<ReagentSet>, OptimizerError> {
    let composed = compose_sets(experiment, placements)?;
    if composed.leftover > 0 {
        return Err(OptimizerError::IncompleteSet {
            experiment_id: experiment.id,
            leftover: composed.leftover,
        });
    }
    Ok(composed.sets)
}

/// Whether partial sets are tolerated while deriving results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    /// Reject leftovers with `IncompleteSet`
    Strict,
    /// Report leftovers as zero-credit partial sets
    Lenient,
}

/// Rebuild a configuration's results from its tray
///
/// Results are produced for every id in `experiment_ids` and every
/// experiment seated on the tray.
///
/// # Errors
///
/// - `UnknownExperiment` for an id missing from the catalog
/// - `InvariantViolation` for misplaced or inconsistent placements
/// - `IncompleteSet` under [`Completeness::Strict`]
pub fn derive_configuration(
    catalog: &Catalog,
    tray: Tray,
    experiment_ids: impl IntoIterator<Item = ExperimentId>,
    completeness: Completeness,
) -> Result<Configuration, OptimizerError> {
    for (index, slot) in tray.iter().enumerate() {
        if let Some(placement) = slot {
            if placement.location != index {
                return Err(OptimizerError::InvariantViolation(format!(
                    "placement recorded at location {} is stored in slot {}",
                    placement.location, index
                )));
            }
            if placement.capacity_ml != capacity_ml(index)
                || placement.tests_possible
                    != tests_possible(placement.volume_per_test_ul, placement.capacity_ml)
            {
                return Err(OptimizerError::InvariantViolation(format!(
                    "placement at location {} has stale capacity or test count",
                    index
                )));
            }
        }
    }

    let mut ids: BTreeSet<ExperimentId> = experiment_ids.into_iter().collect();
    ids.extend(tray.iter().flatten().map(|p| p.experiment_id));

    let mut results = BTreeMap::new();
    for id in ids {
        let experiment = catalog
            .get(id)
            .ok_or(OptimizerError::UnknownExperiment(id))?;
        let placements: Vec<&Placement> = tray
            .iter()
            .flatten()
            .filter(|p| p.experiment_id == id)
            .collect();

        let sets = match completeness {
            Completeness::Strict => compose_complete_sets(experiment, &placements)?,
            Completeness::Lenient => compose_sets(experiment, &placements)?.sets,
        };
        results.insert(id, evaluate(&experiment.name, sets));
    }

    Ok(Configuration {
        tray_locations: tray,
        results,
    })
}
