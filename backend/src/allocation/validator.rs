//! Feasibility validation of an experiment selection
//!
//! Two preconditions gate every optimization:
//! 1. Every selected id exists in the catalog (checked first)
//! 2. One complete set of every selected experiment fits on the tray

use crate::core::capacity::TRAY_LOCATIONS;
use crate::models::catalog::{Catalog, Experiment, ExperimentId};
use crate::optimizer::OptimizerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Chambers one experiment needs for a single complete set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChamberRequirement {
    pub experiment_id: ExperimentId,
    pub name: String,
    pub chambers: usize,
}

/// Render a breakdown as `"Name (#id): n, ..."` for error messages
pub fn describe_breakdown(breakdown: &[ChamberRequirement]) -> String {
    breakdown
        .iter()
        .map(|r| format!("{} (#{}): {}", r.name, r.experiment_id, r.chambers))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve and validate a selection
///
/// Returns the selected experiments in ascending id order.
///
/// # Errors
///
/// - `UnknownExperiment` for the lowest id missing from the catalog
/// - `CapacityExceeded` when the summed reagent counts exceed 16, carrying
///   every selected experiment's chamber count
pub fn validate_selection<'a>(
    catalog: &'a Catalog,
    selected: &BTreeSet<ExperimentId>,
) -> Result<Vec<&'a Experiment>, OptimizerError> {
    let experiments = selected
        .iter()
        .map(|id| catalog.get(*id).ok_or(OptimizerError::UnknownExperiment(*id)))
        .collect::<Result<Vec<_>, _>>()?;

    let required: usize = experiments.iter().map(|e| e.chambers_per_set()).sum();
    if required > TRAY_LOCATIONS {
        return Err(OptimizerError::CapacityExceeded {
            required,
            limit: TRAY_LOCATIONS,
            breakdown: experiments
                .iter()
                .map(|e| ChamberRequirement {
                    experiment_id: e.id,
                    name: e.name.clone(),
                    chambers: e.chambers_per_set(),
                })
                .collect(),
        });
    }

    Ok(experiments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(ids: &[ExperimentId]) -> BTreeSet<ExperimentId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_unknown_experiment_reported_before_capacity() {
        let catalog = Catalog::default_catalog();
        let err = validate_selection(&catalog, &select(&[6, 10, 12, 16, 99])).unwrap_err();
        assert_eq!(err, OptimizerError::UnknownExperiment(99));
    }

    #[test]
    fn test_exactly_sixteen_slots_is_feasible() {
        let catalog = Catalog::default_catalog();
        // 4 + 3 + 3 + 3 + 2 + 1 = 16
        let experiments = validate_selection(&catalog, &select(&[16, 6, 10, 12, 1, 11])).unwrap();
        let ids: Vec<_> = experiments.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 6, 10, 11, 12, 16]);
    }

    #[test]
    fn test_seventeen_slots_exceeds_capacity() {
        let catalog = Catalog::default_catalog();
        // 4 + 3 + 3 + 3 + 2 + 2 = 17
        let err = validate_selection(&catalog, &select(&[16, 6, 10, 12, 1, 2])).unwrap_err();
        match err {
            OptimizerError::CapacityExceeded {
                required,
                limit,
                breakdown,
            } => {
                assert_eq!(required, 17);
                assert_eq!(limit, 16);
                assert_eq!(breakdown.len(), 6);
                let chambers: Vec<_> = breakdown.iter().map(|r| r.chambers).collect();
                assert_eq!(chambers, vec![2, 2, 3, 3, 3, 4]);
            }
            other => panic!("expected CapacityExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_describe_breakdown() {
        let text = describe_breakdown(&[ChamberRequirement {
            experiment_id: 16,
            name: "Iron (Dissolved)".to_string(),
            chambers: 4,
        }]);
        assert_eq!(text, "Iron (Dissolved) (#16): 4");
    }
}
