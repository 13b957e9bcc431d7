//! Physical seating of an allocation plan
//!
//! Large chambers are handed out from location 0 upward and small chambers
//! from location 4 upward, experiment by experiment in priority order, set
//! by set, reagent by reagent in catalog order. Within a set the reagents
//! ranked first by [`upgrade_order`] take the set's large chambers.

use crate::allocation::options::{is_upgraded, upgrade_order};
use crate::allocation::search::AllocationPlan;
use crate::core::capacity::{CapacityClass, TRAY_LOCATIONS};
use crate::models::catalog::Catalog;
use crate::models::placement::Placement;
use crate::optimizer::OptimizerError;

/// Tray contents indexed by location
pub type Tray = [Option<Placement>; TRAY_LOCATIONS];

/// Turn a plan into concrete placements
///
/// # Errors
///
/// - `UnknownExperiment` if the plan names an id missing from the catalog
/// - `InvariantViolation` if the plan needs more chambers of a class than
///   the tray has
pub fn seat_plan(plan: &AllocationPlan, catalog: &Catalog) -> Result<Tray, OptimizerError> {
    let mut tray: Tray = Default::default();
    let mut large = CapacityClass::Large.locations();
    let mut small = CapacityClass::Small.locations();

    for allocation in &plan.allocations {
        let experiment = catalog
            .get(allocation.experiment_id)
            .ok_or(OptimizerError::UnknownExperiment(allocation.experiment_id))?;
        let order = upgrade_order(experiment);

        for &large_in_set in &allocation.large_per_set {
            for (index, reagent) in experiment.reagents.iter().enumerate() {
                let (pool, class) = if is_upgraded(&order, index, large_in_set) {
                    (&mut large, "large")
                } else {
                    (&mut small, "small")
                };
                let location = pool.next().ok_or_else(|| {
                    OptimizerError::InvariantViolation(format!(
                        "plan for experiment {} needs more {} chambers than the tray holds",
                        experiment.id, class
                    ))
                })?;
                tray[location] = Some(Placement::new(location, experiment.id, reagent));
            }
        }
    }

    Ok(tray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::search::{allocate, SearchStrategy};

    #[test]
    fn test_seating_uses_large_chambers_for_bottleneck() {
        let catalog = Catalog::default_catalog();
        let copper = catalog.get(1).unwrap();
        let plan = allocate(&[copper], SearchStrategy::Exact, 100_000).unwrap();
        let tray = seat_plan(&plan, &catalog).unwrap();

        for location in 0..4 {
            let placement = tray[location].as_ref().unwrap();
            assert_eq!(placement.reagent_code, "KR1E");
            assert_eq!(placement.tests_possible, 317);
        }
        assert_eq!(tray.iter().flatten().count(), 16);
    }

    #[test]
    fn test_seating_respects_location_indices() {
        let catalog = Catalog::default_catalog();
        let experiments: Vec<_> = [7, 9, 14].iter().map(|id| catalog.get(*id).unwrap()).collect();
        let plan = allocate(&experiments, SearchStrategy::Exact, 100_000).unwrap();
        let tray = seat_plan(&plan, &catalog).unwrap();
        for (index, slot) in tray.iter().enumerate() {
            if let Some(placement) = slot {
                assert_eq!(placement.location, index);
                assert!(placement.is_consistent());
            }
        }
    }

    #[test]
    fn test_small_pool_overflow_uses_spare_large_chambers() {
        // Copper + Iron fill all 16 chambers: 12 small and 4 large
        let catalog = Catalog::default_catalog();
        let experiments: Vec<_> = [1, 16].iter().map(|id| catalog.get(*id).unwrap()).collect();
        let plan = allocate(&experiments, SearchStrategy::Exact, 100_000).unwrap();
        assert_eq!(plan.locations_used, 16);
        assert_eq!(plan.large_used, 4);

        let tray = seat_plan(&plan, &catalog).unwrap();
        assert_eq!(tray.iter().flatten().count(), 16);
    }
}
