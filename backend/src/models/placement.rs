//! Reagent placements on tray locations

use crate::core::capacity::{capacity_ml, tests_possible, CapacityClass};
use crate::models::catalog::{ExperimentId, Reagent};
use serde::{Deserialize, Serialize};

/// One reagent seated in one tray location
///
/// `capacity_ml` and `tests_possible` are derived from `location`; use
/// [`Placement::relocated`] to move a placement so they stay consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Tray location index (0-15)
    pub location: usize,

    /// Experiment this reagent is seated for
    pub experiment_id: ExperimentId,

    /// Reagent code within the experiment
    pub reagent_code: String,

    /// Volume drawn per test (µL)
    pub volume_per_test_ul: u32,

    /// Chamber capacity of `location` (mL)
    pub capacity_ml: u32,

    /// `floor(capacity_ml * 1000 / volume_per_test_ul)`
    pub tests_possible: u64,
}

impl Placement {
    pub fn new(location: usize, experiment_id: ExperimentId, reagent: &Reagent) -> Self {
        let capacity = capacity_ml(location);
        Self {
            location,
            experiment_id,
            reagent_code: reagent.code.clone(),
            volume_per_test_ul: reagent.volume_per_test_ul,
            capacity_ml: capacity,
            tests_possible: tests_possible(reagent.volume_per_test_ul, capacity),
        }
    }

    /// The same reagent moved to another location, with capacity and
    /// test count recomputed for the new chamber
    pub fn relocated(&self, location: usize) -> Self {
        let capacity = capacity_ml(location);
        Self {
            location,
            experiment_id: self.experiment_id,
            reagent_code: self.reagent_code.clone(),
            volume_per_test_ul: self.volume_per_test_ul,
            capacity_ml: capacity,
            tests_possible: tests_possible(self.volume_per_test_ul, capacity),
        }
    }

    pub fn capacity_class(&self) -> CapacityClass {
        CapacityClass::of_location(self.location)
    }

    /// True when the derived fields agree with the location and volume
    pub fn is_consistent(&self) -> bool {
        self.capacity_ml == capacity_ml(self.location)
            && self.tests_possible == tests_possible(self.volume_per_test_ul, self.capacity_ml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_placement_derives_capacity() {
        let reagent = Reagent::new("KR1E", 850);
        let large = Placement::new(2, 1, &reagent);
        assert_eq!(large.capacity_ml, 270);
        assert_eq!(large.tests_possible, 317);

        let small = Placement::new(9, 1, &reagent);
        assert_eq!(small.capacity_ml, 140);
        assert_eq!(small.tests_possible, 164);
    }

    #[test]
    fn test_relocated_recomputes_tests() {
        let placement = Placement::new(0, 11, &Reagent::new("KR11E", 1000));
        let moved = placement.relocated(12);
        assert_eq!(moved.tests_possible, 140);
        assert_eq!(moved.relocated(0), placement);
        assert!(moved.is_consistent());
    }
}
