//! Tray-life metrics
//!
//! `total_tests` of an experiment is the sum of its complete sets' yields;
//! the tray life is the smallest `total_tests` across experiments.

use crate::models::catalog::ExperimentId;
use crate::models::configuration::{ExperimentResult, ReagentSet};
use crate::models::placement::Placement;
use std::collections::BTreeMap;

/// Yield of a set: the smallest `tests_possible` among its placements
pub fn set_yield<'a>(placements: impl IntoIterator<Item = &'a Placement>) -> u64 {
    placements
        .into_iter()
        .map(|p| p.tests_possible)
        .min()
        .unwrap_or(0)
}

/// Sum of `tests_per_set` over complete sets
pub fn total_tests(sets: &[ReagentSet]) -> u64 {
    sets.iter()
        .filter(|s| s.complete)
        .map(|s| s.tests_per_set)
        .sum()
}

/// Assemble an experiment's result from its composed sets
pub fn evaluate(name: &str, sets: Vec<ReagentSet>) -> ExperimentResult {
    let total_tests = total_tests(&sets);
    ExperimentResult {
        name: name.to_string(),
        sets,
        total_tests,
    }
}

/// Smallest `total_tests` across results; `None` when there are none
pub fn tray_life(results: &BTreeMap<ExperimentId, ExperimentResult>) -> Option<u64> {
    results.values().map(|r| r.total_tests).min()
}

/// Experiments whose `total_tests` equals the tray life
pub fn bottlenecks(results: &BTreeMap<ExperimentId, ExperimentResult>) -> Vec<ExperimentId> {
    match tray_life(results) {
        Some(life) => results
            .iter()
            .filter(|(_, r)| r.total_tests == life)
            .map(|(id, _)| *id)
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::Reagent;

    fn set(tests: u64, complete: bool) -> ReagentSet {
        ReagentSet {
            placements: Vec::new(),
            tests_per_set: tests,
            complete,
        }
    }

    #[test]
    fn test_partial_sets_do_not_count() {
        let sets = vec![set(317, true), set(164, true), set(0, false)];
        assert_eq!(total_tests(&sets), 481);
    }

    #[test]
    fn test_set_yield_is_minimum() {
        let a = Placement::new(0, 1, &Reagent::new("KR1E", 850));
        let b = Placement::new(5, 1, &Reagent::new("KR1S", 300));
        assert_eq!(set_yield([&a, &b]), 317);
    }

    #[test]
    fn test_tray_life_and_bottlenecks() {
        let mut results = BTreeMap::new();
        results.insert(1, evaluate("A", vec![set(300, true)]));
        results.insert(2, evaluate("B", vec![set(200, true), set(100, true)]));
        results.insert(3, evaluate("C", vec![set(500, true)]));
        assert_eq!(tray_life(&results), Some(300));
        assert_eq!(bottlenecks(&results), vec![1, 2]);
        assert_eq!(tray_life(&BTreeMap::new()), None);
    }
}
