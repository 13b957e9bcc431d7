//! End-to-end tests for TrayOptimizer::optimize
//!
//! CRITICAL: Results are deterministic and every seated location belongs to
//! exactly one complete set.

use reagent_tray_core_rs::{
    capacity_ml, tests_possible, validate_configuration, Catalog, Configuration, Experiment,
    OptimizerConfig, OptimizerError, Reagent, SearchStrategy, TrayOptimizer,
};
use std::collections::HashSet;

// ============================================================================
// Test Helpers
// ============================================================================

fn optimizer() -> TrayOptimizer {
    TrayOptimizer::default()
}

fn greedy_optimizer() -> TrayOptimizer {
    TrayOptimizer::new(
        Catalog::default_catalog(),
        OptimizerConfig {
            strategy: SearchStrategy::Greedy,
            ..OptimizerConfig::default()
        },
    )
}

fn assert_tray_invariants(config: &Configuration) {
    validate_configuration(config, &Catalog::default_catalog()).unwrap();

    let mut seen = HashSet::new();
    for result in config.results.values() {
        for set in &result.sets {
            assert!(set.complete, "optimizer produced a partial set");
            for placement in &set.placements {
                assert!(seen.insert(placement.location));
                assert_eq!(placement.capacity_ml, capacity_ml(placement.location));
                assert_eq!(
                    placement.tests_possible,
                    tests_possible(placement.volume_per_test_ul, placement.capacity_ml)
                );
            }
        }
    }
    assert_eq!(seen.len(), config.locations_used());
}

// ============================================================================
// Single Experiments
// ============================================================================

#[test]
fn test_total_alkalinity_alone() {
    let config = optimizer().optimize(&[11]).unwrap();

    // 4 large chambers at 270 tests, 12 small at 140
    let result = &config.results[&11];
    assert_eq!(result.total_tests, 2760);
    assert_eq!(result.sets.len(), 16);
    assert_eq!(config.tray_life(), Some(2760));
    assert_eq!(config.locations_used(), 16);
    assert!(config.is_viable());
    assert_tray_invariants(&config);
}

#[test]
fn test_copper_gets_large_chambers_for_high_volume_reagent() {
    let config = optimizer().optimize(&[1]).unwrap();

    // 4 sets at 317 (KR1E in 270 mL) + 4 sets at 164
    assert_eq!(config.tray_life(), Some(1924));
    for location in 0..4 {
        let placement = config.tray_locations[location].as_ref().unwrap();
        assert_eq!(placement.reagent_code, "KR1E");
        assert_eq!(placement.tests_possible, 317);
    }
    assert_tray_invariants(&config);
}

#[test]
fn test_sets_reported_strongest_first() {
    let config = optimizer().optimize(&[1]).unwrap();
    let tests: Vec<u64> = config.results[&1]
        .sets
        .iter()
        .map(|s| s.tests_per_set)
        .collect();

    let mut sorted = tests.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(tests, sorted);
}

#[test]
fn test_total_hardness_leaves_one_location_free() {
    let config = optimizer().optimize(&[10]).unwrap();

    // 5 sets of 3 reagents; KR10E3 (1600 uL) is upgraded in 4 of them
    assert_eq!(config.tray_life(), Some(647));
    assert_eq!(config.locations_used(), 15);
    assert_tray_invariants(&config);
}

// ============================================================================
// Multiple Experiments
// ============================================================================

#[test]
fn test_iron_and_alkalinity_max_min() {
    let config = optimizer().optimize(&[16, 11]).unwrap();

    // Iron: one all-large set (270) + two small sets (140 each) = 550
    // Alkalinity only needs 4 small sets (560) to stay above that
    assert_eq!(config.tray_life(), Some(550));
    assert_eq!(config.results[&16].total_tests, 550);
    assert_eq!(config.results[&11].sets.len(), 4);
    assert_tray_invariants(&config);
}

#[test]
fn test_copper_and_iron_overflow_small_chambers() {
    let config = optimizer().optimize(&[1, 16]).unwrap();

    // Iron takes 12 chambers, Copper 4; only 12 are small, so 4 large
    // chambers must hold reagents whatever they add
    assert_eq!(config.tray_life(), Some(420));
    assert_eq!(config.locations_used(), 16);
    assert_tray_invariants(&config);
}

#[test]
fn test_three_way_selections_seat_fully() {
    assert_eq!(optimizer().optimize(&[1, 5, 9]).unwrap().tray_life(), Some(560));
    assert_eq!(optimizer().optimize(&[1, 3, 14]).unwrap().tray_life(), Some(645));
}

#[test]
fn test_every_pair_seats_under_each_strategy() {
    let tight = TrayOptimizer::new(
        Catalog::default_catalog(),
        OptimizerConfig {
            strategy: SearchStrategy::Exact,
            max_expansions: 1,
        },
    );
    for a in 1..=16 {
        for b in (a + 1)..=16 {
            for engine in [optimizer(), greedy_optimizer(), tight.clone()] {
                let config = engine
                    .optimize(&[a, b])
                    .unwrap_or_else(|e| panic!("[{}, {}] failed: {}", a, b, e));
                assert_tray_invariants(&config);
            }
        }
    }
}

#[test]
fn test_tray_life_is_minimum_over_experiments() {
    let config = optimizer().optimize(&[1, 5, 9]).unwrap();
    let min = config.results.values().map(|r| r.total_tests).min();
    assert_eq!(config.tray_life(), min);
    assert_tray_invariants(&config);
}

#[test]
fn test_order_of_ids_does_not_matter() {
    let a = optimizer().optimize(&[3, 7, 12]).unwrap();
    let b = optimizer().optimize(&[12, 3, 7]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_optimize_is_deterministic() {
    let first = optimizer().optimize(&[2, 6, 13, 14]).unwrap();
    for _ in 0..3 {
        assert_eq!(optimizer().optimize(&[2, 6, 13, 14]).unwrap(), first);
    }
}

#[test]
fn test_greedy_never_beats_exact() {
    for selection in [vec![16, 11], vec![1, 10], vec![7, 8, 9], vec![4, 6, 12, 15]] {
        let exact = optimizer().optimize(&selection).unwrap();
        let greedy = greedy_optimizer().optimize(&selection).unwrap();
        assert!(greedy.tray_life() <= exact.tray_life());
        assert_tray_invariants(&greedy);
    }
}

#[test]
fn test_exhausted_budget_still_returns_valid_tray() {
    let tight = TrayOptimizer::new(
        Catalog::default_catalog(),
        OptimizerConfig {
            strategy: SearchStrategy::Exact,
            max_expansions: 1,
        },
    );
    let config = tight.optimize(&[1, 6, 10]).unwrap();
    assert_tray_invariants(&config);
    assert!(config.tray_life() <= optimizer().optimize(&[1, 6, 10]).unwrap().tray_life());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_capacity_exceeded_at_17_chambers() {
    let err = optimizer().optimize(&[16, 6, 10, 12, 1, 2]).unwrap_err();

    match err {
        OptimizerError::CapacityExceeded {
            required,
            limit,
            breakdown,
        } => {
            assert_eq!(required, 17);
            assert_eq!(limit, 16);
            let ids: Vec<u32> = breakdown.iter().map(|r| r.experiment_id).collect();
            assert_eq!(ids, vec![1, 2, 6, 10, 12, 16]);
            assert_eq!(breakdown.iter().map(|r| r.chambers).sum::<usize>(), 17);
        }
        other => panic!("expected CapacityExceeded, got {:?}", other),
    }
}

#[test]
fn test_exactly_16_chambers_fits() {
    // 4 + 3 + 3 + 2 + 2 + 2 = 16: one set each, nothing to spare
    let config = optimizer().optimize(&[16, 6, 10, 1, 2, 3]).unwrap();
    assert_eq!(config.locations_used(), 16);
    for result in config.results.values() {
        assert_eq!(result.sets.len(), 1);
    }
    assert_tray_invariants(&config);
}

#[test]
fn test_unknown_experiment_checked_first() {
    let err = optimizer()
        .optimize(&[99, 16, 6, 10, 12, 1, 2])
        .unwrap_err();
    assert_eq!(err, OptimizerError::UnknownExperiment(99));
}

#[test]
fn test_experiment_without_reagents_is_infeasible() {
    let catalog = Catalog::new(vec![
        Experiment::new(1, "Blank", vec![]),
        Experiment::new(2, "Water", vec![Reagent::new("W", 500)]),
    ])
    .unwrap();
    let optimizer = TrayOptimizer::new(catalog, OptimizerConfig::default());

    let err = optimizer.optimize(&[1, 2]).unwrap_err();
    assert_eq!(
        err,
        OptimizerError::NoFeasibleConfiguration {
            experiment_id: 1,
            name: "Blank".to_string()
        }
    );
}

#[test]
fn test_empty_selection_yields_empty_tray() {
    let config = optimizer().optimize(&[]).unwrap();
    assert_eq!(config.locations_used(), 0);
    assert!(config.results.is_empty());
    assert_eq!(config.tray_life(), None);
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_serialized_shape() {
    let config = optimizer().optimize(&[10]).unwrap();
    let value = serde_json::to_value(&config).unwrap();

    let tray = value["tray_locations"].as_array().unwrap();
    assert_eq!(tray.len(), 16);
    assert_eq!(tray.iter().filter(|slot| slot.is_null()).count(), 1);

    let result = &value["results"]["10"];
    assert_eq!(result["name"], "Total Hardness");
    assert_eq!(result["total_tests"], 647);
    let first_set = &result["sets"][0];
    assert_eq!(first_set["complete"], true);
    assert_eq!(first_set["placements"].as_array().unwrap().len(), 3);
    assert!(first_set["tests_per_set"].is_u64());
}

#[test]
fn test_json_round_trip() {
    let config = optimizer().optimize(&[2, 9, 14]).unwrap();
    let json = serde_json::to_string(&config).unwrap();
    let restored: Configuration = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, config);
}
