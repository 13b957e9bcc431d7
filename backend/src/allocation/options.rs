//! Per-experiment allocation options
//!
//! An experiment's share of the tray is described by two numbers: how many
//! complete sets it receives and how many of those sets' chambers are large.
//! This module tabulates, for every such pair, the best `total_tests` the
//! experiment can reach and how the large chambers are spread across sets.
//!
//! # Within one set
//!
//! A set yields the minimum test count over its reagents, so a large chamber
//! only helps the reagent that is currently the bottleneck. With `k` large
//! chambers the best set upgrades the `k` highest-volume reagents:
//!
//! ```text
//! set_yield(k) = min( min over top-k of tests(v, 270),
//!                     min over the rest of tests(v, 140) )
//! ```
//!
//! `set_yield` is non-decreasing in `k`.
//!
//! # Across sets
//!
//! A small knapsack spreads at most `L` large chambers over `s` sets to
//! maximize the sum of set yields. The table records the fewest large
//! chambers that reach each optimum.
//!
//! # Chamber pools
//!
//! The tray has 4 large and 12 small chambers. An option states exactly how
//! many of its chambers come from each pool. Large chambers beyond the
//! useful minimum still hold a reagent (they never lower a yield), which
//! lets a selection overflow the small pool into spare large chambers.

use crate::core::capacity::{tests_in_class, CapacityClass, LARGE_LOCATIONS, TRAY_LOCATIONS};
use crate::models::catalog::{Experiment, ExperimentId};

/// Reagent indices in the order they are moved into large chambers:
/// descending volume, ties in catalog order
pub fn upgrade_order(experiment: &Experiment) -> Vec<usize> {
    let mut order: Vec<usize> = (0..experiment.reagents.len()).collect();
    order.sort_by(|&a, &b| {
        experiment.reagents[b]
            .volume_per_test_ul
            .cmp(&experiment.reagents[a].volume_per_test_ul)
            .then(a.cmp(&b))
    });
    order
}

/// Whether reagent `index` takes a large chamber in a set granted
/// `large_in_set` of them, given the experiment's [`upgrade_order`]
pub fn is_upgraded(order: &[usize], index: usize, large_in_set: usize) -> bool {
    order
        .iter()
        .position(|&i| i == index)
        .is_some_and(|rank| rank < large_in_set)
}

/// Best use of a fixed number of sets and large chambers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPlan {
    /// Summed yield of all sets
    pub total_tests: u64,
    /// Large chambers actually consumed
    pub large_used: usize,
    /// Large chambers per set, descending
    pub large_per_set: Vec<usize>,
}

/// A candidate share of the tray for one experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocOption {
    pub sets: usize,
    /// Chambers taken from the large pool
    pub large: usize,
    /// All chambers taken, `sets * chambers_per_set`
    pub locations: usize,
    pub total_tests: u64,
}

impl AllocOption {
    /// Chambers taken from the small pool
    pub fn small(&self) -> usize {
        self.locations - self.large
    }
}

/// Option table for one experiment
#[derive(Debug, Clone)]
pub struct ExperimentOptions {
    experiment_id: ExperimentId,
    chambers_per_set: usize,
    /// Reagent indices by descending volume, ties in catalog order
    upgrade_order: Vec<usize>,
    /// `set_yield[k]` for `k` in `0..=chambers_per_set`
    set_yield: Vec<u64>,
    /// `plans[s][l]`: best plan for `s` sets with at most `l` large chambers
    plans: Vec<Vec<SetPlan>>,
}

impl ExperimentOptions {
    /// Tabulate the options of an experiment
    ///
    /// Returns `None` for an experiment without reagents, which can never
    /// form a set.
    pub fn build(experiment: &Experiment) -> Option<Self> {
        let n = experiment.chambers_per_set();
        if n == 0 {
            return None;
        }

        let upgrade_order = upgrade_order(experiment);

        let set_yield: Vec<u64> = (0..=n)
            .map(|k| {
                upgrade_order
                    .iter()
                    .enumerate()
                    .map(|(rank, &idx)| {
                        let class = if rank < k {
                            CapacityClass::Large
                        } else {
                            CapacityClass::Small
                        };
                        tests_in_class(experiment.reagents[idx].volume_per_test_ul, class)
                    })
                    .min()
                    .unwrap_or(0)
            })
            .collect();

        let max_sets = TRAY_LOCATIONS / n;

        // best[s][l] and the k chosen for the last set
        let mut best = vec![vec![0u64; LARGE_LOCATIONS + 1]; max_sets + 1];
        let mut choice = vec![vec![0usize; LARGE_LOCATIONS + 1]; max_sets + 1];
        for s in 1..=max_sets {
            for l in 0..=LARGE_LOCATIONS {
                let mut best_value = 0;
                let mut best_k = 0;
                for k in 0..=n.min(l) {
                    let value = best[s - 1][l - k] + set_yield[k];
                    if k == 0 || value > best_value {
                        best_value = value;
                        best_k = k;
                    }
                }
                best[s][l] = best_value;
                choice[s][l] = best_k;
            }
        }

        let plans = (0..=max_sets)
            .map(|s| {
                (0..=LARGE_LOCATIONS)
                    .map(|l| {
                        // Fewest large chambers reaching the same total
                        let minimal = (0..=l).find(|&m| best[s][m] == best[s][l]).unwrap_or(l);
                        let mut large_per_set = Vec::with_capacity(s);
                        let mut budget = minimal;
                        for j in (1..=s).rev() {
                            let k = choice[j][budget];
                            large_per_set.push(k);
                            budget -= k;
                        }
                        large_per_set.sort_unstable_by(|a, b| b.cmp(a));
                        SetPlan {
                            total_tests: best[s][l],
                            large_used: large_per_set.iter().sum(),
                            large_per_set,
                        }
                    })
                    .collect()
            })
            .collect();

        Some(Self {
            experiment_id: experiment.id,
            chambers_per_set: n,
            upgrade_order,
            set_yield,
            plans,
        })
    }

    pub fn experiment_id(&self) -> ExperimentId {
        self.experiment_id
    }

    pub fn chambers_per_set(&self) -> usize {
        self.chambers_per_set
    }

    /// Most sets that fit on an otherwise empty tray
    pub fn max_sets(&self) -> usize {
        self.plans.len() - 1
    }

    /// Yield of one set with `k` large chambers
    pub fn set_yield(&self, k: usize) -> u64 {
        self.set_yield[k.min(self.chambers_per_set)]
    }

    /// Best plan for `sets` sets using at most `large` large chambers
    pub fn plan(&self, sets: usize, large: usize) -> &SetPlan {
        &self.plans[sets.min(self.max_sets())][large.min(LARGE_LOCATIONS)]
    }

    /// Whether reagent `index` sits in a large chamber in a set granted
    /// `large_in_set` large chambers
    pub fn is_upgraded(&self, index: usize, large_in_set: usize) -> bool {
        is_upgraded(&self.upgrade_order, index, large_in_set)
    }

    /// Option for `sets` sets seated in exactly `large` large chambers
    ///
    /// `large` is clamped to what the sets and the tray can hold.
    pub fn option(&self, sets: usize, large: usize) -> AllocOption {
        let locations = sets * self.chambers_per_set;
        AllocOption {
            sets,
            large: large.min(locations).min(LARGE_LOCATIONS),
            locations,
            total_tests: self.plan(sets, large).total_tests,
        }
    }

    /// Large chambers per set (descending) for `sets` sets seated in
    /// exactly `large` large chambers
    ///
    /// Starts from the fewest-chamber optimum and hands the spare large
    /// chambers to the strongest sets first, each up to a full set.
    pub fn large_per_set(&self, sets: usize, large: usize) -> Vec<usize> {
        let option = self.option(sets, large);
        let mut per_set = self.plan(sets, option.large).large_per_set.clone();
        let mut spare = option.large - per_set.iter().sum::<usize>();
        for slot in per_set.iter_mut() {
            let extra = spare.min(self.chambers_per_set - *slot);
            *slot += extra;
            spare -= extra;
        }
        per_set.sort_unstable_by(|a, b| b.cmp(a));
        per_set
    }

    /// Every option, ascending by sets then large chambers
    ///
    /// Options differing only in large chambers may share a total; the
    /// extra large chambers then serve as plain slots.
    pub fn options(&self) -> Vec<AllocOption> {
        let mut options = Vec::new();
        for sets in 1..=self.max_sets() {
            let locations = sets * self.chambers_per_set;
            for large in 0..=locations.min(LARGE_LOCATIONS) {
                options.push(self.option(sets, large));
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::{Catalog, Reagent};

    fn options_for(id: ExperimentId) -> ExperimentOptions {
        let catalog = Catalog::default_catalog();
        ExperimentOptions::build(catalog.get(id).unwrap()).unwrap()
    }

    #[test]
    fn test_single_reagent_yields() {
        let opts = options_for(11);
        assert_eq!(opts.set_yield(0), 140);
        assert_eq!(opts.set_yield(1), 270);
        assert_eq!(opts.max_sets(), 16);
        assert_eq!(opts.plan(16, 4).total_tests, 2760);
        assert_eq!(opts.plan(16, 4).large_used, 4);
    }

    #[test]
    fn test_upgrade_targets_bottleneck_reagent() {
        // Copper: KR1E 850 uL (317 / 164), KR1S 300 uL (900 / 466)
        let opts = options_for(1);
        assert_eq!(opts.set_yield(0), 164);
        assert_eq!(opts.set_yield(1), 317);
        assert_eq!(opts.set_yield(2), 317);
        assert!(opts.is_upgraded(0, 1));
        assert!(!opts.is_upgraded(1, 1));
    }

    #[test]
    fn test_useless_large_chambers_are_not_consumed() {
        // Iron: four 1000 uL reagents, a set only improves with all four large
        let opts = options_for(16);
        assert_eq!(opts.set_yield(3), 140);
        assert_eq!(opts.set_yield(4), 270);
        let plan = opts.plan(1, 3);
        assert_eq!(plan.total_tests, 140);
        assert_eq!(plan.large_used, 0);
        let plan = opts.plan(1, 4);
        assert_eq!(plan.total_tests, 270);
        assert_eq!(plan.large_per_set, vec![4]);
    }

    #[test]
    fn test_large_chambers_spread_across_sets() {
        let opts = options_for(1);
        let plan = opts.plan(8, 4);
        // Four sets with the 850 uL reagent upgraded, four fully small
        assert_eq!(plan.total_tests, 4 * 317 + 4 * 164);
        assert_eq!(plan.large_per_set, vec![1, 1, 1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_options_cover_every_large_count() {
        let opts = options_for(16);
        let options = opts.options();
        // max 4 sets; each may take 0..=4 large chambers
        assert_eq!(options.len(), 20);
        let one_set: Vec<u64> = options
            .iter()
            .filter(|o| o.sets == 1)
            .map(|o| o.total_tests)
            .collect();
        assert_eq!(one_set, vec![140, 140, 140, 140, 270]);
        assert!(options.iter().all(|o| o.small() + o.large == o.locations));
    }

    #[test]
    fn test_large_count_limited_by_set_size() {
        // Alkalinity: one chamber per set
        let opts = options_for(11);
        let options = opts.options();
        assert_eq!(options.iter().filter(|o| o.sets == 1).count(), 2);
        assert_eq!(options.iter().filter(|o| o.sets == 3).count(), 4);
    }

    #[test]
    fn test_spare_large_chambers_fill_strongest_sets() {
        // Iron: 2 large chambers add nothing, yet both must be seated
        let opts = options_for(16);
        assert_eq!(opts.plan(2, 2).large_used, 0);
        assert_eq!(opts.large_per_set(2, 2), vec![2, 0]);
        assert_eq!(opts.option(2, 2).total_tests, 280);

        // Copper: the useful upgrades stay, spares top up the upgraded sets
        let opts = options_for(1);
        assert_eq!(opts.large_per_set(3, 4), vec![2, 1, 1]);
        assert_eq!(opts.option(3, 4).total_tests, 3 * 317);
    }

    #[test]
    fn test_experiment_without_reagents_has_no_options() {
        let empty = Experiment::new(1, "Blank", Vec::<Reagent>::new());
        assert!(ExperimentOptions::build(&empty).is_none());
    }
}
