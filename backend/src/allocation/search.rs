//! Tray-life search
//!
//! Chooses, for every selected experiment, how many complete sets it gets
//! and how many large chambers those sets use, maximizing the tray life
//! (the smallest `total_tests` across experiments).
//!
//! # Algorithm
//!
//! ```text
//! 1. Order experiments by descending max reagent volume, then ascending id
//! 2. Greedy seed: one set each, then repeatedly improve the worst-off
//!    experiment while any move raises it
//! 3. Phase one: memoized branch-and-bound over (experiment, free small
//!    chambers, free large chambers) computes the best tray life T*; only
//!    lives above the greedy seed's are explored
//! 4. Phase two: same state space, minimal (chambers, large chambers) with
//!    every experiment >= T*, first cheapest assignment in option order
//! ```
//!
//! Every option draws a fixed number of chambers from each pool, so a plan
//! never needs more than 12 small or 4 large chambers. Pool bookkeeping is
//! incremental: each recursion level receives the free counts as plain
//! integers, nothing is cloned per branch. When the expansion budget runs
//! out the greedy seed is returned.

use crate::allocation::options::{AllocOption, ExperimentOptions};
use crate::core::capacity::{LARGE_LOCATIONS, SMALL_LOCATIONS, TRAY_LOCATIONS};
use crate::models::catalog::{Experiment, ExperimentId};
use crate::optimizer::OptimizerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// How the allocator explores placements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Exact memoized branch-and-bound, seeded by the greedy pass
    #[default]
    Exact,
    /// Greedy worst-first improvement only
    Greedy,
}

/// Share of the tray granted to one experiment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentAllocation {
    pub experiment_id: ExperimentId,
    pub sets: usize,
    /// Large chambers per set, descending; `len() == sets`
    pub large_per_set: Vec<usize>,
    /// Total tests the plan predicts for this experiment
    pub expected_tests: u64,
}

/// Output of the search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    /// Allocations in priority order
    pub allocations: Vec<ExperimentAllocation>,
    pub tray_life: u64,
    pub locations_used: usize,
    pub large_used: usize,
    /// False when the expansion budget ran out and the greedy seed was kept
    pub exhaustive: bool,
    /// Search nodes expanded
    pub expansions: usize,
}

/// Sort experiments into search priority order
///
/// Higher-volume reagents gain most from large chambers, so experiments with
/// the largest single reagent volume come first; ties go to the lower id.
pub fn priority_order<'a>(experiments: &[&'a Experiment]) -> Vec<&'a Experiment> {
    let mut ordered = experiments.to_vec();
    ordered.sort_by(|a, b| {
        b.max_volume_ul()
            .cmp(&a.max_volume_ul())
            .then(a.id.cmp(&b.id))
    });
    ordered
}

/// Search for the allocation with the best tray life
///
/// `experiments` may come in any order; the plan lists them in priority
/// order. An empty selection yields an empty plan with tray life 0.
///
/// # Errors
///
/// `NoFeasibleConfiguration` names the first experiment (in priority order)
/// that cannot receive a complete set.
pub fn allocate(
    experiments: &[&Experiment],
    strategy: SearchStrategy,
    max_expansions: usize,
) -> Result<AllocationPlan, OptimizerError> {
    let ordered = priority_order(experiments);
    let tables = build_tables(&ordered)?;

    if tables.is_empty() {
        return Ok(AllocationPlan {
            allocations: Vec::new(),
            tray_life: 0,
            locations_used: 0,
            large_used: 0,
            exhaustive: true,
            expansions: 0,
        });
    }

    let seed = greedy_seed(&tables);
    debug!(
        tray_life = seed.tray_life(),
        locations = seed.locations(),
        "greedy seed"
    );

    if strategy == SearchStrategy::Greedy {
        return Ok(seed.into_plan(&tables, true, 0));
    }

    let mut search = ExactSearch::new(&tables, max_expansions);
    match search.run(seed.tray_life()) {
        Some(choices) => {
            let expansions = search.expansions;
            debug!(expansions, "exact search complete");
            Ok(Selection { choices }.into_plan(&tables, true, expansions))
        }
        None => {
            warn!(
                max_expansions,
                "search budget exhausted, keeping greedy allocation"
            );
            Ok(seed.into_plan(&tables, false, search.expansions))
        }
    }
}

fn build_tables(ordered: &[&Experiment]) -> Result<Vec<ExperimentOptions>, OptimizerError> {
    let mut tables = Vec::with_capacity(ordered.len());
    let mut chambers = 0;
    for experiment in ordered {
        let table = ExperimentOptions::build(experiment).ok_or_else(|| {
            OptimizerError::NoFeasibleConfiguration {
                experiment_id: experiment.id,
                name: experiment.name.clone(),
            }
        })?;
        chambers += table.chambers_per_set();
        if chambers > TRAY_LOCATIONS {
            return Err(OptimizerError::NoFeasibleConfiguration {
                experiment_id: experiment.id,
                name: experiment.name.clone(),
            });
        }
        tables.push(table);
    }
    Ok(tables)
}

/// One option per experiment, in priority order
#[derive(Debug, Clone)]
struct Selection {
    choices: Vec<AllocOption>,
}

impl Selection {
    fn tray_life(&self) -> u64 {
        self.choices
            .iter()
            .map(|c| c.total_tests)
            .min()
            .unwrap_or(0)
    }

    fn locations(&self) -> usize {
        self.choices.iter().map(|c| c.locations).sum()
    }

    fn into_plan(
        self,
        tables: &[ExperimentOptions],
        exhaustive: bool,
        expansions: usize,
    ) -> AllocationPlan {
        let tray_life = self.tray_life();
        let locations_used = self.locations();
        let large_used = self.choices.iter().map(|c| c.large).sum();
        let allocations = self
            .choices
            .iter()
            .zip(tables)
            .map(|(choice, table)| ExperimentAllocation {
                experiment_id: table.experiment_id(),
                sets: choice.sets,
                large_per_set: table.large_per_set(choice.sets, choice.large),
                expected_tests: choice.total_tests,
            })
            .collect();

        AllocationPlan {
            allocations,
            tray_life,
            locations_used,
            large_used,
            exhaustive,
            expansions,
        }
    }
}

/// Worst-first greedy improvement
///
/// Every experiment starts with one set; chambers beyond the small pool
/// spill into large chambers, highest-priority experiments first. Each
/// round picks the experiment with the lowest total (earliest in priority
/// order on ties) and applies the move that raises it most: an extra set,
/// or the fewest extra large chambers that help. Stops when the worst
/// experiment cannot be raised.
fn greedy_seed(tables: &[ExperimentOptions]) -> Selection {
    let needed: usize = tables.iter().map(|t| t.chambers_per_set()).sum();
    let mut spill = needed.saturating_sub(SMALL_LOCATIONS);
    let mut choices: Vec<AllocOption> = tables
        .iter()
        .map(|t| {
            let large = spill.min(t.chambers_per_set());
            spill -= large;
            t.option(1, large)
        })
        .collect();

    loop {
        let free_small = SMALL_LOCATIONS - choices.iter().map(|c| c.small()).sum::<usize>();
        let free_large = LARGE_LOCATIONS - choices.iter().map(|c| c.large).sum::<usize>();

        let Some((worst, current)) = choices
            .iter()
            .enumerate()
            .min_by(|(ia, a), (ib, b)| a.total_tests.cmp(&b.total_tests).then(ia.cmp(ib)))
            .map(|(i, c)| (i, *c))
        else {
            break;
        };
        let table = &tables[worst];
        let n = table.chambers_per_set();

        let mut candidates = Vec::new();
        if current.sets < table.max_sets() {
            // Fewest large chambers the new set needs to fit
            let extra = n.saturating_sub(free_small);
            if extra <= free_large {
                candidates.push(table.option(current.sets + 1, current.large + extra));
            }
        }
        if let Some(upgrade) = (1..=free_large.min(current.small()))
            .map(|extra| table.option(current.sets, current.large + extra))
            .find(|o| o.total_tests > current.total_tests)
        {
            candidates.push(upgrade);
        }

        let best = candidates
            .into_iter()
            .filter(|o| o.total_tests > current.total_tests)
            .max_by(|a, b| {
                a.total_tests
                    .cmp(&b.total_tests)
                    .then(b.locations.cmp(&a.locations))
            });

        match best {
            Some(next) => choices[worst] = next,
            None => break,
        }
    }

    Selection { choices }
}

type StateKey = (usize, usize, usize);

/// Memoized branch-and-bound over experiments in priority order
struct ExactSearch<'a> {
    tables: &'a [ExperimentOptions],
    /// Options per experiment in enumeration order
    options: Vec<Vec<AllocOption>>,
    /// Same options by descending total, for phase one
    by_value: Vec<Vec<AllocOption>>,
    /// Chambers needed to give each suffix one set apiece
    suffix_min: Vec<usize>,
    life_memo: HashMap<StateKey, Option<u64>>,
    cost_memo: HashMap<StateKey, Option<(usize, usize)>>,
    max_expansions: usize,
    expansions: usize,
}

/// Raised internally when the expansion budget runs out
struct Exhausted;

impl<'a> ExactSearch<'a> {
    fn new(tables: &'a [ExperimentOptions], max_expansions: usize) -> Self {
        let options: Vec<Vec<AllocOption>> = tables.iter().map(|t| t.options()).collect();
        let by_value = options
            .iter()
            .map(|opts| {
                let mut sorted = opts.clone();
                // Stable: equal totals keep enumeration order
                sorted.sort_by(|a, b| b.total_tests.cmp(&a.total_tests));
                sorted
            })
            .collect();

        let mut suffix_min = vec![0; tables.len() + 1];
        for i in (0..tables.len()).rev() {
            suffix_min[i] = suffix_min[i + 1] + tables[i].chambers_per_set();
        }

        Self {
            tables,
            options,
            by_value,
            suffix_min,
            life_memo: HashMap::new(),
            cost_memo: HashMap::new(),
            max_expansions,
            expansions: 0,
        }
    }

    /// Run both phases; `None` when the budget ran out
    ///
    /// `floor` is a tray life already known to be reachable. Phase one only
    /// explores options above it and falls back to it when none does better.
    fn run(&mut self, floor: u64) -> Option<Vec<AllocOption>> {
        let target = match self.best_life(0, SMALL_LOCATIONS, LARGE_LOCATIONS, floor) {
            Ok(Some(life)) => life,
            Ok(None) => floor,
            Err(Exhausted) => return None,
        };
        debug!(tray_life = target, floor, "phase one: best tray life");

        self.min_cost(0, SMALL_LOCATIONS, LARGE_LOCATIONS, target)
            .ok()??;
        self.reconstruct(target).ok()
    }

    fn expand(&mut self) -> Result<(), Exhausted> {
        self.expansions += 1;
        if self.expansions > self.max_expansions {
            Err(Exhausted)
        } else {
            Ok(())
        }
    }

    /// Whether `option` fits the free pools and still leaves room for one
    /// set of every later experiment (spare large chambers take any reagent)
    fn fits(&self, idx: usize, option: &AllocOption, small: usize, large: usize) -> bool {
        option.large <= large
            && option.small() <= small
            && (small - option.small()) + (large - option.large) >= self.suffix_min[idx + 1]
    }

    /// Best tray life above `floor` over experiments `idx..` (u64::MAX for
    /// the empty suffix); `None` when no assignment beats `floor`
    fn best_life(
        &mut self,
        idx: usize,
        small: usize,
        large: usize,
        floor: u64,
    ) -> Result<Option<u64>, Exhausted> {
        if idx == self.tables.len() {
            return Ok(Some(u64::MAX));
        }
        if let Some(&cached) = self.life_memo.get(&(idx, small, large)) {
            return Ok(cached);
        }
        self.expand()?;

        let mut best: Option<u64> = None;
        for i in 0..self.by_value[idx].len() {
            let option = self.by_value[idx][i];
            // Descending totals: nothing further down can beat `best` or `floor`
            if option.total_tests <= floor || best.is_some_and(|b| option.total_tests <= b) {
                break;
            }
            if !self.fits(idx, &option, small, large) {
                continue;
            }
            if let Some(rest) = self.best_life(
                idx + 1,
                small - option.small(),
                large - option.large,
                floor,
            )? {
                let life = option.total_tests.min(rest);
                if best.map_or(true, |b| life > b) {
                    best = Some(life);
                }
            }
        }

        self.life_memo.insert((idx, small, large), best);
        Ok(best)
    }

    /// Cheapest `(chambers, large chambers)` giving experiments `idx..` at least `target`
    fn min_cost(
        &mut self,
        idx: usize,
        small: usize,
        large: usize,
        target: u64,
    ) -> Result<Option<(usize, usize)>, Exhausted> {
        if idx == self.tables.len() {
            return Ok(Some((0, 0)));
        }
        if let Some(&cached) = self.cost_memo.get(&(idx, small, large)) {
            return Ok(cached);
        }
        self.expand()?;

        let mut best: Option<(usize, usize)> = None;
        for i in 0..self.options[idx].len() {
            let option = self.options[idx][i];
            if option.total_tests < target || !self.fits(idx, &option, small, large) {
                continue;
            }
            if let Some((rest_loc, rest_large)) =
                self.min_cost(idx + 1, small - option.small(), large - option.large, target)?
            {
                let cost = (option.locations + rest_loc, option.large + rest_large);
                if best.map_or(true, |b| cost < b) {
                    best = Some(cost);
                }
            }
        }

        self.cost_memo.insert((idx, small, large), best);
        Ok(best)
    }

    /// Walk the cost memo, taking the first option on a cheapest path
    fn reconstruct(&mut self, target: u64) -> Result<Vec<AllocOption>, Exhausted> {
        let mut small = SMALL_LOCATIONS;
        let mut large = LARGE_LOCATIONS;
        let mut choices = Vec::with_capacity(self.tables.len());

        for idx in 0..self.tables.len() {
            let Some(goal) = self.min_cost(idx, small, large, target)? else {
                return Err(Exhausted);
            };
            let mut picked = None;
            for i in 0..self.options[idx].len() {
                let option = self.options[idx][i];
                if option.total_tests < target || !self.fits(idx, &option, small, large) {
                    continue;
                }
                if let Some((rest_loc, rest_large)) =
                    self.min_cost(idx + 1, small - option.small(), large - option.large, target)?
                {
                    if (option.locations + rest_loc, option.large + rest_large) == goal {
                        picked = Some(option);
                        break;
                    }
                }
            }
            let option = picked.ok_or(Exhausted)?;
            small -= option.small();
            large -= option.large;
            choices.push(option);
        }

        Ok(choices)
    }
}
