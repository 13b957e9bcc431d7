//! Plain-text rendering of catalogs and tray configurations

use reagent_tray_core_rs::core::capacity::capacity_ml;
use reagent_tray_core_rs::{Configuration, ExperimentSummary};
use std::fmt::Write;

const GRID_COLUMNS: usize = 4;
const CELL_WIDTH: usize = 24;

pub fn experiment_list(experiments: &[ExperimentSummary]) -> String {
    let mut out = String::new();
    for experiment in experiments {
        let _ = writeln!(out, "{:>3}: {}", experiment.id, experiment.name);
    }
    out
}

/// 4x4 tray grid followed by the per-experiment results summary
pub fn configuration(config: &Configuration) -> String {
    let mut out = String::from("Tray Configuration\n\n");

    for row in config.tray_locations.chunks(GRID_COLUMNS).enumerate() {
        let (row_index, slots) = row;
        let mut header = String::new();
        let mut body = String::new();
        let mut detail = String::new();

        for (col, slot) in slots.iter().enumerate() {
            let location = row_index * GRID_COLUMNS + col;
            let _ = write!(
                header,
                "{:<width$}",
                format!("LOC-{} ({}mL)", location + 1, capacity_ml(location)),
                width = CELL_WIDTH
            );
            match slot {
                Some(p) => {
                    let _ = write!(
                        body,
                        "{:<width$}",
                        format!("{} (#{})", p.reagent_code, p.experiment_id),
                        width = CELL_WIDTH
                    );
                    let _ = write!(
                        detail,
                        "{:<width$}",
                        format!("{} tests @ {}uL", p.tests_possible, p.volume_per_test_ul),
                        width = CELL_WIDTH
                    );
                }
                None => {
                    let _ = write!(body, "{:<width$}", "empty", width = CELL_WIDTH);
                    let _ = write!(detail, "{:<width$}", "", width = CELL_WIDTH);
                }
            }
        }

        let _ = writeln!(out, "{}", header.trim_end());
        let _ = writeln!(out, "{}", body.trim_end());
        let _ = writeln!(out, "{}\n", detail.trim_end());
    }

    out.push_str("Results Summary\n\n");
    for (id, result) in &config.results {
        let _ = writeln!(
            out,
            "{} (#{}) - {} total tests",
            result.name, id, result.total_tests
        );
        for (i, set) in result.sets.iter().enumerate() {
            let label = match (i, set.complete) {
                (_, false) => "Partial set (no tests)".to_string(),
                (0, true) => "Primary set".to_string(),
                (n, true) => format!("Additional set {}", n),
            };
            let _ = writeln!(out, "  {}:", label);
            for p in &set.placements {
                let _ = writeln!(
                    out,
                    "    - {} (LOC-{}): {} tests possible",
                    p.reagent_code,
                    p.location + 1,
                    p.tests_possible
                );
            }
            let _ = writeln!(out, "    Tests from this set: {}", set.tests_per_set);
        }
    }

    match config.tray_life() {
        Some(life) => {
            let _ = writeln!(out, "\nTray Life (Tests): {}", life);
        }
        None => out.push_str("\nNo experiments selected\n"),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reagent_tray_core_rs::TrayOptimizer;

    #[test]
    fn test_render_single_experiment() {
        let config = TrayOptimizer::default().optimize(&[11]).unwrap();
        let text = configuration(&config);
        assert!(text.contains("LOC-1 (270mL)"));
        assert!(text.contains("LOC-16 (140mL)"));
        assert!(text.contains("Total Alkalinity (LR) (#11) - 2760 total tests"));
        assert!(text.contains("Tray Life (Tests): 2760"));
    }

    #[test]
    fn test_render_experiment_list() {
        let listing = TrayOptimizer::default().available_experiments();
        let text = experiment_list(&listing);
        assert!(text.starts_with("  1: Copper (II) (LR)"));
        assert_eq!(text.lines().count(), 16);
    }
}
