//! Snapshot - Save/Restore Tray Configurations
//!
//! A snapshot pairs a configuration with the selection that produced it and
//! a fingerprint of the catalog it was computed against, so a saved tray can
//! be reloaded later and checked before use.
//!
//! # Critical Invariants
//!
//! - **Catalog Matching**: a snapshot only restores against the same catalog
//! - **Unique Locations**: no location index is seated twice
//! - **Set Membership**: every seated placement is in exactly one set
//! - **Derived Totals**: set yields and totals match the placements

use crate::models::catalog::{Catalog, ExperimentId};
use crate::models::configuration::Configuration;
use crate::optimizer::engine::{OptimizerError, TrayOptimizer};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};

// ============================================================================
// Snapshot Structures
// ============================================================================

/// A saved tray configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    /// SHA256 of the catalog's canonical JSON
    pub catalog_hash: String,

    /// Experiments the configuration was optimized for
    pub selected: Vec<ExperimentId>,

    pub configuration: Configuration,
}

impl ConfigurationSnapshot {
    pub fn to_json(&self) -> Result<String, OptimizerError> {
        serde_json::to_string(self).map_err(|e| {
            OptimizerError::Serialization(format!("Snapshot serialization failed: {}", e))
        })
    }

    pub fn from_json(json: &str) -> Result<Self, OptimizerError> {
        serde_json::from_str(json).map_err(|e| {
            OptimizerError::Serialization(format!("Snapshot deserialization failed: {}", e))
        })
    }
}

// ============================================================================
// Catalog Hashing
// ============================================================================

/// Deterministic SHA256 fingerprint of a catalog
///
/// Hashes the catalog's JSON form after sorting all object keys, so the
/// fingerprint does not depend on field order.
pub fn compute_catalog_hash(catalog: &Catalog) -> Result<String, OptimizerError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let json = catalog.to_json_string().map_err(|e| {
        OptimizerError::Serialization(format!("Catalog serialization failed: {}", e))
    })?;
    let value: Value = serde_json::from_str(&json).map_err(|e| {
        OptimizerError::Serialization(format!("Catalog serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let canonical = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        OptimizerError::Serialization(format!("Catalog serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Check every tray invariant of a configuration against a catalog
///
/// - Tray slots hold placements recorded at their own index, with capacity
///   and test counts matching the location
/// - Every seated placement appears in exactly one set, of its own experiment
/// - Sets hold one placement per distinct reagent when complete, and
///   `tests_per_set` / `total_tests` agree with the placements
pub fn validate_configuration(
    configuration: &Configuration,
    catalog: &Catalog,
) -> Result<(), OptimizerError> {
    let violation = |msg: String| Err(OptimizerError::InvariantViolation(msg));

    // 1. Tray slots
    for (index, slot) in configuration.tray_locations.iter().enumerate() {
        if let Some(placement) = slot {
            if placement.location != index {
                return violation(format!(
                    "slot {} holds a placement recorded at location {}",
                    index, placement.location
                ));
            }
            if !placement.is_consistent() {
                return violation(format!(
                    "placement at location {} has stale capacity or test count",
                    index
                ));
            }
        }
    }

    // 2. Set membership: each seated location referenced exactly once
    let mut seen: HashMap<usize, ExperimentId> = HashMap::new();
    for (id, result) in &configuration.results {
        let experiment = catalog
            .get(*id)
            .ok_or(OptimizerError::UnknownExperiment(*id))?;

        for set in &result.sets {
            for placement in &set.placements {
                if placement.experiment_id != *id {
                    return violation(format!(
                        "location {} is listed under experiment {} but seated for {}",
                        placement.location, id, placement.experiment_id
                    ));
                }
                if configuration
                    .tray_locations
                    .get(placement.location)
                    .and_then(|slot| slot.as_ref())
                    != Some(placement)
                {
                    return violation(format!(
                        "set placement at location {} does not match the tray",
                        placement.location
                    ));
                }
                if let Some(other) = seen.insert(placement.location, *id) {
                    return violation(format!(
                        "location {} appears in more than one set (experiments {} and {})",
                        placement.location, other, id
                    ));
                }
            }

            // 3. Completeness and yields
            let codes: BTreeSet<&str> =
                set.placements.iter().map(|p| p.reagent_code.as_str()).collect();
            let is_complete = codes.len() == set.placements.len()
                && set.placements.len() == experiment.reagents.len()
                && experiment
                    .reagents
                    .iter()
                    .all(|r| codes.contains(r.code.as_str()));
            if set.complete != is_complete {
                return violation(format!(
                    "set of experiment {} is marked complete={} but holds {} of {} reagents",
                    id,
                    set.complete,
                    codes.len(),
                    experiment.reagents.len()
                ));
            }
            let expected_yield = if is_complete {
                set.placements
                    .iter()
                    .map(|p| p.tests_possible)
                    .min()
                    .unwrap_or(0)
            } else {
                0
            };
            if set.tests_per_set != expected_yield {
                return violation(format!(
                    "set of experiment {} reports {} tests, placements support {}",
                    id, set.tests_per_set, expected_yield
                ));
            }
        }

        let expected_total: u64 = result
            .sets
            .iter()
            .filter(|s| s.complete)
            .map(|s| s.tests_per_set)
            .sum();
        if result.total_tests != expected_total {
            return violation(format!(
                "experiment {} reports {} total tests, sets sum to {}",
                id, result.total_tests, expected_total
            ));
        }
    }

    for placement in configuration.placements() {
        if !seen.contains_key(&placement.location) {
            return violation(format!(
                "location {} is seated but belongs to no set",
                placement.location
            ));
        }
    }

    Ok(())
}

// ============================================================================
// Save / Restore
// ============================================================================

impl TrayOptimizer {
    /// Capture a configuration for later restore
    pub fn snapshot(
        &self,
        configuration: &Configuration,
    ) -> Result<ConfigurationSnapshot, OptimizerError> {
        validate_configuration(configuration, self.catalog())?;
        Ok(ConfigurationSnapshot {
            catalog_hash: compute_catalog_hash(self.catalog())?,
            selected: configuration.experiment_ids().collect(),
            configuration: configuration.clone(),
        })
    }

    /// Reload a snapshot, checking catalog fingerprint and invariants
    pub fn restore(&self, snapshot: &ConfigurationSnapshot) -> Result<Configuration, OptimizerError> {
        let actual = compute_catalog_hash(self.catalog())?;
        if snapshot.catalog_hash != actual {
            return Err(OptimizerError::CatalogMismatch {
                expected: snapshot.catalog_hash.clone(),
                actual,
            });
        }
        validate_configuration(&snapshot.configuration, self.catalog())?;
        Ok(snapshot.configuration.clone())
    }
}
