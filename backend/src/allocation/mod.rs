//! Allocation Module
//!
//! Places complete reagent sets onto the 16 tray locations so that the
//! worst-off experiment runs as many tests as possible.
//!
//! - `validator`: selection preconditions (known ids, 16-chamber ceiling)
//! - `options`: per-experiment table of (sets, large chambers) → tests
//! - `search`: greedy seed plus exact memoized branch-and-bound
//! - `layout`: concrete location indices for a plan
//! - `composer`: placements → sets, and results re-derivation
//! - `metrics`: set yields, totals and tray life
//!
//! # Critical Invariants
//!
//! 1. **One reagent per location**: no location is seated twice
//! 2. **Complete sets only**: the allocator never seats a partial set
//! 3. **Max-min objective**: the returned plan's tray life is never below
//!    that of any other feasible plan
//!
//! # Example
//!
//! ```rust
//! use reagent_tray_core_rs::allocation::search::{allocate, SearchStrategy};
//! use reagent_tray_core_rs::Catalog;
//!
//! let catalog = Catalog::default_catalog();
//! let alkalinity = catalog.get(11).unwrap();
//! let plan = allocate(&[alkalinity], SearchStrategy::Exact, 10_000).unwrap();
//! assert_eq!(plan.tray_life, 2760);
//! ```

pub mod composer;
pub mod layout;
pub mod metrics;
pub mod options;
pub mod search;
pub mod validator;

// Re-export public API
pub use composer::{compose_complete_sets, compose_sets, derive_configuration, ComposedSets, Completeness};
pub use layout::{seat_plan, Tray};
pub use search::{allocate, priority_order, AllocationPlan, ExperimentAllocation, SearchStrategy};
pub use validator::{validate_selection, ChamberRequirement};
