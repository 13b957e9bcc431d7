//! Tray capacity model
//!
//! The reagent tray has 16 reservoir locations in two chamber classes:
//! locations 0-3 hold 270 mL, locations 4-15 hold 140 mL. Every test count
//! in the engine comes from [`tests_possible`], which truncates.

use serde::{Deserialize, Serialize};

/// Number of reservoir locations on a tray
pub const TRAY_LOCATIONS: usize = 16;

/// Number of large (270 mL) locations; they occupy indices `0..LARGE_LOCATIONS`
pub const LARGE_LOCATIONS: usize = 4;

/// Number of small (140 mL) locations
pub const SMALL_LOCATIONS: usize = TRAY_LOCATIONS - LARGE_LOCATIONS;

/// Chamber capacity class of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CapacityClass {
    /// 270 mL chamber
    Large,
    /// 140 mL chamber
    Small,
}

impl CapacityClass {
    /// Chamber volume in millilitres
    pub const fn capacity_ml(self) -> u32 {
        match self {
            CapacityClass::Large => 270,
            CapacityClass::Small => 140,
        }
    }

    /// Capacity class of a location index
    ///
    /// Indices at or above [`TRAY_LOCATIONS`] are classed as small; callers
    /// that accept external indices check them with [`is_valid_location`].
    pub const fn of_location(location: usize) -> Self {
        if location < LARGE_LOCATIONS {
            CapacityClass::Large
        } else {
            CapacityClass::Small
        }
    }

    /// Location indices belonging to this class, ascending
    pub fn locations(self) -> std::ops::Range<usize> {
        match self {
            CapacityClass::Large => 0..LARGE_LOCATIONS,
            CapacityClass::Small => LARGE_LOCATIONS..TRAY_LOCATIONS,
        }
    }
}

/// Chamber capacity (mL) of a location
///
/// # Example
/// ```
/// use reagent_tray_core_rs::core::capacity::capacity_ml;
///
/// assert_eq!(capacity_ml(0), 270);
/// assert_eq!(capacity_ml(3), 270);
/// assert_eq!(capacity_ml(4), 140);
/// assert_eq!(capacity_ml(15), 140);
/// ```
pub const fn capacity_ml(location: usize) -> u32 {
    CapacityClass::of_location(location).capacity_ml()
}

/// True when `location` addresses one of the 16 tray locations
pub const fn is_valid_location(location: usize) -> bool {
    location < TRAY_LOCATIONS
}

/// Number of tests a chamber supports: `floor(capacity_ml * 1000 / volume_ul)`
///
/// Integer division, truncating toward zero. A zero volume yields zero
/// tests; catalogs reject such reagents before they reach the engine.
///
/// # Example
/// ```
/// use reagent_tray_core_rs::core::capacity::tests_possible;
///
/// assert_eq!(tests_possible(850, 270), 317);
/// assert_eq!(tests_possible(301, 140), 465); // 465.11 truncates
/// ```
pub fn tests_possible(volume_ul: u32, capacity_ml: u32) -> u64 {
    (u64::from(capacity_ml) * 1000)
        .checked_div(u64::from(volume_ul))
        .unwrap_or(0)
}

/// Tests a reagent supports in a chamber of the given class
pub fn tests_in_class(volume_ul: u32, class: CapacityClass) -> u64 {
    tests_possible(volume_ul, class.capacity_ml())
}
