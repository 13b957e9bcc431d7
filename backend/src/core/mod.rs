//! Physical tray model

pub mod capacity;

pub use capacity::{
    capacity_ml, is_valid_location, tests_in_class, tests_possible, CapacityClass,
    LARGE_LOCATIONS, SMALL_LOCATIONS, TRAY_LOCATIONS,
};
