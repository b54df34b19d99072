//! Utility modules shared across the cutout pipeline

pub mod validation;

pub use validation::{NumericValidator, RegionValidator};
