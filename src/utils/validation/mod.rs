//! Consolidated validation utilities
//!
//! Geometric validation of user selections and numeric checks for
//! configuration values and buffer layouts.

pub mod numeric;
pub mod region;

pub use numeric::NumericValidator;
pub use region::RegionValidator;
