//! Numeric validation utilities
//!
//! Provides safe numeric conversions and range validation to prevent
//! overflow, underflow, and other numeric errors.

use crate::error::{CutoutError, Result};

/// Validator for numeric operations and conversions
pub struct NumericValidator;

impl NumericValidator {
    /// Validate JPEG quality setting (1-100)
    pub fn validate_quality(value: u8) -> Result<u8> {
        if value == 0 || value > 100 {
            return Err(CutoutError::config_value_error(
                "jpeg_quality",
                value,
                "1-100",
                Some(95),
            ));
        }
        Ok(value)
    }

    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(CutoutError::invalid_config(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
        Ok(value)
    }

    /// Validate that a value is positive
    pub fn validate_positive<T>(value: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy + Default,
    {
        if value <= T::default() {
            return Err(CutoutError::invalid_config(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Validate that a float is finite and strictly positive
    pub fn validate_finite_positive(value: f64, name: &str) -> Result<f64> {
        if !value.is_finite() {
            return Err(CutoutError::invalid_config(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }
        Self::validate_positive(value, name)
    }

    /// Byte length of a `width × height × channels` buffer, checking for overflow
    pub fn buffer_len(width: u32, height: u32, channels: u8) -> Result<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(usize::from(channels)))
            .ok_or_else(|| {
                CutoutError::precondition(format!(
                    "buffer size overflow: {} * {} * {}",
                    width, height, channels
                ))
            })
    }

    /// Safely convert a pixel count to a `u32` graph index space
    pub fn pixel_count_to_u32(count: usize, reserved: usize) -> Result<u32> {
        count
            .checked_add(reserved)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                CutoutError::segmentation_failure(format!(
                    "image with {} pixels is too large to segment",
                    count
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quality() {
        assert!(NumericValidator::validate_quality(1).is_ok());
        assert!(NumericValidator::validate_quality(95).is_ok());
        assert!(NumericValidator::validate_quality(100).is_ok());

        assert!(NumericValidator::validate_quality(0).is_err());
        assert!(NumericValidator::validate_quality(101).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(NumericValidator::validate_range(5, 1, 50, "iterations").is_ok());
        assert!(NumericValidator::validate_range(1, 1, 50, "iterations").is_ok());
        assert!(NumericValidator::validate_range(50, 1, 50, "iterations").is_ok());

        let err = NumericValidator::validate_range(0, 1, 50, "iterations").unwrap_err();
        assert!(err.to_string().contains("iterations"));
        assert!(NumericValidator::validate_range(51, 1, 50, "iterations").is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(NumericValidator::validate_positive(1, "test").is_ok());
        assert!(NumericValidator::validate_positive(0, "test").is_err());
        assert!(NumericValidator::validate_positive(-1, "test").is_err());
    }

    #[test]
    fn test_validate_finite_positive() {
        assert!(NumericValidator::validate_finite_positive(50.0, "gamma").is_ok());
        assert!(NumericValidator::validate_finite_positive(0.0, "gamma").is_err());
        assert!(NumericValidator::validate_finite_positive(f64::NAN, "gamma").is_err());
        assert!(NumericValidator::validate_finite_positive(f64::INFINITY, "gamma").is_err());
    }

    #[test]
    fn test_buffer_len() {
        assert_eq!(NumericValidator::buffer_len(100, 50, 3).unwrap(), 15_000);
        assert_eq!(NumericValidator::buffer_len(0, 50, 3).unwrap(), 0);
    }

    #[test]
    fn test_pixel_count_to_u32() {
        assert_eq!(NumericValidator::pixel_count_to_u32(10_000, 2).unwrap(), 10_002);
        assert!(NumericValidator::pixel_count_to_u32(u32::MAX as usize, 2).is_err());
    }
}
