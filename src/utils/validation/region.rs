//! Geometric validation of user-drawn selections
//!
//! Rejects rectangles that fall outside the image or are too small to
//! carry useful colour statistics, before any segmentation work starts.

use crate::{
    error::{CutoutError, Result},
    types::SelectionRectangle,
};

/// Smallest accepted selection side, in pixels
pub const MIN_SELECTION_SIDE: i64 = 10;

/// Validator for selection rectangles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionValidator {
    min_side: i64,
}

impl Default for RegionValidator {
    fn default() -> Self {
        Self {
            min_side: MIN_SELECTION_SIDE,
        }
    }
}

impl RegionValidator {
    /// Validator with a custom minimum side length
    #[must_use]
    pub fn with_min_side(min_side: u32) -> Self {
        Self {
            min_side: i64::from(min_side),
        }
    }

    #[must_use]
    pub fn min_side(&self) -> i64 {
        self.min_side
    }

    /// Check `rect` against a `image_width × image_height` image
    ///
    /// Returns the rectangle unchanged on success. Nothing is clamped or
    /// coerced; any violation is an `InvalidRegion` naming the rule.
    ///
    /// # Examples
    /// ```rust
    /// use product_cutout::{RegionValidator, SelectionRectangle};
    ///
    /// let validator = RegionValidator::default();
    /// assert!(validator.validate(100, 100, SelectionRectangle::new(10, 10, 50, 50)).is_ok());
    /// assert!(validator.validate(100, 100, SelectionRectangle::new(0, 0, 9, 50)).is_err());
    /// ```
    pub fn validate(
        &self,
        image_width: u32,
        image_height: u32,
        rect: SelectionRectangle,
    ) -> Result<SelectionRectangle> {
        if rect.width < self.min_side {
            return Err(CutoutError::invalid_region(format!(
                "width {} is below the minimum of {}",
                rect.width, self.min_side
            )));
        }
        if rect.height < self.min_side {
            return Err(CutoutError::invalid_region(format!(
                "height {} is below the minimum of {}",
                rect.height, self.min_side
            )));
        }
        if rect.x < 0 || rect.y < 0 {
            return Err(CutoutError::invalid_region(format!(
                "origin ({}, {}) lies outside the image",
                rect.x, rect.y
            )));
        }
        if rect.right().map_or(true, |r| r > i64::from(image_width)) {
            return Err(CutoutError::invalid_region(format!(
                "selection {} extends past the image width of {}",
                rect, image_width
            )));
        }
        if rect.bottom().map_or(true, |b| b > i64::from(image_height)) {
            return Err(CutoutError::invalid_region(format!(
                "selection {} extends past the image height of {}",
                rect, image_height
            )));
        }
        Ok(rect)
    }
}
