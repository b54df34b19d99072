//! Core types for foreground extraction operations

use crate::{
    error::{CutoutError, Result},
    utils::NumericValidator,
};
use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Pure white, the colour every background pixel is replaced with
pub const WHITE: [u8; 3] = [255, 255, 255];

/// Dense row-major 8-bit pixel grid (`height × width × channels`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw bytes, checking that the length matches the declared layout
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        let expected = NumericValidator::buffer_len(width, height, channels)?;
        if data.len() != expected {
            return Err(CutoutError::precondition(format!(
                "buffer of {}x{}x{} needs {} bytes, got {}",
                width,
                height,
                channels,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Take ownership of an RGB image without copying
    #[must_use]
    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: 3,
            data: image.into_raw(),
        }
    }

    /// Decode-side conversion: any image becomes 3-channel RGB, alpha is dropped
    #[must_use]
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::from_rgb_image(image.to_rgb8())
    }

    /// A buffer where every pixel is `color`
    #[must_use]
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self::from_rgb_image(RgbImage::from_pixel(width, height, image::Rgb(color)))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Channel values of the pixel at (x, y)
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = usize::from(self.channels);
        let start = (y as usize * self.width as usize + x as usize) * channels;
        self.data.get(start..start + channels)
    }

    /// Convert back into an `image` crate RGB buffer
    pub fn into_rgb_image(self) -> Result<RgbImage> {
        if self.channels != 3 {
            return Err(CutoutError::precondition(format!(
                "expected a 3-channel buffer, got {} channel(s)",
                self.channels
            )));
        }
        let (width, height) = (self.width, self.height);
        RgbImage::from_raw(width, height, self.data).ok_or_else(|| {
            CutoutError::precondition(format!("buffer does not fill a {}x{} image", width, height))
        })
    }
}

/// Axis-aligned selection in source pixel coordinates, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionRectangle {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl SelectionRectangle {
    #[must_use]
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge, `None` on overflow
    #[must_use]
    pub fn right(&self) -> Option<i64> {
        self.x.checked_add(self.width)
    }

    /// Exclusive bottom edge, `None` on overflow
    #[must_use]
    pub fn bottom(&self) -> Option<i64> {
        self.y.checked_add(self.height)
    }

    /// Whether the rectangle is non-empty and lies entirely inside a `width × height` image
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width > 0
            && self.height > 0
            && self.right().is_some_and(|r| r <= i64::from(width))
            && self.bottom().is_some_and(|b| b <= i64::from(height))
    }
}

impl std::fmt::Display for SelectionRectangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Per-pixel classification produced by the partition step
///
/// The discriminants match the conventional GrabCut mask encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Label {
    #[default]
    DefiniteBackground = 0,
    DefiniteForeground = 1,
    ProbableBackground = 2,
    ProbableForeground = 3,
}

impl Label {
    /// Foreground class after collapsing to two classes
    #[must_use]
    pub fn is_foreground(self) -> bool {
        matches!(self, Self::DefiniteForeground | Self::ProbableForeground)
    }

    /// Labels the refinement step is allowed to flip
    #[must_use]
    pub fn is_probable(self) -> bool {
        matches!(self, Self::ProbableBackground | Self::ProbableForeground)
    }
}

/// Four-class label grid, indexed `[row, column]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMask {
    labels: Array2<Label>,
}

impl LabelMask {
    /// Mask of `width × height` cells, all definite background
    #[must_use]
    pub fn new_background(width: u32, height: u32) -> Self {
        Self {
            labels: Array2::from_elem((height as usize, width as usize), Label::DefiniteBackground),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.labels.ncols() as u32
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.labels.nrows() as u32
    }

    /// (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Label> {
        self.labels.get((y as usize, x as usize)).copied()
    }

    pub fn set(&mut self, x: u32, y: u32, label: Label) -> Result<()> {
        let (width, height) = self.dimensions();
        let cell = self.labels.get_mut((y as usize, x as usize)).ok_or_else(|| {
            CutoutError::precondition(format!(
                "cell ({}, {}) outside {}x{} mask",
                x, y, width, height
            ))
        })?;
        *cell = label;
        Ok(())
    }

    /// Label a rectangle that must lie inside the mask
    pub fn fill_rect(&mut self, rect: &SelectionRectangle, label: Label) -> Result<()> {
        let (width, height) = self.dimensions();
        if !rect.fits_within(width, height) {
            return Err(CutoutError::precondition(format!(
                "rectangle {} does not fit a {}x{} mask",
                rect, width, height
            )));
        }
        let (x0, y0) = (rect.x as usize, rect.y as usize);
        let (x1, y1) = (x0 + rect.width as usize, y0 + rect.height as usize);
        self.labels
            .slice_mut(ndarray::s![y0..y1, x0..x1])
            .fill(label);
        Ok(())
    }

    /// Number of cells carrying `label`
    #[must_use]
    pub fn count(&self, label: Label) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    /// Labels in row-major order
    pub fn iter(&self) -> impl Iterator<Item = Label> + '_ {
        self.labels.iter().copied()
    }

    #[must_use]
    pub fn as_array(&self) -> &Array2<Label> {
        &self.labels
    }

    pub fn as_array_mut(&mut self) -> &mut Array2<Label> {
        &mut self.labels
    }
}

/// Two-class mask derived from a [`LabelMask`]: 1 = foreground, 0 = background
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryForegroundMask {
    /// One byte per pixel, row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl BinaryForegroundMask {
    /// Collapse four labels to two classes
    #[must_use]
    pub fn from_labels(labels: &LabelMask) -> Self {
        let data = labels.iter().map(|l| u8::from(l.is_foreground())).collect();
        Self {
            data,
            dimensions: labels.dimensions(),
        }
    }

    #[must_use]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        let (width, height) = self.dimensions;
        if x >= width || y >= height {
            return false;
        }
        self.data
            .get(y as usize * width as usize + x as usize)
            .is_some_and(|&v| v != 0)
    }

    #[must_use]
    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Share of pixels kept, 0.0 for an empty mask
    #[must_use]
    pub fn foreground_ratio(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.foreground_count() as f64 / self.data.len() as f64
    }

    /// Black/white rendering for debugging (foreground = 255)
    #[must_use]
    pub fn to_image(&self) -> GrayImage {
        let (width, height) = self.dimensions;
        GrayImage::from_fn(width, height, |x, y| {
            image::Luma([if self.is_foreground(x, y) { 255 } else { 0 }])
        })
    }
}

/// Wall-clock breakdown of one cutout in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub validation_ms: u64,
    pub segmentation_ms: u64,
    pub compositing_ms: u64,
    pub encoding_ms: Option<u64>,
    pub total_ms: u64,
}

impl StageTimings {
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Total: {}ms | Validate: {}ms | Segment: {}ms | Composite: {}ms",
            self.total_ms, self.validation_ms, self.segmentation_ms, self.compositing_ms
        );
        if let Some(encoding_ms) = self.encoding_ms {
            summary.push_str(&format!(" | Encode: {}ms", encoding_ms));
        }
        summary
    }
}

/// Descriptive data about a finished cutout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoutMetadata {
    /// Partition backend that produced the labels
    pub backend: String,
    pub iterations: u32,
    pub foreground_pixels: usize,
    pub foreground_ratio: f64,
    pub timings: StageTimings,
}

/// Outcome of a successful cutout
#[derive(Debug, Clone)]
pub struct CutoutResult {
    /// White-background composite, same dimensions as the source
    pub image: PixelBuffer,

    /// Mask the composite was built from
    pub mask: BinaryForegroundMask,

    /// Selection that seeded the segmentation
    pub selection: SelectionRectangle,

    pub metadata: CutoutMetadata,
}

impl CutoutResult {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn timings(&self) -> &StageTimings {
        &self.metadata.timings
    }
}
