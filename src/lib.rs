#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::many_single_char_names)]

//! # Product Cutout
//!
//! Interactive foreground extraction for product photos. The shopper draws
//! a rectangle around the product; everything the segmentation decides is
//! background is replaced with pure white and the stored image is
//! overwritten with the result.
//!
//! The pipeline has two stages:
//!
//! - **Region validation** ([`RegionValidator`]): the selection must be at
//!   least 10×10 pixels and lie fully inside the image.
//! - **Segmentation** ([`SegmentationEngine`]): an iterative GrabCut
//!   partition (Gaussian mixture colour models plus an s/t min-cut),
//!   collapsed to a binary mask and composited onto white.
//!
//! ## Features
//!
//! - **Fail closed**: the stored file is replaced atomically and only after
//!   every stage succeeded
//! - **Typed errors**: rejected selections and engine failures map to a
//!   client-facing "bad request" class with a readable message
//! - **Bounded worker pool**: CPU-heavy jobs run on tokio's blocking pool
//!   with a concurrency cap and a per-job deadline
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use product_cutout::{CutoutConfig, CutoutProcessor, SelectionRectangle};
//!
//! # fn example() -> anyhow::Result<()> {
//! let processor = CutoutProcessor::new(CutoutConfig::default())?;
//! let result = processor.process_file("uploads/lamp.jpg", SelectionRectangle::new(40, 30, 220, 310))?;
//! println!("{}", result.timings().summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## In-memory usage
//!
//! ```rust
//! use product_cutout::{cut_out, PixelBuffer, SelectionRectangle};
//!
//! let photo = PixelBuffer::filled(100, 100, [128, 128, 128]);
//! let cutout = cut_out(&photo, SelectionRectangle::new(10, 10, 50, 50)).unwrap();
//! assert_eq!(cutout.dimensions(), (100, 100));
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `tracing-json`: JSON log output for the CLI

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod processor;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;
pub mod worker;

use std::path::Path;

// Public API exports
pub use config::{CutoutConfig, CutoutConfigBuilder, FieldParsing, OutputFormat};
pub use error::{CutoutError, Result};
pub use processor::CutoutProcessor;
pub use segmentation::{GrabCutBackend, PartitionBackend, SeedOnlyBackend, SegmentationEngine};
pub use services::{ImageIOService, OutputFormatHandler, PreviewEncoder, SelectionFields};
pub use types::{
    BinaryForegroundMask, CutoutMetadata, CutoutResult, Label, LabelMask, PixelBuffer,
    SelectionRectangle, StageTimings,
};
pub use utils::{NumericValidator, RegionValidator};
pub use worker::CutoutWorkerPool;

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Check a selection against an image of the given size with default rules
///
/// # Examples
/// ```rust
/// use product_cutout::{validate_selection, SelectionRectangle};
///
/// assert!(validate_selection(40, 40, SelectionRectangle::new(0, 0, 50, 50)).is_err());
/// ```
pub fn validate_selection(
    image_width: u32,
    image_height: u32,
    rect: SelectionRectangle,
) -> Result<SelectionRectangle> {
    RegionValidator::default().validate(image_width, image_height, rect)
}

/// Validate `rect` and return the white-background composite of `buffer`
///
/// Uses the default GrabCut engine (5 iterations). No I/O.
pub fn cut_out(buffer: &PixelBuffer, rect: SelectionRectangle) -> Result<PixelBuffer> {
    let (width, height) = buffer.dimensions();
    let rect = validate_selection(width, height, rect)?;
    SegmentationEngine::default().segment(buffer, &rect)
}

/// Cut out the stored image at `path` in place with the default configuration
pub fn cut_out_file<P: AsRef<Path>>(path: P, rect: SelectionRectangle) -> Result<CutoutResult> {
    CutoutProcessor::new(CutoutConfig::default())?.process_file(path, rect)
}
