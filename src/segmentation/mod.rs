//! Foreground segmentation seeded by a selection rectangle
//!
//! [`SegmentationEngine`] owns the whole per-request flow: a fresh label
//! mask, the iterative partition, the collapse to a binary mask and the
//! white-background composite. The partition itself sits behind
//! [`PartitionBackend`].

pub mod composite;
mod gmm;
pub mod grabcut;
mod kmeans;
mod maxflow;
pub mod seed;

pub use composite::{collapse, composite};
pub use grabcut::GrabCutBackend;
pub use seed::SeedOnlyBackend;

use crate::{
    config::DEFAULT_ITERATIONS,
    error::{CutoutError, Result},
    types::{BinaryForegroundMask, Label, LabelMask, PixelBuffer, SelectionRectangle},
};
use tracing::{debug, span, warn, Level};

/// Iterative foreground/background partitioning of a labelled image
pub trait PartitionBackend: Send + Sync {
    /// Short backend identifier used in logs and result metadata
    fn name(&self) -> &'static str;

    /// Refine `mask` in place over `iterations` rounds, seeded by `rect`
    ///
    /// On entry every cell is definite background. Implementations only
    /// move cells between the probable classes after seeding.
    ///
    /// # Errors
    /// - Degenerate colour statistics or empty sample sets
    /// - Non-finite energies during the cut
    /// - `Precondition` when the mask does not match the image
    fn refine(
        &self,
        image: &PixelBuffer,
        rect: &SelectionRectangle,
        iterations: u32,
        mask: &mut LabelMask,
    ) -> Result<()>;
}

/// Runs a partition backend and composites the result onto white
pub struct SegmentationEngine {
    backend: Box<dyn PartitionBackend>,
    iterations: u32,
}

impl std::fmt::Debug for SegmentationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationEngine")
            .field("backend", &self.backend.name())
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl Default for SegmentationEngine {
    fn default() -> Self {
        Self::new(Box::new(GrabCutBackend::default()), DEFAULT_ITERATIONS)
    }
}

impl SegmentationEngine {
    #[must_use]
    pub fn new(backend: Box<dyn PartitionBackend>, iterations: u32) -> Self {
        Self {
            backend,
            iterations,
        }
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Segment `buffer` and return the white-background composite
    ///
    /// # Errors
    /// - `SegmentationFailure` for unusable buffers or a failed partition
    /// - `Precondition` if the backend hands back a mask of the wrong size
    pub fn segment(&self, buffer: &PixelBuffer, rect: &SelectionRectangle) -> Result<PixelBuffer> {
        let (image, _) = self.segment_with_mask(buffer, rect)?;
        Ok(image)
    }

    /// Like [`segment`](Self::segment), also returning the binary mask
    pub fn segment_with_mask(
        &self,
        buffer: &PixelBuffer,
        rect: &SelectionRectangle,
    ) -> Result<(PixelBuffer, BinaryForegroundMask)> {
        let labels = self.label(buffer, rect)?;
        let mask = collapse(&labels);
        let image = composite(buffer, &mask)?;
        Ok((image, mask))
    }

    /// Run only the partition step and return the four-class labels
    ///
    /// # Errors
    /// - `SegmentationFailure` for unusable buffers or a failed partition
    /// - `Precondition` if the backend hands back a mask of the wrong size
    pub fn label(&self, buffer: &PixelBuffer, rect: &SelectionRectangle) -> Result<LabelMask> {
        let (width, height) = buffer.dimensions();
        let span = span!(
            Level::DEBUG,
            "partition",
            width,
            height,
            rect = %rect,
            backend = self.backend.name()
        );
        let _guard = span.enter();

        Self::preflight(buffer, rect)?;

        let mut labels = LabelMask::new_background(width, height);
        self.backend
            .refine(buffer, rect, self.iterations, &mut labels)
            .map_err(|e| match e {
                CutoutError::Precondition(_) | CutoutError::SegmentationFailure(_) => e,
                other => CutoutError::segmentation_failure(other.to_string()),
            })
            .inspect_err(|e| warn!(error = %e, "partition failed"))?;

        if labels.dimensions() != (width, height) {
            return Err(CutoutError::precondition(format!(
                "backend returned a {}x{} mask for a {}x{} image",
                labels.width(),
                labels.height(),
                width,
                height
            )));
        }
        debug!(
            probable_foreground = labels.count(Label::ProbableForeground),
            "partition finished"
        );
        Ok(labels)
    }

    fn preflight(buffer: &PixelBuffer, rect: &SelectionRectangle) -> Result<()> {
        if buffer.channels() != 3 {
            return Err(CutoutError::segmentation_failure(format!(
                "expected a 3-channel image, got {} channel(s)",
                buffer.channels()
            )));
        }
        let (width, height) = buffer.dimensions();
        if width == 0 || height == 0 {
            return Err(CutoutError::segmentation_failure(format!(
                "image is empty ({}x{})",
                width, height
            )));
        }
        if !rect.fits_within(width, height) {
            return Err(CutoutError::segmentation_failure(format!(
                "selection {} lies outside the {}x{} image",
                rect, width, height
            )));
        }
        Ok(())
    }
}
