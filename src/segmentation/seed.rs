//! Backend that keeps the seed rectangle as-is

use super::PartitionBackend;
use crate::{
    error::Result,
    types::{Label, LabelMask, PixelBuffer, SelectionRectangle},
};

/// Marks the rectangle interior probable-foreground and stops there
///
/// Useful as a fast baseline and for exercising the pipeline in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedOnlyBackend;

impl PartitionBackend for SeedOnlyBackend {
    fn name(&self) -> &'static str {
        "seed-only"
    }

    fn refine(
        &self,
        _image: &PixelBuffer,
        rect: &SelectionRectangle,
        _iterations: u32,
        mask: &mut LabelMask,
    ) -> Result<()> {
        mask.fill_rect(rect, Label::ProbableForeground)
    }
}
