//! Mask collapse and white-background compositing

use crate::{
    error::{CutoutError, Result},
    types::{BinaryForegroundMask, LabelMask, PixelBuffer},
};

/// Collapse four-class labels into a keep/replace mask
#[must_use]
pub fn collapse(labels: &LabelMask) -> BinaryForegroundMask {
    BinaryForegroundMask::from_labels(labels)
}

/// Keep foreground pixels and paint every other pixel pure white
///
/// # Errors
/// - `Precondition` when the mask and buffer dimensions differ
pub fn composite(buffer: &PixelBuffer, mask: &BinaryForegroundMask) -> Result<PixelBuffer> {
    if mask.dimensions != buffer.dimensions() || mask.data.len() != buffer.pixel_count() {
        return Err(CutoutError::precondition(format!(
            "mask is {}x{} but image is {}x{}",
            mask.dimensions.0,
            mask.dimensions.1,
            buffer.width(),
            buffer.height()
        )));
    }

    let channels = usize::from(buffer.channels());
    let mut data = buffer.as_raw().to_vec();
    for (pixel, &keep) in data.chunks_exact_mut(channels).zip(&mask.data) {
        if keep == 0 {
            pixel.fill(u8::MAX);
        }
    }
    PixelBuffer::new(buffer.width(), buffer.height(), buffer.channels(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Label, SelectionRectangle, WHITE};
    use image::{Rgb, RgbImage};

    fn gradient() -> PixelBuffer {
        PixelBuffer::from_rgb_image(RgbImage::from_fn(16, 12, |x, y| {
            Rgb([(x * 10) as u8, (y * 20) as u8, 77])
        }))
    }

    fn centre_labels() -> LabelMask {
        let mut labels = LabelMask::new_background(16, 12);
        labels
            .fill_rect(&SelectionRectangle::new(4, 3, 6, 5), Label::ProbableForeground)
            .unwrap();
        labels.set(0, 0, Label::DefiniteForeground).unwrap();
        labels.set(5, 4, Label::ProbableBackground).unwrap();
        labels
    }

    #[test]
    fn test_pixels_are_kept_or_white() {
        let source = gradient();
        let mask = collapse(&centre_labels());
        let output = composite(&source, &mask).unwrap();

        assert_eq!(output.dimensions(), source.dimensions());
        for y in 0..12 {
            for x in 0..16 {
                let out = output.pixel(x, y).unwrap();
                if mask.is_foreground(x, y) {
                    assert_eq!(out, source.pixel(x, y).unwrap());
                } else {
                    assert_eq!(out, &WHITE[..]);
                }
            }
        }
        assert_eq!(mask.foreground_count(), 30);
    }

    #[test]
    fn test_composite_is_idempotent() {
        let source = gradient();
        let mask = collapse(&centre_labels());
        let once = composite(&source, &mask).unwrap();
        let twice = composite(&once, &mask).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_dimension_mismatch_is_precondition() {
        let source = gradient();
        let mask = collapse(&LabelMask::new_background(15, 12));
        let err = composite(&source, &mask).unwrap_err();
        assert!(matches!(err, CutoutError::Precondition(_)));
    }
}
