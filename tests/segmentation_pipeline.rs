//! End-to-end segmentation behaviour on synthetic product shots
//!
//! Images are generated with the `image` crate so every expectation is
//! known exactly.

use image::{Rgb, RgbImage};
use product_cutout::{
    cut_out,
    error::{CutoutError, Result},
    segmentation::{collapse, composite},
    CutoutConfig, CutoutProcessor, GrabCutBackend, Label, LabelMask, PixelBuffer,
    SegmentationEngine, SelectionRectangle,
};

const WHITE: [u8; 3] = [255, 255, 255];
const CARD: Rgb<u8> = Rgb([200, 200, 200]);
const PRODUCT: Rgb<u8> = Rgb([200, 30, 30]);

/// Grey backdrop with a red square at (20..40, 20..40)
fn product_shot() -> PixelBuffer {
    PixelBuffer::from_rgb_image(RgbImage::from_fn(60, 60, |x, y| {
        if (20..40).contains(&x) && (20..40).contains(&y) {
            PRODUCT
        } else {
            CARD
        }
    }))
}

/// Every output pixel is either the source pixel or pure white
fn assert_kept_or_white(source: &PixelBuffer, output: &PixelBuffer) {
    assert_eq!(source.dimensions(), output.dimensions());
    let (width, height) = source.dimensions();
    for y in 0..height {
        for x in 0..width {
            let out = output.pixel(x, y).unwrap();
            assert!(
                out == source.pixel(x, y).unwrap() || out == WHITE,
                "pixel ({}, {}) is neither source nor white: {:?}",
                x,
                y,
                out
            );
        }
    }
}

#[test]
fn test_uniform_gray_image_succeeds() -> Result<()> {
    let gray = PixelBuffer::filled(100, 100, [128, 128, 128]);
    let output = cut_out(&gray, SelectionRectangle::new(10, 10, 50, 50))?;
    assert_eq!(output.dimensions(), (100, 100));
    assert_kept_or_white(&gray, &output);
    Ok(())
}

#[test]
fn test_product_is_kept_and_backdrop_turns_white() -> Result<()> {
    let shot = product_shot();
    let output = cut_out(&shot, SelectionRectangle::new(10, 10, 40, 40))?;

    assert_kept_or_white(&shot, &output);
    assert_eq!(output.pixel(30, 30).unwrap(), &PRODUCT.0[..]);
    assert_eq!(output.pixel(20, 20).unwrap(), &PRODUCT.0[..]);
    assert_eq!(output.pixel(39, 39).unwrap(), &PRODUCT.0[..]);
    // Inside the selection but part of the backdrop
    assert_eq!(output.pixel(12, 12).unwrap(), &WHITE[..]);
    // Outside the selection
    assert_eq!(output.pixel(0, 59).unwrap(), &WHITE[..]);
    Ok(())
}

#[test]
fn test_nothing_outside_the_selection_survives() -> Result<()> {
    let shot = product_shot();
    let output = cut_out(&shot, SelectionRectangle::new(15, 15, 30, 30))?;
    for y in 0..60u32 {
        for x in 0..60u32 {
            let inside = (15..45).contains(&x) && (15..45).contains(&y);
            if !inside {
                assert_eq!(output.pixel(x, y).unwrap(), &WHITE[..], "({}, {})", x, y);
            }
        }
    }
    Ok(())
}

#[test]
fn test_processor_reports_foreground_share() -> Result<()> {
    let processor = CutoutProcessor::new(CutoutConfig::default())?;
    let result = processor.process_buffer(&product_shot(), SelectionRectangle::new(10, 10, 40, 40))?;

    assert_eq!(result.metadata.backend, "grabcut");
    assert_eq!(result.metadata.iterations, 5);
    assert_eq!(result.metadata.foreground_pixels, 400);
    assert_eq!(result.mask.foreground_count(), 400);
    assert!((result.metadata.foreground_ratio - 400.0 / 3600.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_segmentation_is_deterministic() -> Result<()> {
    let shot = product_shot();
    let rect = SelectionRectangle::new(10, 10, 40, 40);
    let first = cut_out(&shot, rect)?;
    let second = cut_out(&shot, rect)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_collapse_and_composite_is_idempotent() -> Result<()> {
    let shot = product_shot();
    let labels = SegmentationEngine::default().label(&shot, &SelectionRectangle::new(10, 10, 40, 40))?;
    let mask = collapse(&labels);

    let once = composite(&shot, &mask)?;
    let twice = composite(&once, &mask)?;
    assert_eq!(once, twice);
    assert_eq!(collapse(&labels), mask);
    Ok(())
}

#[test]
fn test_labels_outside_selection_stay_definite_background() -> Result<()> {
    let shot = product_shot();
    let labels = SegmentationEngine::default().label(&shot, &SelectionRectangle::new(10, 10, 40, 40))?;
    assert_eq!(labels.get(5, 5), Some(Label::DefiniteBackground));
    assert_eq!(labels.get(55, 30), Some(Label::DefiniteBackground));
    assert_eq!(labels.count(Label::DefiniteForeground), 0);
    assert_eq!(
        labels.count(Label::DefiniteBackground),
        3600 - 40 * 40,
        "only cells inside the selection may change"
    );
    Ok(())
}

#[test]
fn test_more_iterations_keep_a_stable_answer() -> Result<()> {
    let shot = product_shot();
    let rect = SelectionRectangle::new(10, 10, 40, 40);
    let short = SegmentationEngine::new(Box::new(GrabCutBackend::default()), 1).segment(&shot, &rect)?;
    let long = SegmentationEngine::new(Box::new(GrabCutBackend::default()), 10).segment(&shot, &rect)?;
    assert_eq!(short, long);
    Ok(())
}

#[test]
fn test_single_component_models_still_separate() -> Result<()> {
    let shot = product_shot();
    let engine = SegmentationEngine::new(Box::new(GrabCutBackend::new(1, 50.0)?), 5);
    let output = engine.segment(&shot, &SelectionRectangle::new(10, 10, 40, 40))?;
    assert_eq!(output.pixel(30, 30).unwrap(), &PRODUCT.0[..]);
    assert_eq!(output.pixel(12, 12).unwrap(), &WHITE[..]);
    Ok(())
}

/// Deterministic per-pixel noise in 0..12
fn noise(x: u32, y: u32) -> u8 {
    let h = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663);
    (h % 12) as u8
}

/// Striped backdrop whose green and blue channels move together, with a
/// noisy red object in the middle
fn tinted_backdrop_shot(width: u32, height: u32, independent_noise: bool) -> PixelBuffer {
    PixelBuffer::from_rgb_image(RgbImage::from_fn(width, height, |x, y| {
        let n = noise(x, y);
        let m = if independent_noise { noise(y, x) } else { n };
        let inside = (width * 3 / 8..width * 5 / 8).contains(&x)
            && (height * 3 / 8..height * 5 / 8).contains(&y);
        if inside {
            Rgb([180 + n, 40 + m, 40 + n])
        } else {
            let red = if (x / 16) % 2 == 0 { 200 } else { 230 };
            Rgb([red, 200 + n, 190 + m])
        }
    }))
}

#[test]
fn test_noisy_tinted_backdrops_segment_at_any_size() -> Result<()> {
    for (width, height) in [(120, 90), (300, 300), (400, 300)] {
        for independent_noise in [false, true] {
            let shot = tinted_backdrop_shot(width, height, independent_noise);
            let rect = SelectionRectangle::new(
                i64::from(width / 8),
                i64::from(height / 8),
                i64::from(width * 3 / 4),
                i64::from(height * 3 / 4),
            );
            let output = cut_out(&shot, rect).map_err(|e| {
                CutoutError::segmentation_failure(format!(
                    "{}x{} independent={}: {}",
                    width, height, independent_noise, e
                ))
            })?;
            assert_kept_or_white(&shot, &output);
            assert_eq!(output.pixel(0, 0).unwrap(), &WHITE[..]);
        }
    }
    Ok(())
}

#[test]
fn test_single_channel_buffer_fails_segmentation() {
    let gray = PixelBuffer::new(50, 50, 1, vec![90; 2500]).unwrap();
    let err = SegmentationEngine::default()
        .segment(&gray, &SelectionRectangle::new(10, 10, 20, 20))
        .unwrap_err();
    assert!(matches!(err, CutoutError::SegmentationFailure(_)));
    assert!(err.user_message().contains("Please try selecting a different area."));
}

#[test]
fn test_whole_image_selection_fails_closed() {
    let shot = product_shot();
    let err = cut_out(&shot, SelectionRectangle::new(0, 0, 60, 60)).unwrap_err();
    assert!(matches!(err, CutoutError::SegmentationFailure(_)));
    assert!(err.is_client_error());
}

#[test]
fn test_hand_built_mask_composites_exactly() -> Result<()> {
    let shot = product_shot();
    let mut labels = LabelMask::new_background(60, 60);
    labels.fill_rect(&SelectionRectangle::new(0, 0, 2, 2), Label::DefiniteForeground)?;
    labels.set(59, 59, Label::ProbableForeground)?;
    labels.set(0, 1, Label::ProbableBackground)?;

    let output = composite(&shot, &collapse(&labels))?;
    assert_eq!(output.pixel(0, 0).unwrap(), &CARD.0[..]);
    assert_eq!(output.pixel(1, 1).unwrap(), &CARD.0[..]);
    assert_eq!(output.pixel(0, 1).unwrap(), &WHITE[..]);
    assert_eq!(output.pixel(59, 59).unwrap(), &CARD.0[..]);
    assert_eq!(output.pixel(30, 30).unwrap(), &WHITE[..]);
    Ok(())
}
