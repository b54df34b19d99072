//! Output format handling service
//!
//! Decides which container the composite is stored in and encodes it.

use crate::{
    config::OutputFormat,
    error::{CutoutError, Result},
    types::PixelBuffer,
    utils::NumericValidator,
};
use image::{codecs::jpeg::JpegEncoder, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Service for encoding composites
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Resolve the configured format for a composite stored at `output`
    ///
    /// `Auto` follows the output path's extension, then the decoded input
    /// format, then falls back to JPEG. Only JPEG, PNG and TIFF are ever
    /// chosen.
    ///
    /// # Examples
    /// ```rust
    /// use product_cutout::{services::OutputFormatHandler, OutputFormat};
    /// use image::ImageFormat;
    ///
    /// let stored = OutputFormatHandler::resolve(OutputFormat::Auto, "media/lamp.png", Some(ImageFormat::Jpeg));
    /// assert_eq!(stored, ImageFormat::Png);
    /// assert_eq!(
    ///     OutputFormatHandler::resolve(OutputFormat::Jpeg, "media/lamp.png", None),
    ///     ImageFormat::Jpeg
    /// );
    /// ```
    #[must_use]
    pub fn resolve<P: AsRef<Path>>(
        format: OutputFormat,
        output: P,
        input: Option<ImageFormat>,
    ) -> ImageFormat {
        match format {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Auto => ImageFormat::from_path(output.as_ref())
                .ok()
                .and_then(Self::storable)
                .or_else(|| input.and_then(Self::storable))
                .unwrap_or(ImageFormat::Jpeg),
        }
    }

    fn storable(format: ImageFormat) -> Option<ImageFormat> {
        matches!(format, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Tiff).then_some(format)
    }

    /// Encode a 3-channel buffer
    ///
    /// # Arguments
    /// * `buffer` - Composite to encode
    /// * `format` - Target container (JPEG, PNG or TIFF)
    /// * `quality` - JPEG quality (1-100), ignored for lossless formats
    pub fn encode(buffer: &PixelBuffer, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
        let image = buffer.clone().into_rgb_image()?;
        let mut bytes = Vec::new();
        match format {
            ImageFormat::Jpeg => {
                let quality = NumericValidator::validate_quality(quality)?;
                let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
                encoder.encode_image(&image)?;
            },
            ImageFormat::Png | ImageFormat::Tiff => {
                image.write_to(&mut Cursor::new(&mut bytes), format)?;
            },
            other => {
                return Err(CutoutError::invalid_config(format!(
                    "unsupported output format {:?}",
                    other
                )));
            },
        }
        Ok(bytes)
    }
}
