//! Inline JPEG preview for the area-selection page

use super::OutputFormatHandler;
use crate::{error::Result, types::PixelBuffer};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;

/// Encodes images for embedding as `data:image/jpeg;base64,...`
pub struct PreviewEncoder;

impl PreviewEncoder {
    /// JPEG-encode `buffer` and return it as standard base64
    pub fn encode_base64_jpeg(buffer: &PixelBuffer, quality: u8) -> Result<String> {
        let bytes = OutputFormatHandler::encode(buffer, ImageFormat::Jpeg, quality)?;
        Ok(STANDARD.encode(bytes))
    }

    /// Same as [`encode_base64_jpeg`](Self::encode_base64_jpeg) wrapped in a data URI
    pub fn encode_data_uri(buffer: &PixelBuffer, quality: u8) -> Result<String> {
        Ok(format!(
            "data:image/jpeg;base64,{}",
            Self::encode_base64_jpeg(buffer, quality)?
        ))
    }
}
