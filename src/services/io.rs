//! Image I/O operations service
//!
//! This module separates file I/O operations from the segmentation logic.
//! Writes go through a temporary file in the target directory that is
//! renamed over the destination, so a failed write never leaves a
//! half-written image behind.

use crate::{
    error::{CutoutError, Result},
    types::PixelBuffer,
};
use image::{DynamicImage, ImageFormat};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// The format is guessed from the file contents first, so a stored
    /// upload with a misleading extension still decodes.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use product_cutout::services::ImageIOService;
    ///
    /// let (image, format) = ImageIOService::load_image("upload.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<(DynamicImage, Option<ImageFormat>)> {
        let path_ref = path.as_ref();
        let data = std::fs::read(path_ref)
            .map_err(|e| CutoutError::file_io_error("read image file", path_ref, &e))?;

        let format = image::guess_format(&data)
            .ok()
            .or_else(|| ImageFormat::from_path(path_ref).ok());
        let image = match format {
            Some(format) => image::load_from_memory_with_format(&data, format)?,
            None => image::load_from_memory(&data)?,
        };
        debug!(
            path = %path_ref.display(),
            width = image.width(),
            height = image.height(),
            format = ?format,
            "image loaded"
        );
        Ok((image, format))
    }

    /// Load an image as a 3-channel pixel buffer
    ///
    /// Alpha and extra channels are dropped, grayscale is expanded.
    pub fn load_buffer<P: AsRef<Path>>(path: P) -> Result<(PixelBuffer, Option<ImageFormat>)> {
        let (image, format) = Self::load_image(path)?;
        Ok((PixelBuffer::from_dynamic(&image), format))
    }

    /// Replace the file at `path` with `bytes`
    ///
    /// The bytes are written to a temporary file next to `path` and
    /// renamed into place. On any error the existing file is untouched.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use product_cutout::services::ImageIOService;
    ///
    /// ImageIOService::write_atomically("upload.jpg", &[0xFF, 0xD8])?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn write_atomically<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();
        let parent = match path_ref.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| CutoutError::file_io_error("create temporary file in", parent, &e))?;
        temp.write_all(bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| CutoutError::file_io_error("write temporary file for", path_ref, &e))?;
        temp.persist(path_ref)
            .map_err(|e| CutoutError::file_io_error("replace", path_ref, &e.error))?;

        debug!(path = %path_ref.display(), bytes = bytes.len(), "file replaced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_load_nonexistent_file() {
        let err = ImageIOService::load_buffer("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, CutoutError::Io(_)));
        assert!(err.to_string().contains("read image file"));
    }

    #[test]
    fn test_load_drops_alpha() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 0]))
            .save(&path)
            .unwrap();

        let (buffer, format) = ImageIOService::load_buffer(&path).unwrap();
        assert_eq!(format, Some(ImageFormat::Png));
        assert_eq!(buffer.channels(), 3);
        assert_eq!(buffer.dimensions(), (4, 3));
        assert_eq!(buffer.pixel(0, 0).unwrap(), &[10, 20, 30][..]);
    }

    #[test]
    fn test_content_beats_extension() {
        let dir = tempdir().unwrap();
        let png_path = dir.path().join("real.png");
        RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])).save(&png_path).unwrap();
        let misnamed = dir.path().join("upload.jpg");
        std::fs::copy(&png_path, &misnamed).unwrap();

        let (_, format) = ImageIOService::load_buffer(&misnamed).unwrap();
        assert_eq!(format, Some(ImageFormat::Png));
    }

    #[test]
    fn test_undecodable_bytes_are_image_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = ImageIOService::load_buffer(&path).unwrap_err();
        assert!(matches!(err, CutoutError::Image(_)));
    }

    #[test]
    fn test_write_atomically_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stored.bin");
        std::fs::write(&path, b"old").unwrap();

        ImageIOService::write_atomically(&path, b"new contents").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new contents");

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_write_atomically_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("stored.bin");
        let err = ImageIOService::write_atomically(&path, b"x").unwrap_err();
        assert!(matches!(err, CutoutError::Io(_)));
        assert!(!path.exists());
    }
}
