//! Cutout processor
//!
//! `CutoutProcessor` holds the configured validator and segmentation
//! engine and runs the full request flow: parse the selection, validate
//! it against the decoded image, segment, composite onto white, re-encode
//! and replace the stored file. The stored file is only written after
//! every earlier step has succeeded.

use crate::{
    config::CutoutConfig,
    error::Result,
    segmentation::{collapse, composite, GrabCutBackend, PartitionBackend, SegmentationEngine},
    services::{ImageIOService, OutputFormatHandler, PreviewEncoder, SelectionFields},
    types::{CutoutMetadata, CutoutResult, PixelBuffer, SelectionRectangle, StageTimings},
    utils::RegionValidator,
};
use image::ImageFormat;
use instant::Instant;
use std::path::Path;
use tracing::{debug, info, instrument, span, Level};

/// Validates selections, segments and persists cutouts
#[derive(Debug)]
pub struct CutoutProcessor {
    config: CutoutConfig,
    validator: RegionValidator,
    engine: SegmentationEngine,
}

impl CutoutProcessor {
    /// Create a processor with the GrabCut backend tuned from `config`
    ///
    /// # Errors
    /// - Invalid configuration values
    pub fn new(config: CutoutConfig) -> Result<Self> {
        config.validate()?;
        let backend = GrabCutBackend::new(config.gmm_components, config.smoothness)?;
        Self::with_backend(config, Box::new(backend))
    }

    /// Create a processor around a custom partition backend
    ///
    /// # Errors
    /// - Invalid configuration values
    pub fn with_backend(config: CutoutConfig, backend: Box<dyn PartitionBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            validator: RegionValidator::with_min_side(config.min_selection_side),
            engine: SegmentationEngine::new(backend, config.iterations),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &CutoutConfig {
        &self.config
    }

    #[must_use]
    pub fn engine(&self) -> &SegmentationEngine {
        &self.engine
    }

    /// Read the coordinate fields with the configured parsing policy
    pub fn parse_selection(&self, fields: &SelectionFields) -> Result<SelectionRectangle> {
        fields.parse(self.config.field_parsing)
    }

    /// Validate `rect` against the buffer's dimensions
    pub fn validate_selection(
        &self,
        buffer: &PixelBuffer,
        rect: SelectionRectangle,
    ) -> Result<SelectionRectangle> {
        let (width, height) = buffer.dimensions();
        self.validator.validate(width, height, rect)
    }

    /// Validate, segment and composite an in-memory buffer
    ///
    /// # Errors
    /// - `InvalidRegion` when the selection is rejected
    /// - `SegmentationFailure` when the partition step fails
    #[instrument(
        skip(self, buffer),
        fields(
            backend = self.engine.backend_name(),
            dimensions = %format!("{}x{}", buffer.width(), buffer.height()),
            rect = %rect
        )
    )]
    pub fn process_buffer(
        &self,
        buffer: &PixelBuffer,
        rect: SelectionRectangle,
    ) -> Result<CutoutResult> {
        let total_start = Instant::now();
        let mut timings = StageTimings::default();

        let rect = {
            let _span = span!(Level::DEBUG, "validation").entered();
            let start = Instant::now();
            let rect = self.validate_selection(buffer, rect)?;
            timings.validation_ms = start.elapsed().as_millis() as u64;
            rect
        };

        let labels = {
            let _span = span!(
                Level::INFO,
                "segmentation",
                iterations = self.engine.iterations()
            )
            .entered();
            let start = Instant::now();
            let labels = self.engine.label(buffer, &rect)?;
            timings.segmentation_ms = start.elapsed().as_millis() as u64;
            labels
        };

        let (image, mask) = {
            let _span = span!(Level::DEBUG, "composite").entered();
            let start = Instant::now();
            let mask = collapse(&labels);
            let image = composite(buffer, &mask)?;
            timings.compositing_ms = start.elapsed().as_millis() as u64;
            (image, mask)
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        info!(
            foreground = mask.foreground_count(),
            total_ms = timings.total_ms,
            "cutout finished"
        );

        Ok(CutoutResult {
            metadata: CutoutMetadata {
                backend: self.engine.backend_name().to_string(),
                iterations: self.engine.iterations(),
                foreground_pixels: mask.foreground_count(),
                foreground_ratio: mask.foreground_ratio(),
                timings,
            },
            image,
            mask,
            selection: rect,
        })
    }

    /// Decode a stored image as a 3-channel buffer
    pub fn load_input<P: AsRef<Path>>(path: P) -> Result<(PixelBuffer, Option<ImageFormat>)> {
        ImageIOService::load_buffer(path)
    }

    /// Decode `path` and run [`process_buffer`](Self::process_buffer) on it
    ///
    /// Nothing is written; returns the detected input format for encoding.
    pub fn load_and_process<P: AsRef<Path>>(
        &self,
        path: P,
        rect: SelectionRectangle,
    ) -> Result<(CutoutResult, Option<ImageFormat>)> {
        let (buffer, format) = Self::load_input(path)?;
        let result = self.process_buffer(&buffer, rect)?;
        Ok((result, format))
    }

    /// Encode the composite in the format configured for `output`
    pub fn encode_result<P: AsRef<Path>>(
        &self,
        result: &CutoutResult,
        output: P,
        input_format: Option<ImageFormat>,
    ) -> Result<(Vec<u8>, ImageFormat)> {
        let format =
            OutputFormatHandler::resolve(self.config.output_format, output, input_format);
        let bytes = OutputFormatHandler::encode(&result.image, format, self.config.jpeg_quality)?;
        Ok((bytes, format))
    }

    /// Encode `result` and atomically replace `path` with it
    ///
    /// Records the encoding time in the result's timings.
    pub fn persist_result<P: AsRef<Path>>(
        &self,
        result: &mut CutoutResult,
        path: P,
        input_format: Option<ImageFormat>,
    ) -> Result<()> {
        let path_ref = path.as_ref();
        let _span = span!(Level::DEBUG, "persist", path = %path_ref.display()).entered();

        let start = Instant::now();
        let (bytes, format) = self.encode_result(result, path_ref, input_format)?;
        ImageIOService::write_atomically(path_ref, &bytes)?;

        let encoding_ms = start.elapsed().as_millis() as u64;
        result.metadata.timings.encoding_ms = Some(encoding_ms);
        result.metadata.timings.total_ms += encoding_ms;
        debug!(format = ?format, bytes = bytes.len(), "cutout stored");
        Ok(())
    }

    /// Cut out the stored image at `path` and overwrite it with the composite
    ///
    /// Fails closed: on any error the file is left byte-identical.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn process_file<P: AsRef<Path>>(
        &self,
        path: P,
        rect: SelectionRectangle,
    ) -> Result<CutoutResult> {
        self.process_file_to(path.as_ref(), path.as_ref(), rect)
    }

    /// Cut out `input` and write the composite to `output`
    pub fn process_file_to<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
        rect: SelectionRectangle,
    ) -> Result<CutoutResult> {
        let (mut result, format) = self.load_and_process(input, rect)?;
        self.persist_result(&mut result, output, format)?;
        Ok(result)
    }

    /// Base64 JPEG preview of a stored image for the selection page
    pub fn preview<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let (buffer, _) = Self::load_input(path)?;
        PreviewEncoder::encode_base64_jpeg(&buffer, self.config.jpeg_quality)
    }
}
