//! Configuration types for foreground extraction operations

use crate::{
    error::{CutoutError, Result},
    utils::NumericValidator,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Partition iterations used when nothing else is configured
pub const DEFAULT_ITERATIONS: u32 = 5;

/// Upper bound on partition iterations
pub const MAX_ITERATIONS: u32 = 50;

/// Mixture components per colour model
pub const DEFAULT_GMM_COMPONENTS: usize = 5;

/// Boundary smoothness weight (GrabCut gamma)
pub const DEFAULT_SMOOTHNESS: f64 = 50.0;

/// Quality used when re-encoding the stored image as JPEG
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Output image format for the persisted composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Match the stored file: the output extension decides, then the
    /// decoded input format; JPEG, PNG and TIFF are kept, anything else
    /// becomes JPEG
    #[default]
    #[serde(alias = "same_as_input")]
    Auto,
    /// Always lossy JPEG
    Jpeg,
    /// Always lossless PNG
    Png,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
        }
    }
}

/// How the `x`, `y`, `width`, `height` form fields are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldParsing {
    /// Missing or non-numeric fields become 0 and fail later in validation
    #[default]
    Lenient,
    /// Missing or non-numeric fields are rejected immediately
    Strict,
}

/// Configuration for cutout operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutoutConfig {
    /// Number of partition iterations (1-50)
    pub iterations: u32,

    /// Smallest accepted selection side in pixels
    pub min_selection_side: u32,

    /// Gaussian components per colour model (1-10)
    pub gmm_components: usize,

    /// Boundary smoothness weight
    pub smoothness: f64,

    /// Format the composite is re-encoded in
    pub output_format: OutputFormat,

    /// JPEG quality (1-100, only used for JPEG output)
    pub jpeg_quality: u8,

    /// Coordinate field parsing policy
    pub field_parsing: FieldParsing,

    /// Jobs the worker pool runs at once
    pub max_concurrent_jobs: usize,

    /// Per-job deadline in milliseconds (0 = no deadline)
    pub timeout_ms: u64,
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            min_selection_side: 10,
            gmm_components: DEFAULT_GMM_COMPONENTS,
            smoothness: DEFAULT_SMOOTHNESS,
            output_format: OutputFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            field_parsing: FieldParsing::default(),
            max_concurrent_jobs: 2,
            timeout_ms: 30_000,
        }
    }
}

impl CutoutConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use product_cutout::{CutoutConfig, OutputFormat};
    ///
    /// let config = CutoutConfig::builder()
    ///     .iterations(8)
    ///     .output_format(OutputFormat::Png)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.iterations, 8);
    /// ```
    #[must_use]
    pub fn builder() -> CutoutConfigBuilder {
        CutoutConfigBuilder::default()
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_range(self.iterations, 1, MAX_ITERATIONS, "iterations")?;
        NumericValidator::validate_positive(self.min_selection_side, "min_selection_side")?;
        NumericValidator::validate_range(self.gmm_components, 1, 10, "gmm_components")?;
        NumericValidator::validate_finite_positive(self.smoothness, "smoothness")?;
        NumericValidator::validate_quality(self.jpeg_quality)?;
        NumericValidator::validate_positive(self.max_concurrent_jobs, "max_concurrent_jobs")?;
        Ok(())
    }

    /// Per-job deadline, `None` when disabled
    #[must_use]
    pub fn timeout(&self) -> Option<std::time::Duration> {
        (self.timeout_ms > 0).then(|| std::time::Duration::from_millis(self.timeout_ms))
    }

    /// Load a JSON configuration file; absent keys keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CutoutError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            CutoutError::invalid_config(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CutoutError::invalid_config(format!("cannot serialize config: {}", e)))
    }
}

/// Builder for `CutoutConfig`
#[derive(Debug, Default)]
pub struct CutoutConfigBuilder {
    config: CutoutConfig,
}

impl CutoutConfigBuilder {
    #[must_use]
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.config.iterations = iterations;
        self
    }

    #[must_use]
    pub fn min_selection_side(mut self, side: u32) -> Self {
        self.config.min_selection_side = side;
        self
    }

    #[must_use]
    pub fn gmm_components(mut self, components: usize) -> Self {
        self.config.gmm_components = components;
        self
    }

    #[must_use]
    pub fn smoothness(mut self, gamma: f64) -> Self {
        self.config.smoothness = gamma;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set JPEG quality, clamped to 1-100
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn field_parsing(mut self, parsing: FieldParsing) -> Self {
        self.config.field_parsing = parsing;
        self
    }

    #[must_use]
    pub fn max_concurrent_jobs(mut self, jobs: usize) -> Self {
        self.config.max_concurrent_jobs = jobs;
        self
    }

    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<CutoutConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
