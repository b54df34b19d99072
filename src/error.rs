//! Error types for foreground extraction operations

use thiserror::Error;

/// Result type alias for cutout operations
pub type Result<T> = std::result::Result<T, CutoutError>;

/// Hint attached to every segmentation failure shown to a shopper
pub const SEGMENTATION_RETRY_HINT: &str = "Please try selecting a different area.";

/// Hint attached to every rejected selection shown to a shopper
pub const SELECTION_RETRY_HINT: &str = "Please select a larger area.";

/// Error types for the cutout pipeline
#[derive(Error, Debug)]
pub enum CutoutError {
    /// The user-drawn selection failed geometric validation
    #[error("Invalid selection area: {0}")]
    InvalidRegion(String),

    /// The iterative partition step could not produce a segmentation
    #[error("Segmentation failed: {0}")]
    SegmentationFailure(String),

    /// A submitted coordinate field could not be parsed (strict parsing only)
    #[error("Invalid form field: {0}")]
    InvalidField(String),

    /// Buffer or mask dimensions disagree; always a programming error
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl CutoutError {
    /// Create a new invalid region error
    pub fn invalid_region<S: Into<String>>(reason: S) -> Self {
        Self::InvalidRegion(reason.into())
    }

    /// Create a new segmentation failure
    pub fn segmentation_failure<S: Into<String>>(msg: S) -> Self {
        Self::SegmentationFailure(msg.into())
    }

    /// Create a new invalid field error
    pub fn invalid_field<S: Into<String>>(msg: S) -> Self {
        Self::InvalidField(msg.into())
    }

    /// Create a new precondition error
    pub fn precondition<S: Into<String>>(msg: S) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Whether the error belongs to the "bad request" class the shopper can fix
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegion(_) | Self::SegmentationFailure(_) | Self::InvalidField(_)
        )
    }

    /// HTTP status a web collaborator should answer with
    #[must_use]
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }

    /// Human readable message for the client-visible error response
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRegion(reason) => {
                format!("Invalid selection area ({}). {}", reason, SELECTION_RETRY_HINT)
            },
            Self::SegmentationFailure(_) => {
                format!("Error processing image. {}", SEGMENTATION_RETRY_HINT)
            },
            Self::InvalidField(reason) => format!("Invalid selection coordinates: {}", reason),
            _ => "Internal error while processing the image.".to_string(),
        }
    }
}
