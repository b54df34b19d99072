//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliLogFormat, CliOutputFormat};
use crate::config::{CutoutConfig, FieldParsing, OutputFormat};
use crate::tracing_config::TracingFormat;
use anyhow::{Context, Result};

/// Convert CLI arguments to a validated `CutoutConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from `--config` (or defaults) and apply the explicit flags
    pub(crate) fn from_cli(cli: &Cli) -> Result<CutoutConfig> {
        let base = match &cli.config {
            Some(path) => CutoutConfig::from_json_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => CutoutConfig::default(),
        };

        let mut builder = CutoutConfig::builder()
            .iterations(cli.iterations.unwrap_or(base.iterations))
            .min_selection_side(base.min_selection_side)
            .gmm_components(base.gmm_components)
            .smoothness(base.smoothness)
            .output_format(cli.format.map_or(base.output_format, Self::output_format))
            .jpeg_quality(cli.jpeg_quality.unwrap_or(base.jpeg_quality))
            .field_parsing(base.field_parsing)
            .max_concurrent_jobs(base.max_concurrent_jobs)
            .timeout_ms(cli.timeout_ms.unwrap_or(base.timeout_ms));
        if cli.strict {
            builder = builder.field_parsing(FieldParsing::Strict);
        }

        builder.build().context("Invalid configuration")
    }

    fn output_format(format: CliOutputFormat) -> OutputFormat {
        match format {
            CliOutputFormat::Auto => OutputFormat::Auto,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
            CliOutputFormat::Png => OutputFormat::Png,
        }
    }

    /// Map `--log-format` onto a subscriber layout this build supports
    pub(crate) fn tracing_format(format: CliLogFormat) -> Result<TracingFormat> {
        match format {
            CliLogFormat::Console => Ok(TracingFormat::Console),
            CliLogFormat::Compact => Ok(TracingFormat::Compact),
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => Ok(TracingFormat::Json),
            #[cfg(not(feature = "tracing-json"))]
            CliLogFormat::Json => {
                anyhow::bail!("JSON logs need a build with `--features tracing-json`")
            }
        }
    }
}
