//! Product cutout CLI tool
//!
//! Replaces everything outside a selected product with white, in place or
//! into a separate output file.

use super::config::CliConfigBuilder;
use crate::{
    processor::CutoutProcessor, services::SelectionFields, tracing_config, worker::CutoutWorkerPool,
    CutoutError,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, info, Instrument};

/// Foreground extraction for product photos
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "product-cutout")]
pub struct Cli {
    /// Stored product image to cut out
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Selection left edge in pixels
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub x: String,

    /// Selection top edge in pixels
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub y: String,

    /// Selection width in pixels
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub width: String,

    /// Selection height in pixels
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub height: String,

    /// Write the result here instead of overwriting INPUT
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// JSON configuration file; flags given on the command line win
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Partition iterations (1-50)
    #[arg(short, long)]
    pub iterations: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// JPEG quality (1-100)
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Reject missing or non-numeric coordinates instead of reading them as 0
    #[arg(long)]
    pub strict: bool,

    /// Per-job deadline in milliseconds (0 disables it)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Print a base64 JPEG preview of INPUT and exit
    #[arg(long)]
    pub preview: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log line layout
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliOutputFormat {
    /// Follow the output extension, then the input format
    #[value(alias = "same")]
    Auto,
    Jpeg,
    Png,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    /// Requires the `tracing-json` feature
    Json,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format = CliConfigBuilder::tracing_format(cli.log_format)?;
    let session_id = tracing_config::init_cli_tracing(cli.verbose, log_format)
        .context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid configuration")?;
    let processor = CutoutProcessor::new(config).context("Failed to create processor")?;
    let session = tracing_config::spans::session(&session_id, processor.engine().backend_name());

    if cli.preview {
        let _guard = session.enter();
        let preview = processor
            .preview(&cli.input)
            .map_err(|e| user_facing(&e))?;
        println!("{}", preview);
        return Ok(());
    }

    run(cli, processor).instrument(session).await
}

async fn run(cli: Cli, processor: CutoutProcessor) -> Result<()> {
    let fields = SelectionFields::default()
        .with("x", cli.x.as_str())
        .with("y", cli.y.as_str())
        .with("width", cli.width.as_str())
        .with("height", cli.height.as_str());
    let rect = processor
        .parse_selection(&fields)
        .map_err(|e| user_facing(&e))?;

    let output = cli.output.clone().unwrap_or_else(|| cli.input.clone());
    info!(
        input = %cli.input.display(),
        output = %output.display(),
        rect = %rect,
        "Starting cutout"
    );

    let pool = CutoutWorkerPool::with_processor(processor);
    let span = tracing_config::spans::file_processing(&cli.input, &rect);
    let result = pool
        .submit_file_to(cli.input.clone(), output.clone(), rect)
        .instrument(span)
        .await
        .map_err(|e| user_facing(&e))?;

    let (width, height) = result.dimensions();
    println!(
        "✅ Saved {}x{} cutout to {} ({:.1}% kept)",
        width,
        height,
        output.display(),
        result.metadata.foreground_ratio * 100.0
    );
    info!("{}", result.timings().summary());
    Ok(())
}

fn user_facing(error: &CutoutError) -> anyhow::Error {
    debug!(error = %error, status = error.status_code(), "request failed");
    anyhow::anyhow!(error.user_message())
}
