//! Product cutout CLI tool
//!
//! Cuts a selected product out of a stored photo and replaces the
//! background with white.

#[cfg(feature = "cli")]
use product_cutout::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
