//! One-shot boundary-catalog sync.
//!
//! Discovers the deepest per-country documents on the dataset index and
//! downloads the ones the data directory is missing. Run it before (or
//! instead of) hitting the server's /api/fetch route.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use landfall::catalog::CatalogClient;
use landfall::config::Config;

#[derive(Parser, Debug)]
#[command(name = "fetch")]
#[command(about = "Download admin-boundary documents from the dataset catalog")]
struct Args {
    /// Config file (TOML); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Boundary document directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Dataset index URL
    #[arg(long)]
    catalog_url: Option<String>,

    /// Parallel downloads
    #[arg(long)]
    download_concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(catalog_url) = &args.catalog_url {
        config.catalog_url = catalog_url.clone();
    }
    if let Some(concurrency) = args.download_concurrency {
        config.download_concurrency = concurrency;
    }

    info!("Landfall Catalog Fetch");
    info!("Catalog: {}", config.catalog_url);
    info!("Target directory: {}", config.data_dir.display());

    let catalog = CatalogClient::new(&config.catalog_url, config.download_concurrency)?;

    let entries = catalog.discover().await?;

    // Create progress bar
    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let summary = catalog
        .download_missing(&entries, &config.data_dir, |_| pb.inc(1))
        .await?;

    pb.finish_with_message("Download complete");

    info!(
        "Catalog sync finished: {} discovered, {} downloaded, {} already present, {} failed",
        summary.discovered, summary.downloaded, summary.skipped, summary.failed
    );

    if summary.failed > 0 {
        warn!(
            "{} documents failed to download; run again to retry them",
            summary.failed
        );
    }

    Ok(())
}
