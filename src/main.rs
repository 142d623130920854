//! # DAWSON Extractor CLI (`dawson`)
//!
//! ## Usage
//!
//! ```bash
//! dawson [TARGET] [--discover | --list-types] [--config <path>]
//! ```
//!
//! | Invocation | Description |
//! |------------|-------------|
//! | `dawson` | Download up to `extract.target_count` new documents |
//! | `dawson 25` | Same, with the target overridden to 25 |
//! | `dawson --discover` | Survey dockets and write the document type catalog |
//! | `dawson --list-types` | Print the saved catalog (no API calls) |
//!
//! Settings come from `./dawson.toml` when present, otherwise built-in
//! defaults. An explicit `--config` file must exist.
//!
//! Exit status is 0 whenever a run completes, even below target; it is
//! non-zero only when startup fails (bad config, unwritable output root).

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use dawson_extractor::client::ApiClient;
use dawson_extractor::config;
use dawson_extractor::discover::{read_catalog, render_catalog, run_discovery};
use dawson_extractor::extract::run_extraction;
use dawson_extractor::progress::ProgressMode;
use dawson_extractor::summary::{render_discovery, render_extraction};

const DEFAULT_CONFIG: &str = "./dawson.toml";

/// Download public court documents from the DAWSON API.
#[derive(Parser)]
#[command(
    name = "dawson",
    version,
    about = "Incremental downloader for public DAWSON court documents",
    long_about = "Searches the DAWSON public API for dockets, filters their entries by \
    document type, and downloads matching public PDFs with JSON metadata, skipping \
    documents already present in the output directory."
)]
struct Cli {
    /// Number of new documents to download (overrides `extract.target_count`).
    target: Option<u64>,

    /// Discover document types from the API and save them to the catalog.
    #[arg(long, conflicts_with = "list_types")]
    discover: bool,

    /// List document types from the saved catalog.
    #[arg(long)]
    list_types: bool,

    /// Path to configuration file (TOML). Defaults to `./dawson.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Progress output on stderr. Defaults to `human` on a terminal, else `off`.
    #[arg(long, value_enum)]
    progress: Option<ProgressMode>,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) if verbose => EnvFilter::new("warn,dawson_extractor=debug"),
        Err(_) => EnvFilter::new("warn"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_config_or_default(Path::new(DEFAULT_CONFIG))?,
    };
    if let Some(target) = cli.target {
        cfg.extract.target_count = target;
    }

    if cli.list_types {
        let catalog = read_catalog(&cfg.output.catalog_path)?;
        print!("{}", render_catalog(catalog.as_ref()));
        return Ok(());
    }

    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::auto)
        .into_reporter();
    let mut client = ApiClient::from_config(&cfg.api)?;
    let mut rng = rand::thread_rng();

    if cli.discover {
        let report = run_discovery(&cfg, &mut client, &mut rng, progress.as_ref()).await?;
        let top: Vec<(String, u64)> = report
            .catalog
            .types
            .iter()
            .take(10)
            .map(|t| (t.label.clone(), t.count))
            .collect();
        print!(
            "{}",
            render_discovery(
                &report.counters,
                &top,
                report.catalog.total_types,
                &cfg.output.catalog_path
            )
        );
    } else {
        let counters = run_extraction(&cfg, &mut client, &mut rng, progress.as_ref()).await?;
        print!("{}", render_extraction(&counters));
    }

    Ok(())
}
