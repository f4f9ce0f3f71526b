//! Compliance radar: one batch run over the official feeds and news search.
//!
//! Exit status is non-zero only when the hit history cannot be written; feed,
//! search and classifier failures are logged and the run carries on.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use compliance_radar::config::{resolve, Pacing};
use compliance_radar::{Pipeline, Settings, SourceCatalog};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding hits.json and the run config (overrides CDT_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Run config override file, JSON or TOML (overrides CDT_CONFIG_PATH)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the politeness delays between external calls
    #[arg(long)]
    no_delay: bool,

    /// Print the resolved run config as JSON and exit
    #[arg(long)]
    print_config: bool,
}

/// `RUST_LOG` wins; otherwise info for this crate, warn for dependencies.
/// `CDT_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("compliance_radar=info,warn"));

    let json = std::env::var("CDT_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    let mut settings = Settings::from_env();
    if let Some(dir) = args.data_dir {
        settings.data_dir = dir;
    }
    if let Some(path) = args.config {
        settings.config_path = Some(path);
    }
    if args.no_delay {
        settings.pacing = Pacing::none();
    }

    let catalog = SourceCatalog::default_catalog();
    let config = resolve(&catalog, &settings.data_dir, settings.config_path.as_deref());

    if args.print_config {
        let out = serde_json::to_string_pretty(&config).context("serializing run config")?;
        println!("{out}");
        return Ok(());
    }

    tracing::info!(
        data_dir = %settings.data_dir.display(),
        feeds = config.sources_enabled.values().filter(|e| **e).count(),
        queries = config.queries.len(),
        threshold = settings.relevance_threshold,
        "compliance radar run starting"
    );

    let report = Pipeline::from_settings(&settings, catalog, config)?
        .run()
        .await?;

    tracing::info!(
        fetched = report.fetched,
        new_hits = report.hits_added,
        source_errors = report.source_errors,
        "done"
    );
    Ok(())
}
