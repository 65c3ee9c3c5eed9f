//! Trendscout — Binary Entrypoint
//! Parses the CLI, initializes tracing, and runs one aggregation pass.
//!
//! Exit codes: 0 when at least one requested source succeeded, 1 when all
//! failed, 2 when configuration was invalid before any fetch attempt.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trendscout::config::{self, OutputFormat, RunConfig};
use trendscout::pipeline::run_pipeline;

#[derive(Debug, Parser)]
#[command(name = "trendscout", about = "Aggregate and rank viral-outlier content from multiple sources.")]
struct Cli {
    /// Comma-separated sources to run (forum, video, social, short_video,
    /// marketplace, research). Defaults to the primary set.
    #[arg(long, value_delimiter = ',')]
    sources: Vec<String>,

    /// Additionally run the best-effort (stretch) sources.
    #[arg(long)]
    include_stretch: bool,

    /// Drop items scoring below this before output.
    #[arg(long, default_value_t = config::DEFAULT_MIN_SCORE)]
    min_score: f64,

    /// Max items fetched per source before scoring.
    #[arg(long, default_value_t = config::DEFAULT_LIMIT)]
    limit: usize,

    /// Dedup lookback window in weeks.
    #[arg(long, default_value_t = trendscout::dedup::DEFAULT_LOOKBACK_WEEKS)]
    dedup_weeks: u64,

    /// Bypass the dedup index entirely.
    #[arg(long)]
    no_dedup: bool,

    #[arg(long, value_enum, default_value = "json")]
    output_format: OutputFormat,

    /// Directory for feed.json / feed.csv.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    #[arg(long, default_value = ".trendscout/cache")]
    cache_dir: PathBuf,

    #[arg(long, default_value = ".trendscout/dedup.json")]
    dedup_state: PathBuf,

    /// Optional JSON or TOML file overriding per-source trust weights.
    #[arg(long)]
    trust_weights: Option<PathBuf>,

    /// Read canned payloads from this directory instead of the network.
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,

    /// Concurrent adapter fetches.
    #[arg(long, default_value_t = config::DEFAULT_MAX_WORKERS)]
    max_workers: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trendscout=info,warn")),
        )
        .init();

    let cli = Cli::parse();

    let sources = match config::select_sources(&cli.sources, cli.include_stretch) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid source selection");
            return ExitCode::from(2);
        }
    };

    let cfg = RunConfig {
        sources,
        limit: cli.limit,
        min_score: cli.min_score,
        dedup_weeks: cli.dedup_weeks,
        no_dedup: cli.no_dedup,
        output_format: cli.output_format,
        output_dir: cli.output_dir,
        cache_dir: cli.cache_dir,
        dedup_state_path: cli.dedup_state,
        trust_weights_path: cli.trust_weights,
        fixtures_dir: cli.fixtures_dir,
        max_workers: cli.max_workers,
        credentials: config::Credentials::from_env(),
        ..RunConfig::default()
    };

    if let Err(e) = cfg.validate() {
        tracing::error!(error = %e, "invalid configuration");
        return ExitCode::from(2);
    }

    match run_pipeline(&cfg).await {
        Ok(report) if report.any_succeeded => {
            for path in &report.written {
                tracing::info!(path = %path.display(), "artifact written");
            }
            ExitCode::SUCCESS
        }
        Ok(_) => {
            tracing::error!("no sources succeeded");
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!(error = ?e, "pipeline error");
            ExitCode::from(1)
        }
    }
}
