// src/pipeline.rs
//! End-to-end wiring for one aggregation run. All state a run touches
//! (cache, dedup index) is constructed here and owned by this call, so
//! concurrent runs in tests never interfere through globals.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use metrics::gauge;

use crate::cache::{FetchCache, FileCache, DEFAULT_TTL};
use crate::config::RunConfig;
use crate::dedup::DedupIndex;
use crate::merge::{merge, MergeOptions};
use crate::orchestrator::{self, RunOptions};
use crate::output::{log_summary, Feed};
use crate::sources::build_registry;
use crate::trust::TrustWeights;

#[derive(Debug)]
pub struct RunReport {
    pub feed: Feed,
    pub written: Vec<PathBuf>,
    /// Overall success criterion: at least one requested source succeeded.
    pub any_succeeded: bool,
}

pub async fn run_pipeline(cfg: &RunConfig) -> Result<RunReport> {
    crate::metrics::ensure_metrics_described();
    cfg.validate()?;

    let now = chrono::Utc::now().timestamp().max(0) as u64;

    let cache: Arc<dyn FetchCache> = Arc::new(FileCache::new(cfg.cache_dir.clone(), DEFAULT_TTL));
    let registry = build_registry(cfg, cache, now);

    let mut dedup = if cfg.no_dedup {
        DedupIndex::new(cfg.dedup_weeks)
    } else {
        DedupIndex::load(&cfg.dedup_state_path, cfg.dedup_weeks)?
    };
    let trust = cfg
        .trust_weights_path
        .as_ref()
        .map(TrustWeights::load_from_file)
        .unwrap_or_default();

    tracing::info!(
        sources = ?cfg.sources.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        registered = registry.adapters.len(),
        dedup_entries = dedup.len(),
        "starting aggregation run"
    );

    let opts = RunOptions::from_config(cfg);
    let mut combined = orchestrator::run(registry.adapters, &opts).await;
    // Sources that never got an adapter (missing credentials/fixture)
    // count as failed alongside real fetch failures.
    combined.results.extend(registry.config_failures);

    let items = merge(
        &combined.results,
        &mut dedup,
        &trust,
        &MergeOptions {
            min_score: cfg.min_score,
            no_dedup: cfg.no_dedup,
        },
        now,
    );

    if !cfg.no_dedup {
        dedup.compact(now);
        dedup.save(&cfg.dedup_state_path)?;
    }

    let feed = Feed::build(&items, &combined, now);
    let written = feed.write(&cfg.output_dir, cfg.output_format)?;
    gauge!("pipeline_last_run_ts").set(now as f64);
    log_summary(&feed);

    Ok(RunReport {
        any_succeeded: combined.any_succeeded(),
        feed,
        written,
    })
}
