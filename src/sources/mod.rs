// src/sources/mod.rs
//! Source adapters: one per content source, all speaking the same
//! `SourceAdapter` contract. Adapters are registered through
//! `build_registry`, which only constructs an adapter when its required
//! configuration is present — a missing credential means the adapter is
//! simply absent (or, for an explicitly requested source, a `config`
//! failure recorded before any fetch).

pub mod forum;
pub mod marketplace;
pub mod research;
pub mod short_video;
pub mod social;
pub mod video;

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::FetchCache;
use crate::config::RunConfig;
use crate::scoring::ScoreParams;
use crate::types::{ContentItem, ErrorKind, FetchError, Source, SourceResult};

/// Shared context injected into every adapter.
#[derive(Clone)]
pub struct AdapterContext {
    pub cache: Arc<dyn FetchCache>,
    pub limit: usize,
    pub score_params: ScoreParams,
    /// Pipeline-run timestamp (unix seconds). Injected rather than read
    /// from the clock so one run scores consistently and tests are
    /// deterministic.
    pub now: u64,
}

/// Capability interface implemented once per source.
///
/// `fetch` performs the network call (through the cache), computes the
/// population baseline, windows out items older than the scoring horizon,
/// and scores every surviving item. It never touches the dedup index and
/// never mutates state outside its own cache shard.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self) -> Result<Vec<ContentItem>, FetchError>;
    fn source(&self) -> Source;
}

/// How an adapter obtains its raw payload.
pub enum Mode {
    Http {
        endpoint: String,
        client: reqwest::Client,
        token: Option<String>,
    },
    /// Canned payload, for offline runs and tests.
    Fixture(String),
}

/// Fetch the raw payload for `signature`, consulting the per-source cache
/// shard first. Cache writes are best-effort.
pub(crate) async fn fetch_payload(
    mode: &Mode,
    source: Source,
    ctx: &AdapterContext,
    signature: &str,
) -> Result<String, FetchError> {
    match mode {
        Mode::Fixture(payload) => Ok(payload.clone()),
        Mode::Http {
            endpoint,
            client,
            token,
        } => {
            if let Some(hit) = ctx.cache.get(source, signature, ctx.now) {
                tracing::debug!(source = %source, "cache hit, skipping fetch");
                return Ok(hit);
            }

            let mut req = client.get(endpoint.as_str());
            if let Some(t) = token {
                req = req.bearer_auth(t);
            }
            let resp = req.send().await.map_err(FetchError::from)?;

            let status = resp.status();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(FetchError::Config(format!(
                    "{source}: upstream rejected credentials ({status})"
                )));
            }
            let resp = resp.error_for_status().map_err(FetchError::from)?;
            let body = resp.text().await.map_err(FetchError::from)?;

            ctx.cache.put(source, signature, &body, ctx.now);
            Ok(body)
        }
    }
}

/// Mean of a slice, 0.0 when empty. Used by adapters whose baseline is
/// "average engagement of the fetched population".
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// True when an item is too old to score: past the recency horizon.
/// Items without a timestamp are kept (low-confidence recency).
pub(crate) fn within_horizon(published_at: Option<u64>, ctx: &AdapterContext) -> bool {
    match published_at {
        Some(ts) => {
            let age = ctx.now.saturating_sub(ts);
            (age as f64) <= ctx.score_params.horizon_days * 86_400.0
        }
        None => true,
    }
}

/// Score every item in place. Called by adapters as their final step, so
/// each `outlier_score` is written exactly once.
pub(crate) fn finalize_scores(items: &mut [ContentItem], ctx: &AdapterContext) {
    for item in items.iter_mut() {
        if item.published_at.is_none() {
            tracing::debug!(
                key = %item.identity_key(),
                low_confidence_recency = true,
                "item has no timestamp, scored as fresh"
            );
        }
        item.outlier_score = crate::scoring::score(
            item.raw_engagement,
            item.population_baseline,
            item.published_at,
            &item.title,
            ctx.now,
            &ctx.score_params,
        );
    }
}

pub struct Registry {
    pub adapters: Vec<Box<dyn SourceAdapter>>,
    /// Requested sources that could not even be constructed (missing
    /// credentials or fixture). Reported alongside real fetch failures.
    pub config_failures: Vec<SourceResult>,
}

/// Build adapters for every requested source whose configuration is
/// complete. Sources needing an API token: video, social, short_video,
/// marketplace. Forum and research endpoints are public.
pub fn build_registry(cfg: &RunConfig, cache: Arc<dyn FetchCache>, now: u64) -> Registry {
    let ctx = AdapterContext {
        cache,
        limit: cfg.limit,
        score_params: ScoreParams::default(),
        now,
    };

    let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();
    let mut config_failures = Vec::new();

    for &source in &cfg.sources {
        match build_adapter(source, cfg, ctx.clone()) {
            Ok(adapter) => adapters.push(adapter),
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "adapter not registered");
                config_failures.push(SourceResult::failed(
                    source,
                    ErrorKind::Config,
                    e.to_string(),
                    std::time::Duration::ZERO,
                    0,
                ));
            }
        }
    }

    Registry {
        adapters,
        config_failures,
    }
}

fn build_adapter(
    source: Source,
    cfg: &RunConfig,
    ctx: AdapterContext,
) -> Result<Box<dyn SourceAdapter>, FetchError> {
    let mode = adapter_mode(source, cfg)?;
    Ok(match source {
        Source::Forum => Box::new(forum::ForumAdapter::new(mode, ctx)),
        Source::Video => Box::new(video::VideoAdapter::new(mode, ctx)),
        Source::Social => Box::new(social::SocialAdapter::new(mode, ctx)),
        Source::ShortVideo => Box::new(short_video::ShortVideoAdapter::new(mode, ctx)),
        Source::Marketplace => Box::new(marketplace::MarketplaceAdapter::new(mode, ctx)),
        Source::Research => Box::new(research::ResearchAdapter::new(mode, ctx)),
    })
}

fn adapter_mode(source: Source, cfg: &RunConfig) -> Result<Mode, FetchError> {
    if let Some(dir) = &cfg.fixtures_dir {
        let ext = if source == Source::Research { "xml" } else { "json" };
        let path = dir.join(format!("{source}.{ext}"));
        let payload = fs::read_to_string(&path).map_err(|e| {
            FetchError::Config(format!("fixture {} unreadable: {e}", path.display()))
        })?;
        return Ok(Mode::Fixture(payload));
    }

    let needs_token = matches!(
        source,
        Source::Video | Source::Social | Source::ShortVideo | Source::Marketplace
    );
    let token = cfg.credentials.token(source).map(str::to_string);
    if needs_token && token.is_none() {
        return Err(FetchError::Config(format!(
            "missing TRENDSCOUT_{}_TOKEN",
            source.as_str().to_ascii_uppercase()
        )));
    }

    Ok(Mode::Http {
        endpoint: default_endpoint(source, cfg.limit),
        client: reqwest::Client::new(),
        token,
    })
}

fn default_endpoint(source: Source, limit: usize) -> String {
    match source {
        Source::Forum => {
            format!("https://forum.example.com/r/trending/top.json?t=week&limit={limit}")
        }
        Source::Video => {
            format!("https://video.example.com/api/v3/trending?part=snippet,statistics&maxResults={limit}")
        }
        Source::Social => {
            format!("https://social.example.com/2/posts/search/recent?max_results={limit}")
        }
        Source::ShortVideo => {
            format!("https://shortvideo.example.com/api/trending/feed?count={limit}")
        }
        Source::Marketplace => {
            format!("https://marketplace.example.com/api/rankings/movers?count={limit}")
        }
        Source::Research => "https://research.example.com/feeds/summaries.xml".to_string(),
    }
}
