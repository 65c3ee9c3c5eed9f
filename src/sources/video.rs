// src/sources/video.rs
//! Video platform adapter. Engagement metric: views. Population baseline:
//! the channel's average views across the fetched window, so a mid-size
//! channel's breakout video outranks an everyday upload from a giant one.

use std::collections::HashMap;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::signals::normalize_title;
use crate::types::{ContentItem, FetchError, Source};

use super::{fetch_payload, finalize_scores, within_horizon, AdapterContext, Mode, SourceAdapter};

#[derive(Debug, Deserialize)]
struct Feed {
    items: Vec<VideoEntry>,
}

#[derive(Debug, Deserialize)]
struct VideoEntry {
    id: Option<String>,
    snippet: Option<Snippet>,
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    channel_title: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    /// Upstream serializes counts as strings.
    view_count: Option<String>,
}

pub struct VideoAdapter {
    mode: Mode,
    ctx: AdapterContext,
}

impl VideoAdapter {
    pub fn new(mode: Mode, ctx: AdapterContext) -> Self {
        Self { mode, ctx }
    }

    fn parse(&self, payload: &str) -> Result<Vec<ContentItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let feed: Feed = serde_json::from_str(payload)
            .map_err(|e| FetchError::Data(format!("video feed parse: {e}")))?;

        let total = feed.items.len();
        let mut items = Vec::with_capacity(total);
        for entry in feed.items.into_iter().take(self.ctx.limit) {
            let Some(id) = entry.id.filter(|s| !s.is_empty()) else {
                tracing::warn!(source = "video", "entry missing id, dropped");
                continue;
            };
            let Some(snippet) = entry.snippet else {
                tracing::warn!(source = "video", id, "entry missing snippet, dropped");
                continue;
            };
            let Some(title) = snippet.title.filter(|t| !t.trim().is_empty()) else {
                tracing::warn!(source = "video", id, "entry missing title, dropped");
                continue;
            };

            let views = entry
                .statistics
                .and_then(|s| s.view_count)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(0.0);
            let published_at = snippet
                .published_at
                .as_deref()
                .and_then(parse_rfc3339_to_unix);

            items.push(ContentItem {
                source: Source::Video,
                url: Some(format!("https://video.example.com/watch?v={id}")),
                id,
                title: normalize_title(&title),
                author: snippet.channel_title,
                published_at,
                raw_engagement: views,
                population_baseline: 0.0,
                outlier_score: 0.0,
            });
        }

        if items.is_empty() && total > 0 {
            return Err(FetchError::Data("video: no entry parsed".into()));
        }

        // Channel-scoped baseline: mean views among this channel's fetched
        // videos. Channels with a single fetched video fall back to the
        // page-wide mean.
        let mut per_channel: HashMap<String, (f64, u32)> = HashMap::new();
        for item in &items {
            let key = item.author.clone().unwrap_or_default();
            let slot = per_channel.entry(key).or_insert((0.0, 0));
            slot.0 += item.raw_engagement;
            slot.1 += 1;
        }
        let page_mean = if items.is_empty() {
            0.0
        } else {
            items.iter().map(|i| i.raw_engagement).sum::<f64>() / items.len() as f64
        };
        for item in &mut items {
            let key = item.author.clone().unwrap_or_default();
            item.population_baseline = match per_channel.get(&key) {
                Some(&(sum, n)) if n > 1 => sum / n as f64,
                _ => page_mean,
            };
        }

        items.retain(|i| within_horizon(i.published_at, &self.ctx));
        finalize_scores(&mut items, &self.ctx);

        histogram!("adapter_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("aggregate_items_total").increment(items.len() as u64);
        Ok(items)
    }
}

fn parse_rfc3339_to_unix(ts: &str) -> Option<u64> {
    chrono::DateTime::parse_from_rfc3339(ts)
        .ok()
        .and_then(|dt| u64::try_from(dt.timestamp()).ok())
}

#[async_trait]
impl SourceAdapter for VideoAdapter {
    async fn fetch(&self) -> Result<Vec<ContentItem>, FetchError> {
        let signature = format!("video:trending:{}", self.ctx.limit);
        let payload = fetch_payload(&self.mode, Source::Video, &self.ctx, &signature).await?;
        self.parse(&payload)
    }

    fn source(&self) -> Source {
        Source::Video
    }
}
