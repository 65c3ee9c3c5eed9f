// src/sources/research.rs
//! Research summaries adapter (best-effort): an RSS feed of paper/report
//! digests. Engagement metric: the feed's per-entry comment count when
//! present, else 0. Population baseline: mean comment count of the feed.

use anyhow::Context;
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::signals::normalize_title;
use crate::types::{ContentItem, FetchError, Source};

use super::{fetch_payload, finalize_scores, mean, within_horizon, AdapterContext, Mode, SourceAdapter};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    author: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "comments_count")]
    comments_count: Option<f64>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

pub struct ResearchAdapter {
    mode: Mode,
    ctx: AdapterContext,
}

impl ResearchAdapter {
    pub fn new(mode: Mode, ctx: AdapterContext) -> Self {
        Self { mode, ctx }
    }

    fn parse(&self, payload: &str) -> Result<Vec<ContentItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(payload)
            .context("parsing research rss xml")
            .map_err(|e| FetchError::Data(e.to_string()))?;

        let total = rss.channel.item.len();
        let mut items = Vec::with_capacity(total);
        for it in rss.channel.item.into_iter().take(self.ctx.limit) {
            let Some(title) = it.title.filter(|t| !t.trim().is_empty()) else {
                tracing::warn!(source = "research", "entry missing title, dropped");
                continue;
            };
            // Prefer the feed's guid as the native id; fall back to link.
            let Some(id) = it.guid.or_else(|| it.link.clone()) else {
                tracing::warn!(source = "research", "entry missing guid/link, dropped");
                continue;
            };

            items.push(ContentItem {
                source: Source::Research,
                id,
                title: normalize_title(&title),
                url: it.link,
                author: it.author,
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
                raw_engagement: it
                    .comments_count
                    .filter(|c| c.is_finite() && *c >= 0.0)
                    .unwrap_or(0.0),
                population_baseline: 0.0,
                outlier_score: 0.0,
            });
        }

        if items.is_empty() && total > 0 {
            return Err(FetchError::Data("research: no entry parsed".into()));
        }

        let baseline = mean(&items.iter().map(|i| i.raw_engagement).collect::<Vec<_>>());
        for item in &mut items {
            item.population_baseline = baseline;
        }
        items.retain(|i| within_horizon(i.published_at, &self.ctx));
        finalize_scores(&mut items, &self.ctx);

        histogram!("adapter_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("aggregate_items_total").increment(items.len() as u64);
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for ResearchAdapter {
    async fn fetch(&self) -> Result<Vec<ContentItem>, FetchError> {
        let signature = "research:summaries".to_string();
        let payload = fetch_payload(&self.mode, Source::Research, &self.ctx, &signature).await?;
        self.parse(&payload)
    }

    fn source(&self) -> Source {
        Source::Research
    }
}
