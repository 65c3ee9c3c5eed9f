// src/sources/social.rs
//! Social posts adapter (best-effort). Engagement metric: likes + reshares.
//! Population baseline: mean engagement of the fetched result page.

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::signals::normalize_title;
use crate::types::{ContentItem, FetchError, Source};

use super::{fetch_payload, finalize_scores, mean, within_horizon, AdapterContext, Mode, SourceAdapter};

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: Option<String>,
    text: Option<String>,
    author_username: Option<String>,
    /// RFC 3339.
    created_at: Option<String>,
    public_metrics: Option<Metrics>,
}

#[derive(Debug, Deserialize)]
struct Metrics {
    #[serde(default)]
    like_count: f64,
    #[serde(default)]
    retweet_count: f64,
}

pub struct SocialAdapter {
    mode: Mode,
    ctx: AdapterContext,
}

impl SocialAdapter {
    pub fn new(mode: Mode, ctx: AdapterContext) -> Self {
        Self { mode, ctx }
    }

    fn parse(&self, payload: &str) -> Result<Vec<ContentItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let page: SearchPage = serde_json::from_str(payload)
            .map_err(|e| FetchError::Data(format!("social page parse: {e}")))?;

        let total = page.data.len();
        let mut items = Vec::with_capacity(total);
        for post in page.data.into_iter().take(self.ctx.limit) {
            let (Some(id), Some(text)) = (post.id, post.text) else {
                tracing::warn!(source = "social", "post missing id/text, dropped");
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            let engagement = post
                .public_metrics
                .map(|m| m.like_count.max(0.0) + m.retweet_count.max(0.0))
                .unwrap_or(0.0);
            let published_at = post
                .created_at
                .as_deref()
                .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
                .and_then(|dt| u64::try_from(dt.timestamp()).ok());

            items.push(ContentItem {
                source: Source::Social,
                url: post
                    .author_username
                    .as_deref()
                    .map(|u| format!("https://social.example.com/{u}/status/{id}")),
                id,
                title: normalize_title(&text),
                author: post.author_username,
                published_at,
                raw_engagement: engagement,
                population_baseline: 0.0,
                outlier_score: 0.0,
            });
        }

        if items.is_empty() && total > 0 {
            return Err(FetchError::Data("social: no post parsed".into()));
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
impl SourceAdapter for SocialAdapter {
    async fn fetch(&self) -> Result<Vec<ContentItem>, FetchError> {
        let signature = format!("social:recent:{}", self.ctx.limit);
        let payload = fetch_payload(&self.mode, Source::Social, &self.ctx, &signature).await?;
        self.parse(&payload)
    }

    fn source(&self) -> Source {
        Source::Social
    }
}
