// src/sources/short_video.rs
//! Short-video trending feed adapter (best-effort). Engagement metric:
//! play count. Population baseline: mean plays of the fetched feed page.

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::signals::normalize_title;
use crate::types::{ContentItem, FetchError, Source};

use super::{fetch_payload, finalize_scores, mean, within_horizon, AdapterContext, Mode, SourceAdapter};

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    videos: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: Option<String>,
    #[serde(alias = "desc")]
    title: Option<String>,
    author: Option<String>,
    /// Unix seconds.
    create_time: Option<u64>,
    #[serde(default)]
    play_count: f64,
    share_url: Option<String>,
}

pub struct ShortVideoAdapter {
    mode: Mode,
    ctx: AdapterContext,
}

impl ShortVideoAdapter {
    pub fn new(mode: Mode, ctx: AdapterContext) -> Self {
        Self { mode, ctx }
    }

    fn parse(&self, payload: &str) -> Result<Vec<ContentItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let feed: Feed = serde_json::from_str(payload)
            .map_err(|e| FetchError::Data(format!("short_video feed parse: {e}")))?;

        let total = feed.videos.len();
        let mut items = Vec::with_capacity(total);
        for video in feed.videos.into_iter().take(self.ctx.limit) {
            let (Some(id), Some(title)) = (video.id, video.title) else {
                tracing::warn!(source = "short_video", "video missing id/title, dropped");
                continue;
            };
            if title.trim().is_empty() {
                continue;
            }

            items.push(ContentItem {
                source: Source::ShortVideo,
                id,
                title: normalize_title(&title),
                url: video.share_url,
                author: video.author,
                published_at: video.create_time.filter(|ts| *ts > 0),
                raw_engagement: video.play_count.max(0.0),
                population_baseline: 0.0,
                outlier_score: 0.0,
            });
        }

        if items.is_empty() && total > 0 {
            return Err(FetchError::Data("short_video: no video parsed".into()));
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
impl SourceAdapter for ShortVideoAdapter {
    async fn fetch(&self) -> Result<Vec<ContentItem>, FetchError> {
        let signature = format!("short_video:trending:{}", self.ctx.limit);
        let payload = fetch_payload(&self.mode, Source::ShortVideo, &self.ctx, &signature).await?;
        self.parse(&payload)
    }

    fn source(&self) -> Source {
        Source::ShortVideo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::scoring::ScoreParams;
    use std::sync::Arc;

    const DAY: u64 = 86_400;

    fn ctx(now: u64) -> AdapterContext {
        AdapterContext {
            cache: Arc::new(MemoryCache::new()),
            limit: 25,
            score_params: ScoreParams::default(),
            now,
        }
    }

    #[tokio::test]
    async fn trending_page_parses_with_page_mean_baseline() {
        let now = 100 * DAY;
        let payload = format!(
            r#"{{"videos": [
                {{"id": "v1", "desc": "dance", "author": "a", "create_time": {}, "play_count": 1000}},
                {{"id": "v2", "desc": "cooking hack gone viral", "author": "b", "create_time": {}, "play_count": 9000}}
            ]}}"#,
            now - DAY,
            now - DAY
        );
        let adapter = ShortVideoAdapter::new(Mode::Fixture(payload), ctx(now));

        let items = adapter.fetch().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].population_baseline, 5000.0);
        assert!(items[1].outlier_score > 1.0);
    }

    #[tokio::test]
    async fn zero_create_time_is_low_confidence() {
        let payload = r#"{"videos": [{"id": "v", "desc": "t", "create_time": 0, "play_count": 5}]}"#;
        let adapter = ShortVideoAdapter::new(Mode::Fixture(payload.into()), ctx(1_000));
        let items = adapter.fetch().await.unwrap();
        assert_eq!(items[0].published_at, None);
    }
}
