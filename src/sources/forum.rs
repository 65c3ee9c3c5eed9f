// src/sources/forum.rs
//! Forum adapter: top posts from a link-aggregator style JSON listing.
//! Engagement metric: upvotes. Population baseline: mean upvotes of the
//! fetched page.

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::signals::normalize_title;
use crate::types::{ContentItem, FetchError, Source};

use super::{fetch_payload, finalize_scores, mean, within_horizon, AdapterContext, Mode, SourceAdapter};

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: Option<String>,
    title: Option<String>,
    author: Option<String>,
    #[serde(default)]
    ups: f64,
    created_utc: Option<f64>,
    permalink: Option<String>,
}

pub struct ForumAdapter {
    mode: Mode,
    ctx: AdapterContext,
}

impl ForumAdapter {
    pub fn new(mode: Mode, ctx: AdapterContext) -> Self {
        Self { mode, ctx }
    }

    fn parse(&self, payload: &str) -> Result<Vec<ContentItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let listing: Listing = serde_json::from_str(payload)
            .map_err(|e| FetchError::Data(format!("forum listing parse: {e}")))?;

        let total = listing.data.children.len();
        let mut items = Vec::with_capacity(total);
        for child in listing.data.children.into_iter().take(self.ctx.limit) {
            let post = child.data;
            let (id, title) = match (post.id, post.title) {
                (Some(id), Some(title)) if !id.is_empty() && !title.trim().is_empty() => {
                    (id, title)
                }
                _ => {
                    tracing::warn!(source = "forum", "post missing id/title, dropped");
                    continue;
                }
            };
            let published_at = post
                .created_utc
                .filter(|ts| ts.is_finite() && *ts > 0.0)
                .map(|ts| ts as u64);

            items.push(ContentItem {
                source: Source::Forum,
                id,
                title: normalize_title(&title),
                url: post
                    .permalink
                    .map(|p| format!("https://forum.example.com{p}")),
                author: post.author,
                published_at,
                raw_engagement: post.ups.max(0.0),
                population_baseline: 0.0,
                outlier_score: 0.0,
            });
        }

        if items.is_empty() && total > 0 {
            return Err(FetchError::Data("forum: no post parsed".into()));
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
impl SourceAdapter for ForumAdapter {
    async fn fetch(&self) -> Result<Vec<ContentItem>, FetchError> {
        let signature = format!("forum:top:week:{}", self.ctx.limit);
        let payload = fetch_payload(&self.mode, Source::Forum, &self.ctx, &signature).await?;
        self.parse(&payload)
    }

    fn source(&self) -> Source {
        Source::Forum
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

    fn listing(posts: &str) -> String {
        format!(r#"{{"data": {{"children": [{posts}]}}}}"#)
    }

    fn post(id: &str, title: &str, ups: f64, created: u64) -> String {
        format!(
            r#"{{"data": {{"id": "{id}", "title": "{title}", "author": "u1", "ups": {ups}, "created_utc": {created}, "permalink": "/r/t/{id}"}}}}"#
        )
    }

    #[tokio::test]
    async fn parses_and_scores_page() {
        let now = 100 * DAY;
        let payload = listing(&format!(
            "{},{}",
            post("a", "Plain weekly thread", 50.0, now - DAY),
            post("b", "How I built a passive income machine", 400.0, now - DAY)
        ));
        let adapter = ForumAdapter::new(Mode::Fixture(payload), ctx(now));

        let items = adapter.fetch().await.unwrap();
        assert_eq!(items.len(), 2);
        // Page baseline is (50 + 400) / 2 = 225 for both items.
        assert_eq!(items[0].population_baseline, 225.0);
        assert!(items[1].outlier_score > items[0].outlier_score);
    }

    #[tokio::test]
    async fn malformed_posts_are_dropped_not_fatal() {
        let now = 100 * DAY;
        let payload = listing(&format!(
            r#"{{"data": {{"title": "no id here"}}}},{}"#,
            post("ok", "Fine post", 10.0, now - DAY)
        ));
        let adapter = ForumAdapter::new(Mode::Fixture(payload), ctx(now));

        let items = adapter.fetch().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "ok");
    }

    #[tokio::test]
    async fn all_posts_malformed_is_data_error() {
        let payload = listing(r#"{"data": {"title": "no id"}}"#);
        let adapter = ForumAdapter::new(Mode::Fixture(payload), ctx(0));
        let err = adapter.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Data(_)));
    }

    #[tokio::test]
    async fn unparseable_payload_is_data_error() {
        let adapter = ForumAdapter::new(Mode::Fixture("<html>503</html>".into()), ctx(0));
        assert!(matches!(adapter.fetch().await, Err(FetchError::Data(_))));
    }

    #[tokio::test]
    async fn items_past_horizon_are_windowed_out() {
        let now = 100 * DAY;
        let payload = listing(&format!(
            "{},{}",
            post("old", "Ancient hit", 900.0, now - 20 * DAY),
            post("new", "Recent post", 90.0, now - DAY)
        ));
        let adapter = ForumAdapter::new(Mode::Fixture(payload), ctx(now));

        let items = adapter.fetch().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "new");
    }

    #[tokio::test]
    async fn respects_limit() {
        let now = 100 * DAY;
        let posts: Vec<String> = (0..10)
            .map(|i| post(&format!("p{i}"), "Title", 5.0, now - DAY))
            .collect();
        let payload = listing(&posts.join(","));
        let mut c = ctx(now);
        c.limit = 3;
        let adapter = ForumAdapter::new(Mode::Fixture(payload), c);
        assert_eq!(adapter.fetch().await.unwrap().len(), 3);
    }
}
