// src/sources/marketplace.rs
//! Marketplace rankings adapter (best-effort). Engagement metric: the
//! sales-rank improvement since the previous snapshot (previous − current,
//! floored at zero — a falling rank number means the product is selling).
//! Population baseline: mean positive delta across the category page.
//! Ranking snapshots carry no publication timestamp, so every item is
//! scored with low-confidence recency.

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::signals::normalize_title;
use crate::types::{ContentItem, FetchError, Source};

use super::{fetch_payload, finalize_scores, mean, AdapterContext, Mode, SourceAdapter};

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct Product {
    id: Option<String>,
    title: Option<String>,
    seller: Option<String>,
    url: Option<String>,
    rank_current: Option<f64>,
    rank_previous: Option<f64>,
}

pub struct MarketplaceAdapter {
    mode: Mode,
    ctx: AdapterContext,
}

impl MarketplaceAdapter {
    pub fn new(mode: Mode, ctx: AdapterContext) -> Self {
        Self { mode, ctx }
    }

    fn parse(&self, payload: &str) -> Result<Vec<ContentItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let page: Page = serde_json::from_str(payload)
            .map_err(|e| FetchError::Data(format!("marketplace page parse: {e}")))?;

        let total = page.products.len();
        let mut items = Vec::with_capacity(total);
        for product in page.products.into_iter().take(self.ctx.limit) {
            let (Some(id), Some(title)) = (product.id, product.title) else {
                tracing::warn!(source = "marketplace", "product missing id/title, dropped");
                continue;
            };
            if title.trim().is_empty() {
                continue;
            }

            let delta = match (product.rank_previous, product.rank_current) {
                (Some(prev), Some(curr)) if prev.is_finite() && curr.is_finite() => {
                    (prev - curr).max(0.0)
                }
                _ => 0.0,
            };

            items.push(ContentItem {
                source: Source::Marketplace,
                id,
                title: normalize_title(&title),
                url: product.url,
                author: product.seller,
                published_at: None,
                raw_engagement: delta,
                population_baseline: 0.0,
                outlier_score: 0.0,
            });
        }

        if items.is_empty() && total > 0 {
            return Err(FetchError::Data("marketplace: no product parsed".into()));
        }

        // Baseline from movers only: products that did not move carry no
        // signal about what a typical climb looks like.
        let movers: Vec<f64> = items
            .iter()
            .map(|i| i.raw_engagement)
            .filter(|d| *d > 0.0)
            .collect();
        let baseline = mean(&movers);
        for item in &mut items {
            item.population_baseline = baseline;
        }
        finalize_scores(&mut items, &self.ctx);

        histogram!("adapter_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("aggregate_items_total").increment(items.len() as u64);
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for MarketplaceAdapter {
    async fn fetch(&self) -> Result<Vec<ContentItem>, FetchError> {
        let signature = format!("marketplace:movers:{}", self.ctx.limit);
        let payload = fetch_payload(&self.mode, Source::Marketplace, &self.ctx, &signature).await?;
        self.parse(&payload)
    }

    fn source(&self) -> Source {
        Source::Marketplace
    }
}
