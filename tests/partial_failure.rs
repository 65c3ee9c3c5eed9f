// tests/partial_failure.rs
// Orchestrator + merger behavior when a subset of adapters fails.

use std::time::Duration;

use async_trait::async_trait;
use trendscout::dedup::DedupIndex;
use trendscout::merge::{merge, MergeOptions};
use trendscout::orchestrator::{run, RunOptions};
use trendscout::output::Feed;
use trendscout::sources::SourceAdapter;
use trendscout::trust::TrustWeights;
use trendscout::types::{ContentItem, ErrorKind, FetchError, Source};

fn fast_opts() -> RunOptions {
    RunOptions {
        max_workers: 3,
        attempt_timeout: Duration::from_millis(200),
        max_retries: 2,
        backoff_base: Duration::from_millis(1),
        backoff_cap: Duration::from_millis(2),
    }
}

fn item(source: Source, id: &str, score: f64) -> ContentItem {
    ContentItem {
        source,
        id: id.into(),
        title: format!("item {id}"),
        url: None,
        author: None,
        published_at: Some(0),
        raw_engagement: score,
        population_baseline: 1.0,
        outlier_score: score,
    }
}

struct StaticAdapter {
    source: Source,
    items: Vec<ContentItem>,
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    async fn fetch(&self) -> Result<Vec<ContentItem>, FetchError> {
        Ok(self.items.clone())
    }
    fn source(&self) -> Source {
        self.source
    }
}

struct DownAdapter(Source);

#[async_trait]
impl SourceAdapter for DownAdapter {
    async fn fetch(&self) -> Result<Vec<ContentItem>, FetchError> {
        Err(FetchError::Transient("upstream 503".into()))
    }
    fn source(&self) -> Source {
        self.0
    }
}

#[tokio::test]
async fn three_of_five_sources_still_produce_a_ranked_feed() {
    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(StaticAdapter {
            source: Source::Forum,
            items: vec![item(Source::Forum, "f1", 6.0), item(Source::Forum, "f2", 3.0)],
        }),
        Box::new(StaticAdapter {
            source: Source::Video,
            items: vec![item(Source::Video, "v1", 9.0)],
        }),
        Box::new(StaticAdapter {
            source: Source::Social,
            items: vec![item(Source::Social, "s1", 4.0)],
        }),
        Box::new(DownAdapter(Source::ShortVideo)),
        Box::new(DownAdapter(Source::Marketplace)),
    ];

    let combined = run(adapters, &fast_opts()).await;
    assert!(combined.any_succeeded());
    assert_eq!(
        combined.failed_sources(),
        vec![
            (Source::ShortVideo, ErrorKind::Transient),
            (Source::Marketplace, ErrorKind::Transient),
        ]
    );

    let mut dedup = DedupIndex::new(4);
    let items = merge(
        &combined.results,
        &mut dedup,
        &TrustWeights::new(),
        &MergeOptions {
            min_score: 0.0,
            no_dedup: false,
        },
        1_000,
    );
    assert_eq!(items.len(), 4);
    // video 9.0 ranks first; social 4.0*0.8 = 3.2 ranks last but one set:
    // order is v1 (9.0), f1 (6.0), s1 (3.2 weighted), f2 (3.0).
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["v1", "f1", "s1", "f2"]);

    let feed = Feed::build(&items, &combined, 0);
    assert_eq!(feed.metadata.total_items, 4);
    assert_eq!(feed.metadata.sources_failed.len(), 2);
}

#[tokio::test]
async fn all_failed_yields_well_formed_empty_result() {
    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(DownAdapter(Source::Forum)),
        Box::new(DownAdapter(Source::Video)),
    ];
    let combined = run(adapters, &fast_opts()).await;
    assert!(!combined.any_succeeded());

    let mut dedup = DedupIndex::new(4);
    let items = merge(
        &combined.results,
        &mut dedup,
        &TrustWeights::new(),
        &MergeOptions {
            min_score: 0.0,
            no_dedup: false,
        },
        0,
    );
    assert!(items.is_empty());

    let feed = Feed::build(&items, &combined, 0);
    assert_eq!(feed.metadata.total_items, 0);
    assert!(feed.metadata.sources_succeeded.is_empty());
    assert_eq!(feed.metadata.sources_failed.len(), 2);
}

#[tokio::test]
async fn failed_source_items_never_reach_output() {
    // An adapter that errors after producing items must contribute nothing.
    struct HalfwayAdapter;

    #[async_trait]
    impl SourceAdapter for HalfwayAdapter {
        async fn fetch(&self) -> Result<Vec<ContentItem>, FetchError> {
            Err(FetchError::Data("payload truncated".into()))
        }
        fn source(&self) -> Source {
            Source::Research
        }
    }

    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(HalfwayAdapter),
        Box::new(StaticAdapter {
            source: Source::Forum,
            items: vec![item(Source::Forum, "keep", 5.0)],
        }),
    ];
    let combined = run(adapters, &fast_opts()).await;

    let mut dedup = DedupIndex::new(4);
    let items = merge(
        &combined.results,
        &mut dedup,
        &TrustWeights::new(),
        &MergeOptions {
            min_score: 0.0,
            no_dedup: false,
        },
        0,
    );
    assert_eq!(items.len(), 1);
    assert!(items.iter().all(|i| i.source == Source::Forum));
}
