// src/types.rs
//! Core data model shared across adapters, orchestrator, and merger.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A content source. Primary sources run by default; stretch sources are
/// best-effort and only attempted with `--include-stretch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Forum,
    Video,
    Social,
    ShortVideo,
    Marketplace,
    Research,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceClass {
    Primary,
    Stretch,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Forum => "forum",
            Source::Video => "video",
            Source::Social => "social",
            Source::ShortVideo => "short_video",
            Source::Marketplace => "marketplace",
            Source::Research => "research",
        }
    }

    pub fn class(&self) -> SourceClass {
        match self {
            Source::Forum | Source::Video => SourceClass::Primary,
            Source::Social | Source::ShortVideo | Source::Marketplace | Source::Research => {
                SourceClass::Stretch
            }
        }
    }

    /// Sources run when none are requested explicitly.
    pub fn primary() -> Vec<Source> {
        Source::all()
            .into_iter()
            .filter(|s| s.class() == SourceClass::Primary)
            .collect()
    }

    pub fn all() -> Vec<Source> {
        vec![
            Source::Forum,
            Source::Video,
            Source::Social,
            Source::ShortVideo,
            Source::Marketplace,
            Source::Research,
        ]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forum" => Ok(Source::Forum),
            "video" => Ok(Source::Video),
            "social" => Ok(Source::Social),
            "short_video" | "short-video" => Ok(Source::ShortVideo),
            "marketplace" => Ok(Source::Marketplace),
            "research" => Ok(Source::Research),
            other => Err(anyhow::anyhow!("unknown source: {other}")),
        }
    }
}

/// One candidate piece of content, normalized to a common shape.
///
/// `outlier_score` is written exactly once, by the scorer, inside the
/// adapter that fetched the item. The merger reads it but never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub source: Source,
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub author: Option<String>,
    /// Unix seconds. `None` means the upstream payload carried no timestamp
    /// and the item was scored with full recency (low-confidence recency).
    pub published_at: Option<u64>,
    pub raw_engagement: f64,
    pub population_baseline: f64,
    pub outlier_score: f64,
}

impl ContentItem {
    /// Stable dedup key: source + native id, not a content hash, because
    /// titles/bodies may be truncated or edited upstream.
    pub fn identity_key(&self) -> String {
        format!("{}:{}", self.source, self.id)
    }
}

/// Failure classification driving the orchestrator's retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid credentials/configuration. Never retried.
    Config,
    /// Timeout, 5xx, or rate limit. Retried with backoff.
    Transient,
    /// Upstream payload present but unusable. Not retried.
    Data,
    /// Adapter task panicked. Not retried.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Transient => "transient",
            ErrorKind::Data => "data",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Adapter-level fetch failure. Adapters never let raw errors cross the
/// orchestrator boundary; everything is folded into this type.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("transient error: {0}")]
    Transient(String),
    #[error("data error: {0}")]
    Data(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Config(_) => ErrorKind::Config,
            FetchError::Transient(_) => ErrorKind::Transient,
            FetchError::Data(_) => ErrorKind::Data,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            return FetchError::Transient(e.to_string());
        }
        if let Some(status) = e.status() {
            if status.is_server_error() || status.as_u16() == 429 {
                return FetchError::Transient(e.to_string());
            }
        }
        FetchError::Data(e.to_string())
    }
}

/// Outcome of one adapter invocation, produced by the orchestrator after
/// retries are exhausted or the fetch succeeds. Immutable once returned.
#[derive(Debug, Clone)]
pub struct SourceResult {
    pub source: Source,
    pub succeeded: bool,
    pub items: Vec<ContentItem>,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
    pub duration: Duration,
    pub attempts: u32,
}

impl SourceResult {
    pub fn ok(source: Source, items: Vec<ContentItem>, duration: Duration, attempts: u32) -> Self {
        Self {
            source,
            succeeded: true,
            items,
            error_kind: None,
            error: None,
            duration,
            attempts,
        }
    }

    pub fn failed(
        source: Source,
        kind: ErrorKind,
        error: String,
        duration: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            source,
            succeeded: false,
            items: Vec::new(),
            error_kind: Some(kind),
            error: Some(error),
            duration,
            attempts,
        }
    }
}
