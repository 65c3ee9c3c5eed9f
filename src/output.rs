// src/output.rs
//! Run artifacts: the JSON feed consumed by downstream generation stages,
//! its flattened CSV equivalent, and the console summary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::OutputFormat;
use crate::orchestrator::CombinedResult;
use crate::types::{ContentItem, Source};

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedMetadata {
    /// ISO-8601.
    pub generated_at: String,
    pub total_items: usize,
    pub sources_succeeded: Vec<Source>,
    pub sources_failed: Vec<FailedSource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailedSource {
    pub source: Source,
    pub error_kind: String,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedRow {
    pub source: Source,
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub outlier_score: f64,
    /// ISO-8601, absent when the upstream carried no timestamp.
    pub published_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Feed {
    pub metadata: FeedMetadata,
    pub contents: Vec<FeedRow>,
}

impl Feed {
    pub fn build(items: &[ContentItem], combined: &CombinedResult, generated_at: u64) -> Self {
        let sources_failed = combined
            .results
            .iter()
            .filter(|r| !r.succeeded)
            .map(|r| FailedSource {
                source: r.source,
                error_kind: r
                    .error_kind
                    .map(|k| k.as_str().to_string())
                    .unwrap_or_default(),
                error: r.error.clone().unwrap_or_default(),
            })
            .collect();

        Self {
            metadata: FeedMetadata {
                generated_at: iso8601(generated_at),
                total_items: items.len(),
                sources_succeeded: combined.succeeded_sources(),
                sources_failed,
            },
            contents: items
                .iter()
                .map(|i| FeedRow {
                    source: i.source,
                    id: i.id.clone(),
                    title: i.title.clone(),
                    url: i.url.clone(),
                    author: i.author.clone(),
                    outlier_score: i.outlier_score,
                    published_at: i.published_at.map(iso8601),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing feed json")
    }

    /// Flattened equivalent: one row per item. Hand-quoted; the schema is
    /// fixed and small enough that a csv dependency buys nothing.
    pub fn to_csv(&self) -> String {
        let mut out =
            String::from("source,id,title,url,author,outlier_score,published_at\n");
        for row in &self.contents {
            out.push_str(&format!(
                "{},{},{},{},{},{:.4},{}\n",
                row.source,
                csv_field(&row.id),
                csv_field(&row.title),
                csv_field(row.url.as_deref().unwrap_or("")),
                csv_field(row.author.as_deref().unwrap_or("")),
                row.outlier_score,
                row.published_at.as_deref().unwrap_or(""),
            ));
        }
        out
    }

    /// Write the requested artifact(s); returns the paths written.
    pub fn write(&self, dir: &Path, format: OutputFormat) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let mut written = Vec::new();
        if format.wants_json() {
            let path = dir.join("feed.json");
            fs::write(&path, self.to_json()?)
                .with_context(|| format!("writing {}", path.display()))?;
            written.push(path);
        }
        if format.wants_csv() {
            let path = dir.join("feed.csv");
            fs::write(&path, self.to_csv())
                .with_context(|| format!("writing {}", path.display()))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Console summary: which sources made it, which did not, and why.
pub fn log_summary(feed: &Feed) {
    for s in &feed.metadata.sources_succeeded {
        tracing::info!(source = %s, "source succeeded");
    }
    for f in &feed.metadata.sources_failed {
        tracing::warn!(
            source = %f.source,
            kind = %f.error_kind,
            reason = %f.error,
            "source failed"
        );
    }
    tracing::info!(
        total_items = feed.metadata.total_items,
        succeeded = feed.metadata.sources_succeeded.len(),
        failed = feed.metadata.sources_failed.len(),
        "run complete"
    );
}

fn iso8601(unix: u64) -> String {
    DateTime::<Utc>::from_timestamp(unix as i64, 0)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).expect("epoch"))
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
