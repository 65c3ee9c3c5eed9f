// src/orchestrator.rs
//! # Orchestrator
//! Bounded fan-out over the registered adapters. Each adapter runs in its
//! own spawned task (a panic is contained there and reported, never
//! propagated to siblings), gated by a semaphore so at most `max_workers`
//! fetches are in flight. Retries with exponential backoff apply to
//! transient failures only; configuration and data failures report
//! immediately. Every adapter yields exactly one well-formed
//! `SourceResult` — the merge phase starts only after all tasks joined.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use tokio::sync::Semaphore;

use crate::config::RunConfig;
use crate::sources::SourceAdapter;
use crate::types::{ErrorKind, FetchError, Source, SourceResult};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_workers: usize,
    pub attempt_timeout: Duration,
    /// Retries beyond the first attempt, transient failures only.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_workers: crate::config::DEFAULT_MAX_WORKERS,
            attempt_timeout: crate::config::DEFAULT_ATTEMPT_TIMEOUT,
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            backoff_base: crate::config::DEFAULT_BACKOFF_BASE,
            backoff_cap: crate::config::DEFAULT_BACKOFF_CAP,
        }
    }
}

impl RunOptions {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            max_workers: cfg.max_workers,
            attempt_timeout: cfg.attempt_timeout,
            max_retries: cfg.max_retries,
            backoff_base: cfg.backoff_base,
            backoff_cap: crate::config::DEFAULT_BACKOFF_CAP,
        }
    }
}

/// All per-adapter outcomes of one run.
#[derive(Debug)]
pub struct CombinedResult {
    pub results: Vec<SourceResult>,
}

impl CombinedResult {
    pub fn any_succeeded(&self) -> bool {
        self.results.iter().any(|r| r.succeeded)
    }

    pub fn succeeded_sources(&self) -> Vec<Source> {
        let mut v: Vec<Source> = self
            .results
            .iter()
            .filter(|r| r.succeeded)
            .map(|r| r.source)
            .collect();
        v.sort();
        v
    }

    pub fn failed_sources(&self) -> Vec<(Source, ErrorKind)> {
        let mut v: Vec<(Source, ErrorKind)> = self
            .results
            .iter()
            .filter(|r| !r.succeeded)
            .map(|r| (r.source, r.error_kind.unwrap_or(ErrorKind::Internal)))
            .collect();
        v.sort_by_key(|(s, _)| *s);
        v
    }
}

/// Run every adapter to completion and collect one `SourceResult` each.
pub async fn run(
    adapters: Vec<Box<dyn SourceAdapter + 'static>>,
    opts: &RunOptions,
) -> CombinedResult {
    crate::metrics::ensure_metrics_described();

    let semaphore = Arc::new(Semaphore::new(opts.max_workers.max(1)));
    let mut sources = Vec::with_capacity(adapters.len());
    let mut handles = Vec::with_capacity(adapters.len());

    for adapter in adapters {
        sources.push(adapter.source());
        let semaphore = Arc::clone(&semaphore);
        let opts = opts.clone();
        handles.push(tokio::spawn(async move {
            // The permit scope covers the whole fetch including backoff
            // sleeps, keeping upstream pressure bounded.
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("orchestrator semaphore closed");
            invoke_with_retries(adapter.as_ref(), &opts).await
        }));
    }

    let joined = futures::future::join_all(handles).await;

    let mut results = Vec::with_capacity(joined.len());
    for (source, outcome) in sources.into_iter().zip(joined) {
        let result = match outcome {
            Ok(r) => r,
            Err(e) => {
                let msg = if e.is_panic() {
                    format!("{source} adapter panicked")
                } else {
                    format!("{source} adapter task aborted: {e}")
                };
                tracing::error!(source = %source, "adapter task did not complete: {msg}");
                counter!("adapter_errors_total").increment(1);
                SourceResult::failed(source, ErrorKind::Internal, msg, Duration::ZERO, 0)
            }
        };
        results.push(result);
    }

    CombinedResult { results }
}

async fn invoke_with_retries(adapter: &dyn SourceAdapter, opts: &RunOptions) -> SourceResult {
    let source = adapter.source();
    let started = Instant::now();
    let mut attempts: u32 = 0;
    let mut delay = opts.backoff_base;

    loop {
        attempts += 1;
        let outcome = tokio::time::timeout(opts.attempt_timeout, adapter.fetch()).await;

        let err = match outcome {
            Ok(Ok(items)) => {
                tracing::info!(
                    source = %source,
                    items = items.len(),
                    attempts,
                    "adapter succeeded"
                );
                return SourceResult::ok(source, items, started.elapsed(), attempts);
            }
            Ok(Err(e)) => e,
            Err(_) => FetchError::Transient(format!(
                "attempt exceeded {}s deadline",
                opts.attempt_timeout.as_secs()
            )),
        };

        let kind = err.kind();
        let retryable = kind == ErrorKind::Transient && attempts <= opts.max_retries;
        if !retryable {
            tracing::warn!(
                source = %source,
                error = %err,
                kind = kind.as_str(),
                attempts,
                "adapter failed"
            );
            counter!("adapter_errors_total").increment(1);
            return SourceResult::failed(source, kind, err.to_string(), started.elapsed(), attempts);
        }

        tracing::warn!(
            source = %source,
            error = %err,
            attempt = attempts,
            backoff_ms = delay.as_millis() as u64,
            "transient failure, retrying"
        );
        counter!("adapter_retries_total").increment(1);
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(opts.backoff_cap);
    }
}
