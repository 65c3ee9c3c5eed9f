// src/config.rs
//! Run configuration: source selection, pipeline knobs, and opaque
//! per-source credentials pulled from the environment. Credentials are
//! never interpreted here; adapters receive them as-is, and a missing
//! token for a requested source surfaces as a `config` failure before
//! any fetch attempt.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::types::{Source, SourceClass};

pub const DEFAULT_MIN_SCORE: f64 = 2.0;
pub const DEFAULT_LIMIT: usize = 25;
pub const DEFAULT_MAX_WORKERS: usize = 3;
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
    Both,
}

impl OutputFormat {
    pub fn wants_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }

    pub fn wants_csv(&self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }
}

/// Opaque per-source API tokens, read from `TRENDSCOUT_<SOURCE>_TOKEN`.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    tokens: HashMap<Source, String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        let mut tokens = HashMap::new();
        for source in Source::all() {
            let var = format!(
                "TRENDSCOUT_{}_TOKEN",
                source.as_str().to_ascii_uppercase()
            );
            if let Ok(v) = std::env::var(&var) {
                let v = v.trim().to_string();
                if !v.is_empty() {
                    tokens.insert(source, v);
                }
            }
        }
        Self { tokens }
    }

    pub fn with_token(mut self, source: Source, token: &str) -> Self {
        self.tokens.insert(source, token.to_string());
        self
    }

    pub fn token(&self, source: Source) -> Option<&str> {
        self.tokens.get(&source).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub sources: Vec<Source>,
    /// Max items fetched per source before scoring.
    pub limit: usize,
    /// Items scoring below this are dropped before output.
    pub min_score: f64,
    pub dedup_weeks: u64,
    pub no_dedup: bool,
    pub output_format: OutputFormat,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub dedup_state_path: PathBuf,
    pub trust_weights_path: Option<PathBuf>,
    /// When set, adapters read canned payloads from this directory instead
    /// of the network (offline/deterministic runs).
    pub fixtures_dir: Option<PathBuf>,
    pub max_workers: usize,
    pub attempt_timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub credentials: Credentials,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sources: Source::primary(),
            limit: DEFAULT_LIMIT,
            min_score: DEFAULT_MIN_SCORE,
            dedup_weeks: crate::dedup::DEFAULT_LOOKBACK_WEEKS,
            no_dedup: false,
            output_format: OutputFormat::Json,
            output_dir: PathBuf::from("output"),
            cache_dir: PathBuf::from(".trendscout/cache"),
            dedup_state_path: PathBuf::from(".trendscout/dedup.json"),
            trust_weights_path: None,
            fixtures_dir: None,
            max_workers: DEFAULT_MAX_WORKERS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            credentials: Credentials::default(),
        }
    }
}

impl RunConfig {
    /// Invalid-before-any-fetch checks; callers map these to exit code 2.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("no sources selected");
        }
        if self.limit == 0 {
            bail!("--limit must be at least 1");
        }
        if self.max_workers == 0 {
            bail!("--max-workers must be at least 1");
        }
        if !self.min_score.is_finite() || self.min_score < 0.0 {
            bail!("--min-score must be a non-negative number");
        }
        Ok(())
    }
}

/// Resolve the source list from CLI input. An empty request means the
/// primary set; `--include-stretch` appends the best-effort sources.
/// Order is preserved and duplicates removed.
pub fn select_sources(requested: &[String], include_stretch: bool) -> Result<Vec<Source>> {
    let mut selected: Vec<Source> = if requested.is_empty() {
        Source::primary()
    } else {
        let mut v = Vec::new();
        for name in requested {
            for part in name.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                v.push(part.parse::<Source>()?);
            }
        }
        v
    };

    if include_stretch {
        for s in Source::all() {
            if s.class() == SourceClass::Stretch {
                selected.push(s);
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    selected.retain(|s| seen.insert(*s));
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_defaults_to_primary() {
        let s = select_sources(&[], false).unwrap();
        assert_eq!(s, Source::primary());
    }

    #[test]
    fn include_stretch_appends_best_effort_sources() {
        let s = select_sources(&[], true).unwrap();
        assert_eq!(s.len(), Source::all().len());
        assert_eq!(s[0], Source::Forum);
    }

    #[test]
    fn comma_lists_parse_and_dedupe() {
        let s = select_sources(&["forum,video,forum".to_string()], false).unwrap();
        assert_eq!(s, vec![Source::Forum, Source::Video]);
    }

    #[test]
    fn unknown_source_is_an_error() {
        assert!(select_sources(&["myspace".to_string()], false).is_err());
    }

    #[test]
    fn validate_rejects_empty_sources() {
        let cfg = RunConfig {
            sources: vec![],
            ..RunConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_limit() {
        let cfg = RunConfig {
            limit: 0,
            ..RunConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
