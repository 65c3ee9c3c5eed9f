// src/cache.rs
//! # Fetch Cache
//! Time-boxed raw-payload cache, injected into adapters so they can skip
//! re-fetching identical upstream data within the TTL. Sharded per source
//! by construction: every entry is keyed by `(source, query signature)` and
//! no adapter can read another source's shard.
//!
//! This is deliberately separate from the dedup index: caching avoids
//! redundant network calls, dedup avoids redundant content in the output.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::Source;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 3600);

/// Cache port. `get` returns only entries younger than the TTL.
pub trait FetchCache: Send + Sync {
    fn get(&self, source: Source, signature: &str, now: u64) -> Option<String>;
    fn put(&self, source: Source, signature: &str, payload: &str, now: u64);
}

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    fetched_at: u64,
    payload: String,
}

/// Filesystem-backed cache: `<dir>/<source>/<sha256(signature)>.json`.
/// Write failures are logged and swallowed; the cache is an optimization,
/// not a correctness requirement.
pub struct FileCache {
    dir: PathBuf,
    ttl_secs: u64,
}

impl FileCache {
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        Self {
            dir,
            ttl_secs: ttl.as_secs(),
        }
    }

    fn entry_path(&self, source: Source, signature: &str) -> PathBuf {
        let digest = Sha256::digest(signature.as_bytes());
        let mut name = String::with_capacity(69);
        for b in digest.iter() {
            use std::fmt::Write as _;
            let _ = write!(&mut name, "{:02x}", b);
        }
        name.push_str(".json");
        self.dir.join(source.as_str()).join(name)
    }

    fn read_entry(&self, source: Source, signature: &str) -> Result<Entry> {
        let path = self.entry_path(source, signature);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading cache entry {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing cache entry {}", path.display()))
    }
}

impl FetchCache for FileCache {
    fn get(&self, source: Source, signature: &str, now: u64) -> Option<String> {
        let entry = self.read_entry(source, signature).ok()?;
        if now.saturating_sub(entry.fetched_at) > self.ttl_secs {
            return None;
        }
        Some(entry.payload)
    }

    fn put(&self, source: Source, signature: &str, payload: &str, now: u64) {
        let path = self.entry_path(source, signature);
        let entry = Entry {
            fetched_at: now,
            payload: payload.to_string(),
        };
        let write = || -> Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, serde_json::to_string(&entry)?)?;
            Ok(())
        };
        if let Err(e) = write() {
            tracing::warn!(error = ?e, source = %source, "cache write failed");
        }
    }
}

/// In-memory cache for tests and single-shot offline runs.
#[derive(Default)]
pub struct MemoryCache {
    inner: Mutex<HashMap<(Source, String), Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FetchCache for MemoryCache {
    fn get(&self, source: Source, signature: &str, now: u64) -> Option<String> {
        let map = self.inner.lock().expect("cache mutex poisoned");
        let entry = map.get(&(source, signature.to_string()))?;
        if now.saturating_sub(entry.fetched_at) > DEFAULT_TTL.as_secs() {
            return None;
        }
        Some(entry.payload.clone())
    }

    fn put(&self, source: Source, signature: &str, payload: &str, now: u64) {
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        map.insert(
            (source, signature.to_string()),
            Entry {
                fetched_at: now,
                payload: payload.to_string(),
            },
        );
    }
}

/// No-op cache for runs that must always hit the network.
pub struct NoCache;

impl FetchCache for NoCache {
    fn get(&self, _source: Source, _signature: &str, _now: u64) -> Option<String> {
        None
    }

    fn put(&self, _source: Source, _signature: &str, _payload: &str, _now: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_cache_roundtrip_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf(), DEFAULT_TTL);
        cache.put(Source::Forum, "query=a", "payload", 1_000);
        assert_eq!(
            cache.get(Source::Forum, "query=a", 1_000 + 3600),
            Some("payload".to_string())
        );
    }

    #[test]
    fn file_cache_expires_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf(), DEFAULT_TTL);
        cache.put(Source::Forum, "query=a", "payload", 1_000);
        assert_eq!(cache.get(Source::Forum, "query=a", 1_000 + 24 * 3600 + 1), None);
    }

    #[test]
    fn shards_are_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf(), DEFAULT_TTL);
        cache.put(Source::Forum, "q", "forum-data", 1_000);
        assert_eq!(cache.get(Source::Video, "q", 1_000), None);
    }

    #[test]
    fn memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        cache.put(Source::Social, "sig", "x", 10);
        assert_eq!(cache.get(Source::Social, "sig", 20), Some("x".to_string()));
        assert_eq!(cache.get(Source::Social, "other", 20), None);
    }
}
