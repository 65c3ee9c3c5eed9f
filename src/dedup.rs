// src/dedup.rs
//! # Deduplication Index
//! Rolling-window set of previously seen identity keys. The index is an
//! explicit value object: loaded once at pipeline start, mutated only
//! during the single-threaded merge phase, and persisted at pipeline end.
//! Entries older than the lookback window count as unseen again.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOOKBACK_WEEKS: u64 = 4;
const SECS_PER_WEEK: u64 = 7 * 24 * 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupIndex {
    /// identity_key → first_seen_at (unix seconds).
    entries: HashMap<String, u64>,
    lookback_secs: u64,
}

impl DedupIndex {
    pub fn new(lookback_weeks: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lookback_secs: lookback_weeks * SECS_PER_WEEK,
        }
    }

    /// True when the key was seen within the lookback window. Expiry is
    /// checked lazily here; expired entries are simply ignored.
    pub fn is_duplicate(&self, key: &str, now: u64) -> bool {
        match self.entries.get(key) {
            Some(&seen_at) => now.saturating_sub(seen_at) <= self.lookback_secs,
            None => false,
        }
    }

    /// Record a sighting. An expired entry is re-recorded at `seen_at`;
    /// a live entry keeps its original first-seen time.
    pub fn record(&mut self, key: &str, seen_at: u64) {
        match self.entries.get(key) {
            Some(&existing) if seen_at.saturating_sub(existing) <= self.lookback_secs => {}
            _ => {
                self.entries.insert(key.to_string(), seen_at);
            }
        }
    }

    /// Drop entries outside the window. Called before persisting so the
    /// stored index never grows past one window of history.
    pub fn compact(&mut self, now: u64) {
        let lookback = self.lookback_secs;
        self.entries
            .retain(|_, &mut seen_at| now.saturating_sub(seen_at) <= lookback);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load persisted state. A missing file yields a fresh index; a corrupt
    /// file is an error (silently discarding history would resurface weeks
    /// of already-published content).
    pub fn load(path: &Path, lookback_weeks: u64) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(lookback_weeks));
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading dedup state from {}", path.display()))?;
        let entries: HashMap<String, u64> = serde_json::from_str(&content)
            .with_context(|| format!("parsing dedup state from {}", path.display()))?;
        Ok(Self {
            entries,
            lookback_secs: lookback_weeks * SECS_PER_WEEK,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, json)
            .with_context(|| format!("writing dedup state to {}", path.display()))?;
        Ok(())
    }
}
