// src/trust.rs
//! # Trust Weights
//! Per-source trust multipliers applied by the merger as a *sort-key view*
//! over the outlier score. The stored `outlier_score` is never rewritten,
//! so raw scores stay comparable across sources when debugging a run.
//!
//! Defaults: primary sources 1.0, stretch sources 0.8. A JSON or TOML file
//! can override individual sources; values are clamped to (0, 1].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::types::{Source, SourceClass};

const PRIMARY_WEIGHT: f64 = 1.0;
const STRETCH_WEIGHT: f64 = 0.8;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrustWeights {
    /// Per-source overrides, keyed by source name (e.g. "short_video").
    #[serde(default)]
    overrides: HashMap<String, f64>,
}

impl TrustWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from a JSON or TOML file (picked by extension).
    /// Falls back to class defaults on any read/parse error, matching how
    /// a missing config should not fail a run.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let Ok(s) = fs::read_to_string(path) else {
            return Self::default();
        };
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str::<Self>(&s).map_err(|e| e.to_string()),
            _ => serde_json::from_str::<Self>(&s).map_err(|e| e.to_string()),
        };
        parsed.unwrap_or_else(|e| {
            tracing::warn!(error = %e, path = %path.display(), "bad trust weights file, using defaults");
            Self::default()
        })
    }

    pub fn weight_for(&self, source: Source) -> f64 {
        if let Some(&w) = self.overrides.get(source.as_str()) {
            return clamp_unit(w);
        }
        match source.class() {
            SourceClass::Primary => PRIMARY_WEIGHT,
            SourceClass::Stretch => STRETCH_WEIGHT,
        }
    }
}

/// Clamp to (0, 1]. A zero or negative override would silently erase a
/// source from the ranking, so it is floored to a small positive weight.
fn clamp_unit(w: f64) -> f64 {
    if !w.is_finite() || w <= 0.0 {
        0.05
    } else if w > 1.0 {
        1.0
    } else {
        w
    }
}
