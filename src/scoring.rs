// src/scoring.rs
//! # Outlier Scorer
//! Pure function mapping `(raw engagement, population baseline, recency,
//! text signals)` to a normalized outlier score. No I/O, no clock access:
//! `now` is always passed in, so adapters and tests score deterministically.
//!
//! Shape: `base * recency_boost * engagement_modifier`, where
//! - `base` = raw / baseline (0 when the baseline gives no information),
//! - `recency_boost` decays linearly from 1.0 (≤7 days) to a 0.5 floor
//!   at the horizon (default 14 days),
//! - `engagement_modifier` = 1 + the additive sum of matched text signals.
//!
//! Modifiers stack additively before the single multiplication so several
//! co-occurring signals cannot compound multiplicatively; a genuinely
//! anomalous item still dominates through its `base` term.

use crate::signals;

const SECS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy)]
pub struct ScoreParams {
    /// Guard against division by ~zero baselines.
    pub epsilon: f64,
    /// Full recency boost up to this age (days).
    pub fresh_days: f64,
    /// Age at which the boost reaches `floor` (days). Items older than this
    /// are expected to be windowed out by the adapter, not scored.
    pub horizon_days: f64,
    /// Recency boost at and beyond the horizon.
    pub floor: f64,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            fresh_days: 7.0,
            horizon_days: 14.0,
            floor: 0.5,
        }
    }
}

/// Linear recency decay: 1.0 inside the fresh window, down to `floor` at
/// the horizon, clamped to `floor` beyond it.
pub fn recency_boost(age_secs: u64, params: &ScoreParams) -> f64 {
    let age_days = age_secs as f64 / SECS_PER_DAY;
    if age_days <= params.fresh_days {
        return 1.0;
    }
    if age_days >= params.horizon_days {
        return params.floor;
    }
    let span = params.horizon_days - params.fresh_days;
    let progress = (age_days - params.fresh_days) / span;
    1.0 - progress * (1.0 - params.floor)
}

/// Score one item. Never panics, never returns NaN/Inf or a negative value.
///
/// A baseline ≤ 0 means "insufficient data", not "infinitely viral": the
/// base term short-circuits to 0. A missing `published_at` is treated as
/// published now (full boost) — callers log such items as low-confidence.
pub fn score(
    raw_engagement: f64,
    population_baseline: f64,
    published_at: Option<u64>,
    title: &str,
    now: u64,
    params: &ScoreParams,
) -> f64 {
    let raw = if raw_engagement.is_finite() && raw_engagement > 0.0 {
        raw_engagement
    } else {
        0.0
    };

    let base = if population_baseline.is_finite() && population_baseline > 0.0 {
        raw / population_baseline.max(params.epsilon)
    } else {
        0.0
    };

    let age_secs = published_at
        .map(|ts| now.saturating_sub(ts))
        .unwrap_or(0);
    let recency = recency_boost(age_secs, params);

    let modifier = 1.0 + signals::signal_weight_sum(title);

    let out = base * recency * modifier;
    if out.is_finite() && out > 0.0 {
        out
    } else {
        0.0
    }
}
