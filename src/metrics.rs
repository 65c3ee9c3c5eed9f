// src/metrics.rs
//! One-time registration of telemetry series so they carry descriptions
//! when an embedding host installs a recorder.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregate_items_total",
            "Items parsed from source payloads."
        );
        describe_counter!(
            "aggregate_kept_total",
            "Items surviving dedup and min-score filtering."
        );
        describe_counter!(
            "aggregate_dedup_total",
            "Items dropped by the deduplication window."
        );
        describe_counter!(
            "aggregate_below_min_score_total",
            "Items dropped for scoring under the minimum."
        );
        describe_counter!("adapter_errors_total", "Adapter fetch/parse failures.");
        describe_counter!("adapter_retries_total", "Adapter attempts beyond the first.");
        describe_histogram!("adapter_fetch_ms", "Adapter fetch+parse time in milliseconds.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the aggregation pipeline last completed."
        );
    });
}
