// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod cache;
pub mod config;
pub mod dedup;
pub mod merge;
pub mod metrics;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod signals;
pub mod sources;
pub mod trust;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::orchestrator::CombinedResult;
pub use crate::pipeline::{run_pipeline, RunReport};
pub use crate::types::{ContentItem, ErrorKind, FetchError, Source, SourceClass, SourceResult};
