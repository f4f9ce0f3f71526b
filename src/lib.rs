// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod ingest;
pub mod pipeline;
pub mod relevance;

// ---- Re-exports for stable public API ----
pub use crate::catalog::{SourceCatalog, SourceConfig};
pub use crate::config::{RunConfig, Settings};
pub use crate::error::StageError;
pub use crate::history::{HistoryEntry, Hit, HitHistory, HitStore, RunStats};
pub use crate::pipeline::{Pipeline, RunReport};
