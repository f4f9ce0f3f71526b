// src/config/mod.rs
pub mod run;
pub mod settings;

pub use run::{resolve, OverrideFile, RunConfig, SearchQuery};
pub use settings::{Endpoints, Limits, Pacing, Settings, Timeouts};
