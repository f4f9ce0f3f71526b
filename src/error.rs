// src/error.rs
//! Failure taxonomy for a single stage call (one feed, one query, one article).
//!
//! None of these ever reach the pipeline as a run failure: callers log them and
//! continue with an empty/absent result. A missing credential is not an error
//! at all; the pipeline simply runs without that stage.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("HTML page returned instead of a feed (content-type {content_type})")]
    DisguisedHtml { content_type: String },

    #[error("unparseable body: {0}")]
    Format(String),

    #[error("invalid classifier response: {0}")]
    Validation(String),
}

impl StageError {
    /// Network, timeout or non-2xx failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, StageError::Transport(_) | StageError::Status(_))
    }

    pub(crate) fn format(err: impl std::fmt::Display) -> Self {
        StageError::Format(err.to_string())
    }
}

impl From<serde_json::Error> for StageError {
    fn from(err: serde_json::Error) -> Self {
        StageError::format(err)
    }
}
