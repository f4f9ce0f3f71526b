// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// Article as produced by a fetcher: normalized text, no identity yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    pub link: String,
    pub description: String, // stripped + truncated
    pub date: String,        // as published, or fetch time when missing
    pub source: String,      // display label
}

/// Article that survived dedup and carries its dedup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedArticle {
    pub id: String,
    pub article: RawArticle,
}

impl IdentifiedArticle {
    pub fn new(article: RawArticle) -> Self {
        Self {
            id: crate::ingest::normalize::identify(&article),
            article,
        }
    }
}

impl std::ops::Deref for IdentifiedArticle {
    type Target = RawArticle;

    fn deref(&self) -> &RawArticle {
        &self.article
    }
}

/// Structured-markup feed client.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, endpoint: &str, label: &str) -> Result<Vec<RawArticle>, StageError>;
}

/// News search client. `allow_list` restricts publishers when present.
#[async_trait::async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        allow_list: Option<&str>,
        label: &str,
    ) -> Result<Vec<RawArticle>, StageError>;
}
