// src/ingest/providers/news_search.rs
//! NewsAPI `/v2/everything` client: Spanish-language results, newest first.

use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{Limits, Timeouts};
use crate::error::StageError;
use crate::ingest::normalize::{strip_markup, truncate_chars};
use crate::ingest::types::{NewsSearch, RawArticle};

pub const SEARCH_LANGUAGE: &str = "es";
pub const REMOVED_TITLE: &str = "[Removed]";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub articles: Vec<SearchArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArticle {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<SearchSource>,
}

#[derive(Debug, Deserialize)]
pub struct SearchSource {
    pub name: Option<String>,
}

/// Map a decoded response to articles. Removed or untitled entries are dropped.
pub fn response_to_articles(
    resp: SearchResponse,
    label: &str,
    max_description_chars: usize,
) -> Vec<RawArticle> {
    resp.articles
        .into_iter()
        .filter_map(|a| {
            let title = a.title.as_deref().map(str::trim).unwrap_or_default();
            if title.is_empty() || title == REMOVED_TITLE {
                return None;
            }
            let publisher = a
                .source
                .and_then(|s| s.name)
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "?".to_string());
            Some(RawArticle {
                title: title.to_string(),
                link: a.url.unwrap_or_default().trim().to_string(),
                description: truncate_chars(
                    &strip_markup(a.description.as_deref().unwrap_or_default()),
                    max_description_chars,
                ),
                date: a
                    .published_at
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
                source: format!("{label} - {publisher}"),
            })
        })
        .collect()
}

pub struct NewsApiSearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    page_size: usize,
    max_description_chars: usize,
}

impl NewsApiSearch {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        api_key: Option<String>,
        timeouts: &Timeouts,
        limits: &Limits,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
            timeout: timeouts.search,
            page_size: limits.search_page_size,
            max_description_chars: limits.max_description_chars,
        }
    }
}

#[async_trait]
impl NewsSearch for NewsApiSearch {
    async fn search(
        &self,
        query: &str,
        allow_list: Option<&str>,
        label: &str,
    ) -> Result<Vec<RawArticle>, StageError> {
        // No key, no call.
        let Some(key) = self.api_key.as_deref() else {
            tracing::debug!(target: "ingest", query, "search skipped (no NEWSAPI_KEY)");
            return Ok(Vec::new());
        };

        let page_size = self.page_size.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("q", query),
            ("language", SEARCH_LANGUAGE),
            ("sortBy", "publishedAt"),
            ("pageSize", &page_size),
            ("apiKey", key),
        ];
        if let Some(sources) = allow_list.filter(|s| !s.trim().is_empty()) {
            params.push(("sources", sources));
        }

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StageError::Status(status));
        }
        let body = resp.bytes().await?;
        let decoded: SearchResponse = serde_json::from_slice(&body)?;

        let out = response_to_articles(decoded, label, self.max_description_chars);
        tracing::debug!(target: "ingest", source = label, items = out.len(), "search results");
        counter!("ingest_articles_total").increment(out.len() as u64);
        Ok(out)
    }
}
