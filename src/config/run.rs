// src/config/run.rs
//! Per-run configuration: a user-editable override file merged over the
//! catalog defaults.
//!
//! Merge is shallow and key-wise:
//!
//! | key              | present in override                | absent              |
//! |------------------|------------------------------------|---------------------|
//! | `queries`        | replaces the default list          | default queries     |
//! | `news_sources`   | replaces (`""` = unrestricted)     | `""`                |
//! | `extra_keywords` | replaces                           | none                |
//! | `sources`        | per-key override of catalog flags  | catalog flags       |
//!
//! Lists are never concatenated with their defaults.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::catalog::SourceCatalog;

pub const DEFAULT_QUERY_LABEL: &str = "NewsAPI";

/// One topic query against the news search API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "QueryEntry")]
pub struct SearchQuery {
    pub query: String,
    pub label: String,
}

impl SearchQuery {
    pub fn new(query: &str, label: &str) -> Self {
        Self {
            query: query.to_string(),
            label: label.to_string(),
        }
    }
}

/// Accepts `"text"` as well as `{ "query": "text", "label": "..." }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum QueryEntry {
    Plain(String),
    Labelled {
        query: String,
        #[serde(default)]
        label: Option<String>,
    },
}

impl From<QueryEntry> for SearchQuery {
    fn from(e: QueryEntry) -> Self {
        match e {
            QueryEntry::Plain(q) => SearchQuery::new(q.trim(), DEFAULT_QUERY_LABEL),
            QueryEntry::Labelled { query, label } => {
                let label = label
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| DEFAULT_QUERY_LABEL.to_string());
                SearchQuery {
                    query: query.trim().to_string(),
                    label,
                }
            }
        }
    }
}

/// Raw override file. Every key is optional; `None` means "keep the default".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverrideFile {
    pub queries: Option<Vec<SearchQuery>>,
    pub news_sources: Option<String>,
    pub extra_keywords: Option<Vec<String>>,
    pub sources: Option<BTreeMap<String, bool>>,
}

/// Fully resolved configuration for one run. Serializes with the same keys as
/// the override file, so `--print-config` output can be edited and fed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub queries: Vec<SearchQuery>,
    pub news_sources: String,
    pub extra_keywords: Vec<String>,
    #[serde(rename = "sources")]
    pub sources_enabled: BTreeMap<String, bool>,
}

impl RunConfig {
    pub fn defaults(catalog: &SourceCatalog) -> Self {
        Self {
            queries: default_queries(),
            news_sources: String::new(),
            extra_keywords: Vec::new(),
            sources_enabled: catalog
                .sources()
                .iter()
                .map(|s| (s.key.clone(), s.enabled))
                .collect(),
        }
    }

    pub fn is_enabled(&self, key: &str) -> bool {
        self.sources_enabled.get(key).copied().unwrap_or(false)
    }

    /// `None` when the allow-list is empty (unrestricted search).
    pub fn news_source_filter(&self) -> Option<&str> {
        let s = self.news_sources.trim();
        (!s.is_empty()).then_some(s)
    }
}

fn default_queries() -> Vec<SearchQuery> {
    vec![
        SearchQuery::new(
            "multa sanción compliance empresa España",
            "NewsAPI-Compliance",
        ),
        SearchQuery::new(
            "CNMC AEPD CNMV resolución sanción",
            "NewsAPI-Reguladores",
        ),
    ]
}

/// Apply `ov` on top of `base`. See the module table for the per-key policy.
pub fn merge(base: RunConfig, ov: OverrideFile, catalog: &SourceCatalog) -> RunConfig {
    let mut out = base;

    if let Some(q) = ov.queries {
        out.queries = q.into_iter().filter(|q| !q.query.is_empty()).collect();
    }
    if let Some(ns) = ov.news_sources {
        out.news_sources = ns.trim().to_string();
    }
    if let Some(kw) = ov.extra_keywords {
        out.extra_keywords = clean_list(kw);
    }
    if let Some(flags) = ov.sources {
        for (key, enabled) in flags {
            if catalog.contains(&key) {
                out.sources_enabled.insert(key, enabled);
            } else {
                warn!(target: "config", source = %key, "override names unknown source, ignored");
            }
        }
    }
    out
}

/// Trim, drop blanks and repeated entries, keep first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

/// Load an override from an explicit path. JSON or TOML.
pub fn load_override_from(path: &Path) -> Result<OverrideFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading run config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_override(&content, &ext)
}

fn parse_override(s: &str, hint_ext: &str) -> Result<OverrideFile> {
    if hint_ext == "toml" {
        return toml::from_str(s).context("parsing TOML run config");
    }
    match serde_json::from_str(s) {
        Ok(v) => Ok(v),
        Err(json_err) => toml::from_str(s)
            .map_err(|_| anyhow!(json_err))
            .context("parsing JSON run config"),
    }
}

/// Override file location:
/// 1) explicit path (CLI flag or `CDT_CONFIG_PATH`), which must exist
/// 2) `<data_dir>/config.json`
/// 3) `<data_dir>/config.toml`
pub fn locate_override(data_dir: &Path, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = explicit {
        if p.exists() {
            return Ok(Some(p.to_path_buf()));
        }
        bail!("run config path {} does not exist", p.display());
    }
    for name in ["config.json", "config.toml"] {
        let p = data_dir.join(name);
        if p.exists() {
            return Ok(Some(p));
        }
    }
    Ok(None)
}

/// Build the run config. Never fails: any read or parse problem is logged and
/// the catalog defaults are used instead.
pub fn resolve(catalog: &SourceCatalog, data_dir: &Path, explicit: Option<&Path>) -> RunConfig {
    let defaults = RunConfig::defaults(catalog);
    let loaded = locate_override(data_dir, explicit)
        .and_then(|found| found.map(|p| load_override_from(&p)).transpose());
    match loaded {
        Ok(Some(ov)) => merge(defaults, ov, catalog),
        Ok(None) => {
            debug!(target: "config", "no run config override found, using defaults");
            defaults
        }
        Err(e) => {
            warn!(target: "config", error = ?e, "run config unreadable, using defaults");
            defaults
        }
    }
}
