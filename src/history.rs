// src/history.rs
//! Durable hit history: one JSON file, read once at the start of a run and
//! written once at the end.
//!
//! Entries are kept newest first and capped on every save. An entry is never
//! edited after creation; it only leaves the file by falling off the end.
//! Stored entries that do not fit the current `Hit` shape are carried through
//! untouched as raw JSON so a load/save cycle never loses them.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analyze::classifier::score_from_value;
use crate::analyze::{AnalysisResult, Level};
use crate::ingest::normalize::truncate_chars;
use crate::ingest::types::IdentifiedArticle;

pub const FALLBACK_LEVEL: Level = Level::Info;
pub const FALLBACK_SCORE: u8 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub raw_date: String,
    #[serde(default)]
    pub fetched_at: DateTime<Utc>,
    #[serde(deserialize_with = "lenient_level")]
    pub level: Level,
    #[serde(deserialize_with = "lenient_score")]
    pub relevance_score: u8,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub norms_affected: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub vulnerability: String,
    #[serde(default)]
    pub financial_impact: String,
    #[serde(default)]
    pub recommended_action: String,
}

// Older files may carry "Critical" or 72.5.
fn lenient_level<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Level, D::Error> {
    let s = String::deserialize(d)?;
    Level::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown level {s:?}")))
}

fn lenient_score<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u8, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    score_from_value(&v).ok_or_else(|| serde::de::Error::custom("relevance_score not a number"))
}

impl Hit {
    pub fn classified(
        article: &IdentifiedArticle,
        analysis: AnalysisResult,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            link: article.link.clone(),
            source: article.source.clone(),
            raw_date: article.date.clone(),
            fetched_at,
            level: analysis.level,
            relevance_score: analysis.relevance_score,
            risks: analysis.risks,
            norms_affected: analysis.norms_affected,
            summary: analysis.summary,
            vulnerability: analysis.vulnerability,
            financial_impact: analysis.financial_impact,
            recommended_action: analysis.recommended_action,
        }
    }

    /// Hit for a run without a classifier: level `info`, score 50, the
    /// description (capped) as summary, everything else empty.
    pub fn unclassified(
        article: &IdentifiedArticle,
        fetched_at: DateTime<Utc>,
        summary_chars: usize,
    ) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            link: article.link.clone(),
            source: article.source.clone(),
            raw_date: article.date.clone(),
            fetched_at,
            level: FALLBACK_LEVEL,
            relevance_score: FALLBACK_SCORE,
            risks: Vec::new(),
            norms_affected: Vec::new(),
            summary: truncate_chars(&article.description, summary_chars),
            vulnerability: String::new(),
            financial_impact: String::new(),
            recommended_action: String::new(),
        }
    }
}

/// One stored entry: a typed hit, or whatever an older writer left there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    Hit(Hit),
    Raw(serde_json::Value),
}

impl HistoryEntry {
    pub fn as_hit(&self) -> Option<&Hit> {
        match self {
            HistoryEntry::Hit(h) => Some(h),
            HistoryEntry::Raw(_) => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            HistoryEntry::Hit(h) => Some(&h.id),
            HistoryEntry::Raw(v) => v.get("id").and_then(|id| id.as_str()),
        }
    }

    /// Level as stored, read case-insensitively for raw entries.
    pub fn level(&self) -> Option<Level> {
        match self {
            HistoryEntry::Hit(h) => Some(h.level),
            HistoryEntry::Raw(v) => v.get("level").and_then(|l| l.as_str()).and_then(Level::parse),
        }
    }
}

impl From<Hit> for HistoryEntry {
    fn from(h: Hit) -> Self {
        HistoryEntry::Hit(h)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunStats {
    pub total_hits: usize,
    pub critical_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub new_this_run: usize,
    pub articles_checked: usize,
}

impl RunStats {
    pub fn compute(entries: &[HistoryEntry], new_this_run: usize, articles_checked: usize) -> Self {
        let count = |lvl: Level| entries.iter().filter(|e| e.level() == Some(lvl)).count();
        Self {
            total_hits: entries.len(),
            critical_count: count(Level::Critical),
            warning_count: count(Level::Warning),
            info_count: count(Level::Info),
            new_this_run,
            articles_checked,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitHistory {
    #[serde(rename = "hits")]
    pub entries: Vec<HistoryEntry>,
    pub last_updated: Option<DateTime<Utc>>,
    pub stats: RunStats,
}

impl HitHistory {
    pub fn from_hits(hits: Vec<Hit>) -> Self {
        Self {
            entries: hits.into_iter().map(HistoryEntry::from).collect(),
            ..Default::default()
        }
    }

    /// Typed hits in stored order; raw entries are skipped.
    pub fn hits(&self) -> Vec<&Hit> {
        self.entries.iter().filter_map(HistoryEntry::as_hit).collect()
    }

    pub fn existing_ids(&self) -> HashSet<String> {
        self.entries
            .iter()
            .filter_map(|e| e.id().map(str::to_string))
            .collect()
    }

    /// Prepend this run's hits, cap the list, recompute stats.
    pub fn absorb(&mut self, new_hits: Vec<Hit>, max_hits: usize, articles_checked: usize) {
        let new_this_run = new_hits.len();
        let mut merged: Vec<HistoryEntry> = new_hits.into_iter().map(HistoryEntry::from).collect();
        merged.append(&mut self.entries);
        merged.truncate(max_hits);
        self.entries = merged;
        self.stats = RunStats::compute(&self.entries, new_this_run, articles_checked);
    }
}

/// On-disk shape, read leniently: a bad timestamp or stats block does not
/// cost the entries.
#[derive(Deserialize)]
struct StoredHistory {
    #[serde(default)]
    hits: Vec<HistoryEntry>,
    #[serde(default)]
    last_updated: Option<serde_json::Value>,
    #[serde(default)]
    stats: Option<serde_json::Value>,
}

pub struct HitStore {
    path: PathBuf,
    max_hits: usize,
}

impl HitStore {
    pub fn new(path: impl Into<PathBuf>, max_hits: usize) -> Self {
        Self {
            path: path.into(),
            max_hits,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_hits(&self) -> usize {
        self.max_hits
    }

    /// Missing or unreadable file → empty history.
    pub fn load(&self) -> HitHistory {
        let content = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HitHistory::default(),
            Err(e) => {
                warn!(target: "history", path = %self.path.display(), error = %e, "history unreadable, starting empty");
                return HitHistory::default();
            }
        };
        match serde_json::from_str::<StoredHistory>(&content) {
            Ok(stored) => decode_stored(stored),
            Err(e) => {
                warn!(target: "history", path = %self.path.display(), error = %e, "history corrupt, starting empty");
                HitHistory::default()
            }
        }
    }

    /// Cap, stamp and write atomically (temp file + rename). The only
    /// failure that aborts a run.
    pub fn save(&self, history: &mut HitHistory, now: DateTime<Utc>) -> Result<()> {
        history.entries.truncate(self.max_hits);
        history.last_updated = Some(now);

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating data dir {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(history).context("serializing hit history")?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)
                .with_context(|| format!("creating {}", tmp.display()))?;
            f.write_all(json.as_bytes())
                .with_context(|| format!("writing {}", tmp.display()))?;
            f.sync_all()
                .with_context(|| format!("syncing {}", tmp.display()))?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;

        info!(target: "history", path = %self.path.display(), entries = history.entries.len(), "history saved");
        Ok(())
    }
}

fn decode_stored(stored: StoredHistory) -> HitHistory {
    let raw = stored
        .hits
        .iter()
        .filter(|e| e.as_hit().is_none())
        .count();
    if raw > 0 {
        warn!(target: "history", raw, "history entries kept as raw JSON");
    }
    HitHistory {
        entries: stored.hits,
        last_updated: stored
            .last_updated
            .and_then(|v| serde_json::from_value(v).ok()),
        stats: stored
            .stats
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default(),
    }
}
