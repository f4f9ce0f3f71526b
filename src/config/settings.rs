// src/config/settings.rs
//! Process-level settings: credentials, endpoints, caps and pacing.
//!
//! Read from the environment exactly once (after `.env` has been loaded) and
//! passed down by reference. Nothing below this module looks at env vars.

use std::path::PathBuf;
use std::time::Duration;

pub const ENV_MISTRAL_API_KEY: &str = "MISTRAL_API_KEY";
pub const ENV_MISTRAL_MODEL: &str = "MISTRAL_MODEL";
pub const ENV_MISTRAL_API_URL: &str = "MISTRAL_API_URL";
pub const ENV_NEWSAPI_KEY: &str = "NEWSAPI_KEY";
pub const ENV_NEWSAPI_URL: &str = "NEWSAPI_URL";
pub const ENV_RELEVANCE_THRESHOLD: &str = "RELEVANCE_THRESHOLD";
pub const ENV_DATA_DIR: &str = "CDT_DATA_DIR";
pub const ENV_CONFIG_PATH: &str = "CDT_CONFIG_PATH";
pub const ENV_MAX_HITS: &str = "CDT_MAX_HITS";
pub const ENV_MAX_NEW_PER_RUN: &str = "CDT_MAX_NEW_PER_RUN";

pub const DEFAULT_MISTRAL_MODEL: &str = "mistral-small-latest";
pub const DEFAULT_MISTRAL_API_URL: &str = "https://api.mistral.ai/v1/chat/completions";
pub const DEFAULT_NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_RELEVANCE_THRESHOLD: u8 = 60;
pub const DEFAULT_DATA_DIR: &str = "data";

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; CDT-ComplianceBot/1.0)";

/// Size caps. Named so they can be tuned without touching the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Stored history length after every save.
    pub max_hits: usize,
    /// New articles considered (classified or stored) per run.
    pub max_new_per_run: usize,
    /// Items read from a single feed, in document order.
    pub max_items_per_feed: usize,
    /// `pageSize` for the news search API.
    pub search_page_size: usize,
    /// Description length kept on a raw article (chars).
    pub max_description_chars: usize,
    /// Summary length of an unclassified hit (chars).
    pub fallback_summary_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_hits: 200,
            max_new_per_run: 30,
            max_items_per_feed: 25,
            search_page_size: 10,
            max_description_chars: 600,
            fallback_summary_chars: 300,
        }
    }
}

/// Fixed politeness delays between calls to the same family of endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub between_feeds: Duration,
    pub between_queries: Duration,
    pub after_classification: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            between_feeds: Duration::from_millis(1_500),
            between_queries: Duration::from_millis(1_000),
            after_classification: Duration::from_millis(1_200),
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            between_feeds: Duration::ZERO,
            between_queries: Duration::ZERO,
            after_classification: Duration::ZERO,
        }
    }
}

/// Per-endpoint request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub feed: Duration,
    pub search: Duration,
    pub classifier: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            feed: Duration::from_secs(20),
            search: Duration::from_secs(15),
            classifier: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub classifier_url: String,
    pub search_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            classifier_url: DEFAULT_MISTRAL_API_URL.to_string(),
            search_url: DEFAULT_NEWSAPI_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub classifier_api_key: Option<String>,
    pub classifier_model: String,
    pub search_api_key: Option<String>,
    pub relevance_threshold: u8,
    pub data_dir: PathBuf,
    pub config_path: Option<PathBuf>,
    pub endpoints: Endpoints,
    pub limits: Limits,
    pub pacing: Pacing,
    pub timeouts: Timeouts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            classifier_api_key: None,
            classifier_model: DEFAULT_MISTRAL_MODEL.to_string(),
            search_api_key: None,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            config_path: None,
            endpoints: Endpoints::default(),
            limits: Limits::default(),
            pacing: Pacing::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build settings from any key lookup. Blank credentials count as absent;
    /// unparsable numbers fall back to their defaults.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |k: &str| {
            get(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        let limits = Limits {
            max_hits: parse_count(non_blank(ENV_MAX_HITS)).unwrap_or(defaults.limits.max_hits),
            max_new_per_run: parse_count(non_blank(ENV_MAX_NEW_PER_RUN))
                .unwrap_or(defaults.limits.max_new_per_run),
            ..defaults.limits
        };

        Self {
            classifier_api_key: non_blank(ENV_MISTRAL_API_KEY),
            classifier_model: non_blank(ENV_MISTRAL_MODEL).unwrap_or(defaults.classifier_model),
            search_api_key: non_blank(ENV_NEWSAPI_KEY),
            relevance_threshold: parse_threshold(non_blank(ENV_RELEVANCE_THRESHOLD)),
            data_dir: non_blank(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            config_path: non_blank(ENV_CONFIG_PATH).map(PathBuf::from),
            endpoints: Endpoints {
                classifier_url: non_blank(ENV_MISTRAL_API_URL)
                    .unwrap_or(defaults.endpoints.classifier_url),
                search_url: non_blank(ENV_NEWSAPI_URL).unwrap_or(defaults.endpoints.search_url),
            },
            limits,
            pacing: defaults.pacing,
            timeouts: defaults.timeouts,
        }
    }

    pub fn hits_path(&self) -> PathBuf {
        self.data_dir.join("hits.json")
    }
}

fn parse_threshold(raw: Option<String>) -> u8 {
    raw.and_then(|s| s.parse::<i64>().ok())
        .map(|v| v.clamp(0, 100) as u8)
        .unwrap_or(DEFAULT_RELEVANCE_THRESHOLD)
}

fn parse_count(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.parse::<usize>().ok()).filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let s = Settings::from_lookup(lookup(&[]));
        assert!(s.classifier_api_key.is_none());
        assert!(s.search_api_key.is_none());
        assert_eq!(s.relevance_threshold, 60);
        assert_eq!(s.classifier_model, "mistral-small-latest");
        assert_eq!(s.limits, Limits::default());
        assert_eq!(s.hits_path(), PathBuf::from("data/hits.json"));
    }

    #[test]
    fn blank_credentials_are_absent() {
        let s = Settings::from_lookup(lookup(&[
            (ENV_MISTRAL_API_KEY, "   "),
            (ENV_NEWSAPI_KEY, "k-123"),
        ]));
        assert!(s.classifier_api_key.is_none());
        assert_eq!(s.search_api_key.as_deref(), Some("k-123"));
    }

    #[test]
    fn threshold_is_clamped_and_tolerant() {
        assert_eq!(parse_threshold(Some("75".into())), 75);
        assert_eq!(parse_threshold(Some("250".into())), 100);
        assert_eq!(parse_threshold(Some("-3".into())), 0);
        assert_eq!(parse_threshold(Some("high".into())), 60);
    }

    #[test]
    fn caps_can_be_overridden() {
        let s = Settings::from_lookup(lookup(&[
            (ENV_MAX_HITS, "50"),
            (ENV_MAX_NEW_PER_RUN, "0"),
        ]));
        assert_eq!(s.limits.max_hits, 50);
        assert_eq!(s.limits.max_new_per_run, 30);
    }
}
