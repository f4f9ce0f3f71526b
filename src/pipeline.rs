// src/pipeline.rs
//! # Run orchestration
//! fetch → normalize → filter → dedup → classify → persist, strictly in
//! sequence.
//!
//! Enumeration order is catalog order, then query order; within-run dedup keeps
//! the first copy it sees. Per-source and per-article failures are logged and
//! skipped. Only a failed history write fails the run.

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, gauge};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analyze::{Classifier, Level, MistralClassifier};
use crate::catalog::SourceCatalog;
use crate::config::{Limits, Pacing, RunConfig, Settings};
use crate::history::{Hit, HitStore, RunStats};
use crate::ingest::dedup::Deduplicator;
use crate::ingest::providers::{NewsApiSearch, RssFeedFetcher};
use crate::ingest::types::{FeedSource, IdentifiedArticle, NewsSearch, RawArticle};
use crate::ingest::{build_http_client, ensure_metrics_described, filter_dedup};
use crate::relevance::RelevanceFilter;

/// Counters for one run, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub relevant: usize,
    pub duplicates: usize,
    pub new_articles: usize,
    pub classified: usize,
    pub rejected_irrelevant: usize,
    pub rejected_low_score: usize,
    pub rejected_unavailable: usize,
    pub hits_added: usize,
    pub source_errors: usize,
    pub stats: RunStats,
}

/// What happened to one classified article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Accepted,
    Irrelevant,
    LowScore,
    Unavailable,
}

pub struct Pipeline {
    catalog: SourceCatalog,
    config: RunConfig,
    threshold: u8,
    limits: Limits,
    pacing: Pacing,
    feeds: Box<dyn FeedSource>,
    search: Option<Box<dyn NewsSearch>>,
    classifier: Option<Box<dyn Classifier>>,
    store: HitStore,
}

impl Pipeline {
    /// Pipeline without search and without classifier; add them with the
    /// `with_*` builders.
    pub fn new(
        catalog: SourceCatalog,
        config: RunConfig,
        settings: &Settings,
        feeds: Box<dyn FeedSource>,
        store: HitStore,
    ) -> Self {
        Self {
            catalog,
            config,
            threshold: settings.relevance_threshold,
            limits: settings.limits,
            pacing: settings.pacing,
            feeds,
            search: None,
            classifier: None,
            store,
        }
    }

    pub fn with_search(mut self, search: Box<dyn NewsSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Production wiring. Search and classification are enabled only when
    /// their credentials are present.
    pub fn from_settings(
        settings: &Settings,
        catalog: SourceCatalog,
        config: RunConfig,
    ) -> Result<Self> {
        let http = build_http_client().context("building HTTP client")?;
        let feeds = RssFeedFetcher::new(http.clone(), &settings.timeouts, &settings.limits);
        let store = HitStore::new(settings.hits_path(), settings.limits.max_hits);
        let mut p = Self::new(catalog, config, settings, Box::new(feeds), store);

        if settings.search_api_key.is_some() {
            p = p.with_search(Box::new(NewsApiSearch::new(
                http.clone(),
                &settings.endpoints.search_url,
                settings.search_api_key.clone(),
                &settings.timeouts,
                &settings.limits,
            )));
        } else {
            info!(target: "ingest", "NEWSAPI_KEY not set, news search disabled");
        }

        match MistralClassifier::from_settings(http, settings) {
            Some(c) => p = p.with_classifier(Box::new(c)),
            None => info!(target: "classify", "MISTRAL_API_KEY not set, hits are stored unclassified"),
        }
        Ok(p)
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunReport> {
        ensure_metrics_described();
        let mut report = RunReport::default();

        let mut history = self.store.load();
        let mut dedup = Deduplicator::new(history.existing_ids());
        info!(target: "ingest", stored = history.entries.len(), "history loaded");

        let mut pool = self.fetch_feeds(&mut report).await;
        pool.extend(self.fetch_search(&mut report).await);
        report.fetched = pool.len();

        let filter = RelevanceFilter::new(&self.config.extra_keywords);
        let (fresh, filtered_out, duplicates) = filter_dedup(pool, &filter, &mut dedup);
        report.relevant = report.fetched - filtered_out;
        report.duplicates = duplicates;
        report.new_articles = fresh.len();
        info!(
            target: "ingest",
            fetched = report.fetched,
            relevant = report.relevant,
            new = report.new_articles,
            "pool filtered"
        );

        let batch: Vec<IdentifiedArticle> =
            fresh.into_iter().take(self.limits.max_new_per_run).collect();

        let (new_hits, articles_checked) = match self.classifier.as_deref() {
            Some(classifier) => {
                let hits = self.classify_batch(classifier, &batch, &mut report).await;
                let checked = if report.classified > 0 {
                    report.classified
                } else {
                    report.new_articles
                };
                (hits, checked)
            }
            None => {
                let now = Utc::now();
                let hits: Vec<Hit> = batch
                    .iter()
                    .map(|a| Hit::unclassified(a, now, self.limits.fallback_summary_chars))
                    .collect();
                (hits, report.new_articles)
            }
        };

        report.hits_added = new_hits.len();
        history.absorb(new_hits, self.limits.max_hits, articles_checked);
        self.store
            .save(&mut history, Utc::now())
            .context("persisting hit history")?;
        report.stats = history.stats.clone();

        counter!("hits_persisted_total").increment(report.hits_added as u64);
        gauge!("pipeline_last_run_ts").set(Utc::now().timestamp() as f64);
        info!(
            new = report.stats.new_this_run,
            total = report.stats.total_hits,
            critical = report.stats.critical_count,
            warning = report.stats.warning_count,
            info_count = report.stats.info_count,
            "run complete"
        );
        Ok(report)
    }

    async fn fetch_feeds(&self, report: &mut RunReport) -> Vec<RawArticle> {
        let mut pool = Vec::new();
        let enabled = self
            .catalog
            .sources()
            .iter()
            .filter(|s| self.config.is_enabled(&s.key));

        for (i, src) in enabled.enumerate() {
            if i > 0 {
                pause(self.pacing.between_feeds).await;
            }
            match self.feeds.fetch(&src.url, &src.name).await {
                Ok(items) => {
                    info!(target: "ingest", source = %src.name, articles = items.len(), "feed fetched");
                    pool.extend(items);
                }
                Err(e) => {
                    warn!(target: "ingest", source = %src.name, transport = e.is_transport(), error = %e, "feed skipped");
                    report.source_errors += 1;
                    counter!("ingest_source_errors_total").increment(1);
                }
            }
        }
        pool
    }

    async fn fetch_search(&self, report: &mut RunReport) -> Vec<RawArticle> {
        let Some(search) = self.search.as_deref() else {
            return Vec::new();
        };
        let mut pool = Vec::new();
        let allow_list = self.config.news_source_filter();

        for (i, q) in self.config.queries.iter().enumerate() {
            if i > 0 {
                pause(self.pacing.between_queries).await;
            }
            match search.search(&q.query, allow_list, &q.label).await {
                Ok(items) => {
                    info!(target: "ingest", source = %q.label, articles = items.len(), "search fetched");
                    pool.extend(items);
                }
                Err(e) => {
                    warn!(target: "ingest", source = %q.label, transport = e.is_transport(), error = %e, "search skipped");
                    report.source_errors += 1;
                    counter!("ingest_source_errors_total").increment(1);
                }
            }
        }
        pool
    }

    async fn classify_batch(
        &self,
        classifier: &dyn Classifier,
        batch: &[IdentifiedArticle],
        report: &mut RunReport,
    ) -> Vec<Hit> {
        let mut hits = Vec::new();
        info!(target: "classify", articles = batch.len(), provider = classifier.name(), "classifying");

        for (i, art) in batch.iter().enumerate() {
            if i > 0 {
                pause(self.pacing.after_classification).await;
            }
            debug!(target: "classify", id = %art.id, title = %art.title, "classify");
            let outcome = classifier.classify(art).await;
            report.classified += 1;

            let verdict = match outcome {
                Err(e) => {
                    warn!(target: "classify", id = %art.id, error = %e, "classification unavailable, discarded");
                    Verdict::Unavailable
                }
                Ok(a) if a.level == Level::Irrelevant => Verdict::Irrelevant,
                Ok(a) if a.relevance_score < self.threshold => {
                    debug!(target: "classify", id = %art.id, score = a.relevance_score, threshold = self.threshold, "below threshold");
                    Verdict::LowScore
                }
                Ok(a) => {
                    info!(target: "classify", id = %art.id, level = %a.level, score = a.relevance_score, "hit");
                    hits.push(Hit::classified(art, a, Utc::now()));
                    Verdict::Accepted
                }
            };

            match verdict {
                Verdict::Accepted => {}
                Verdict::Irrelevant => report.rejected_irrelevant += 1,
                Verdict::LowScore => report.rejected_low_score += 1,
                Verdict::Unavailable => report.rejected_unavailable += 1,
            }
            if verdict != Verdict::Accepted {
                counter!("classify_rejected_total").increment(1);
            }
        }
        hits
    }
}

async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}
