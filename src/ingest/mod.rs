// src/ingest/mod.rs
pub mod dedup;
pub mod normalize;
pub mod providers;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

use crate::config::settings::USER_AGENT;
use crate::ingest::dedup::Deduplicator;
use crate::ingest::types::{IdentifiedArticle, RawArticle};
use crate::relevance::RelevanceFilter;

/// One-time metrics registration.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_articles_total", "Articles parsed from feeds and search.");
        describe_counter!(
            "ingest_source_errors_total",
            "Feed or search calls that yielded nothing because of an error."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Articles dropped by the keyword pre-filter."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Articles dropped as already stored or already seen this run."
        );
        describe_counter!("classify_calls_total", "Classification attempts.");
        describe_counter!(
            "classify_rejected_total",
            "Classified articles discarded (absent, irrelevant or low score)."
        );
        describe_counter!("hits_persisted_total", "New hits written to history.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Shared HTTP client for all outbound calls. Timeouts are set per request.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
}

/// Keyword filter, then identity + dedup, in pool order.
/// Returns (new articles, filtered-out count, duplicate count).
pub fn filter_dedup(
    pool: Vec<RawArticle>,
    filter: &RelevanceFilter,
    dedup: &mut Deduplicator,
) -> (Vec<IdentifiedArticle>, usize, usize) {
    let mut filtered_out = 0usize;
    let mut duplicates = 0usize;
    let mut fresh = Vec::new();

    for art in pool {
        if !filter.is_relevant(&art) {
            filtered_out += 1;
            continue;
        }
        let art = IdentifiedArticle::new(art);
        if !dedup.admit(&art.id) {
            duplicates += 1;
            continue;
        }
        fresh.push(art);
    }

    counter!("ingest_filtered_total").increment(filtered_out as u64);
    counter!("ingest_dedup_total").increment(duplicates as u64);
    (fresh, filtered_out, duplicates)
}
