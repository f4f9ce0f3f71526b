// src/ingest/providers/mod.rs
pub mod news_search;
pub mod rss_feed;

pub use news_search::NewsApiSearch;
pub use rss_feed::RssFeedFetcher;
