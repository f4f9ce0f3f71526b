// src/ingest/providers/rss_feed.rs
//! Official-journal feeds (BOE/BORME). RSS 2.0 and RSS 1.0 (RDF) layouts are
//! both handled by collecting `item` elements at any depth.

use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

use crate::config::{Limits, Timeouts};
use crate::error::StageError;
use crate::ingest::normalize::{strip_markup, truncate_chars};
use crate::ingest::types::{FeedSource, RawArticle};

pub const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml, */*";

/// Bytes inspected when deciding whether an HTML response is really a feed.
const SNIFF_LEN: usize = 200;
const FEED_ROOTS: [&[u8]; 3] = [b"<rss", b"<rdf:RDF", b"<feed"];

/// One `<item>` as read from the document, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: Option<String>,
    /// Namespaced date (`dc:date`), used when `pubDate` is absent.
    pub dc_date: Option<String>,
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
    DcDate,
}

impl Field {
    /// Text fields are read only from unprefixed elements so that
    /// `media:title` or `dc:description` do not add to them; dates are
    /// matched by local name (`dc:date`).
    fn from_name(name: QName<'_>) -> Option<Self> {
        let unprefixed = name.prefix().is_none();
        match name.local_name().as_ref() {
            b"title" if unprefixed => Some(Field::Title),
            b"link" if unprefixed => Some(Field::Link),
            b"description" if unprefixed => Some(Field::Description),
            b"pubDate" => Some(Field::PubDate),
            b"date" => Some(Field::DcDate),
            _ => None,
        }
    }
}

impl FeedItem {
    fn push(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::PubDate => self.pub_date.get_or_insert_with(String::new),
            Field::DcDate => self.dc_date.get_or_insert_with(String::new),
        };
        slot.push_str(text);
    }
}

/// Parse a feed document into its items, in document order.
///
/// The whole document is read so that a truncated or mismatched body is
/// rejected as a unit; only the first `max_items` items are returned.
pub fn parse_feed(xml: &str, max_items: usize) -> Result<Vec<FeedItem>, StageError> {
    let xml = scrub_html_entities_for_xml(xml);
    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut field: Option<Field> = None;
    let mut item_depth = 0usize;
    let mut open = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event().map_err(StageError::format)? {
            Event::Start(e) => {
                saw_root = true;
                open += 1;
                if current.is_none() {
                    if e.local_name().as_ref() == b"item" {
                        current = Some(FeedItem::default());
                        item_depth = 1;
                    }
                } else {
                    item_depth += 1;
                    if item_depth == 2 {
                        field = Field::from_name(e.name());
                    }
                }
            }
            Event::End(_) => {
                open = open.saturating_sub(1);
                if current.is_some() {
                    if item_depth == 2 {
                        field = None;
                    }
                    item_depth -= 1;
                    if item_depth == 0 {
                        if let Some(it) = current.take() {
                            items.push(it);
                        }
                    }
                }
            }
            Event::Empty(_) => saw_root = true,
            Event::Text(t) => {
                if let (Some(it), Some(f)) = (current.as_mut(), field) {
                    let text = match t.unescape() {
                        Ok(s) => s.into_owned(),
                        Err(_) => String::from_utf8_lossy(&t).into_owned(),
                    };
                    it.push(f, &text);
                }
            }
            Event::CData(c) => {
                if let (Some(it), Some(f)) = (current.as_mut(), field) {
                    it.push(f, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(StageError::Format("document has no root element".into()));
    }
    if open != 0 {
        return Err(StageError::Format("document ended inside an element".into()));
    }

    items.truncate(max_items);
    Ok(items)
}

/// Turn parsed items into articles: skip untitled items, clean and cap the
/// description, fall back to the fetch time when no date is given.
pub fn items_to_articles(
    items: Vec<FeedItem>,
    label: &str,
    max_description_chars: usize,
) -> Vec<RawArticle> {
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let title = it.title.trim().to_string();
        if title.is_empty() {
            continue;
        }
        let description = truncate_chars(&strip_markup(&it.description), max_description_chars);
        let date = it
            .pub_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .or_else(|| it.dc_date.as_deref().map(str::trim).filter(|d| !d.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

        out.push(RawArticle {
            title,
            link: it.link.trim().to_string(),
            description,
            date,
            source: label.to_string(),
        });
    }
    out
}

/// An HTML error page served where a feed was expected.
pub fn looks_like_html(content_type: &str, body: &[u8]) -> bool {
    if !content_type.to_ascii_lowercase().contains("html") {
        return false;
    }
    let head = &body[..body.len().min(SNIFF_LEN)];
    !FEED_ROOTS
        .iter()
        .any(|root| head.windows(root.len()).any(|w| w == *root))
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&euro;", "€")
}

pub struct RssFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_items: usize,
    max_description_chars: usize,
}

impl RssFeedFetcher {
    pub fn new(client: reqwest::Client, timeouts: &Timeouts, limits: &Limits) -> Self {
        Self {
            client,
            timeout: timeouts.feed,
            max_items: limits.max_items_per_feed,
            max_description_chars: limits.max_description_chars,
        }
    }
}

#[async_trait]
impl FeedSource for RssFeedFetcher {
    async fn fetch(&self, endpoint: &str, label: &str) -> Result<Vec<RawArticle>, StageError> {
        let resp = self
            .client
            .get(endpoint)
            .header(ACCEPT, FEED_ACCEPT)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StageError::Status(status));
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.bytes().await?;

        if looks_like_html(&content_type, &body) {
            return Err(StageError::DisguisedHtml { content_type });
        }

        let t0 = std::time::Instant::now();
        let items = parse_feed(&String::from_utf8_lossy(&body), self.max_items)?;
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let out = items_to_articles(items, label, self.max_description_chars);
        tracing::debug!(target: "ingest", source = label, items = out.len(), "feed parsed");
        counter!("ingest_articles_total").increment(out.len() as u64);
        Ok(out)
    }
}
