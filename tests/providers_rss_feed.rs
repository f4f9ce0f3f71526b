mod common;

use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;

use compliance_radar::config::{Limits, Timeouts};
use compliance_radar::ingest::build_http_client;
use compliance_radar::ingest::providers::rss_feed::parse_feed;
use compliance_radar::ingest::providers::RssFeedFetcher;
use compliance_radar::ingest::types::FeedSource;
use compliance_radar::StageError;

const BOE_XML: &str = include_str!("fixtures/boe_rss.xml");
const BORME_RDF: &str = include_str!("fixtures/borme_rdf.xml");
const BLOCKED_HTML: &str = include_str!("fixtures/blocked.html");

fn fetcher(feed_timeout: Duration) -> RssFeedFetcher {
    let timeouts = Timeouts {
        feed: feed_timeout,
        ..Timeouts::default()
    };
    RssFeedFetcher::new(
        build_http_client().expect("client"),
        &timeouts,
        &Limits::default(),
    )
}

async fn feed_server() -> String {
    let app = Router::new()
        .route(
            "/boe",
            get(|| async { ([(header::CONTENT_TYPE, "application/rss+xml")], BOE_XML) }),
        )
        .route(
            "/borme",
            get(|| async { ([(header::CONTENT_TYPE, "application/xml")], BORME_RDF) }),
        )
        // Some servers label real feeds as text/html.
        .route(
            "/mislabelled",
            get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], BOE_XML) }),
        )
        .route(
            "/blocked",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], BLOCKED_HTML) }),
        )
        .route(
            "/down",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "oops") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                ([(header::CONTENT_TYPE, "application/rss+xml")], BOE_XML)
            }),
        )
        .route(
            "/truncated",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/rss+xml")],
                    BOE_XML.split("</channel>").next().unwrap_or_default(),
                )
            }),
        );
    common::serve(app).await
}

#[tokio::test]
async fn boe_feed_yields_normalized_articles_in_order() {
    let base = feed_server().await;
    let arts = fetcher(Duration::from_secs(5))
        .fetch(&format!("{base}/boe"), "BOE - Disposiciones")
        .await
        .expect("feed ok");

    assert_eq!(arts.len(), 3);
    assert!(arts.iter().all(|a| a.source == "BOE - Disposiciones"));
    assert!(arts[0].title.starts_with("Resolución sancionadora de la CNMC"));
    assert_eq!(
        arts[0].description,
        "La Comisión Nacional de los Mercados y la Competencia impone una multa de 4,5 millones de euros."
    );
    assert_eq!(arts[0].date, "Mon, 02 Feb 2026 08:00:00 +0100");
    // No pubDate: the namespaced date is used.
    assert_eq!(arts[2].date, "2026-02-02T08:00:00+01:00");
    assert!(arts[2].description.contains("persona jurídica & el régimen"));
}

#[tokio::test]
async fn rdf_layout_is_read_too() {
    let base = feed_server().await;
    let arts = fetcher(Duration::from_secs(5))
        .fetch(&format!("{base}/borme"), "BORME")
        .await
        .expect("rdf ok");
    assert_eq!(arts.len(), 1);
    assert_eq!(arts[0].link, "https://www.boe.es/borme/dias/2026/02/02/1");
    assert_eq!(arts[0].date, "2026-02-02");
}

#[tokio::test]
async fn feed_labelled_as_html_is_still_accepted() {
    let base = feed_server().await;
    let arts = fetcher(Duration::from_secs(5))
        .fetch(&format!("{base}/mislabelled"), "BOE")
        .await
        .expect("sniffed as feed");
    assert_eq!(arts.len(), 3);
}

#[tokio::test]
async fn html_error_page_is_rejected() {
    let base = feed_server().await;
    let err = fetcher(Duration::from_secs(5))
        .fetch(&format!("{base}/blocked"), "BOE")
        .await
        .unwrap_err();
    assert!(matches!(err, StageError::DisguisedHtml { .. }), "got {err:?}");
}

#[tokio::test]
async fn server_error_status_is_reported() {
    let base = feed_server().await;
    let err = fetcher(Duration::from_secs(5))
        .fetch(&format!("{base}/down"), "BOE")
        .await
        .unwrap_err();
    assert!(matches!(err, StageError::Status(s) if s.as_u16() == 500), "got {err:?}");
}

#[tokio::test]
async fn slow_feed_times_out_as_transport_error() {
    let base = feed_server().await;
    let err = fetcher(Duration::from_millis(200))
        .fetch(&format!("{base}/slow"), "BOE")
        .await
        .unwrap_err();
    assert!(err.is_transport(), "got {err:?}");
}

#[tokio::test]
async fn truncated_document_is_a_format_error() {
    let base = feed_server().await;
    let err = fetcher(Duration::from_secs(5))
        .fetch(&format!("{base}/truncated"), "BOE")
        .await
        .unwrap_err();
    assert!(matches!(err, StageError::Format(_)), "got {err:?}");
}

#[test]
fn item_cap_keeps_document_order() {
    let items = parse_feed(BOE_XML, 2).expect("parse");
    assert_eq!(items.len(), 2);
    assert!(items[1].title.starts_with("Real Decreto"));
}
