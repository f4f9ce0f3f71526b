// Shared helpers for integration tests: a local HTTP server and scripted
// doubles for the three outbound seams.
#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use axum::Router;

use compliance_radar::analyze::{AnalysisResult, Classifier, Level};
use compliance_radar::ingest::types::{FeedSource, IdentifiedArticle, NewsSearch, RawArticle};
use compliance_radar::StageError;

/// Serve `app` on an ephemeral local port; returns the base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{addr}")
}

pub fn article(title: &str, link: &str, source: &str) -> RawArticle {
    RawArticle {
        title: title.to_string(),
        link: link.to_string(),
        description: format!("{title}. Texto completo de la noticia."),
        date: "2026-02-02T08:00:00+01:00".to_string(),
        source: source.to_string(),
    }
}

/// Feed double keyed by endpoint; unknown endpoints fail with HTTP 503.
#[derive(Default)]
pub struct ScriptedFeeds {
    pub by_endpoint: HashMap<String, Vec<RawArticle>>,
}

impl ScriptedFeeds {
    pub fn with(mut self, endpoint: &str, items: Vec<RawArticle>) -> Self {
        self.by_endpoint.insert(endpoint.to_string(), items);
        self
    }
}

#[async_trait]
impl FeedSource for ScriptedFeeds {
    async fn fetch(&self, endpoint: &str, _label: &str) -> Result<Vec<RawArticle>, StageError> {
        self.by_endpoint
            .get(endpoint)
            .cloned()
            .ok_or(StageError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
    }
}

/// Search double returning the same results for every query.
#[derive(Default)]
pub struct ScriptedSearch {
    pub results: Vec<RawArticle>,
}

#[async_trait]
impl NewsSearch for ScriptedSearch {
    async fn search(
        &self,
        _query: &str,
        _allow_list: Option<&str>,
        _label: &str,
    ) -> Result<Vec<RawArticle>, StageError> {
        Ok(self.results.clone())
    }
}

/// Classifier double: verdict picked by a title substring; anything not
/// listed is reported as unavailable.
#[derive(Default)]
pub struct ScriptedClassifier {
    pub verdicts: Vec<(&'static str, Level, u8)>,
}

impl ScriptedClassifier {
    pub fn verdict(mut self, title_part: &'static str, level: Level, score: u8) -> Self {
        self.verdicts.push((title_part, level, score));
        self
    }
}

pub fn analysis(level: Level, score: u8) -> AnalysisResult {
    AnalysisResult {
        relevance_score: score,
        level,
        risks: vec!["sanción administrativa".to_string()],
        norms_affected: vec!["RGPD".to_string()],
        summary: "Resumen del riesgo.".to_string(),
        vulnerability: "Tratamiento de datos".to_string(),
        financial_impact: "Hasta 20M€".to_string(),
        recommended_action: "Revisar protocolos".to_string(),
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, article: &IdentifiedArticle) -> Result<AnalysisResult, StageError> {
        self.verdicts
            .iter()
            .find(|(part, _, _)| article.title.contains(part))
            .map(|(_, level, score)| analysis(*level, *score))
            .ok_or_else(|| StageError::Format("no scripted verdict".into()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
