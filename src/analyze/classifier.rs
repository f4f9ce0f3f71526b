// src/analyze/classifier.rs
//! LLM classification: request, response validation, and the provider trait.
//!
//! One attempt per article, no retries. Every failure comes back as a
//! `StageError`; the pipeline discards the article and moves on.

use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analyze::prompt::{user_message, SYSTEM_PROMPT};
use crate::config::{Settings, Timeouts};
use crate::error::StageError;
use crate::ingest::types::IdentifiedArticle;

pub const TEMPERATURE: f32 = 0.1;
pub const MAX_TOKENS: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Critical,
    Warning,
    Info,
    Irrelevant,
}

impl Level {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Level::Critical),
            "warning" => Some(Level::Warning),
            "info" => Some(Level::Info),
            "irrelevant" => Some(Level::Irrelevant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Critical => "critical",
            Level::Warning => "warning",
            Level::Info => "info",
            Level::Irrelevant => "irrelevant",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated classifier output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub relevance_score: u8,
    pub level: Level,
    pub risks: Vec<String>,
    pub norms_affected: Vec<String>,
    pub summary: String,
    pub vulnerability: String,
    pub financial_impact: String,
    pub recommended_action: String,
}

/// Response as the model wrote it; nothing is trusted yet.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnalysis {
    relevance_score: Option<serde_json::Value>,
    level: Option<String>,
    risks: serde_json::Value,
    norms_affected: serde_json::Value,
    summary: Option<String>,
    vulnerability: Option<String>,
    financial_impact: Option<String>,
    recommended_action: Option<String>,
}

static RE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("fence regex")
});

/// Parse and validate the model's message content.
pub fn parse_analysis(content: &str) -> Result<AnalysisResult, StageError> {
    let body = match RE_FENCE.captures(content) {
        Some(c) => c.get(1).map_or(content, |m| m.as_str()),
        None => content,
    };
    let raw: RawAnalysis = serde_json::from_str(body.trim())?;
    validate(raw)
}

fn validate(raw: RawAnalysis) -> Result<AnalysisResult, StageError> {
    let score = raw
        .relevance_score
        .as_ref()
        .and_then(score_from_value)
        .ok_or_else(|| StageError::Validation("relevance_score missing or not a number".into()))?;

    let level = raw
        .level
        .as_deref()
        .ok_or_else(|| StageError::Validation("level missing".into()))
        .and_then(|l| {
            Level::parse(l).ok_or_else(|| StageError::Validation(format!("unknown level {l:?}")))
        })?;

    Ok(AnalysisResult {
        relevance_score: score,
        level,
        risks: string_list(raw.risks),
        norms_affected: string_list(raw.norms_affected),
        summary: raw.summary.unwrap_or_default(),
        vulnerability: raw.vulnerability.unwrap_or_default(),
        financial_impact: raw.financial_impact.unwrap_or_default(),
        recommended_action: raw.recommended_action.unwrap_or_default(),
    })
}

/// Score as a number or numeric string, rounded and clamped to 0..=100.
pub(crate) fn score_from_value(v: &serde_json::Value) -> Option<u8> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
    .map(|f| f.round().clamp(0.0, 100.0) as u8)
}

/// Lists sometimes come back as a single string; accept both shapes.
fn string_list(v: serde_json::Value) -> Vec<String> {
    match v {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|i| match i {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        serde_json::Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, article: &IdentifiedArticle) -> Result<AnalysisResult, StageError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Mistral chat-completions client in JSON mode.
pub struct MistralClassifier {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl MistralClassifier {
    pub fn new(
        http: reqwest::Client,
        endpoint: &str,
        api_key: &str,
        model: &str,
        timeouts: &Timeouts,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout: timeouts.classifier,
        }
    }

    /// `None` when no credential is configured.
    pub fn from_settings(http: reqwest::Client, settings: &Settings) -> Option<Self> {
        let key = settings.classifier_api_key.as_deref()?;
        Some(Self::new(
            http,
            &settings.endpoints.classifier_url,
            key,
            &settings.classifier_model,
            &settings.timeouts,
        ))
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Classifier for MistralClassifier {
    async fn classify(&self, article: &IdentifiedArticle) -> Result<AnalysisResult, StageError> {
        counter!("classify_calls_total").increment(1);

        let user = user_message(article);
        let req = ChatRequest {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .timeout(self.timeout)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StageError::Status(status));
        }
        let body = resp.bytes().await?;
        let decoded: ChatResponse = serde_json::from_slice(&body)?;
        let content = decoded
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| StageError::Format("response has no message content".into()))?;

        parse_analysis(&content)
    }

    fn name(&self) -> &'static str {
        "mistral"
    }
}
