// src/analyze/prompt.rs
use crate::ingest::types::RawArticle;

pub const SYSTEM_PROMPT: &str = r#"Eres un experto en compliance corporativo español (ISO 37301, UNE 19601, ISO 37001, RGPD, normativa CNMV/AEPD/CNMC).

Analiza el evento y responde SOLO con este JSON exacto (sin markdown):
{
  "relevance_score": <0-100>,
  "level": "<critical|warning|info|irrelevant>",
  "risks": ["<riesgo1>", "<riesgo2>"],
  "norms_affected": ["<norma1>"],
  "summary": "<resumen en 2-3 frases>",
  "vulnerability": "<control que debería existir>",
  "financial_impact": "<estimación impacto económico en empresa española>",
  "recommended_action": "<acción inmediata para el Compliance Officer>"
}

Niveles: critical=multa>500K€/condena penal | warning=multa 50-500K€/expediente | info=guía/jurisprudencia moderada | irrelevant=no relacionado"#;

/// User turn: the article fields the classifier sees.
pub fn user_message(article: &RawArticle) -> String {
    format!(
        "Título: {}\nFuente: {}\nFecha: {}\n\nDescripción: {}\n\nEnlace: {}",
        article.title, article.source, article.date, article.description, article.link
    )
}
