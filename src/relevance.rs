// src/relevance.rs
//! Keyword pre-filter ahead of the (costly) classifier.
//!
//! Plain case-insensitive substring containment over `title + description`.
//! Deliberately permissive: short terms such as "esg" also hit inside longer
//! words, and the classifier or the threshold absorbs the noise.

use crate::ingest::types::RawArticle;

/// Base compliance vocabulary (Spanish). Extra terms come from the run config.
pub const BASE_KEYWORDS: &[&str] = &[
    "corrupción",
    "soborno",
    "cohecho",
    "comisión ilícita",
    "tráfico de influencias",
    "malversación",
    "prevaricación",
    "blanqueo",
    "lavado de dinero",
    "financiación del terrorismo",
    "multa",
    "sanción",
    "expediente sancionador",
    "infracción grave",
    "infracción muy grave",
    "resolución sancionadora",
    "compliance",
    "cumplimiento normativo",
    "programa de cumplimiento",
    "canal de denuncias",
    "whistleblowing",
    "due diligence",
    "diligencia debida",
    "protección de datos",
    "RGPD",
    "LOPD",
    "brecha de seguridad",
    "datos personales",
    "prácticas anticompetitivas",
    "cártel",
    "abuso de posición",
    "competencia desleal",
    "acoso laboral",
    "acoso sexual",
    "discriminación",
    "insider trading",
    "información privilegiada",
    "manipulación de mercado",
    "responsabilidad penal",
    "persona jurídica",
    "delito empresarial",
    "medioambiente",
    "ESG",
    "greenwashing",
    "vertido ilegal",
    "contratación pública",
    "licitación",
    "fraude",
    "falsedad documental",
    "administrador",
    "consejero",
    "directivo",
    "órgano de cumplimiento",
    "AEPD",
    "CNMC",
    "CNMV",
];

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    vocabulary: Vec<String>, // lower-cased, unique
}

impl RelevanceFilter {
    /// Base vocabulary ∪ `extra_keywords`.
    pub fn new(extra_keywords: &[String]) -> Self {
        Self::with_vocabulary(BASE_KEYWORDS, extra_keywords)
    }

    pub fn with_vocabulary(base: &[&str], extra_keywords: &[String]) -> Self {
        let mut vocabulary: Vec<String> = Vec::with_capacity(base.len() + extra_keywords.len());
        let terms = base
            .iter()
            .copied()
            .chain(extra_keywords.iter().map(String::as_str));
        for t in terms {
            let t = t.trim().to_lowercase();
            if !t.is_empty() && !vocabulary.contains(&t) {
                vocabulary.push(t);
            }
        }
        Self { vocabulary }
    }

    pub fn is_relevant(&self, article: &RawArticle) -> bool {
        self.first_match(article).is_some()
    }

    /// First vocabulary term contained in the article, if any.
    pub fn first_match(&self, article: &RawArticle) -> Option<&str> {
        let text = format!("{} {}", article.title, article.description).to_lowercase();
        self.vocabulary
            .iter()
            .find(|kw| text.contains(kw.as_str()))
            .map(String::as_str)
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }
}
