// src/catalog.rs
//! Static registry of the official feeds polled on every run.
//!
//! The catalog is built once at startup and handed to the pipeline by
//! reference. Enumeration order is part of the contract: it decides which copy
//! of a duplicated article survives within-run dedup.

use serde::Serialize;

/// One feed endpoint. `enabled` is only the default; the run config may flip it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceConfig {
    pub key: String,
    pub url: String,
    pub name: String,
    pub enabled: bool,
}

impl SourceConfig {
    pub fn new(key: &str, url: &str, name: &str, enabled: bool) -> Self {
        Self {
            key: key.to_string(),
            url: url.to_string(),
            name: name.to_string(),
            enabled,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    sources: Vec<SourceConfig>,
}

impl SourceCatalog {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self { sources }
    }

    /// BOE sections, BOE legislation channels and BORME.
    pub fn default_catalog() -> Self {
        let seed = [
            (
                "BOE_disposiciones",
                "https://www.boe.es/rss/boe.php?s=1",
                "BOE - Sección I (Disposiciones generales)",
            ),
            (
                "BOE_justicia",
                "https://www.boe.es/rss/boe.php?s=4",
                "BOE - Sección IV (Administración de Justicia)",
            ),
            (
                "BOE_anuncios",
                "https://www.boe.es/rss/boe.php?s=5B",
                "BOE - Sección V.B (Anuncios oficiales)",
            ),
            (
                "BOE_derecho_penal",
                "https://www.boe.es/rss/canal_leg.php?l=l&c=113",
                "BOE - Legislación Derecho Penal",
            ),
            (
                "BOE_derecho_mercantil",
                "https://www.boe.es/rss/canal_leg.php?l=l&c=112",
                "BOE - Legislación Derecho Mercantil",
            ),
            (
                "BOE_sistema_financiero",
                "https://www.boe.es/rss/canal_leg.php?l=l&c=127",
                "BOE - Legislación Sistema Financiero",
            ),
            (
                "BOE_tribunal_constitucional",
                "https://www.boe.es/rss/canal.php?c=tc",
                "BOE - Sentencias Tribunal Constitucional",
            ),
            (
                "BORME_general",
                "https://www.boe.es/rss/borme.php",
                "BORME - Registro Mercantil",
            ),
        ];

        Self::new(
            seed.iter()
                .map(|(key, url, name)| SourceConfig::new(key, url, name, true))
                .collect(),
        )
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn get(&self, key: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
