use std::fs;

use serial_test::serial;

use compliance_radar::config::{resolve, Settings};
use compliance_radar::SourceCatalog;

#[test]
fn json_override_in_data_dir_is_merged() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("config.json"),
        r#"{
            "queries": ["compliance penal", {"query": "AEPD sanción", "label": "NewsAPI-Datos"}],
            "extra_keywords": [" soborno transnacional ", "", "soborno transnacional"],
            "sources": {"BORME_general": false, "no_such_feed": true}
        }"#,
    )
    .unwrap();
    let catalog = SourceCatalog::default_catalog();
    let cfg = resolve(&catalog, dir.path(), None);

    assert_eq!(cfg.queries.len(), 2);
    assert_eq!(cfg.queries[0].label, "NewsAPI");
    assert_eq!(cfg.queries[1].label, "NewsAPI-Datos");
    assert_eq!(cfg.extra_keywords, vec!["soborno transnacional"]);
    assert!(!cfg.is_enabled("BORME_general"));
    assert!(cfg.is_enabled("BOE_disposiciones"));
    assert!(!cfg.sources_enabled.contains_key("no_such_feed"));
    assert_eq!(cfg.news_source_filter(), None);
}

#[test]
fn explicit_toml_override_wins_over_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.json"), r#"{"news_sources": "ignored"}"#).unwrap();
    let explicit = dir.path().join("radar.toml");
    fs::write(
        &explicit,
        "news_sources = \"el-pais,expansion\"\n\n[sources]\nBOE_disposiciones = false\n",
    )
    .unwrap();

    let catalog = SourceCatalog::default_catalog();
    let cfg = resolve(&catalog, dir.path(), Some(&explicit));
    assert_eq!(cfg.news_source_filter(), Some("el-pais,expansion"));
    assert!(!cfg.is_enabled("BOE_disposiciones"));
    assert_eq!(cfg.queries.len(), 2, "default queries kept");
}

#[test]
fn broken_override_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.json"), "{ not json").unwrap();
    let catalog = SourceCatalog::default_catalog();
    let cfg = resolve(&catalog, dir.path(), None);
    assert_eq!(cfg.sources_enabled.len(), catalog.len());
    assert!(cfg.sources_enabled.values().all(|e| *e));
    assert!(cfg.extra_keywords.is_empty());
}

#[test]
fn missing_explicit_path_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = SourceCatalog::default_catalog();
    let cfg = resolve(&catalog, dir.path(), Some(&dir.path().join("nope.json")));
    assert_eq!(cfg.queries.len(), 2);
}

const VARS: [&str; 6] = [
    "MISTRAL_API_KEY",
    "NEWSAPI_KEY",
    "RELEVANCE_THRESHOLD",
    "CDT_DATA_DIR",
    "CDT_MAX_HITS",
    "CDT_CONFIG_PATH",
];

fn clear_env() {
    for v in VARS {
        std::env::remove_var(v);
    }
}

#[test]
#[serial]
fn settings_read_from_process_env() {
    clear_env();
    std::env::set_var("MISTRAL_API_KEY", "  sk-test ");
    std::env::set_var("NEWSAPI_KEY", "   ");
    std::env::set_var("RELEVANCE_THRESHOLD", "75");
    std::env::set_var("CDT_DATA_DIR", "/tmp/radar");
    std::env::set_var("CDT_MAX_HITS", "50");

    let s = Settings::from_env();
    clear_env();

    assert_eq!(s.classifier_api_key.as_deref(), Some("sk-test"));
    assert_eq!(s.search_api_key, None, "blank key means absent");
    assert_eq!(s.relevance_threshold, 75);
    assert_eq!(s.hits_path(), std::path::Path::new("/tmp/radar/hits.json"));
    assert_eq!(s.limits.max_hits, 50);
    assert_eq!(s.limits.max_new_per_run, 30);
}

#[test]
#[serial]
fn unset_env_gives_defaults() {
    clear_env();
    let s = Settings::from_env();
    assert_eq!(s.classifier_api_key, None);
    assert_eq!(s.relevance_threshold, 60);
    assert_eq!(s.classifier_model, "mistral-small-latest");
    assert_eq!(s.hits_path(), std::path::Path::new("data/hits.json"));
    assert_eq!(s.config_path, None);
}
