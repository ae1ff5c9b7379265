use std::collections::HashMap;

use sift_core::config::*;
use sift_core::errors::ConfigError;
use sift_core::models::BackendKind;

#[test]
fn config_loads_from_empty_toml_with_all_defaults() {
    let config = SiftConfig::from_toml("").unwrap();

    // Storage defaults
    assert_eq!(config.storage.db_path, "sift.db");
    assert_eq!(config.storage.read_pool_size, 4);

    // Embedding defaults
    assert_eq!(config.embedding.active_backend, "openai");
    assert_eq!(config.embedding.openai.dimensions, 1536);
    assert!(config.embedding.openai.api_key.is_none());
    assert_eq!(config.embedding.gemini.window_secs, 60);
    assert_eq!(config.embedding.local.precision, "f32");

    // Pipeline defaults
    assert_eq!(config.pipeline.concurrency, 128);
    assert_eq!(config.pipeline.batch_size, 16);
    assert!(!config.pipeline.rebuild_all);
    assert!(config.pipeline.breaker_threshold.is_none());

    // Retrieval defaults
    assert_eq!(config.retrieval.rrf_k, 60);
    assert_eq!(config.retrieval.hybrid_alpha, 2.0);
    assert!(config.retrieval.rerank_endpoint.is_none());

    // Observability defaults
    assert_eq!(config.observability.log_level, "info");
    assert!(config.validate().is_ok());
}

#[test]
fn config_loads_partial_toml_with_overrides() {
    let toml = r#"
[embedding]
active_backend = "gemini"

[embedding.gemini]
max_rpm = 3

[pipeline]
concurrency = 8
"#;
    let config = SiftConfig::from_toml(toml).unwrap();
    assert_eq!(config.active_backend().unwrap(), BackendKind::Gemini);
    assert_eq!(config.embedding.gemini.max_rpm, 3);
    // Non-overridden fields keep defaults
    assert_eq!(config.embedding.gemini.max_tpm, 30_000);
    assert_eq!(config.pipeline.concurrency, 8);
    assert_eq!(config.pipeline.batch_size, 16);
}

#[test]
fn config_roundtrips_through_toml() {
    let mut config = SiftConfig::default();
    config.retrieval.rerank_endpoint = Some("http://localhost:9000/rerank".to_string());
    let text = config.to_toml().unwrap();
    let back = SiftConfig::from_toml(&text).unwrap();
    assert_eq!(back.retrieval.rerank_endpoint, config.retrieval.rerank_endpoint);
    assert_eq!(back.pipeline.concurrency, config.pipeline.concurrency);
}

#[test]
fn env_overrides_apply() {
    let env: HashMap<&str, &str> = [
        ("SIFT_BACKEND", "Local"),
        ("SIFT_CONCURRENCY", "256"),
        ("SIFT_BATCH_SIZE", "not-a-number"),
        ("SIFT_REBUILD_ALL", "true"),
        ("OPENAI_API_KEY", "sk-test"),
        ("SIFT_GEMINI_MAX_RPM", "3"),
    ]
    .into_iter()
    .collect();
    let mut config = SiftConfig::default();
    config.apply_env_with(|k| env.get(k).map(|v| v.to_string()));

    assert_eq!(config.active_backend().unwrap(), BackendKind::Local);
    assert_eq!(config.pipeline.concurrency, 256);
    // Unparseable values are ignored.
    assert_eq!(config.pipeline.batch_size, 16);
    assert!(config.pipeline.rebuild_all);
    assert_eq!(config.embedding.openai.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.embedding.gemini.max_rpm, 3);
}

#[test]
fn validation_rejects_unknown_backend_and_zero_sizes() {
    let mut config = SiftConfig::default();
    config.embedding.active_backend = "carrier-pigeon".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

    let mut config = SiftConfig::default();
    config.pipeline.batch_size = 0;
    match config.validate() {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "pipeline.batch_size"),
        other => panic!("expected invalid batch size, got {other:?}"),
    }

    let mut config = SiftConfig::default();
    config.embedding.local.precision = "f8".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn malformed_toml_is_a_parse_error() {
    assert!(matches!(
        SiftConfig::from_toml("[pipeline\nconcurrency = "),
        Err(ConfigError::Parse { .. })
    ));
}
