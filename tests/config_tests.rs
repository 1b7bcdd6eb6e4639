//! Configuration module unit tests

use std::env;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;
use vertex_failover::config::settings::parse_region_list;
use vertex_failover::config::{ClientFile, Settings, DEFAULT_MODEL, DEFAULT_REGIONS};

/// Settings tests share process environment
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: [&str; 11] = [
    "GCP_PROJECT",
    "GCP_ACCESS_TOKEN",
    "VERTEX_MODEL",
    "VERTEX_BASE_URL",
    "VERTEX_REGIONS",
    "REQUEST_TIMEOUT",
    "RETRY_MAX_ATTEMPTS",
    "RETRY_BASE_DELAY_MS",
    "RETRY_MAX_DELAY_MS",
    "RUST_LOG",
    "LOG_FORMAT",
];

/// Setup test environment variables
fn setup_test_env() {
    env::set_var("GCP_PROJECT", "review-insights");
    env::set_var("GCP_ACCESS_TOKEN", "ya29.test-token");
    env::set_var("VERTEX_MODEL", "gemini-1.5-pro-002");
    env::set_var("VERTEX_REGIONS", "europe-west2, us-east5");
    env::set_var("REQUEST_TIMEOUT", "30");
    env::set_var("RETRY_MAX_ATTEMPTS", "5");
    env::set_var("RETRY_BASE_DELAY_MS", "100");
    env::set_var("RETRY_MAX_DELAY_MS", "1000");
    env::set_var("RUST_LOG", "debug");
    env::set_var("LOG_FORMAT", "json");
}

/// Clean up test environment variables
fn cleanup_test_env() {
    for var in &VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_settings_creation_with_valid_env() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    setup_test_env();

    let settings = Settings::new().unwrap();
    assert_eq!(settings.vertex.project_id.as_deref(), Some("review-insights"));
    assert_eq!(settings.vertex.access_token.as_deref(), Some("ya29.test-token"));
    assert_eq!(settings.vertex.model, "gemini-1.5-pro-002");
    assert_eq!(settings.vertex.regions, vec!["europe-west2", "us-east5"]);
    assert_eq!(settings.vertex.timeout, 30);
    assert_eq!(settings.logging.level, "debug");
    assert_eq!(settings.logging.format, "json");

    let policy = settings.retry_policy();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.base_delay, Duration::from_millis(100));
    assert_eq!(policy.max_delay, Duration::from_millis(1000));

    cleanup_test_env();
}

#[test]
fn test_settings_defaults_without_env() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_test_env();

    let settings = Settings::new().unwrap();
    assert!(settings.vertex.project_id.is_none());
    assert_eq!(settings.vertex.model, DEFAULT_MODEL);
    assert_eq!(settings.vertex.regions.len(), DEFAULT_REGIONS.len());
    assert_eq!(settings.vertex.regions[0], DEFAULT_REGIONS[0]);
    assert_eq!(settings.vertex.timeout, 60);
    assert_eq!(settings.retry.max_attempts, 3);
}

#[test]
fn test_settings_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let cases = [
        ("REQUEST_TIMEOUT", "soon"),
        ("REQUEST_TIMEOUT", "0"),
        ("RETRY_MAX_ATTEMPTS", "0"),
        ("RETRY_BASE_DELAY_MS", "20000"),
        ("VERTEX_BASE_URL", "localhost:9000"),
        ("VERTEX_REGIONS", " , "),
        ("RUST_LOG", "loud"),
        ("LOG_FORMAT", "xml"),
    ];

    for (key, value) in cases {
        cleanup_test_env();
        env::set_var(key, value);
        assert!(Settings::new().is_err(), "{}={} should be rejected", key, value);
    }

    cleanup_test_env();
}

#[test]
fn test_access_token_is_not_serialized() {
    let mut settings = Settings::default();
    settings.vertex.access_token = Some("ya29.secret".to_string());

    let json = serde_json::to_string(&settings).unwrap();
    assert!(!json.contains("ya29.secret"));
}

#[test]
fn test_region_list_parsing() {
    assert_eq!(
        parse_region_list("us-east5,europe-west2,,asia-south1"),
        vec!["us-east5", "europe-west2", "asia-south1"]
    );
}

#[test]
fn test_client_file_round_trip_through_settings() {
    let config = r#"{
        "projectId": "file-proj",
        "baseUrl": "http://localhost:8080/{region}",
        "regions": ["asia-south1"],
        "generation": {"maxOutputTokens": 1024, "topP": 0.5}
    }"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(config.as_bytes()).unwrap();

    let client_file = ClientFile::load(file.path()).unwrap();
    let mut settings = Settings::default();
    client_file.apply_to(&mut settings);

    assert_eq!(settings.vertex.project_id.as_deref(), Some("file-proj"));
    assert_eq!(settings.vertex.base_url.as_deref(), Some("http://localhost:8080/{region}"));
    assert_eq!(settings.vertex.regions, vec!["asia-south1"]);
    assert!(settings.validate().is_ok());

    let defaults = client_file.generation_defaults();
    assert_eq!(defaults.max_output_tokens, Some(1024));
    assert_eq!(defaults.top_p, Some(0.5));
    assert_eq!(defaults.temperature, Some(0.3));
}

#[test]
fn test_client_file_rejects_bad_input() {
    let cases = [
        r#"{"generation": {"topP": 1.5}}"#,
        r#"{"baseUrl": "ftp://example.com"}"#,
        r#"{"model": " "}"#,
        r#"{"regions": "us-east5"}"#,
        "not json",
    ];

    for config in cases {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config.as_bytes()).unwrap();
        assert!(ClientFile::load(file.path()).is_err(), "{} should be rejected", config);
    }
}

#[test]
fn test_client_file_missing_path() {
    let result = ClientFile::load(std::path::Path::new("/nonexistent/vertex-failover.json"));
    assert!(result.is_err());
}

#[test]
fn test_default_paths_end_with_local_file() {
    let paths = ClientFile::default_paths();
    assert_eq!(paths.last().unwrap(), &std::path::PathBuf::from("vertex-failover.json"));
}

#[test]
fn test_environment_takes_precedence_over_client_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_test_env();
    env::set_var("GCP_PROJECT", "env-proj");
    env::set_var("VERTEX_MODEL", "gemini-1.5-pro-002");
    env::set_var("VERTEX_REGIONS", "europe-west3");

    let config = r#"{
        "projectId": "file-proj",
        "model": "gemini-1.0-pro",
        "baseUrl": "http://localhost:8080/{region}",
        "regions": ["asia-south1", "us-east5"]
    }"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(config.as_bytes()).unwrap();
    let client_file = ClientFile::load(file.path()).unwrap();

    let mut settings = Settings::new().unwrap();
    client_file.apply_to(&mut settings);

    assert_eq!(settings.vertex.project_id.as_deref(), Some("env-proj"));
    assert_eq!(settings.vertex.model, "gemini-1.5-pro-002");
    assert_eq!(settings.vertex.regions, vec!["europe-west3"]);
    // not set in the environment, so the file fills it in
    assert_eq!(settings.vertex.base_url.as_deref(), Some("http://localhost:8080/{region}"));

    cleanup_test_env();
}
