//! ironfeed.toml 통합 설정 테스트
//!
//! - ironfeed.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 피드 credential 해석 테스트

use ironfeed_core::config::IronfeedConfig;
use ironfeed_core::error::{ConfigError, IronfeedError};
use ironfeed_core::types::FeedFormat;

const EXAMPLE: &str = include_str!("../../../ironfeed.toml.example");

// =============================================================================
// ironfeed.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = IronfeedConfig::parse(EXAMPLE).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.general.data_dir, ".ironfeed");
}

#[test]
fn example_config_passes_validation() {
    let config = IronfeedConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let config = IronfeedConfig::parse(EXAMPLE).expect("should parse");
    let defaults = IronfeedConfig::default_with_feeds();

    assert_eq!(config.general.log_level, defaults.general.log_level);
    assert_eq!(config.general.log_format, defaults.general.log_format);
    assert_eq!(config.general.data_dir, defaults.general.data_dir);

    assert_eq!(config.ingest.default_feed, defaults.ingest.default_feed);
    assert_eq!(
        config.ingest.fetch_timeout_secs,
        defaults.ingest.fetch_timeout_secs
    );
    assert_eq!(config.ingest.pacing_ms, defaults.ingest.pacing_ms);
    assert_eq!(config.ingest.top_n, defaults.ingest.top_n);
    assert_eq!(
        config.ingest.max_payload_bytes,
        defaults.ingest.max_payload_bytes
    );
    assert_eq!(
        config.ingest.resume_strategy,
        defaults.ingest.resume_strategy
    );

    assert_eq!(config.cache.enabled, defaults.cache.enabled);
    assert_eq!(config.cache.dir, defaults.cache.dir);
    assert_eq!(config.cache.ttl_hours, defaults.cache.ttl_hours);

    assert_eq!(config.feeds.len(), defaults.feeds.len());
    assert_eq!(config.feeds[0].name, defaults.feeds[0].name);
    assert_eq!(config.feeds[0].endpoint, defaults.feeds[0].endpoint);
}

#[test]
fn example_config_feed_converts_to_source() {
    let config = IronfeedConfig::parse(EXAMPLE).expect("should parse");
    let sources = config.feed_sources().expect("sources should convert");
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].format, FeedFormat::Csv);
    assert!(!sources[0].has_credential());
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_cache_only() {
    let toml = r#"
[cache]
enabled = true
dir = "/tmp/ironfeed-cache"
"#;
    let config = IronfeedConfig::parse(toml).expect("should parse");
    assert!(config.cache.enabled);
    assert_eq!(config.cache.dir, "/tmp/ironfeed-cache");
    assert_eq!(config.cache.ttl_hours, 24);
    assert_eq!(config.ingest.pacing_ms, 1000);
    config.validate().expect("should validate");
}

#[test]
fn partial_config_multiple_feeds() {
    let toml = r#"
[ingest]
default_feed = "Second"

[[feeds]]
name = "First"
endpoint = "https://first.example/feed.csv"

[[feeds]]
name = "Second"
endpoint = "https://second.example/feed.json"
format = "json"
"#;
    let config = IronfeedConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");
    assert_eq!(config.feeds.len(), 2);
    // format 생략 시 csv
    assert_eq!(config.feeds[0].format, FeedFormat::Csv);
    assert_eq!(config.feeds[1].format, FeedFormat::Json);
}

#[test]
fn feed_without_endpoint_fails_to_parse() {
    let toml = r#"
[[feeds]]
name = "Broken"
"#;
    let err = IronfeedConfig::parse(toml).unwrap_err();
    assert!(matches!(
        err,
        IronfeedError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn comments_only_parses_with_defaults() {
    let config = IronfeedConfig::parse("# nothing here\n# at all\n").expect("should parse");
    assert_eq!(config.ingest.top_n, 5);
    assert_eq!(config.feeds.len(), 1);
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

/// 환경변수를 설정한 상태로 `f`를 실행하고 원래 값을 복원합니다.
fn with_env<T>(key: &str, value: &str, f: impl FnOnce() -> T) -> T {
    let original = std::env::var(key).ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var(key, value);
    }

    let result = f();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var(key, val),
            None => std::env::remove_var(key),
        }
    }
    result
}

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[ingest]
pacing_ms = 500
"#;
    let pacing = with_env("IRONFEED_INGEST_PACING_MS", "0", || {
        let mut config = IronfeedConfig::parse(toml).expect("should parse");
        config.apply_env_overrides();
        config.ingest.pacing_ms
    });
    assert_eq!(pacing, 0);
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let enabled = with_env("IRONFEED_CACHE_ENABLED", "true", || {
        let mut config = IronfeedConfig::parse("").expect("should parse");
        config.apply_env_overrides();
        config.cache.enabled
    });
    assert!(enabled);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_number_is_ignored() {
    let top_n = with_env("IRONFEED_INGEST_TOP_N", "lots", || {
        let mut config = IronfeedConfig::parse("[ingest]\ntop_n = 7").expect("should parse");
        config.apply_env_overrides();
        config.ingest.top_n
    });
    assert_eq!(top_n, 7);
}

#[test]
#[serial_test::serial]
fn env_override_can_fail_validation() {
    let result = with_env("IRONFEED_INGEST_RESUME_STRATEGY", "rewind", || {
        let mut config = IronfeedConfig::parse("").expect("should parse");
        config.apply_env_overrides();
        config.validate()
    });
    let err = result.unwrap_err();
    assert!(err.to_string().contains("resume_strategy"));
}

#[tokio::test]
#[serial_test::serial]
async fn load_applies_env_overrides_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ironfeed.toml");
    tokio::fs::write(&path, "[ingest]\ntop_n = 3\n")
        .await
        .expect("write config");

    let original = std::env::var("IRONFEED_INGEST_TOP_N").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("IRONFEED_INGEST_TOP_N", "9");
    }
    let config = IronfeedConfig::load(&path).await;
    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("IRONFEED_INGEST_TOP_N", val),
            None => std::env::remove_var("IRONFEED_INGEST_TOP_N"),
        }
    }

    assert_eq!(config.expect("config should load").ingest.top_n, 9);
}

// =============================================================================
// credential 해석 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn credential_env_is_resolved() {
    let toml = r#"
[[feeds]]
name = "Private"
endpoint = "https://private.example/feed.json"
format = "json"
credential_env = "IRONFEED_TEST_PRIVATE_TOKEN"
"#;
    let source = with_env("IRONFEED_TEST_PRIVATE_TOKEN", "tok-123", || {
        let config = IronfeedConfig::parse(toml).expect("should parse");
        config.feeds[0].to_source().expect("source")
    });
    assert_eq!(source.credential.as_deref(), Some("tok-123"));
}

#[test]
#[serial_test::serial]
fn missing_credential_env_yields_no_credential() {
    let toml = r#"
[[feeds]]
name = "Private"
endpoint = "https://private.example/feed.json"
credential_env = "IRONFEED_TEST_UNSET_TOKEN"
"#;
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::remove_var("IRONFEED_TEST_UNSET_TOKEN");
    }
    let config = IronfeedConfig::parse(toml).expect("should parse");
    let source = config.feeds[0].to_source().expect("source");
    assert!(source.credential.is_none());
}
