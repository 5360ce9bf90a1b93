//! Configuration file parsing, environment overlay and validation.

mod support;

use std::collections::HashMap;
use std::io::Write;

use chrono::FixedOffset;
use tempfile::NamedTempFile;

use parking_tracker::config::{AppConfig, ConfigError};
use parking_tracker::db::{RepositoryFactory, RepositoryType};

use support::with_scoped_env;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_full_file_parses() {
    let file = write_config(
        r#"
[server]
host = "127.0.0.1"
port = 9000
utc_offset_minutes = 420

[repository]
type = "local"

[postgres]
database_url = "postgres://u:p@db/parking"
max_connections = 4

[dashboard]
api_origin = "http://parking.local:9000"
poll_interval_ms = 1500
"#,
    );

    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config.bind_address(), "127.0.0.1:9000");
    assert_eq!(config.utc_offset(), FixedOffset::east_opt(7 * 3600).unwrap());
    assert_eq!(config.dashboard.api_origin, "http://parking.local:9000");
    assert_eq!(config.dashboard.poll_interval_ms, 1500);
    assert_eq!(config.repository.repository_type().unwrap(), RepositoryType::Local);
    assert_eq!(config.repository.postgres.max_connections, 4);
    // Unspecified pool settings keep their defaults.
    assert_eq!(config.repository.postgres.min_connections, 1);
    config.validate().unwrap();
}

#[test]
fn test_empty_file_uses_defaults() {
    let file = write_config("");
    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.bind_address(), "0.0.0.0:8080");
    assert_eq!(config.dashboard.poll_interval_ms, 3000);
    assert_eq!(config.repository.repository.repo_type, "local");
}

#[test]
fn test_file_errors_are_reported() {
    let missing = AppConfig::from_file("/nonexistent/parking.toml").unwrap_err();
    assert!(matches!(missing, ConfigError::Read { .. }));

    let file = write_config("[server]\nport = \"eighty\"\n");
    let bad = AppConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(bad, ConfigError::Parse { .. }));
    assert!(bad.to_string().contains("failed to parse"));
}

#[test]
fn test_env_overrides_file_values() {
    let file = write_config("[server]\nport = 9000\n");
    let mut config = AppConfig::from_file(file.path()).unwrap();

    config.apply_env(env(&[
        ("HOST", "10.0.0.5"),
        ("PORT", "7070"),
        ("PARKING_UTC_OFFSET_MINUTES", "-300"),
        ("DASHBOARD_API_ORIGIN", "https://ops.example.com"),
        ("DASHBOARD_POLL_MS", "500"),
    ]));

    assert_eq!(config.bind_address(), "10.0.0.5:7070");
    assert_eq!(config.utc_offset(), FixedOffset::west_opt(5 * 3600).unwrap());
    assert_eq!(config.dashboard.api_origin, "https://ops.example.com");
    assert_eq!(config.dashboard.poll_interval_ms, 500);
}

#[test]
fn test_unparseable_env_values_are_ignored() {
    let mut config = AppConfig::default();
    config.apply_env(env(&[("PORT", "not-a-port"), ("DASHBOARD_POLL_MS", "-1")]));
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.dashboard.poll_interval_ms, 3000);
}

#[test]
fn test_database_url_selects_postgres() {
    let mut config = AppConfig::default();
    config.apply_env(env(&[("DATABASE_URL", "postgres://db/parking"), ("PG_POOL_MAX", "25")]));
    assert_eq!(config.repository.repository.repo_type, "postgres");
    assert_eq!(config.repository.postgres.database_url, "postgres://db/parking");
    assert_eq!(config.repository.postgres.max_connections, 25);

    let mut pinned = AppConfig::default();
    pinned.apply_env(env(&[
        ("DATABASE_URL", "postgres://db/parking"),
        ("REPOSITORY_TYPE", "local"),
    ]));
    assert_eq!(pinned.repository.repository.repo_type, "local");
}

#[test]
fn test_validation_rejects_bad_values() {
    let mut config = AppConfig::default();
    config.server.utc_offset_minutes = Some(24 * 60 + 1);
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = AppConfig::default();
    config.dashboard.poll_interval_ms = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = AppConfig::default();
    config.repository.repository.repo_type = "mongodb".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_reads_process_environment() {
    let config = with_scoped_env(
        &[
            ("HOST", Some("127.0.0.1")),
            ("PORT", Some("18080")),
            ("PARKING_UTC_OFFSET_MINUTES", Some("60")),
            ("REPOSITORY_TYPE", Some("local")),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        AppConfig::load,
    )
    .unwrap();

    assert_eq!(config.bind_address(), "127.0.0.1:18080");
    assert_eq!(config.utc_offset(), FixedOffset::east_opt(3600).unwrap());
}

#[tokio::test]
async fn test_factory_builds_repository_from_config() {
    let config = AppConfig::default();
    let repo = RepositoryFactory::from_config(&config.repository).await.unwrap();
    assert!(repo.health_check().await.unwrap());
    assert_eq!(repo.count_vehicles_inside().await.unwrap(), 0);
}
