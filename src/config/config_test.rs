use std::path::PathBuf;
use std::time::Duration;

use serial_test::serial;
use temp_env::with_vars;

use super::*;

fn cleanup_all_ballot_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("BALLOT__") || key == "CONFIG_PATH" {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = BallotConfig::default();

    assert_eq!(config.engine.operation_timeout_ms, 5_000);
    assert_eq!(config.engine.event_channel_capacity, 256);
    assert_eq!(config.storage.db_root_dir, PathBuf::from("./db"));
    assert_eq!(config.storage.flush_every_ms, Some(3));
    assert_eq!(config.ledger.ingest_buffer_size, 1024);
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_ballot_env_vars();
    with_vars(
        vec![
            ("BALLOT__ENGINE__OPERATION_TIMEOUT_MS", Some("1500")),
            ("BALLOT__LEDGER__INGEST_BUFFER_SIZE", Some("8")),
        ],
        || {
            let config = BallotConfig::new().unwrap();

            assert_eq!(config.engine.operation_timeout_ms, 1500);
            assert_eq!(config.engine.operation_timeout(), Duration::from_millis(1500));
            assert_eq!(config.ledger.ingest_buffer_size, 8);
        },
    );
}

#[test]
#[serial]
fn new_should_load_config_path_file() {
    cleanup_all_ballot_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("ballot.toml");
    std::fs::write(
        &config_path,
        r#"
        [engine]
        event_channel_capacity = 32
        "#,
    )
    .unwrap();

    with_vars(vec![("CONFIG_PATH", Some(config_path.to_str().unwrap()))], || {
        let config = BallotConfig::new().unwrap();

        assert_eq!(config.engine.event_channel_capacity, 32);
        assert_eq!(config.engine.operation_timeout_ms, 5_000);
    });
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_ballot_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("dynamic_config.toml");

    std::fs::write(
        &config_path,
        r#"
        [storage]
        db_root_dir = "/tmp/ballot/db"
        use_compression = false

        [engine]
        operation_timeout_ms = 250
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let base_config = BallotConfig::new().expect("success");
        let config = base_config
            .with_override_config(config_path.to_str().unwrap())
            .expect("override should apply");

        assert_eq!(
            config.storage.db_root_dir.as_os_str().to_str(),
            Some("/tmp/ballot/db")
        );
        assert!(!config.storage.use_compression);
        assert_eq!(config.engine.operation_timeout_ms, 250);
        assert_eq!(config.ledger.ingest_buffer_size, 1024);
    });
}

#[test]
#[serial]
fn environment_should_win_over_override_file() {
    cleanup_all_ballot_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("override.toml");
    std::fs::write(
        &config_path,
        r#"
        [engine]
        operation_timeout_ms = 250
        "#,
    )
    .unwrap();

    with_vars(vec![("BALLOT__ENGINE__OPERATION_TIMEOUT_MS", Some("900"))], || {
        let config = BallotConfig::default()
            .with_override_config(config_path.to_str().unwrap())
            .unwrap();
        assert_eq!(config.engine.operation_timeout_ms, 900);
    });
}

#[test]
fn validation_should_accept_defaults() {
    assert!(BallotConfig::default().validate().is_ok());
}

#[test]
fn validation_should_reject_zero_timeout() {
    let mut config = BallotConfig::default();
    config.engine.operation_timeout_ms = 0;

    let err = config.validate().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn validation_should_reject_zero_buffers() {
    let mut config = BallotConfig::default();
    config.engine.event_channel_capacity = 0;
    assert!(config.validate().is_err());

    let mut config = BallotConfig::default();
    config.ledger.ingest_buffer_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_empty_db_root_dir() {
    let mut config = BallotConfig::default();
    config.storage.db_root_dir = PathBuf::new();
    assert!(config.validate().is_err());

    let mut config = BallotConfig::default();
    config.storage.flush_every_ms = Some(0);
    assert!(config.validate().is_err());
}

#[test]
fn engine_builder_should_reject_zero_event_channel_capacity() {
    let config = BallotConfig {
        engine: EngineConfig {
            event_channel_capacity: 0,
            ..Default::default()
        },
        ..Default::default()
    };

    let err = crate::EngineBuilder::from_config(config).err().unwrap();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn ingest_channel_should_reject_zero_buffer() {
    let config = LedgerConfig { ingest_buffer_size: 0 };

    let err = crate::ingest_channel(&config).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(crate::ingest_channel(&LedgerConfig::default()).is_ok());
}
