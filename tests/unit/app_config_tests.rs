/*!
 * Tests for application configuration functionality
 */

use scriptvox::app_config::{Config, LogLevel};

use crate::common;

/// Missing config file gets created with defaults
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let config = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.synthesis.concurrent_jobs, 4);

    let written: Config = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.backend.endpoint, config.backend.endpoint);
    assert_eq!(written.parser, config.parser);
}

/// Existing config file is read, missing sections fall back to defaults
#[test]
fn test_loadOrCreate_withExistingFile_shouldReadValues() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{
            "parser": { "blank_line_ends_dialogue": true },
            "backend": { "endpoint": "https://tts.example.com", "timeout_secs": 30 },
            "log_level": "warn"
        }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();
    assert!(config.parser.blank_line_ends_dialogue);
    assert_eq!(config.parser.max_cue_chars, 30);
    assert_eq!(config.backend.endpoint, "https://tts.example.com");
    assert_eq!(config.backend.timeout_secs, 30);
    assert_eq!(config.synthesis.audio_extension, "wav");
    assert_eq!(config.log_level, LogLevel::Warn);
    assert!(config.validate().is_ok());
}

#[test]
fn test_loadOrCreate_withMalformedFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();
    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_validate_withZeroAttempts_shouldFail() {
    let mut config = Config::default();
    config.synthesis.max_attempts = 0;
    assert!(config.validate().is_err());

    config.synthesis.max_attempts = 1;
    config.backend.timeout_secs = 0;
    assert!(config.validate().is_err());
}
