/*!
 * Tests for application configuration functionality
 */

use std::time::Duration;

use gamestringer::app_config::{Config, LogLevel, TranslationProvider};
use gamestringer::translation::BackoffPolicy;

use crate::common;

fn valid_config() -> Config {
    let mut config = Config::default();
    config.translation.provider_config_mut(TranslationProvider::OpenAI).api_key = "sk-test".to_string();
    config
}

#[test]
fn test_defaultConfig_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "it");
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.available_providers.len(), TranslationProvider::ALL.len());
    assert!(config.memory.enabled);
    assert!(config.memory.database_path.is_none());
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_saveAndLoad_withTempFile_shouldPreserveValues() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let mut config = valid_config();
    config.target_language = "ja".to_string();
    config.batch.batch_size = 25;
    config.backoff.jitter = 0.0;
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.target_language, "ja");
    assert_eq!(loaded.batch.batch_size, 25);
    assert_eq!(loaded.backoff, config.backoff);
    assert_eq!(loaded.translation.get_api_key(), "sk-test");
}

#[test]
fn test_fromFile_withInvalidJson_shouldNameTheFile() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "broken.json", "{ nope").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("broken.json"));
}

#[test]
fn test_validate_withVariousConfigs_shouldValidateCorrectly() {
    assert!(valid_config().validate().is_ok());

    let mut config = valid_config();
    config.source_language = "zz".to_string();
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.batch.parallel_batches = 0;
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.backoff.jitter = 1.5;
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.quality.min_length_ratio = 4.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withKeyForAnotherProvider_shouldFail() {
    let mut config = valid_config();
    config.translation.provider = TranslationProvider::DeepL;
    assert!(config.validate().is_err());
}

#[test]
fn test_backoffPolicy_fromConfig_shouldUseConfiguredBounds() {
    let mut config = Config::default();
    config.backoff.initial_delay_ms = 100;
    config.backoff.max_delay_ms = 250;
    config.backoff.jitter = 0.0;

    let policy = BackoffPolicy::from(&config.backoff);
    assert_eq!(policy.delay_for(0, None), Duration::from_millis(100));
    assert_eq!(policy.delay_for(5, None), Duration::from_millis(250));
}

#[test]
fn test_batchOptions_shouldUseActiveProviderKey() {
    let options = valid_config().batch_options();
    assert_eq!(options.provider, TranslationProvider::OpenAI);
    assert_eq!(options.api_key, "sk-test");
    assert!(options.validate().is_ok());
}
