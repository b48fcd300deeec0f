/*!
 * Tests for the provider registry and error mapping
 */

use std::sync::Arc;
use std::time::Duration;

use gamestringer::app_config::{TranslationConfig, TranslationProvider};
use gamestringer::errors::ProviderError;
use gamestringer::providers::mock::MockProvider;
use gamestringer::providers::{error_for_status, Provider, ProviderRegistry, TranslationRequest};

#[test]
fn test_fromConfig_withDefaults_shouldRegisterEveryProvider() {
    let registry = ProviderRegistry::from_config(&TranslationConfig::default());

    for kind in TranslationProvider::ALL {
        let adapter = registry.get(kind).expect("adapter should be registered");
        assert_eq!(adapter.kind(), kind);
    }
    assert_eq!(registry.kinds().len(), TranslationProvider::ALL.len());
}

#[test]
fn test_register_withSameKind_shouldReplaceAdapter() {
    let first = MockProvider::working();
    let second = MockProvider::working();
    let registry = ProviderRegistry::new()
        .with(Arc::new(first.clone()))
        .with(Arc::new(second.clone()));

    assert_eq!(registry.kinds(), vec![TranslationProvider::OpenAI]);
    tokio_test::block_on(async {
        let adapter = registry.get(TranslationProvider::OpenAI).unwrap();
        adapter
            .translate(&TranslationRequest::new("Hi", "en", "it", "key"))
            .await
            .unwrap();
    });
    assert_eq!(first.call_count(), 0);
    assert_eq!(second.call_count(), 1);
}

#[test]
fn test_errorForStatus_withRateLimit_shouldKeepRetryHint() {
    match error_for_status(429, Some(Duration::from_secs(12)), "quota") {
        ProviderError::RateLimited { retry_after, message } => {
            assert_eq!(retry_after, Some(Duration::from_secs(12)));
            assert!(message.contains("429"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_errorForStatus_withServerError_shouldBeRetryable() {
    assert!(error_for_status(502, None, "bad gateway").is_retryable());
    assert!(!error_for_status(401, None, "invalid key").is_retryable());
}

#[tokio::test]
async fn test_mockProvider_withFailingText_shouldOnlyFailThatText() {
    let mock = MockProvider::working().with_failing_text("Boom", ProviderError::Malformed("bad".to_string()));

    assert!(mock.translate(&TranslationRequest::new("Boom", "en", "it", "k")).await.is_err());
    assert!(mock.translate(&TranslationRequest::new("Fine", "en", "it", "k")).await.is_ok());
    assert_eq!(mock.calls_for("Boom"), 1);
}
