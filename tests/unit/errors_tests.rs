/*!
 * Tests for error types and conversions
 */

use std::time::Duration;

use gamestringer::errors::{AppError, FormatError, ProviderError, TranslationError};

#[test]
fn test_providerError_rateLimited_shouldDisplayMessage() {
    let error = ProviderError::RateLimited {
        retry_after: Some(Duration::from_secs(30)),
        message: "Too many requests".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("Rate limit exceeded"));
    assert!(display.contains("Too many requests"));
    assert_eq!(error.tag(), "rate_limited");
}

#[test]
fn test_providerError_tags_shouldBeDistinct() {
    let tags = [
        ProviderError::rate_limited("a").tag(),
        ProviderError::AuthFailed("b".to_string()).tag(),
        ProviderError::Transient("c".to_string()).tag(),
        ProviderError::Malformed("d".to_string()).tag(),
    ];
    assert_eq!(tags, ["rate_limited", "auth_failed", "transient", "malformed"]);
}

#[test]
fn test_translationError_noCredentials_shouldNameProvider() {
    let error = TranslationError::NoCredentials("DeepL".to_string());
    assert!(error.to_string().contains("DeepL"));
}

#[test]
fn test_appError_fromFormatError_shouldWrapCorrectly() {
    let format_error = FormatError::ParseFailure {
        file: "en.json".to_string(),
        reason: "expected value".to_string(),
    };
    let app_error: AppError = format_error.into();
    let display = format!("{}", app_error);
    assert!(display.contains("Format error"));
    assert!(display.contains("en.json"));
}

#[test]
fn test_appError_fromIoError_shouldWrapAsFileError() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
    let app_error: AppError = io_error.into();
    let display = format!("{}", app_error);
    assert!(display.contains("File error"));
    assert!(display.contains("File not found"));
}

#[test]
fn test_appError_fromTranslationError_shouldWrapCorrectly() {
    let app_error: AppError = TranslationError::UnknownProvider("google".to_string()).into();
    assert!(app_error.to_string().contains("Translation error"));
}
