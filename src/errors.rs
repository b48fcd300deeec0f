/*!
 * Error types for the gamestringer engine.
 *
 * This module contains custom error types for different parts of the engine,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::time::Duration;
use thiserror::Error;

/// Errors a provider adapter can return for a single translation request.
///
/// The batch orchestrator reacts differently to each variant: rate limits
/// pause dispatch and are retried, transient failures are retried with
/// backoff, and the remaining variants fail the item immediately.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider asked us to slow down
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        /// Suggested wait before retrying, when the provider sent one
        retry_after: Option<Duration>,
        /// Message from the API
        message: String,
    },

    /// The credentials were rejected
    #[error("Authentication error: {0}")]
    AuthFailed(String),

    /// Network failure, timeout or 5xx response
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// The response could not be understood, or the request was rejected
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Create a rate limit error without a retry hint
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            retry_after: None,
            message: message.into(),
        }
    }

    /// Whether the orchestrator may retry the request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient(_))
    }

    /// Short tag used in logs and item error messages
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::AuthFailed(_) => "auth_failed",
            Self::Transient(_) => "transient",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Malformed(error.to_string())
        } else {
            Self::Transient(error.to_string())
        }
    }
}

/// Errors that prevent a batch from starting
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The selected provider needs an API key and none was supplied
    #[error("No credentials configured for provider '{0}'")]
    NoCredentials(String),

    /// No adapter is registered for the selected provider
    #[error("Provider '{0}' is not registered")]
    UnknownProvider(String),

    /// The batch options are not usable
    #[error("Invalid batch options: {0}")]
    InvalidOptions(String),

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors raised by string file parsers and serializers
#[derive(Error, Debug)]
pub enum FormatError {
    /// The file could not be parsed; the whole file is skipped
    #[error("Failed to parse {file}: {reason}")]
    ParseFailure {
        /// File name given to the parser
        file: String,
        /// What went wrong
        reason: String,
    },

    /// Translated content could not be written back
    #[error("Failed to serialize translated content: {0}")]
    Serialize(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from string file handling
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_providerError_isRetryable_shouldOnlyAcceptRateLimitAndTransient() {
        assert!(ProviderError::rate_limited("slow down").is_retryable());
        assert!(ProviderError::Transient("503".to_string()).is_retryable());
        assert!(!ProviderError::AuthFailed("bad key".to_string()).is_retryable());
        assert!(!ProviderError::Malformed("not json".to_string()).is_retryable());
    }

    #[test]
    fn test_translationError_fromProviderError_shouldWrap() {
        let error: TranslationError = ProviderError::AuthFailed("nope".to_string()).into();
        assert!(error.to_string().contains("Authentication error"));
    }
}
