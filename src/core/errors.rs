//! Custom error types for translation operations

use thiserror::Error;

use crate::core::models::{Provider, ResponseType};

/// Broad class of a [`TranslationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected locally before any network call
    Configuration,
    /// Provider rejected the credential or the account
    Credential,
    /// Network failure or provider-side error
    Transport,
}

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Provider selector not recognized
    #[error("Unknown provider '{name}'. Supported providers are 'deepl', 'gemini', 'openai', 'google translate', 'anthropic' and 'azure'")]
    UnknownProvider {
        /// Selector as given
        name: String,
    },

    /// No credential stored for the provider
    #[error("No credentials set for {provider}")]
    MissingCredentials {
        /// Provider involved
        provider: Provider,
    },

    /// Provider cannot produce the requested response shape
    #[error("{provider} does not support response type '{response_type}'")]
    UnsupportedResponseType {
        /// Provider involved
        provider: Provider,
        /// Shape that was asked for
        response_type: ResponseType,
    },

    /// Option value out of range or not applicable
    #[error("Invalid settings for {provider}: {message}")]
    InvalidSettings {
        /// Provider involved
        provider: Provider,
        /// Details
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Details
        message: String,
    },

    /// Credential rejected by the provider
    #[error("Authentication failed for {provider}: {message}")]
    AuthenticationError {
        /// Provider involved
        provider: Provider,
        /// Details
        message: String,
    },

    /// Character or token quota exhausted
    #[error("Quota exceeded for {provider}")]
    QuotaExceededError {
        /// Provider involved
        provider: Provider,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded for {provider}. Retry after {retry_after:?} seconds")]
    RateLimitError {
        /// Provider involved
        provider: Provider,
        /// `Retry-After` seconds, when sent
        retry_after: Option<u64>,
    },

    /// API request failed
    #[error("API error from {provider}: {status} - {message}")]
    ApiError {
        /// Provider involved
        provider: Provider,
        /// HTTP status code
        status: u16,
        /// Details
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        /// Details
        message: String,
    },

    /// Request timeout
    #[error("Request timeout")]
    TimeoutError,

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        /// Details
        message: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl TranslationError {
    /// Broad class of the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslationError::UnknownProvider { .. }
            | TranslationError::MissingCredentials { .. }
            | TranslationError::UnsupportedResponseType { .. }
            | TranslationError::InvalidSettings { .. }
            | TranslationError::ConfigError { .. }
            | TranslationError::YamlError(_) => ErrorKind::Configuration,
            TranslationError::AuthenticationError { .. }
            | TranslationError::QuotaExceededError { .. } => ErrorKind::Credential,
            _ => ErrorKind::Transport,
        }
    }

    /// Whether a retry policy may try the call again
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::RateLimitError { .. }
            | TranslationError::NetworkError { .. }
            | TranslationError::TimeoutError => true,
            TranslationError::ApiError { status, .. } => *status >= 500,
            TranslationError::HttpError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether the error happened before reaching the provider
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TranslationError::NetworkError { .. }
                | TranslationError::TimeoutError
                | TranslationError::HttpError(_)
        )
    }

    /// Map a reqwest send failure
    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TranslationError::TimeoutError
        } else {
            TranslationError::NetworkError {
                message: err.to_string(),
            }
        }
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(err: anyhow::Error) -> Self {
        TranslationError::InternalError(err.to_string())
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let missing = TranslationError::MissingCredentials {
            provider: Provider::DeepL,
        };
        assert_eq!(missing.kind(), ErrorKind::Configuration);

        let auth = TranslationError::AuthenticationError {
            provider: Provider::OpenAi,
            message: "bad key".to_string(),
        };
        assert_eq!(auth.kind(), ErrorKind::Credential);

        let api = TranslationError::ApiError {
            provider: Provider::Gemini,
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(api.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_retryable() {
        assert!(TranslationError::TimeoutError.is_retryable());
        assert!(TranslationError::RateLimitError {
            provider: Provider::Anthropic,
            retry_after: Some(2),
        }
        .is_retryable());
        assert!(TranslationError::ApiError {
            provider: Provider::Azure,
            status: 503,
            message: String::new(),
        }
        .is_retryable());
        assert!(!TranslationError::ApiError {
            provider: Provider::Azure,
            status: 400,
            message: String::new(),
        }
        .is_retryable());
        assert!(!TranslationError::AuthenticationError {
            provider: Provider::DeepL,
            message: String::new(),
        }
        .is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = TranslationError::UnsupportedResponseType {
            provider: Provider::DeepL,
            response_type: ResponseType::Json,
        };
        assert_eq!(err.to_string(), "deepl does not support response type 'json'");
    }
}
