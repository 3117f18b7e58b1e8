//! Shared request sending and provider error normalization

use reqwest::header::RETRY_AFTER;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::errors::{Result, TranslationError};
use crate::core::models::Provider;

/// Send a request and decode a JSON body, mapping failures per provider
pub(crate) async fn send_json(provider: Provider, request: RequestBuilder) -> Result<Value> {
    let response = request.send().await.map_err(TranslationError::from_send)?;
    read_json(provider, response).await
}

async fn read_json(provider: Provider, response: Response) -> Result<Value> {
    let status = response.status();

    if status.is_success() {
        debug!("{} responded with {}", provider, status);
        return response
            .json::<Value>()
            .await
            .map_err(|e| TranslationError::InvalidResponseError {
                message: format!("{} returned a body that is not JSON: {}", provider, e),
            });
    }

    // Headers have to be read before the body consumes the response
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    warn!("{} API error: {} - {}", provider, status, body);
    Err(error_for_status(provider, status.as_u16(), retry_after, &body))
}

/// Map a non-success status to the error taxonomy
pub(crate) fn error_for_status(
    provider: Provider,
    status: u16,
    retry_after: Option<u64>,
    body: &str,
) -> TranslationError {
    let message = error_message(body);

    match status {
        401 | 403 => TranslationError::AuthenticationError { provider, message },
        // Gemini reports a bad key as a plain 400
        400 if provider == Provider::Gemini
            && (body.contains("API_KEY_INVALID") || message.contains("API key not valid")) =>
        {
            TranslationError::AuthenticationError { provider, message }
        }
        429 if body.contains("insufficient_quota") => {
            TranslationError::QuotaExceededError { provider }
        }
        429 => TranslationError::RateLimitError {
            provider,
            retry_after,
        },
        456 => TranslationError::QuotaExceededError { provider },
        _ => TranslationError::ApiError {
            provider,
            status,
            message,
        },
    }
}

/// Pull the human-readable message out of a provider error body
pub(crate) fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
        return trimmed.to_string();
    };

    let candidates = ["/error/message", "/message", "/error_description", "/error"];
    candidates
        .iter()
        .filter_map(|pointer| json.pointer(pointer))
        .find_map(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

/// String at a JSON pointer, or an invalid-response error naming it
pub(crate) fn required_str<'a>(provider: Provider, value: &'a Value, pointer: &str) -> Result<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: format!("{} response is missing '{}'", provider, pointer),
        })
}

/// Value at a JSON pointer, or an invalid-response error naming it
pub(crate) fn required<'a>(provider: Provider, value: &'a Value, pointer: &str) -> Result<&'a Value> {
    value
        .pointer(pointer)
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: format!("{} response is missing '{}'", provider, pointer),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_extraction() {
        let openai = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(error_message(openai), "Incorrect API key provided");

        let deepl = r#"{"message": "Quota exceeded"}"#;
        assert_eq!(error_message(deepl), "Quota exceeded");

        let oauth = r#"{"error": "invalid_grant", "error_description": "Invalid JWT Signature."}"#;
        assert_eq!(error_message(oauth), "Invalid JWT Signature.");

        assert_eq!(error_message("  Forbidden \n"), "Forbidden");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            error_for_status(Provider::DeepL, 403, None, "{}"),
            TranslationError::AuthenticationError { provider: Provider::DeepL, .. }
        ));
        assert!(matches!(
            error_for_status(Provider::DeepL, 456, None, ""),
            TranslationError::QuotaExceededError { provider: Provider::DeepL }
        ));
        assert!(matches!(
            error_for_status(Provider::OpenAi, 429, Some(7), "{}"),
            TranslationError::RateLimitError { retry_after: Some(7), .. }
        ));
        assert!(matches!(
            error_for_status(
                Provider::OpenAi,
                429,
                None,
                r#"{"error": {"code": "insufficient_quota", "message": "You exceeded your quota"}}"#
            ),
            TranslationError::QuotaExceededError { .. }
        ));
        assert!(matches!(
            error_for_status(Provider::Anthropic, 529, None, "overloaded"),
            TranslationError::ApiError { status: 529, .. }
        ));
    }

    #[test]
    fn test_gemini_bad_key_is_auth_error() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{"reason": "API_KEY_INVALID"}]
            }
        })
        .to_string();
        assert!(matches!(
            error_for_status(Provider::Gemini, 400, None, &body),
            TranslationError::AuthenticationError { provider: Provider::Gemini, .. }
        ));
        assert!(matches!(
            error_for_status(Provider::OpenAi, 400, None, &body),
            TranslationError::ApiError { status: 400, .. }
        ));
    }

    #[test]
    fn test_required_str() {
        let body = json!({"choices": [{"message": {"content": "Hallo"}}]});
        assert_eq!(
            required_str(Provider::OpenAi, &body, "/choices/0/message/content").unwrap(),
            "Hallo"
        );
        assert!(required_str(Provider::OpenAi, &body, "/choices/1/message/content").is_err());
    }
}
