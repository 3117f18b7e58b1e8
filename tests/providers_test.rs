//! HTTP backends against a local mock server

use assert_json_diff::assert_json_include;
use polytl::{
    AnthropicOptions, AzureOptions, CallPolicy, Credential, DeepLOptions, Formality,
    GeminiOptions, GoogleOptions, OpenAiOptions, Provider, ResponseType, RetryPolicy,
    Translation, TranslationError, Translator, TranslatorConfig,
};
use serde_json::{json, Value};
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_RSA_KEY: &str = include_str!("fixtures/test_rsa_key.pem");

fn config_for(server: &MockServer) -> TranslatorConfig {
    let mut config = TranslatorConfig::default();
    config.timeout_ms = 5_000;
    config.endpoints.deepl = Some(server.uri());
    config.endpoints.google_translate = format!("{}/language/translate/v2", server.uri());
    config.endpoints.openai = format!("{}/v1", server.uri());
    config.endpoints.gemini = format!("{}/v1beta", server.uri());
    config.endpoints.anthropic = format!("{}/v1", server.uri());
    config
}

fn translator_for(server: &MockServer, provider: Provider, credential: Credential) -> Translator {
    let mut translator = Translator::new(config_for(server)).unwrap();
    translator.set_credentials(provider, credential).unwrap();
    translator
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    let request = requests.last().expect("no request received");
    serde_json::from_slice(&request.body).unwrap()
}

#[tokio::test]
async fn test_deepl_translate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/translate"))
        .and(header("Authorization", "DeepL-Auth-Key deepl-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "translations": [{"detected_source_language": "EN", "text": "Hallo Welt"}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::DeepL, Credential::api_key("deepl-key"));
    let options = DeepLOptions::new("DE").with_formality(Formality::More);

    let text = translator
        .deepl_translate_async("Hello world", options.clone())
        .await
        .unwrap();
    assert_eq!(text, Translation::Text("Hallo Welt".to_string()));

    assert_json_include!(
        actual: last_body(&server).await,
        expected: json!({"text": ["Hello world"], "target_lang": "DE", "formality": "more"})
    );

    let raw = translator
        .deepl_translate_async("Hello world", options.with_response_type(ResponseType::Raw))
        .await
        .unwrap();
    assert_eq!(
        raw,
        Translation::Raw(json!({"detected_source_language": "EN", "text": "Hallo Welt"}))
    );
}

#[tokio::test]
async fn test_deepl_quota_exceeded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/translate"))
        .respond_with(ResponseTemplate::new(456).set_body_json(json!({"message": "Quota Exceeded"})))
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::DeepL, Credential::api_key("deepl-key"));
    let err = translator
        .deepl_translate_async("Hello", DeepLOptions::new("DE"))
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::QuotaExceededError { provider: Provider::DeepL }));
}

#[tokio::test]
async fn test_deepl_validate_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/usage"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Wrong API key"})))
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::DeepL, Credential::api_key("bad"));
    let (valid, err) = translator
        .validate_credentials_async(Provider::DeepL)
        .await
        .unwrap();
    assert!(!valid);
    match err {
        Some(TranslationError::AuthenticationError { message, .. }) => {
            assert_eq!(message, "Wrong API key")
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_azure_translate_and_json() {
    let server = MockServer::start().await;
    let result = json!({
        "detectedLanguage": {"language": "en", "score": 1.0},
        "translations": [{"text": "Bonjour", "to": "fr"}]
    });
    Mock::given(method("POST"))
        .and(path("/translate"))
        .and(query_param("api-version", "3.0"))
        .and(query_param("to", "fr"))
        .and(header("Ocp-Apim-Subscription-Key", "azure-key"))
        .and(header("Ocp-Apim-Subscription-Region", "westeurope"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([result.clone()])))
        .mount(&server)
        .await;

    let credential = Credential::azure("azure-key", "westeurope", server.uri());
    let translator = translator_for(&server, Provider::Azure, credential);

    let text = translator
        .azure_translate_async("Hello", AzureOptions::new("fr"))
        .await
        .unwrap();
    assert_eq!(text.as_text(), Some("Bonjour"));
    assert_eq!(last_body(&server).await, json!([{"Text": "Hello"}]));

    let structured = translator
        .azure_translate_async(
            "Hello",
            AzureOptions::new("fr").with_response_type(ResponseType::Json),
        )
        .await
        .unwrap();
    assert_eq!(structured, Translation::Json(result));
}

#[tokio::test]
async fn test_openai_translate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"translation\": \"Hello\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 5, "total_tokens": 25}
        })))
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::OpenAi, Credential::api_key("sk-test"));
    let options = OpenAiOptions::new("gpt-4o-mini")
        .with_instructions("Translate to English and answer as JSON.")
        .with_response_type(ResponseType::Json);

    let result = translator.openai_translate_async("Hallo", options).await.unwrap();
    assert_eq!(result, Translation::Json(json!({"translation": "Hello"})));

    assert_json_include!(
        actual: last_body(&server).await,
        expected: json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "Translate to English and answer as JSON."},
                {"role": "user", "content": "Hallo"}
            ],
            "response_format": {"type": "json_object"}
        })
    );
}

#[tokio::test]
async fn test_openai_rate_limit_then_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_json(json!({"error": {"message": "Rate limit reached", "type": "requests"}})),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello"}}]
        })))
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::OpenAi, Credential::api_key("sk-test"));
    let options = OpenAiOptions::default().into();

    let err = translator.translate_async("Hallo", &options).await.unwrap_err();
    assert!(matches!(
        err,
        TranslationError::RateLimitError { provider: Provider::OpenAi, retry_after: Some(0) }
    ));

    let policy = CallPolicy::none().with_retry(RetryPolicy::new(2, Duration::from_millis(1)));
    let ok = translator
        .translate_async_with_policy("Hallo", &options, &policy)
        .await
        .unwrap();
    assert_eq!(ok.as_text(), Some("Hello"));
}

#[tokio::test]
async fn test_openai_validate_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "code": "invalid_api_key"}
        })))
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::OpenAi, Credential::api_key("sk-bad"));
    let (valid, err) = translator
        .validate_credentials_async(Provider::OpenAi)
        .await
        .unwrap();
    assert!(!valid);
    assert!(matches!(err, Some(TranslationError::AuthenticationError { provider: Provider::OpenAi, .. })));
}

#[tokio::test]
async fn test_gemini_translate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "gemini-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Good morning"}]},
                "finishReason": "STOP"
            }]
        })))
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::Gemini, Credential::api_key("gemini-key"));
    let options = GeminiOptions::new("gemini-1.5-flash").with_temperature(0.2);

    let result = translator
        .gemini_translate_async("Guten Morgen", options)
        .await
        .unwrap();
    assert_eq!(result.as_text(), Some("Good morning"));

    assert_json_include!(
        actual: last_body(&server).await,
        expected: json!({
            "contents": [{"role": "user", "parts": [{"text": "Guten Morgen"}]}],
            "systemInstruction": {"parts": [{"text": "Please translate the following text into English."}]},
            "generationConfig": {"temperature": 0.2, "topP": 0.9, "topK": 40, "candidateCount": 1}
        })
    );
}

#[tokio::test]
async fn test_gemini_invalid_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}]
            }
        })))
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::Gemini, Credential::api_key("nope"));
    let (valid, err) = translator
        .validate_credentials_async(Provider::Gemini)
        .await
        .unwrap();
    assert!(!valid);
    assert!(matches!(err, Some(TranslationError::AuthenticationError { .. })));
}

#[tokio::test]
async fn test_anthropic_translate_json_tool() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "anthropic-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{
                "type": "tool_use",
                "id": "toolu_01",
                "name": "format_to_json",
                "input": {"input": "Hola", "output": "Hello"}
            }],
            "stop_reason": "tool_use"
        })))
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::Anthropic, Credential::api_key("anthropic-key"));
    let options = AnthropicOptions::default().with_response_type(ResponseType::RawJson);

    let result = translator.anthropic_translate_async("Hola", options).await.unwrap();
    let Translation::RawJson { raw, payload } = result else {
        panic!("expected raw_json");
    };
    assert_eq!(payload, json!({"input": "Hola", "output": "Hello"}));
    assert_eq!(raw["id"], "msg_01");

    assert_json_include!(
        actual: last_body(&server).await,
        expected: json!({
            "model": "claude-3-haiku-20240307",
            "max_tokens": 4096,
            "messages": [{"role": "user", "content": "Hola"}],
            "tool_choice": {"type": "tool", "name": "format_to_json"}
        })
    );
}

#[tokio::test]
async fn test_anthropic_validate_uses_single_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "1"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::Anthropic, Credential::api_key("anthropic-key"));
    let (valid, err) = translator
        .validate_credentials_async(Provider::Anthropic)
        .await
        .unwrap();
    assert!(valid);
    assert!(err.is_none());
    assert_eq!(last_body(&server).await["max_tokens"], 1);
}

#[tokio::test]
async fn test_google_service_account_token_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/language/translate/v2"))
        .and(header("Authorization", "Bearer ya29.test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"translations": [{"translatedText": "Hola", "detectedSourceLanguage": "en"}]}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut key_file = tempfile::NamedTempFile::new().unwrap();
    let key = json!({
        "type": "service_account",
        "project_id": "polytl-test",
        "private_key_id": "abc123",
        "private_key": TEST_RSA_KEY,
        "client_email": "translator@polytl-test.iam.gserviceaccount.com",
        "token_uri": format!("{}/token", server.uri())
    });
    key_file.write_all(key.to_string().as_bytes()).unwrap();

    let translator = translator_for(
        &server,
        Provider::GoogleTranslate,
        Credential::service_account(key_file.path()),
    );

    for _ in 0..2 {
        let result = translator
            .google_translate_async("Hello", GoogleOptions::new("es"))
            .await
            .unwrap();
        assert_eq!(result.as_text(), Some("Hola"));
    }

    assert_json_include!(
        actual: last_body(&server).await,
        expected: json!({"q": "Hello", "target": "es", "format": "text"})
    );
}

#[tokio::test]
async fn test_google_api_key_in_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/language/translate/v2"))
        .and(query_param("key", "google-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"translations": [{"translatedText": "Ciao"}]}
        })))
        .mount(&server)
        .await;

    let translator = translator_for(&server, Provider::GoogleTranslate, Credential::api_key("google-key"));
    let result = translator
        .google_translate_async("Hello", GoogleOptions::new("it").with_response_type(ResponseType::Raw))
        .await
        .unwrap();
    assert_eq!(result, Translation::Raw(json!({"translatedText": "Ciao"})));
}

#[tokio::test]
async fn test_unreachable_provider_is_transport_error() {
    let mut config = TranslatorConfig::default();
    config.timeout_ms = 2_000;
    config.endpoints.openai = "http://127.0.0.1:9/v1".to_string();
    let mut translator = Translator::new(config).unwrap();
    translator.set_credentials(Provider::OpenAi, "sk-test").unwrap();

    let err = translator
        .validate_credentials_async(Provider::OpenAi)
        .await
        .unwrap_err();
    assert!(err.is_transport());
}
