//! Google Gemini generateContent

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::http::send_json;
use super::{api_key, mismatched, TranslationBackend};
use crate::core::config::TranslatorConfig;
use crate::core::credentials::Credential;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{Provider, ProviderReply};
use crate::core::options::{GeminiOptions, TranslateOptions, DEFAULT_TRANSLATION_INSTRUCTIONS};

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini backend
pub struct GeminiBackend {
    client: Client,
    config: Arc<TranslatorConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig<'a>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [Part; 1],
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    candidate_count: u32,
    temperature: f64,
    top_p: f64,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

/// Gemini 1.0 models take no system instruction
fn supports_system_instruction(model: &str) -> bool {
    !(model == "gemini-pro" || model.starts_with("gemini-1.0"))
}

fn model_path(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

impl<'a> GenerateRequest<'a> {
    fn new(text: &str, options: &'a GeminiOptions) -> Self {
        let instructions = options
            .instructions
            .as_deref()
            .unwrap_or(DEFAULT_TRANSLATION_INSTRUCTIONS);
        let model = model_path(&options.model);

        let (prompt, system_instruction) = if supports_system_instruction(model) {
            let system = Content {
                role: None,
                parts: [Part {
                    text: instructions.to_string(),
                }],
            };
            (text.to_string(), Some(system))
        } else {
            (format!("{}\n{}", instructions, text), None)
        };

        let json_mode = options.response_type.wants_json();

        Self {
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: prompt }],
            }],
            system_instruction,
            generation_config: GenerationConfig {
                candidate_count: 1,
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
                stop_sequences: (!options.stop_sequences.is_empty())
                    .then_some(options.stop_sequences.as_slice()),
                max_output_tokens: options.max_output_tokens,
                response_mime_type: json_mode.then_some("application/json"),
                response_schema: options.response_schema.as_ref().filter(|_| json_mode),
            },
            safety_settings: HARM_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

/// Concatenated text parts of the first candidate
fn candidate_text(body: &Value) -> Result<String> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = body
                .pointer("/promptFeedback/blockReason")
                .or_else(|| body.pointer("/candidates/0/finishReason"))
                .and_then(Value::as_str)
                .unwrap_or("no candidates");
            TranslationError::InvalidResponseError {
                message: format!("gemini returned no text: {}", reason),
            }
        })?;

    Ok(parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(""))
}

impl GeminiBackend {
    /// Backend sending requests through `client`
    pub fn new(client: Client, config: Arc<TranslatorConfig>) -> Self {
        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config.endpoints.gemini.trim_end_matches('/')
    }
}

#[async_trait]
impl TranslationBackend for GeminiBackend {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn translate(
        &self,
        credential: &Credential,
        text: &str,
        options: &TranslateOptions,
    ) -> Result<ProviderReply> {
        let TranslateOptions::Gemini(options) = options else {
            return Err(mismatched(Provider::Gemini, options));
        };
        let key = api_key(Provider::Gemini, credential)?;

        debug!("Sending generateContent request to Gemini ({})", options.model);

        let body = send_json(
            Provider::Gemini,
            self.client
                .post(format!(
                    "{}/models/{}:generateContent",
                    self.base_url(),
                    model_path(&options.model)
                ))
                .query(&[("key", key)])
                .json(&GenerateRequest::new(text, options)),
        )
        .await?;

        let text = candidate_text(&body)?;
        Ok(ProviderReply::new(text, body))
    }

    async fn validate(&self, credential: &Credential) -> Result<()> {
        let key = api_key(Provider::Gemini, credential)?;
        send_json(
            Provider::Gemini,
            self.client
                .get(format!("{}/models", self.base_url()))
                .query(&[("key", key), ("pageSize", "1")]),
        )
        .await?;
        Ok(())
    }
}
