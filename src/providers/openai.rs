//! OpenAI chat completions

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::http::{required_str, send_json};
use super::{api_key, mismatched, TranslationBackend};
use crate::core::config::TranslatorConfig;
use crate::core::credentials::Credential;
use crate::core::errors::Result;
use crate::core::models::{Provider, ProviderReply};
use crate::core::options::{OpenAiOptions, TranslateOptions, DEFAULT_TRANSLATION_INSTRUCTIONS};

/// OpenAI backend
pub struct OpenAiBackend {
    client: Client,
    config: Arc<TranslatorConfig>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

impl<'a> ChatRequest<'a> {
    fn new(text: &'a str, options: &'a OpenAiOptions) -> Self {
        let instructions = options
            .instructions
            .as_deref()
            .unwrap_or(DEFAULT_TRANSLATION_INSTRUCTIONS);

        let mut messages = Vec::with_capacity(options.messages.len() + 2);
        messages.push(Message {
            role: "system",
            content: instructions,
        });
        messages.extend(options.messages.iter().map(|m| Message {
            role: m.role.as_str(),
            content: &m.content,
        }));
        messages.push(Message {
            role: "user",
            content: text,
        });

        Self {
            model: &options.model,
            messages,
            n: 1,
            temperature: options.temperature,
            top_p: options.top_p,
            stop: (!options.stop.is_empty()).then_some(options.stop.as_slice()),
            max_tokens: options.max_tokens,
            presence_penalty: options.presence_penalty,
            frequency_penalty: options.frequency_penalty,
            response_format: options.response_type.wants_json().then_some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

impl OpenAiBackend {
    /// Backend sending requests through `client`
    pub fn new(client: Client, config: Arc<TranslatorConfig>) -> Self {
        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config.endpoints.openai.trim_end_matches('/')
    }
}

#[async_trait]
impl TranslationBackend for OpenAiBackend {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn translate(
        &self,
        credential: &Credential,
        text: &str,
        options: &TranslateOptions,
    ) -> Result<ProviderReply> {
        let TranslateOptions::OpenAi(options) = options else {
            return Err(mismatched(Provider::OpenAi, options));
        };
        let key = api_key(Provider::OpenAi, credential)?;

        debug!("Sending completion request to OpenAI ({})", options.model);

        let body = send_json(
            Provider::OpenAi,
            self.client
                .post(format!("{}/chat/completions", self.base_url()))
                .bearer_auth(key)
                .json(&ChatRequest::new(text, options)),
        )
        .await?;

        let text = required_str(Provider::OpenAi, &body, "/choices/0/message/content")?.to_string();
        Ok(ProviderReply::new(text, body))
    }

    async fn validate(&self, credential: &Credential) -> Result<()> {
        let key = api_key(Provider::OpenAi, credential)?;
        send_json(
            Provider::OpenAi,
            self.client
                .get(format!("{}/models", self.base_url()))
                .bearer_auth(key),
        )
        .await?;
        Ok(())
    }
}
