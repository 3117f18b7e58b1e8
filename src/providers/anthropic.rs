//! Anthropic messages API
//!
//! Json response types are served through a forced tool call: the model must
//! answer by calling `format_to_json`, and the tool input becomes the payload.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::http::send_json;
use super::{api_key, mismatched, TranslationBackend};
use crate::core::config::TranslatorConfig;
use crate::core::credentials::Credential;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{Provider, ProviderReply};
use crate::core::options::{AnthropicOptions, TranslateOptions, DEFAULT_TRANSLATION_INSTRUCTIONS};

const JSON_TOOL_NAME: &str = "format_to_json";
const JSON_TOOL_DESCRIPTION: &str = "Format the translated text as JSON";

/// Anthropic backend
pub struct AnthropicBackend {
    client: Client,
    config: Arc<TranslatorConfig>,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<[Tool<'a>; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Tool<'a> {
    name: &'static str,
    description: &'static str,
    input_schema: ToolSchema<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ToolSchema<'a> {
    Custom(&'a Value),
    Default(Value),
}

/// Schema used when the caller supplies none
fn default_tool_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "input": {"type": "string", "description": "The original text"},
            "output": {"type": "string", "description": "The translated text"}
        },
        "required": ["input", "output"]
    })
}

impl<'a> MessageRequest<'a> {
    fn new(text: &'a str, options: &'a AnthropicOptions) -> Self {
        let json_mode = options.response_type.wants_json();
        let tools = json_mode.then(|| {
            [Tool {
                name: JSON_TOOL_NAME,
                description: JSON_TOOL_DESCRIPTION,
                input_schema: match &options.response_schema {
                    Some(schema) => ToolSchema::Custom(schema),
                    None => ToolSchema::Default(default_tool_schema()),
                },
            }]
        });

        Self {
            model: &options.model,
            max_tokens: options.max_output_tokens,
            system: options
                .instructions
                .as_deref()
                .unwrap_or(DEFAULT_TRANSLATION_INSTRUCTIONS),
            messages: options
                .messages
                .iter()
                .map(|m| Message {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .chain([Message {
                    role: "user",
                    content: text,
                }])
                .collect(),
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            stop_sequences: (!options.stop_sequences.is_empty())
                .then_some(options.stop_sequences.as_slice()),
            tools,
            tool_choice: json_mode.then(|| json!({"type": "tool", "name": JSON_TOOL_NAME})),
        }
    }
}

/// Text of the reply, plus the tool input when the model called the json tool
fn read_content(body: &Value) -> Result<(String, Option<Value>)> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: "anthropic response is missing 'content'".to_string(),
        })?;

    let tool_input = blocks
        .iter()
        .find(|block| {
            block.get("type").and_then(Value::as_str) == Some("tool_use")
                && block.get("name").and_then(Value::as_str) == Some(JSON_TOOL_NAME)
        })
        .and_then(|block| block.get("input"))
        .cloned();

    if let Some(input) = tool_input {
        return Ok((input.to_string(), Some(input)));
    }

    let text = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");
    Ok((text, None))
}

impl AnthropicBackend {
    /// Backend sending requests through `client`
    pub fn new(client: Client, config: Arc<TranslatorConfig>) -> Self {
        Self { client, config }
    }

    fn messages_request(&self, key: &str) -> RequestBuilder {
        self.client
            .post(format!(
                "{}/messages",
                self.config.endpoints.anthropic.trim_end_matches('/')
            ))
            .header("x-api-key", key)
            .header("anthropic-version", &self.config.anthropic_version)
    }
}

#[async_trait]
impl TranslationBackend for AnthropicBackend {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn translate(
        &self,
        credential: &Credential,
        text: &str,
        options: &TranslateOptions,
    ) -> Result<ProviderReply> {
        let TranslateOptions::Anthropic(options) = options else {
            return Err(mismatched(Provider::Anthropic, options));
        };
        let key = api_key(Provider::Anthropic, credential)?;

        debug!("Sending messages request to Anthropic ({})", options.model);

        let body = send_json(
            Provider::Anthropic,
            self.messages_request(key)
                .json(&MessageRequest::new(text, options)),
        )
        .await?;

        let (text, structured) = read_content(&body)?;
        let reply = ProviderReply::new(text, body);
        Ok(match structured {
            Some(value) => reply.with_structured(value),
            None => reply,
        })
    }

    async fn validate(&self, credential: &Credential) -> Result<()> {
        let key = api_key(Provider::Anthropic, credential)?;
        let ping = AnthropicOptions::default().with_max_output_tokens(1);
        send_json(
            Provider::Anthropic,
            self.messages_request(key)
                .json(&MessageRequest::new("Respond to this with 1", &ping)),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ResponseType;
    use crate::core::options::ChatMessage;

    #[test]
    fn test_text_request() {
        let options = AnthropicOptions::default().with_temperature(0.3);
        let body = serde_json::to_value(MessageRequest::new("Bonjour", &options)).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 4096,
                "system": DEFAULT_TRANSLATION_INSTRUCTIONS,
                "messages": [{"role": "user", "content": "Bonjour"}],
                "temperature": 0.3
            })
        );
    }

    #[test]
    fn test_prior_turns_precede_text() {
        let options = AnthropicOptions::default().with_messages(vec![
            ChatMessage::user("Merci"),
            ChatMessage::assistant("Thank you"),
        ]);
        let body = serde_json::to_value(MessageRequest::new("Bonjour", &options)).unwrap();

        assert_eq!(
            body["messages"],
            json!([
                {"role": "user", "content": "Merci"},
                {"role": "assistant", "content": "Thank you"},
                {"role": "user", "content": "Bonjour"}
            ])
        );
        assert_eq!(body["system"], DEFAULT_TRANSLATION_INSTRUCTIONS);
    }

    #[test]
    fn test_json_mode_forces_tool() {
        let options = AnthropicOptions::default().with_response_type(ResponseType::Json);
        let body = serde_json::to_value(MessageRequest::new("Bonjour", &options)).unwrap();

        assert_eq!(body["tools"][0]["name"], JSON_TOOL_NAME);
        assert_eq!(body["tools"][0]["input_schema"], default_tool_schema());
        assert_eq!(body["tool_choice"], json!({"type": "tool", "name": JSON_TOOL_NAME}));

        let schema = json!({"type": "object", "properties": {"fr": {"type": "string"}}});
        let options = options.with_response_schema(schema.clone());
        let body = serde_json::to_value(MessageRequest::new("Bonjour", &options)).unwrap();
        assert_eq!(body["tools"][0]["input_schema"], schema);
    }

    #[test]
    fn test_read_content() {
        let body = json!({
            "content": [{"type": "text", "text": "Hello"}, {"type": "text", "text": " there"}]
        });
        let (text, structured) = read_content(&body).unwrap();
        assert_eq!(text, "Hello there");
        assert!(structured.is_none());

        let body = json!({
            "content": [{
                "type": "tool_use",
                "id": "toolu_01",
                "name": JSON_TOOL_NAME,
                "input": {"input": "Bonjour", "output": "Hello"}
            }]
        });
        let (text, structured) = read_content(&body).unwrap();
        assert_eq!(structured, Some(json!({"input": "Bonjour", "output": "Hello"})));
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap()["output"], "Hello");

        assert!(read_content(&json!({"id": "msg_01"})).is_err());
    }
}
