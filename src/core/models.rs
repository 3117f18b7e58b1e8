//! Core data models for translation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::core::errors::TranslationError;

/// Supported translation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// DeepL API (character billed, language codes)
    #[serde(rename = "deepl")]
    DeepL,
    /// Google Cloud Translation v2 (character billed, language codes)
    #[serde(rename = "google translate")]
    GoogleTranslate,
    /// Azure AI Translator (character billed, language codes)
    #[serde(rename = "azure")]
    Azure,
    /// OpenAI chat completions (token billed, instructions)
    #[serde(rename = "openai")]
    OpenAi,
    /// Google Gemini (token billed, instructions)
    #[serde(rename = "gemini")]
    Gemini,
    /// Anthropic messages (token billed, instructions)
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl Provider {
    /// Every supported provider
    pub const ALL: [Provider; 6] = [
        Provider::DeepL,
        Provider::GoogleTranslate,
        Provider::Azure,
        Provider::OpenAi,
        Provider::Gemini,
        Provider::Anthropic,
    ];

    /// Canonical selector string
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::DeepL => "deepl",
            Provider::GoogleTranslate => "google translate",
            Provider::Azure => "azure",
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
            Provider::Anthropic => "anthropic",
        }
    }

    /// Whether the provider is driven by instructions and a model
    pub fn is_llm(&self) -> bool {
        matches!(self, Provider::OpenAi | Provider::Gemini | Provider::Anthropic)
    }

    /// Unit the provider bills by
    pub fn billing_unit(&self) -> BillingUnit {
        if self.is_llm() {
            BillingUnit::Tokens
        } else {
            BillingUnit::Characters
        }
    }

    /// Response shapes the provider can produce
    pub fn supported_response_types(&self) -> &'static [ResponseType] {
        match self {
            Provider::DeepL | Provider::GoogleTranslate => &[ResponseType::Text, ResponseType::Raw],
            Provider::Azure => &[ResponseType::Text, ResponseType::Json],
            Provider::OpenAi | Provider::Gemini | Provider::Anthropic => &[
                ResponseType::Text,
                ResponseType::Json,
                ResponseType::Raw,
                ResponseType::RawJson,
            ],
        }
    }

    /// Whether `response_type` is in [`Provider::supported_response_types`]
    pub fn supports(&self, response_type: ResponseType) -> bool {
        self.supported_response_types().contains(&response_type)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepl" => Ok(Provider::DeepL),
            "google translate" | "google" | "googletl" | "google_translate" => {
                Ok(Provider::GoogleTranslate)
            }
            "azure" => Ok(Provider::Azure),
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            "anthropic" => Ok(Provider::Anthropic),
            _ => Err(TranslationError::UnknownProvider {
                name: s.to_string(),
            }),
        }
    }
}

/// Shape of a translation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Plain translated string
    #[default]
    Text,
    /// Structured payload parsed from the provider output
    Json,
    /// Unmodified provider response body
    Raw,
    /// Provider response body plus its parsed payload
    RawJson,
}

impl ResponseType {
    /// Selector string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Text => "text",
            ResponseType::Json => "json",
            ResponseType::Raw => "raw",
            ResponseType::RawJson => "raw_json",
        }
    }

    /// Whether the provider has to be asked for structured output
    pub fn wants_json(&self) -> bool {
        matches!(self, ResponseType::Json | ResponseType::RawJson)
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ResponseType::Text),
            "json" => Ok(ResponseType::Json),
            "raw" => Ok(ResponseType::Raw),
            "raw_json" => Ok(ResponseType::RawJson),
            other => Err(TranslationError::ConfigError {
                message: format!(
                    "Invalid response type '{}'. Must be 'text', 'json', 'raw' or 'raw_json'",
                    other
                ),
            }),
        }
    }
}

/// What a backend hands back before shaping
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    /// Best-effort translated text
    pub text: String,
    /// Response body (or the per-text part of it) as returned by the provider
    pub raw: Value,
    /// Structured payload, when the provider returned one natively
    pub structured: Option<Value>,
}

impl ProviderReply {
    /// Reply with text and raw body only
    pub fn new(text: impl Into<String>, raw: Value) -> Self {
        Self {
            text: text.into(),
            raw,
            structured: None,
        }
    }

    /// Attach a native structured payload
    pub fn with_structured(mut self, structured: Value) -> Self {
        self.structured = Some(structured);
        self
    }
}

/// Normalized translation result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Translation {
    /// Translated string
    Text(String),
    /// Parsed structured payload
    Json(Value),
    /// Provider response body
    Raw(Value),
    /// Response body and parsed payload
    RawJson {
        /// Provider response body
        raw: Value,
        /// Parsed structured payload
        payload: Value,
    },
}

impl Translation {
    /// Shape of this result
    pub fn response_type(&self) -> ResponseType {
        match self {
            Translation::Text(_) => ResponseType::Text,
            Translation::Json(_) => ResponseType::Json,
            Translation::Raw(_) => ResponseType::Raw,
            Translation::RawJson { .. } => ResponseType::RawJson,
        }
    }

    /// Text payload, for `text` results
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Translation::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Owned text payload, for `text` results
    pub fn into_text(self) -> Option<String> {
        match self {
            Translation::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Structured payload, for `json` and `raw_json` results
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Translation::Json(value) => Some(value),
            Translation::RawJson { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// Unit a cost estimate is counted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingUnit {
    /// Source characters
    Characters,
    /// Model tokens
    Tokens,
}

impl fmt::Display for BillingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingUnit::Characters => write!(f, "characters"),
            BillingUnit::Tokens => write!(f, "tokens"),
        }
    }
}

/// Local cost estimate for a translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Billed units of input
    pub units: usize,
    /// What `units` counts
    pub unit_kind: BillingUnit,
    /// Estimated cost in USD
    pub cost: f64,
    /// Resolved model id (provider name for character-billed providers)
    pub model: String,
}
