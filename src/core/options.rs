//! Per-provider translation options

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{Provider, ResponseType};

/// Default instructions for LLM providers
pub const DEFAULT_TRANSLATION_INSTRUCTIONS: &str =
    "Please translate the following text into English.";

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Caller-authored turn
    User,
    /// Model-authored turn
    Assistant,
}

impl MessageRole {
    /// Wire value of the `role` field
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A conversation turn sent ahead of the text to translate.
///
/// LLM providers get the instructions as the system message, then these
/// turns in order, then the text itself as the final user turn. Prior
/// turns carry earlier context or worked examples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who said it
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// User turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// DeepL sentence splitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitSentences {
    /// No splitting; the text is one sentence
    Off,
    /// Split on punctuation and newlines
    #[default]
    All,
    /// Split on punctuation only
    NoNewlines,
}

impl SplitSentences {
    /// Wire value of the `split_sentences` parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            SplitSentences::Off => "0",
            SplitSentences::All => "1",
            SplitSentences::NoNewlines => "nonewlines",
        }
    }
}

/// DeepL formality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formality {
    /// Provider default
    Default,
    /// Formal; fails for targets without formality support
    More,
    /// Informal; fails for targets without formality support
    Less,
    /// Formal where supported
    PreferMore,
    /// Informal where supported
    PreferLess,
}

/// DeepL markup handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagHandling {
    /// XML markup
    Xml,
    /// HTML markup
    Html,
}

/// Google Translate input format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    /// Plain text
    #[default]
    Text,
    /// HTML, tags are kept
    Html,
}

/// DeepL options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepLOptions {
    /// Target language code, e.g. `DE` or `EN-US`
    pub target_lang: String,
    /// Source language code; detected when unset
    pub source_lang: Option<String>,
    /// Extra context that influences the translation but is not translated
    pub context: Option<String>,
    /// Sentence splitting mode
    pub split_sentences: Option<SplitSentences>,
    /// Keep casing and punctuation the way the source has them
    pub preserve_formatting: Option<bool>,
    /// Formality of the output
    pub formality: Option<Formality>,
    /// Glossary to apply; requires `source_lang`
    pub glossary_id: Option<String>,
    /// How markup in the text is treated
    pub tag_handling: Option<TagHandling>,
    /// Automatic XML structure detection; requires `tag_handling`
    pub outline_detection: Option<bool>,
    /// Tags that never split sentences
    pub non_splitting_tags: Vec<String>,
    /// Tags that always split sentences
    pub splitting_tags: Vec<String>,
    /// Tags whose content is left untranslated
    pub ignore_tags: Vec<String>,
    /// Requested result shape
    pub response_type: ResponseType,
}

impl Default for DeepLOptions {
    fn default() -> Self {
        Self {
            target_lang: "EN-US".to_string(),
            source_lang: None,
            context: None,
            split_sentences: Some(SplitSentences::All),
            preserve_formatting: None,
            formality: None,
            glossary_id: None,
            tag_handling: None,
            outline_detection: None,
            non_splitting_tags: Vec::new(),
            splitting_tags: Vec::new(),
            ignore_tags: Vec::new(),
            response_type: ResponseType::Text,
        }
    }
}

impl DeepLOptions {
    /// Options targeting `target_lang`
    pub fn new(target_lang: impl Into<String>) -> Self {
        Self {
            target_lang: target_lang.into(),
            ..Default::default()
        }
    }

    /// Set the source language
    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    /// Set context that is not itself translated
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the formality
    pub fn with_formality(mut self, formality: Formality) -> Self {
        self.formality = Some(formality);
        self
    }

    /// Use a glossary
    pub fn with_glossary(mut self, glossary_id: impl Into<String>) -> Self {
        self.glossary_id = Some(glossary_id.into());
        self
    }

    /// Treat the text as markup
    pub fn with_tag_handling(mut self, tag_handling: TagHandling) -> Self {
        self.tag_handling = Some(tag_handling);
        self
    }

    /// Set sentence splitting
    pub fn with_split_sentences(mut self, split: SplitSentences) -> Self {
        self.split_sentences = Some(split);
        self
    }

    /// Set the result shape
    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    fn validate(&self) -> Result<()> {
        let provider = Provider::DeepL;
        require_target(provider, &self.target_lang)?;
        if self.glossary_id.is_some() && self.source_lang.is_none() {
            return Err(invalid(provider, "a glossary requires source_lang"));
        }
        let uses_tags = !self.non_splitting_tags.is_empty()
            || !self.splitting_tags.is_empty()
            || !self.ignore_tags.is_empty()
            || self.outline_detection.is_some();
        if uses_tags && self.tag_handling.is_none() {
            return Err(invalid(
                provider,
                "tag lists and outline_detection require tag_handling",
            ));
        }
        Ok(())
    }
}

/// Google Translate options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleOptions {
    /// Target language code, e.g. `es`
    pub target_lang: String,
    /// Source language code; detected when unset
    pub source_lang: Option<String>,
    /// Input format
    pub format: TextFormat,
    /// Requested result shape
    pub response_type: ResponseType,
}

impl Default for GoogleOptions {
    fn default() -> Self {
        Self {
            target_lang: "en".to_string(),
            source_lang: None,
            format: TextFormat::Text,
            response_type: ResponseType::Text,
        }
    }
}

impl GoogleOptions {
    /// Options targeting `target_lang`
    pub fn new(target_lang: impl Into<String>) -> Self {
        Self {
            target_lang: target_lang.into(),
            ..Default::default()
        }
    }

    /// Set the source language
    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    /// Set the input format
    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the result shape
    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }
}

/// Azure Translator options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureOptions {
    /// Target language code
    pub target_lang: String,
    /// Source language code; detected when unset
    pub source_lang: Option<String>,
    /// `api-version` query parameter
    pub api_version: String,
    /// Requested result shape
    pub response_type: ResponseType,
}

impl Default for AzureOptions {
    fn default() -> Self {
        Self {
            target_lang: "en".to_string(),
            source_lang: None,
            api_version: "3.0".to_string(),
            response_type: ResponseType::Text,
        }
    }
}

impl AzureOptions {
    /// Options targeting `target_lang`
    pub fn new(target_lang: impl Into<String>) -> Self {
        Self {
            target_lang: target_lang.into(),
            ..Default::default()
        }
    }

    /// Set the source language
    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    /// Set the API version query parameter
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Set the result shape
    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }
}

/// OpenAI chat completion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiOptions {
    /// Model id
    pub model: String,
    /// System message; [`DEFAULT_TRANSLATION_INSTRUCTIONS`] when unset
    pub instructions: Option<String>,
    /// Turns sent between the system message and the text
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature, 0 to 2
    pub temperature: Option<f64>,
    /// Nucleus sampling, 0 to 1
    pub top_p: Option<f64>,
    /// Up to four stop sequences
    pub stop: Vec<String>,
    /// Reply length cap
    pub max_tokens: Option<u32>,
    /// -2 to 2
    pub presence_penalty: Option<f64>,
    /// -2 to 2
    pub frequency_penalty: Option<f64>,
    /// Requested result shape
    pub response_type: ResponseType,
}

impl Default for OpenAiOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            instructions: None,
            messages: Vec::new(),
            temperature: None,
            top_p: None,
            stop: Vec::new(),
            max_tokens: None,
            presence_penalty: None,
            frequency_penalty: None,
            response_type: ResponseType::Text,
        }
    }
}

impl OpenAiOptions {
    /// Options for `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the system instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Turns to send ahead of the text
    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set nucleus sampling
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the stop sequences
    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    /// Cap the reply length
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the result shape
    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    fn validate(&self) -> Result<()> {
        let provider = Provider::OpenAi;
        require_model(provider, &self.model)?;
        check_range(provider, "temperature", self.temperature, 0.0, 2.0)?;
        check_range(provider, "top_p", self.top_p, 0.0, 1.0)?;
        check_range(provider, "presence_penalty", self.presence_penalty, -2.0, 2.0)?;
        check_range(provider, "frequency_penalty", self.frequency_penalty, -2.0, 2.0)?;
        check_positive(provider, "max_tokens", self.max_tokens)?;
        check_messages(provider, &self.messages)?;
        check_stop_sequences(provider, &self.stop, Some(4))
    }
}

/// Gemini generateContent options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiOptions {
    /// Model id, with or without the `models/` prefix
    pub model: String,
    /// System instruction; prepended to the prompt for 1.0 models
    pub instructions: Option<String>,
    /// Sampling temperature, 0 to 2
    pub temperature: f64,
    /// Nucleus sampling, 0 to 1
    pub top_p: f64,
    /// Top-k sampling
    pub top_k: u32,
    /// Up to five stop sequences
    pub stop_sequences: Vec<String>,
    /// Reply length cap
    pub max_output_tokens: Option<u32>,
    /// JSON schema for structured output; only used with json response types
    pub response_schema: Option<Value>,
    /// Requested result shape
    pub response_type: ResponseType,
}

impl Default for GeminiOptions {
    fn default() -> Self {
        Self {
            model: "gemini-pro".to_string(),
            instructions: None,
            temperature: 0.5,
            top_p: 0.9,
            top_k: 40,
            stop_sequences: Vec::new(),
            max_output_tokens: None,
            response_schema: None,
            response_type: ResponseType::Text,
        }
    }
}

impl GeminiOptions {
    /// Options for `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the system instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set top-k sampling
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the stop sequences
    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = stop_sequences;
        self
    }

    /// Cap the reply length
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Schema the json payload must follow
    pub fn with_response_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Set the result shape
    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    fn validate(&self) -> Result<()> {
        let provider = Provider::Gemini;
        require_model(provider, &self.model)?;
        check_range(provider, "temperature", Some(self.temperature), 0.0, 2.0)?;
        check_range(provider, "top_p", Some(self.top_p), 0.0, 1.0)?;
        check_positive(provider, "top_k", Some(self.top_k))?;
        check_positive(provider, "max_output_tokens", self.max_output_tokens)?;
        check_stop_sequences(provider, &self.stop_sequences, Some(5))?;
        check_schema(provider, self.response_schema.as_ref(), self.response_type)
    }
}

/// Anthropic messages options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicOptions {
    /// Model id
    pub model: String,
    /// `system` prompt; [`DEFAULT_TRANSLATION_INSTRUCTIONS`] when unset
    pub instructions: Option<String>,
    /// Turns sent before the text; must start with a user turn and alternate
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature, 0 to 1
    pub temperature: Option<f64>,
    /// Nucleus sampling, 0 to 1
    pub top_p: Option<f64>,
    /// Top-k sampling
    pub top_k: Option<u32>,
    /// Custom stop sequences
    pub stop_sequences: Vec<String>,
    /// `max_tokens` of the request
    pub max_output_tokens: u32,
    /// Tool input schema for structured output; only used with json response types
    pub response_schema: Option<Value>,
    /// Requested result shape
    pub response_type: ResponseType,
}

impl Default for AnthropicOptions {
    fn default() -> Self {
        Self {
            model: "claude-3-haiku-20240307".to_string(),
            instructions: None,
            messages: Vec::new(),
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: Vec::new(),
            max_output_tokens: 4096,
            response_schema: None,
            response_type: ResponseType::Text,
        }
    }
}

impl AnthropicOptions {
    /// Options for `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the system instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Turns to send ahead of the text
    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top-k sampling
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Cap the reply length
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Schema the json payload must follow
    pub fn with_response_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Set the result shape
    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    fn validate(&self) -> Result<()> {
        let provider = Provider::Anthropic;
        require_model(provider, &self.model)?;
        check_range(provider, "temperature", self.temperature, 0.0, 1.0)?;
        check_range(provider, "top_p", self.top_p, 0.0, 1.0)?;
        check_positive(provider, "top_k", self.top_k)?;
        check_positive(provider, "max_output_tokens", Some(self.max_output_tokens))?;
        check_messages(provider, &self.messages)?;
        check_alternating_turns(provider, &self.messages)?;
        check_stop_sequences(provider, &self.stop_sequences, None)?;
        check_schema(provider, self.response_schema.as_ref(), self.response_type)
    }
}

/// Options for one translation call; the variant selects the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum TranslateOptions {
    /// Translate with DeepL
    DeepL(DeepLOptions),
    /// Translate with Google Translate
    GoogleTranslate(GoogleOptions),
    /// Translate with Azure Translator
    Azure(AzureOptions),
    /// Translate with OpenAI
    OpenAi(OpenAiOptions),
    /// Translate with Gemini
    Gemini(GeminiOptions),
    /// Translate with Anthropic
    Anthropic(AnthropicOptions),
}

impl TranslateOptions {
    /// Default options for a provider
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::DeepL => TranslateOptions::DeepL(DeepLOptions::default()),
            Provider::GoogleTranslate => TranslateOptions::GoogleTranslate(GoogleOptions::default()),
            Provider::Azure => TranslateOptions::Azure(AzureOptions::default()),
            Provider::OpenAi => TranslateOptions::OpenAi(OpenAiOptions::default()),
            Provider::Gemini => TranslateOptions::Gemini(GeminiOptions::default()),
            Provider::Anthropic => TranslateOptions::Anthropic(AnthropicOptions::default()),
        }
    }

    /// Provider the variant selects
    pub fn provider(&self) -> Provider {
        match self {
            TranslateOptions::DeepL(_) => Provider::DeepL,
            TranslateOptions::GoogleTranslate(_) => Provider::GoogleTranslate,
            TranslateOptions::Azure(_) => Provider::Azure,
            TranslateOptions::OpenAi(_) => Provider::OpenAi,
            TranslateOptions::Gemini(_) => Provider::Gemini,
            TranslateOptions::Anthropic(_) => Provider::Anthropic,
        }
    }

    /// Requested result shape
    pub fn response_type(&self) -> ResponseType {
        match self {
            TranslateOptions::DeepL(o) => o.response_type,
            TranslateOptions::GoogleTranslate(o) => o.response_type,
            TranslateOptions::Azure(o) => o.response_type,
            TranslateOptions::OpenAi(o) => o.response_type,
            TranslateOptions::Gemini(o) => o.response_type,
            TranslateOptions::Anthropic(o) => o.response_type,
        }
    }

    /// Model id for LLM providers
    pub fn model(&self) -> Option<&str> {
        match self {
            TranslateOptions::OpenAi(o) => Some(&o.model),
            TranslateOptions::Gemini(o) => Some(&o.model),
            TranslateOptions::Anthropic(o) => Some(&o.model),
            _ => None,
        }
    }

    /// Instructions sent to LLM providers, defaulted when unset
    pub fn instructions(&self) -> Option<&str> {
        let explicit = match self {
            TranslateOptions::OpenAi(o) => o.instructions.as_deref(),
            TranslateOptions::Gemini(o) => o.instructions.as_deref(),
            TranslateOptions::Anthropic(o) => o.instructions.as_deref(),
            _ => return None,
        };
        Some(explicit.unwrap_or(DEFAULT_TRANSLATION_INSTRUCTIONS))
    }

    /// Conversation turns sent ahead of the text
    pub fn messages(&self) -> &[ChatMessage] {
        match self {
            TranslateOptions::OpenAi(o) => &o.messages,
            TranslateOptions::Anthropic(o) => &o.messages,
            _ => &[],
        }
    }

    /// Local checks that must pass before any request is sent
    pub fn validate(&self) -> Result<()> {
        let provider = self.provider();
        let response_type = self.response_type();
        if !provider.supports(response_type) {
            return Err(TranslationError::UnsupportedResponseType {
                provider,
                response_type,
            });
        }

        match self {
            TranslateOptions::DeepL(o) => o.validate(),
            TranslateOptions::GoogleTranslate(o) => require_target(provider, &o.target_lang),
            TranslateOptions::Azure(o) => {
                require_target(provider, &o.target_lang)?;
                if o.api_version.trim().is_empty() {
                    return Err(invalid(provider, "api_version must not be empty"));
                }
                Ok(())
            }
            TranslateOptions::OpenAi(o) => o.validate(),
            TranslateOptions::Gemini(o) => o.validate(),
            TranslateOptions::Anthropic(o) => o.validate(),
        }
    }
}

impl From<DeepLOptions> for TranslateOptions {
    fn from(options: DeepLOptions) -> Self {
        TranslateOptions::DeepL(options)
    }
}

impl From<GoogleOptions> for TranslateOptions {
    fn from(options: GoogleOptions) -> Self {
        TranslateOptions::GoogleTranslate(options)
    }
}

impl From<AzureOptions> for TranslateOptions {
    fn from(options: AzureOptions) -> Self {
        TranslateOptions::Azure(options)
    }
}

impl From<OpenAiOptions> for TranslateOptions {
    fn from(options: OpenAiOptions) -> Self {
        TranslateOptions::OpenAi(options)
    }
}

impl From<GeminiOptions> for TranslateOptions {
    fn from(options: GeminiOptions) -> Self {
        TranslateOptions::Gemini(options)
    }
}

impl From<AnthropicOptions> for TranslateOptions {
    fn from(options: AnthropicOptions) -> Self {
        TranslateOptions::Anthropic(options)
    }
}

fn invalid(provider: Provider, message: impl Into<String>) -> TranslationError {
    TranslationError::InvalidSettings {
        provider,
        message: message.into(),
    }
}

fn require_target(provider: Provider, target_lang: &str) -> Result<()> {
    if target_lang.trim().is_empty() {
        return Err(invalid(provider, "target_lang must not be empty"));
    }
    Ok(())
}

fn require_model(provider: Provider, model: &str) -> Result<()> {
    if model.trim().is_empty() {
        return Err(invalid(provider, "model must not be empty"));
    }
    Ok(())
}

fn check_range(provider: Provider, name: &str, value: Option<f64>, min: f64, max: f64) -> Result<()> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(invalid(
            provider,
            format!("{} must be between {} and {}, got {}", name, min, max, v),
        )),
        _ => Ok(()),
    }
}

fn check_positive(provider: Provider, name: &str, value: Option<u32>) -> Result<()> {
    match value {
        Some(0) => Err(invalid(provider, format!("{} must be greater than 0", name))),
        _ => Ok(()),
    }
}

fn check_stop_sequences(provider: Provider, stop: &[String], max: Option<usize>) -> Result<()> {
    if let Some(max) = max {
        if stop.len() > max {
            return Err(invalid(
                provider,
                format!("at most {} stop sequences are allowed, got {}", max, stop.len()),
            ));
        }
    }
    if stop.iter().any(|s| s.is_empty()) {
        return Err(invalid(provider, "stop sequences must not be empty strings"));
    }
    Ok(())
}

fn check_messages(provider: Provider, messages: &[ChatMessage]) -> Result<()> {
    if messages.iter().any(|m| m.content.trim().is_empty()) {
        return Err(invalid(provider, "messages must not have empty content"));
    }
    Ok(())
}

/// Turns must go user, assistant, user, ... and end on an assistant turn,
/// since the text to translate follows as a user turn
fn check_alternating_turns(provider: Provider, messages: &[ChatMessage]) -> Result<()> {
    let alternates = messages.iter().enumerate().all(|(i, m)| {
        let expected = if i % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        m.role == expected
    });
    if !alternates || messages.len() % 2 != 0 {
        return Err(invalid(
            provider,
            "messages must alternate user and assistant turns, starting with user and ending with assistant",
        ));
    }
    Ok(())
}

fn check_schema(provider: Provider, schema: Option<&Value>, response_type: ResponseType) -> Result<()> {
    match schema {
        Some(_) if !response_type.wants_json() => Err(invalid(
            provider,
            "response_schema requires response type 'json' or 'raw_json'",
        )),
        Some(schema) if !schema.is_object() => {
            Err(invalid(provider, "response_schema must be a JSON object"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unsupported_response_type() {
        let options: TranslateOptions = DeepLOptions::new("DE")
            .with_response_type(ResponseType::Json)
            .into();
        assert!(matches!(
            options.validate(),
            Err(TranslationError::UnsupportedResponseType {
                provider: Provider::DeepL,
                response_type: ResponseType::Json,
            })
        ));

        let options: TranslateOptions = AzureOptions::new("fr")
            .with_response_type(ResponseType::Raw)
            .into();
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        for provider in Provider::ALL {
            let options = TranslateOptions::for_provider(provider);
            assert_eq!(options.provider(), provider);
            assert!(options.validate().is_ok(), "{} defaults invalid", provider);
        }
    }

    #[test]
    fn test_llm_ranges() {
        let options: TranslateOptions = OpenAiOptions::default().with_temperature(2.5).into();
        assert!(matches!(
            options.validate(),
            Err(TranslationError::InvalidSettings { provider: Provider::OpenAi, .. })
        ));

        let options: TranslateOptions = AnthropicOptions::default().with_temperature(1.5).into();
        assert!(options.validate().is_err());

        let options: TranslateOptions = GeminiOptions::default().with_top_k(0).into();
        assert!(options.validate().is_err());

        let stops = vec!["a", "b", "c", "d", "e"].into_iter().map(String::from).collect();
        let options: TranslateOptions = OpenAiOptions::default().with_stop(stops).into();
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_schema_requires_json_mode() {
        let schema = json!({"type": "object"});
        let options: TranslateOptions = GeminiOptions::default()
            .with_response_schema(schema.clone())
            .into();
        assert!(options.validate().is_err());

        let options: TranslateOptions = GeminiOptions::default()
            .with_response_schema(schema)
            .with_response_type(ResponseType::Json)
            .into();
        assert!(options.validate().is_ok());

        let options: TranslateOptions = AnthropicOptions::default()
            .with_response_schema(json!("not an object"))
            .with_response_type(ResponseType::RawJson)
            .into();
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_deepl_glossary_needs_source() {
        let options: TranslateOptions = DeepLOptions::new("DE").with_glossary("g-1").into();
        assert!(options.validate().is_err());

        let options: TranslateOptions = DeepLOptions::new("DE")
            .with_glossary("g-1")
            .with_source_lang("EN")
            .into();
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_message_turns() {
        let example = vec![
            ChatMessage::user("Good morning"),
            ChatMessage::assistant("Guten Morgen"),
        ];
        let options: TranslateOptions = AnthropicOptions::default()
            .with_messages(example.clone())
            .into();
        assert!(options.validate().is_ok());
        assert_eq!(options.messages(), example.as_slice());

        let options: TranslateOptions = AnthropicOptions::default()
            .with_messages(vec![ChatMessage::assistant("Guten Morgen")])
            .into();
        assert!(matches!(
            options.validate(),
            Err(TranslationError::InvalidSettings { provider: Provider::Anthropic, .. })
        ));

        // OpenAI takes any order, but still no empty turns
        let options: TranslateOptions = OpenAiOptions::default()
            .with_messages(vec![ChatMessage::assistant("ok"), ChatMessage::user("ok")])
            .into();
        assert!(options.validate().is_ok());
        let options: TranslateOptions = OpenAiOptions::default()
            .with_messages(vec![ChatMessage::user(" ")])
            .into();
        assert!(options.validate().is_err());

        assert!(TranslateOptions::for_provider(Provider::Gemini).messages().is_empty());
    }

    #[test]
    fn test_instructions_default() {
        let options = TranslateOptions::for_provider(Provider::Gemini);
        assert_eq!(options.instructions(), Some(DEFAULT_TRANSLATION_INSTRUCTIONS));
        assert_eq!(TranslateOptions::for_provider(Provider::Azure).instructions(), None);

        let options: TranslateOptions = OpenAiOptions::default()
            .with_instructions("Translate to Japanese.")
            .into();
        assert_eq!(options.instructions(), Some("Translate to Japanese."));
    }
}
