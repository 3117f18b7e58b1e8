//! Provider backends
//!
//! Each backend maps [`TranslateOptions`] onto one vendor HTTP API and hands
//! back a [`ProviderReply`]; shaping into [`crate::Translation`] happens in the
//! translator so every backend behaves the same way.

mod anthropic;
mod azure;
mod deepl;
mod gemini;
mod google_translate;
mod http;
mod openai;

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::config::TranslatorConfig;
use crate::core::credentials::Credential;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{Provider, ProviderReply};
use crate::core::options::TranslateOptions;

pub use anthropic::AnthropicBackend;
pub use azure::AzureBackend;
pub use deepl::DeepLBackend;
pub use gemini::GeminiBackend;
pub use google_translate::GoogleTranslateBackend;
pub use openai::OpenAiBackend;

/// One provider's translate and credential-check entry points
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Provider this backend serves
    fn provider(&self) -> Provider;

    /// Translate one text
    async fn translate(
        &self,
        credential: &Credential,
        text: &str,
        options: &TranslateOptions,
    ) -> Result<ProviderReply>;

    /// Make a minimal authenticated call; `Ok(())` means the credential works
    async fn validate(&self, credential: &Credential) -> Result<()>;
}

/// The backend for every provider
#[derive(Clone)]
pub(crate) struct Backends {
    deepl: Arc<dyn TranslationBackend>,
    google_translate: Arc<dyn TranslationBackend>,
    azure: Arc<dyn TranslationBackend>,
    openai: Arc<dyn TranslationBackend>,
    gemini: Arc<dyn TranslationBackend>,
    anthropic: Arc<dyn TranslationBackend>,
}

impl Backends {
    pub(crate) fn http(client: reqwest::Client, config: Arc<TranslatorConfig>) -> Self {
        Self {
            deepl: Arc::new(DeepLBackend::new(client.clone(), config.clone())),
            google_translate: Arc::new(GoogleTranslateBackend::new(client.clone(), config.clone())),
            azure: Arc::new(AzureBackend::new(client.clone())),
            openai: Arc::new(OpenAiBackend::new(client.clone(), config.clone())),
            gemini: Arc::new(GeminiBackend::new(client.clone(), config.clone())),
            anthropic: Arc::new(AnthropicBackend::new(client, config)),
        }
    }

    pub(crate) fn get(&self, provider: Provider) -> &Arc<dyn TranslationBackend> {
        match provider {
            Provider::DeepL => &self.deepl,
            Provider::GoogleTranslate => &self.google_translate,
            Provider::Azure => &self.azure,
            Provider::OpenAi => &self.openai,
            Provider::Gemini => &self.gemini,
            Provider::Anthropic => &self.anthropic,
        }
    }

    pub(crate) fn replace(&mut self, backend: Arc<dyn TranslationBackend>) {
        let slot = match backend.provider() {
            Provider::DeepL => &mut self.deepl,
            Provider::GoogleTranslate => &mut self.google_translate,
            Provider::Azure => &mut self.azure,
            Provider::OpenAi => &mut self.openai,
            Provider::Gemini => &mut self.gemini,
            Provider::Anthropic => &mut self.anthropic,
        };
        *slot = backend;
    }
}

/// Options for a different provider reached this backend
pub(crate) fn mismatched(expected: Provider, options: &TranslateOptions) -> TranslationError {
    TranslationError::InternalError(format!(
        "{} backend received options for {}",
        expected,
        options.provider()
    ))
}

/// Key of an `ApiKey` credential
pub(crate) fn api_key(provider: Provider, credential: &Credential) -> Result<&str> {
    match credential {
        Credential::ApiKey(key) => Ok(key),
        other => Err(TranslationError::ConfigError {
            message: format!("{} expects an API key, got {:?}", provider, other),
        }),
    }
}
