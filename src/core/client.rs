//! Translator facade: credentials, dispatch and response shaping

use futures::future::join_all;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::blocking::block_on;
use crate::core::config::TranslatorConfig;
use crate::core::credentials::{Credential, CredentialStore};
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{CostEstimate, Provider, ProviderReply, ResponseType, Translation};
use crate::core::options::{
    AnthropicOptions, AzureOptions, DeepLOptions, GeminiOptions, GoogleOptions, OpenAiOptions,
    TranslateOptions,
};
use crate::core::policy::CallPolicy;
use crate::core::pricing;
use crate::providers::{Backends, TranslationBackend};

/// Outcome of a credential check: whether it worked, and why not
pub type Validation = (bool, Option<TranslationError>);

/// Uniform translation client over every supported provider
#[derive(Clone)]
pub struct Translator {
    config: Arc<TranslatorConfig>,
    credentials: CredentialStore,
    backends: Backends,
}

impl Translator {
    /// Create a translator with no credentials
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Some(Duration::from_secs(config.pool_idle_timeout_secs)))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()?;

        let config = Arc::new(config);
        let backends = Backends::http(client, config.clone());

        Ok(Self {
            config,
            credentials: CredentialStore::new(),
            backends,
        })
    }

    /// Replace the whole credential store
    pub fn with_credentials(mut self, credentials: CredentialStore) -> Self {
        debug!("Using credentials for {} providers", credentials.len());
        self.credentials = credentials;
        self
    }

    /// Replace the backend serving `backend.provider()`
    pub fn with_backend<B: TranslationBackend + 'static>(mut self, backend: B) -> Self {
        debug!("Installing custom backend for {}", backend.provider());
        self.backends.replace(Arc::new(backend));
        self
    }

    /// Configuration this translator was built with
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Credentials currently held
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Store the credential for `provider`, replacing any previous one
    pub fn set_credentials(
        &mut self,
        provider: Provider,
        credential: impl Into<Credential>,
    ) -> Result<()> {
        self.credentials.set(provider, credential.into())
    }

    /// Forget the credential for `provider`, returning it if one was set
    pub fn clear_credentials(&mut self, provider: Provider) -> Option<Credential> {
        let removed = self.credentials.remove(provider);
        if removed.is_some() {
            info!("Cleared credentials for {}", provider);
        }
        removed
    }

    /// Check the stored credential against the provider.
    ///
    /// Rejections come back as `Ok((false, Some(err)))`; only network and
    /// timeout failures are returned as `Err`.
    pub async fn validate_credentials_async(&self, provider: Provider) -> Result<Validation> {
        let Some(credential) = self.credentials.get(provider) else {
            return Ok((false, Some(TranslationError::MissingCredentials { provider })));
        };

        debug!("Validating credentials for {}", provider);
        match self.backends.get(provider).validate(credential).await {
            Ok(()) => {
                info!("Credentials for {} are valid", provider);
                Ok((true, None))
            }
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                warn!("Credentials for {} rejected: {}", provider, e);
                Ok((false, Some(e)))
            }
        }
    }

    /// Blocking form of [`Translator::validate_credentials_async`]
    pub fn validate_credentials(&self, provider: Provider) -> Result<Validation> {
        block_on(self.validate_credentials_async(provider))?
    }

    /// Translate one text with the provider selected by `options`
    pub async fn translate_async(&self, text: &str, options: &TranslateOptions) -> Result<Translation> {
        self.dispatch(text, options, &CallPolicy::none()).await
    }

    /// Blocking form of [`Translator::translate_async`]
    pub fn translate(&self, text: &str, options: &TranslateOptions) -> Result<Translation> {
        block_on(self.translate_async(text, options))?
    }

    /// Translate one text, running the provider call under `policy`
    pub async fn translate_async_with_policy(
        &self,
        text: &str,
        options: &TranslateOptions,
        policy: &CallPolicy,
    ) -> Result<Translation> {
        self.dispatch(text, options, policy).await
    }

    /// Blocking form of [`Translator::translate_async_with_policy`]
    pub fn translate_with_policy(
        &self,
        text: &str,
        options: &TranslateOptions,
        policy: &CallPolicy,
    ) -> Result<Translation> {
        block_on(self.dispatch(text, options, policy))?
    }

    /// Translate several texts concurrently; results keep input order
    pub async fn translate_batch_async<S: AsRef<str>>(
        &self,
        texts: &[S],
        options: &TranslateOptions,
    ) -> Vec<Result<Translation>> {
        self.translate_batch_async_with_policy(texts, options, &CallPolicy::none())
            .await
    }

    /// Batch translation with a shared policy; its limiter bounds concurrency
    pub async fn translate_batch_async_with_policy<S: AsRef<str>>(
        &self,
        texts: &[S],
        options: &TranslateOptions,
        policy: &CallPolicy,
    ) -> Vec<Result<Translation>> {
        info!(
            "Translating batch of {} texts with {}",
            texts.len(),
            options.provider()
        );
        let futures = texts
            .iter()
            .map(|text| self.dispatch(text.as_ref(), options, policy));
        join_all(futures).await
    }

    /// Blocking batch translation.
    ///
    /// The outer `Err` is only returned when called from inside a runtime.
    pub fn translate_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        options: &TranslateOptions,
    ) -> Result<Vec<Result<Translation>>> {
        block_on(self.translate_batch_async(texts, options))
    }

    /// Blocking form of [`Translator::translate_batch_async_with_policy`]
    pub fn translate_batch_with_policy<S: AsRef<str>>(
        &self,
        texts: &[S],
        options: &TranslateOptions,
        policy: &CallPolicy,
    ) -> Result<Vec<Result<Translation>>> {
        block_on(self.translate_batch_async_with_policy(texts, options, policy))
    }

    /// Translate with DeepL
    pub async fn deepl_translate_async(&self, text: &str, options: DeepLOptions) -> Result<Translation> {
        self.translate_async(text, &options.into()).await
    }

    /// Blocking DeepL translation
    pub fn deepl_translate(&self, text: &str, options: DeepLOptions) -> Result<Translation> {
        self.translate(text, &options.into())
    }

    /// Translate with Google Translate
    pub async fn google_translate_async(&self, text: &str, options: GoogleOptions) -> Result<Translation> {
        self.translate_async(text, &options.into()).await
    }

    /// Blocking Google Translate translation
    pub fn google_translate(&self, text: &str, options: GoogleOptions) -> Result<Translation> {
        self.translate(text, &options.into())
    }

    /// Translate with Azure Translator
    pub async fn azure_translate_async(&self, text: &str, options: AzureOptions) -> Result<Translation> {
        self.translate_async(text, &options.into()).await
    }

    /// Blocking Azure Translator translation
    pub fn azure_translate(&self, text: &str, options: AzureOptions) -> Result<Translation> {
        self.translate(text, &options.into())
    }

    /// Translate with OpenAI
    pub async fn openai_translate_async(&self, text: &str, options: OpenAiOptions) -> Result<Translation> {
        self.translate_async(text, &options.into()).await
    }

    /// Blocking OpenAI translation
    pub fn openai_translate(&self, text: &str, options: OpenAiOptions) -> Result<Translation> {
        self.translate(text, &options.into())
    }

    /// Translate with Gemini
    pub async fn gemini_translate_async(&self, text: &str, options: GeminiOptions) -> Result<Translation> {
        self.translate_async(text, &options.into()).await
    }

    /// Blocking Gemini translation
    pub fn gemini_translate(&self, text: &str, options: GeminiOptions) -> Result<Translation> {
        self.translate(text, &options.into())
    }

    /// Translate with Anthropic
    pub async fn anthropic_translate_async(
        &self,
        text: &str,
        options: AnthropicOptions,
    ) -> Result<Translation> {
        self.translate_async(text, &options.into()).await
    }

    /// Blocking Anthropic translation
    pub fn anthropic_translate(&self, text: &str, options: AnthropicOptions) -> Result<Translation> {
        self.translate(text, &options.into())
    }

    /// Estimate the cost of one translation; no network access
    pub fn calculate_cost(
        &self,
        text: &str,
        provider: Provider,
        model: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<CostEstimate> {
        pricing::calculate_cost(text, provider, model, instructions)
    }

    /// Estimate the summed cost of several texts
    pub fn calculate_batch_cost<S: AsRef<str>>(
        &self,
        texts: &[S],
        provider: Provider,
        model: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<CostEstimate> {
        pricing::calculate_batch_cost(texts, provider, model, instructions)
    }

    async fn dispatch(
        &self,
        text: &str,
        options: &TranslateOptions,
        policy: &CallPolicy,
    ) -> Result<Translation> {
        let provider = options.provider();
        options.validate()?;
        let credential = self.credentials.require(provider)?;
        if let (Some(model), Some(instructions)) = (options.model(), options.instructions()) {
            let turns = options.messages();
            if turns.is_empty() {
                pricing::check_context_window(provider, model, instructions, text)?;
            } else {
                let prompt = turns
                    .iter()
                    .map(|m| m.content.as_str())
                    .chain([text])
                    .collect::<Vec<_>>()
                    .join("\n");
                pricing::check_context_window(provider, model, instructions, &prompt)?;
            }
        }

        debug!(
            "Translating {} characters with {} ({})",
            text.chars().count(),
            provider,
            options.response_type()
        );

        let backend = self.backends.get(provider);
        let reply = policy
            .run(|| backend.translate(credential, text, options))
            .await?;

        shape(options.response_type(), reply)
    }
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("config", &self.config)
            .field("credentials", &self.credentials.providers())
            .finish()
    }
}

/// Normalize a provider reply into the requested shape
fn shape(response_type: ResponseType, reply: ProviderReply) -> Result<Translation> {
    Ok(match response_type {
        ResponseType::Text => Translation::Text(reply.text),
        ResponseType::Json => Translation::Json(json_payload(&reply)?),
        ResponseType::Raw => Translation::Raw(reply.raw),
        ResponseType::RawJson => {
            let payload = json_payload(&reply)?;
            Translation::RawJson {
                raw: reply.raw,
                payload,
            }
        }
    })
}

fn json_payload(reply: &ProviderReply) -> Result<Value> {
    if let Some(structured) = &reply.structured {
        return Ok(structured.clone());
    }
    parse_json_text(&reply.text)
}

/// Parse model output as JSON, tolerating a surrounding markdown fence
fn parse_json_text(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced).map_err(|e| TranslationError::InvalidResponseError {
        message: format!("expected a JSON payload but could not parse it: {}", e),
    })
}
