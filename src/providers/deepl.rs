//! DeepL API v2

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::http::{required, required_str, send_json};
use super::{api_key, mismatched, TranslationBackend};
use crate::core::config::TranslatorConfig;
use crate::core::credentials::Credential;
use crate::core::errors::Result;
use crate::core::models::{Provider, ProviderReply};
use crate::core::options::{DeepLOptions, Formality, TagHandling, TranslateOptions};

const DEEPL_FREE_BASE: &str = "https://api-free.deepl.com";
const DEEPL_PRO_BASE: &str = "https://api.deepl.com";

/// DeepL translation backend
pub struct DeepLBackend {
    client: Client,
    config: Arc<TranslatorConfig>,
}

impl DeepLBackend {
    /// Backend sending requests through `client`
    pub fn new(client: Client, config: Arc<TranslatorConfig>) -> Self {
        Self { client, config }
    }

    /// Free-plan keys end in `:fx` and are served from a separate host
    fn base_url(&self, key: &str) -> String {
        match &self.config.endpoints.deepl {
            Some(base) => base.trim_end_matches('/').to_string(),
            None if key.ends_with(":fx") => DEEPL_FREE_BASE.to_string(),
            None => DEEPL_PRO_BASE.to_string(),
        }
    }

    fn auth_header(key: &str) -> String {
        format!("DeepL-Auth-Key {}", key)
    }
}

#[derive(Debug, Serialize)]
struct TranslateBody<'a> {
    text: [&'a str; 1],
    target_lang: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    split_sentences: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preserve_formatting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formality: Option<Formality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    glossary_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_handling: Option<TagHandling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outline_detection: Option<bool>,
    #[serde(skip_serializing_if = "no_tags")]
    non_splitting_tags: &'a [String],
    #[serde(skip_serializing_if = "no_tags")]
    splitting_tags: &'a [String],
    #[serde(skip_serializing_if = "no_tags")]
    ignore_tags: &'a [String],
}

fn no_tags(tags: &&[String]) -> bool {
    tags.is_empty()
}

impl<'a> TranslateBody<'a> {
    fn new(text: &'a str, options: &'a DeepLOptions) -> Self {
        Self {
            text: [text],
            target_lang: &options.target_lang,
            source_lang: options.source_lang.as_deref(),
            context: options.context.as_deref(),
            split_sentences: options.split_sentences.map(|s| s.as_param()),
            preserve_formatting: options.preserve_formatting,
            formality: options.formality,
            glossary_id: options.glossary_id.as_deref(),
            tag_handling: options.tag_handling,
            outline_detection: options.outline_detection,
            non_splitting_tags: &options.non_splitting_tags,
            splitting_tags: &options.splitting_tags,
            ignore_tags: &options.ignore_tags,
        }
    }
}

#[async_trait]
impl TranslationBackend for DeepLBackend {
    fn provider(&self) -> Provider {
        Provider::DeepL
    }

    async fn translate(
        &self,
        credential: &Credential,
        text: &str,
        options: &TranslateOptions,
    ) -> Result<ProviderReply> {
        let TranslateOptions::DeepL(options) = options else {
            return Err(mismatched(Provider::DeepL, options));
        };
        let key = api_key(Provider::DeepL, credential)?;

        debug!("Sending translation request to DeepL (target {})", options.target_lang);

        let body = send_json(
            Provider::DeepL,
            self.client
                .post(format!("{}/v2/translate", self.base_url(key)))
                .header("Authorization", Self::auth_header(key))
                .json(&TranslateBody::new(text, options)),
        )
        .await?;

        let translation = required(Provider::DeepL, &body, "/translations/0")?;
        let text = required_str(Provider::DeepL, translation, "/text")?;

        Ok(ProviderReply::new(text, translation.clone()))
    }

    async fn validate(&self, credential: &Credential) -> Result<()> {
        let key = api_key(Provider::DeepL, credential)?;
        send_json(
            Provider::DeepL,
            self.client
                .get(format!("{}/v2/usage", self.base_url(key)))
                .header("Authorization", Self::auth_header(key)),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::SplitSentences;
    use serde_json::json;

    #[test]
    fn test_base_url_from_key() {
        let backend = DeepLBackend::new(Client::new(), Arc::new(TranslatorConfig::default()));
        assert_eq!(backend.base_url("abc:fx"), DEEPL_FREE_BASE);
        assert_eq!(backend.base_url("abc"), DEEPL_PRO_BASE);

        let mut config = TranslatorConfig::default();
        config.endpoints.deepl = Some("http://localhost:8080/".to_string());
        let backend = DeepLBackend::new(Client::new(), Arc::new(config));
        assert_eq!(backend.base_url("abc:fx"), "http://localhost:8080");
    }

    #[test]
    fn test_body_serialization() {
        let options = DeepLOptions::new("DE")
            .with_source_lang("EN")
            .with_formality(Formality::PreferLess)
            .with_split_sentences(SplitSentences::NoNewlines);
        let body = serde_json::to_value(TranslateBody::new("Hello", &options)).unwrap();

        assert_eq!(
            body,
            json!({
                "text": ["Hello"],
                "target_lang": "DE",
                "source_lang": "EN",
                "split_sentences": "nonewlines",
                "formality": "prefer_less"
            })
        );
    }
}
