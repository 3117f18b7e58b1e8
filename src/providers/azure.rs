//! Azure AI Translator v3

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{required, required_str, send_json};
use super::{mismatched, TranslationBackend};
use crate::core::credentials::{Credential, DEFAULT_AZURE_ENDPOINT, DEFAULT_AZURE_REGION};
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{Provider, ProviderReply};
use crate::core::options::{AzureOptions, TranslateOptions};

/// Azure Translator backend; endpoint and region come from the credential
pub struct AzureBackend {
    client: Client,
}

struct AzureTarget<'a> {
    key: &'a str,
    region: &'a str,
    endpoint: &'a str,
}

impl<'a> AzureTarget<'a> {
    fn from_credential(credential: &'a Credential) -> Result<Self> {
        let target = match credential {
            Credential::Azure {
                key,
                region,
                endpoint,
            } => Self {
                key,
                region,
                endpoint,
            },
            Credential::ApiKey(key) => Self {
                key,
                region: DEFAULT_AZURE_REGION,
                endpoint: DEFAULT_AZURE_ENDPOINT,
            },
            Credential::ServiceAccount { .. } => {
                return Err(TranslationError::ConfigError {
                    message: "azure expects an API key with region and endpoint".to_string(),
                })
            }
        };
        Ok(target)
    }
}

impl AzureBackend {
    /// Backend sending requests through `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, target: &AzureTarget<'_>, text: &str, options: &AzureOptions) -> Result<Value> {
        let mut query = vec![
            ("api-version", options.api_version.as_str()),
            ("to", options.target_lang.as_str()),
        ];
        if let Some(source) = options.source_lang.as_deref() {
            query.push(("from", source));
        }

        send_json(
            Provider::Azure,
            self.client
                .post(format!("{}/translate", target.endpoint.trim_end_matches('/')))
                .query(&query)
                .header("Ocp-Apim-Subscription-Key", target.key)
                .header("Ocp-Apim-Subscription-Region", target.region)
                .json(&json!([{ "Text": text }])),
        )
        .await
    }
}

#[async_trait]
impl TranslationBackend for AzureBackend {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    async fn translate(
        &self,
        credential: &Credential,
        text: &str,
        options: &TranslateOptions,
    ) -> Result<ProviderReply> {
        let TranslateOptions::Azure(options) = options else {
            return Err(mismatched(Provider::Azure, options));
        };
        let target = AzureTarget::from_credential(credential)?;

        debug!(
            "Sending translation request to Azure ({} region, target {})",
            target.region, options.target_lang
        );

        let body = self.send(&target, text, options).await?;
        let result = required(Provider::Azure, &body, "/0")?;
        let text = required_str(Provider::Azure, result, "/translations/0/text")?;

        Ok(ProviderReply::new(text, result.clone()).with_structured(result.clone()))
    }

    async fn validate(&self, credential: &Credential) -> Result<()> {
        let target = AzureTarget::from_credential(credential)?;
        self.send(&target, "Hi", &AzureOptions::new("en")).await?;
        Ok(())
    }
}
