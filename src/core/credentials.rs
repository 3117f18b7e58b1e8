//! Provider credentials and the per-translator credential store

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::errors::{Result, TranslationError};
use crate::core::models::Provider;

/// Default Azure Translator endpoint
pub const DEFAULT_AZURE_ENDPOINT: &str = "https://api.cognitive.microsofttranslator.com";

/// Default Azure resource region
pub const DEFAULT_AZURE_REGION: &str = "global";

/// Credential for one provider
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Opaque API key
    ApiKey(String),
    /// Azure Translator key with resource region and endpoint
    Azure {
        /// Subscription key
        key: String,
        /// Resource region, `global` for global resources
        region: String,
        /// Translator endpoint
        endpoint: String,
    },
    /// Path to a Google Cloud service-account JSON key file
    ServiceAccount {
        /// Key file location
        path: PathBuf,
    },
}

impl Credential {
    /// API key credential
    pub fn api_key(key: impl Into<String>) -> Self {
        Credential::ApiKey(key.into())
    }

    /// Azure key with explicit region and endpoint
    pub fn azure(
        key: impl Into<String>,
        region: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Credential::Azure {
            key: key.into(),
            region: region.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Service-account key file credential
    pub fn service_account(path: impl AsRef<Path>) -> Self {
        Credential::ServiceAccount {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Key material for key-based credentials
    pub fn key(&self) -> Option<&str> {
        match self {
            Credential::ApiKey(key) | Credential::Azure { key, .. } => Some(key),
            Credential::ServiceAccount { .. } => None,
        }
    }

    /// Normalize and check the credential against the provider it is stored for
    fn for_provider(self, provider: Provider) -> Result<Self> {
        let credential = match (provider, self) {
            (Provider::Azure, Credential::ApiKey(key)) => Credential::Azure {
                key,
                region: DEFAULT_AZURE_REGION.to_string(),
                endpoint: DEFAULT_AZURE_ENDPOINT.to_string(),
            },
            (Provider::Azure, azure @ Credential::Azure { .. }) => azure,
            (Provider::GoogleTranslate, account @ Credential::ServiceAccount { .. }) => account,
            (_, key @ Credential::ApiKey(_)) => key,
            (provider, other) => {
                return Err(TranslationError::ConfigError {
                    message: format!(
                        "{} credentials cannot be used for {}",
                        other.kind_name(),
                        provider
                    ),
                })
            }
        };

        match &credential {
            Credential::ApiKey(key) if key.trim().is_empty() => Err(empty(provider, "API key")),
            Credential::Azure { key, region, endpoint } => {
                if key.trim().is_empty() {
                    Err(empty(provider, "API key"))
                } else if region.trim().is_empty() {
                    Err(empty(provider, "region"))
                } else if endpoint.trim().is_empty() {
                    Err(empty(provider, "endpoint"))
                } else {
                    Ok(credential)
                }
            }
            Credential::ServiceAccount { path } if path.as_os_str().is_empty() => {
                Err(empty(provider, "service account path"))
            }
            _ => Ok(credential),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Credential::ApiKey(_) => "API key",
            Credential::Azure { .. } => "Azure",
            Credential::ServiceAccount { .. } => "Service account",
        }
    }
}

fn empty(provider: Provider, what: &str) -> TranslationError {
    TranslationError::ConfigError {
        message: format!("{} for {} must not be empty", what, provider),
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.debug_tuple("ApiKey").field(&"<redacted>").finish(),
            Credential::Azure { region, endpoint, .. } => f
                .debug_struct("Azure")
                .field("key", &"<redacted>")
                .field("region", region)
                .field("endpoint", endpoint)
                .finish(),
            Credential::ServiceAccount { path } => f
                .debug_struct("ServiceAccount")
                .field("path", path)
                .finish(),
        }
    }
}

impl From<&str> for Credential {
    fn from(key: &str) -> Self {
        Credential::ApiKey(key.to_string())
    }
}

impl From<String> for Credential {
    fn from(key: String) -> Self {
        Credential::ApiKey(key)
    }
}

/// Credentials keyed by provider, owned by one translator
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: HashMap<Provider, Credential>,
}

impl CredentialStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect credentials from the conventional environment variables.
    ///
    /// Reads `DEEPL_API_KEY`, `OPENAI_API_KEY`, `GEMINI_API_KEY`,
    /// `ANTHROPIC_API_KEY`, `AZURE_API_KEY` (with `AZURE_REGION` and
    /// `AZURE_ENDPOINT`) and `GOOGLE_APPLICATION_CREDENTIALS`. Unset or empty
    /// variables are skipped.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let mut found = Vec::new();

        let keyed = [
            (Provider::DeepL, "DEEPL_API_KEY"),
            (Provider::OpenAi, "OPENAI_API_KEY"),
            (Provider::Gemini, "GEMINI_API_KEY"),
            (Provider::Anthropic, "ANTHROPIC_API_KEY"),
        ];
        for (provider, name) in keyed {
            if let Some(key) = var(name) {
                found.push((provider, Credential::ApiKey(key)));
            }
        }

        if let Some(key) = var("AZURE_API_KEY") {
            let region = var("AZURE_REGION").unwrap_or_else(|| DEFAULT_AZURE_REGION.to_string());
            let endpoint =
                var("AZURE_ENDPOINT").unwrap_or_else(|| DEFAULT_AZURE_ENDPOINT.to_string());
            found.push((Provider::Azure, Credential::azure(key, region, endpoint)));
        }

        if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS") {
            found.push((Provider::GoogleTranslate, Credential::service_account(path)));
        }

        Self::from_entries(found)
    }

    /// Build a store from `(provider, credential)` pairs, skipping invalid ones
    pub fn from_entries(entries: impl IntoIterator<Item = (Provider, Credential)>) -> Self {
        let mut store = Self::new();
        for (provider, credential) in entries {
            if let Err(e) = store.set(provider, credential) {
                warn!("Ignoring credentials for {}: {}", provider, e);
            }
        }
        debug!("Loaded credentials for {} providers", store.len());
        store
    }

    /// Store a credential, replacing any previous one for the provider
    pub fn set(&mut self, provider: Provider, credential: Credential) -> Result<()> {
        let credential = credential.for_provider(provider)?;
        if self.entries.insert(provider, credential).is_some() {
            info!("Replaced credentials for {}", provider);
        } else {
            info!("Set credentials for {}", provider);
        }
        Ok(())
    }

    /// Credential for the provider, if any
    pub fn get(&self, provider: Provider) -> Option<&Credential> {
        self.entries.get(&provider)
    }

    /// Credential for the provider, or a missing-credential error
    pub fn require(&self, provider: Provider) -> Result<&Credential> {
        self.get(provider)
            .ok_or(TranslationError::MissingCredentials { provider })
    }

    /// Remove and return the provider's credential
    pub fn remove(&mut self, provider: Provider) -> Option<Credential> {
        self.entries.remove(&provider)
    }

    /// Whether the provider has a credential
    pub fn contains(&self, provider: Provider) -> bool {
        self.entries.contains_key(&provider)
    }

    /// Providers with credentials, in [`Provider::ALL`] order
    pub fn providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.entries.contains_key(p))
            .collect()
    }

    /// Number of stored credentials
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no credentials are stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
