//! Google Cloud Translation v2 (Basic)
//!
//! Service-account credentials are exchanged for an OAuth access token using
//! a signed JWT assertion; the token is cached until shortly before it expires.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::http::{required, required_str, send_json};
use super::{mismatched, TranslationBackend};
use crate::core::config::TranslatorConfig;
use crate::core::credentials::Credential;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{Provider, ProviderReply};
use crate::core::options::{TextFormat, TranslateOptions};

const TRANSLATION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-translation";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the provider-reported expiry
const TOKEN_EXPIRY_SLACK_SECS: i64 = 60;

/// Fields of a service-account key file the token exchange needs
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

impl ServiceAccountKey {
    async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            TranslationError::ConfigError {
                message: format!("cannot read service account file {}: {}", path.display(), e),
            }
        })?;
        serde_json::from_str(&content).map_err(|e| TranslationError::ConfigError {
            message: format!("invalid service account file {}: {}", path.display(), e),
        })
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Signed RS256 assertion for the JWT bearer grant
    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            iss: &self.client_email,
            scope: TRANSLATION_SCOPE,
            aud: self.token_uri(),
            iat: now.timestamp(),
            exp: now.timestamp() + TOKEN_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            TranslationError::ConfigError {
                message: format!("service account private key is not a valid RSA key: {}", e),
            }
        })?;
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| TranslationError::InternalError(format!("cannot sign JWT: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    path: PathBuf,
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Google Translate backend
pub struct GoogleTranslateBackend {
    client: Client,
    config: Arc<TranslatorConfig>,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Serialize)]
struct TranslateBody<'a> {
    q: &'a str,
    target: &'a str,
    format: TextFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
}

impl GoogleTranslateBackend {
    /// Backend sending requests through `client`
    pub fn new(client: Client, config: Arc<TranslatorConfig>) -> Self {
        Self {
            client,
            config,
            token: Mutex::new(None),
        }
    }

    fn base_url(&self) -> &str {
        self.config.endpoints.google_translate.trim_end_matches('/')
    }

    async fn access_token(&self, path: &Path) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.path == path && token.expires_at > Utc::now() {
                return Ok(token.access_token.clone());
            }
        }

        let key = ServiceAccountKey::load(path).await?;
        let now = Utc::now();
        debug!("Requesting Google access token for {}", key.client_email);

        let form = [("grant_type", JWT_BEARER_GRANT.to_string()), ("assertion", key.assertion(now)?)];
        let body = send_json(
            Provider::GoogleTranslate,
            self.client.post(key.token_uri()).form(&form),
        )
        .await
        .map_err(token_error)?;

        let token: TokenResponse = serde_json::from_value(body).map_err(|e| {
            TranslationError::InvalidResponseError {
                message: format!("unexpected token response: {}", e),
            }
        })?;
        let lifetime = token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS);
        *cached = Some(CachedToken {
            path: path.to_path_buf(),
            access_token: token.access_token.clone(),
            expires_at: now + Duration::seconds(lifetime - TOKEN_EXPIRY_SLACK_SECS),
        });

        info!("Obtained Google access token valid for {}s", lifetime);
        Ok(token.access_token)
    }

    async fn authorize(&self, request: RequestBuilder, credential: &Credential) -> Result<RequestBuilder> {
        match credential {
            Credential::ServiceAccount { path } => {
                let token = self.access_token(path).await?;
                Ok(request.bearer_auth(token))
            }
            Credential::ApiKey(key) => Ok(request.query(&[("key", key)])),
            Credential::Azure { .. } => Err(TranslationError::ConfigError {
                message: "google translate expects a service account file or an API key"
                    .to_string(),
            }),
        }
    }
}

/// A rejected assertion is a credential problem, not a provider fault
fn token_error(err: TranslationError) -> TranslationError {
    match err {
        TranslationError::ApiError {
            provider,
            status: 400,
            message,
        } => TranslationError::AuthenticationError { provider, message },
        other => other,
    }
}

#[async_trait]
impl TranslationBackend for GoogleTranslateBackend {
    fn provider(&self) -> Provider {
        Provider::GoogleTranslate
    }

    async fn translate(
        &self,
        credential: &Credential,
        text: &str,
        options: &TranslateOptions,
    ) -> Result<ProviderReply> {
        let TranslateOptions::GoogleTranslate(options) = options else {
            return Err(mismatched(Provider::GoogleTranslate, options));
        };

        let body = TranslateBody {
            q: text,
            target: &options.target_lang,
            format: options.format,
            source: options.source_lang.as_deref(),
        };
        let request = self.client.post(self.base_url()).json(&body);
        let request = self.authorize(request, credential).await?;

        debug!(
            "Sending translation request to Google Translate (target {})",
            options.target_lang
        );
        let body = send_json(Provider::GoogleTranslate, request).await?;

        let translation = required(Provider::GoogleTranslate, &body, "/data/translations/0")?;
        let text = required_str(Provider::GoogleTranslate, translation, "/translatedText")?;

        Ok(ProviderReply::new(text, translation.clone()))
    }

    async fn validate(&self, credential: &Credential) -> Result<()> {
        let request = self
            .client
            .get(format!("{}/languages", self.base_url()))
            .query(&[("target", "en")]);
        let request = self.authorize(request, credential).await?;
        send_json(Provider::GoogleTranslate, request).await?;
        Ok(())
    }
}
