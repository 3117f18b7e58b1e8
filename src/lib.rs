//! polytl - one async translation client for DeepL, Google Translate, Azure,
//! OpenAI, Gemini and Anthropic
//!
//! A [`Translator`] owns its credentials and one pooled HTTP client. Every
//! call takes a [`TranslateOptions`] value whose variant picks the provider,
//! and every provider result is normalized into a [`Translation`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod core;
pub mod providers;

// Re-export key types for convenience
pub use crate::core::{
    client::{Translator, Validation},
    config::{Endpoints, TranslatorConfig},
    credentials::{Credential, CredentialStore},
    errors::{ErrorKind, Result, TranslationError},
    models::{BillingUnit, CostEstimate, Provider, ProviderReply, ResponseType, Translation},
    options::{
        AnthropicOptions, AzureOptions, ChatMessage, DeepLOptions, Formality, GeminiOptions,
        GoogleOptions, MessageRole, OpenAiOptions, SplitSentences, TagHandling, TextFormat,
        TranslateOptions, DEFAULT_TRANSLATION_INSTRUCTIONS,
    },
    policy::{CallPolicy, ConcurrencyLimiter, RetryPolicy},
    pricing::{calculate_batch_cost, calculate_cost},
};
pub use providers::TranslationBackend;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
