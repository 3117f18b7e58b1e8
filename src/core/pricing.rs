//! Static rate tables and local cost estimation
//!
//! Rates are USD list prices from each provider's public pricing page. Token
//! counts come from tiktoken; `o200k_base` for GPT-4o era OpenAI models and
//! `cl100k_base` for everything else, which is an approximation for Gemini
//! and Claude.

use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{BillingUnit, CostEstimate, Provider};
use crate::core::options::DEFAULT_TRANSLATION_INSTRUCTIONS;

/// USD per character for character-billed providers
const CHARACTER_RATES: &[(Provider, f64)] = &[
    (Provider::DeepL, 25.0 / 1_000_000.0),
    (Provider::GoogleTranslate, 20.0 / 1_000_000.0),
    (Provider::Azure, 10.0 / 1_000_000.0),
];

/// Pricing and limits for one LLM model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    /// Canonical model id
    pub id: &'static str,
    /// Provider serving the model
    pub provider: Provider,
    /// USD per million input tokens
    pub input_per_million: f64,
    /// USD per million output tokens
    pub output_per_million: f64,
    /// Maximum input tokens
    pub context_window: usize,
}

const fn rate(
    provider: Provider,
    id: &'static str,
    input_per_million: f64,
    output_per_million: f64,
    context_window: usize,
) -> ModelRate {
    ModelRate {
        id,
        provider,
        input_per_million,
        output_per_million,
        context_window,
    }
}

const MODEL_RATES: &[ModelRate] = &[
    rate(Provider::OpenAi, "gpt-4", 30.0, 60.0, 8_192),
    rate(Provider::OpenAi, "gpt-4-32k", 60.0, 120.0, 32_768),
    rate(Provider::OpenAi, "gpt-4-turbo", 10.0, 30.0, 128_000),
    rate(Provider::OpenAi, "gpt-4o", 2.5, 10.0, 128_000),
    rate(Provider::OpenAi, "gpt-4o-mini", 0.15, 0.6, 128_000),
    rate(Provider::OpenAi, "gpt-4.1", 2.0, 8.0, 1_047_576),
    rate(Provider::OpenAi, "gpt-4.1-mini", 0.4, 1.6, 1_047_576),
    rate(Provider::OpenAi, "gpt-3.5-turbo", 0.5, 1.5, 16_385),
    rate(Provider::Gemini, "gemini-pro", 0.5, 1.5, 30_720),
    rate(Provider::Gemini, "gemini-1.0-pro", 0.5, 1.5, 30_720),
    rate(Provider::Gemini, "gemini-1.5-pro", 1.25, 5.0, 2_097_152),
    rate(Provider::Gemini, "gemini-1.5-flash", 0.075, 0.3, 1_048_576),
    rate(Provider::Gemini, "gemini-2.0-flash", 0.1, 0.4, 1_048_576),
    rate(Provider::Anthropic, "claude-3-haiku-20240307", 0.25, 1.25, 200_000),
    rate(Provider::Anthropic, "claude-3-sonnet-20240229", 3.0, 15.0, 200_000),
    rate(Provider::Anthropic, "claude-3-opus-20240229", 15.0, 75.0, 200_000),
    rate(Provider::Anthropic, "claude-3-5-sonnet-20240620", 3.0, 15.0, 200_000),
    rate(Provider::Anthropic, "claude-3-5-sonnet-20241022", 3.0, 15.0, 200_000),
    rate(Provider::Anthropic, "claude-3-5-haiku-20241022", 0.8, 4.0, 200_000),
    rate(Provider::Anthropic, "claude-3-opus-latest", 15.0, 75.0, 200_000),
    rate(Provider::Anthropic, "claude-3-5-sonnet-latest", 3.0, 15.0, 200_000),
    rate(Provider::Anthropic, "claude-3-5-haiku-latest", 0.8, 4.0, 200_000),
];

/// Default model per LLM provider
pub fn default_model(provider: Provider) -> Option<&'static str> {
    match provider {
        Provider::OpenAi => Some("gpt-4"),
        Provider::Gemini => Some("gemini-pro"),
        Provider::Anthropic => Some("claude-3-haiku-20240307"),
        _ => None,
    }
}

/// Known models for a provider
pub fn models(provider: Provider) -> impl Iterator<Item = &'static ModelRate> {
    MODEL_RATES.iter().filter(move |m| m.provider == provider)
}

/// Resolve a model id to its rate entry.
///
/// Exact ids win; otherwise the longest known id followed by a `-` suffix
/// (so `gpt-4o-2024-08-06` resolves to `gpt-4o`, `gpt-4-0613` to `gpt-4`,
/// but `gpt-4.5-preview` is unknown).
pub fn resolve_model(provider: Provider, model: &str) -> Option<&'static ModelRate> {
    let model = model.trim();
    if let Some(exact) = models(provider).find(|m| m.id == model) {
        return Some(exact);
    }
    models(provider)
        .filter(|m| is_dated_variant(model, m.id))
        .max_by_key(|m| m.id.len())
}

/// `model` is `id` plus a `-`-separated suffix such as a date or `-latest`
fn is_dated_variant(model: &str, id: &str) -> bool {
    model
        .strip_prefix(id)
        .is_some_and(|rest| rest.starts_with('-'))
}

fn character_rate(provider: Provider) -> Option<f64> {
    CHARACTER_RATES
        .iter()
        .find(|(p, _)| *p == provider)
        .map(|(_, rate)| *rate)
}

static CL100K: OnceLock<CoreBPE> = OnceLock::new();
static O200K: OnceLock<CoreBPE> = OnceLock::new();

fn load_encoding(
    cell: &'static OnceLock<CoreBPE>,
    load: fn() -> anyhow::Result<CoreBPE>,
) -> Result<&'static CoreBPE> {
    if let Some(bpe) = cell.get() {
        return Ok(bpe);
    }
    let bpe = load()?;
    Ok(cell.get_or_init(|| bpe))
}

fn encoding_for(model: &str) -> Result<&'static CoreBPE> {
    let o200k = ["gpt-4o", "gpt-4.1", "gpt-4.5", "o1", "o3"];
    if o200k.iter().any(|family| model.starts_with(family)) {
        load_encoding(&O200K, tiktoken_rs::o200k_base)
    } else {
        load_encoding(&CL100K, tiktoken_rs::cl100k_base)
    }
}

/// Count tokens of `text` with the encoding used for `model`
pub fn count_tokens(text: &str, model: &str) -> Result<usize> {
    let bpe = encoding_for(model)?;
    Ok(bpe.encode_with_special_tokens(text).len())
}

/// Estimate the cost of translating one text
pub fn calculate_cost(
    text: &str,
    provider: Provider,
    model: Option<&str>,
    instructions: Option<&str>,
) -> Result<CostEstimate> {
    calculate_batch_cost(&[text], provider, model, instructions)
}

/// Estimate the cost of translating several texts with the same settings.
///
/// Instructions are counted once per text, as each text is sent on its own.
pub fn calculate_batch_cost<S: AsRef<str>>(
    texts: &[S],
    provider: Provider,
    model: Option<&str>,
    instructions: Option<&str>,
) -> Result<CostEstimate> {
    if let Some(per_char) = character_rate(provider) {
        let units: usize = texts.iter().map(|t| t.as_ref().chars().count()).sum();
        return Ok(CostEstimate {
            units,
            unit_kind: BillingUnit::Characters,
            cost: units as f64 * per_char,
            model: provider.to_string(),
        });
    }

    let requested = model
        .or_else(|| default_model(provider))
        .ok_or_else(|| TranslationError::InternalError(format!("no default model for {}", provider)))?;
    let rate = resolve_model(provider, requested).ok_or_else(|| TranslationError::InvalidSettings {
        provider,
        message: format!("no pricing known for model '{}'", requested),
    })?;

    let instructions = instructions.unwrap_or(DEFAULT_TRANSLATION_INSTRUCTIONS);
    let mut input_tokens = 0;
    let mut output_tokens = 0;
    for text in texts {
        let text = text.as_ref();
        input_tokens += count_tokens(&format!("{}\n{}", instructions, text), rate.id)?;
        output_tokens += count_tokens(text, rate.id)?;
    }

    let cost = input_tokens as f64 * rate.input_per_million / 1_000_000.0
        + output_tokens as f64 * rate.output_per_million / 1_000_000.0;

    Ok(CostEstimate {
        units: input_tokens,
        unit_kind: BillingUnit::Tokens,
        cost,
        model: rate.id.to_string(),
    })
}

/// Reject input that cannot fit the model's context window.
///
/// Unknown models are passed through, the provider will judge them.
pub fn check_context_window(
    provider: Provider,
    model: &str,
    instructions: &str,
    text: &str,
) -> Result<()> {
    let Some(rate) = resolve_model(provider, model) else {
        return Ok(());
    };
    let tokens = count_tokens(&format!("{}\n{}", instructions, text), rate.id)?;
    if tokens > rate.context_window {
        return Err(TranslationError::InvalidSettings {
            provider,
            message: format!(
                "input is {} tokens, which exceeds the {} token context window of {}",
                tokens, rate.context_window, rate.id
            ),
        });
    }
    Ok(())
}
