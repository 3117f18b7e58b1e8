//! Translate one sentence with every provider that has credentials in the environment
//!
//! cargo run --example translate -- "Guten Morgen, wie geht es dir?"

use dotenvy::dotenv;
use polytl::{CredentialStore, Provider, TranslateOptions, Translator, TranslatorConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("polytl={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Guten Morgen, wie geht es dir?".to_string());

    let translator =
        Translator::new(TranslatorConfig::default())?.with_credentials(CredentialStore::from_env());
    let configured = translator.credentials().providers();
    if configured.is_empty() {
        println!("No provider credentials found. Set e.g. DEEPL_API_KEY or OPENAI_API_KEY.");
        return Ok(());
    }

    println!("=== {} ===", text);
    for provider in configured {
        let (valid, err) = translator.validate_credentials_async(provider).await?;
        if !valid {
            let reason = err.map(|e| e.to_string()).unwrap_or_default();
            println!("{:<18} credentials rejected: {}", provider.as_str(), reason);
            continue;
        }

        let options = TranslateOptions::for_provider(provider);
        match translator.translate_async(&text, &options).await {
            Ok(translation) => println!(
                "{:<18} {}",
                provider.as_str(),
                translation.as_text().unwrap_or_default()
            ),
            Err(e) => println!("{:<18} failed: {}", provider.as_str(), e),
        }
    }

    let estimate = translator.calculate_cost(&text, Provider::OpenAi, None, None)?;
    println!(
        "\nOpenAI ({}) would bill about {} {} for ${:.6}",
        estimate.model, estimate.units, estimate.unit_kind, estimate.cost
    );

    Ok(())
}
