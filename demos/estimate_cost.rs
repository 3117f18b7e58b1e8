//! 估算翻译成本 (no network access)
//!
//! cargo run --example estimate_cost -- path/to/file.txt

use polytl::{calculate_batch_cost, Provider};

fn main() -> anyhow::Result<()> {
    let content = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => "The quick brown fox jumps over the lazy dog.\nIt was not amused.".to_string(),
    };
    let paragraphs: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    println!("{} paragraphs, {} characters\n", paragraphs.len(), content.chars().count());
    println!("{:<18} {:<26} {:>10} {:>12}", "provider", "model", "units", "cost (USD)");

    for provider in Provider::ALL {
        let estimate = calculate_batch_cost(&paragraphs, provider, None, None)?;
        println!(
            "{:<18} {:<26} {:>10} {:>12.6}",
            provider.as_str(),
            estimate.model,
            format!("{} {}", estimate.units, if provider.is_llm() { "tok" } else { "chr" }),
            estimate.cost
        );
    }

    Ok(())
}
