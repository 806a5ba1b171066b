//! `personachat status`: Show the effective configuration.

use personachat_config::AppConfig;
use personachat_core::Result;
use personachat_core::persona::Persona;
use personachat_core::provider::Provider;
use personachat_providers::OpenAiCompatProvider;

pub async fn run() -> Result<()> {
    let config = AppConfig::load()?;
    let persona = Persona::load(&config.persona.source());

    println!("PersonaChat Status");
    println!("==================");
    println!("  Config file:  {}", AppConfig::config_path().display());
    println!("  Provider:     {}", config.provider);
    println!("  Base URL:     {}", config.base_url);
    println!("  Model:        {}", config.model);
    println!(
        "  API key:      {}",
        if config.has_api_key() { "[REDACTED]" } else { "not set" }
    );
    match config.temperature {
        Some(t) => println!("  Temperature:  {t}"),
        None => println!("  Temperature:  provider default"),
    }
    println!("  Word budget:  {}", config.context.word_budget);
    println!(
        "  Doc share:    {:.0}%",
        config.context.document_share * 100.0
    );
    println!("  Persona:      {} ({})", persona.name, persona.source);

    match OpenAiCompatProvider::from_config(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  Endpoint:     reachable"),
            Ok(false) => println!("  Endpoint:     responded with an error (check the API key)"),
            Err(e) => println!("  Endpoint:     unreachable ({e})"),
        },
        Err(_) => println!("  Endpoint:     not checked (no API key)"),
    }

    if AppConfig::config_path().exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file — run `personachat onboard` first");
    }

    Ok(())
}
