//! CLI command implementations.

pub mod ask;
pub mod chat;
pub mod onboard;
pub mod status;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use personachat_agent::ChatSession;
use personachat_config::AppConfig;
use personachat_core::{Error, Result};
use personachat_providers::OpenAiCompatProvider;
use tracing::debug;

/// Load config, connect the provider, and open a session with `docs` loaded.
pub(crate) fn open_session(docs: &[PathBuf]) -> Result<ChatSession> {
    let config = AppConfig::load()?;
    debug!(?config, "Loaded configuration");

    // Check for API key early: give a clear error
    if !config.has_api_key() {
        print_missing_key_help();
        return Err(Error::Config {
            message: "no API key found, see above for setup instructions".into(),
        });
    }

    let provider = OpenAiCompatProvider::from_config(&config)?;
    let mut session = ChatSession::from_config(&config, Arc::new(provider));

    if !docs.is_empty() {
        session.replace_documents(personachat_documents::load_batch(docs)?);
    }

    Ok(session)
}

fn print_missing_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    PERSONACHAT_API_KEY=...   (generic)");
    eprintln!("    OPENROUTER_API_KEY=...    (recommended)");
    eprintln!("    OPENAI_API_KEY=...        (for OpenAI direct)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_path().display());
    eprintln!();
}

/// Print a fragment as soon as it arrives.
pub(crate) fn print_fragment(fragment: &str) {
    print!("{fragment}");
    // A failed flush only delays output.
    let _ = std::io::stdout().flush();
}
