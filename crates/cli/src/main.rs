//! PersonaChat CLI: the main entry point.
//!
//! Commands:
//! - `chat`    : Interactive chat with the persona
//! - `ask`     : Send a single message and print the streamed reply
//! - `onboard` : Write a default config file
//! - `status`  : Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "personachat",
    about = "PersonaChat: a persona chat assistant grounded in your documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the persona interactively
    Chat {
        /// Documents to load before the first message (repeatable)
        #[arg(short, long = "doc", value_name = "PATH")]
        docs: Vec<PathBuf>,
    },

    /// Send a single message and print the reply
    Ask {
        /// The message to send
        message: String,

        /// Documents to ground the reply in (repeatable)
        #[arg(short, long = "doc", value_name = "PATH")]
        docs: Vec<PathBuf>,
    },

    /// Initialize configuration
    Onboard,

    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so the streamed reply on stdout stays clean.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat { docs } => commands::chat::run(docs).await?,
        Commands::Ask { message, docs } => commands::ask::run(message, docs).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_docs() {
        let cli = Cli::try_parse_from([
            "personachat",
            "chat",
            "--doc",
            "cv.pdf",
            "-d",
            "notes.txt",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat { docs } => {
                assert_eq!(docs, vec![PathBuf::from("cv.pdf"), PathBuf::from("notes.txt")]);
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn parses_ask_with_global_verbose() {
        let cli = Cli::try_parse_from(["personachat", "ask", "hello there", "--verbose"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Ask { message, docs } => {
                assert_eq!(message, "hello there");
                assert!(docs.is_empty());
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn ask_requires_message() {
        assert!(Cli::try_parse_from(["personachat", "ask"]).is_err());
    }
}
