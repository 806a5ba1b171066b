//! `personachat chat`: Interactive chat mode.

use std::io::Write;
use std::path::PathBuf;

use personachat_agent::ChatSession;
use personachat_core::Result;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use super::{open_session, print_fragment};

/// One line of user input, interpreted.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    /// Blank line
    Empty,
    Exit,
    /// `/upload <paths...>`: replace the document set
    Upload(Vec<PathBuf>),
    /// `/docs`: list loaded documents
    Docs,
    /// `/clear-docs`
    ClearDocs,
    /// `/help`
    Help,
    /// Anything else is sent to the persona
    Message(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            return Self::Exit;
        }

        let mut words = line.split_whitespace();
        match words.next() {
            Some("/upload") => Self::Upload(words.map(PathBuf::from).collect()),
            Some("/docs") => Self::Docs,
            Some("/clear-docs") => Self::ClearDocs,
            Some("/help") => Self::Help,
            _ => Self::Message(line.to_string()),
        }
    }
}

pub async fn run(docs: Vec<PathBuf>) -> Result<()> {
    let mut session = open_session(&docs)?;

    println!();
    println!("  PersonaChat — Interactive Mode");
    println!();
    println!("  Persona:   {}", session.persona().name);
    println!("  Provider:  {}", session.provider_name());
    println!("  Model:     {}", session.settings().model);
    println!("  Documents: {}", session.documents().len());
    println!();
    println!("  Type your message and press Enter. /help lists commands.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Input::parse(&line) {
            Input::Empty => continue,
            Input::Exit => break,
            Input::Help => print_help(),
            Input::Docs => list_documents(&session),
            Input::ClearDocs => {
                session.clear_documents();
                println!("  Documents cleared.");
            }
            Input::Upload(paths) => upload(&mut session, &paths),
            Input::Message(text) => turn(&mut session, &text).await,
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Run one streamed turn, printing fragments as they arrive.
async fn turn(session: &mut ChatSession, text: &str) {
    let mut reply = match session.send(text).await {
        Ok(reply) => reply,
        Err(e) => {
            eprintln!("  [Error] {e}");
            println!();
            return;
        }
    };

    print!("\n  {} > ", session.persona().name);
    while let Some(fragment) = reply.next_fragment().await {
        match fragment {
            Ok(fragment) => print_fragment(&fragment),
            Err(e) => {
                println!();
                eprintln!("  [Error] Reply interrupted: {e}");
                break;
            }
        }
    }
    println!();
    println!();

    session.commit(reply);
}

fn upload(session: &mut ChatSession, paths: &[PathBuf]) {
    if paths.is_empty() {
        println!("  Usage: /upload <path> [path...]");
        return;
    }

    match personachat_documents::load_batch(paths) {
        Ok(documents) => {
            println!("  Loaded {} document(s).", documents.len());
            session.replace_documents(documents);
        }
        Err(e) => eprintln!("  [Error] {e}"),
    }
}

fn list_documents(session: &ChatSession) {
    let documents = session.documents();
    if documents.is_empty() {
        println!("  No documents loaded.");
        return;
    }
    for entry in documents.iter() {
        println!(
            "  - {} ({} words)",
            entry.name,
            entry.text.split_whitespace().count()
        );
    }
}

fn print_help() {
    println!("  /upload <paths...>  Replace the loaded documents");
    println!("  /docs               List loaded documents");
    println!("  /clear-docs         Remove all documents");
    println!("  exit | quit         Leave the chat");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Input::parse("   "), Input::Empty);
        assert_eq!(Input::parse("exit"), Input::Exit);
        assert_eq!(Input::parse("QUIT"), Input::Exit);
        assert_eq!(Input::parse("/docs"), Input::Docs);
        assert_eq!(Input::parse("/clear-docs"), Input::ClearDocs);
        assert_eq!(Input::parse("/help"), Input::Help);
    }

    #[test]
    fn parses_upload_paths() {
        assert_eq!(
            Input::parse("/upload cv.pdf  notes.txt"),
            Input::Upload(vec![PathBuf::from("cv.pdf"), PathBuf::from("notes.txt")])
        );
        assert_eq!(Input::parse("/upload"), Input::Upload(vec![]));
    }

    #[test]
    fn everything_else_is_a_message() {
        assert_eq!(
            Input::parse("  what do you do?  "),
            Input::Message("what do you do?".into())
        );
        // Only exact keywords exit.
        assert_eq!(
            Input::parse("exit strategy?"),
            Input::Message("exit strategy?".into())
        );
        assert_eq!(Input::parse("/unknown"), Input::Message("/unknown".into()));
    }
}
