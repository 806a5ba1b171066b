//! `personachat ask`: Send one message and stream the reply to stdout.

use std::path::PathBuf;

use personachat_core::Result;

use super::{open_session, print_fragment};

pub async fn run(message: String, docs: Vec<PathBuf>) -> Result<()> {
    let mut session = open_session(&docs)?;

    let result = session.ask(&message, print_fragment).await;
    println!();

    result?;
    Ok(())
}
