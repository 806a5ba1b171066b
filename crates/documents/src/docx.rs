//! DOCX paragraph extraction.
//!
//! A `.docx` file is a zip archive; the body lives in `word/document.xml`
//! as `<w:p>` paragraphs made of `<w:r>` runs holding `<w:t>` text.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;

const BODY_PART: &str = "word/document.xml";

/// Extract paragraph text, one paragraph per line.
pub fn extract_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;

    let mut xml = String::new();
    archive
        .by_name(BODY_PART)
        .map_err(|e| format!("{BODY_PART}: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;

    Ok(paragraphs(&xml)?.join("\n"))
}

fn paragraphs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => current.clear(),
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => out.push(std::mem::take(&mut current)),
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"p" => out.push(String::new()),
                b"tab" if in_run => current.push('\t'),
                b"br" | b"cr" if in_run => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("malformed {BODY_PART}: {e}")),
            _ => {}
        }
    }

    Ok(out)
}
