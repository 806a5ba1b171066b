//! Text extraction for uploaded documents.
//!
//! Turns an uploaded artifact into the plain text that the context
//! assembler injects as grounding material:
//!
//! | Kind | Detected by | Extraction |
//! |------|-------------|------------|
//! | Plain text | `text/plain`, `text/markdown`, `.txt`, `.md` | UTF-8 (lossy) |
//! | PDF | `application/pdf`, `.pdf` | page text, pages joined by `\n` (feature `pdf`) |
//! | DOCX | word-processing MIME type, `.docx` | paragraph text joined by `\n` (feature `docx`) |
//!
//! Anything else becomes the inline placeholder
//! `Uploaded file type: <type>. File not supported.` Extraction never
//! fails a session: a broken file of a supported kind also becomes a
//! placeholder that names the file and the reason.

use std::path::{Path, PathBuf};

use personachat_core::document::DocumentContext;
use personachat_core::error::DocumentError;
use tracing::{debug, warn};

#[cfg(feature = "docx")]
mod docx;
#[cfg(feature = "pdf")]
mod pdf;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The format of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
    /// Carries the type label shown in the placeholder.
    Unsupported(String),
}

impl DocumentKind {
    /// Detect the kind from a declared media type, falling back to the
    /// filename extension when no media type is known.
    pub fn detect(name: &str, media_type: Option<&str>) -> Self {
        if let Some(media_type) = media_type {
            return match media_type {
                "text/plain" | "text/markdown" => Self::PlainText,
                PDF_MEDIA_TYPE => Self::Pdf,
                DOCX_MEDIA_TYPE => Self::Docx,
                other => Self::Unsupported(other.to_string()),
            };
        }

        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("txt" | "md" | "text") => Self::PlainText,
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Docx,
            Some(ext) => Self::Unsupported(format!(".{ext}")),
            None => Self::Unsupported("unknown".into()),
        }
    }

    /// Label used in diagnostics and placeholders.
    pub fn label(&self) -> &str {
        match self {
            Self::PlainText => "text/plain",
            Self::Pdf => PDF_MEDIA_TYPE,
            Self::Docx => DOCX_MEDIA_TYPE,
            Self::Unsupported(label) => label,
        }
    }
}

/// Placeholder text for a format that cannot be extracted.
pub fn unsupported_placeholder(label: &str) -> String {
    format!("Uploaded file type: {label}. File not supported.")
}

/// Extract text, falling back to an inline placeholder on any failure.
pub fn extract(name: &str, media_type: Option<&str>, bytes: &[u8]) -> String {
    match try_extract(name, media_type, bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(document = %name, error = %e, "Document extraction failed");
            format!("[Could not extract text from {name}: {e}]")
        }
    }
}

/// Extract text, reporting failures of supported formats as errors.
///
/// Unsupported formats are not an error: they yield the placeholder.
pub fn try_extract(
    name: &str,
    media_type: Option<&str>,
    bytes: &[u8],
) -> Result<String, DocumentError> {
    let kind = DocumentKind::detect(name, media_type);
    debug!(document = %name, kind = %kind.label(), bytes = bytes.len(), "Extracting document");

    match kind {
        DocumentKind::PlainText => Ok(String::from_utf8_lossy(bytes)
            .trim_start_matches('\u{feff}')
            .to_string()),
        DocumentKind::Pdf => extract_pdf(name, bytes),
        DocumentKind::Docx => extract_docx(name, bytes),
        DocumentKind::Unsupported(label) => Ok(unsupported_placeholder(&label)),
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(name: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    pdf::extract_text(bytes).map_err(|reason| DocumentError::Extraction {
        name: name.to_string(),
        reason,
    })
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_name: &str, _bytes: &[u8]) -> Result<String, DocumentError> {
    Ok(unsupported_placeholder(PDF_MEDIA_TYPE))
}

#[cfg(feature = "docx")]
fn extract_docx(name: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    docx::extract_text(bytes).map_err(|reason| DocumentError::Extraction {
        name: name.to_string(),
        reason,
    })
}

#[cfg(not(feature = "docx"))]
fn extract_docx(_name: &str, _bytes: &[u8]) -> Result<String, DocumentError> {
    Ok(unsupported_placeholder(DOCX_MEDIA_TYPE))
}

/// Read one file from disk and extract its text.
///
/// Returns `(filename, text)`. Only I/O failures are errors.
pub fn load_file(path: &Path) -> Result<(String, String), DocumentError> {
    let bytes = std::fs::read(path).map_err(|e| DocumentError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .unwrap_or_else(|| path.display().to_string());

    let text = extract(&name, None, &bytes);
    Ok((name, text))
}

/// Build a fresh document context from a batch of files.
///
/// Files sharing a filename collapse to one entry (last one wins).
pub fn load_batch(paths: &[PathBuf]) -> Result<DocumentContext, DocumentError> {
    let mut ctx = DocumentContext::new();
    for path in paths {
        let (name, text) = load_file(path)?;
        ctx.insert(name, text);
    }
    debug!(documents = ctx.len(), "Loaded document batch");
    Ok(ctx)
}
