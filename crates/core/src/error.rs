//! Error types for the PersonaChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Budget overflow, malformed stream frames, and unsupported upload formats
//! have no variant here: they are resolved locally (truncate, skip,
//! placeholder).

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all PersonaChat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Document errors ---
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Terminal / filesystem I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read document at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to extract text from {name}: {reason}")]
    Extraction { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn bounded_errors_convert_with_question_mark() {
        fn read() -> Result<()> {
            Err(DocumentError::Extraction {
                name: "cv.docx".into(),
                reason: "missing body".into(),
            })?
        }
        fn stream() -> Result<()> {
            Err(ProviderError::StreamInterrupted("reset".into()))?
        }
        fn io() -> Result<()> {
            Err(std::io::Error::other("stdin closed"))?
        }

        assert!(matches!(read(), Err(Error::Document(_))));
        assert!(matches!(stream(), Err(Error::Provider(_))));
        let err = io().unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("stdin closed"));
    }

    #[test]
    fn config_error_carries_message() {
        let err = Error::Config {
            message: "no API key configured".into(),
        };
        assert_eq!(err.to_string(), "Configuration error: no API key configured");
    }

    #[test]
    fn document_error_displays_correctly() {
        let err = Error::Document(DocumentError::Read {
            path: PathBuf::from("/tmp/cv.pdf"),
            reason: "permission denied".into(),
        });
        assert!(err.to_string().contains("cv.pdf"));
        assert!(err.to_string().contains("permission denied"));
    }
}
