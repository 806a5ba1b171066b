//! Document context: text extracted from the user's uploaded files.
//!
//! Keyed by filename (unique per session) and kept in upload order so
//! the assembled prompt is stable across turns. A new upload batch
//! replaces the whole context; there is no incremental merge.

use serde::{Deserialize, Serialize};

/// One uploaded document after text extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Original filename as uploaded.
    pub name: String,
    /// Extracted plain text (or an inline placeholder for unsupported files).
    pub text: String,
}

/// Ordered mapping of filename → extracted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContext {
    entries: Vec<DocumentEntry>,
}

impl DocumentContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document. A repeated name overwrites the earlier text in
    /// place, keeping its original position.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        let text = text.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.text = text,
            None => self.entries.push(DocumentEntry { name, text }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, T: Into<String>> FromIterator<(N, T)> for DocumentContext {
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        let mut ctx = Self::new();
        for (name, text) in iter {
            ctx.insert(name, text);
        }
        ctx
    }
}
