//! Size estimation for context budgeting.
//!
//! Sizes are approximated by whitespace-delimited word count. The
//! [`SizeEstimator`] trait is the seam for swapping in an exact tokenizer;
//! the assembler only ever talks to the trait.

use personachat_core::message::Message;

/// Measures and truncates text in budget units.
pub trait SizeEstimator: Send + Sync {
    /// Size of `text` in budget units.
    fn estimate(&self, text: &str) -> usize;

    /// The longest prefix of `text` that is at most `limit` units.
    fn truncate(&self, text: &str, limit: usize) -> String;

    /// Size of a message. Only the content counts; there is no per-message
    /// overhead in word accounting.
    fn estimate_message(&self, message: &Message) -> usize {
        self.estimate(&message.content)
    }
}

/// The default estimator: one unit per whitespace-delimited word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCount;

impl SizeEstimator for WordCount {
    fn estimate(&self, text: &str) -> usize {
        count_words(text)
    }

    /// Keeps the first `limit` words, re-joined with single spaces.
    fn truncate(&self, text: &str, limit: usize) -> String {
        text.split_whitespace()
            .take(limit)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Count whitespace-delimited words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
