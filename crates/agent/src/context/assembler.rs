//! Context assembly: decides what fits in one bounded request.
//!
//! The assembled list is always:
//!
//! ```text
//! [system: persona + "\n\n" + document blob]  [history, oldest → newest]
//! ```
//!
//! # Budget policy
//!
//! Document text gets a fixed share of the budget, reserved *before*
//! history is considered:
//!
//! 1. Each document renders as a `Document: <name>` header line followed by
//!    its text. The concatenation is the document blob.
//! 2. The blob's allowance is `floor(total * document_share)`, capped so
//!    that persona + allowance never exceeds the total.
//! 3. A blob over its allowance is cut to `allowance - 1` words plus the
//!    one-word marker [`TRUNCATION_MARKER`]. An allowance too small for one
//!    word and the marker drops the blob entirely; the drop shows up in
//!    [`AssemblyMetadata::drops`].
//! 4. History fills whatever the system message left, newest first, whole
//!    messages only, stopping at the first message that does not fit.
//!
//! The persona is never trimmed. If it alone exceeds the budget the result
//! holds just the persona.
//!
//! # Determinism
//!
//! Assembly is deterministic: identical inputs always produce identical
//! outputs, including the id and timestamp of the generated system
//! message. Overflow is handled by truncation; assembly cannot fail.

use crate::context::estimate::{SizeEstimator, WordCount};
use personachat_config::ContextConfig;
use personachat_core::document::DocumentContext;
use personachat_core::message::{Conversation, Message, Role};
use personachat_core::persona::Persona;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Appended to a document blob that was cut short.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Id given to the generated system message.
pub const SYSTEM_MESSAGE_ID: &str = "assembled-system";

// ── Types ─────────────────────────────────────────────────────────────────

/// Word budget configuration.
#[derive(Debug, Clone, Copy)]
pub struct ContextBudget {
    /// Maximum approximate size of the whole assembled context.
    pub total: usize,
    /// Fraction of `total` reserved for document text (0.0–1.0].
    pub document_share: f32,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            total: 10_000,
            document_share: 0.75,
        }
    }
}

impl ContextBudget {
    pub fn new(total: usize, document_share: f32) -> Self {
        Self {
            total,
            document_share,
        }
    }

    /// Budget taken from the `[context]` section of the configuration.
    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.word_budget, config.document_share)
    }

    /// The document share in words, before the persona cap.
    pub fn document_allowance(&self) -> usize {
        let share = f64::from(self.document_share.clamp(0.0, 1.0));
        (self.total as f64 * share).floor() as usize
    }
}

/// All inputs required by the assembler for a single request.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    /// Persona prompt source.
    pub persona: &'a Persona,
    /// Documents uploaded in this session.
    pub documents: &'a DocumentContext,
    /// Conversation history, including the user message being answered.
    pub conversation: &'a Conversation,
}

/// The assembled context, ready for a provider request.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// System message first, then the included history in chronological order.
    pub messages: Vec<Message>,
    /// Assembly metadata (word counts, drops, utilization).
    pub metadata: AssemblyMetadata,
}

impl AssembledContext {
    /// The leading system message.
    pub fn system_message(&self) -> &Message {
        &self.messages[0]
    }

    /// The history messages that made it into the context.
    pub fn history(&self) -> &[Message] {
        &self.messages[1..]
    }
}

/// Detailed metadata about the assembly process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Total size of the assembled context.
    pub total_words: usize,
    /// Configured budget.
    pub budget: usize,
    /// Budget utilization percentage.
    pub utilization_pct: f32,
    /// Whether the document blob was cut short.
    pub documents_truncated: bool,
    /// Per-layer statistics.
    pub per_layer: Vec<LayerStats>,
    /// Items dropped from each layer.
    pub drops: Vec<DropInfo>,
}

impl AssemblyMetadata {
    pub fn layer(&self, name: &str) -> Option<&LayerStats> {
        self.per_layer.iter().find(|l| l.name == name)
    }
}

/// Statistics for a single context layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerStats {
    /// Layer name.
    pub name: String,
    /// Words consumed by this layer.
    pub words: usize,
    /// Items included (whole or in part) after budget trimming.
    pub items_included: usize,
    /// Total items available before trimming.
    pub items_total: usize,
}

/// Information about content dropped from a layer during budget enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropInfo {
    /// Which layer.
    pub layer: String,
    /// Number of items dropped entirely.
    pub items_dropped: usize,
    /// Words of dropped content.
    pub words_dropped: usize,
    /// Reason for dropping.
    pub reason: String,
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Stateless, so one instance can be reused.
#[derive(Debug, Clone)]
pub struct ContextAssembler<E: SizeEstimator = WordCount> {
    budget: ContextBudget,
    estimator: E,
}

impl ContextAssembler<WordCount> {
    /// Create a new assembler with the given budget and word counting.
    pub fn new(budget: ContextBudget) -> Self {
        Self::with_estimator(budget, WordCount)
    }
}

impl<E: SizeEstimator> ContextAssembler<E> {
    /// Create an assembler with a custom size estimator.
    pub fn with_estimator(budget: ContextBudget, estimator: E) -> Self {
        Self { budget, estimator }
    }

    /// Assemble the message list for one request.
    pub fn assemble(&self, input: &AssemblyInput<'_>) -> AssembledContext {
        let total = self.budget.total;
        let mut stats: Vec<LayerStats> = Vec::new();
        let mut drops: Vec<DropInfo> = Vec::new();

        // ── Layer 1: Persona (always included, never trimmed) ─────────────
        let persona = &input.persona.prompt;
        let persona_words = self.estimator.estimate(persona);
        if persona_words > total {
            warn!(persona_words, budget = total, "Persona prompt alone exceeds the context budget");
        }
        stats.push(LayerStats {
            name: "persona".into(),
            words: persona_words,
            items_included: 1,
            items_total: 1,
        });

        // ── Layer 2: Documents (fixed share, reserved before history) ─────
        let allowance = self
            .budget
            .document_allowance()
            .min(total.saturating_sub(persona_words));
        let (doc_section, doc_stats, doc_drop) =
            self.render_document_layer(input.documents, allowance);
        let documents_truncated = doc_drop.is_some() && doc_stats.words > 0;
        stats.push(doc_stats);
        if let Some(d) = doc_drop {
            drops.push(d);
        }

        let base = if doc_section.is_empty() {
            persona.clone()
        } else {
            format!("{persona}\n\n{doc_section}")
        };
        let base_words = self.estimator.estimate(&base);

        // ── Layer 3: Conversation History ─────────────────────────────────
        let (history, hist_stats, hist_drop) =
            self.render_history_layer(input.conversation, total.saturating_sub(base_words));
        stats.push(hist_stats);
        if let Some(d) = hist_drop {
            drops.push(d);
        }

        // ── Build message list: system first, then history ────────────────
        let system = Message {
            id: SYSTEM_MESSAGE_ID.into(),
            role: Role::System,
            content: base,
            timestamp: input.conversation.created_at,
        };
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(system);
        messages.extend(history);

        let total_words = base_words + stats.last().map_or(0, |s| s.words);
        let utilization_pct = if total == 0 {
            0.0
        } else {
            (total_words as f32 / total as f32) * 100.0
        };

        debug!(
            total_words,
            budget = total,
            history_included = messages.len() - 1,
            documents_truncated,
            "Assembled context"
        );

        AssembledContext {
            messages,
            metadata: AssemblyMetadata {
                total_words,
                budget: total,
                utilization_pct,
                documents_truncated,
                per_layer: stats,
                drops,
            },
        }
    }

    // ── Private layer renderers ───────────────────────────────────────────

    /// Render every document as a header line followed by its text.
    fn document_blob(documents: &DocumentContext) -> String {
        let mut blob = String::new();
        for entry in documents.iter() {
            blob.push_str("Document: ");
            blob.push_str(&entry.name);
            blob.push('\n');
            blob.push_str(&entry.text);
            blob.push('\n');
        }
        blob
    }

    fn render_document_layer(
        &self,
        documents: &DocumentContext,
        allowance: usize,
    ) -> (String, LayerStats, Option<DropInfo>) {
        let layer = "documents";
        if documents.is_empty() {
            return (String::new(), Self::empty_stats(layer, 0), None);
        }

        let blob = Self::document_blob(documents);
        let blob_words = self.estimator.estimate(&blob);

        if blob_words <= allowance {
            return (
                blob,
                LayerStats {
                    name: layer.into(),
                    words: blob_words,
                    items_included: documents.len(),
                    items_total: documents.len(),
                },
                None,
            );
        }

        let marker_words = self.estimator.estimate(TRUNCATION_MARKER);
        if allowance <= marker_words {
            warn!(
                documents = documents.len(),
                words = blob_words,
                "No room left for document context, omitting it"
            );
            return (
                String::new(),
                Self::empty_stats(layer, documents.len()),
                Some(DropInfo {
                    layer: layer.into(),
                    items_dropped: documents.len(),
                    words_dropped: blob_words,
                    reason: "No word budget left for document context".into(),
                }),
            );
        }

        let keep = allowance - marker_words;
        let kept = self.estimator.truncate(&blob, keep);
        let section = format!("{kept}\n{TRUNCATION_MARKER}");
        let used = self.estimator.estimate(&section);

        // A document counts as included when at least its header survived.
        let mut start = 0;
        let mut included = 0;
        for entry in documents.iter() {
            if start < keep {
                included += 1;
            }
            start += self
                .estimator
                .estimate(&format!("Document: {}\n{}\n", entry.name, entry.text));
        }

        warn!(
            words = blob_words,
            allowance,
            "Document context truncated to fit its budget share"
        );

        (
            section,
            LayerStats {
                name: layer.into(),
                words: used,
                items_included: included,
                items_total: documents.len(),
            },
            Some(DropInfo {
                layer: layer.into(),
                items_dropped: documents.len() - included,
                words_dropped: blob_words.saturating_sub(keep),
                reason: "Document text truncated to its budget share".into(),
            }),
        )
    }

    fn render_history_layer(
        &self,
        conversation: &Conversation,
        budget: usize,
    ) -> (Vec<Message>, LayerStats, Option<DropInfo>) {
        let layer = "conversation_history";
        let messages = &conversation.messages;
        if messages.is_empty() {
            return (Vec::new(), Self::empty_stats(layer, 0), None);
        }

        let mut used = 0;
        let mut included = Vec::new();
        let mut total = 0;
        let mut dropped = 0;
        let mut dropped_words = 0;
        let mut cut = false;

        // Newest → oldest. Once one message does not fit, everything older
        // is dropped too. System messages are skipped: the assembled
        // system message is the only one. No budget left means no history,
        // not even empty messages.
        for msg in messages.iter().rev() {
            if msg.role == Role::System {
                continue;
            }
            total += 1;
            let msg_words = self.estimator.estimate_message(msg);
            if !cut && budget > 0 && used + msg_words <= budget {
                included.push(msg.clone());
                used += msg_words;
            } else {
                cut = true;
                dropped += 1;
                dropped_words += msg_words;
            }
        }

        // Reverse to restore chronological order.
        included.reverse();

        let included_count = included.len();
        (
            included,
            LayerStats {
                name: layer.into(),
                words: used,
                items_included: included_count,
                items_total: total,
            },
            Self::maybe_drop(
                layer,
                dropped,
                dropped_words,
                "Oldest turns dropped (sliding window)",
            ),
        )
    }

    // ── Helpers ────────────────────────────────────────────────────────────

    fn empty_stats(layer: &str, total: usize) -> LayerStats {
        LayerStats {
            name: layer.into(),
            words: 0,
            items_included: 0,
            items_total: total,
        }
    }

    fn maybe_drop(layer: &str, count: usize, words: usize, reason: &str) -> Option<DropInfo> {
        if count > 0 {
            Some(DropInfo {
                layer: layer.into(),
                items_dropped: count,
                words_dropped: words,
                reason: reason.into(),
            })
        } else {
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
