//! Context assembly for the downstream answer generator.
//!
//! Combines the best-ranked chunk text with a bounded transcript of recent
//! conversation turns into a [`ContextBundle`]. The bundle is the whole
//! contract with the generator; this crate never calls one.

use serde::Serialize;

use crate::models::ConversationTurn;
use crate::params::RetrievalParams;
use crate::retriever::RankedChunk;

/// Placeholder used when the history window is empty.
pub const NO_HISTORY: &str = "No prior conversation history.";

/// Separator between chunk texts when more than one chunk is used.
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// Everything the generator receives for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextBundle {
    pub context_text: String,
    pub history_text: String,
    pub question_text: String,
}

/// Builds [`ContextBundle`]s under a fixed policy.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_history_turns: usize,
    context_chunks: usize,
}

impl ContextAssembler {
    /// `context_chunks` is clamped to at least 1.
    pub fn new(max_history_turns: usize, context_chunks: usize) -> Self {
        Self {
            max_history_turns,
            context_chunks: context_chunks.max(1),
        }
    }

    /// Assemble a bundle.
    ///
    /// `top_chunks` must be in rank order (closest first). The first
    /// `context_chunks` of them become the context text; `history` must be
    /// oldest first, and only its last `max_history_turns` entries are used.
    pub fn assemble(
        &self,
        question: &str,
        top_chunks: &[RankedChunk],
        history: &[ConversationTurn],
    ) -> ContextBundle {
        let context_text = top_chunks
            .iter()
            .take(self.context_chunks)
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);

        ContextBundle {
            context_text,
            history_text: format_history(history, self.max_history_turns),
            question_text: question.to_string(),
        }
    }
}

impl From<&RetrievalParams> for ContextAssembler {
    fn from(params: &RetrievalParams) -> Self {
        Self::new(params.max_history_turns, params.context_chunks)
    }
}

/// Render the last `max_turns` turns as `"{sender}: {message}"` lines,
/// oldest first. Returns [`NO_HISTORY`] when the window is empty.
pub fn format_history(history: &[ConversationTurn], max_turns: usize) -> String {
    let start = history.len().saturating_sub(max_turns);
    let window = &history[start..];
    if window.is_empty() {
        return NO_HISTORY.to_string();
    }
    window
        .iter()
        .map(|t| format!("{}: {}", t.sender, t.message))
        .collect::<Vec<_>>()
        .join("\n")
}
