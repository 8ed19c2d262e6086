//! Overlapping word-window chunker.
//!
//! Splits extracted document text into [`Chunk`]s of `chunk_size`
//! whitespace-delimited words, each window starting `chunk_size - overlap`
//! words after the previous one.
//!
//! # Algorithm
//!
//! 1. Validate `0 <= overlap < chunk_size` (fail fast, never loop).
//! 2. Split text on Unicode whitespace.
//! 3. Emit `words[start..start + chunk_size]` joined by single spaces.
//! 4. Stop once a window reaches the last word; otherwise advance `start`
//!    by the stride and repeat.
//!
//! Consecutive chunks share exactly `overlap` words, so dropping the first
//! `overlap` words of every chunk after the first and concatenating
//! reconstructs the original word sequence.
//!
//! # Example
//!
//! ```rust
//! use notebook_rag_core::chunk::chunk_words;
//! use notebook_rag_core::params::ChunkingParams;
//!
//! let params = ChunkingParams::new(3, 1).unwrap();
//! let chunks = chunk_words("apple banana cherry date elderberry", &params).unwrap();
//! assert_eq!(chunks, vec!["apple banana cherry", "cherry date elderberry"]);
//! ```

use crate::error::Result;
use crate::models::Chunk;
use crate::params::ChunkingParams;

/// Split text into overlapping word windows.
///
/// Empty or whitespace-only text yields an empty vector. The final window
/// may hold fewer than `chunk_size` words.
///
/// # Errors
///
/// [`RagError::InvalidConfiguration`](crate::RagError::InvalidConfiguration)
/// when `chunk_size == 0` or `overlap >= chunk_size`.
pub fn chunk_words(text: &str, params: &ChunkingParams) -> Result<Vec<String>> {
    params.validate()?;

    let words: Vec<&str> = text.split_whitespace().collect();
    let stride = params.stride();
    let mut chunks = Vec::with_capacity(expected_chunk_count(words.len(), params));
    let mut start = 0;

    while start < words.len() {
        let end = (start + params.chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

/// Chunk a document's text into indexed [`Chunk`]s.
///
/// Indices are contiguous from 0 in window order.
pub fn chunk_text(document_id: &str, text: &str, params: &ChunkingParams) -> Result<Vec<Chunk>> {
    Ok(chunk_words(text, params)?
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            document_id: document_id.to_string(),
            chunk_index: i as i64,
            text,
        })
        .collect())
}

/// Number of windows [`chunk_words`] produces for `word_count` words.
///
/// `ceil((n - overlap) / stride)`, with a floor of one window for any
/// non-empty text.
pub fn expected_chunk_count(word_count: usize, params: &ChunkingParams) -> usize {
    if word_count == 0 || params.chunk_size == 0 || params.overlap >= params.chunk_size {
        return 0;
    }
    word_count
        .saturating_sub(params.overlap)
        .div_ceil(params.stride())
        .max(1)
}
