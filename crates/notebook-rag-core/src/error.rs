//! Error types for notebook-rag-core.
//!
//! Only conditions that abort a request are errors. A chunk whose stored
//! embedding cannot be decoded is reported through
//! [`ExcludedChunk`](crate::retriever::ExcludedChunk), and a session with no
//! searchable chunks is [`Retrieval::NoContext`](crate::retriever::Retrieval::NoContext).

/// Errors that abort an ingestion or retrieval request.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// A parameter combination that can never produce a valid result,
    /// e.g. `overlap >= chunk_size`. Raised before any work is done.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The embedder could not produce usable vectors.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Storage returned a chunk whose document is not attached to the
    /// session being queried. Indicates a storage-layer bug.
    #[error(
        "session isolation violated: chunk {chunk_index} of document {document_id} \
         returned for session {session_id}"
    )]
    SessionIsolationViolation {
        session_id: String,
        document_id: String,
        chunk_index: i64,
    },

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl RagError {
    /// Shorthand for [`RagError::InvalidConfiguration`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Shorthand for [`RagError::EmbeddingUnavailable`].
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable(msg.into())
    }

    /// Shorthand for [`RagError::Storage`].
    pub fn storage(msg: impl std::fmt::Display) -> Self {
        Self::Storage(msg.to_string())
    }
}

/// Result type alias using [`RagError`].
pub type Result<T> = std::result::Result<T, RagError>;
