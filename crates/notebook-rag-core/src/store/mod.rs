//! Storage abstraction for Notebook RAG.
//!
//! The [`Store`] trait defines every storage operation the ingestion and
//! retrieval pipeline needs, enabling pluggable backends (SQLite in the app
//! crate, [`memory::InMemoryStore`] for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes, and
//! are expected to provide their own transactional isolation. The query
//! path only reads.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;

use crate::embedding::StoredEmbedding;
use crate::error::Result;
use crate::models::{Chunk, ConversationTurn, Document, Session};

/// A chunk as loaded for retrieval, with its embedding still encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub embedding: StoredEmbedding,
}

/// A session's attached documents and their chunks, read from one
/// consistent view of storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionCorpus {
    /// Attached document IDs, in attach order.
    pub document_ids: Vec<String>,
    /// Every chunk of those documents, ordered by attach order then
    /// `chunk_index`.
    pub chunks: Vec<StoredChunk>,
}

/// Row counts for a session, used by status output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub documents: usize,
    pub chunks: usize,
    pub turns: usize,
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_session`](Store::create_session) | Insert a session |
/// | [`upsert_document`](Store::upsert_document) | Insert or update a document |
/// | [`attach_document`](Store::attach_document) | Add a document to a session |
/// | [`replace_chunks`](Store::replace_chunks) | Replace all chunks (and vectors) of a document |
/// | [`put_document`](Store::put_document) | Upsert a document and replace its chunks atomically |
/// | [`session_document_ids`](Store::session_document_ids) | Documents attached to a session |
/// | [`session_corpus`](Store::session_corpus) | Attached documents plus their chunks, read together |
/// | [`session_generation`](Store::session_generation) | Change counter for index caching |
/// | [`history`](Store::history) | Conversation turns, oldest first |
/// | [`append_turn`](Store::append_turn) | Record a turn |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new session.
    async fn create_session(&self, session: &Session) -> Result<()>;

    /// Look up a session by ID.
    async fn get_session(&self, id: &str) -> Result<Option<Session>>;

    /// Insert or update a document.
    async fn upsert_document(&self, doc: &Document) -> Result<()>;

    /// Attach a document to a session. Attaching twice is a no-op.
    ///
    /// Bumps the session's generation when the set changes.
    async fn attach_document(&self, session_id: &str, document_id: &str) -> Result<()>;

    /// Replace all chunks of a document, storing one vector per chunk when
    /// `vectors` is given.
    ///
    /// Bumps the generation of every session the document is attached to.
    async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<()>;

    /// Upsert `doc` and replace its chunks in a single write. On error
    /// neither the document row nor its chunks change.
    async fn put_document(
        &self,
        doc: &Document,
        chunks: &[Chunk],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<()>;

    /// IDs of the documents attached to a session, in attach order.
    async fn session_document_ids(&self, session_id: &str) -> Result<Vec<String>>;

    /// The session's attached document IDs and all their chunks.
    ///
    /// Both halves must come from the same view of storage: a chunk whose
    /// document is missing from `document_ids` is treated as an isolation
    /// failure. Unknown sessions yield an empty corpus.
    async fn session_corpus(&self, session_id: &str) -> Result<SessionCorpus>;

    /// Monotonic counter that changes whenever the session's searchable
    /// universe changes. `0` for unknown sessions.
    async fn session_generation(&self, session_id: &str) -> Result<u64>;

    /// Conversation turns for a session ordered by timestamp ascending,
    /// insertion order breaking ties.
    async fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>>;

    /// Append a conversation turn.
    async fn append_turn(&self, turn: &ConversationTurn) -> Result<()>;

    /// Document, chunk, and turn counts for a session.
    async fn session_stats(&self, session_id: &str) -> Result<SessionStats>;
}
