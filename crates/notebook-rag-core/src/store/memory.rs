//! In-memory [`Store`] implementation for testing.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Vectors are kept in the native blob encoding, exactly as a persistent
//! store would hand them back.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::embedding::{vec_to_blob, StoredEmbedding};
use crate::error::{RagError, Result};
use crate::models::{Chunk, ConversationTurn, Document, Session};

use super::{SessionCorpus, SessionStats, StoredChunk, Store};

struct StoredSession {
    session: Session,
    documents: Vec<String>,
    generation: u64,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, StoredSession>,
    docs: HashMap<String, Document>,
    chunks: HashMap<String, Vec<StoredChunk>>,
    turns: Vec<ConversationTurn>,
}

impl Inner {
    fn bump_sessions_containing(&mut self, document_id: &str) {
        for s in self.sessions.values_mut() {
            if s.documents.iter().any(|d| d == document_id) {
                s.generation += 1;
            }
        }
    }

    fn replace_chunks(
        &mut self,
        document_id: &str,
        chunks: &[Chunk],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<()> {
        let stored = encode_chunks(document_id, chunks, vectors)?;
        self.chunks.insert(document_id.to_string(), stored);
        self.bump_sessions_containing(document_id);
        Ok(())
    }
}

fn encode_chunks(
    document_id: &str,
    chunks: &[Chunk],
    vectors: Option<&[Vec<f32>]>,
) -> Result<Vec<StoredChunk>> {
    if let Some(vecs) = vectors {
        if vecs.len() != chunks.len() {
            return Err(RagError::storage(format!(
                "{} vectors for {} chunks",
                vecs.len(),
                chunks.len()
            )));
        }
    }

    Ok(chunks
        .iter()
        .enumerate()
        .map(|(i, c)| StoredChunk {
            document_id: document_id.to_string(),
            chunk_index: c.chunk_index,
            text: c.text.clone(),
            embedding: vectors
                .and_then(|v| v.get(i))
                .map(|v| StoredEmbedding::Native(vec_to_blob(v)))
                .unwrap_or(StoredEmbedding::Missing),
        })
        .collect())
}

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| RagError::storage("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| RagError::storage("in-memory store lock poisoned"))
    }

    /// Insert a chunk with an arbitrary stored embedding, bypassing
    /// encoding. Lets tests plant legacy or corrupt vectors.
    pub fn insert_stored_chunk(&self, chunk: StoredChunk) -> Result<()> {
        let mut inner = self.write()?;
        let document_id = chunk.document_id.clone();
        let list = inner.chunks.entry(document_id.clone()).or_default();
        list.retain(|c| c.chunk_index != chunk.chunk_index);
        list.push(chunk);
        list.sort_by_key(|c| c.chunk_index);
        inner.bump_sessions_containing(&document_id);
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut inner = self.write()?;
        if inner.sessions.contains_key(&session.id) {
            return Err(RagError::storage(format!(
                "session {} already exists",
                session.id
            )));
        }
        inner.sessions.insert(
            session.id.clone(),
            StoredSession {
                session: session.clone(),
                documents: Vec::new(),
                generation: 0,
            },
        );
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.read()?.sessions.get(id).map(|s| s.session.clone()))
    }

    async fn upsert_document(&self, doc: &Document) -> Result<()> {
        self.write()?.docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn attach_document(&self, session_id: &str, document_id: &str) -> Result<()> {
        let mut inner = self.write()?;
        if !inner.docs.contains_key(document_id) {
            return Err(RagError::storage(format!(
                "document {} not found",
                document_id
            )));
        }
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| RagError::storage(format!("session {} not found", session_id)))?;
        if !session.documents.iter().any(|d| d == document_id) {
            session.documents.push(document_id.to_string());
            session.generation += 1;
        }
        Ok(())
    }

    async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<()> {
        self.write()?.replace_chunks(document_id, chunks, vectors)
    }

    async fn put_document(
        &self,
        doc: &Document,
        chunks: &[Chunk],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<()> {
        let stored = encode_chunks(&doc.id, chunks, vectors)?;
        let mut inner = self.write()?;
        inner.docs.insert(doc.id.clone(), doc.clone());
        inner.chunks.insert(doc.id.clone(), stored);
        inner.bump_sessions_containing(&doc.id);
        Ok(())
    }

    async fn session_document_ids(&self, session_id: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .sessions
            .get(session_id)
            .map(|s| s.documents.clone())
            .unwrap_or_default())
    }

    async fn session_corpus(&self, session_id: &str) -> Result<SessionCorpus> {
        let inner = self.read()?;
        let Some(session) = inner.sessions.get(session_id) else {
            return Ok(SessionCorpus::default());
        };
        Ok(SessionCorpus {
            document_ids: session.documents.clone(),
            chunks: session
                .documents
                .iter()
                .filter_map(|d| inner.chunks.get(d))
                .flat_map(|list| list.iter().cloned())
                .collect(),
        })
    }

    async fn session_generation(&self, session_id: &str) -> Result<u64> {
        Ok(self
            .read()?
            .sessions
            .get(session_id)
            .map(|s| s.generation)
            .unwrap_or(0))
    }

    async fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let mut turns: Vec<ConversationTurn> = self
            .read()?
            .turns
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        turns.sort_by_key(|t| t.timestamp);
        Ok(turns)
    }

    async fn append_turn(&self, turn: &ConversationTurn) -> Result<()> {
        let mut inner = self.write()?;
        if !inner.sessions.contains_key(&turn.session_id) {
            return Err(RagError::storage(format!(
                "session {} not found",
                turn.session_id
            )));
        }
        inner.turns.push(turn.clone());
        Ok(())
    }

    async fn session_stats(&self, session_id: &str) -> Result<SessionStats> {
        let inner = self.read()?;
        let Some(session) = inner.sessions.get(session_id) else {
            return Ok(SessionStats::default());
        };
        Ok(SessionStats {
            documents: session.documents.len(),
            chunks: session
                .documents
                .iter()
                .filter_map(|d| inner.chunks.get(d))
                .map(Vec::len)
                .sum(),
            turns: inner
                .turns
                .iter()
                .filter(|t| t.session_id == session_id)
                .count(),
        })
    }
}
