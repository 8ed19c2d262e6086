//! Session-scoped retrieval.
//!
//! [`SessionRetriever::retrieve`] answers "which chunks of this session's
//! documents are closest to the question":
//!
//! 1. Load the session's corpus: its attached documents and their chunks,
//!    read together by [`Store::session_corpus`]. Any chunk from another
//!    document is a storage bug and aborts with
//!    [`RagError::SessionIsolationViolation`].
//! 2. Decode each stored embedding. Chunks whose vector is missing,
//!    unparsable, or of the wrong dimension are excluded, logged at warn
//!    level, and listed in the result.
//! 3. No usable vectors → [`Retrieval::NoContext`]. The embedder is not
//!    called in that case.
//! 4. Build a [`FlatIndex`], embed the question, return the `k` nearest.
//!
//! Steps 1-2 and the index build form a [`SessionSnapshot`]. Without a
//! cache it is rebuilt per call. With an [`IndexCache`] it is reused until
//! the store reports a new session generation; replacement swaps an
//! `Arc`, so readers never observe a partially built index.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::embedding::{embed_query, Embedder, MalformedEmbedding};
use crate::error::{RagError, Result};
use crate::index::FlatIndex;
use crate::store::Store;

/// A chunk left out of the searchable set because its stored embedding
/// could not be used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedChunk {
    pub document_id: String,
    pub chunk_index: i64,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: MalformedEmbedding,
}

fn serialize_reason<S: serde::Serializer>(
    reason: &MalformedEmbedding,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(reason)
}

/// One retrieved chunk with its distance to the question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    /// Squared Euclidean distance between unit vectors, in `[0, 4]`.
    pub distance: f32,
}

/// Outcome of a retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Search ran. `chunks` is sorted by ascending distance and holds
    /// `min(k, searchable)` entries.
    Ranked {
        chunks: Vec<RankedChunk>,
        excluded: Vec<ExcludedChunk>,
    },
    /// The session has no searchable chunks: no documents attached, or
    /// every stored embedding was excluded.
    NoContext { excluded: Vec<ExcludedChunk> },
}

impl Retrieval {
    pub fn excluded(&self) -> &[ExcludedChunk] {
        match self {
            Retrieval::Ranked { excluded, .. } | Retrieval::NoContext { excluded } => excluded,
        }
    }

    pub fn is_no_context(&self) -> bool {
        matches!(self, Retrieval::NoContext { .. })
    }
}

#[derive(Debug, Clone)]
struct Entry {
    document_id: String,
    chunk_index: i64,
    text: String,
}

/// The searchable state of one session at one generation.
#[derive(Debug)]
pub struct SessionSnapshot {
    generation: u64,
    index: FlatIndex,
    entries: Vec<Entry>,
    excluded: Vec<ExcludedChunk>,
}

impl SessionSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of searchable chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn excluded(&self) -> &[ExcludedChunk] {
        &self.excluded
    }
}

/// Per-session snapshot cache keyed by session ID.
///
/// Entries are immutable `Arc`s; a rebuild happens outside the lock and is
/// published by swapping the pointer. An older build never replaces a
/// newer one.
#[derive(Debug, Default)]
pub struct IndexCache {
    snapshots: RwLock<HashMap<String, Arc<SessionSnapshot>>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached snapshot, if it was built at `generation`.
    pub fn get(&self, session_id: &str, generation: u64) -> Option<Arc<SessionSnapshot>> {
        let snapshots = self.snapshots.read().ok()?;
        snapshots
            .get(session_id)
            .filter(|s| s.generation == generation)
            .cloned()
    }

    fn publish(&self, session_id: &str, snapshot: Arc<SessionSnapshot>) {
        let Ok(mut snapshots) = self.snapshots.write() else {
            return;
        };
        match snapshots.get(session_id) {
            Some(existing) if existing.generation > snapshot.generation => {}
            _ => {
                snapshots.insert(session_id.to_string(), snapshot);
            }
        }
    }

    /// Drop a session's snapshot.
    pub fn invalidate(&self, session_id: &str) {
        if let Ok(mut snapshots) = self.snapshots.write() {
            snapshots.remove(session_id);
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Retrieves ranked chunks for a session's questions.
///
/// Holds references to the injected store and embedder; construct one per
/// request or keep it alongside them.
pub struct SessionRetriever<'a> {
    store: &'a dyn Store,
    embedder: &'a dyn Embedder,
    cache: Option<&'a IndexCache>,
}

impl<'a> SessionRetriever<'a> {
    pub fn new(store: &'a dyn Store, embedder: &'a dyn Embedder) -> Self {
        Self {
            store,
            embedder,
            cache: None,
        }
    }

    /// Reuse snapshots from `cache` while the session generation is unchanged.
    pub fn with_cache(mut self, cache: &'a IndexCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Retrieve the `k` chunks of `session_id` nearest to `question`.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidConfiguration`] when `k == 0`.
    /// - [`RagError::SessionIsolationViolation`] when storage returns a
    ///   chunk of a document not attached to the session.
    /// - [`RagError::EmbeddingUnavailable`] when the question cannot be embedded.
    /// - [`RagError::Storage`] when the store fails.
    pub async fn retrieve(&self, session_id: &str, question: &str, k: usize) -> Result<Retrieval> {
        if k == 0 {
            return Err(RagError::config("k must be >= 1"));
        }

        let snapshot = self.snapshot(session_id).await?;
        if snapshot.is_empty() {
            tracing::debug!(
                session_id,
                excluded = snapshot.excluded.len(),
                "no searchable chunks"
            );
            return Ok(Retrieval::NoContext {
                excluded: snapshot.excluded.clone(),
            });
        }

        let query = embed_query(self.embedder, question).await?;
        let hits = snapshot.index.search(&query, k)?;
        tracing::debug!(
            session_id,
            searchable = snapshot.len(),
            returned = hits.len(),
            "session search complete"
        );

        let chunks = hits
            .into_iter()
            .map(|hit| {
                let entry = &snapshot.entries[hit.position];
                RankedChunk {
                    document_id: entry.document_id.clone(),
                    chunk_index: entry.chunk_index,
                    text: entry.text.clone(),
                    distance: hit.distance,
                }
            })
            .collect();

        Ok(Retrieval::Ranked {
            chunks,
            excluded: snapshot.excluded.clone(),
        })
    }

    /// Current snapshot for a session, from cache when fresh.
    pub async fn snapshot(&self, session_id: &str) -> Result<Arc<SessionSnapshot>> {
        // Read the generation before the data: chunks loaded afterwards are
        // at least this new, so a stale label only costs an extra rebuild.
        let generation = self.store.session_generation(session_id).await?;

        if let Some(hit) = self.cache.and_then(|c| c.get(session_id, generation)) {
            tracing::debug!(session_id, generation, "index cache hit");
            return Ok(hit);
        }

        let snapshot = Arc::new(self.build_snapshot(session_id, generation).await?);
        if let Some(cache) = self.cache {
            cache.publish(session_id, Arc::clone(&snapshot));
        }
        Ok(snapshot)
    }

    async fn build_snapshot(&self, session_id: &str, generation: u64) -> Result<SessionSnapshot> {
        let corpus = self.store.session_corpus(session_id).await?;
        let attached: HashSet<&str> = corpus.document_ids.iter().map(String::as_str).collect();
        let stored = corpus.chunks;
        let dims = self.embedder.dims();

        let mut vectors = Vec::with_capacity(stored.len());
        let mut entries = Vec::with_capacity(stored.len());
        let mut excluded = Vec::new();

        for chunk in stored {
            if !attached.contains(chunk.document_id.as_str()) {
                tracing::error!(
                    session_id,
                    document_id = %chunk.document_id,
                    chunk_index = chunk.chunk_index,
                    "store returned a chunk outside the session"
                );
                return Err(RagError::SessionIsolationViolation {
                    session_id: session_id.to_string(),
                    document_id: chunk.document_id,
                    chunk_index: chunk.chunk_index,
                });
            }

            match chunk.embedding.decode(dims) {
                Ok(v) => {
                    vectors.push(v);
                    entries.push(Entry {
                        document_id: chunk.document_id,
                        chunk_index: chunk.chunk_index,
                        text: chunk.text,
                    });
                }
                Err(reason) => {
                    tracing::warn!(
                        session_id,
                        document_id = %chunk.document_id,
                        chunk_index = chunk.chunk_index,
                        %reason,
                        "excluding chunk with unusable embedding"
                    );
                    excluded.push(ExcludedChunk {
                        document_id: chunk.document_id,
                        chunk_index: chunk.chunk_index,
                        reason,
                    });
                }
            }
        }

        let index = FlatIndex::build(vectors)?;
        tracing::debug!(
            session_id,
            generation,
            indexed = index.len(),
            excluded = excluded.len(),
            "built session index"
        );

        Ok(SessionSnapshot {
            generation,
            index,
            entries,
            excluded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_at(generation: u64) -> Arc<SessionSnapshot> {
        Arc::new(SessionSnapshot {
            generation,
            index: FlatIndex::build(Vec::new()).unwrap(),
            entries: Vec::new(),
            excluded: Vec::new(),
        })
    }

    #[test]
    fn test_publish_keeps_newer_snapshot() {
        let cache = IndexCache::new();
        cache.publish("s", snapshot_at(3));
        cache.publish("s", snapshot_at(2));

        assert_eq!(cache.get("s", 3).map(|s| s.generation()), Some(3));
        assert!(cache.get("s", 2).is_none());

        cache.publish("s", snapshot_at(4));
        assert!(cache.get("s", 3).is_none());
        assert!(cache.get("s", 4).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_drops_only_that_session() {
        let cache = IndexCache::new();
        cache.publish("a", snapshot_at(1));
        cache.publish("b", snapshot_at(1));
        cache.invalidate("a");
        assert!(cache.get("a", 1).is_none());
        assert!(cache.get("b", 1).is_some());
    }
}
