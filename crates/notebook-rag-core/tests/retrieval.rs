//! End-to-end retrieval tests against the in-memory store and the hashing
//! embedder.

use async_trait::async_trait;
use notebook_rag_core::context::NO_HISTORY;
use notebook_rag_core::embedding::{
    embed_query, format_vector, Embedder, HashEmbedder, MalformedEmbedding, StoredEmbedding,
};
use notebook_rag_core::models::{Chunk, ConversationTurn, Document, Sender, Session};
use notebook_rag_core::params::{ChunkingParams, RetrievalParams};
use notebook_rag_core::pipeline::{ask, ingest_document, Answer};
use notebook_rag_core::retriever::{IndexCache, Retrieval, SessionRetriever};
use notebook_rag_core::store::memory::InMemoryStore;
use notebook_rag_core::store::{SessionCorpus, SessionStats, StoredChunk, Store};
use notebook_rag_core::RagError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const DIMS: usize = 256;

// ─── Helpers ────────────────────────────────────────────────────────

fn embedder() -> HashEmbedder {
    HashEmbedder::new(DIMS).unwrap()
}

fn session(id: &str) -> Session {
    Session {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        name: format!("{} notebook", id),
        created_at: 0,
    }
}

fn document(id: &str, content: &str) -> Document {
    Document {
        id: id.to_string(),
        title: id.to_string(),
        user_id: "user-1".to_string(),
        content: content.to_string(),
        created_at: 0,
    }
}

async fn add_doc(
    store: &InMemoryStore,
    session_id: &str,
    doc_id: &str,
    content: &str,
    params: ChunkingParams,
) {
    let doc = document(doc_id, content);
    ingest_document(store, &embedder(), &doc, &params, 2)
        .await
        .unwrap();
    store.attach_document(session_id, doc_id).await.unwrap();
}

fn ranked(r: Retrieval) -> Vec<notebook_rag_core::retriever::RankedChunk> {
    match r {
        Retrieval::Ranked { chunks, .. } => chunks,
        Retrieval::NoContext { .. } => panic!("expected ranked results, got NoContext"),
    }
}

/// Embedder whose backend is always down.
struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    fn model_name(&self) -> &str {
        "down"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed_batch(&self, _texts: &[String]) -> notebook_rag_core::Result<Vec<Vec<f32>>> {
        Err(RagError::embedding("model server unreachable"))
    }
}

/// Store that forgets to filter chunks by session.
struct LeakyStore {
    inner: InMemoryStore,
    leaked: StoredChunk,
}

#[async_trait]
impl Store for LeakyStore {
    async fn create_session(&self, s: &Session) -> notebook_rag_core::Result<()> {
        self.inner.create_session(s).await
    }
    async fn get_session(&self, id: &str) -> notebook_rag_core::Result<Option<Session>> {
        self.inner.get_session(id).await
    }
    async fn upsert_document(&self, d: &Document) -> notebook_rag_core::Result<()> {
        self.inner.upsert_document(d).await
    }
    async fn attach_document(&self, s: &str, d: &str) -> notebook_rag_core::Result<()> {
        self.inner.attach_document(s, d).await
    }
    async fn replace_chunks(
        &self,
        d: &str,
        c: &[Chunk],
        v: Option<&[Vec<f32>]>,
    ) -> notebook_rag_core::Result<()> {
        self.inner.replace_chunks(d, c, v).await
    }
    async fn put_document(
        &self,
        d: &Document,
        c: &[Chunk],
        v: Option<&[Vec<f32>]>,
    ) -> notebook_rag_core::Result<()> {
        self.inner.put_document(d, c, v).await
    }
    async fn session_document_ids(&self, s: &str) -> notebook_rag_core::Result<Vec<String>> {
        self.inner.session_document_ids(s).await
    }
    async fn session_corpus(&self, s: &str) -> notebook_rag_core::Result<SessionCorpus> {
        let mut corpus = self.inner.session_corpus(s).await?;
        corpus.chunks.push(self.leaked.clone());
        Ok(corpus)
    }
    async fn session_generation(&self, s: &str) -> notebook_rag_core::Result<u64> {
        self.inner.session_generation(s).await
    }
    async fn history(&self, s: &str) -> notebook_rag_core::Result<Vec<ConversationTurn>> {
        self.inner.history(s).await
    }
    async fn append_turn(&self, t: &ConversationTurn) -> notebook_rag_core::Result<()> {
        self.inner.append_turn(t).await
    }
    async fn session_stats(&self, s: &str) -> notebook_rag_core::Result<SessionStats> {
        self.inner.session_stats(s).await
    }
}

/// Store where another writer attaches `late_document` to `session_id`
/// right after the first membership read completes.
struct ConcurrentAttachStore {
    inner: InMemoryStore,
    session_id: &'static str,
    late_document: &'static str,
    attached: AtomicBool,
}

impl ConcurrentAttachStore {
    async fn attach_once(&self) -> notebook_rag_core::Result<()> {
        if !self.attached.swap(true, Ordering::SeqCst) {
            self.inner
                .attach_document(self.session_id, self.late_document)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for ConcurrentAttachStore {
    async fn create_session(&self, s: &Session) -> notebook_rag_core::Result<()> {
        self.inner.create_session(s).await
    }
    async fn get_session(&self, id: &str) -> notebook_rag_core::Result<Option<Session>> {
        self.inner.get_session(id).await
    }
    async fn upsert_document(&self, d: &Document) -> notebook_rag_core::Result<()> {
        self.inner.upsert_document(d).await
    }
    async fn attach_document(&self, s: &str, d: &str) -> notebook_rag_core::Result<()> {
        self.inner.attach_document(s, d).await
    }
    async fn replace_chunks(
        &self,
        d: &str,
        c: &[Chunk],
        v: Option<&[Vec<f32>]>,
    ) -> notebook_rag_core::Result<()> {
        self.inner.replace_chunks(d, c, v).await
    }
    async fn put_document(
        &self,
        d: &Document,
        c: &[Chunk],
        v: Option<&[Vec<f32>]>,
    ) -> notebook_rag_core::Result<()> {
        self.inner.put_document(d, c, v).await
    }
    async fn session_document_ids(&self, s: &str) -> notebook_rag_core::Result<Vec<String>> {
        let ids = self.inner.session_document_ids(s).await?;
        self.attach_once().await?;
        Ok(ids)
    }
    async fn session_corpus(&self, s: &str) -> notebook_rag_core::Result<SessionCorpus> {
        let corpus = self.inner.session_corpus(s).await?;
        self.attach_once().await?;
        Ok(corpus)
    }
    async fn session_generation(&self, s: &str) -> notebook_rag_core::Result<u64> {
        self.inner.session_generation(s).await
    }
    async fn history(&self, s: &str) -> notebook_rag_core::Result<Vec<ConversationTurn>> {
        self.inner.history(s).await
    }
    async fn append_turn(&self, t: &ConversationTurn) -> notebook_rag_core::Result<()> {
        self.inner.append_turn(t).await
    }
    async fn session_stats(&self, s: &str) -> notebook_rag_core::Result<SessionStats> {
        self.inner.session_stats(s).await
    }
}

// ─── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_fruit_scenario_returns_both_chunks_in_distance_order() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    add_doc(
        &store,
        "s",
        "d",
        "apple banana cherry date elderberry",
        ChunkingParams::new(3, 1).unwrap(),
    )
    .await;

    let e = embedder();
    let chunks = ranked(
        SessionRetriever::new(&store, &e)
            .retrieve("s", "cherry", 3)
            .await
            .unwrap(),
    );

    assert_eq!(chunks.len(), 2);
    let mut texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    texts.sort();
    assert_eq!(texts, vec!["apple banana cherry", "cherry date elderberry"]);
    assert!(chunks[0].distance <= chunks[1].distance);
    for c in &chunks {
        // Both windows contain the query word, so neither is orthogonal.
        assert!(c.distance < 2.0, "distance {}", c.distance);
    }
}

#[tokio::test]
async fn test_session_without_documents_is_no_context() {
    let store = InMemoryStore::new();
    store.create_session(&session("empty")).await.unwrap();
    let e = embedder();

    let result = SessionRetriever::new(&store, &e)
        .retrieve("empty", "anything", 3)
        .await
        .unwrap();
    assert_eq!(result, Retrieval::NoContext { excluded: vec![] });
}

#[tokio::test]
async fn test_no_context_does_not_need_the_embedder() {
    let store = InMemoryStore::new();
    store.create_session(&session("empty")).await.unwrap();

    let result = SessionRetriever::new(&store, &DownEmbedder)
        .retrieve("empty", "anything", 3)
        .await
        .unwrap();
    assert!(result.is_no_context());
}

#[tokio::test]
async fn test_unparsable_embedding_excluded_others_searchable() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    add_doc(
        &store,
        "s",
        "d",
        "rust ownership borrowing lifetimes traits generics macros",
        ChunkingParams::new(3, 0).unwrap(),
    )
    .await;
    store
        .insert_stored_chunk(StoredChunk {
            document_id: "d".into(),
            chunk_index: 1,
            text: "lifetimes traits generics".into(),
            embedding: StoredEmbedding::Serialized("{corrupted}".into()),
        })
        .unwrap();

    let e = embedder();
    for question in ["lifetimes traits generics", "rust", "macros"] {
        let result = SessionRetriever::new(&store, &e)
            .retrieve("s", question, 10)
            .await
            .unwrap();
        assert_eq!(result.excluded().len(), 1);
        assert_eq!(result.excluded()[0].chunk_index, 1);
        assert!(matches!(
            result.excluded()[0].reason,
            MalformedEmbedding::NotAVector(_)
        ));
        let chunks = ranked(result);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.chunk_index != 1));
    }
}

#[tokio::test]
async fn test_legacy_text_vector_is_searchable() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    store.upsert_document(&document("d", "")).await.unwrap();
    store.attach_document("s", "d").await.unwrap();

    let e = embedder();
    let v = embed_query(&e, "photosynthesis in leaves").await.unwrap();
    store
        .insert_stored_chunk(StoredChunk {
            document_id: "d".into(),
            chunk_index: 0,
            text: "photosynthesis in leaves".into(),
            embedding: StoredEmbedding::Serialized(format_vector(&v)),
        })
        .unwrap();

    let chunks = ranked(
        SessionRetriever::new(&store, &e)
            .retrieve("s", "photosynthesis in leaves", 1)
            .await
            .unwrap(),
    );
    assert_eq!(chunks[0].text, "photosynthesis in leaves");
    assert!(chunks[0].distance < 1e-6);
}

#[tokio::test]
async fn test_unnormalized_legacy_vector_is_rescaled() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    store.upsert_document(&document("d", "")).await.unwrap();
    store.attach_document("s", "d").await.unwrap();

    let e = embedder();
    let v = embed_query(&e, "enzymes speed reactions").await.unwrap();
    let scaled: Vec<f32> = v.iter().map(|x| x * 7.5).collect();
    store
        .insert_stored_chunk(StoredChunk {
            document_id: "d".into(),
            chunk_index: 0,
            text: "enzymes speed reactions".into(),
            embedding: StoredEmbedding::Serialized(format_vector(&scaled)),
        })
        .unwrap();
    store
        .insert_stored_chunk(StoredChunk {
            document_id: "d".into(),
            chunk_index: 1,
            text: "blank".into(),
            embedding: StoredEmbedding::Serialized(format_vector(&vec![0.0; DIMS])),
        })
        .unwrap();

    let result = SessionRetriever::new(&store, &e)
        .retrieve("s", "enzymes speed reactions", 3)
        .await
        .unwrap();
    assert_eq!(result.excluded().len(), 1);
    assert_eq!(result.excluded()[0].reason, MalformedEmbedding::ZeroNorm);
    let chunks = ranked(result);
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].distance < 1e-5);
}

#[tokio::test]
async fn test_all_malformed_is_no_context_with_report() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    store.upsert_document(&document("d", "")).await.unwrap();
    store.attach_document("s", "d").await.unwrap();
    store
        .insert_stored_chunk(StoredChunk {
            document_id: "d".into(),
            chunk_index: 0,
            text: "short vector".into(),
            embedding: StoredEmbedding::Serialized("[0.5, 0.5]".into()),
        })
        .unwrap();
    store
        .insert_stored_chunk(StoredChunk {
            document_id: "d".into(),
            chunk_index: 1,
            text: "never embedded".into(),
            embedding: StoredEmbedding::Missing,
        })
        .unwrap();

    let e = embedder();
    match SessionRetriever::new(&store, &e)
        .retrieve("s", "vector", 3)
        .await
        .unwrap()
    {
        Retrieval::NoContext { excluded } => {
            assert_eq!(excluded.len(), 2);
            assert_eq!(
                excluded[0].reason,
                MalformedEmbedding::WrongDimension {
                    expected: DIMS,
                    found: 2
                }
            );
            assert_eq!(excluded[1].reason, MalformedEmbedding::Missing);
        }
        other => panic!("expected NoContext, got {:?}", other),
    }
}

// ─── Properties ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_each_chunk_retrieves_itself_first() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    let text = "mitochondria produce energy cells divide through mitosis \
                enzymes speed reactions proteins fold into shapes \
                ribosomes translate messenger rna genes encode traits \
                membranes regulate transport osmosis moves water";
    add_doc(&store, "s", "bio", text, ChunkingParams::new(4, 1).unwrap()).await;

    let e = embedder();
    let retriever = SessionRetriever::new(&store, &e);
    let all = store.session_corpus("s").await.unwrap().chunks;
    assert!(all.len() > 5);

    for chunk in &all {
        let hits = ranked(retriever.retrieve("s", &chunk.text, 1).await.unwrap());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_index, chunk.chunk_index, "{}", chunk.text);
        assert!(hits[0].distance < 1e-6);
    }
}

#[tokio::test]
async fn test_k_larger_than_corpus_returns_everything_sorted() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    add_doc(
        &store,
        "s",
        "d",
        "one two three four five six seven eight nine ten",
        ChunkingParams::new(3, 1).unwrap(),
    )
    .await;

    let e = embedder();
    let chunks = ranked(
        SessionRetriever::new(&store, &e)
            .retrieve("s", "four five", 100)
            .await
            .unwrap(),
    );
    assert_eq!(chunks.len(), 5);
    for w in chunks.windows(2) {
        assert!(w[0].distance <= w[1].distance);
    }
}

#[tokio::test]
async fn test_zero_k_rejected() {
    let store = InMemoryStore::new();
    let e = embedder();
    let err = SessionRetriever::new(&store, &e)
        .retrieve("s", "q", 0)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_disjoint_sessions_are_isolated() {
    let store = InMemoryStore::new();
    store.create_session(&session("history")).await.unwrap();
    store.create_session(&session("chemistry")).await.unwrap();
    let params = ChunkingParams::new(4, 1).unwrap();

    add_doc(
        &store,
        "history",
        "rome",
        "the roman empire expanded across the mediterranean under augustus",
        params,
    )
    .await;
    // Uploaded later, and reusing words from the first session's document.
    add_doc(
        &store,
        "chemistry",
        "acids",
        "acids donate protons the empire of chemistry spans the mediterranean labs",
        params,
    )
    .await;

    let e = embedder();
    let retriever = SessionRetriever::new(&store, &e);
    for q in ["roman empire", "acids donate protons", "mediterranean", "the"] {
        for c in ranked(retriever.retrieve("history", q, 50).await.unwrap()) {
            assert_eq!(c.document_id, "rome");
        }
        for c in ranked(retriever.retrieve("chemistry", q, 50).await.unwrap()) {
            assert_eq!(c.document_id, "acids");
        }
    }
}

#[tokio::test]
async fn test_isolation_violation_is_fatal() {
    let inner = InMemoryStore::new();
    inner.create_session(&session("s")).await.unwrap();
    let store = LeakyStore {
        inner,
        leaked: StoredChunk {
            document_id: "someone-elses".into(),
            chunk_index: 0,
            text: "secret".into(),
            embedding: StoredEmbedding::Missing,
        },
    };
    store
        .upsert_document(&document("d", "alpha beta gamma"))
        .await
        .unwrap();
    store.attach_document("s", "d").await.unwrap();

    let e = embedder();
    let err = SessionRetriever::new(&store, &e)
        .retrieve("s", "secret", 3)
        .await
        .unwrap_err();
    match err {
        RagError::SessionIsolationViolation {
            session_id,
            document_id,
            ..
        } => {
            assert_eq!(session_id, "s");
            assert_eq!(document_id, "someone-elses");
        }
        other => panic!("expected isolation violation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_attach_during_index_build_is_not_an_isolation_violation() {
    let inner = InMemoryStore::new();
    inner.create_session(&session("s")).await.unwrap();
    let params = ChunkingParams::new(50, 0).unwrap();
    add_doc(&inner, "s", "d1", "alpha beta gamma", params).await;
    ingest_document(
        &inner,
        &embedder(),
        &document("d2", "alpha delta epsilon"),
        &params,
        2,
    )
    .await
    .unwrap();

    let store = ConcurrentAttachStore {
        inner,
        session_id: "s",
        late_document: "d2",
        attached: AtomicBool::new(false),
    };
    let e = embedder();
    let cache = IndexCache::new();
    let retriever = SessionRetriever::new(&store, &e).with_cache(&cache);

    // The attach lands after the corpus was read: this build sees d1 only.
    let first = ranked(retriever.retrieve("s", "alpha", 3).await.unwrap());
    let docs: Vec<&str> = first.iter().map(|c| c.document_id.as_str()).collect();
    assert_eq!(docs, vec!["d1"]);

    let generation = store.session_generation("s").await.unwrap();
    assert!(cache.get("s", generation).is_none());

    let second = ranked(retriever.retrieve("s", "alpha", 3).await.unwrap());
    let mut docs: Vec<&str> = second.iter().map(|c| c.document_id.as_str()).collect();
    docs.sort();
    assert_eq!(docs, vec!["d1", "d2"]);
    assert!(cache.get("s", generation).is_some());
}

// ─── Embedding failures ─────────────────────────────────────────────

#[tokio::test]
async fn test_ingest_with_embedder_down_writes_nothing() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    let doc = document("d", "some words to embed");

    let err = ingest_document(&store, &DownEmbedder, &doc, &ChunkingParams::default(), 8)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::EmbeddingUnavailable(_)));
    assert!(store.attach_document("s", "d").await.is_err());
}

#[tokio::test]
async fn test_query_with_embedder_down_fails() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    add_doc(&store, "s", "d", "alpha beta gamma", ChunkingParams::default()).await;

    let err = SessionRetriever::new(&store, &DownEmbedder)
        .retrieve("s", "alpha", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::EmbeddingUnavailable(_)));
}

#[tokio::test]
async fn test_ingest_bad_chunking_fails_fast() {
    let store = InMemoryStore::new();
    let doc = document("d", "a b c");
    let bad = ChunkingParams {
        chunk_size: 2,
        overlap: 2,
    };
    let err = ingest_document(&store, &embedder(), &doc, &bad, 8)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_ingest_report_counts() {
    let store = InMemoryStore::new();
    let doc = document("d", "apple banana cherry date elderberry");
    let report = ingest_document(&store, &embedder(), &doc, &ChunkingParams::new(3, 1).unwrap(), 1)
        .await
        .unwrap();
    assert_eq!(report.chunks, 2);
    assert_eq!(report.embedded, 2);
}

// ─── Index cache ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cache_reused_until_new_document_attached() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    add_doc(&store, "s", "d1", "volcanoes erupt magma", ChunkingParams::default()).await;

    let e = embedder();
    let cache = IndexCache::new();
    let retriever = SessionRetriever::new(&store, &e).with_cache(&cache);

    let first = retriever.snapshot("s").await.unwrap();
    let second = retriever.snapshot("s").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
    assert_eq!(first.len(), 1);

    add_doc(&store, "s", "d2", "glaciers carve valleys", ChunkingParams::default()).await;
    let third = retriever.snapshot("s").await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert!(third.generation() > first.generation());
    assert_eq!(third.len(), 2);

    let chunks = ranked(retriever.retrieve("s", "glaciers carve valleys", 1).await.unwrap());
    assert_eq!(chunks[0].document_id, "d2");
}

#[tokio::test]
async fn test_cache_invalidate() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    let e = embedder();
    let cache = IndexCache::new();
    SessionRetriever::new(&store, &e)
        .with_cache(&cache)
        .snapshot("s")
        .await
        .unwrap();
    assert_eq!(cache.len(), 1);
    cache.invalidate("s");
    assert!(cache.is_empty());
}

// ─── Ask ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ask_assembles_top_chunk_and_history() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    add_doc(
        &store,
        "s",
        "d",
        "apple banana cherry date elderberry",
        ChunkingParams::new(3, 1).unwrap(),
    )
    .await;
    for (i, (sender, msg)) in [
        (Sender::User, "hi"),
        (Sender::Bot, "hello"),
        (Sender::User, "what fruit?"),
        (Sender::Bot, "many"),
    ]
    .into_iter()
    .enumerate()
    {
        store
            .append_turn(&ConversationTurn {
                session_id: "s".into(),
                sender,
                message: msg.into(),
                timestamp: i as i64,
            })
            .await
            .unwrap();
    }

    let params = RetrievalParams {
        top_k: 3,
        max_history_turns: 2,
        context_chunks: 1,
    };
    let answer = ask(&store, &embedder(), None, "s", "date elderberry", &params)
        .await
        .unwrap();
    match answer {
        Answer::Ready { bundle, ranked, .. } => {
            assert_eq!(ranked.len(), 2);
            assert_eq!(bundle.context_text, ranked[0].text);
            assert_eq!(bundle.context_text, "cherry date elderberry");
            assert_eq!(bundle.history_text, "User: what fruit?\nBot: many");
            assert_eq!(bundle.question_text, "date elderberry");
        }
        other => panic!("expected Ready, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ask_without_history_says_so() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    add_doc(&store, "s", "d", "lone sentence", ChunkingParams::default()).await;

    let cache = IndexCache::new();
    let answer = ask(
        &store,
        &embedder(),
        Some(&cache),
        "s",
        "sentence",
        &RetrievalParams::default(),
    )
    .await
    .unwrap();
    match answer {
        Answer::Ready { bundle, .. } => assert_eq!(bundle.history_text, NO_HISTORY),
        other => panic!("expected Ready, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ask_empty_session_is_no_context() {
    let store = InMemoryStore::new();
    store.create_session(&session("s")).await.unwrap();
    let answer = ask(
        &store,
        &embedder(),
        None,
        "s",
        "anything",
        &RetrievalParams::default(),
    )
    .await
    .unwrap();
    assert_eq!(answer, Answer::NoContext { excluded: vec![] });
}
