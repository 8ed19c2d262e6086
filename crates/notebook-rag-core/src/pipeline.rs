//! Ingestion and question-answering entry points.
//!
//! [`ingest_document`] turns extracted text into stored, embedded chunks.
//! [`ask`] retrieves for a question and assembles the generator's input.
//! Both take the store and embedder explicitly; nothing is global.

use serde::Serialize;

use crate::chunk::chunk_text;
use crate::context::{ContextAssembler, ContextBundle};
use crate::embedding::{embed_texts, Embedder};
use crate::error::Result;
use crate::models::Document;
use crate::params::{ChunkingParams, RetrievalParams};
use crate::retriever::{ExcludedChunk, IndexCache, RankedChunk, Retrieval, SessionRetriever};
use crate::store::Store;

/// Counts from one [`ingest_document`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunks: usize,
    pub embedded: usize,
}

/// Chunk, embed, and store a document.
///
/// Chunking and embedding both finish before anything is written, and the
/// document row and its chunks are stored in one
/// [`Store::put_document`] call, so any failure leaves storage untouched.
/// Texts are sent to the embedder `batch_size` at a time.
///
/// # Errors
///
/// [`RagError::InvalidConfiguration`](crate::RagError::InvalidConfiguration)
/// for bad chunking params,
/// [`RagError::EmbeddingUnavailable`](crate::RagError::EmbeddingUnavailable)
/// if any batch fails, or a storage error.
pub async fn ingest_document(
    store: &dyn Store,
    embedder: &dyn Embedder,
    doc: &Document,
    params: &ChunkingParams,
    batch_size: usize,
) -> Result<IngestReport> {
    let chunks = chunk_text(&doc.id, &doc.content, params)?;
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        vectors.extend(embed_texts(embedder, batch).await?);
    }

    store
        .put_document(doc, &chunks, Some(vectors.as_slice()))
        .await?;

    tracing::info!(
        document_id = %doc.id,
        chunks = chunks.len(),
        model = embedder.model_name(),
        "ingested document"
    );

    Ok(IngestReport {
        document_id: doc.id.clone(),
        chunks: chunks.len(),
        embedded: vectors.len(),
    })
}

/// Result of [`ask`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Answer {
    /// Context found; `bundle` is ready for the generator.
    Ready {
        bundle: ContextBundle,
        ranked: Vec<RankedChunk>,
        excluded: Vec<ExcludedChunk>,
    },
    /// The session has nothing searchable. Callers should prompt for a
    /// document upload instead of generating.
    NoContext { excluded: Vec<ExcludedChunk> },
}

/// Retrieve context for a question and assemble the generator input.
///
/// Retrieves `params.top_k` chunks, loads the session history, and applies
/// the [`ContextAssembler`] policy from `params`.
pub async fn ask(
    store: &dyn Store,
    embedder: &dyn Embedder,
    cache: Option<&IndexCache>,
    session_id: &str,
    question: &str,
    params: &RetrievalParams,
) -> Result<Answer> {
    params.validate()?;

    let mut retriever = SessionRetriever::new(store, embedder);
    if let Some(cache) = cache {
        retriever = retriever.with_cache(cache);
    }

    match retriever.retrieve(session_id, question, params.top_k).await? {
        Retrieval::NoContext { excluded } => Ok(Answer::NoContext { excluded }),
        Retrieval::Ranked { chunks, excluded } => {
            let history = store.history(session_id).await?;
            let bundle = ContextAssembler::from(params).assemble(question, &chunks, &history);
            Ok(Answer::Ready {
                bundle,
                ranked: chunks,
                excluded,
            })
        }
    }
}
