//! `nrag ask`: retrieve context for a question and print the assembled
//! bundle.
//!
//! The bundle is what an answer generator would receive. This command
//! stops there; generation happens elsewhere. Pass `-` as the question to
//! read one question per line from stdin, reusing the session index
//! between them when `retrieval.cache_indexes` is set.

use anyhow::{bail, Result};
use std::io::BufRead;

use notebook_rag_core::embedding::Embedder;
use notebook_rag_core::params::RetrievalParams;
use notebook_rag_core::pipeline::{ask, Answer};
use notebook_rag_core::retriever::IndexCache;
use notebook_rag_core::store::Store;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::sqlite_store::SqliteStore;

/// Printed when a session has nothing to search.
pub const NO_CONTEXT_MESSAGE: &str =
    "No searchable documents in this session. Upload a document to get started.";

pub async fn run_ask(
    config: &Config,
    session_id: &str,
    question: &str,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut params = config.retrieval_params();
    if let Some(k) = k {
        params.top_k = k;
    }
    params.validate()?;

    let store = SqliteStore::open(config).await?;
    let embedder = create_embedder(&config.embedding)?;

    if !config.embedding.is_enabled() && store.session_stats(session_id).await?.chunks > 0 {
        store.close().await;
        bail!("embedding provider is disabled; set [embedding] provider to search this session");
    }

    let cache = config.retrieval.cache_indexes.then(IndexCache::new);

    if question == "-" {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            let q = line.trim();
            if q.is_empty() {
                continue;
            }
            answer_one(&store, embedder.as_ref(), cache.as_ref(), session_id, q, &params, json)
                .await?;
        }
    } else {
        answer_one(
            &store,
            embedder.as_ref(),
            cache.as_ref(),
            session_id,
            question,
            &params,
            json,
        )
        .await?;
    }

    store.close().await;
    Ok(())
}

async fn answer_one(
    store: &SqliteStore,
    embedder: &dyn Embedder,
    cache: Option<&IndexCache>,
    session_id: &str,
    question: &str,
    params: &RetrievalParams,
    json: bool,
) -> Result<()> {
    let answer = ask(store, embedder, cache, session_id, question, params).await?;

    if json {
        println!("{}", serde_json::to_string(&answer)?);
        return Ok(());
    }

    match &answer {
        Answer::NoContext { excluded } => {
            println!("{}", NO_CONTEXT_MESSAGE);
            print_excluded(excluded);
        }
        Answer::Ready {
            bundle,
            ranked,
            excluded,
        } => {
            println!("Context:\n{}\n", bundle.context_text);
            println!("History:\n{}\n", bundle.history_text);
            println!("Question:\n{}\n", bundle.question_text);
            println!("Sources:");
            for (i, c) in ranked.iter().enumerate() {
                println!(
                    "  {}. {}#{}  distance={:.4}",
                    i + 1,
                    c.document_id,
                    c.chunk_index,
                    c.distance
                );
            }
            print_excluded(excluded);
        }
    }
    Ok(())
}

fn print_excluded(excluded: &[notebook_rag_core::retriever::ExcludedChunk]) {
    if excluded.is_empty() {
        return;
    }
    println!("Excluded ({} unusable embeddings):", excluded.len());
    for e in excluded {
        println!("  {}#{}: {}", e.document_id, e.chunk_index, e.reason);
    }
}
