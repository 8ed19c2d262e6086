//! `nrag document add`: store an already-extracted text file.
//!
//! Reads the file, chunks and embeds it, writes the document with its
//! chunks, and optionally attaches it to a session. Text extraction from
//! PDFs or slides is done upstream; this command expects plain UTF-8.

use anyhow::{bail, Context, Result};
use std::path::Path;
use uuid::Uuid;

use notebook_rag_core::models::Document;
use notebook_rag_core::pipeline::ingest_document;
use notebook_rag_core::store::Store;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::sqlite_store::SqliteStore;

pub async fn run_add(
    config: &Config,
    path: &Path,
    user_id: &str,
    title: Option<String>,
    session_id: Option<&str>,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document text: {}", path.display()))?;
    let title = title.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    let store = SqliteStore::open(config).await?;

    // Check the target session up front so a typo does not leave an
    // orphaned document behind.
    if let Some(sid) = session_id {
        if store.get_session(sid).await?.is_none() {
            store.close().await;
            bail!("session not found: {}", sid);
        }
    }

    let embedder = create_embedder(&config.embedding)?;
    let doc = Document {
        id: Uuid::new_v4().to_string(),
        title,
        user_id: user_id.to_string(),
        content,
        created_at: chrono::Utc::now().timestamp(),
    };

    let report = ingest_document(
        &store,
        embedder.as_ref(),
        &doc,
        &config.chunking_params(),
        config.embedding.batch_size,
    )
    .await
    .with_context(|| format!("Failed to ingest {}", path.display()))?;

    if let Some(sid) = session_id {
        store.attach_document(sid, &doc.id).await?;
    }

    println!("document added: {}", report.document_id);
    println!("  title: {}", doc.title);
    println!("  chunks: {}", report.chunks);
    println!("  embedded: {} ({})", report.embedded, embedder.model_name());
    if let Some(sid) = session_id {
        println!("  attached to: {}", sid);
    }
    println!("ok");

    store.close().await;
    Ok(())
}
