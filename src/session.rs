//! `nrag session` commands: create, attach, show, list.

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use notebook_rag_core::models::Session;
use notebook_rag_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_create(config: &Config, user_id: &str, name: Option<String>) -> Result<()> {
    let store = SqliteStore::open(config).await?;

    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: name.unwrap_or_else(|| "Untitled session".to_string()),
        created_at: chrono::Utc::now().timestamp(),
    };
    store
        .create_session(&session)
        .await
        .context("Failed to create session")?;
    tracing::info!(session_id = %session.id, user_id, "created session");

    println!("session created: {}", session.id);
    println!("  name: {}", session.name);
    println!("  user: {}", session.user_id);

    store.close().await;
    Ok(())
}

pub async fn run_attach(config: &Config, session_id: &str, document_id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    store
        .attach_document(session_id, document_id)
        .await
        .with_context(|| format!("Failed to attach {} to {}", document_id, session_id))?;

    println!("attached {} to session {}", document_id, session_id);
    store.close().await;
    Ok(())
}

pub async fn run_show(config: &Config, session_id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;

    let Some(session) = store.get_session(session_id).await? else {
        store.close().await;
        bail!("session not found: {}", session_id);
    };
    let stats = store.session_stats(session_id).await?;
    let documents = store.session_document_ids(session_id).await?;

    println!("session {}", session.id);
    println!("  name: {}", session.name);
    println!("  user: {}", session.user_id);
    println!("  created: {}", format_ts(session.created_at));
    println!("  documents: {}", stats.documents);
    for id in &documents {
        let title = store
            .get_document(id)
            .await?
            .map(|d| d.title)
            .unwrap_or_default();
        println!("    - {}  {}", id, title);
    }
    println!("  chunks: {}", stats.chunks);
    println!("  turns: {}", stats.turns);

    store.close().await;
    Ok(())
}

pub async fn run_list(config: &Config, user_id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let sessions = store.list_sessions(user_id).await?;

    if sessions.is_empty() {
        println!("No sessions for user {}.", user_id);
    }
    for s in &sessions {
        println!("{}  {}  {}", s.id, format_ts(s.created_at), s.name);
    }

    store.close().await;
    Ok(())
}

pub(crate) fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
