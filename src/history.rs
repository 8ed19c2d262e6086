//! `nrag history` commands: record and view conversation turns.

use anyhow::{Context, Result};

use notebook_rag_core::context::format_history;
use notebook_rag_core::models::{ConversationTurn, Sender};
use notebook_rag_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_append(
    config: &Config,
    session_id: &str,
    sender: Sender,
    message: &str,
    timestamp: Option<i64>,
) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let turn = ConversationTurn {
        session_id: session_id.to_string(),
        sender,
        message: message.to_string(),
        timestamp: timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp()),
    };
    store
        .append_turn(&turn)
        .await
        .context("Failed to record turn")?;

    println!("recorded {} turn in {}", sender.as_str(), session_id);
    store.close().await;
    Ok(())
}

/// Print the session transcript. With `last`, only the window the
/// context assembler would use.
pub async fn run_show(config: &Config, session_id: &str, last: Option<usize>) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let history = store.history(session_id).await?;
    println!(
        "{}",
        format_history(&history, last.unwrap_or(history.len()))
    );
    store.close().await;
    Ok(())
}
